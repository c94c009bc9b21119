use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;
use serde::Deserializer;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Password;
use crate::domain::user::models::ProfileChanges;
use crate::domain::user::models::UpdateUserCommand;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

/// HTTP request body for updating a user (raw JSON)
///
/// Every field is optional. `profile_picture: null` clears the picture,
/// leaving the key out keeps it.
#[derive(Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default, alias = "profilePic", deserialize_with = "present")]
    profile_picture: Option<Option<String>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl UpdateUserRequest {
    fn try_into_command(self) -> Result<UpdateUserCommand, UserError> {
        let profile = ProfileChanges {
            username: self.username.map(Username::new).transpose()?,
            name: self.name.map(|name| name.trim().to_string()),
            email: self.email.map(EmailAddress::new).transpose()?,
            profile_picture: self.profile_picture,
        };

        Ok(UpdateUserCommand {
            profile,
            password: self.password.map(Password::new).transpose()?,
        })
    }
}

pub async fn update_user(
    State(state): State<AppState>,
    Extension(current_user): Extension<AuthenticatedUser>,
    Path(id): Path<String>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    let target = UserId::from_string(&id).map_err(UserError::from)?;
    if current_user.user_id != target {
        tracing::warn!(
            actor = %current_user.user_id,
            target = %target,
            "Update of another user's record refused"
        );
        return Err(UserError::Forbidden {
            actor: current_user.user_id.to_string(),
            target: target.to_string(),
        }
        .into());
    }

    let Json(body) = body?;
    let command = body.try_into_command()?;

    state
        .user_service
        .update_user(&current_user.user_id, &target, command)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::OK, user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> UpdateUserCommand {
        serde_json::from_str::<UpdateUserRequest>(json)
            .unwrap()
            .try_into_command()
            .unwrap()
    }

    #[test]
    fn test_absent_fields_are_left_alone() {
        let command = parse(r#"{"name":"Robert"}"#);

        assert_eq!(command.profile.name.as_deref(), Some("Robert"));
        assert!(command.profile.username.is_none());
        assert!(command.profile.email.is_none());
        assert!(command.profile.profile_picture.is_none());
        assert!(command.password.is_none());
    }

    #[test]
    fn test_profile_picture_null_clears_and_alias_sets() {
        assert_eq!(
            parse(r#"{"profile_picture":null}"#).profile.profile_picture,
            Some(None)
        );
        assert_eq!(
            parse(r#"{"profilePic":"https://img/bob.png"}"#)
                .profile
                .profile_picture,
            Some(Some("https://img/bob.png".to_string()))
        );
    }

    #[test]
    fn test_invalid_fields_are_rejected() {
        let short_password = serde_json::from_str::<UpdateUserRequest>(r#"{"password":"123"}"#)
            .unwrap()
            .try_into_command();
        assert!(matches!(short_password, Err(UserError::InvalidPassword(_))));

        let bad_email = serde_json::from_str::<UpdateUserRequest>(r#"{"email":"user@@bad"}"#)
            .unwrap()
            .try_into_command();
        assert!(matches!(bad_email, Err(UserError::InvalidEmail(_))));
    }
}
