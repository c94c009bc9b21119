use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::UserData;
use crate::domain::user::models::CreateUserCommand;
use crate::domain::user::models::EmailAddress;
use crate::domain::user::models::Password;
use crate::domain::user::models::Username;
use crate::inbound::http::router::AppState;
use crate::user::errors::UserError;

pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<ApiSuccess<UserData>, ApiError> {
    let Json(body) = body?;

    state
        .user_service
        .create_user(body.try_into_command()?)
        .await
        .map_err(ApiError::from)
        .map(|ref user| ApiSuccess::new(StatusCode::CREATED, user.into()))
}

/// HTTP request body for creating a user (raw JSON)
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct CreateUserRequest {
    username: String,
    #[serde(default)]
    name: String,
    email: String,
    password: String,
    #[serde(default, alias = "profilePic")]
    profile_picture: Option<String>,
}

impl CreateUserRequest {
    fn try_into_command(self) -> Result<CreateUserCommand, UserError> {
        Ok(CreateUserCommand {
            username: Username::new(self.username)?,
            name: self.name.trim().to_string(),
            email: EmailAddress::new(self.email)?,
            password: Password::new(self.password)?,
            profile_picture: self.profile_picture,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            username: username.to_string(),
            name: String::new(),
            email: email.to_string(),
            password: password.to_string(),
            profile_picture: None,
        }
    }

    #[test]
    fn test_request_validation() {
        assert!(request("bob", "bob@x.com", "secret1")
            .try_into_command()
            .is_ok());
        assert!(matches!(
            request("bo", "bob@x.com", "secret1").try_into_command(),
            Err(UserError::InvalidUsername(_))
        ));
        assert!(matches!(
            request("bob", "user@@bad", "secret1").try_into_command(),
            Err(UserError::InvalidEmail(_))
        ));
        assert!(matches!(
            request("bob", "bob@x.com", "12345").try_into_command(),
            Err(UserError::InvalidPassword(_))
        ));
    }

    #[test]
    fn test_request_accepts_profile_pic_alias() {
        let body: CreateUserRequest = serde_json::from_str(
            r#"{"username":"bob","email":"bob@x.com","password":"secret1","profilePic":"https://img/bob.png"}"#,
        )
        .unwrap();

        assert_eq!(body.name, "");
        assert_eq!(body.profile_picture.as_deref(), Some("https://img/bob.png"));
    }
}
