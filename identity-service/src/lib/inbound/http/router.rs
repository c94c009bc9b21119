use std::sync::Arc;
use std::time::Duration;

use auth::Authenticator;
use axum::body::Body;
use axum::http::header;
use axum::http::HeaderName;
use axum::http::Method;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::routing::put;
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::AllowOrigin;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::authenticate::authenticate;
use super::handlers::create_user::create_user;
use super::handlers::get_current_user::get_current_user;
use super::handlers::list_users::list_users;
use super::handlers::readiness::readiness;
use super::handlers::update_user::update_user;
use super::middleware::authenticate as auth_middleware;
use crate::domain::user::ports::UserServicePort;

const CORS_MAX_AGE: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserServicePort>,
    pub authenticator: Arc<Authenticator>,
}

pub fn create_router(
    user_service: Arc<dyn UserServicePort>,
    authenticator: Arc<Authenticator>,
    request_timeout: Duration,
) -> Router {
    let state = AppState {
        user_service,
        authenticator,
    };

    let public_routes = Router::new()
        .route("/", get(readiness))
        .route("/login", post(authenticate))
        .route("/users", post(create_user));

    let protected_routes = Router::new()
        .route("/me", get(get_current_user))
        .route("/users", get(list_users))
        .route("/users/:id", put(update_user))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CatchPanicLayer::new())
        .layer(trace_layer)
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use chrono::Duration as TokenTtl;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::user::models::CreateUserCommand;
    use crate::domain::user::models::LoginCommand;
    use crate::domain::user::models::Session;
    use crate::domain::user::models::UpdateUserCommand;
    use crate::domain::user::models::User;
    use crate::domain::user::models::UserId;
    use crate::domain::user::service::UserService;
    use crate::outbound::repositories::InMemoryUserRepository;
    use crate::user::errors::UserError;

    fn authenticator() -> Arc<Authenticator> {
        Arc::new(
            Authenticator::new(b"router_test_secret_key_32_bytes!", TokenTtl::hours(24)).unwrap(),
        )
    }

    fn router() -> Router {
        let authenticator = authenticator();
        let service = Arc::new(UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::clone(&authenticator),
        ));
        create_router(service, authenticator, Duration::from_secs(5))
    }

    enum Misbehaviour {
        Stall,
        Panic,
    }

    /// Service whose every operation either hangs or panics.
    struct BrokenUserService(Misbehaviour);

    impl BrokenUserService {
        async fn fail(&self) -> UserError {
            match self.0 {
                Misbehaviour::Stall => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    UserError::DatabaseError("stalled".to_string())
                }
                Misbehaviour::Panic => panic!("user service panicked"),
            }
        }
    }

    #[async_trait]
    impl UserServicePort for BrokenUserService {
        async fn create_user(&self, _command: CreateUserCommand) -> Result<User, UserError> {
            Err(self.fail().await)
        }

        async fn authenticate(&self, _command: LoginCommand) -> Result<Session, UserError> {
            Err(self.fail().await)
        }

        async fn get_user(&self, _id: &UserId) -> Result<User, UserError> {
            Err(self.fail().await)
        }

        async fn list_users(&self) -> Result<Vec<User>, UserError> {
            Err(self.fail().await)
        }

        async fn update_user(
            &self,
            _actor: &UserId,
            _target: &UserId,
            _command: UpdateUserCommand,
        ) -> Result<User, UserError> {
            Err(self.fail().await)
        }
    }

    fn broken_router(misbehaviour: Misbehaviour, request_timeout: Duration) -> Router {
        create_router(
            Arc::new(BrokenUserService(misbehaviour)),
            authenticator(),
            request_timeout,
        )
    }

    fn login_request() -> Request<Body> {
        Request::post("/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"bob@x.com","password":"secret1"}"#))
            .unwrap()
    }

    #[tokio::test]
    async fn test_slow_request_times_out() {
        let response = broken_router(Misbehaviour::Stall, Duration::from_millis(50))
            .oneshot(login_request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    }

    #[tokio::test]
    async fn test_handler_panic_becomes_internal_error() {
        let response = broken_router(Misbehaviour::Panic, Duration::from_secs(5))
            .oneshot(login_request())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_readiness_is_public() {
        let response = router()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_route_without_token_is_unauthorized() {
        let response = router()
            .oneshot(Request::get("/me").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_cors_preflight_mirrors_origin() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/users")
                    .header(header::ORIGIN, "https://app.example.com")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://app.example.com"
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS).unwrap(),
            "true"
        );
        assert_eq!(headers.get(header::ACCESS_CONTROL_MAX_AGE).unwrap(), "300");
    }
}
