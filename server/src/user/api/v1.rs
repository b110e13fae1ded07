use crate::auth::{CurrentUser, encode_jwt};
use crate::entities::sea_orm_active_enums::UserRole;
use crate::user::{User, UserService, UserServiceError};
use crate::web::AppState;
use crate::web::api::v1::ErrorResponse;
use axum::{
    Router,
    extract::{Extension, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

/// JSON request payload for registration.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// JSON request payload for login.
#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Account summary carried in registration and login responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct AccountJson {
    /// Email address of the account
    email: String,
    /// Display name of the account
    name: String,
    /// Role of the account
    role: UserRole,
}

impl From<&User> for AccountJson {
    fn from(user: &User) -> Self {
        Self {
            email: user.email().to_string(),
            name: user.name().to_string(),
            role: user.role(),
        }
    }
}

/// JSON response for successful registration and login.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    /// The registered or authenticated account
    pub user: AccountJson,
    /// A bearer token valid for 24 hours
    pub token: String,
}

/// JSON representation of a User for profile and listing responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserJson {
    /// Unique identifier of the account
    id: Uuid,
    /// Email address of the account
    email: String,
    /// Display name of the account
    name: String,
    /// Role of the account
    role: UserRole,
}

impl From<User> for UserJson {
    fn from(user: User) -> Self {
        Self {
            id: user.id(),
            email: user.email().to_string(),
            name: user.name().to_string(),
            role: user.role(),
        }
    }
}

/// Handler for POST /api/users/register - Creates an account and returns a session token.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = SessionResponse),
        (status = 400, description = "Invalid input or email already registered", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), (StatusCode, Json<ErrorResponse>)> {
    if payload.email.is_empty() || payload.name.is_empty() || payload.password.chars().count() < 8 {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Invalid input data".to_string())),
        ));
    }

    let service = UserService::new(&state.db);
    let user = service
        .register(payload.email, &payload.password, payload.name)
        .await
        .map_err(|err| match err {
            UserServiceError::EmailAlreadyRegistered => (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(err.to_string())),
            ),
            err => {
                tracing::error!("Registration failed: {}", err);
                (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new("Registration failed".to_string())),
                )
            }
        })?;

    let token = issue_token(&user, &state.config.jwt_secret).await?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user: AccountJson::from(&user),
            token,
        }),
    ))
}

/// Handler for POST /api/users/login - Verifies credentials and returns a session token.
#[tracing::instrument(skip(state, payload))]
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successfully authenticated", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "Users"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let service = UserService::new(&state.db);
    let user = service
        .verify_credentials(&payload.email, &payload.password)
        .await
        .map_err(|err| match err {
            UserServiceError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(err.to_string())),
            ),
            err => {
                tracing::error!("Login failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("Server error".to_string())),
                )
            }
        })?;

    let token = issue_token(&user, &state.config.jwt_secret).await?;

    Ok(Json(SessionResponse {
        user: AccountJson::from(&user),
        token,
    }))
}

/// Handler for GET /api/users/profile - Returns the caller's own account.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/users/profile",
    responses(
        (status = 200, description = "The caller's account", body = UserJson),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<CurrentUser>,
) -> Result<Json<UserJson>, (StatusCode, Json<ErrorResponse>)> {
    let service = UserService::new(&state.db);
    match service.get_user_by_id(current_user.user_id).await {
        Ok(user) => Ok(Json(UserJson::from(user))),
        Err(UserServiceError::UserNotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("User not found".to_string())),
        )),
        Err(err) => {
            tracing::error!("Failed to load profile: {}", err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Server error".to_string())),
            ))
        }
    }
}

/// Handler for GET /api/users - Returns the first 50 accounts. Admin only.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/users",
    responses(
        (status = 200, description = "Successfully retrieved users", body = [UserJson]),
        (status = 401, description = "Authentication required", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserJson>>, (StatusCode, Json<ErrorResponse>)> {
    let service = UserService::new(&state.db);
    match service.get_all_users().await {
        Ok(users) => Ok(Json(users.into_iter().map(UserJson::from).collect())),
        Err(err) => {
            tracing::error!("Failed to list users: {}", err);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Server error".to_string())),
            ))
        }
    }
}

/// Signs a session token for the given account.
async fn issue_token(
    user: &User,
    jwt_secret: &str,
) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    encode_jwt(user.id(), user.role(), jwt_secret)
        .await
        .map_err(|err| {
            tracing::error!("Failed to sign session token: {}", err);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    "Failed to generate authentication token".to_string(),
                )),
            )
        })
}

/// Creates the public users router (registration and login).
pub fn create_public_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users/register", post(register_handler))
        .route("/users/login", post(login_handler))
        .with_state(state)
}

/// Creates the protected users router (profile and the admin-only listing).
pub fn create_protected_router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/users", get(list_users_handler))
        .route_layer(axum::middleware::from_fn(
            crate::auth::api::v1::require_admin_middleware,
        ));

    Router::new()
        .route("/users/profile", get(profile_handler))
        .merge(admin_routes)
        .with_state(state)
}
