use crate::auth::{CurrentUser, decode_jwt};
use crate::user::UserService;
use crate::web::AppState;
use crate::web::api::v1::ErrorResponse;
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

/// API authentication middleware that extracts the current user from the
/// Authorization Bearer header.
/// Sets the CurrentUser extension if the token decodes with valid claims and
/// the referenced account still exists.
pub async fn auth_user_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(auth_header) = headers.get("authorization") {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                if let Ok(claims) = decode_jwt(token, &state.config.jwt_secret).await {
                    let user_service = UserService::new(&state.db);
                    if let Ok(true) = user_service.exists_by_id(claims.user_id).await {
                        let current_user = CurrentUser::new(claims.user_id, claims.role);
                        request.extensions_mut().insert(current_user);
                    }
                }
            }
        }
    }

    next.run(request).await
}

/// Middleware that ensures the current user is authenticated.
/// Returns UNAUTHORIZED if the CurrentUser extension is not found in the request.
/// This middleware should be applied after auth_user_middleware.
pub async fn require_auth_middleware(request: Request, next: Next) -> Response {
    // Check if user is authenticated by looking for CurrentUser extension
    let is_authenticated = request.extensions().get::<CurrentUser>().is_some();

    if !is_authenticated {
        let error_response = ErrorResponse::new("Please authenticate".to_string());
        return (StatusCode::UNAUTHORIZED, Json(error_response)).into_response();
    }

    next.run(request).await
}

/// Middleware that ensures the current user holds the admin role.
/// This middleware should be applied after require_auth_middleware.
pub async fn require_admin_middleware(request: Request, next: Next) -> Response {
    let is_admin = request
        .extensions()
        .get::<CurrentUser>()
        .is_some_and(CurrentUser::is_admin);

    if !is_admin {
        let error_response = ErrorResponse::new("Access denied".to_string());
        return (StatusCode::FORBIDDEN, Json(error_response)).into_response();
    }

    next.run(request).await
}
