use std::sync::Arc;

use crate::{auth, task, user, web::AppState};

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
};

use tower::ServiceBuilder;

pub mod v1;

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(state: Arc<AppState>) -> axum::Router {
    let public_routes = user::api::v1::create_public_router(state.clone());
    let protected_routes = user::api::v1::create_protected_router(state.clone())
        .merge(task::api::v1::create_api_router(state.clone()))
        .layer(ServiceBuilder::new().layer(from_fn(auth::api::v1::require_auth_middleware)));
    let api_routes = public_routes.merge(protected_routes);
    Router::new()
        .nest("/api", api_routes)
        .layer(ServiceBuilder::new().layer(from_fn_with_state(
            state,
            auth::api::v1::auth_user_middleware,
        )))
}
