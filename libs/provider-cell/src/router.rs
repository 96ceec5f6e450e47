use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::ProviderState;

pub fn provider_routes(state: Arc<ProviderState>) -> Router {
    let protected_routes = Router::new()
        .route("/", get(handlers::list_providers))
        .route("/", post(handlers::create_provider))
        .route("/{provider_id}", get(handlers::get_provider))
        .route("/{provider_id}/schedule", put(handlers::update_schedule))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
