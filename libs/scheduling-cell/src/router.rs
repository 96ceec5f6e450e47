use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::SchedulingState;

pub fn scheduling_routes(state: Arc<SchedulingState>) -> Router {
    let protected_routes = Router::new()
        .route("/slots", get(handlers::list_open_slots))
        .route("/", post(handlers::reserve_booking))
        .route("/search", get(handlers::search_bookings))
        .route("/upcoming", get(handlers::upcoming_bookings))
        .route("/{booking_id}", get(handlers::get_booking))
        .route("/{booking_id}/confirm", post(handlers::confirm_booking))
        .route("/{booking_id}/cancel", post(handlers::cancel_booking))
        .route("/{booking_id}/complete", post(handlers::complete_booking))
        .route("/{booking_id}/no-show", post(handlers::mark_no_show))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
