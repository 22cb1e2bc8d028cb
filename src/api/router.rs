use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{
    AppState, begin_online_payment, cancel_booking, complete_payment, confirm_booking,
    create_cash_booking, latest_booking, list_bookings, pending_bookings, renew_booking,
};

/// Creates the API router with all booking management endpoints
///
/// Command endpoints (Write operations):
/// - POST /bookings/cash - Create a cash-on-arrival booking
/// - POST /bookings/payment - Begin an online payment checkout
/// - POST /payments/complete - Finalize a completed payment session
/// - POST /bookings/:id/confirm - Owner confirms a booking
/// - POST /bookings/:id/cancel - Owner cancels a booking
/// - POST /bookings/:id/renew - Renew a booking (cash)
///
/// Query endpoints (Read operations):
/// - GET /bookings?user_id - List bookings for a user
/// - GET /bookings/latest?user_id&room_id - Latest booking for a user and room
/// - GET /bookings/pending?owner_id - Pending bookings awaiting an owner
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Command endpoints (Write operations)
        .route("/bookings/cash", post(create_cash_booking))
        .route("/bookings/payment", post(begin_online_payment))
        .route("/payments/complete", post(complete_payment))
        .route("/bookings/:id/confirm", post(confirm_booking))
        .route("/bookings/:id/cancel", post(cancel_booking))
        .route("/bookings/:id/renew", post(renew_booking))
        // Query endpoints (Read operations)
        .route("/bookings", get(list_bookings))
        .route("/bookings/latest", get(latest_booking))
        .route("/bookings/pending", get(pending_bookings))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
