//! Bookings routes, scoped to the authenticated owner.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use staybook_engine::adapter::{ChangeResponse, StatusUpdateRequest};
use staybook_engine::{Booking, NewBooking};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{handle_create_booking, handle_list_bookings, handle_update_status};
use crate::AppState;

/// Create bookings routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", get(list_handler).post(create_handler))
        .route("/bookings/{id}/status", patch(status_handler))
}

/// GET /bookings - The owner's bookings, newest first.
async fn list_handler(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Booking>>> {
    Ok(Json(handle_list_bookings(&state.pool, &auth.owner_id).await?))
}

/// POST /bookings - Create a booking.
async fn create_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(booking): Json<NewBooking>,
) -> Result<(StatusCode, Json<Booking>)> {
    let created = handle_create_booking(&state.pool, &auth.owner_id, booking).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /bookings/{id}/status - Cancel or complete an upcoming booking.
async fn status_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(request): Json<StatusUpdateRequest>,
) -> Result<Json<ChangeResponse>> {
    let response = handle_update_status(&state.pool, &auth.owner_id, &id, request).await?;
    Ok(Json(response))
}
