//! Admin routes.

use axum::{extract::State, routing::get, Json, Router};
use staybook_engine::Booking;

use crate::auth::AdminUser;
use crate::error::Result;
use crate::handlers::handle_list_all_bookings;
use crate::AppState;

/// Create admin routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/admin/bookings", get(all_bookings_handler))
}

/// GET /admin/bookings - Every booking across owners, newest first.
async fn all_bookings_handler(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Booking>>> {
    Ok(Json(handle_list_all_bookings(&state.pool).await?))
}
