//! HTTP route definitions.

mod admin;
mod bookings;
mod favorites;
mod health;
mod listings;

use crate::AppState;
use axum::Router;

/// Create all application routes.
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(listings::routes())
        .merge(favorites::routes())
        .merge(bookings::routes())
        .merge(admin::routes())
}
