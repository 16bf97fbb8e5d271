//! Catalog routes.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use staybook_engine::Property;

use crate::error::Result;
use crate::handlers::{handle_get_listing, handle_list_listings};
use crate::AppState;

/// Create catalog routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/listings", get(list_handler))
        .route("/listings/{id}", get(get_handler))
}

/// GET /listings - Every catalog listing.
async fn list_handler(State(state): State<AppState>) -> Result<Json<Vec<Property>>> {
    Ok(Json(handle_list_listings(&state.pool).await?))
}

/// GET /listings/{id} - One catalog listing.
async fn get_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Property>> {
    Ok(Json(handle_get_listing(&state.pool, &id).await?))
}
