//! Favorites routes, scoped to the authenticated owner.

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use staybook_engine::adapter::ChangeResponse;
use staybook_engine::Property;

use crate::auth::AuthUser;
use crate::error::Result;
use crate::handlers::{
    handle_add_favorite, handle_favorite_ids, handle_favorite_listings, handle_remove_favorite,
};
use crate::AppState;

/// Create favorites routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/favorites/ids", get(ids_handler))
        .route("/favorites/listings", get(listings_handler))
        .route("/favorites/{listing_id}", put(add_handler).delete(remove_handler))
}

/// GET /favorites/ids - Favorited listing ids.
async fn ids_handler(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<String>>> {
    Ok(Json(handle_favorite_ids(&state.pool, &auth.owner_id).await?))
}

/// GET /favorites/listings - Resolved favorite listings.
async fn listings_handler(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<Property>>> {
    Ok(Json(
        handle_favorite_listings(&state.pool, &auth.owner_id).await?,
    ))
}

/// PUT /favorites/{listing_id} - Add a favorite.
async fn add_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(listing_id): Path<String>,
) -> Result<Json<ChangeResponse>> {
    let response = handle_add_favorite(&state.pool, &auth.owner_id, &listing_id).await?;
    Ok(Json(response))
}

/// DELETE /favorites/{listing_id} - Remove a favorite.
async fn remove_handler(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(listing_id): Path<String>,
) -> Result<Json<ChangeResponse>> {
    let response = handle_remove_favorite(&state.pool, &auth.owner_id, &listing_id).await?;
    Ok(Json(response))
}
