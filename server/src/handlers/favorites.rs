//! Favorites handlers.

use crate::db;
use crate::error::Result;
use sqlx::PgPool;
use staybook_engine::adapter::ChangeResponse;
use staybook_engine::Property;

pub async fn handle_favorite_ids(pool: &PgPool, owner_id: &str) -> Result<Vec<String>> {
    Ok(db::get_favorite_ids(pool, owner_id).await?)
}

pub async fn handle_favorite_listings(pool: &PgPool, owner_id: &str) -> Result<Vec<Property>> {
    let rows = db::get_favorite_listings(pool, owner_id).await?;
    Ok(rows.iter().map(db::StoredListing::to_property).collect())
}

/// Add a favorite; idempotent, so always reports a change.
pub async fn handle_add_favorite(
    pool: &PgPool,
    owner_id: &str,
    listing_id: &str,
) -> Result<ChangeResponse> {
    let changed = db::insert_favorite(pool, owner_id, listing_id).await?;
    tracing::debug!(owner = owner_id, listing = listing_id, "Favorite added");
    Ok(ChangeResponse { changed })
}

/// Remove a favorite, reporting whether a row was actually deleted.
pub async fn handle_remove_favorite(
    pool: &PgPool,
    owner_id: &str,
    listing_id: &str,
) -> Result<ChangeResponse> {
    let changed = db::delete_favorite(pool, owner_id, listing_id).await?;
    if !changed {
        tracing::debug!(owner = owner_id, listing = listing_id, "No favorite to remove");
    }
    Ok(ChangeResponse { changed })
}
