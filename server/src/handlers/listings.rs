//! Catalog handlers.

use crate::db;
use crate::error::{AppError, Result};
use sqlx::PgPool;
use staybook_engine::Property;

/// Every catalog listing.
pub async fn handle_list_listings(pool: &PgPool) -> Result<Vec<Property>> {
    let rows = db::get_listings(pool).await?;
    Ok(rows.iter().map(db::StoredListing::to_property).collect())
}

/// One catalog listing, 404 if unknown.
pub async fn handle_get_listing(pool: &PgPool, id: &str) -> Result<Property> {
    db::get_listing(pool, id)
        .await?
        .map(|row| row.to_property())
        .ok_or_else(|| AppError::NotFound(format!("listing {id}")))
}
