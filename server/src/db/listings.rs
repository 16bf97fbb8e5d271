//! Catalog queries.

use sqlx::{PgPool, Row};
use staybook_engine::{display_price, Property};

/// A stored listing row from the database.
#[derive(Debug)]
pub struct StoredListing {
    pub id: String,
    pub title: String,
    pub location: String,
    pub price: Option<i64>,
    pub image: String,
    pub rating: Option<f64>,
    pub beds: Option<i32>,
    pub baths: Option<i32>,
    pub sqft: Option<i32>,
    pub category: Option<String>,
    pub frequency: Option<String>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredListing {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredListing {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            location: row.try_get("location")?,
            price: row.try_get("price")?,
            image: row.try_get("image")?,
            rating: row.try_get("rating")?,
            beds: row.try_get("beds")?,
            baths: row.try_get("baths")?,
            sqft: row.try_get("sqft")?,
            category: row.try_get("category")?,
            frequency: row.try_get("frequency")?,
        })
    }
}

impl StoredListing {
    /// Convert database row to the client-facing property.
    pub fn to_property(&self) -> Property {
        let count = |value: Option<i32>| value.and_then(|v| u32::try_from(v).ok());
        Property {
            id: self.id.clone(),
            title: self.title.clone(),
            location: self.location.clone(),
            price: display_price(self.price),
            image: self.image.clone(),
            rating: self.rating,
            beds: count(self.beds),
            baths: count(self.baths),
            sqft: count(self.sqft),
            category: self.category.clone(),
            frequency: self
                .frequency
                .clone()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| "night".to_string()),
        }
    }
}

const LISTING_COLUMNS: &str =
    "l.id, l.title, l.location, l.price, l.image, l.rating, l.beds, l.baths, l.sqft, l.category, l.frequency";

/// All catalog listings.
pub async fn get_listings(pool: &PgPool) -> Result<Vec<StoredListing>, sqlx::Error> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings l ORDER BY l.title, l.id");
    sqlx::query_as::<_, StoredListing>(&sql)
        .fetch_all(pool)
        .await
}

/// A single listing by id.
pub async fn get_listing(pool: &PgPool, id: &str) -> Result<Option<StoredListing>, sqlx::Error> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings l WHERE l.id = $1");
    sqlx::query_as::<_, StoredListing>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Listings an owner has favorited, in favorite order. Favorites without a
/// catalog row are skipped by the join.
pub async fn get_favorite_listings(
    pool: &PgPool,
    owner_id: &str,
) -> Result<Vec<StoredListing>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT {LISTING_COLUMNS}
        FROM favorites f
        JOIN listings l ON l.id = f.listing_id
        WHERE f.owner_id = $1
        ORDER BY f.created_at, f.id
        "#
    );
    sqlx::query_as::<_, StoredListing>(&sql)
        .bind(owner_id)
        .fetch_all(pool)
        .await
}
