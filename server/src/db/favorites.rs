//! Favorite membership queries.

use sqlx::PgPool;

/// Favorited listing ids for an owner, oldest first.
pub async fn get_favorite_ids(pool: &PgPool, owner_id: &str) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        r#"
        SELECT listing_id
        FROM favorites
        WHERE owner_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

/// Insert a favorite. Returns true whether or not it already existed.
pub async fn insert_favorite(
    pool: &PgPool,
    owner_id: &str,
    listing_id: &str,
) -> Result<bool, sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO favorites (owner_id, listing_id)
        VALUES ($1, $2)
        ON CONFLICT (owner_id, listing_id) DO NOTHING
        "#,
    )
    .bind(owner_id)
    .bind(listing_id)
    .execute(pool)
    .await?;

    Ok(true)
}

/// Delete a favorite. Returns true only if a row was removed.
pub async fn delete_favorite(
    pool: &PgPool,
    owner_id: &str,
    listing_id: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM favorites WHERE owner_id = $1 AND listing_id = $2")
        .bind(owner_id)
        .bind(listing_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
