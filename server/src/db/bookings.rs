//! Database operations for the bookings table.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use staybook_engine::{
    Booking, BookingStatus, Contact, ListingRef, NewBooking, PaymentMethod, PriceBreakdown,
};
use uuid::Uuid;

/// A stored booking row from the database.
#[derive(Debug)]
pub struct StoredBooking {
    pub id: Uuid,
    pub owner_id: String,
    pub listing_id: String,
    pub listing_title: String,
    pub listing_location: String,
    pub listing_image: Option<String>,
    pub nightly_price: i64,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: i32,
    pub nights: i32,
    pub cleaning_fee: i64,
    pub service_fee: i64,
    pub total: i64,
    pub status: String,
    pub contact_name: String,
    pub contact_email: String,
    pub contact_phone: String,
    pub message_to_host: Option<String>,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredBooking {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredBooking {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            listing_id: row.try_get("listing_id")?,
            listing_title: row.try_get("listing_title")?,
            listing_location: row.try_get("listing_location")?,
            listing_image: row.try_get("listing_image")?,
            nightly_price: row.try_get("nightly_price")?,
            check_in: row.try_get("check_in")?,
            check_out: row.try_get("check_out")?,
            guests: row.try_get("guests")?,
            nights: row.try_get("nights")?,
            cleaning_fee: row.try_get("cleaning_fee")?,
            service_fee: row.try_get("service_fee")?,
            total: row.try_get("total")?,
            status: row.try_get("status")?,
            contact_name: row.try_get("contact_name")?,
            contact_email: row.try_get("contact_email")?,
            contact_phone: row.try_get("contact_phone")?,
            message_to_host: row.try_get("message_to_host")?,
            payment_method: row.try_get("payment_method")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn unsigned<T: TryInto<u64>>(value: T, column: &str) -> Result<u64, String> {
    value
        .try_into()
        .map_err(|_| format!("negative value in column {column}"))
}

impl StoredBooking {
    /// Convert database row to an engine booking.
    pub fn to_booking(&self) -> Result<Booking, String> {
        let status: BookingStatus = self.status.parse().map_err(|e| format!("{e}"))?;
        let payment_method: PaymentMethod =
            self.payment_method.parse().map_err(|e| format!("{e}"))?;
        let nights = u32::try_from(self.nights).map_err(|_| "negative nights".to_string())?;
        let guests = u32::try_from(self.guests).map_err(|_| "negative guests".to_string())?;
        let nightly_price = unsigned(self.nightly_price, "nightly_price")?;

        Ok(Booking {
            id: self.id.to_string(),
            owner_id: self.owner_id.clone(),
            listing: ListingRef {
                id: self.listing_id.clone(),
                title: self.listing_title.clone(),
                location: self.listing_location.clone(),
                image: self.listing_image.clone(),
                nightly_price,
            },
            check_in: self.check_in,
            check_out: self.check_out,
            guests,
            pricing: PriceBreakdown {
                nightly_price,
                nights,
                cleaning_fee: unsigned(self.cleaning_fee, "cleaning_fee")?,
                service_fee: unsigned(self.service_fee, "service_fee")?,
                total: unsigned(self.total, "total")?,
            },
            status,
            contact: Contact {
                name: self.contact_name.clone(),
                email: self.contact_email.clone(),
                phone: self.contact_phone.clone(),
            },
            message_to_host: self.message_to_host.clone(),
            payment_method,
            created_at: self.created_at,
        })
    }
}

fn signed(value: u64, field: &str) -> Result<i64, sqlx::Error> {
    i64::try_from(value).map_err(|e| sqlx::Error::Encode(format!("{field}: {e}").into()))
}

/// Persist a booking for `owner_id`. The row always starts `Upcoming`; the
/// priced total is stored exactly as submitted.
pub async fn insert_booking(
    pool: &PgPool,
    owner_id: &str,
    booking: &NewBooking,
) -> Result<StoredBooking, sqlx::Error> {
    sqlx::query_as::<_, StoredBooking>(
        r#"
        INSERT INTO bookings (
            id, owner_id, listing_id, listing_title, listing_location, listing_image,
            nightly_price, check_in, check_out, guests, nights,
            cleaning_fee, service_fee, total, status,
            contact_name, contact_email, contact_phone, message_to_host,
            payment_method, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(owner_id)
    .bind(&booking.listing.id)
    .bind(&booking.listing.title)
    .bind(&booking.listing.location)
    .bind(&booking.listing.image)
    .bind(signed(booking.pricing.nightly_price, "nightly_price")?)
    .bind(booking.check_in)
    .bind(booking.check_out)
    .bind(booking.guests as i32)
    .bind(booking.pricing.nights as i32)
    .bind(signed(booking.pricing.cleaning_fee, "cleaning_fee")?)
    .bind(signed(booking.pricing.service_fee, "service_fee")?)
    .bind(signed(booking.pricing.total, "total")?)
    .bind(BookingStatus::Upcoming.as_str())
    .bind(&booking.contact.name)
    .bind(&booking.contact.email)
    .bind(&booking.contact.phone)
    .bind(&booking.message_to_host)
    .bind(booking.payment_method.as_str())
    .bind(Utc::now())
    .fetch_one(pool)
    .await
}

/// Bookings for one owner, newest first.
pub async fn get_bookings_for_owner(
    pool: &PgPool,
    owner_id: &str,
) -> Result<Vec<StoredBooking>, sqlx::Error> {
    sqlx::query_as::<_, StoredBooking>(
        r#"
        SELECT * FROM bookings
        WHERE owner_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await
}

/// Every booking, newest first.
pub async fn get_all_bookings(pool: &PgPool) -> Result<Vec<StoredBooking>, sqlx::Error> {
    sqlx::query_as::<_, StoredBooking>("SELECT * FROM bookings ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

/// Move one of `owner_id`'s bookings out of `Upcoming`.
///
/// Returns true only if exactly that row changed: an unknown id, another
/// owner's booking, or a booking no longer upcoming all leave it untouched.
pub async fn update_booking_status(
    pool: &PgPool,
    booking_id: Uuid,
    owner_id: &str,
    status: BookingStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE bookings
        SET status = $1
        WHERE id = $2 AND owner_id = $3 AND status = $4
        "#,
    )
    .bind(status.as_str())
    .bind(booking_id)
    .bind(owner_id)
    .bind(BookingStatus::Upcoming.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}
