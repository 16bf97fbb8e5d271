//! Bookings handlers.

use crate::db;
use crate::error::{AppError, Result};
use sqlx::PgPool;
use staybook_engine::adapter::{ChangeResponse, StatusUpdateRequest};
use staybook_engine::{
    Booking, BookingStatus, Error as EngineError, Fees, NewBooking, PriceBreakdown, MAX_GUESTS,
};
use uuid::Uuid;

fn to_bookings(rows: Vec<db::StoredBooking>) -> Vec<Booking> {
    let mut bookings = Vec::with_capacity(rows.len());
    for stored in &rows {
        match stored.to_booking() {
            Ok(booking) => bookings.push(booking),
            Err(e) => {
                tracing::warn!("Failed to convert stored booking {}: {}", stored.id, e);
            }
        }
    }
    bookings
}

/// Reject submissions whose dates, guests, contact, or pricing do not add up.
pub fn validate_new_booking(booking: &NewBooking) -> std::result::Result<(), EngineError> {
    let invalid = |msg: &str| Err(EngineError::InvalidDraft(msg.to_string()));

    let nights = (booking.check_out - booking.check_in).num_days();
    if nights <= 0 {
        return invalid("check-out must be after check-in");
    }
    if nights != i64::from(booking.pricing.nights) {
        return invalid("nights do not match the stay dates");
    }
    if booking.guests == 0 || booking.guests > MAX_GUESTS {
        return invalid("guest count out of range");
    }
    if booking.listing.id.is_empty() {
        return invalid("missing listing");
    }
    let contact = &booking.contact;
    if [&contact.name, &contact.email, &contact.phone]
        .iter()
        .any(|field| field.trim().is_empty())
    {
        return invalid("contact details are required");
    }

    let fees = Fees {
        cleaning_fee: booking.pricing.cleaning_fee,
        service_fee: booking.pricing.service_fee,
    };
    let expected = PriceBreakdown::compute(booking.pricing.nightly_price, booking.pricing.nights, fees)?;
    if expected.total != booking.pricing.total {
        return invalid("total does not match the price breakdown");
    }
    // Amounts are stored as BIGINT, and every component is at most the total.
    if i64::try_from(expected.total).is_err() {
        return invalid("price exceeds the supported range");
    }
    Ok(())
}

pub async fn handle_list_bookings(pool: &PgPool, owner_id: &str) -> Result<Vec<Booking>> {
    let rows = db::get_bookings_for_owner(pool, owner_id).await?;
    Ok(to_bookings(rows))
}

pub async fn handle_list_all_bookings(pool: &PgPool) -> Result<Vec<Booking>> {
    let rows = db::get_all_bookings(pool).await?;
    Ok(to_bookings(rows))
}

/// Persist a booking for the authenticated owner.
///
/// The owner always comes from the credentials, never from the body.
pub async fn handle_create_booking(
    pool: &PgPool,
    owner_id: &str,
    booking: NewBooking,
) -> Result<Booking> {
    validate_new_booking(&booking)?;
    if booking.owner_id != owner_id {
        tracing::warn!(
            owner = owner_id,
            claimed = %booking.owner_id,
            "Booking body names a different owner, using the authenticated one"
        );
    }

    let stored = db::insert_booking(pool, owner_id, &booking).await?;
    let created = stored.to_booking().map_err(AppError::Internal)?;
    tracing::info!(
        owner = owner_id,
        booking = %created.id,
        total = created.pricing.total,
        "Booking created"
    );
    Ok(created)
}

/// Move one of the owner's upcoming bookings to a terminal status.
pub async fn handle_update_status(
    pool: &PgPool,
    owner_id: &str,
    booking_id: &str,
    request: StatusUpdateRequest,
) -> Result<ChangeResponse> {
    BookingStatus::Upcoming.transition(request.status)?;

    // An id that is not a uuid cannot match any row.
    let Ok(booking_id) = Uuid::parse_str(booking_id) else {
        return Ok(ChangeResponse { changed: false });
    };

    let changed = db::update_booking_status(pool, booking_id, owner_id, request.status).await?;
    if changed {
        tracing::info!(owner = owner_id, booking = %booking_id, status = %request.status, "Booking status updated");
    } else {
        tracing::warn!(owner = owner_id, booking = %booking_id, "Status update matched no booking");
    }
    Ok(ChangeResponse { changed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use staybook_engine::{BookingDraft, Contact, ListingRef};

    fn new_booking() -> NewBooking {
        BookingDraft::new(
            ListingRef {
                id: "a".into(),
                title: "Sea View Villa".into(),
                location: "Goa".into(),
                image: None,
                nightly_price: 10_000,
            },
            NaiveDate::from_ymd_opt(2026, 11, 12).unwrap(),
            NaiveDate::from_ymd_opt(2026, 11, 17).unwrap(),
            2,
            Contact::new("Asha", "asha@example.com", "900"),
        )
        .into_new_booking("u1", Fees::default())
        .unwrap()
    }

    #[test]
    fn accepts_consistent_booking() {
        let booking = new_booking();
        assert_eq!(booking.pricing.total, 54_000);
        assert!(validate_new_booking(&booking).is_ok());
    }

    #[test]
    fn rejects_tampered_total() {
        let mut booking = new_booking();
        booking.pricing.total = 1;
        assert!(matches!(
            validate_new_booking(&booking),
            Err(EngineError::InvalidDraft(_))
        ));
    }

    #[test]
    fn rejects_mismatched_nights() {
        let mut booking = new_booking();
        booking.check_out = NaiveDate::from_ymd_opt(2026, 11, 14).unwrap();
        assert!(validate_new_booking(&booking).is_err());
    }

    #[test]
    fn rejects_amounts_beyond_storage_range() {
        let mut booking = new_booking();
        booking.check_out = booking.check_in + chrono::Days::new(1);
        booking.pricing = PriceBreakdown::compute(i64::MAX as u64, 1, Fees::default()).unwrap();
        assert!(booking.pricing.total > i64::MAX as u64);

        match validate_new_booking(&booking) {
            Err(EngineError::InvalidDraft(msg)) => assert!(msg.contains("range")),
            other => panic!("expected InvalidDraft, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_contact() {
        let mut booking = new_booking();
        booking.contact.phone = " ".into();
        assert!(validate_new_booking(&booking).is_err());
    }
}
