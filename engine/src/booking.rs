//! Booking records and the draft that creates them.

use crate::{error::Result, BookingId, Error, ListingId, OwnerId, Property};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Most guests a single booking may carry.
pub const MAX_GUESTS: u32 = 10;

/// Lifecycle of a booking.
///
/// Only `Upcoming` can move, and only forward: to `Cancelled` or `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BookingStatus {
    #[default]
    Upcoming,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Upcoming => "Upcoming",
            BookingStatus::Completed => "Completed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Upcoming)
    }

    /// Whether a record in this state may move to `next`.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Upcoming, BookingStatus::Cancelled)
                | (BookingStatus::Upcoming, BookingStatus::Completed)
        )
    }

    /// Validate a transition, reporting the illegal pair on failure.
    pub fn transition(self, next: BookingStatus) -> Result<BookingStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "Upcoming" => Ok(BookingStatus::Upcoming),
            "Completed" => Ok(BookingStatus::Completed),
            "Cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(Error::InvalidDraft(format!("unknown status '{other}'"))),
        }
    }
}

/// How the guest intends to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Card,
    Upi,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "card",
            PaymentMethod::Upi => "upi",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "card" => Ok(PaymentMethod::Card),
            "upi" => Ok(PaymentMethod::Upi),
            other => Err(Error::InvalidDraft(format!(
                "unknown payment method '{other}'"
            ))),
        }
    }
}

/// Denormalized listing fields stored on a booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingRef {
    pub id: ListingId,
    pub title: String,
    pub location: String,
    pub image: Option<String>,
    pub nightly_price: u64,
}

impl From<&Property> for ListingRef {
    fn from(property: &Property) -> Self {
        Self {
            id: property.id.clone(),
            title: property.title.clone(),
            location: property.location.clone(),
            image: Some(property.image.clone()).filter(|uri| !uri.is_empty()),
            nightly_price: property.nightly_price(),
        }
    }
}

/// Guest contact details, all required at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl Contact {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        phone: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("name", &self.name),
            ("email", &self.email),
            ("phone", &self.phone),
        ] {
            if value.trim().is_empty() {
                return Err(Error::InvalidDraft(format!("missing contact {field}")));
            }
        }
        Ok(())
    }
}

/// Fixed per-booking fees, in whole rupees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fees {
    pub cleaning_fee: u64,
    pub service_fee: u64,
}

impl Default for Fees {
    fn default() -> Self {
        Self {
            cleaning_fee: 2_500,
            service_fee: 1_500,
        }
    }
}

/// Price of a stay: nightly price times nights plus fixed fees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub nightly_price: u64,
    pub nights: u32,
    pub cleaning_fee: u64,
    pub service_fee: u64,
    pub total: u64,
}

impl PriceBreakdown {
    pub fn compute(nightly_price: u64, nights: u32, fees: Fees) -> Result<Self> {
        let total = nightly_price
            .checked_mul(u64::from(nights))
            .and_then(|stay| stay.checked_add(fees.cleaning_fee))
            .and_then(|stay| stay.checked_add(fees.service_fee))
            .ok_or_else(|| Error::InvalidDraft("total price overflows".into()))?;

        Ok(Self {
            nightly_price,
            nights,
            cleaning_fee: fees.cleaning_fee,
            service_fee: fees.service_fee,
            total,
        })
    }

    /// Price of the nights alone, without fees.
    pub fn stay_price(&self) -> u64 {
        self.nightly_price * u64::from(self.nights)
    }
}

/// A booking as submitted by the UI, before it is bound to an owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDraft {
    pub listing: ListingRef,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub contact: Contact,
    #[serde(default)]
    pub message_to_host: Option<String>,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    /// Whatever the caller put here is ignored; new bookings start `Upcoming`.
    #[serde(default)]
    pub status: BookingStatus,
}

impl BookingDraft {
    pub fn new(
        listing: ListingRef,
        check_in: NaiveDate,
        check_out: NaiveDate,
        guests: u32,
        contact: Contact,
    ) -> Self {
        Self {
            listing,
            check_in,
            check_out,
            guests,
            contact,
            message_to_host: None,
            payment_method: PaymentMethod::default(),
            status: BookingStatus::default(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message_to_host = Some(message.into());
        self
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    /// Nights between check-in and check-out (may be zero or negative for
    /// invalid drafts).
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }

    /// Validate the draft and bind it to `owner_id`.
    pub fn into_new_booking(self, owner_id: impl Into<OwnerId>, fees: Fees) -> Result<NewBooking> {
        let nights = self.nights();
        if nights <= 0 {
            return Err(Error::InvalidDraft(
                "check-out must be after check-in".into(),
            ));
        }
        let nights = u32::try_from(nights)
            .map_err(|_| Error::InvalidDraft("stay is too long".into()))?;

        if self.guests == 0 || self.guests > MAX_GUESTS {
            return Err(Error::InvalidDraft(format!(
                "guests must be between 1 and {MAX_GUESTS}"
            )));
        }
        if self.listing.id.is_empty() {
            return Err(Error::InvalidDraft("missing listing".into()));
        }
        self.contact.validate()?;

        let pricing = PriceBreakdown::compute(self.listing.nightly_price, nights, fees)?;

        Ok(NewBooking {
            owner_id: owner_id.into(),
            listing: self.listing,
            check_in: self.check_in,
            check_out: self.check_out,
            guests: self.guests,
            pricing,
            status: BookingStatus::Upcoming,
            contact: self.contact,
            message_to_host: self.message_to_host.filter(|m| !m.trim().is_empty()),
            payment_method: self.payment_method,
        })
    }
}

/// A validated booking bound to an owner, ready for the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub owner_id: OwnerId,
    pub listing: ListingRef,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub pricing: PriceBreakdown,
    pub status: BookingStatus,
    pub contact: Contact,
    pub message_to_host: Option<String>,
    pub payment_method: PaymentMethod,
}

/// A persisted booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    /// Assigned by the remote store
    pub id: BookingId,
    pub owner_id: OwnerId,
    pub listing: ListingRef,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub pricing: PriceBreakdown,
    pub status: BookingStatus,
    pub contact: Contact,
    pub message_to_host: Option<String>,
    pub payment_method: PaymentMethod,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Materialize a stored booking. The status always starts `Upcoming`.
    pub fn from_new(id: impl Into<BookingId>, new: NewBooking, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            owner_id: new.owner_id,
            listing: new.listing,
            check_in: new.check_in,
            check_out: new.check_out,
            guests: new.guests,
            pricing: new.pricing,
            status: BookingStatus::Upcoming,
            contact: new.contact,
            message_to_host: new.message_to_host,
            payment_method: new.payment_method,
            created_at,
        }
    }

    pub fn total_price(&self) -> u64 {
        self.pricing.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(nightly_price: u64) -> ListingRef {
        ListingRef {
            id: "a".into(),
            title: "Sea View Villa".into(),
            location: "Goa".into(),
            image: None,
            nightly_price,
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).unwrap()
    }

    fn draft(check_in: u32, check_out: u32) -> BookingDraft {
        BookingDraft::new(
            listing(10_000),
            date(check_in),
            date(check_out),
            2,
            Contact::new("Asha", "asha@example.com", "+91 90000 00000"),
        )
    }

    #[test]
    fn status_transitions() {
        use BookingStatus::*;
        assert!(Upcoming.can_transition_to(Cancelled));
        assert!(Upcoming.can_transition_to(Completed));
        assert!(!Upcoming.can_transition_to(Upcoming));
        assert!(!Cancelled.can_transition_to(Upcoming));
        assert!(!Cancelled.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(Cancelled.is_terminal());
        assert!(!Upcoming.is_terminal());

        assert_eq!(
            Completed.transition(Cancelled),
            Err(Error::InvalidTransition {
                from: Completed,
                to: Cancelled
            })
        );
    }

    #[test]
    fn five_night_total() {
        let new = draft(10, 15)
            .into_new_booking("u1", Fees::default())
            .unwrap();
        assert_eq!(new.pricing.nights, 5);
        assert_eq!(new.pricing.stay_price(), 50_000);
        assert_eq!(new.pricing.total, 54_000);
    }

    #[test]
    fn caller_status_is_ignored() {
        let mut submitted = draft(10, 12);
        submitted.status = BookingStatus::Completed;
        let new = submitted.into_new_booking("u1", Fees::default()).unwrap();
        assert_eq!(new.status, BookingStatus::Upcoming);
    }

    #[test]
    fn check_out_must_follow_check_in() {
        let same_day = draft(10, 10).into_new_booking("u1", Fees::default());
        assert!(matches!(same_day, Err(Error::InvalidDraft(_))));

        let backwards = draft(12, 10).into_new_booking("u1", Fees::default());
        assert!(matches!(backwards, Err(Error::InvalidDraft(_))));
    }

    #[test]
    fn guests_and_contact_are_required() {
        let mut no_guests = draft(10, 12);
        no_guests.guests = 0;
        assert!(no_guests.into_new_booking("u1", Fees::default()).is_err());

        let mut crowd = draft(10, 12);
        crowd.guests = MAX_GUESTS + 1;
        assert!(crowd.into_new_booking("u1", Fees::default()).is_err());

        let mut no_phone = draft(10, 12);
        no_phone.contact.phone = "  ".into();
        assert_eq!(
            no_phone.into_new_booking("u1", Fees::default()),
            Err(Error::InvalidDraft("missing contact phone".into()))
        );
    }

    #[test]
    fn blank_message_is_dropped() {
        let new = draft(10, 12)
            .with_message("   ")
            .into_new_booking("u1", Fees::default())
            .unwrap();
        assert_eq!(new.message_to_host, None);
    }

    #[test]
    fn status_wire_format() {
        let json = serde_json::to_string(&BookingStatus::Cancelled).unwrap();
        assert_eq!(json, "\"Cancelled\"");
        assert_eq!("Upcoming".parse::<BookingStatus>(), Ok(BookingStatus::Upcoming));
        assert!("cancelled".parse::<BookingStatus>().is_err());
        assert_eq!(serde_json::to_string(&PaymentMethod::Upi).unwrap(), "\"upi\"");
    }
}
