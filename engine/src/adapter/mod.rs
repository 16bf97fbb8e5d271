//! Remote Store Adapter contract.
//!
//! The engine never talks to a database directly. Everything it persists goes
//! through a [`RemoteStore`], scoped by an opaque owner id. Any backend that
//! honors the contract below can be plugged in.
//!
//! The boolean results are load-bearing: `remove_favorite` and
//! `update_booking_status` return `true` only when a record actually changed.
//! The engine treats `false` as a failure even though no transport error
//! occurred.

mod http;
mod memory;

pub use http::*;
pub use memory::*;

use crate::{error::Result, Booking, BookingStatus, ListingId, NewBooking, Property};
use async_trait::async_trait;

/// Persistent backend for favorites and bookings.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Favorited listing ids for `owner`, in insertion order.
    async fn list_favorite_ids(&self, owner: &str) -> Result<Vec<ListingId>>;

    /// Catalog records for the owner's favorites. Ids without a catalog
    /// record are silently omitted.
    async fn list_favorite_listings(&self, owner: &str) -> Result<Vec<Property>>;

    /// Idempotent: `true` on success, including when the favorite existed.
    async fn add_favorite(&self, owner: &str, listing: &str) -> Result<bool>;

    /// `true` only if a favorite was actually removed.
    async fn remove_favorite(&self, owner: &str, listing: &str) -> Result<bool>;

    /// Bookings for `owner`, newest first.
    async fn list_bookings(&self, owner: &str) -> Result<Vec<Booking>>;

    /// Persist a booking. The store assigns id and creation time and always
    /// starts the booking as `Upcoming`.
    async fn create_booking(&self, booking: NewBooking) -> Result<Booking>;

    /// `true` only if exactly the booking `booking` owned by `owner` changed.
    async fn update_booking_status(
        &self,
        booking: &str,
        owner: &str,
        status: BookingStatus,
    ) -> Result<bool>;
}
