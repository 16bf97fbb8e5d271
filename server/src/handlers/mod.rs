//! Request handlers for favorites, bookings, and the catalog.

mod bookings;
mod favorites;
mod listings;

pub use bookings::*;
pub use favorites::*;
pub use listings::*;
