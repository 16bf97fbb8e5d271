//! Database module for PostgreSQL persistence.

mod bookings;
mod favorites;
mod listings;
mod pool;

pub use bookings::*;
pub use favorites::*;
pub use listings::*;
pub use pool::*;
