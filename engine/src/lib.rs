//! # Staybook Engine
//!
//! Client-side sync core for a vacation rental app: favorites and bookings.
//!
//! The engine keeps a local projection of what the remote store holds for the
//! signed-in owner, mutates it optimistically where that is safe, and
//! reconciles with the remote store afterwards. It has no knowledge of the UI
//! or of the backend; both plug in through narrow seams.
//!
//! ## Core Concepts
//!
//! ### Owner
//!
//! Every cache belongs to an [`Owner`]: either anonymous (local only, nothing
//! is sent anywhere) or a signed-in user id. Changing the owner discards the
//! caches and fences off every remote call still in flight for the previous
//! owner.
//!
//! ### Stores
//!
//! - [`FavoritesStore`] - optimistic toggles with exact revert on failure
//! - [`BookingsStore`] - non-optimistic creation, owner-scoped cancellation
//!
//! Both publish an immutable snapshot ([`FavoritesView`], [`BookingsView`])
//! after every change, to callbacks and to `tokio::sync::watch` receivers.
//!
//! ### Remote Store
//!
//! [`RemoteStore`] is the persistence contract. [`MemoryRemoteStore`] is an
//! in-process implementation with fault injection; [`HttpRemoteStore`] talks
//! to `staybook-server`.
//!
//! ## Quick Start
//!
//! ```rust
//! use staybook_engine::{MemoryRemoteStore, Property, Session, SyncConfig};
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let villa = Property::new("villa-1", "Sea View Villa", "Goa", Some(10_000), "");
//! let remote = Arc::new(MemoryRemoteStore::new().with_catalog([villa.clone()]));
//! let session = Session::new(Arc::clone(&remote), SyncConfig::default());
//!
//! session.sign_in("owner-1").await.into_result().unwrap();
//! assert_eq!(session.toggle_favorite(villa).await, Ok(true));
//! assert!(session.favorites_snapshot().is_favorite("villa-1"));
//! # }
//! ```

pub mod adapter;
pub mod booking;
pub mod bookings;
pub mod cache;
pub mod config;
pub mod error;
pub mod favorites;
pub mod notify;
pub mod owner;
pub mod property;
pub mod reconcile;
pub mod session;

// Re-export main types at crate root
pub use adapter::{HttpRemoteStore, MemoryRemoteStore, RemoteCall, RemoteStore};
pub use booking::{
    Booking, BookingDraft, BookingStatus, Contact, Fees, ListingRef, NewBooking, PaymentMethod,
    PriceBreakdown, MAX_GUESTS,
};
pub use bookings::BookingsStore;
pub use cache::{BookingsCache, BookingsView, FavoriteSlice, FavoritesCache, FavoritesView};
pub use config::{ConfigError, SyncConfig};
pub use error::Error;
pub use favorites::{FavoritesStore, PendingMutation};
pub use notify::{Notifier, SubscriptionId};
pub use owner::Owner;
pub use property::{display_price, format_inr, Property};
pub use reconcile::{Fence, RefreshTicket};
pub use session::{RefreshReport, Session};

/// Type aliases for clarity
pub type OwnerId = String;
pub type ListingId = String;
pub type BookingId = String;
