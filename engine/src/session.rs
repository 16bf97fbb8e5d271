//! Owner-aware facade over both stores.
//!
//! A [`Session`] remembers who is signed in, so UI code can call
//! `toggle_favorite(property)` without threading the owner through every call.
//! Changing identity refreshes both stores for the new owner; anything still
//! in flight for the previous owner is fenced off by the stores themselves.

use crate::bookings::BookingsStore;
use crate::favorites::FavoritesStore;
use crate::{
    error::Result, Booking, BookingDraft, BookingsView, FavoritesView, Owner, Property,
    RemoteStore, SyncConfig,
};
use std::sync::{Arc, Mutex, PoisonError};

/// Outcome of refreshing both stores.
#[derive(Debug)]
pub struct RefreshReport {
    pub favorites: Result<()>,
    pub bookings: Result<()>,
}

impl RefreshReport {
    pub fn is_ok(&self) -> bool {
        self.favorites.is_ok() && self.bookings.is_ok()
    }

    /// Collapse into the first failure, favorites before bookings.
    pub fn into_result(self) -> Result<()> {
        self.favorites.and(self.bookings)
    }
}

/// Favorites and bookings for whoever is currently signed in.
pub struct Session<R> {
    owner: Mutex<Owner>,
    favorites: Arc<FavoritesStore<R>>,
    bookings: Arc<BookingsStore<R>>,
}

impl<R: RemoteStore> Session<R> {
    /// Create an anonymous session.
    pub fn new(remote: Arc<R>, config: SyncConfig) -> Self {
        Self {
            owner: Mutex::new(Owner::Anonymous),
            favorites: Arc::new(FavoritesStore::new(Arc::clone(&remote), config.clone())),
            bookings: Arc::new(BookingsStore::new(remote, config)),
        }
    }

    pub fn owner(&self) -> Owner {
        self.owner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn favorites(&self) -> &Arc<FavoritesStore<R>> {
        &self.favorites
    }

    pub fn bookings(&self) -> &Arc<BookingsStore<R>> {
        &self.bookings
    }

    /// Switch to `owner` and reload both stores.
    pub async fn set_owner(&self, owner: Owner) -> RefreshReport {
        let previous = {
            let mut current = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, owner.clone())
        };
        if previous != owner {
            tracing::info!(from = %previous, to = %owner, "Session identity changed");
        }
        self.refresh_for(&owner).await
    }

    pub async fn sign_in(&self, owner_id: impl Into<String>) -> RefreshReport {
        self.set_owner(Owner::user(owner_id)).await
    }

    pub async fn sign_out(&self) -> RefreshReport {
        self.set_owner(Owner::Anonymous).await
    }

    /// Reload both stores for the current owner, concurrently.
    pub async fn refresh(&self) -> RefreshReport {
        let owner = self.owner();
        self.refresh_for(&owner).await
    }

    async fn refresh_for(&self, owner: &Owner) -> RefreshReport {
        let (favorites, bookings) = futures::join!(
            self.favorites.refresh(owner),
            self.bookings.refresh(owner),
        );
        RefreshReport {
            favorites,
            bookings,
        }
    }

    pub async fn toggle_favorite(&self, property: Property) -> Result<bool> {
        let owner = self.owner();
        self.favorites.toggle_favorite(&owner, property).await
    }

    pub async fn add_booking(&self, draft: BookingDraft) -> Result<Booking> {
        let owner = self.owner();
        self.bookings.add_booking(&owner, draft).await
    }

    pub async fn cancel_booking(&self, booking_id: &str) -> Result<()> {
        let owner = self.owner();
        self.bookings.cancel_booking(&owner, booking_id).await
    }

    pub fn favorites_snapshot(&self) -> FavoritesView {
        self.favorites.snapshot()
    }

    pub fn bookings_snapshot(&self) -> BookingsView {
        self.bookings.snapshot()
    }
}

impl<R> std::fmt::Debug for Session<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("favorites", &self.favorites)
            .field("bookings", &self.bookings)
            .finish_non_exhaustive()
    }
}
