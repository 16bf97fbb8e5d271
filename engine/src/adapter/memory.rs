//! In-memory remote store.
//!
//! A complete implementation of [`RemoteStore`] used for tests and local
//! development. It also supports fault injection: individual calls can be made
//! to fail, and all calls for an owner can be held open until released.

use super::RemoteStore;
use crate::{
    error::Result, Booking, BookingStatus, Error, ListingId, NewBooking, OwnerId, Property,
};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

/// The kinds of calls the remote store answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCall {
    ListFavoriteIds,
    ListFavoriteListings,
    AddFavorite,
    RemoveFavorite,
    ListBookings,
    CreateBooking,
    UpdateBookingStatus,
}

#[derive(Debug, Default)]
struct Tables {
    catalog: HashMap<ListingId, Property>,
    /// (owner, listing) pairs in insertion order
    favorites: Vec<(OwnerId, ListingId)>,
    /// Insertion order; listing sorts newest first
    bookings: Vec<Booking>,
}

/// In-memory [`RemoteStore`] with fault injection.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    tables: Mutex<Tables>,
    failing: Mutex<HashSet<RemoteCall>>,
    /// Mutations that answer "nothing changed" without touching the tables
    inert: Mutex<HashSet<RemoteCall>>,
    calls: Mutex<Vec<(RemoteCall, OwnerId)>>,
    /// Owners whose calls are held open until `resume` is called.
    gates: DashMap<OwnerId, Arc<Semaphore>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryRemoteStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store wrapped in Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Seed catalog listings.
    pub fn with_catalog(self, listings: impl IntoIterator<Item = Property>) -> Self {
        {
            let mut tables = lock(&self.tables);
            for listing in listings {
                tables.catalog.insert(listing.id.clone(), listing);
            }
        }
        self
    }

    /// Seed a favorite without going through the call log.
    pub fn seed_favorite(&self, owner: &str, listing: &str) {
        let mut tables = lock(&self.tables);
        if !has_favorite(&tables, owner, listing) {
            tables.favorites.push((owner.to_string(), listing.to_string()));
        }
    }

    /// Seed a booking without going through the call log.
    pub fn seed_booking(&self, booking: Booking) {
        lock(&self.tables).bookings.push(booking);
    }

    /// Favorited ids currently stored for `owner`.
    pub fn stored_favorites(&self, owner: &str) -> Vec<ListingId> {
        favorite_ids(&lock(&self.tables), owner)
    }

    /// A stored booking by id, regardless of owner.
    pub fn stored_booking(&self, id: &str) -> Option<Booking> {
        lock(&self.tables)
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned()
    }

    /// Make every subsequent call of this kind fail with a network error.
    pub fn fail(&self, call: RemoteCall) {
        lock(&self.failing).insert(call);
    }

    /// Undo [`fail`](Self::fail).
    pub fn heal(&self, call: RemoteCall) {
        lock(&self.failing).remove(&call);
    }

    /// Make every subsequent mutation of this kind report no effect.
    pub fn no_effect(&self, call: RemoteCall) {
        lock(&self.inert).insert(call);
    }

    fn is_inert(&self, call: RemoteCall) -> bool {
        lock(&self.inert).contains(&call)
    }

    /// Hold every call for `owner` open until [`resume`](Self::resume).
    pub fn pause(&self, owner: &str) {
        self.gates
            .entry(owner.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(0)));
    }

    /// Release all calls held for `owner`.
    pub fn resume(&self, owner: &str) {
        if let Some((_, gate)) = self.gates.remove(owner) {
            gate.close();
        }
    }

    /// Every call received so far, with the owner it was scoped to.
    pub fn calls(&self) -> Vec<(RemoteCall, OwnerId)> {
        lock(&self.calls).clone()
    }

    /// Number of calls received so far.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Number of calls of one kind received so far.
    pub fn count_of(&self, call: RemoteCall) -> usize {
        lock(&self.calls).iter().filter(|(c, _)| *c == call).count()
    }

    async fn enter(&self, call: RemoteCall, owner: &str) -> Result<()> {
        lock(&self.calls).push((call, owner.to_string()));

        let gate = self.gates.get(owner).map(|g| Arc::clone(g.value()));
        if let Some(gate) = gate {
            tracing::trace!(?call, owner, "Holding remote call");
            // Resolves with an error once the gate is closed by `resume`.
            let _ = gate.acquire().await;
        }

        if lock(&self.failing).contains(&call) {
            return Err(Error::Network(format!("injected failure for {call:?}")));
        }
        Ok(())
    }
}

fn has_favorite(tables: &Tables, owner: &str, listing: &str) -> bool {
    tables
        .favorites
        .iter()
        .any(|(o, l)| o == owner && l == listing)
}

fn favorite_ids(tables: &Tables, owner: &str) -> Vec<ListingId> {
    tables
        .favorites
        .iter()
        .filter(|(o, _)| o == owner)
        .map(|(_, l)| l.clone())
        .collect()
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn list_favorite_ids(&self, owner: &str) -> Result<Vec<ListingId>> {
        self.enter(RemoteCall::ListFavoriteIds, owner).await?;
        Ok(favorite_ids(&lock(&self.tables), owner))
    }

    async fn list_favorite_listings(&self, owner: &str) -> Result<Vec<Property>> {
        self.enter(RemoteCall::ListFavoriteListings, owner).await?;
        let tables = lock(&self.tables);
        Ok(favorite_ids(&tables, owner)
            .iter()
            .filter_map(|id| tables.catalog.get(id).cloned())
            .collect())
    }

    async fn add_favorite(&self, owner: &str, listing: &str) -> Result<bool> {
        self.enter(RemoteCall::AddFavorite, owner).await?;
        if self.is_inert(RemoteCall::AddFavorite) {
            return Ok(false);
        }
        let mut tables = lock(&self.tables);
        if !has_favorite(&tables, owner, listing) {
            tables.favorites.push((owner.to_string(), listing.to_string()));
        }
        Ok(true)
    }

    async fn remove_favorite(&self, owner: &str, listing: &str) -> Result<bool> {
        self.enter(RemoteCall::RemoveFavorite, owner).await?;
        if self.is_inert(RemoteCall::RemoveFavorite) {
            return Ok(false);
        }
        let mut tables = lock(&self.tables);
        let before = tables.favorites.len();
        tables
            .favorites
            .retain(|(o, l)| !(o == owner && l == listing));
        Ok(tables.favorites.len() < before)
    }

    async fn list_bookings(&self, owner: &str) -> Result<Vec<Booking>> {
        self.enter(RemoteCall::ListBookings, owner).await?;
        let tables = lock(&self.tables);
        let mut bookings: Vec<Booking> = tables
            .bookings
            .iter()
            .rev()
            .filter(|b| b.owner_id == owner)
            .cloned()
            .collect();
        // Stable: equal timestamps keep newest-inserted first.
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking> {
        self.enter(RemoteCall::CreateBooking, &booking.owner_id)
            .await?;
        let id = uuid::Uuid::new_v4().to_string();
        let stored = Booking::from_new(id, booking, Utc::now());
        lock(&self.tables).bookings.push(stored.clone());
        Ok(stored)
    }

    async fn update_booking_status(
        &self,
        booking: &str,
        owner: &str,
        status: BookingStatus,
    ) -> Result<bool> {
        self.enter(RemoteCall::UpdateBookingStatus, owner).await?;
        if self.is_inert(RemoteCall::UpdateBookingStatus) {
            return Ok(false);
        }
        let mut tables = lock(&self.tables);
        let target = tables
            .bookings
            .iter_mut()
            .find(|b| b.id == booking && b.owner_id == owner);

        match target {
            Some(record) if record.status.can_transition_to(status) => {
                record.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BookingDraft, Contact, Fees, ListingRef};
    use chrono::NaiveDate;

    fn property(id: &str) -> Property {
        Property::new(id, format!("Listing {id}"), "Goa", Some(10_000), "")
    }

    fn new_booking(owner: &str) -> NewBooking {
        BookingDraft::new(
            ListingRef::from(&property("a")),
            NaiveDate::from_ymd_opt(2026, 11, 12).unwrap(),
            NaiveDate::from_ymd_opt(2026, 11, 17).unwrap(),
            1,
            Contact::new("Asha", "asha@example.com", "900"),
        )
        .into_new_booking(owner, Fees::default())
        .unwrap()
    }

    #[tokio::test]
    async fn add_favorite_is_idempotent() {
        let store = MemoryRemoteStore::new();
        assert!(store.add_favorite("u1", "a").await.unwrap());
        assert!(store.add_favorite("u1", "a").await.unwrap());
        assert_eq!(store.stored_favorites("u1"), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn remove_reports_no_effect() {
        let store = MemoryRemoteStore::new();
        store.seed_favorite("u1", "a");
        assert!(!store.remove_favorite("u1", "missing").await.unwrap());
        assert!(!store.remove_favorite("u2", "a").await.unwrap());
        assert!(store.remove_favorite("u1", "a").await.unwrap());
        assert!(store.stored_favorites("u1").is_empty());
    }

    #[tokio::test]
    async fn favorite_listings_skip_unresolvable_ids() {
        let store = MemoryRemoteStore::new().with_catalog([property("a")]);
        store.seed_favorite("u1", "a");
        store.seed_favorite("u1", "gone");

        let ids = store.list_favorite_ids("u1").await.unwrap();
        let listings = store.list_favorite_listings("u1").await.unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].id, "a");
    }

    #[tokio::test]
    async fn update_is_scoped_by_owner_and_transition() {
        let store = MemoryRemoteStore::new();
        let created = store.create_booking(new_booking("u1")).await.unwrap();
        assert_eq!(created.status, BookingStatus::Upcoming);

        let foreign = store
            .update_booking_status(&created.id, "u2", BookingStatus::Cancelled)
            .await
            .unwrap();
        assert!(!foreign);

        let own = store
            .update_booking_status(&created.id, "u1", BookingStatus::Cancelled)
            .await
            .unwrap();
        assert!(own);

        let again = store
            .update_booking_status(&created.id, "u1", BookingStatus::Cancelled)
            .await
            .unwrap();
        assert!(!again);
    }

    #[tokio::test]
    async fn bookings_list_newest_first() {
        let store = MemoryRemoteStore::new();
        let first = store.create_booking(new_booking("u1")).await.unwrap();
        let second = store.create_booking(new_booking("u1")).await.unwrap();
        store.create_booking(new_booking("u2")).await.unwrap();

        let listed = store.list_bookings("u1").await.unwrap();
        let ids: Vec<_> = listed.iter().map(|b| b.id.clone()).collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn injected_failures_and_call_log() {
        let store = MemoryRemoteStore::new();
        store.fail(RemoteCall::AddFavorite);
        assert!(matches!(
            store.add_favorite("u1", "a").await,
            Err(Error::Network(_))
        ));
        store.heal(RemoteCall::AddFavorite);
        assert!(store.add_favorite("u1", "a").await.is_ok());
        assert_eq!(store.count_of(RemoteCall::AddFavorite), 2);
        assert_eq!(store.calls()[0], (RemoteCall::AddFavorite, "u1".to_string()));
    }

    #[tokio::test]
    async fn paused_owner_is_released_by_resume() {
        let store = MemoryRemoteStore::new_shared();
        store.pause("u1");

        let held = {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.add_favorite("u1", "a").await })
        };
        tokio::task::yield_now().await;
        assert!(store.stored_favorites("u1").is_empty());

        store.resume("u1");
        assert!(held.await.unwrap().unwrap());
        assert_eq!(store.stored_favorites("u1"), vec!["a".to_string()]);
    }
}
