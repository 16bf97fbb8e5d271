//! Local Projection Cache.
//!
//! Plain in-memory containers for the most recently known remote state. They
//! never fetch anything themselves; the stores decide when to replace or
//! mutate them and publish a view afterwards.

use crate::{Booking, BookingStatus, ListingId, Owner, Property};
use serde::Serialize;

/// Favorites: the authoritative id list plus best-effort resolved listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritesCache {
    /// Insertion order, no duplicates
    ids: Vec<ListingId>,
    /// Resolved catalog records, a subset of `ids` in the same relative order
    listings: Vec<Property>,
}

/// Everything the cache knows about one listing id, captured before a
/// mutation so it can be put back verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct FavoriteSlice {
    pub listing_id: ListingId,
    id_position: Option<usize>,
    listing: Option<(usize, Property)>,
}

impl FavoriteSlice {
    /// Whether the id was a favorite when the slice was taken.
    pub fn is_member(&self) -> bool {
        self.id_position.is_some()
    }
}

impl FavoritesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in freshly fetched contents.
    ///
    /// Duplicate ids are collapsed and listings whose id is not a favorite are
    /// dropped.
    pub fn replace_all(&mut self, ids: Vec<ListingId>, listings: Vec<Property>) {
        let mut unique: Vec<ListingId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }

        let mut resolved: Vec<Property> = Vec::with_capacity(listings.len());
        for listing in listings {
            if unique.contains(&listing.id) && !resolved.iter().any(|p| p.id == listing.id) {
                resolved.push(listing);
            }
        }

        self.ids = unique;
        self.listings = resolved;
    }

    pub fn ids(&self) -> &[ListingId] {
        &self.ids
    }

    pub fn listings(&self) -> &[Property] {
        &self.listings
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Add a favorite at the end. No-op if already present.
    pub fn insert(&mut self, property: Property) {
        if self.contains(&property.id) {
            return;
        }
        self.ids.push(property.id.clone());
        self.listings.push(property);
    }

    /// Remove a favorite. Returns false if it was not present.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|i| i != id);
        self.listings.retain(|p| p.id != id);
        self.ids.len() < before
    }

    /// Capture the current state of one listing id.
    pub fn slice(&self, id: &str) -> FavoriteSlice {
        FavoriteSlice {
            listing_id: id.to_string(),
            id_position: self.ids.iter().position(|i| i == id),
            listing: self
                .listings
                .iter()
                .position(|p| p.id == id)
                .map(|pos| (pos, self.listings[pos].clone())),
        }
    }

    /// Put one listing id back exactly as captured by [`slice`](Self::slice).
    pub fn restore(&mut self, slice: &FavoriteSlice) {
        self.remove(&slice.listing_id);

        if let Some(pos) = slice.id_position {
            let pos = pos.min(self.ids.len());
            self.ids.insert(pos, slice.listing_id.clone());
        }
        if let Some((pos, property)) = &slice.listing {
            let pos = (*pos).min(self.listings.len());
            self.listings.insert(pos, property.clone());
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
        self.listings.clear();
    }
}

/// Bookings in remote order, newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingsCache {
    bookings: Vec<Booking>,
}

impl BookingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, bookings: Vec<Booking>) {
        self.bookings = bookings;
    }

    pub fn bookings(&self) -> &[Booking] {
        &self.bookings
    }

    pub fn get(&self, id: &str) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn len(&self) -> usize {
        self.bookings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookings.is_empty()
    }

    /// Put a newly created booking at the front.
    pub fn prepend(&mut self, booking: Booking) {
        self.bookings.retain(|b| b.id != booking.id);
        self.bookings.insert(0, booking);
    }

    /// Change one booking's status in place. Returns false if it is not cached.
    pub fn set_status(&mut self, id: &str, status: BookingStatus) -> bool {
        match self.bookings.iter_mut().find(|b| b.id == id) {
            Some(booking) => {
                booking.status = status;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.bookings.clear();
    }
}

/// Snapshot of the favorites store handed to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoritesView {
    pub owner: Owner,
    pub ids: Vec<ListingId>,
    pub listings: Vec<Property>,
    pub loading: bool,
}

impl FavoritesView {
    pub fn is_favorite(&self, id: &str) -> bool {
        self.ids.iter().any(|i| i == id)
    }
}

/// Snapshot of the bookings store handed to subscribers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingsView {
    pub owner: Owner,
    pub bookings: Vec<Booking>,
    pub loading: bool,
}

impl BookingsView {
    pub fn get(&self, id: &str) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn property(id: &str) -> Property {
        Property::new(id, id.to_uppercase(), "Goa", Some(1_000), "")
    }

    fn cache_with(ids: &[&str]) -> FavoritesCache {
        let mut cache = FavoritesCache::new();
        cache.replace_all(
            ids.iter().map(|s| s.to_string()).collect(),
            ids.iter().map(|s| property(s)).collect(),
        );
        cache
    }

    #[test]
    fn replace_all_dedupes_and_filters() {
        let mut cache = FavoritesCache::new();
        cache.replace_all(
            vec!["a".into(), "b".into(), "a".into()],
            vec![property("b"), property("x"), property("b")],
        );
        assert_eq!(cache.ids(), ["a".to_string(), "b".to_string()]);
        assert_eq!(cache.listings().len(), 1);
        assert_eq!(cache.listings()[0].id, "b");
        assert!(cache.contains("a"));
    }

    #[test]
    fn insert_is_idempotent() {
        let mut cache = FavoritesCache::new();
        cache.insert(property("a"));
        cache.insert(property("a"));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.listings().len(), 1);
    }

    #[test]
    fn restore_puts_removed_entry_back_in_place() {
        let mut cache = cache_with(&["a", "b", "c"]);
        let slice = cache.slice("b");
        assert!(slice.is_member());

        cache.remove("b");
        assert_eq!(cache.len(), 2);

        cache.restore(&slice);
        assert_eq!(cache, cache_with(&["a", "b", "c"]));
    }

    #[test]
    fn restore_of_non_member_removes_it() {
        let mut cache = cache_with(&["a"]);
        let slice = cache.slice("z");
        assert!(!slice.is_member());

        cache.insert(property("z"));
        cache.restore(&slice);
        assert_eq!(cache, cache_with(&["a"]));
    }

    #[test]
    fn restore_clamps_positions() {
        let mut cache = cache_with(&["a", "b", "c"]);
        let slice = cache.slice("c");
        cache.clear();
        cache.restore(&slice);
        assert_eq!(cache.ids(), ["c".to_string()]);
        assert_eq!(cache.listings()[0].id, "c");
    }

    #[test]
    fn view_predicate() {
        let view = FavoritesView {
            ids: vec!["a".into()],
            ..Default::default()
        };
        assert!(view.is_favorite("a"));
        assert!(!view.is_favorite("b"));
    }
}
