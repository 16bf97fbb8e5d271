//! Favorites store.
//!
//! Toggling a favorite is optimistic: the cache flips immediately, subscribers
//! are notified, and only then is the remote store asked to follow. A failed
//! or ineffective remote call puts the listing back exactly as it was.
//!
//! Toggles on the same listing id are sequenced. Each call is tagged with a
//! sequence number and waits for its predecessor's remote call before issuing
//! its own, so remote calls for one id never overlap. Per id the store tracks
//! the last state the remote store confirmed; a call whose intended state
//! already matches it finishes without a remote call, and only the newest call
//! on an id may revert the cache.
//!
//! Confirmed slices are also kept with their confirmation epoch until a
//! refresh that started after them has landed. A refresh that read the remote
//! store before a toggle was confirmed re-applies that toggle on top of what it
//! fetched.

use crate::cache::{FavoriteSlice, FavoritesCache, FavoritesView};
use crate::notify::{Notifier, SubscriptionId};
use crate::reconcile::{with_timeout, Fence};
use crate::{error::Result, Error, ListingId, Owner, Property, RemoteStore, SyncConfig};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};

/// An optimistic toggle waiting for the remote store.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub generation: u64,
    pub seq: u64,
    /// Cache slice before the toggle
    pub before: FavoriteSlice,
    /// Cache slice the toggle intends to reach
    pub after: FavoriteSlice,
}

impl PendingMutation {
    pub fn listing_id(&self) -> &str {
        &self.before.listing_id
    }

    /// Whether this toggle adds the listing.
    pub fn adds(&self) -> bool {
        self.after.is_member()
    }
}

/// Per-listing bookkeeping while toggles are outstanding.
#[derive(Debug)]
struct InFlight {
    /// Sequence number of the newest toggle on this id
    latest: u64,
    /// Last slice the remote store is known to hold
    confirmed: FavoriteSlice,
    /// Slice the newest toggle intends to reach
    intended: FavoriteSlice,
    /// Completion signal of the newest toggle; the next one waits on it
    tail: Option<oneshot::Receiver<()>>,
}

/// What a toggle does after its optimistic step.
enum Plan {
    /// Anonymous: already final, holds the new membership
    Local(bool),
    Remote {
        owner_id: String,
        mutation: PendingMutation,
        predecessor: Option<oneshot::Receiver<()>>,
        done: oneshot::Sender<()>,
    },
}

#[derive(Debug, Default)]
struct State {
    fence: Fence,
    cache: FavoritesCache,
    version: u64,
    next_seq: u64,
    in_flight: HashMap<ListingId, InFlight>,
    /// Confirmed slices not yet covered by an applied refresh
    settled: HashMap<ListingId, (u64, FavoriteSlice)>,
}

impl State {
    fn view(&self) -> FavoritesView {
        FavoritesView {
            owner: self.fence.owner().clone(),
            ids: self.cache.ids().to_vec(),
            listings: self.cache.listings().to_vec(),
            loading: self.fence.loading(),
        }
    }

    /// Adopt `owner`, discarding everything cached for the previous one.
    fn adopt(&mut self, owner: &Owner) {
        if self.fence.switch_owner(owner) {
            self.cache.clear();
            self.in_flight.clear();
            self.settled.clear();
        }
    }

    /// Replace the cache with fetched data, keeping every local change the
    /// fetch may not have seen: toggles confirmed after the refresh started,
    /// then toggles still in flight.
    fn apply_refresh(&mut self, since: u64, ids: Vec<ListingId>, listings: Vec<Property>) {
        self.cache.replace_all(ids, listings);
        self.settled.retain(|_, (epoch, _)| *epoch > since);
        let mut replay: Vec<_> = self.settled.values().collect();
        replay.sort_by_key(|(epoch, _)| *epoch);
        for (_, slice) in replay {
            self.cache.restore(slice);
        }
        for (id, pending) in self.in_flight.iter_mut() {
            pending.confirmed = self.cache.slice(id);
            self.cache.restore(&pending.intended);
        }
    }
}

/// Favorites for the current owner, kept in sync with a [`RemoteStore`].
pub struct FavoritesStore<R> {
    remote: Arc<R>,
    config: SyncConfig,
    state: Mutex<State>,
    notifier: Notifier<FavoritesView>,
}

impl<R: RemoteStore> FavoritesStore<R> {
    pub fn new(remote: Arc<R>, config: SyncConfig) -> Self {
        Self {
            remote,
            config,
            state: Mutex::new(State::default()),
            notifier: Notifier::new(FavoritesView::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `change` under the state lock and publish the result if it
    /// reports a change. Subscribers run after the lock is released.
    fn mutate<T>(&self, change: impl FnOnce(&mut State) -> (T, bool)) -> T {
        let (out, published) = {
            let mut state = self.lock();
            let (out, changed) = change(&mut state);
            if !changed {
                return out;
            }
            state.version += 1;
            (out, (state.version, Arc::new(state.view())))
        };
        self.notifier.publish(published.0, published.1);
        out
    }

    // Read side

    /// Current snapshot, straight from the cache.
    pub fn snapshot(&self) -> FavoritesView {
        self.lock().view()
    }

    /// Resolved favorite listings, in insertion order.
    pub fn favorites(&self) -> Vec<Property> {
        self.lock().cache.listings().to_vec()
    }

    /// Favorited ids, in insertion order.
    pub fn favorite_ids(&self) -> Vec<ListingId> {
        self.lock().cache.ids().to_vec()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.lock().cache.contains(id)
    }

    pub fn is_loading(&self) -> bool {
        self.lock().fence.loading()
    }

    pub fn owner(&self) -> Owner {
        self.lock().fence.owner().clone()
    }

    // Subscriptions

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<FavoritesView>) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn watch(&self) -> watch::Receiver<Arc<FavoritesView>> {
        self.notifier.watch()
    }

    // Reconciliation

    /// Rebuild the cache for `owner` from the remote store.
    ///
    /// Anonymous owners get an empty cache and no remote call. On failure the
    /// previous contents stay in place and the error is returned. A result
    /// that was overtaken by a newer refresh is dropped, and one overtaken by
    /// an identity change is dropped silently even if it failed.
    pub async fn refresh(&self, owner: &Owner) -> Result<()> {
        let started = self.mutate(|state| {
            state.adopt(owner);
            match owner.id() {
                None => {
                    state.cache.clear();
                    state.in_flight.clear();
                    state.settled.clear();
                    (None, true)
                }
                Some(id) => (Some((id.clone(), state.fence.begin_refresh())), true),
            }
        });
        let Some((owner_id, ticket)) = started else {
            tracing::debug!("Cleared anonymous favorites");
            return Ok(());
        };

        tracing::debug!(owner = %owner_id, ticket = ticket.ticket, "Refreshing favorites");
        let fetched = with_timeout(self.config.request_timeout, async {
            futures::try_join!(
                self.remote.list_favorite_ids(&owner_id),
                self.remote.list_favorite_listings(&owner_id),
            )
        })
        .await;

        self.mutate(|state| {
            let apply = state.fence.finish_refresh(ticket);
            match fetched {
                Ok((ids, listings)) if apply => {
                    state.apply_refresh(ticket.epoch, ids, listings);
                    tracing::info!(
                        owner = %owner_id,
                        favorites = state.cache.len(),
                        "Favorites refreshed"
                    );
                    (Ok(()), true)
                }
                Ok(_) => {
                    tracing::debug!(owner = %owner_id, "Discarding superseded favorites refresh");
                    (Ok(()), true)
                }
                Err(err) if state.fence.is_current(ticket.generation) => {
                    tracing::warn!(owner = %owner_id, error = %err, "Favorites refresh failed");
                    (Err(err), true)
                }
                Err(err) => {
                    tracing::debug!(owner = %owner_id, error = %err, "Ignoring failed refresh for a previous identity");
                    (Ok(()), false)
                }
            }
        })
    }

    /// Flip `property` in or out of the favorites of `owner`.
    ///
    /// Returns the new membership once the remote store agrees. On failure the
    /// cache is reverted and the error returned. Anonymous toggles only touch
    /// the local cache.
    pub async fn toggle_favorite(&self, owner: &Owner, property: Property) -> Result<bool> {
        let listing_id = property.id.clone();

        let plan = self.mutate(|state| {
            state.adopt(owner);

            let before = state.cache.slice(&listing_id);
            if before.is_member() {
                state.cache.remove(&listing_id);
            } else {
                state.cache.insert(property);
            }
            let after = state.cache.slice(&listing_id);

            let Some(owner_id) = owner.id() else {
                return (Plan::Local(after.is_member()), true);
            };

            state.next_seq += 1;
            let mutation = PendingMutation {
                generation: state.fence.generation(),
                seq: state.next_seq,
                before: before.clone(),
                after: after.clone(),
            };

            let (done, tail) = oneshot::channel();
            let predecessor = match state.in_flight.get_mut(&listing_id) {
                Some(pending) => {
                    pending.latest = mutation.seq;
                    pending.intended = after;
                    pending.tail.replace(tail)
                }
                None => {
                    state.in_flight.insert(
                        listing_id.clone(),
                        InFlight {
                            latest: mutation.seq,
                            confirmed: before,
                            intended: after,
                            tail: Some(tail),
                        },
                    );
                    None
                }
            };

            let plan = Plan::Remote {
                owner_id: owner_id.clone(),
                mutation,
                predecessor,
                done,
            };
            (plan, true)
        });

        let (owner_id, mutation, predecessor, done) = match plan {
            Plan::Local(member) => {
                tracing::debug!(listing = %listing_id, member, "Toggled anonymous favorite");
                return Ok(member);
            }
            Plan::Remote {
                owner_id,
                mutation,
                predecessor,
                done,
            } => (owner_id, mutation, predecessor, done),
        };

        if let Some(predecessor) = predecessor {
            // A dropped sender also means the predecessor is finished.
            let _ = predecessor.await;
        }

        let outcome = self.push_toggle(&owner_id, &mutation).await;
        let result = self.settle(&mutation, outcome);
        let _ = done.send(());
        result
    }

    /// Issue the remote call for one toggle, unless the remote store already
    /// holds the intended state.
    async fn push_toggle(&self, owner_id: &str, mutation: &PendingMutation) -> Result<()> {
        let already_there = {
            let state = self.lock();
            state.fence.is_current(mutation.generation)
                && state
                    .in_flight
                    .get(mutation.listing_id())
                    .is_some_and(|p| p.confirmed.is_member() == mutation.adds())
        };
        if already_there {
            tracing::debug!(
                listing = %mutation.listing_id(),
                seq = mutation.seq,
                "Remote already holds intended favorite state"
            );
            return Ok(());
        }

        let listing = mutation.listing_id();
        let call = async {
            if mutation.adds() {
                self.remote.add_favorite(owner_id, listing).await
            } else {
                self.remote.remove_favorite(owner_id, listing).await
            }
        };
        match with_timeout(self.config.request_timeout, call).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(Error::NoEffect),
            Err(err) => Err(err),
        }
    }

    /// Confirm or revert one toggle after its remote call finished.
    fn settle(&self, mutation: &PendingMutation, outcome: Result<()>) -> Result<bool> {
        let listing_id = mutation.listing_id().to_string();

        self.mutate(|state| {
            if !state.fence.is_current(mutation.generation) {
                tracing::debug!(listing = %listing_id, "Dropping toggle from a previous identity");
                return (outcome.map(|_| mutation.adds()), false);
            }
            let Some(pending) = state.in_flight.get_mut(&listing_id) else {
                return (outcome.map(|_| mutation.adds()), false);
            };

            if outcome.is_ok() {
                pending.confirmed = mutation.after.clone();
                let epoch = state.fence.confirm();
                state
                    .settled
                    .insert(listing_id.clone(), (epoch, mutation.after.clone()));
            }

            if pending.latest != mutation.seq {
                return (outcome.map(|_| mutation.adds()), false);
            }

            let confirmed = pending.confirmed.clone();
            state.in_flight.remove(&listing_id);

            match outcome {
                Ok(()) => {
                    tracing::debug!(listing = %listing_id, member = mutation.adds(), "Favorite confirmed");
                    (Ok(mutation.adds()), false)
                }
                Err(err) => {
                    tracing::warn!(listing = %listing_id, error = %err, "Favorite toggle failed, reverting");
                    state.cache.restore(&confirmed);
                    (Err(err), true)
                }
            }
        })
    }
}

impl<R> std::fmt::Debug for FavoritesStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FavoritesStore")
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}
