//! Bookings store.
//!
//! Bookings are never created optimistically: the id comes from the remote
//! store, so the cache only learns about a booking once it exists remotely.
//! Cancellation is scoped by owner on the remote side and only reflected
//! locally once the remote store reports that a record actually changed.
//!
//! Both kinds of confirmed change are kept with their confirmation epoch until
//! a refresh that started after them lands, so a refresh that fetched before
//! the change cannot undo it.

use crate::cache::{BookingsCache, BookingsView};
use crate::notify::{Notifier, SubscriptionId};
use crate::reconcile::{with_timeout, Fence};
use crate::{
    error::Result, Booking, BookingDraft, BookingId, BookingStatus, Error, Owner, RemoteStore,
    SyncConfig,
};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// A change the remote store confirmed.
#[derive(Debug, Clone)]
enum Settled {
    Created(Booking),
    Status(BookingId, BookingStatus),
}

#[derive(Debug, Default)]
struct State {
    fence: Fence,
    cache: BookingsCache,
    version: u64,
    /// Confirmed changes not yet covered by an applied refresh, oldest first
    settled: Vec<(u64, Settled)>,
}

impl State {
    fn view(&self) -> BookingsView {
        BookingsView {
            owner: self.fence.owner().clone(),
            bookings: self.cache.bookings().to_vec(),
            loading: self.fence.loading(),
        }
    }

    fn adopt(&mut self, owner: &Owner) -> bool {
        let changed = self.fence.switch_owner(owner);
        if changed {
            self.cache.clear();
            self.settled.clear();
        }
        changed
    }

    fn settle(&mut self, change: Settled) {
        let epoch = self.fence.confirm();
        self.settled.push((epoch, change));
    }

    /// Replace the cache with fetched data, then replay the changes confirmed
    /// after the refresh started.
    fn apply_refresh(&mut self, since: u64, bookings: Vec<Booking>) {
        self.cache.replace_all(bookings);
        self.settled.retain(|(epoch, _)| *epoch > since);
        for (_, change) in &self.settled {
            match change {
                Settled::Created(booking) => {
                    if self.cache.get(&booking.id).is_none() {
                        self.cache.prepend(booking.clone());
                    }
                }
                Settled::Status(id, status) => {
                    self.cache.set_status(id, *status);
                }
            }
        }
    }
}

/// Bookings for the current owner, kept in sync with a [`RemoteStore`].
pub struct BookingsStore<R> {
    remote: Arc<R>,
    config: SyncConfig,
    state: Mutex<State>,
    notifier: Notifier<BookingsView>,
}

impl<R: RemoteStore> BookingsStore<R> {
    pub fn new(remote: Arc<R>, config: SyncConfig) -> Self {
        Self {
            remote,
            config,
            state: Mutex::new(State::default()),
            notifier: Notifier::new(BookingsView::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

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

    pub fn snapshot(&self) -> BookingsView {
        self.lock().view()
    }

    /// Cached bookings, newest first.
    pub fn bookings(&self) -> Vec<Booking> {
        self.lock().cache.bookings().to_vec()
    }

    pub fn booking(&self, id: &str) -> Option<Booking> {
        self.lock().cache.get(id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().fence.loading()
    }

    pub fn owner(&self) -> Owner {
        self.lock().fence.owner().clone()
    }

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&Arc<BookingsView>) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.notifier.unsubscribe(id)
    }

    pub fn watch(&self) -> watch::Receiver<Arc<BookingsView>> {
        self.notifier.watch()
    }

    /// Rebuild the cache for `owner` from the remote store.
    ///
    /// Same contract as the favorites refresh: anonymous clears, failures keep
    /// the previous contents, superseded results are dropped, and a failure
    /// for a previous identity is not reported.
    pub async fn refresh(&self, owner: &Owner) -> Result<()> {
        let started = self.mutate(|state| {
            state.adopt(owner);
            match owner.id() {
                None => {
                    state.cache.clear();
                    state.settled.clear();
                    (None, true)
                }
                Some(id) => (Some((id.clone(), state.fence.begin_refresh())), true),
            }
        });
        let Some((owner_id, ticket)) = started else {
            return Ok(());
        };

        tracing::debug!(owner = %owner_id, ticket = ticket.ticket, "Refreshing bookings");
        let fetched = with_timeout(
            self.config.request_timeout,
            self.remote.list_bookings(&owner_id),
        )
        .await;

        self.mutate(|state| {
            let apply = state.fence.finish_refresh(ticket);
            let result = match fetched {
                Ok(bookings) if apply => {
                    tracing::info!(owner = %owner_id, bookings = bookings.len(), "Bookings refreshed");
                    state.apply_refresh(ticket.epoch, bookings);
                    Ok(())
                }
                Ok(_) => {
                    tracing::debug!(owner = %owner_id, "Discarding superseded bookings refresh");
                    Ok(())
                }
                Err(err) if state.fence.is_current(ticket.generation) => {
                    tracing::warn!(owner = %owner_id, error = %err, "Bookings refresh failed");
                    Err(err)
                }
                Err(err) => {
                    tracing::debug!(owner = %owner_id, error = %err, "Ignoring failed refresh for a previous identity");
                    Ok(())
                }
            };
            (result, true)
        })
    }

    /// Persist a new booking for `owner` and put it at the front of the cache.
    ///
    /// The draft's status is ignored; every new booking is `Upcoming`.
    pub async fn add_booking(&self, owner: &Owner, draft: BookingDraft) -> Result<Booking> {
        let Some(owner_id) = owner.id() else {
            tracing::warn!("Refusing to book without a signed-in owner");
            return Err(Error::NotAuthenticated);
        };
        let new = draft.into_new_booking(owner_id.clone(), self.config.fees)?;

        let generation = self.mutate(|state| {
            let changed = state.adopt(owner);
            (state.fence.generation(), changed)
        });

        let created = with_timeout(
            self.config.request_timeout,
            self.remote.create_booking(new),
        )
        .await;

        match created {
            Ok(booking) => {
                tracing::info!(
                    owner = %owner_id,
                    booking = %booking.id,
                    total = booking.pricing.total,
                    "Booking created"
                );
                self.mutate(|state| {
                    if !state.fence.is_current(generation) {
                        return ((), false);
                    }
                    state.settle(Settled::Created(booking.clone()));
                    state.cache.prepend(booking.clone());
                    ((), true)
                });
                Ok(booking)
            }
            Err(err) => {
                tracing::warn!(owner = %owner_id, error = %err, "Booking creation failed");
                Err(err)
            }
        }
    }

    /// Cancel one of `owner`'s bookings.
    ///
    /// The cached entry stays visible with status `Cancelled`. A remote store
    /// that reports no change (unknown booking, someone else's booking, or one
    /// no longer upcoming) yields `NoEffect` and leaves the cache untouched.
    pub async fn cancel_booking(&self, owner: &Owner, booking_id: &str) -> Result<()> {
        let Some(owner_id) = owner.id() else {
            return Err(Error::NotAuthenticated);
        };

        let checked = self.mutate(|state| {
            let changed = state.adopt(owner);
            let allowed = match state.cache.get(booking_id) {
                Some(booking) => booking.status.transition(BookingStatus::Cancelled).map(|_| ()),
                None => Ok(()),
            };
            (allowed.map(|_| state.fence.generation()), changed)
        });
        let generation = checked?;

        let updated = with_timeout(
            self.config.request_timeout,
            self.remote
                .update_booking_status(booking_id, owner_id, BookingStatus::Cancelled),
        )
        .await;

        match updated {
            Ok(true) => {
                tracing::info!(owner = %owner_id, booking = %booking_id, "Booking cancelled");
                self.mutate(|state| {
                    if !state.fence.is_current(generation) {
                        return ((), false);
                    }
                    state.settle(Settled::Status(
                        booking_id.to_string(),
                        BookingStatus::Cancelled,
                    ));
                    ((), state.cache.set_status(booking_id, BookingStatus::Cancelled))
                });
                Ok(())
            }
            Ok(false) => {
                tracing::warn!(owner = %owner_id, booking = %booking_id, "Cancellation matched no booking");
                Err(Error::NoEffect)
            }
            Err(err) => {
                tracing::warn!(owner = %owner_id, booking = %booking_id, error = %err, "Cancellation failed");
                Err(err)
            }
        }
    }
}

impl<R> std::fmt::Debug for BookingsStore<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookingsStore")
            .field("notifier", &self.notifier)
            .finish_non_exhaustive()
    }
}
