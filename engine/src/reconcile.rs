//! Fencing shared by the favorites and bookings stores.
//!
//! Remote calls complete in arbitrary order. Two rules keep stale completions
//! from corrupting the cache:
//!
//! 1. **Generation**: bumped on every identity change. A completion captured
//!    under an older generation belongs to a cache that no longer exists and
//!    is discarded.
//! 2. **Refresh tickets**: within one generation, a refresh result is applied
//!    only if no later-issued refresh has already been applied.
//!
//! A refresh may read the remote store before a local mutation is confirmed
//! and land after it. Every confirmation therefore takes a new epoch, and a
//! ticket remembers the epoch it was issued at, so the store can lay the
//! mutations confirmed since then back over the fetched data.

use crate::{error::Result, Error, Owner};
use std::future::Future;
use std::time::Duration;

/// Handle for one in-flight refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    pub generation: u64,
    pub ticket: u64,
    /// Confirmation epoch when the refresh started
    pub epoch: u64,
}

/// Identity and fencing state of one store.
#[derive(Debug, Default)]
pub struct Fence {
    owner: Owner,
    generation: u64,
    issued: u64,
    applied: u64,
    /// Refreshes in flight for the current generation
    in_flight: usize,
    epoch: u64,
}

impl Fence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// True while a refresh for the current owner is outstanding.
    pub fn loading(&self) -> bool {
        self.in_flight > 0
    }

    /// Adopt `owner`. Returns true, and starts a new generation, if the
    /// identity actually changed.
    pub fn switch_owner(&mut self, owner: &Owner) -> bool {
        if &self.owner == owner {
            return false;
        }
        self.owner = owner.clone();
        self.generation += 1;
        self.in_flight = 0;
        tracing::debug!(owner = %self.owner, generation = self.generation, "Identity changed");
        true
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued += 1;
        self.in_flight += 1;
        RefreshTicket {
            generation: self.generation,
            ticket: self.issued,
            epoch: self.epoch,
        }
    }

    /// Record that the remote store confirmed a mutation. Returns its epoch;
    /// any refresh whose ticket carries a lower epoch may predate it.
    pub fn confirm(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Mark a refresh as finished. Returns whether its result may be applied.
    pub fn finish_refresh(&mut self, ticket: RefreshTicket) -> bool {
        if !self.is_current(ticket.generation) {
            return false;
        }
        self.in_flight = self.in_flight.saturating_sub(1);
        if ticket.ticket <= self.applied {
            return false;
        }
        self.applied = ticket.ticket;
        true
    }
}

/// Run a remote call, reporting `NetworkTimeout` if it exceeds `limit`.
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(Error::NetworkTimeout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switching_owner_bumps_generation() {
        let mut fence = Fence::new();
        assert_eq!(fence.generation(), 0);
        assert!(!fence.switch_owner(&Owner::Anonymous));

        assert!(fence.switch_owner(&Owner::user("u1")));
        assert_eq!(fence.generation(), 1);
        assert!(!fence.switch_owner(&Owner::user("u1")));

        assert!(fence.switch_owner(&Owner::Anonymous));
        assert_eq!(fence.generation(), 2);
    }

    #[test]
    fn stale_generation_is_not_applied() {
        let mut fence = Fence::new();
        fence.switch_owner(&Owner::user("a"));
        let first = fence.begin_refresh();
        assert!(fence.loading());

        fence.switch_owner(&Owner::user("b"));
        assert!(!fence.loading());
        let second = fence.begin_refresh();

        assert!(!fence.finish_refresh(first));
        assert!(fence.loading());
        assert!(fence.finish_refresh(second));
        assert!(!fence.loading());
    }

    #[test]
    fn older_ticket_loses_to_newer_applied() {
        let mut fence = Fence::new();
        fence.switch_owner(&Owner::user("a"));
        let older = fence.begin_refresh();
        let newer = fence.begin_refresh();

        assert!(fence.finish_refresh(newer));
        assert!(!fence.finish_refresh(older));
        assert!(!fence.loading());
    }

    #[test]
    fn tickets_capture_confirmation_epoch() {
        let mut fence = Fence::new();
        fence.switch_owner(&Owner::user("a"));
        let before = fence.begin_refresh();
        let confirmed = fence.confirm();
        let after = fence.begin_refresh();

        assert!(confirmed > before.epoch);
        assert_eq!(after.epoch, confirmed);
    }

    #[tokio::test]
    async fn timeout_reports_network_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(())
        };
        let result = with_timeout(Duration::from_millis(10), slow).await;
        assert_eq!(result, Err(Error::NetworkTimeout));

        let fast = with_timeout(Duration::from_secs(1), async { Ok(5) }).await;
        assert_eq!(fast, Ok(5));
    }
}
