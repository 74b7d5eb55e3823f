//! Single-flight token refresh
//!
//! Any number of requests may discover an expired access token at the same
//! time. The first one to ask starts the refresh and publishes it as a shared
//! future; everyone arriving while it is outstanding awaits that same future
//! and observes the same outcome. The slot is emptied before the outcome is
//! handed to waiters, so the next expiry starts a fresh refresh.

use crate::error::ClientError;
use crate::token_store::TokenPair;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// Outcome delivered to every caller of one refresh
pub type RefreshOutcome = Result<TokenPair, ClientError>;

type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

/// Coordinates token refreshes so that at most one is in flight
#[derive(Clone, Default)]
pub struct RefreshCoordinator {
    in_flight: Arc<Mutex<Option<SharedRefresh>>>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a refresh is currently outstanding
    pub fn is_refreshing(&self) -> bool {
        lock(&self.in_flight).is_some()
    }

    /// Run `start` unless a refresh is already in flight, and await the outcome
    ///
    /// `start` is only invoked by the caller that moves the coordinator from
    /// idle to refreshing; it must perform the whole refresh, including any
    /// token store update, since it runs exactly once per refresh.
    pub async fn run<F, Fut>(&self, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let refresh = {
            let mut slot = lock(&self.in_flight);
            if let Some(existing) = slot.as_ref() {
                debug!("Joining in-flight token refresh");
                existing.clone()
            } else {
                debug!("Starting token refresh");
                let state = Arc::clone(&self.in_flight);
                let operation = start();
                let refresh = async move {
                    let outcome = operation.await;
                    lock(&state).take();
                    outcome
                }
                .boxed()
                .shared();
                *slot = Some(refresh.clone());
                refresh
            }
        };

        refresh.await
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

fn lock(slot: &Mutex<Option<SharedRefresh>>) -> MutexGuard<'_, Option<SharedRefresh>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
