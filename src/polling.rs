//! Per-view polling store.
//!
//! A [`PollingStore`] owns the fetch lifecycle of one view: it fans out to the
//! view's endpoints through a [`ResourceSet`], keeps the last good snapshot
//! visible while a refresh is in flight, and re-fetches on a fixed interval
//! while the view is mounted.
//!
//! # Overlapping refreshes
//!
//! Every refresh takes a ticket (sequence number + mount epoch) when it is
//! issued. A completion only commits if its ticket is still the latest issued
//! and the view is still mounted under the same epoch. Out-of-order and
//! post-unmount completions are dropped, so the snapshot always reflects the
//! most recently *issued* fetch.

use crate::errors::{DashboardError, ResultExt};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// The endpoints one view needs, fetched together as a single cycle.
///
/// Implementations issue their calls concurrently and return only after all
/// of them have settled.
pub trait ResourceSet: Send + Sync + 'static {
    type Snapshot: Clone + Send + Sync + 'static;

    /// View name used in logs and timeout errors.
    fn name(&self) -> &'static str;

    fn fetch(&self) -> impl Future<Output = Result<Self::Snapshot, DashboardError>> + Send;
}

/// What a view reads from its store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreState<T> {
    /// Last committed snapshot. Never cleared by a refresh.
    pub data: Option<T>,
    /// A fetch is in flight.
    pub loading: bool,
    /// Message from the most recent failed cycle; cleared on success.
    pub error: Option<String>,
    /// When `data` was last committed.
    pub revision: Option<DateTime<Utc>>,
}

impl<T> Default for StoreState<T> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
            revision: None,
        }
    }
}

/// How a view should render a store state.
#[derive(Debug, PartialEq)]
pub enum Phase<'a, T> {
    /// No snapshot yet and nothing has failed (or a retry is running).
    Loading,
    /// First load failed; render the error screen with a retry control.
    Failed(&'a str),
    /// Content is available, possibly stale.
    Ready {
        data: &'a T,
        refreshing: bool,
        last_error: Option<&'a str>,
    },
}

impl<T> StoreState<T> {
    pub fn phase(&self) -> Phase<'_, T> {
        match (&self.data, &self.error) {
            (Some(data), _) => Phase::Ready {
                data,
                refreshing: self.loading,
                last_error: self.error.as_deref(),
            },
            (None, Some(error)) if !self.loading => Phase::Failed(error),
            _ => Phase::Loading,
        }
    }
}

/// Result of one refresh call, as seen by the caller.
///
/// Failures never surface as `Err`; they land in [`StoreState::error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshOutcome {
    /// New snapshot committed.
    Committed,
    /// Cycle failed; error recorded, previous data kept.
    Failed,
    /// A later refresh was issued before this one settled.
    Superseded,
    /// The view was unmounted (or remounted) while the fetch was in flight.
    Discarded,
    /// The store is not mounted; nothing was fetched.
    Skipped,
}

#[derive(Debug, Clone, Copy)]
struct Ticket {
    seq: u64,
    epoch: u64,
}

#[derive(Debug, Default)]
struct Ledger {
    issued: u64,
    epoch: u64,
    mounted: bool,
}

struct Shared<R: ResourceSet> {
    resources: R,
    timeout: Duration,
    ledger: Mutex<Ledger>,
    state: watch::Sender<StoreState<R::Snapshot>>,
}

impl<R: ResourceSet> Shared<R> {
    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn refresh(&self) -> RefreshOutcome {
        let Some(ticket) = self.issue() else {
            tracing::debug!("{}: refresh skipped, view not mounted", self.resources.name());
            return RefreshOutcome::Skipped;
        };

        tracing::debug!("{}: fetch #{} issued", self.resources.name(), ticket.seq);
        let in_flight = InFlight {
            shared: self,
            ticket,
            settled: false,
        };
        let outcome = match tokio::time::timeout(self.timeout, self.resources.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(DashboardError::Timeout {
                resource: self.resources.name().to_string(),
                after: self.timeout,
            }),
        }
        .with_context(|| format!("{} refresh #{}", self.resources.name(), ticket.seq));

        in_flight.settle(outcome)
    }

    fn issue(&self) -> Option<Ticket> {
        let mut ledger = self.ledger();
        if !ledger.mounted {
            return None;
        }
        ledger.issued += 1;
        let ticket = Ticket {
            seq: ledger.issued,
            epoch: ledger.epoch,
        };
        self.state.send_modify(|state| state.loading = true);
        Some(ticket)
    }

    fn commit(
        &self,
        ticket: Ticket,
        outcome: Result<R::Snapshot, DashboardError>,
    ) -> RefreshOutcome {
        let name = self.resources.name();
        let ledger = self.ledger();

        if !ledger.mounted || ledger.epoch != ticket.epoch {
            tracing::debug!("{}: fetch #{} settled after unmount, discarded", name, ticket.seq);
            return RefreshOutcome::Discarded;
        }
        if ledger.issued != ticket.seq {
            tracing::debug!(
                "{}: fetch #{} superseded by #{}, discarded",
                name,
                ticket.seq,
                ledger.issued
            );
            return RefreshOutcome::Superseded;
        }

        match outcome {
            Ok(snapshot) => {
                self.state.send_modify(|state| {
                    state.data = Some(snapshot);
                    state.error = None;
                    state.loading = false;
                    state.revision = Some(Utc::now());
                });
                tracing::debug!("{}: fetch #{} committed", name, ticket.seq);
                RefreshOutcome::Committed
            }
            Err(err) => {
                let message = err.user_message();
                self.state.send_modify(|state| {
                    if state.data.is_some() {
                        tracing::warn!(
                            "{}: refresh failed, keeping last good snapshot: {}",
                            name,
                            err
                        );
                    } else {
                        tracing::error!("{}: initial load failed: {}", name, err);
                    }
                    state.error = Some(message);
                    state.loading = false;
                });
                RefreshOutcome::Failed
            }
        }
    }
}

/// An issued ticket whose fetch has not settled yet.
///
/// If the refresh future is dropped first (client disconnect, aborted task),
/// the latest ticket clears `loading` so the view does not stay in its
/// loading phase until the next cycle.
struct InFlight<'a, R: ResourceSet> {
    shared: &'a Shared<R>,
    ticket: Ticket,
    settled: bool,
}

impl<R: ResourceSet> InFlight<'_, R> {
    fn settle(mut self, outcome: Result<R::Snapshot, DashboardError>) -> RefreshOutcome {
        self.settled = true;
        self.shared.commit(self.ticket, outcome)
    }
}

impl<R: ResourceSet> Drop for InFlight<'_, R> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let ledger = self.shared.ledger();
        if ledger.mounted && ledger.epoch == self.ticket.epoch && ledger.issued == self.ticket.seq {
            tracing::debug!(
                "{}: fetch #{} abandoned",
                self.shared.resources.name(),
                self.ticket.seq
            );
            self.shared.state.send_modify(|state| state.loading = false);
        }
    }
}

/// Fetch lifecycle and refresh timer for one view.
///
/// Share it behind an `Arc`; [`PollingStore::mount`] ties the timer to a guard's
/// lifetime.
pub struct PollingStore<R: ResourceSet> {
    shared: Arc<Shared<R>>,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl<R: ResourceSet> PollingStore<R> {
    /// Creates an unmounted store.
    ///
    /// # Arguments
    ///
    /// * `resources` - The view's endpoint set.
    /// * `interval` - Time between timer-driven refreshes.
    /// * `timeout` - Upper bound on one whole fetch cycle.
    pub fn new(resources: R, interval: Duration, timeout: Duration) -> Self {
        let (state, _) = watch::channel(StoreState::default());
        Self {
            shared: Arc::new(Shared {
                resources,
                timeout,
                ledger: Mutex::new(Ledger::default()),
                state,
            }),
            interval,
            timer: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &'static str {
        self.shared.resources.name()
    }

    pub fn resources(&self) -> &R {
        &self.shared.resources
    }

    pub fn is_mounted(&self) -> bool {
        self.shared.ledger().mounted
    }

    /// Mounts the view: the first fetch fires immediately, then every `interval`.
    ///
    /// Calling `start` on a mounted store is a no-op, so remounts never stack timers.
    pub fn start(&self) {
        let mut timer = self.timer.lock().unwrap_or_else(|p| p.into_inner());
        if timer.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("{}: already mounted", self.name());
            return;
        }

        {
            let mut ledger = self.shared.ledger();
            ledger.mounted = true;
            ledger.epoch += 1;
        }

        let shared = Arc::clone(&self.shared);
        let interval = self.interval;
        *timer = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                shared.refresh().await;
            }
        }));

        tracing::info!(
            "{}: mounted, polling every {}s",
            self.name(),
            self.interval.as_secs_f64()
        );
    }

    /// Unmounts the view: cancels the timer and invalidates every in-flight fetch.
    ///
    /// The last snapshot is kept so a later remount renders it straight away.
    pub fn stop(&self) {
        let handle = self.timer.lock().unwrap_or_else(|p| p.into_inner()).take();
        if let Some(handle) = handle {
            handle.abort();
        }

        let was_mounted = {
            let mut ledger = self.shared.ledger();
            let was_mounted = ledger.mounted;
            ledger.mounted = false;
            ledger.epoch += 1;
            was_mounted
        };
        self.shared.state.send_modify(|state| state.loading = false);

        if was_mounted {
            tracing::info!("{}: unmounted", self.name());
        }
    }

    /// Runs one fetch cycle now (manual refresh or retry).
    pub async fn refresh(&self) -> RefreshOutcome {
        self.shared.refresh().await
    }

    pub fn snapshot(&self) -> StoreState<R::Snapshot> {
        self.shared.state.borrow().clone()
    }

    /// Change notifications for every state transition.
    pub fn subscribe(&self) -> watch::Receiver<StoreState<R::Snapshot>> {
        self.shared.state.subscribe()
    }

    /// Starts the store and returns a guard that stops it when dropped.
    pub fn mount(self: &Arc<Self>) -> Mounted<R> {
        self.start();
        Mounted {
            store: Arc::clone(self),
        }
    }
}

impl<R: ResourceSet> Drop for PollingStore<R> {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().ok().and_then(|t| t.take()) {
            handle.abort();
        }
    }
}

/// A mounted view. Dropping it unmounts the store.
pub struct Mounted<R: ResourceSet> {
    store: Arc<PollingStore<R>>,
}

impl<R: ResourceSet> Mounted<R> {
    pub fn store(&self) -> &Arc<PollingStore<R>> {
        &self.store
    }
}

impl<R: ResourceSet> Drop for Mounted<R> {
    fn drop(&mut self) {
        self.store.stop();
    }
}
