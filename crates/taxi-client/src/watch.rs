//! Trip reconciliation.
//!
//! A customer has no guaranteed push channel, so their view of the latest
//! trip is kept fresh by re-reading it and diffing against what they last
//! saw. What prompts the re-read is pluggable: a fixed-interval
//! [`PollTrigger`], a [`PushTrigger`] over any notification stream, or a
//! [`FallbackTrigger`] that takes pushes while the feed is up and keeps
//! polling underneath. All of them end up in the same [`reconcile`] call, so
//! correctness never depends on a notification arriving.
//!
//! A failed re-read is not an error for the watcher: the last good view is
//! kept and the next trigger tries again.

use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use taxi_core::TripRequest;

use crate::client::TaxiClient;
use crate::error::ClientError;
use crate::session::CustomerSession;
use crate::types::PublicDriver;

/// Shortest poll period accepted.
const MIN_POLL_PERIOD: Duration = Duration::from_millis(100);

/// Something that can read the customer's latest trip.
#[async_trait]
pub trait TripSource: Send + Sync {
    /// Read the latest trip.
    async fn fetch_latest(&self) -> Result<Option<TripRequest>, ClientError>;
}

#[async_trait]
impl TripSource for CustomerSession {
    async fn fetch_latest(&self) -> Result<Option<TripRequest>, ClientError> {
        self.latest_trip().await
    }
}

/// Decides when the watcher re-reads.
#[async_trait]
pub trait RefreshTrigger: Send {
    /// Wait until a re-read is due. Returns `false` once no more will come.
    async fn ready(&mut self) -> bool;
}

/// Re-read on a fixed interval.
///
/// Ticks missed while a read was in flight are not replayed in a burst: the
/// schedule shifts instead, so reads never pile up.
#[derive(Debug)]
pub struct PollTrigger {
    period: Duration,
    interval: Option<Interval>,
}

impl PollTrigger {
    /// Poll every `period` (at least 100ms).
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(MIN_POLL_PERIOD),
            interval: None,
        }
    }
}

#[async_trait]
impl RefreshTrigger for PollTrigger {
    async fn ready(&mut self) -> bool {
        let period = self.period;
        let interval = self.interval.get_or_insert_with(|| {
            // The watcher seeds its view itself; the first tick is one period out.
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        interval.tick().await;
        true
    }
}

/// Re-read whenever a notification stream yields.
///
/// The item itself is ignored; it only means "something changed".
#[derive(Debug)]
pub struct PushTrigger<S> {
    stream: S,
}

impl<S> PushTrigger<S> {
    /// Wrap a notification stream.
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> RefreshTrigger for PushTrigger<S>
where
    S: Stream + Unpin + Send,
{
    async fn ready(&mut self) -> bool {
        self.stream.next().await.is_some()
    }
}

/// Re-read on every push, with a poll underneath.
///
/// The poll catches anything the feed dropped. Once the feed ends the
/// trigger fires one immediate re-read and then only polls.
#[derive(Debug)]
pub struct FallbackTrigger<S> {
    push: Option<PushTrigger<S>>,
    poll: PollTrigger,
}

impl<S> FallbackTrigger<S> {
    /// Push from `feed` when there is one; poll every `period` regardless.
    pub fn new(feed: Option<S>, period: Duration) -> Self {
        Self {
            push: feed.map(PushTrigger::new),
            poll: PollTrigger::new(period),
        }
    }

    /// Whether a push feed is still attached.
    #[must_use]
    pub fn is_pushing(&self) -> bool {
        self.push.is_some()
    }
}

#[async_trait]
impl<S> RefreshTrigger for FallbackTrigger<S>
where
    S: Stream + Unpin + Send,
{
    async fn ready(&mut self) -> bool {
        if let Some(push) = self.push.as_mut() {
            let pushed = tokio::select! {
                pushed = push.ready() => Some(pushed),
                _ = self.poll.ready() => None,
            };
            if pushed == Some(false) {
                tracing::debug!("Push feed ended, polling only");
                self.push = None;
            }
            return true;
        }
        self.poll.ready().await
    }
}

/// Outcome of comparing a fetched trip against the current view.
#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    /// Nothing the customer would see changed.
    Unchanged,
    /// The view must be replaced.
    Changed(Option<TripRequest>),
}

/// Diff a freshly read trip against the previous view.
///
/// A different trip, a different status or a different price is a change.
#[must_use]
pub fn reconcile(previous: Option<&TripRequest>, fetched: Option<TripRequest>) -> Reconciled {
    match (previous, fetched) {
        (None, None) => Reconciled::Unchanged,
        (Some(previous), Some(fetched)) if !fetched.differs_from(previous) => {
            Reconciled::Unchanged
        }
        (_, fetched) => Reconciled::Changed(fetched),
    }
}

/// Background reconciliation of the customer's latest trip.
///
/// The watcher seeds its view with one read, then re-reads on every trigger.
/// Dropping it (or calling [`TripWatcher::stop`]) cancels the loop, including
/// any read in flight.
#[derive(Debug)]
pub struct TripWatcher {
    view: watch::Receiver<Option<TripRequest>>,
    task: JoinHandle<()>,
}

impl TripWatcher {
    /// Start watching. Must be called from within a Tokio runtime.
    pub fn spawn<S, T>(source: S, trigger: T) -> Self
    where
        S: TripSource + 'static,
        T: RefreshTrigger + 'static,
    {
        let (sender, view) = watch::channel(None);
        let task = tokio::spawn(run(source, trigger, sender));
        Self { view, task }
    }

    /// The current view.
    #[must_use]
    pub fn current(&self) -> Option<TripRequest> {
        self.view.borrow().clone()
    }

    /// Wait for the view to change and return it.
    ///
    /// # Errors
    ///
    /// Returns `RecvError` once the watcher has finished.
    pub async fn changed(&mut self) -> Result<Option<TripRequest>, watch::error::RecvError> {
        self.view.changed().await?;
        Ok(self.view.borrow_and_update().clone())
    }

    /// An independent handle on the view.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<TripRequest>> {
        self.view.clone()
    }

    /// Whether the loop has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop watching.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for TripWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Live driver listing.
///
/// Re-lists on every trigger and publishes only when the listing changed,
/// so a customer browsing never acts on stale availability for long.
#[derive(Debug)]
pub struct DriverListWatcher {
    view: watch::Receiver<Vec<PublicDriver>>,
    task: JoinHandle<()>,
}

impl DriverListWatcher {
    /// Start watching the listing for `search`. Must be called from within a
    /// Tokio runtime.
    pub fn spawn<T>(client: TaxiClient, search: Option<String>, trigger: T) -> Self
    where
        T: RefreshTrigger + 'static,
    {
        let (sender, view) = watch::channel(Vec::new());
        let task = tokio::spawn(run_listing(client, search, trigger, sender));
        Self { view, task }
    }

    /// The current listing.
    #[must_use]
    pub fn current(&self) -> Vec<PublicDriver> {
        self.view.borrow().clone()
    }

    /// Wait for the listing to change and return it.
    ///
    /// # Errors
    ///
    /// Returns `RecvError` once the watcher has finished.
    pub async fn changed(&mut self) -> Result<Vec<PublicDriver>, watch::error::RecvError> {
        self.view.changed().await?;
        Ok(self.view.borrow_and_update().clone())
    }

    /// Stop watching.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for DriverListWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_listing<T>(
    client: TaxiClient,
    search: Option<String>,
    mut trigger: T,
    sender: watch::Sender<Vec<PublicDriver>>,
) where
    T: RefreshTrigger,
{
    loop {
        match client.list_drivers(search.as_deref()).await {
            Ok(drivers) => {
                sender.send_if_modified(|view| {
                    if *view == drivers {
                        return false;
                    }
                    tracing::debug!(drivers = drivers.len(), "Driver listing changed");
                    *view = drivers;
                    true
                });
            }
            Err(e) => {
                tracing::debug!(error = %e, "Driver re-list failed, keeping last listing");
            }
        }

        if !trigger.ready().await {
            break;
        }
    }
}

async fn run<S, T>(source: S, mut trigger: T, sender: watch::Sender<Option<TripRequest>>)
where
    S: TripSource,
    T: RefreshTrigger,
{
    loop {
        match source.fetch_latest().await {
            Ok(fetched) => {
                let outcome = reconcile(sender.borrow().as_ref(), fetched);
                if let Reconciled::Changed(view) = outcome {
                    tracing::debug!(
                        trip_id = ?view.as_ref().map(|t| t.id),
                        status = ?view.as_ref().map(|t| t.status),
                        "Trip view changed"
                    );
                    sender.send_replace(view);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Trip re-read failed, keeping last view");
            }
        }

        if !trigger.ready().await {
            tracing::debug!("Refresh trigger ended");
            break;
        }
    }
}
