//! Batched, cancellable availability lookups across several studios.
//!
//! A run splits its studios into sequential batches. Requests inside a
//! batch are concurrent, batches never overlap and a fixed pause separates
//! them. Every studio yields exactly one [`FetchOutcome`], delivered as soon
//! as it resolves.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use studionavi_common::{FetchFailure, FetchOutcome, SearchWindow, Studio, StudioAvailability, StudioId};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{DEFAULT_BATCH_DELAY_MS, DEFAULT_BATCH_SIZE};
use crate::error::FetchError;

/// Anything that can answer "what is free at this studio in this window".
#[async_trait]
pub trait AvailabilitySource: Send + Sync {
    async fn fetch_availability(&self, studio: &Studio, window: &SearchWindow)
        -> Result<StudioAvailability, FetchError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSettings {
    /// Studios requested concurrently. Never zero.
    pub batch_size: usize,
    /// Pause between consecutive batches.
    pub batch_delay: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        BatchSettings {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay: Duration::from_millis(DEFAULT_BATCH_DELAY_MS),
        }
    }
}

/// Generation number of a run. Later runs have larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(u64);

impl RunId {
    pub const fn new(generation: u64) -> Self {
        RunId(generation)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub resolved: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(resolved: usize, total: usize) -> Self {
        Progress { resolved, total }
    }

    /// Whole percent, 100 once every studio has resolved.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 100;
        }
        (self.resolved.min(self.total) * 100 / self.total) as u32
    }

    pub fn is_complete(&self) -> bool {
        self.resolved >= self.total
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunEvent {
    pub run_id: RunId,
    pub outcome: FetchOutcome,
    pub progress: Progress,
}

/// Everything a run produced, in input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: RunId,
    pub outcomes: Vec<FetchOutcome>,
    pub progress: Progress,
    /// The run stopped before every studio resolved.
    pub cancelled: bool,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &FetchFailure> {
        self.outcomes.iter().filter_map(|o| match o {
            FetchOutcome::Failed(f) => Some(f),
            FetchOutcome::Ok(_) => None,
        })
    }
}

pub struct AvailabilityAggregator<S: ?Sized> {
    source: Arc<S>,
    settings: BatchSettings,
    generation: AtomicU64,
    active: Mutex<Option<CancellationToken>>,
}

impl<S> AvailabilityAggregator<S>
where
    S: AvailabilitySource + ?Sized + 'static,
{
    pub fn new(source: Arc<S>, settings: BatchSettings) -> Self {
        AvailabilityAggregator {
            source,
            settings: BatchSettings {
                batch_size: settings.batch_size.max(1),
                ..settings
            },
            generation: AtomicU64::new(0),
            active: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> BatchSettings {
        self.settings
    }

    /// Begin a run over `studios`, superseding any run still in progress.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, studios: Vec<Studio>, window: SearchWindow) -> AggregationRun {
        let run_id = RunId(self.generation.fetch_add(1, Ordering::SeqCst) + 1);
        let token = CancellationToken::new();

        let previous = self
            .active
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(token.clone());
        if let Some(previous) = previous {
            if !previous.is_cancelled() {
                debug!(run_id = %run_id, "superseding previous run");
            }
            previous.cancel();
        }

        let order: Vec<StudioId> = studios.iter().map(|s| s.id).collect();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(drive(
            Arc::clone(&self.source),
            self.settings,
            studios,
            window,
            run_id,
            token.clone(),
            tx,
        ));

        AggregationRun {
            run_id,
            progress: Progress::new(0, order.len()),
            order,
            events: rx,
            seen: Vec::new(),
            token,
        }
    }

    /// Stop whichever run is current.
    pub fn cancel_active(&self) {
        if let Some(token) = self.active.lock().unwrap_or_else(|e| e.into_inner()).take() {
            token.cancel();
        }
    }
}

async fn drive<S>(
    source: Arc<S>,
    settings: BatchSettings,
    studios: Vec<Studio>,
    window: SearchWindow,
    run_id: RunId,
    token: CancellationToken,
    tx: mpsc::UnboundedSender<RunEvent>,
) where
    S: AvailabilitySource + ?Sized,
{
    let total = studios.len();
    let mut resolved = 0;
    info!(run_id = %run_id, studios = total, date = %window.date, "availability run started");

    for (batch, chunk) in studios.chunks(settings.batch_size).enumerate() {
        if batch > 0 {
            tokio::select! {
                _ = token.cancelled() => {
                    info!(run_id = %run_id, resolved, total, "availability run cancelled");
                    return;
                }
                _ = tokio::time::sleep(settings.batch_delay) => {}
            }
        }
        debug!(run_id = %run_id, batch, size = chunk.len(), "dispatching batch");

        let mut in_flight: FuturesUnordered<_> = chunk
            .iter()
            .map(|studio| {
                let source = &source;
                async move { (studio, source.fetch_availability(studio, &window).await) }
            })
            .collect();

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!(run_id = %run_id, resolved, total, "availability run cancelled");
                    return;
                }
                next = in_flight.next() => next,
            };
            let Some((studio, result)) = next else {
                break;
            };

            let outcome = match result {
                Ok(availability) => {
                    debug!(
                        run_id = %run_id,
                        studio_id = studio.id,
                        ranges = availability.available_ranges.len(),
                        "studio resolved"
                    );
                    FetchOutcome::Ok(availability)
                }
                Err(err) => {
                    warn!(run_id = %run_id, studio_id = studio.id, code = err.code(), "studio failed: {}", err);
                    FetchOutcome::Failed(err.into_failure(studio))
                }
            };
            resolved += 1;
            let progress = Progress::new(resolved, total);
            let event = RunEvent {
                run_id,
                outcome,
                progress,
            };
            if tx.send(event).is_err() {
                debug!(run_id = %run_id, "run handle dropped, stopping");
                return;
            }
        }
    }

    info!(run_id = %run_id, total, "availability run finished");
}

/// Handle on a run in progress. Dropping it cancels the run.
pub struct AggregationRun {
    run_id: RunId,
    order: Vec<StudioId>,
    events: mpsc::UnboundedReceiver<RunEvent>,
    /// Outcomes already handed out, kept for [`AggregationRun::collect`].
    seen: Vec<FetchOutcome>,
    progress: Progress,
    token: CancellationToken,
}

impl AggregationRun {
    pub fn id(&self) -> RunId {
        self.run_id
    }

    pub fn total(&self) -> usize {
        self.order.len()
    }

    /// Next outcome, or `None` once the run finished or was cancelled.
    pub async fn next_event(&mut self) -> Option<RunEvent> {
        let event = self.events.recv().await?;
        self.record(&event);
        Some(event)
    }

    /// Latest progress seen by this handle.
    pub fn progress(&self) -> Progress {
        self.progress
    }

    fn record(&mut self, event: &RunEvent) {
        self.progress = event.progress;
        self.seen.push(event.outcome.clone());
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drain the run and return its outcomes in input order, including
    /// any already taken through [`next_event`](Self::next_event) or the stream.
    pub async fn collect(mut self) -> RunReport {
        while self.next_event().await.is_some() {}

        let mut outcomes = std::mem::take(&mut self.seen);
        let order = &self.order;
        outcomes.sort_by_key(|o| order.iter().position(|id| *id == o.studio_id()).unwrap_or(usize::MAX));

        RunReport {
            run_id: self.run_id,
            cancelled: !self.progress.is_complete(),
            outcomes,
            progress: self.progress,
        }
    }
}

impl Stream for AggregationRun {
    type Item = RunEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<RunEvent>> {
        let this = self.get_mut();
        let polled = this.events.poll_recv(cx);
        if let Poll::Ready(Some(event)) = &polled {
            this.record(event);
        }
        polled
    }
}

impl Drop for AggregationRun {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
