//! Single-flight execution of annealing runs on a dedicated worker thread.
//!
//! A [`RunController`] admits one run at a time. Each run gets its own OS
//! thread, a bounded event channel and a cancellation flag. The worker owns
//! all search state; the controller only keeps the active run's id and
//! flag, and the worker clears that slot when it exits, whichever way it
//! exits.

use std::ops::ControlFlow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, info_span, warn};

use super::event::{FinishPayload, ProgressPayload, RunEvent, RunId, StartPayload};
use crate::ordering::{validate_tasks, CostModel, SearchConfig, Task, TaskOrderingProblem};
use crate::sa::{Phase, SaConfig, SaObserver, SaProgress, SaRunner, SaStart};
use crate::store::TaskStore;

/// Message sent when the worker thread dies mid-run.
pub const WORKER_FAULT_MESSAGE: &str = "optimizer worker terminated unexpectedly";

/// How long a blocked send sleeps between checks of the cancellation flag.
const SEND_RETRY_INTERVAL: Duration = Duration::from_millis(2);

/// What the worker does when the event channel is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backpressure {
    /// Wait for the subscriber. Every event is delivered.
    #[default]
    Block,
    /// Drop `progress` and `temp_change` events that do not fit.
    /// `start`, `finish` and `error` are always delivered.
    DropProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Capacity of a run's event channel.
    pub capacity: usize,
    pub backpressure: Backpressure,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: 256,
            backpressure: Backpressure::default(),
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("stream capacity must be at least 1".into());
        }
        Ok(())
    }
}

/// Everything a run needs besides its task list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSettings {
    pub annealing: SaConfig,
    pub cost: CostModel,
    pub search: SearchConfig,
    pub stream: StreamConfig,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("an optimization run is already active (run {active})")]
    Busy { active: RunId },

    #[error("failed to spawn optimizer worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Cooperative cancellation flag shared by a run's handle and its worker.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    fn flag(&self) -> &AtomicBool {
        &self.0
    }
}

/// Subscriber side of one run.
///
/// Dropping the handle cancels the run.
#[derive(Debug)]
pub struct RunHandle {
    id: RunId,
    events: mpsc::Receiver<RunEvent>,
    cancel: CancelToken,
}

impl RunHandle {
    pub fn id(&self) -> RunId {
        self.id
    }

    /// Asks the worker to stop at the end of its current iteration.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Next event, or `None` once the worker has exited.
    pub async fn recv(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<RunEvent>> {
        self.events.poll_recv(cx)
    }
}

impl Drop for RunHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct ActiveRun {
    id: RunId,
    cancel: CancelToken,
}

#[derive(Default)]
struct Shared {
    active: Mutex<Option<ActiveRun>>,
    next_id: AtomicU64,
}

impl Shared {
    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Frees the single-flight slot when the worker is done with it.
struct SlotRelease {
    shared: Arc<Shared>,
    id: RunId,
}

impl Drop for SlotRelease {
    fn drop(&mut self) {
        let mut active = self.shared.lock_active();
        if active.as_ref().is_some_and(|run| run.id == self.id) {
            *active = None;
            debug!(run_id = %self.id, "run slot released");
        }
    }
}

/// Starts, tracks and cancels optimization runs, one at a time.
///
/// Cloning yields another handle to the same controller.
#[derive(Clone)]
pub struct RunController {
    shared: Arc<Shared>,
    settings: Arc<RunSettings>,
}

impl RunController {
    pub fn new(settings: RunSettings) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &RunSettings {
        &self.settings
    }

    /// Id of the run currently holding the slot.
    pub fn active_run(&self) -> Option<RunId> {
        self.shared.lock_active().as_ref().map(|run| run.id)
    }

    pub fn is_busy(&self) -> bool {
        self.active_run().is_some()
    }

    /// Starts a run over `tasks`.
    ///
    /// Fails with [`RunError::Busy`] while another run is active. Malformed
    /// tasks are not rejected here: they surface as the run's `error` event.
    pub fn start(&self, tasks: Vec<Task>) -> Result<RunHandle, RunError> {
        let settings = Arc::clone(&self.settings);
        self.spawn(move |cancel, sink| execute(tasks, &settings, cancel, sink))
    }

    /// Snapshots the store's task list and starts a run over it.
    ///
    /// A list that cannot be loaded is reported as the run's `error` event,
    /// the same way malformed tasks are.
    pub async fn start_from_store(&self, store: &dyn TaskStore) -> Result<RunHandle, RunError> {
        if let Some(active) = self.active_run() {
            return Err(RunError::Busy { active });
        }
        match store.load().await {
            Ok(tasks) => self.start(tasks),
            Err(err) => {
                warn!(%err, "stored task list is unusable");
                let message = err.to_string();
                self.spawn(move |_, sink| {
                    let _ = sink.send(RunEvent::error(message));
                })
            }
        }
    }

    /// Claims the slot and runs `job` on a fresh worker thread.
    fn spawn<F>(&self, job: F) -> Result<RunHandle, RunError>
    where
        F: FnOnce(&CancelToken, &EventSink) + Send + 'static,
    {
        let cancel = CancelToken::new();
        let id = {
            let mut active = self.shared.lock_active();
            if let Some(run) = active.as_ref() {
                return Err(RunError::Busy { active: run.id });
            }
            let id = RunId(self.shared.next_id.fetch_add(1, Ordering::Relaxed) + 1);
            *active = Some(ActiveRun {
                id,
                cancel: cancel.clone(),
            });
            id
        };

        let (tx, rx) = mpsc::channel(self.settings.stream.capacity.max(1));
        let worker = Worker {
            id,
            job,
            sink: EventSink {
                tx,
                backpressure: self.settings.stream.backpressure,
                cancel: cancel.clone(),
            },
        };
        let release = SlotRelease {
            shared: Arc::clone(&self.shared),
            id,
        };

        // On spawn failure the closure, and with it `release`, is dropped,
        // which frees the slot again.
        thread::Builder::new()
            .name(format!("sa-worker-{id}"))
            .spawn(move || worker.run(release))
            .map_err(RunError::Spawn)?;

        info!(run_id = %id, "run started");
        Ok(RunHandle {
            id,
            events: rx,
            cancel,
        })
    }

    /// Cancels run `id` if it is the active one.
    pub fn cancel(&self, id: RunId) -> bool {
        match self.shared.lock_active().as_ref() {
            Some(run) if run.id == id => {
                run.cancel.cancel();
                info!(run_id = %id, "run cancellation requested");
                true
            }
            _ => false,
        }
    }

    /// Cancels whichever run is active.
    pub fn cancel_active(&self) -> Option<RunId> {
        let active = self.shared.lock_active();
        let run = active.as_ref()?;
        run.cancel.cancel();
        info!(run_id = %run.id, "run cancellation requested");
        Some(run.id)
    }
}

/// Sending half of a run's event channel.
struct EventSink {
    tx: mpsc::Sender<RunEvent>,
    backpressure: Backpressure,
    cancel: CancelToken,
}

impl EventSink {
    /// Delivers `event`; breaks once nobody is listening anymore or the run
    /// is cancelled while waiting for room in the channel.
    fn send(&self, event: RunEvent) -> ControlFlow<()> {
        if event.is_droppable() && self.backpressure == Backpressure::DropProgress {
            return match self.tx.try_send(event) {
                Ok(()) => ControlFlow::Continue(()),
                Err(TrySendError::Full(event)) => {
                    debug!(kind = event.kind(), "subscriber lagging, event dropped");
                    ControlFlow::Continue(())
                }
                Err(TrySendError::Closed(_)) => ControlFlow::Break(()),
            };
        }
        let mut event = event;
        loop {
            match self.tx.try_send(event) {
                Ok(()) => return ControlFlow::Continue(()),
                Err(TrySendError::Closed(_)) => {
                    debug!("subscriber gone, stopping run");
                    return ControlFlow::Break(());
                }
                Err(TrySendError::Full(pending)) => {
                    if self.cancel.is_cancelled() {
                        debug!(kind = pending.kind(), "cancelled while subscriber is stalled");
                        return ControlFlow::Break(());
                    }
                    event = pending;
                    thread::sleep(SEND_RETRY_INTERVAL);
                }
            }
        }
    }
}

/// Translates engine notifications into [`RunEvent`]s.
struct EventObserver<'a> {
    sink: &'a EventSink,
    settings: &'a RunSettings,
    task_count: usize,
}

impl SaObserver for EventObserver<'_> {
    fn on_start(&mut self, start: &SaStart) -> ControlFlow<()> {
        self.sink.send(RunEvent::Start(StartPayload {
            initial_cost: start.initial_cost,
            initial_temperature: start.initial_temperature,
            min_temperature: self.settings.annealing.min_temperature,
            iterations_per_temperature: self.settings.annealing.temperature_step_len(),
            seed: start.seed,
            task_count: self.task_count,
        }))
    }

    fn on_progress(&mut self, progress: &SaProgress) -> ControlFlow<()> {
        self.sink.send(RunEvent::Progress(ProgressPayload {
            iteration: progress.iteration,
            temperature: progress.temperature,
            current_cost: progress.current_cost,
            best_cost: progress.best_cost,
            accepted: progress.accepted,
        }))
    }

    fn on_temperature(&mut self, temperature: f64) -> ControlFlow<()> {
        self.sink.send(RunEvent::TempChange { temperature })
    }
}

struct Worker<F> {
    id: RunId,
    job: F,
    sink: EventSink,
}

impl<F> Worker<F>
where
    F: FnOnce(&CancelToken, &EventSink),
{
    fn run(self, release: SlotRelease) {
        let Worker { id, job, sink } = self;
        let span = info_span!("run", run_id = %id);
        let _enter = span.enter();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(&sink.cancel, &sink)));
        if outcome.is_err() {
            error!("optimizer worker panicked");
            let _ = sink.send(RunEvent::error(WORKER_FAULT_MESSAGE));
        }

        // Free the slot before the channel closes, so a subscriber that
        // reads to the end can start the next run straight away.
        drop(release);
        drop(sink);
    }
}

fn execute(tasks: Vec<Task>, settings: &RunSettings, cancel: &CancelToken, sink: &EventSink) {
    if let Err(err) = validate_tasks(&tasks) {
        warn!(%err, "rejecting task list");
        let _ = sink.send(RunEvent::error(err.to_string()));
        return;
    }
    if let Err(msg) = settings.cost.validate() {
        warn!(%msg, "rejecting cost model");
        let _ = sink.send(RunEvent::error(format!("invalid cost model: {msg}")));
        return;
    }

    let task_count = tasks.len();
    let problem = TaskOrderingProblem::new(tasks, settings.cost, settings.search);
    let mut observer = EventObserver {
        sink,
        settings,
        task_count,
    };

    let outcome =
        SaRunner::run_observed(&problem, &settings.annealing, Some(cancel.flag()), &mut observer);
    match outcome {
        Ok(result) if result.phase == Phase::Finished => {
            info!(
                best_cost = result.best_cost,
                iterations = result.iterations,
                accepted = result.accepted_moves,
                "run finished"
            );
            let evaluation = problem.evaluate(&result.best);
            let _ = sink.send(RunEvent::Finish(FinishPayload {
                best_cost: result.best_cost,
                best_order: result.best,
                detailed_schedule: evaluation.detail,
            }));
        }
        Ok(result) => {
            info!(iterations = result.iterations, "run cancelled");
        }
        Err(err) => {
            warn!(%err, "run failed");
            let _ = sink.send(RunEvent::error(err.to_string()));
        }
    }
}
