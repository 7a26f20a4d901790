// ── Reconciliation coordinator ──
//
// Drives the poll loop and the command path for one NVR, and turns
// store mutations into `CoordinatorEvent`s for observers.

use std::sync::Arc;
use std::time::Duration;

use strum::Display;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use frigatectl_api::NvrClient;
use frigatectl_api::transport::{TlsMode, TransportConfig};

use crate::config::{CoordinatorConfig, TlsVerification};
use crate::error::CoreError;
use crate::model::{CameraView, CoordinatorEvent, ViewChange};
use crate::source::CameraSource;
use crate::store::{DataStore, IntentTicket, ObservedState, PendingIntents};

const EVENT_CHANNEL_SIZE: usize = 256;

// ── CoordinatorState ─────────────────────────────────────────────

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CoordinatorState {
    Idle,
    Starting,
    Running,
    /// The initial poll failed or found no cameras.
    Failed,
    Stopped,
}

// ── Coordinator ──────────────────────────────────────────────────

/// Reconciles camera commands with NVR polls.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Owns the `DataStore`,
/// the background poll loop, and every settle task spawned by
/// [`execute()`](Self::execute).
pub struct Coordinator<S: CameraSource = NvrClient> {
    inner: Arc<CoordinatorInner<S>>,
}

impl<S: CameraSource> Clone for Coordinator<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CoordinatorInner<S> {
    config: CoordinatorConfig,
    source: S,
    store: DataStore,
    state: watch::Sender<CoordinatorState>,
    event_tx: broadcast::Sender<Arc<CoordinatorEvent>>,
    /// One poll in flight at a time. Commands never take this.
    poll_lock: Mutex<()>,
    cancel: CancellationToken,
    /// Child token for the current run; replaced on every `start()`.
    cancel_child: Mutex<CancellationToken>,
    settle_tasks: TaskTracker,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Coordinator<NvrClient> {
    /// Create a coordinator talking HTTP to the NVR in `config`.
    /// Does NOT poll; call [`start()`](Self::start).
    pub fn new(config: CoordinatorConfig) -> Result<Self, CoreError> {
        let transport = build_transport(&config);
        let client = NvrClient::new(config.url.clone(), &transport)?
            .with_status_path(config.status_path.clone());
        Ok(Self::with_source(config, client))
    }

    // ── One-shot convenience ─────────────────────────────────────

    /// One-shot: start, run closure, shut down.
    ///
    /// Disables the periodic poll loop since the closure drives its own
    /// polls (through `refresh`, or the settle task of a command).
    pub async fn oneshot<F, Fut, T>(config: CoordinatorConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Coordinator) -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let mut cfg = config;
        cfg.poll_interval = Duration::ZERO;

        let coordinator = Coordinator::new(cfg)?;
        coordinator.start().await?;
        let result = f(coordinator.clone()).await;
        coordinator.shutdown().await;
        result
    }
}

impl<S: CameraSource> Coordinator<S> {
    /// Create a coordinator over any `CameraSource`.
    pub fn with_source(config: CoordinatorConfig, source: S) -> Self {
        let (state, _) = watch::channel(CoordinatorState::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(CoordinatorInner {
                config,
                source,
                store: DataStore::new(),
                state,
                event_tx,
                poll_lock: Mutex::new(()),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                settle_tasks: TaskTracker::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Run the first poll, then spawn the background poll loop.
    ///
    /// Fails without spawning anything if the first poll fails or
    /// reports no cameras at all. Calling it while already running is a
    /// no-op; a call racing another `start()` waits for that one to finish.
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut state = self.inner.state.subscribe();
        loop {
            let claimed = self.inner.state.send_if_modified(|s| match s {
                CoordinatorState::Running | CoordinatorState::Starting => false,
                _ => {
                    *s = CoordinatorState::Starting;
                    true
                }
            });
            if claimed {
                break;
            }
            if *state.borrow_and_update() == CoordinatorState::Running {
                debug!(nvr = %self.inner.config.authority(), "coordinator already running");
                return Ok(());
            }
            let _ = state
                .wait_for(|s| *s != CoordinatorState::Starting)
                .await;
        }

        // Fresh child token for this run (supports restart). The previous
        // run's token is cancelled so nothing it spawned outlives it.
        let child = self.inner.cancel.child_token();
        {
            let mut current = self.inner.cancel_child.lock().await;
            current.cancel();
            *current = child.clone();
        }

        let cameras = match self.refresh().await {
            Ok(0) => {
                self.inner.state.send_replace(CoordinatorState::Failed);
                return Err(CoreError::NoCameras {
                    url: self.inner.config.url.to_string(),
                });
            }
            Ok(n) => n,
            Err(e) => {
                self.inner.state.send_replace(CoordinatorState::Failed);
                return Err(e);
            }
        };

        let interval = self.inner.config.poll_interval;
        if !interval.is_zero() {
            let coordinator = self.clone();
            self.inner
                .task_handles
                .lock()
                .await
                .push(tokio::spawn(poll_task(coordinator, interval, child)));
        }

        self.inner.state.send_replace(CoordinatorState::Running);
        info!(
            nvr = %self.inner.config.authority(),
            cameras,
            "coordinator started"
        );
        Ok(())
    }

    /// Stop the poll loop and abandon pending settle waits.
    ///
    /// Intents still in flight are dropped, so every view falls back to
    /// its observed value.
    pub async fn shutdown(&self) {
        // Cancel the child token (not the parent, so `start` can run again).
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        drop(handles);

        self.wait_idle().await;

        let changes = self.inner.store.clear_all_intents();
        self.publish(changes);

        self.inner.state.send_replace(CoordinatorState::Stopped);
        debug!(nvr = %self.inner.config.authority(), "coordinator stopped");
    }

    /// Wait until every settle task spawned so far has finished.
    pub async fn wait_idle(&self) {
        let tracker = &self.inner.settle_tasks;
        tracker.close();
        tracker.wait().await;
        tracker.reopen();
    }

    // ── Polling ──────────────────────────────────────────────────

    /// Run one poll cycle and apply its result.
    ///
    /// Returns the number of cameras reported. On failure the cached
    /// values and every pending intent stay as they were; only
    /// availability drops.
    pub async fn refresh(&self) -> Result<usize, CoreError> {
        let _poll = self.inner.poll_lock.lock().await;

        match self.inner.source.poll().await {
            Ok(cameras) => {
                let count = cameras.len();
                let changes = self.inner.store.apply_poll(cameras);
                debug!(cameras = count, changed = changes.len(), "poll applied");
                self.publish(changes);
                self.emit(CoordinatorEvent::Refreshed { cameras: count });
                Ok(count)
            }
            Err(e) => {
                let (failures, changes) = self.inner.store.record_poll_failure();
                warn!(
                    error = %e,
                    consecutive_failures = failures,
                    "camera poll failed, keeping last known state"
                );
                self.publish(changes);
                self.emit(CoordinatorEvent::PollFailed {
                    reason: e.to_string(),
                    consecutive_failures: failures,
                });
                Err(CoreError::poll(&self.inner.config.url, &e))
            }
        }
    }

    // ── Command execution ────────────────────────────────────────

    /// Ask the NVR to enable or disable `camera`.
    ///
    /// The requested value shows up in [`view()`](Self::view) before the
    /// request is sent. On success it stays there until the settle poll
    /// has run; on failure it is withdrawn before this returns. Either
    /// way a settle poll is scheduled. Failed commands are never retried.
    pub async fn execute(&self, camera: &str, desired: bool) -> Result<(), CoreError> {
        if *self.inner.state.borrow() != CoordinatorState::Running {
            return Err(CoreError::NotRunning);
        }
        if !self.inner.store.observed().snapshot().contains(camera) {
            return Err(CoreError::CameraNotFound {
                camera: camera.to_owned(),
            });
        }

        let (ticket, changes) = self.inner.store.set_intent(camera, desired);
        self.publish(changes);
        self.emit(CoordinatorEvent::CommandIssued {
            camera: camera.to_owned(),
            desired,
        });
        info!(camera, desired, "sending camera command");

        match self.inner.source.set_state(camera, desired).await {
            Ok(()) => {
                debug!(camera, desired, "camera command acknowledged");
                self.schedule_settle(camera, desired, ticket, true).await;
                Ok(())
            }
            Err(e) => {
                warn!(camera, desired, error = %e, "camera command failed");
                let (_, changes) = self.inner.store.clear_intent_if(camera, ticket);
                self.publish(changes);
                self.emit(CoordinatorEvent::CommandFailed {
                    camera: camera.to_owned(),
                    desired,
                    reason: e.to_string(),
                });
                self.schedule_settle(camera, desired, ticket, false).await;
                Err(CoreError::command(camera, desired, &e))
            }
        }
    }

    pub async fn turn_on(&self, camera: &str) -> Result<(), CoreError> {
        self.execute(camera, true).await
    }

    pub async fn turn_off(&self, camera: &str) -> Result<(), CoreError> {
        self.execute(camera, false).await
    }

    /// Poll again after the settle delay, then release the intent if this
    /// command still owns it.
    async fn schedule_settle(
        &self,
        camera: &str,
        desired: bool,
        ticket: IntentTicket,
        acknowledged: bool,
    ) {
        let coordinator = self.clone();
        let camera = camera.to_owned();
        let delay = self.inner.config.settle_delay;
        let cancel = self.inner.cancel_child.lock().await.clone();

        self.inner.settle_tasks.spawn(async move {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }

            if let Err(e) = coordinator.refresh().await {
                debug!(camera = %camera, error = %e, "settle poll failed");
            }

            if acknowledged {
                let (cleared, changes) = coordinator.inner.store.clear_intent_if(&camera, ticket);
                if !cleared {
                    debug!(camera = %camera, "intent superseded by a newer command");
                }
                coordinator.publish(changes);
            }

            coordinator.emit(CoordinatorEvent::CommandSettled {
                camera,
                desired,
                acknowledged,
            });
        });
    }

    // ── State observation ────────────────────────────────────────

    /// Merged view of one camera.
    pub fn view(&self, camera: &str) -> Option<CameraView> {
        self.inner.store.view(camera)
    }

    /// Merged views of every known camera, sorted by name.
    pub fn views(&self) -> Vec<CameraView> {
        self.inner.store.views()
    }

    pub fn is_available(&self, camera: &str) -> bool {
        self.inner.store.is_available(camera)
    }

    /// Subscribe to the event broadcast stream.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<CoordinatorEvent>> {
        self.inner.event_tx.subscribe()
    }

    /// Counter bumped whenever any view changes.
    pub fn revision(&self) -> watch::Receiver<u64> {
        self.inner.store.revision()
    }

    /// Subscribe to lifecycle state changes.
    pub fn state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    pub fn observed(&self) -> &ObservedState {
        self.inner.store.observed()
    }

    pub fn pending(&self) -> &PendingIntents {
        self.inner.store.pending()
    }

    // ── Notification ─────────────────────────────────────────────

    fn publish(&self, changes: Vec<ViewChange>) {
        for change in changes {
            debug!(
                camera = %change.camera,
                before = ?change.before.as_ref().map(|v| v.enabled),
                after = ?change.after.as_ref().map(|v| v.enabled),
                "view changed"
            );
            self.emit(CoordinatorEvent::ViewChanged {
                camera: change.camera,
                view: change.after,
            });
        }
    }

    fn emit(&self, event: CoordinatorEvent) {
        // No receivers is fine.
        let _ = self.inner.event_tx.send(Arc::new(event));
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Poll the NVR on a fixed cadence until cancelled.
async fn poll_task<S: CameraSource>(
    coordinator: Coordinator<S>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                // Failures are logged by `refresh`; try again next tick.
                let _ = coordinator.refresh().await;
            }
        }
    }
}

/// Build a [`TransportConfig`] from the coordinator configuration.
fn build_transport(config: &CoordinatorConfig) -> TransportConfig {
    TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    }
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::ViewSource;

    // ── Helpers ──────────────────────────────────────────────────

    /// Scripted NVR: polls report `cameras` unless a failure is queued.
    #[derive(Default)]
    pub(crate) struct FakeNvr {
        pub cameras: StdMutex<HashMap<String, bool>>,
        pub poll_failures: StdMutex<VecDeque<frigatectl_api::Error>>,
        pub command_status: StdMutex<Option<u16>>,
        /// When set, accepted commands change `cameras` right away.
        pub apply_commands: AtomicBool,
        pub polls: AtomicUsize,
    }

    impl FakeNvr {
        pub fn with(pairs: &[(&str, bool)]) -> Arc<Self> {
            let nvr = Self::default();
            *nvr.cameras.lock().unwrap() =
                pairs.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect();
            Arc::new(nvr)
        }

        pub fn set(&self, camera: &str, enabled: bool) {
            self.cameras
                .lock()
                .unwrap()
                .insert(camera.to_owned(), enabled);
        }

        pub fn fail_next_polls(&self, n: usize) {
            let mut queue = self.poll_failures.lock().unwrap();
            for _ in 0..n {
                queue.push_back(frigatectl_api::Error::Timeout { timeout_secs: 10 });
            }
        }

        pub fn reject_commands(&self, status: u16) {
            *self.command_status.lock().unwrap() = Some(status);
        }
    }

    impl CameraSource for Arc<FakeNvr> {
        async fn poll(&self) -> Result<HashMap<String, bool>, frigatectl_api::Error> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = self.poll_failures.lock().unwrap().pop_front() {
                return Err(e);
            }
            Ok(self.cameras.lock().unwrap().clone())
        }

        async fn set_state(&self, camera: &str, enabled: bool) -> Result<(), frigatectl_api::Error> {
            if let Some(status) = *self.command_status.lock().unwrap() {
                return Err(frigatectl_api::Error::Status {
                    status,
                    path: format!("/api/{camera}"),
                    body: String::new(),
                });
            }
            if self.apply_commands.load(Ordering::SeqCst) {
                self.set(camera, enabled);
            }
            Ok(())
        }
    }

    pub(crate) fn test_config(poll_interval: Duration) -> CoordinatorConfig {
        let mut cfg = CoordinatorConfig::for_host("nvr.test", 5000).unwrap();
        cfg.poll_interval = poll_interval;
        cfg
    }

    async fn started(nvr: &Arc<FakeNvr>, poll_interval: Duration) -> Coordinator<Arc<FakeNvr>> {
        let coordinator = Coordinator::with_source(test_config(poll_interval), Arc::clone(nvr));
        coordinator.start().await.unwrap();
        coordinator
    }

    fn drain(rx: &mut broadcast::Receiver<Arc<CoordinatorEvent>>) -> Vec<CoordinatorEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push((*event).clone());
        }
        out
    }

    // ── Lifecycle ────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn start_runs_initial_poll() {
        let nvr = FakeNvr::with(&[("front_door", true), ("garage", false)]);
        let coordinator = started(&nvr, Duration::ZERO).await;

        assert_eq!(*coordinator.state().borrow(), CoordinatorState::Running);
        assert_eq!(nvr.polls.load(Ordering::SeqCst), 1);
        let names: Vec<_> = coordinator.views().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["front_door", "garage"]);
        assert!(coordinator.is_available("garage"));
    }

    #[tokio::test(start_paused = true)]
    async fn start_rejects_empty_nvr() {
        let nvr = FakeNvr::with(&[]);
        let coordinator = Coordinator::with_source(test_config(Duration::ZERO), Arc::clone(&nvr));

        let err = coordinator.start().await.unwrap_err();
        assert!(matches!(err, CoreError::NoCameras { .. }));
        assert_eq!(*coordinator.state().borrow(), CoordinatorState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn start_surfaces_poll_failure() {
        let nvr = FakeNvr::with(&[("front_door", true)]);
        nvr.fail_next_polls(1);
        let coordinator = Coordinator::with_source(test_config(Duration::ZERO), Arc::clone(&nvr));

        let err = coordinator.start().await.unwrap_err();
        assert!(err.is_timeout());

        // A second attempt succeeds once the NVR answers.
        coordinator.start().await.unwrap();
        assert_eq!(*coordinator.state().borrow(), CoordinatorState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn second_start_keeps_a_single_poll_loop() {
        let nvr = FakeNvr::with(&[("front_door", true)]);
        let coordinator = started(&nvr, Duration::from_secs(30)).await;

        coordinator.start().await.unwrap();
        assert_eq!(nvr.polls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(65)).await;
        assert_eq!(nvr.polls.load(Ordering::SeqCst), 3);

        tokio::time::timeout(Duration::from_secs(60), coordinator.shutdown())
            .await
            .unwrap();
        assert_eq!(*coordinator.state().borrow(), CoordinatorState::Stopped);

        let polls = nvr.polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(nvr.polls.load(Ordering::SeqCst), polls);

        // Restart after shutdown still works.
        coordinator.start().await.unwrap();
        assert_eq!(*coordinator.state().borrow(), CoordinatorState::Running);
        assert_eq!(nvr.polls.load(Ordering::SeqCst), polls + 1);
        tokio::time::timeout(Duration::from_secs(60), coordinator.shutdown())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_starts_run_one_initial_poll() {
        let nvr = FakeNvr::with(&[("front_door", true)]);
        let coordinator = Coordinator::with_source(test_config(Duration::ZERO), Arc::clone(&nvr));

        let (a, b) = tokio::join!(coordinator.start(), coordinator.start());
        a.unwrap();
        b.unwrap();

        assert_eq!(nvr.polls.load(Ordering::SeqCst), 1);
        assert_eq!(*coordinator.state().borrow(), CoordinatorState::Running);
    }

    #[tokio::test(start_paused = true)]
    async fn execute_requires_running() {
        let nvr = FakeNvr::with(&[("front_door", true)]);
        let coordinator = Coordinator::with_source(test_config(Duration::ZERO), Arc::clone(&nvr));

        let err = coordinator.turn_on("front_door").await.unwrap_err();
        assert!(matches!(err, CoreError::NotRunning));
    }

    #[tokio::test(start_paused = true)]
    async fn execute_rejects_unknown_camera() {
        let nvr = FakeNvr::with(&[("front_door", true)]);
        let coordinator = started(&nvr, Duration::ZERO).await;

        let err = coordinator.turn_on("attic").await.unwrap_err();
        assert!(matches!(err, CoreError::CameraNotFound { camera } if camera == "attic"));
        assert!(coordinator.pending().is_empty());
    }

    // ── Poll loop ────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn three_poll_timeouts_keep_values_but_drop_availability() {
        let nvr = FakeNvr::with(&[("front_door", true)]);
        let coordinator = started(&nvr, Duration::from_secs(30)).await;
        let mut events = coordinator.subscribe();
        nvr.fail_next_polls(3);

        tokio::time::sleep(Duration::from_secs(95)).await;

        assert_eq!(nvr.polls.load(Ordering::SeqCst), 4);
        assert_eq!(coordinator.observed().get("front_door"), Some(true));
        assert!(!coordinator.is_available("front_door"));
        let view = coordinator.view("front_door").unwrap();
        assert!(view.enabled);
        assert!(!view.available);
        assert_eq!(*coordinator.state().borrow(), CoordinatorState::Running);

        let failures: Vec<u32> = drain(&mut events)
            .into_iter()
            .filter_map(|e| match e {
                CoordinatorEvent::PollFailed {
                    consecutive_failures,
                    ..
                } => Some(consecutive_failures),
                _ => None,
            })
            .collect();
        assert_eq!(failures, vec![1, 2, 3]);

        // The loop keeps ticking and recovers.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(coordinator.is_available("front_door"));
        assert_eq!(coordinator.observed().freshness().consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn successful_poll_drops_missing_cameras() {
        let nvr = FakeNvr::with(&[("front_door", true), ("garage", true)]);
        let coordinator = started(&nvr, Duration::ZERO).await;
        nvr.cameras.lock().unwrap().remove("garage");

        assert_eq!(coordinator.refresh().await.unwrap(), 1);
        assert_eq!(coordinator.view("garage"), None);
        assert!(!coordinator.is_available("garage"));
    }

    // ── Command path ─────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn pending_value_survives_stale_poll_until_settled() {
        let nvr = FakeNvr::with(&[("front_door", true)]);
        let coordinator = started(&nvr, Duration::ZERO).await;

        coordinator.turn_off("front_door").await.unwrap();

        // A poll that ran before the NVR caught up.
        coordinator.refresh().await.unwrap();
        let view = coordinator.view("front_door").unwrap();
        assert!(!view.enabled);
        assert_eq!(view.source, ViewSource::Pending);

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(coordinator.pending().contains("front_door"));

        // The NVR converges before the settle poll.
        nvr.set("front_door", false);
        coordinator.wait_idle().await;

        assert!(coordinator.pending().is_empty());
        let view = coordinator.view("front_door").unwrap();
        assert!(!view.enabled);
        assert_eq!(view.source, ViewSource::Observed);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_clears_intent_even_when_poll_fails() {
        let nvr = FakeNvr::with(&[("front_door", false)]);
        let coordinator = started(&nvr, Duration::ZERO).await;

        coordinator.turn_on("front_door").await.unwrap();
        nvr.fail_next_polls(1);
        coordinator.wait_idle().await;

        assert!(coordinator.pending().is_empty());
        let view = coordinator.view("front_door").unwrap();
        assert!(!view.enabled);
        assert!(!view.available);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_command_rolls_back_before_returning() {
        let nvr = FakeNvr::with(&[("front_door", false)]);
        let coordinator = started(&nvr, Duration::ZERO).await;
        let mut events = coordinator.subscribe();
        nvr.reject_commands(500);

        let err = coordinator.turn_on("front_door").await.unwrap_err();

        assert!(matches!(err, CoreError::CommandFailed { action: "enable", .. }));
        assert!(!coordinator.pending().contains("front_door"));
        assert!(!coordinator.view("front_door").unwrap().enabled);

        let seen = drain(&mut events);
        assert!(matches!(
            &seen[..],
            [
                CoordinatorEvent::ViewChanged { view: Some(v), .. },
                CoordinatorEvent::CommandIssued { desired: true, .. },
                CoordinatorEvent::ViewChanged { view: Some(reverted), .. },
                CoordinatorEvent::CommandFailed { .. },
            ] if v.enabled && !reverted.enabled
        ));

        // The settle poll still runs for a failed command.
        let polls_before = nvr.polls.load(Ordering::SeqCst);
        coordinator.wait_idle().await;
        assert_eq!(nvr.polls.load(Ordering::SeqCst), polls_before + 1);
        assert!(drain(&mut events).iter().any(|e| matches!(
            e,
            CoordinatorEvent::CommandSettled {
                acknowledged: false,
                ..
            }
        )));
    }

    #[tokio::test(start_paused = true)]
    async fn last_write_wins_and_stale_settle_keeps_newer_intent() {
        let nvr = FakeNvr::with(&[("front_door", false)]);
        let coordinator = started(&nvr, Duration::ZERO).await;

        coordinator.turn_on("front_door").await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        coordinator.turn_off("front_door").await.unwrap();
        assert_eq!(coordinator.pending().get("front_door"), Some(false));

        // First command's settle poll has fired; the second still owns the intent.
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(coordinator.pending().get("front_door"), Some(false));
        assert!(coordinator.view("front_door").unwrap().is_pending());

        coordinator.wait_idle().await;
        assert!(coordinator.pending().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_drops_pending_and_cancels_settle() {
        let nvr = FakeNvr::with(&[("front_door", true)]);
        let coordinator = started(&nvr, Duration::from_secs(30)).await;

        coordinator.turn_off("front_door").await.unwrap();
        coordinator.shutdown().await;

        assert_eq!(*coordinator.state().borrow(), CoordinatorState::Stopped);
        assert!(coordinator.pending().is_empty());
        assert!(coordinator.view("front_door").unwrap().enabled);
        // Only the initial poll ran.
        assert_eq!(nvr.polls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn revision_tracks_view_changes() {
        let nvr = FakeNvr::with(&[("front_door", true)]);
        let coordinator = started(&nvr, Duration::ZERO).await;
        let rev = coordinator.revision();
        let start = *rev.borrow();

        coordinator.refresh().await.unwrap();
        assert_eq!(*rev.borrow(), start);

        coordinator.turn_off("front_door").await.unwrap();
        assert_eq!(*rev.borrow(), start + 1);
    }
}
