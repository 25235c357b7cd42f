use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::adapters::{Expander, Registrar};
use crate::classify::Category;
use crate::watcher::event::{ChangeEvent, ChangeKind};
use crate::watcher::{SessionError, SetupError, WatchSession};

/// How long the run loop sleeps when a poll returns nothing.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Lifecycle of a [`FolderMonitor`]. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Initializing,
    Running,
    Stopped,
}

/// What handling one entry amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Registered,
    Expanded,
    /// An adapter reported an error; it has been logged.
    Failed,
    Ignored,
}

/// Counts produced by one startup sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub registered: usize,
    pub expanded: usize,
    pub failed: usize,
    pub ignored: usize,
}

impl SweepSummary {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Registered => self.registered += 1,
            Outcome::Expanded => self.expanded += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Ignored => self.ignored += 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub dir: PathBuf,
    pub poll_interval: Duration,
}

impl MonitorOptions {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

/// Watches one folder: registers application bundles and expands archives
/// dropped into it.
///
/// Expansion output is not handled recursively. The extracted entries show up
/// as Created events and are classified on a later loop iteration.
pub struct FolderMonitor {
    interval: Duration,
    session: WatchSession,
    dispatcher: Dispatcher,
    state: watch::Sender<MonitorState>,
}

/// The adapter-facing half of the monitor. Kept apart from the session so
/// the loop can await adapter calls while only borrowing `Sync` state.
struct Dispatcher {
    dir: PathBuf,
    registrar: Arc<dyn Registrar>,
    expander: Arc<dyn Expander>,
}

impl FolderMonitor {
    /// Validate the folder and register the watch.
    ///
    /// The watch is registered before the startup sweep so nothing created
    /// during the sweep is missed; the resulting duplicates are harmless.
    pub fn new(
        options: MonitorOptions,
        registrar: Arc<dyn Registrar>,
        expander: Arc<dyn Expander>,
    ) -> Result<Self, SetupError> {
        let session = WatchSession::open(&options.dir)?;
        Ok(Self::with_session(
            session,
            options.poll_interval,
            registrar,
            expander,
        ))
    }

    fn with_session(
        session: WatchSession,
        interval: Duration,
        registrar: Arc<dyn Registrar>,
        expander: Arc<dyn Expander>,
    ) -> Self {
        let (state, _) = watch::channel(MonitorState::Initializing);
        Self {
            interval,
            dispatcher: Dispatcher {
                dir: session.dir().to_path_buf(),
                registrar,
                expander,
            },
            session,
            state,
        }
    }

    /// The canonical path of the watched folder.
    pub fn dir(&self) -> &Path {
        &self.dispatcher.dir
    }

    /// Classify and handle every entry currently in the folder.
    ///
    /// Catches bundles that were there before the watch existed, since no
    /// Created event will ever fire for them. Entries are handled in name
    /// order. Nothing is remembered between sweeps.
    pub async fn sweep(&self) -> Result<SweepSummary, SetupError> {
        let dir = self.dir();
        let unreadable = |source| SetupError::Unreadable {
            path: dir.to_path_buf(),
            source,
        };
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(unreadable)? {
            match entry {
                Ok(entry) => entries.push(entry.path()),
                Err(err) => warn!(dir = %dir.display(), %err, "skipping unreadable entry"),
            }
        }
        entries.sort();

        let mut summary = SweepSummary::default();
        for path in &entries {
            summary.record(self.dispatcher.handle_entry(path).await);
        }
        info!(
            dir = %dir.display(),
            registered = summary.registered,
            expanded = summary.expanded,
            failed = summary.failed,
            "startup sweep done"
        );
        Ok(summary)
    }

    /// Run the startup sweep, then the run loop on a background task.
    pub async fn start(self) -> Result<(MonitorHandle, SweepSummary), SetupError> {
        let summary = self.sweep().await?;
        Ok((self.spawn(), summary))
    }

    /// Start the run loop on a background task.
    pub fn spawn(self) -> MonitorHandle {
        let token = CancellationToken::new();
        let state = self.state.subscribe();
        let task = tokio::spawn(self.run(token.clone()));
        MonitorHandle { token, state, task }
    }

    async fn run(self, token: CancellationToken) {
        let Self {
            interval,
            mut session,
            dispatcher,
            state,
        } = self;
        state.send_replace(MonitorState::Running);
        info!(
            dir = %dispatcher.dir.display(),
            interval_ms = interval.as_millis() as u64,
            "monitoring folder"
        );

        loop {
            if token.is_cancelled() {
                debug!("stop requested");
                break;
            }

            let idle = match session.poll() {
                Ok(batch) if batch.is_empty() => true,
                Ok(batch) => {
                    for (i, event) in batch.iter().enumerate() {
                        if token.is_cancelled() {
                            debug!(skipped = batch.len() - i, "stop requested mid-batch");
                            break;
                        }
                        dispatcher.dispatch(event).await;
                    }
                    false
                }
                Err(SessionError::Poll(err)) => {
                    warn!(%err, "problem monitoring the folder");
                    true
                }
                Err(err @ SessionError::CursorInvalid(_)) => {
                    warn!(%err, "stopping folder monitor");
                    break;
                }
            };

            if let Err(err) = session.reset() {
                warn!(%err, "stopping folder monitor");
                break;
            }

            if idle {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        }

        session.close();
        state.send_replace(MonitorState::Stopped);
        info!(dir = %dispatcher.dir.display(), "folder monitor stopped");
    }
}

impl Dispatcher {
    /// Only Created events act; Deleted and Modified are logged and dropped.
    async fn dispatch(&self, event: &ChangeEvent) -> Outcome {
        trace!(kind = ?event.kind, path = %event.path.display(), "change");
        match event.kind {
            ChangeKind::Created => self.handle_entry(&event.path).await,
            ChangeKind::Deleted => {
                info!(path = %event.path.display(), "entry deleted - no handler implemented");
                Outcome::Ignored
            }
            ChangeKind::Modified => {
                info!(path = %event.path.display(), "entry modified - no handler implemented");
                Outcome::Ignored
            }
        }
    }

    async fn handle_entry(&self, path: &Path) -> Outcome {
        match Category::of(path) {
            Category::Application => self.register(path).await,
            Category::Archive => self.expand(path).await,
            Category::Irrelevant => {
                trace!(path = %path.display(), "ignoring entry");
                Outcome::Ignored
            }
        }
    }

    /// Adapter calls run on the blocking pool but are awaited, so the loop
    /// stays sequential and a panicking adapter only fails its own entry.
    async fn register(&self, bundle: &Path) -> Outcome {
        info!(path = %bundle.display(), "new app found");
        let registrar = Arc::clone(&self.registrar);
        let path = bundle.to_path_buf();
        match tokio::task::spawn_blocking(move || registrar.register(&path)).await {
            Ok(Ok(())) => Outcome::Registered,
            Ok(Err(err)) => {
                warn!(path = %bundle.display(), %err, "registrar rejected bundle");
                Outcome::Failed
            }
            Err(err) => {
                warn!(path = %bundle.display(), %err, "registrar task failed");
                Outcome::Failed
            }
        }
    }

    /// Expand into the watched folder.
    async fn expand(&self, archive: &Path) -> Outcome {
        info!(archive = %archive.display(), "expanding archive");
        let expander = Arc::clone(&self.expander);
        let (src, dest) = (archive.to_path_buf(), self.dir.clone());
        match tokio::task::spawn_blocking(move || expander.expand(&src, &dest)).await {
            Ok(Ok(())) => Outcome::Expanded,
            Ok(Err(err)) => {
                warn!(archive = %archive.display(), %err, "problem unzipping");
                Outcome::Failed
            }
            Err(err) => {
                warn!(archive = %archive.display(), %err, "expander task failed");
                Outcome::Failed
            }
        }
    }
}

/// Control surface for a running [`FolderMonitor`].
#[derive(Debug)]
pub struct MonitorHandle {
    token: CancellationToken,
    state: watch::Receiver<MonitorState>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Ask the loop to stop. Idempotent and cooperative: an adapter call in
    /// flight finishes first, an idle sleep is cut short. Safe to call from
    /// any thread while the loop runs.
    pub fn stop(&self) {
        self.token.cancel();
    }

    pub fn state(&self) -> MonitorState {
        *self.state.borrow()
    }

    /// Resolve once the loop has reached [`MonitorState::Stopped`], whether by
    /// request or because the watch became unusable.
    pub async fn wait_stopped(&self) {
        let mut state = self.state.clone();
        let _ = state.wait_for(|state| *state == MonitorState::Stopped).await;
    }

    /// Wait for the loop task to finish.
    pub async fn join(self) {
        if let Err(err) = self.task.await {
            warn!(%err, "folder monitor task failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::Mutex;

    use tracing_test::traced_test;

    use crate::adapters::{ExpansionError, RegistrarError};

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Register(String),
        Expand(String, PathBuf),
    }

    fn name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Records every adapter call. Optionally fails expansion, or fakes it by
    /// creating `<stem>.app` in the destination. Registration can be made to
    /// fail, panic, or cancel a token.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<Call>>,
        fail_expand: bool,
        produce_app: bool,
        reject_register: bool,
        panic_register: bool,
        stop_on_register: Option<CancellationToken>,
    }

    impl Recorder {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Registrar for Recorder {
        fn register(&self, bundle: &Path) -> Result<(), RegistrarError> {
            self.calls.lock().unwrap().push(Call::Register(name(bundle)));
            if let Some(token) = &self.stop_on_register {
                token.cancel();
            }
            if self.panic_register {
                panic!("registrar blew up on {}", bundle.display());
            }
            if self.reject_register {
                return Err(RegistrarError::Rejected {
                    path: bundle.to_path_buf(),
                    reason: "catalog is read-only".to_string(),
                });
            }
            Ok(())
        }
    }

    impl Expander for Recorder {
        fn expand(&self, archive: &Path, destination: &Path) -> Result<(), ExpansionError> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Expand(name(archive), destination.to_path_buf()));
            if self.fail_expand {
                return Err(ExpansionError::Io {
                    path: archive.to_path_buf(),
                    source: std::io::Error::other("disk full"),
                });
            }
            if self.produce_app {
                let stem = archive.file_stem().unwrap().to_string_lossy().into_owned();
                fs::create_dir(destination.join(format!("{stem}.app"))).unwrap();
            }
            Ok(())
        }
    }

    fn monitor(dir: &Path, recorder: &Arc<Recorder>) -> FolderMonitor {
        let options = MonitorOptions::new(dir).poll_interval(Duration::from_millis(20));
        FolderMonitor::new(options, recorder.clone(), recorder.clone())
            .expect("monitor should open")
    }

    async fn wait_until(recorder: &Recorder, pred: impl Fn(&[Call]) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while tokio::time::Instant::now() < deadline {
            if pred(&recorder.calls()) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    // ---------------------------------------------------------------------------
    // Construction
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn test_new_fails_for_missing_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder::default());
        let result = FolderMonitor::new(
            MonitorOptions::new(dir.path().join("missing")),
            recorder.clone(),
            recorder.clone(),
        );
        assert!(matches!(result, Err(SetupError::NotFound(_))));
        assert!(recorder.calls().is_empty());
    }

    // ---------------------------------------------------------------------------
    // Startup sweep
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn test_sweep_registers_existing_app() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("Foo.app")).expect("mkdir");
        fs::write(dir.path().join("notes.txt"), "x").expect("write");
        let recorder = Arc::new(Recorder::default());
        let monitor = monitor(dir.path(), &recorder);

        let summary = monitor.sweep().await.expect("sweep should succeed");
        assert_eq!(summary.registered, 1);
        assert_eq!(summary.ignored, 1);
        assert_eq!(recorder.calls(), vec![Call::Register("Foo.app".into())]);
    }

    #[tokio::test]
    async fn test_sweep_expands_archive_into_watched_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("Bundle.zip"), "zip").expect("write");
        let recorder = Arc::new(Recorder::default());
        let monitor = monitor(dir.path(), &recorder);

        let summary = monitor.sweep().await.expect("sweep should succeed");
        assert_eq!(summary.expanded, 1);
        assert_eq!(
            recorder.calls(),
            vec![Call::Expand("Bundle.zip".into(), monitor.dir().to_path_buf())]
        );
    }

    #[tokio::test]
    async fn test_sweep_twice_repeats_every_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("A.app")).expect("mkdir");
        fs::write(dir.path().join("B.ipa"), "ipa").expect("write");
        let recorder = Arc::new(Recorder::default());
        let monitor = monitor(dir.path(), &recorder);

        monitor.sweep().await.expect("first sweep");
        monitor.sweep().await.expect("second sweep");
        let once = vec![Call::Register("A.app".into()), Call::Register("B.ipa".into())];
        assert_eq!(recorder.calls(), [once.clone(), once].concat());
    }

    // ---------------------------------------------------------------------------
    // Dispatch table
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn test_deleted_and_modified_never_call_adapters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder::default());
        let monitor = monitor(dir.path(), &recorder);

        let dispatcher = &monitor.dispatcher;
        for file in ["Foo.app", "Foo.ipa", "Bundle.zip", "notes.txt"] {
            let path = monitor.dir().join(file);
            let deleted = dispatcher.dispatch(&ChangeEvent::deleted(&path)).await;
            assert_eq!(deleted, Outcome::Ignored);
            let modified = dispatcher.dispatch(&ChangeEvent::modified(&path)).await;
            assert_eq!(modified, Outcome::Ignored);
        }
        assert!(recorder.calls().is_empty(), "got {:?}", recorder.calls());
    }

    #[tokio::test]
    async fn test_created_dispatch() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder::default());
        let monitor = monitor(dir.path(), &recorder);
        let root = monitor.dir().to_path_buf();

        let dispatcher = &monitor.dispatcher;
        let created = |p: &str| ChangeEvent::created(root.join(p));
        assert_eq!(dispatcher.dispatch(&created("Foo.app")).await, Outcome::Registered);
        assert_eq!(dispatcher.dispatch(&created("Bundle.zip")).await, Outcome::Expanded);
        assert_eq!(dispatcher.dispatch(&created("readme.md")).await, Outcome::Ignored);
        assert_eq!(
            dispatcher.dispatch(&created("ipa.unzipped/Foo.app")).await,
            Outcome::Ignored
        );
        assert_eq!(
            recorder.calls(),
            vec![
                Call::Register("Foo.app".into()),
                Call::Expand("Bundle.zip".into(), root.clone()),
            ]
        );
    }

    #[tokio::test]
    async fn test_created_after_sweep_is_not_suppressed() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::create_dir(dir.path().join("Foo.app")).expect("mkdir");
        let recorder = Arc::new(Recorder::default());
        let monitor = monitor(dir.path(), &recorder);

        monitor.sweep().await.expect("sweep");
        monitor
            .dispatcher
            .dispatch(&ChangeEvent::created(monitor.dir().join("Foo.app")))
            .await;
        assert_eq!(
            recorder.calls(),
            vec![Call::Register("Foo.app".into()), Call::Register("Foo.app".into())]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_expansion_failure_is_logged_and_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder {
            fail_expand: true,
            ..Default::default()
        });
        let monitor = monitor(dir.path(), &recorder);
        let root = monitor.dir().to_path_buf();

        let dispatcher = &monitor.dispatcher;
        let outcome = dispatcher.dispatch(&ChangeEvent::created(root.join("Bad.zip"))).await;
        assert_eq!(outcome, Outcome::Failed);
        let outcome = dispatcher.dispatch(&ChangeEvent::created(root.join("Good.app"))).await;
        assert_eq!(outcome, Outcome::Registered);

        assert!(logs_contain("problem unzipping"));
        assert!(logs_contain("Bad.zip"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_registrar_rejection_is_logged_and_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder {
            reject_register: true,
            ..Default::default()
        });
        let monitor = monitor(dir.path(), &recorder);
        let root = monitor.dir().to_path_buf();

        let dispatcher = &monitor.dispatcher;
        let outcome = dispatcher.dispatch(&ChangeEvent::created(root.join("Foo.app"))).await;
        assert_eq!(outcome, Outcome::Failed);
        let outcome = dispatcher.dispatch(&ChangeEvent::created(root.join("Bundle.zip"))).await;
        assert_eq!(outcome, Outcome::Expanded);

        assert!(logs_contain("registrar rejected bundle"));
        assert!(logs_contain("catalog is read-only"));
        assert_eq!(
            recorder.calls(),
            vec![
                Call::Register("Foo.app".into()),
                Call::Expand("Bundle.zip".into(), root),
            ]
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_panicking_registrar_only_fails_its_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder {
            panic_register: true,
            ..Default::default()
        });
        let monitor = monitor(dir.path(), &recorder);
        let root = monitor.dir().to_path_buf();

        let dispatcher = &monitor.dispatcher;
        let outcome = dispatcher.dispatch(&ChangeEvent::created(root.join("Foo.app"))).await;
        assert_eq!(outcome, Outcome::Failed);
        let outcome = dispatcher.dispatch(&ChangeEvent::created(root.join("Bundle.zip"))).await;
        assert_eq!(outcome, Outcome::Expanded);
        assert!(logs_contain("registrar task failed"));
    }

    // ---------------------------------------------------------------------------
    // Run loop
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn test_stop_mid_batch_skips_remaining_events() {
        let dir = tempfile::tempdir().expect("tempdir");
        let token = CancellationToken::new();
        let recorder = Arc::new(Recorder {
            stop_on_register: Some(token.clone()),
            ..Default::default()
        });
        let (tx, rx) = std::sync::mpsc::channel();
        let session = WatchSession::with_channel(dir.path(), tx.clone(), rx).expect("open");
        let root = session.dir().to_path_buf();
        let monitor = FolderMonitor::with_session(
            session,
            Duration::from_millis(20),
            recorder.clone(),
            recorder.clone(),
        );

        let mut created = notify::Event::new(notify::EventKind::Create(
            notify::event::CreateKind::Folder,
        ));
        for file in ["A.app", "B.app", "C.zip"] {
            created = created.add_path(root.join(file));
        }
        tx.send(Ok(created)).expect("send");

        let state = monitor.state.subscribe();
        tokio::time::timeout(Duration::from_secs(5), monitor.run(token))
            .await
            .expect("loop should stop within the timeout");
        assert_eq!(*state.borrow(), MonitorState::Stopped);
        assert_eq!(recorder.calls(), vec![Call::Register("A.app".into())]);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_poll_error_is_logged_and_loop_continues() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder::default());
        let (tx, rx) = std::sync::mpsc::channel();
        let session = WatchSession::with_channel(dir.path(), tx.clone(), rx).expect("open");
        let root = session.dir().to_path_buf();
        let monitor = FolderMonitor::with_session(
            session,
            Duration::from_millis(20),
            recorder.clone(),
            recorder.clone(),
        );
        tx.send(Err(notify::Error::generic("queue overflow")))
            .expect("send");
        fs::create_dir(root.join("Late.app")).expect("mkdir");

        // Drive the loop on this task so its log lines are captured.
        let token = CancellationToken::new();
        let stopper = async {
            let seen = wait_until(&recorder, |calls| {
                calls.contains(&Call::Register("Late.app".into()))
            })
            .await;
            token.cancel();
            seen
        };
        let ((), seen) = tokio::join!(monitor.run(token.clone()), stopper);

        assert!(seen, "Late.app never registered: {:?}", recorder.calls());
        assert!(logs_contain("problem monitoring the folder"));
        assert!(logs_contain("queue overflow"));
    }

    #[tokio::test]
    async fn test_archive_expansion_is_picked_up_on_later_pass() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder {
            produce_app: true,
            ..Default::default()
        });
        let monitor = monitor(dir.path(), &recorder);
        let root = monitor.dir().to_path_buf();
        let (handle, summary) = monitor.start().await.expect("start");
        assert_eq!(summary, SweepSummary::default());
        assert_ne!(handle.state(), MonitorState::Stopped);

        fs::write(root.join("Bundle.zip"), "zip").expect("write");
        let seen = wait_until(&recorder, |calls| {
            calls.contains(&Call::Register("Bundle.app".into()))
        })
        .await;
        assert!(seen, "Bundle.app never registered: {:?}", recorder.calls());

        handle.stop();
        handle.join().await;
        assert_eq!(
            recorder.calls(),
            vec![
                Call::Expand("Bundle.zip".into(), root),
                Call::Register("Bundle.app".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_ends_loop_and_silences_adapters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder::default());
        let monitor = monitor(dir.path(), &recorder);
        let root = monitor.dir().to_path_buf();
        let handle = monitor.spawn();

        handle.stop();
        handle.stop();
        tokio::time::timeout(Duration::from_secs(5), handle.wait_stopped())
            .await
            .expect("loop should stop within the timeout");
        assert_eq!(handle.state(), MonitorState::Stopped);

        fs::create_dir(root.join("Late.app")).expect("mkdir");
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(recorder.calls().is_empty(), "got {:?}", recorder.calls());
        handle.join().await;
    }

    #[tokio::test]
    async fn test_stop_from_another_thread() {
        let dir = tempfile::tempdir().expect("tempdir");
        let recorder = Arc::new(Recorder::default());
        let handle = Arc::new(monitor(dir.path(), &recorder).spawn());

        let remote = Arc::clone(&handle);
        std::thread::spawn(move || remote.stop())
            .join()
            .expect("stop thread");
        tokio::time::timeout(Duration::from_secs(5), handle.wait_stopped())
            .await
            .expect("loop should stop within the timeout");
        let handle = Arc::into_inner(handle).expect("sole owner");
        handle.join().await;
    }

    #[tokio::test]
    async fn test_removed_directory_stops_monitor() {
        let root = tempfile::tempdir().expect("tempdir");
        let watched = root.path().join("apps");
        fs::create_dir(&watched).expect("mkdir");
        let recorder = Arc::new(Recorder::default());
        let handle = monitor(&watched, &recorder).spawn();

        fs::remove_dir(&watched).expect("rmdir");
        tokio::time::timeout(Duration::from_secs(5), handle.wait_stopped())
            .await
            .expect("monitor should stop once the folder is gone");
        assert_eq!(handle.state(), MonitorState::Stopped);
        handle.join().await;
    }
}
