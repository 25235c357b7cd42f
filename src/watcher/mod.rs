pub mod event;

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{debug, trace};

use event::ChangeEvent;

/// The watched directory could not be set up. Fatal: the monitor never starts.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("watched folder {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot watch {}: {source}", path.display())]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

/// Runtime failures reported by a [`WatchSession`].
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transient notification failure; the caller logs it and polls again later.
    #[error("problem monitoring the folder: {0}")]
    Poll(#[source] notify::Error),
    /// The watch can no longer be used (the directory is presumed gone).
    #[error("can't monitor {} anymore, has it been deleted?", .0.display())]
    CursorInvalid(PathBuf),
}

/// Check that `dir` exists, is a directory and can be listed.
pub fn check_directory(dir: &Path) -> Result<(), SetupError> {
    let meta = std::fs::metadata(dir).map_err(|err| match err.kind() {
        std::io::ErrorKind::NotFound => SetupError::NotFound(dir.to_path_buf()),
        _ => SetupError::Unreadable {
            path: dir.to_path_buf(),
            source: err,
        },
    })?;
    if !meta.is_dir() {
        return Err(SetupError::NotADirectory(dir.to_path_buf()));
    }
    std::fs::read_dir(dir).map_err(|source| SetupError::Unreadable {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Live registration of one directory with the OS notification mechanism.
///
/// The receiving end of the notify channel is the cursor: `poll` drains what
/// accumulated since the last call, `reset` re-arms it. Once the cursor is
/// invalid it stays invalid; the owner must `close` the session.
pub struct WatchSession {
    dir: PathBuf,
    /// Keep alive: dropping the watcher unregisters the OS watch.
    watcher: RecommendedWatcher,
    rx: Receiver<notify::Result<notify::Event>>,
    /// Error seen after events were already drained; reported on the next poll.
    deferred: Option<notify::Error>,
    root_removed: bool,
    valid: bool,
}

impl WatchSession {
    /// Register interest in create/delete events for the direct children of `dir`.
    pub fn open(dir: &Path) -> Result<Self, SetupError> {
        let (tx, rx) = mpsc::channel();
        Self::with_channel(dir, tx, rx)
    }

    /// Like [`open`](Self::open), but notifications flow through the given
    /// channel, so other senders can feed the same cursor.
    pub(crate) fn with_channel(
        dir: &Path,
        tx: Sender<notify::Result<notify::Event>>,
        rx: Receiver<notify::Result<notify::Event>>,
    ) -> Result<Self, SetupError> {
        check_directory(dir)?;
        let dir = dir.canonicalize().map_err(|source| SetupError::Unreadable {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut watcher = notify::recommended_watcher(move |res| {
            // Receiver dropped means the session is closing.
            let _ = tx.send(res);
        })
        .map_err(|source| SetupError::Watch {
            path: dir.clone(),
            source,
        })?;
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|source| SetupError::Watch {
                path: dir.clone(),
                source,
            })?;
        debug!(dir = %dir.display(), "watch registered");

        Ok(Self {
            dir,
            watcher,
            rx,
            deferred: None,
            root_removed: false,
            valid: true,
        })
    }

    /// The canonical path of the watched directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Drain every event accumulated since the previous poll, without blocking.
    ///
    /// Duplicate notifications for the same path are passed through.
    pub fn poll(&mut self) -> Result<Vec<ChangeEvent>, SessionError> {
        if !self.valid {
            return Err(SessionError::CursorInvalid(self.dir.clone()));
        }
        if let Some(err) = self.deferred.take() {
            return Err(SessionError::Poll(err));
        }

        let mut batch = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(Ok(raw)) => {
                    trace!(?raw, "raw notification");
                    if event::removes_root(&raw, &self.dir) {
                        self.root_removed = true;
                    }
                    batch.extend(event::translate(&raw, &self.dir));
                }
                Ok(Err(err)) => {
                    if batch.is_empty() {
                        return Err(SessionError::Poll(err));
                    }
                    self.deferred = Some(err);
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.valid = false;
                    break;
                }
            }
        }
        Ok(batch)
    }

    /// Re-arm the cursor after a batch.
    ///
    /// Fails, and invalidates the cursor for good, when the watched directory
    /// is gone or the notification channel has shut down.
    pub fn reset(&mut self) -> Result<(), SessionError> {
        if self.valid && (self.root_removed || !self.dir.is_dir()) {
            self.valid = false;
        }
        if self.valid {
            Ok(())
        } else {
            Err(SessionError::CursorInvalid(self.dir.clone()))
        }
    }

    /// Unregister the watch and release the session.
    pub fn close(mut self) {
        // Fails when the directory is already gone; the watch is dropped either way.
        if let Err(err) = self.watcher.unwatch(&self.dir) {
            debug!(dir = %self.dir.display(), %err, "unwatch failed");
        }
        debug!(dir = %self.dir.display(), "watch released");
    }
}
