use std::path::{Path, PathBuf};

use notify::event::{EventKind, ModifyKind, RenameMode};

/// Kind of change observed in the watched directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Deleted,
    /// Content or metadata change. The session never registers interest in
    /// these, but the dispatch table still names them.
    #[allow(dead_code)]
    Modified,
}

/// A single change, consumed once per poll batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

impl ChangeEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Created,
            path: path.into(),
        }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            path: path.into(),
        }
    }

    #[cfg(test)]
    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: ChangeKind::Modified,
            path: path.into(),
        }
    }
}

/// Translate a raw notify event into directory-scoped create/delete events.
///
/// Only direct children of `dir` are reported. Content/metadata modifications
/// and access events are dropped. Renames map onto create/delete:
/// - `To` half → Created
/// - `From` half → Deleted
/// - paired `Both` event → nothing, the halves already reported it
/// - ambiguous rename (FSEvents) → Created if the path exists, else Deleted
pub fn translate(event: &notify::Event, dir: &Path) -> Vec<ChangeEvent> {
    let children = || event.paths.iter().filter(|p| p.parent() == Some(dir));

    match event.kind {
        EventKind::Create(_) => children().map(ChangeEvent::created).collect(),
        EventKind::Remove(_) => children().map(ChangeEvent::deleted).collect(),
        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::To => children().map(ChangeEvent::created).collect(),
            RenameMode::From => children().map(ChangeEvent::deleted).collect(),
            // Backends that pair renames also send the From and To halves.
            RenameMode::Both => Vec::new(),
            RenameMode::Any | RenameMode::Other => children()
                .map(|p| {
                    if p.exists() {
                        ChangeEvent::created(p)
                    } else {
                        ChangeEvent::deleted(p)
                    }
                })
                .collect(),
        },
        EventKind::Modify(_) | EventKind::Access(_) | EventKind::Any | EventKind::Other => {
            Vec::new()
        }
    }
}

/// True when the event reports the watched directory itself as gone.
pub fn removes_root(event: &notify::Event, dir: &Path) -> bool {
    let gone = matches!(
        event.kind,
        EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Name(RenameMode::From))
    );
    gone && event.paths.iter().any(|p| p == dir)
}
