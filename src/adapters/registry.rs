use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::Serialize;
use tracing::{debug, info};

use super::{Registrar, RegistrarError};

/// Packaging of a registered application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleKind {
    /// `.app` bundle directory.
    App,
    /// `.ipa` package.
    Ipa,
}

impl BundleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BundleKind::App => "app",
            BundleKind::Ipa => "ipa",
        }
    }
}

/// An application known to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Application {
    pub name: String,
    pub kind: BundleKind,
    pub path: PathBuf,
}

impl Application {
    fn from_bundle(path: &Path) -> Option<Self> {
        let kind = match path.extension().and_then(|e| e.to_str()) {
            Some("app") => BundleKind::App,
            Some("ipa") => BundleKind::Ipa,
            _ => return None,
        };
        let name = path.file_stem()?.to_string_lossy().into_owned();
        Some(Self {
            name,
            kind,
            path: path.to_path_buf(),
        })
    }
}

/// In-memory registry of supported applications, keyed by bundle path.
///
/// Shared between the monitor (writer) and the host (reader).
#[derive(Debug, Default)]
pub struct AppRegistry {
    apps: RwLock<BTreeMap<PathBuf, Application>>,
}

impl AppRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the registered applications, sorted by path.
    pub fn applications(&self) -> Vec<Application> {
        let apps = self.apps.read().unwrap_or_else(|e| e.into_inner());
        apps.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.apps.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Registrar for AppRegistry {
    fn register(&self, bundle: &Path) -> Result<(), RegistrarError> {
        let app = Application::from_bundle(bundle).ok_or_else(|| RegistrarError::Rejected {
            path: bundle.to_path_buf(),
            reason: "not a .app or .ipa bundle".to_string(),
        })?;

        let mut apps = self.apps.write().unwrap_or_else(|e| e.into_inner());
        if apps.contains_key(bundle) {
            debug!(path = %bundle.display(), "application already registered");
            return Ok(());
        }
        info!(name = %app.name, kind = ?app.kind, "registered application");
        apps.insert(bundle.to_path_buf(), app);
        Ok(())
    }
}
