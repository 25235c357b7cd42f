//! Boundaries to the collaborators the folder monitor drives.
//!
//! The monitor only looks at the `Result` each call returns: failures are
//! logged and never stop the run loop.

pub mod registry;
pub mod unzip;

use std::path::{Path, PathBuf};

use thiserror::Error;

pub use registry::AppRegistry;
pub use unzip::ZipExpander;

/// A registrar refused a bundle.
#[derive(Debug, Error)]
pub enum RegistrarError {
    #[error("{} rejected: {reason}", path.display())]
    Rejected { path: PathBuf, reason: String },
}

/// An archive could not be expanded. The archive is left in place.
#[derive(Debug, Error)]
pub enum ExpansionError {
    #[error("i/o error expanding {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a readable archive: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    #[error("{} contains an entry outside the destination: {entry}", archive.display())]
    UnsafeEntry { archive: PathBuf, entry: String },
}

/// Receives every application bundle the monitor discovers.
pub trait Registrar: Send + Sync {
    /// Register the bundle at `bundle`. Registering a known bundle again must
    /// be a no-op that still returns `Ok`.
    fn register(&self, bundle: &Path) -> Result<(), RegistrarError>;
}

/// Expands archives dropped into the watched folder.
pub trait Expander: Send + Sync {
    /// Expand `archive` into `destination`.
    fn expand(&self, archive: &Path, destination: &Path) -> Result<(), ExpansionError>;
}
