use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};
use zip::ZipArchive;

use super::{ExpansionError, Expander};

/// Expands `.zip` archives with the `zip` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipExpander;

impl ZipExpander {
    pub fn new() -> Self {
        Self
    }
}

impl Expander for ZipExpander {
    fn expand(&self, archive: &Path, destination: &Path) -> Result<(), ExpansionError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: io::Error| ExpansionError::Io { path, source }
        };

        let file = fs::File::open(archive).map_err(io_err(archive))?;
        let mut zip = ZipArchive::new(file).map_err(|source| ExpansionError::Archive {
            path: archive.to_path_buf(),
            source,
        })?;

        info!(archive = %archive.display(), entries = zip.len(), "unzipping");
        for i in 0..zip.len() {
            let mut entry = zip.by_index(i).map_err(|source| ExpansionError::Archive {
                path: archive.to_path_buf(),
                source,
            })?;

            // Refuse absolute paths and `..` components.
            let Some(relative) = entry.enclosed_name().map(Path::to_path_buf) else {
                return Err(ExpansionError::UnsafeEntry {
                    archive: archive.to_path_buf(),
                    entry: entry.name().to_string(),
                });
            };
            let out = destination.join(&relative);

            if entry.is_dir() {
                fs::create_dir_all(&out).map_err(io_err(&out))?;
                continue;
            }
            if let Some(parent) = out.parent() {
                fs::create_dir_all(parent).map_err(io_err(parent))?;
            }
            let mut target = fs::File::create(&out).map_err(io_err(&out))?;
            io::copy(&mut entry, &mut target).map_err(io_err(&out))?;
            debug!(path = %out.display(), "extracted");

            // Bundle executables need their mode bits back.
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Some(mode) = entry.unix_mode() {
                    fs::set_permissions(&out, fs::Permissions::from_mode(mode & 0o7777))
                        .map_err(io_err(&out))?;
                }
            }
        }
        Ok(())
    }
}
