use std::path::Path;

use serde::Serialize;

/// What a directory entry means to the folder monitor.
///
/// Always derived from the entry's name and path, never cached: the same path
/// can be re-observed in a different state (an archive replaced by its
/// expansion output, for instance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// An installable bundle (`.app` directory or `.ipa` package).
    Application,
    /// A compressed container to expand into the watched folder.
    Archive,
    Irrelevant,
}

/// Suffixes recognised as application bundles.
const BUNDLE_SUFFIXES: &[&str] = &[".app", ".ipa"];

/// Suffixes recognised as expandable archives.
const ARCHIVE_SUFFIXES: &[&str] = &[".zip"];

/// Path components ending with this marker hold the output of a previous
/// expansion (e.g. `ipa.unzipped`). Bundles below them are not re-registered.
/// A bare `unzipped` directory, such as a watched folder with that name, is
/// not a marker.
const EXPANSION_MARKER: &str = ".unzipped";

impl Category {
    /// Classify a path, taking the entry name from its last component.
    pub fn of(path: &Path) -> Category {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        classify(&name, path)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Application => "application",
            Category::Archive => "archive",
            Category::Irrelevant => "irrelevant",
        }
    }
}

/// Map an entry's base name and full path to its [`Category`].
///
/// Pure: only looks at the strings, so it works for entries that no longer
/// exist on disk. Matching is case-sensitive.
pub fn classify(name: &str, path: &Path) -> Category {
    if ARCHIVE_SUFFIXES.iter().any(|s| name.ends_with(s)) {
        return Category::Archive;
    }
    if BUNDLE_SUFFIXES.iter().any(|s| name.ends_with(s)) && !is_expansion_output(path) {
        return Category::Application;
    }
    Category::Irrelevant
}

fn is_expansion_output(path: &Path) -> bool {
    path.components()
        .any(|c| c.as_os_str().to_string_lossy().ends_with(EXPANSION_MARKER))
}
