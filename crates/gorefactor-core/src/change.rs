//! File-system change requests.
//!
//! Some refactorings need more than text edits: renaming a package also
//! renames the directory that holds it. The core only describes such
//! changes; executing them is the caller's job, after text edits are written.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A requested change to the file system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FsChange {
    /// Rename a file or directory.
    Rename {
        /// Current path.
        from: PathBuf,
        /// New path (same parent directory, new final component).
        to: PathBuf,
    },
}

impl FsChange {
    /// Request renaming `path` to `new_name` within its parent directory.
    pub fn rename_in_place(path: impl AsRef<Path>, new_name: &str) -> Self {
        let from = path.as_ref().to_path_buf();
        let to = match from.parent() {
            Some(parent) => parent.join(new_name),
            None => PathBuf::from(new_name),
        };
        FsChange::Rename { from, to }
    }

    /// The path this change reads from.
    pub fn source(&self) -> &Path {
        match self {
            FsChange::Rename { from, .. } => from,
        }
    }
}

impl fmt::Display for FsChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FsChange::Rename { from, to } => {
                write!(f, "rename {} -> {}", from.display(), to.display())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_in_place_keeps_parent() {
        let change = FsChange::rename_in_place("src/shapes", "geometry");
        assert_eq!(
            change,
            FsChange::Rename {
                from: PathBuf::from("src/shapes"),
                to: PathBuf::from("src/geometry"),
            }
        );
        assert_eq!(change.to_string(), "rename src/shapes -> src/geometry");
    }

    #[test]
    fn rename_top_level_directory() {
        let change = FsChange::rename_in_place("shapes", "geometry");
        assert_eq!(change.source(), Path::new("shapes"));
        match change {
            FsChange::Rename { to, .. } => assert_eq!(to, PathBuf::from("geometry")),
        }
    }
}
