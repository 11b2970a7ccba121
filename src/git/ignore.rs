//! `.gitscribeignore` pattern handling.
//!
//! Users can exclude paths from message generation without touching
//! `.gitignore` by listing glob patterns in a `.gitscribeignore` file at
//! the repository root.

use std::fs;
use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::warn;

/// Name of the ignore file read from the repository root.
pub const IGNORE_FILE: &str = ".gitscribeignore";

/// Compiled ignore patterns for one repository.
pub struct ScribeIgnore {
    set: Option<GlobSet>,
}

impl ScribeIgnore {
    /// Loads patterns from `dir/.gitscribeignore`.
    ///
    /// A missing file is normal and yields an empty matcher. Invalid
    /// patterns are skipped with a warning rather than failing the run.
    pub fn load(dir: &Path) -> Self {
        let Ok(content) = fs::read_to_string(dir.join(IGNORE_FILE)) else {
            return Self { set: None };
        };
        Self::from_patterns(content.lines())
    }

    /// Compiles a matcher from pattern lines.
    pub fn from_patterns<'a>(lines: impl IntoIterator<Item = &'a str>) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut any = false;

        for line in lines {
            let pattern = line.trim();
            if pattern.is_empty() || pattern.starts_with('#') {
                continue;
            }
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                    any = true;
                }
                Err(e) => warn!(pattern, error = %e, "skipping invalid ignore pattern"),
            }
        }

        if !any {
            return Self { set: None };
        }

        match builder.build() {
            Ok(set) => Self { set: Some(set) },
            Err(e) => {
                warn!(error = %e, "failed to compile ignore patterns");
                Self { set: None }
            }
        }
    }

    /// Whether `path` matches any ignore pattern.
    pub fn is_ignored(&self, path: &str) -> bool {
        self.set.as_ref().is_some_and(|set| set.is_match(path))
    }
}
