//! Migration file discovery
//!
//! Directory arguments are walked honoring `.gitignore`/`.ignore`, a few
//! noise directories and the configured excludes. A file is kept when its
//! name matches one of the include globs. Explicit file arguments are taken
//! as given, even if missing, so the batch can report them.

use crate::{Error, Result};
use glob::Pattern;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

const DEFAULT_EXCLUDES: &[&str] = &[
    ".git/",
    ".sqlfold/",
    "target/",
    "node_modules/",
    "vendor/",
    "dist/",
    "build/",
];

/// Finds migration files below a set of paths
pub struct Discovery {
    include: Vec<Pattern>,
    exclude: Vec<String>,
}

impl Default for Discovery {
    fn default() -> Self {
        Self {
            include: vec![Pattern::new("*.sql").expect("static glob")],
            exclude: Vec::new(),
        }
    }
}

impl Discovery {
    /// `include` are filename globs; `exclude` are gitignore-style lines.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include = include
            .iter()
            .map(|raw| {
                Pattern::new(raw).map_err(|e| Error::InvalidGlob {
                    pattern: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            include,
            exclude: exclude.to_vec(),
        })
    }

    fn exclude_filter(&self, root: &Path) -> Gitignore {
        let mut builder = GitignoreBuilder::new(root);
        for line in DEFAULT_EXCLUDES.iter().copied().chain(self.exclude.iter().map(String::as_str)) {
            if let Err(e) = builder.add_line(None, line) {
                tracing::warn!("Ignoring exclude {:?}: {}", line, e);
            }
        }
        builder.build().unwrap_or_else(|_| Gitignore::empty())
    }

    /// Whether a file name matches an include glob
    pub fn is_included(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.include.iter().any(|p| p.matches(name))
    }

    /// Expand `paths` into a sorted, deduplicated list of files.
    pub fn discover(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut found = Vec::new();

        for path in paths {
            if !path.is_dir() {
                found.push(path.clone());
                continue;
            }

            let excludes = self.exclude_filter(path);
            let root = path.clone();
            let walker = WalkBuilder::new(path)
                .require_git(false)
                .filter_entry(move |entry| {
                    let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                    let relative = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                    // excluded directories are pruned, so their contents never reach here
                    !excludes.matched(relative, is_dir).is_ignore()
                })
                .build();

            for entry in walker {
                match entry {
                    Ok(entry) => {
                        let is_file = entry.file_type().is_some_and(|t| t.is_file());
                        if is_file && self.is_included(entry.path()) {
                            found.push(entry.into_path());
                        }
                    }
                    Err(e) => tracing::warn!("Skipping entry under {}: {}", path.display(), e),
                }
            }
        }

        found.sort();
        found.dedup();
        tracing::debug!("Discovered {} migration files", found.len());
        found
    }
}
