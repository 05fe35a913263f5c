use crate::{Error, Result};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::Path;

/// Directories and files never worth parsing
const DEFAULT_EXCLUDES: &[&str] = &[
    // Dependency caches and build output
    "node_modules/", "bower_components/", "target/", "venv/", ".venv/", "vendor/",
    "dist/", "build/", "out/", "coverage/", "__pycache__/", "*.egg-info/",
    ".git/", ".hg/", ".svn/", ".vscode/", ".idea/",

    // Generated sources
    "*.min.js", "*.bundle.js", "*.d.ts.map", "*.js.map",
];

pub struct IgnoreFilter {
    inner: Gitignore,
}

impl IgnoreFilter {
    /// Build the filter for a walk rooted at `root`.
    ///
    /// Lines from `.gitignore` and `.ignore` at the root come first, then the
    /// defaults, then `extra_excludes`. Later lines win, so a `!pattern` in
    /// the excludes can re-include something a default hides.
    pub fn new(root: &Path, extra_excludes: &[String]) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(root);

        // A missing ignore file is not an error
        for name in [".gitignore", ".ignore"] {
            let path = root.join(name);
            if path.is_file() {
                if let Some(err) = builder.add(&path) {
                    tracing::warn!("Ignoring unreadable {}: {}", path.display(), err);
                }
            }
        }

        for pattern in DEFAULT_EXCLUDES {
            // Static patterns, known to be valid
            builder.add_line(None, pattern).ok();
        }

        for pattern in extra_excludes {
            builder
                .add_line(None, pattern)
                .map_err(|e| Error::Config(format!("invalid exclude pattern `{}`: {}", pattern, e)))?;
        }

        let inner = builder
            .build()
            .map_err(|e| Error::Config(format!("failed to build ignore rules: {}", e)))?;
        Ok(Self { inner })
    }

    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.inner.matched(path, is_dir).is_ignore()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_excludes() {
        let dir = TempDir::new().unwrap();
        let filter = IgnoreFilter::new(dir.path(), &[]).unwrap();

        assert!(filter.is_ignored(&dir.path().join("node_modules"), true));
        assert!(filter.is_ignored(&dir.path().join("web/node_modules"), true));
        assert!(filter.is_ignored(&dir.path().join("app.min.js"), false));
        assert!(!filter.is_ignored(&dir.path().join("src"), true));
        assert!(!filter.is_ignored(&dir.path().join("src/app.js"), false));
        // Directory-only patterns leave files of the same name alone
        assert!(!filter.is_ignored(&dir.path().join("build"), false));
    }

    #[test]
    fn test_gitignore_and_extra_excludes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "generated/\n*.gen.ts\n").unwrap();
        let filter = IgnoreFilter::new(dir.path(), &["legacy/".to_string(), "!vendor/".to_string()]).unwrap();

        assert!(filter.is_ignored(&dir.path().join("generated"), true));
        assert!(filter.is_ignored(&dir.path().join("src/api.gen.ts"), false));
        assert!(filter.is_ignored(&dir.path().join("legacy"), true));
        assert!(!filter.is_ignored(&dir.path().join("vendor"), true));
    }

    #[test]
    fn test_invalid_exclude_is_config_error() {
        let dir = TempDir::new().unwrap();
        for pattern in ["a{b", "[z-a]"] {
            let err = IgnoreFilter::new(dir.path(), &[pattern.to_string()]).err().unwrap();
            assert!(matches!(err, Error::Config(_)), "{pattern}");
        }
    }
}
