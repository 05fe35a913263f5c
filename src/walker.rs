//! Source tree walker
//!
//! Lazily enumerates the files under a root directory, in a stable
//! file-name order, skipping ignored directories without descending into
//! them. Each call to [`SourceWalker::iter`] starts a fresh walk.

use crate::ignore::IgnoreFilter;
use crate::{Error, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Filters applied while walking
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Accepted file extensions without the dot. Empty accepts every file.
    pub extensions: Vec<String>,
    /// Extra gitignore-style exclude lines
    pub excludes: Vec<String>,
    pub follow_links: bool,
    pub max_depth: Option<usize>,
}

impl WalkOptions {
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_excludes<I, S>(mut self, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes = excludes.into_iter().map(Into::into).collect();
        self
    }

    fn accepts(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
    }
}

pub struct SourceWalker {
    root: PathBuf,
    options: WalkOptions,
    filter: Arc<IgnoreFilter>,
}

impl SourceWalker {
    /// Prepare a walk of `root`. Fails with `PathNotFound` if the root does
    /// not exist; nothing is read beyond the root's metadata and ignore files.
    pub fn new(root: impl AsRef<Path>, options: WalkOptions) -> Result<Self> {
        let root = root.as_ref();
        std::fs::metadata(root).map_err(|e| Error::from_io(root, e))?;
        let root = std::path::absolute(root).map_err(|e| Error::from_io(root, e))?;
        let filter = IgnoreFilter::new(&root, &options.excludes)?;

        Ok(Self {
            root,
            options,
            filter: Arc::new(filter),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn options(&self) -> &WalkOptions {
        &self.options
    }

    /// Start a new walk. Per-entry failures are yielded as errors and the
    /// walk carries on past them.
    pub fn iter(&self) -> Walk<'_> {
        let mut builder = WalkBuilder::new(&self.root);
        builder
            .standard_filters(false)
            .follow_links(self.options.follow_links)
            .max_depth(self.options.max_depth)
            .sort_by_file_name(|a, b| a.cmp(b));

        let filter = Arc::clone(&self.filter);
        builder.filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !filter.is_ignored(entry.path(), is_dir)
        });

        Walk {
            walker: self,
            inner: builder.build(),
        }
    }
}

impl<'w> IntoIterator for &'w SourceWalker {
    type Item = Result<PathBuf>;
    type IntoIter = Walk<'w>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// One pass over a [`SourceWalker`]'s tree
pub struct Walk<'w> {
    walker: &'w SourceWalker,
    inner: ignore::Walk,
}

impl Iterator for Walk<'_> {
    type Item = Result<PathBuf>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    let err = walk_error(err, &self.walker.root);
                    tracing::warn!("Skipping entry: {}", err);
                    return Some(Err(err));
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            // An explicit file root bypasses the extension filter
            if entry.depth() > 0 && !self.walker.options.accepts(entry.path()) {
                continue;
            }
            return Some(Ok(entry.into_path()));
        }
    }
}

/// Map a walk error into the taxonomy, keeping the deepest known path
fn walk_error(err: ignore::Error, path: &Path) -> Error {
    match err {
        ignore::Error::WithPath { path, err } => walk_error(*err, &path),
        ignore::Error::WithDepth { err, .. } | ignore::Error::WithLineNumber { err, .. } => walk_error(*err, path),
        ignore::Error::Loop { ancestor, child } => Error::SymlinkLoop { ancestor, child },
        ignore::Error::Io(source) => Error::from_io(path, source),
        other => Error::Walk(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn relative(walker: &SourceWalker) -> Vec<String> {
        walker
            .iter()
            .map(|p| {
                p.unwrap()
                    .strip_prefix(walker.root())
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_skips_dependency_directories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/app.ts");
        touch(dir.path(), "node_modules/lib/index.ts");
        touch(dir.path(), "web/node_modules/dep.ts");

        let walker = SourceWalker::new(dir.path(), WalkOptions::default()).unwrap();
        assert_eq!(relative(&walker), vec!["src/app.ts"]);
    }

    #[test]
    fn test_sorted_and_restartable() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.js");
        touch(dir.path(), "a/z.js");
        touch(dir.path(), "c.js");

        let walker = SourceWalker::new(dir.path(), WalkOptions::default()).unwrap();
        let first = relative(&walker);
        assert_eq!(first, vec!["a/z.js", "b.js", "c.js"]);
        assert_eq!(relative(&walker), first);
        assert!(walker.iter().all(|p| p.unwrap().is_absolute()));
    }

    #[test]
    fn test_extension_filter_and_excludes() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a.ts");
        touch(dir.path(), "b.TSX");
        touch(dir.path(), "README.md");
        touch(dir.path(), "legacy/old.ts");

        let options = WalkOptions::default()
            .with_extensions(["ts", "tsx"])
            .with_excludes(["legacy/"]);
        let walker = SourceWalker::new(dir.path(), options).unwrap();
        assert_eq!(relative(&walker), vec!["a.ts", "b.TSX"]);
    }

    #[test]
    fn test_max_depth() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "top.go");
        touch(dir.path(), "pkg/deep.go");

        let options = WalkOptions {
            max_depth: Some(1),
            ..WalkOptions::default()
        };
        let walker = SourceWalker::new(dir.path(), options).unwrap();
        assert_eq!(relative(&walker), vec!["top.go"]);
    }

    #[test]
    fn test_file_root_bypasses_extension_filter() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "script");

        let options = WalkOptions::default().with_extensions(["py"]);
        let walker = SourceWalker::new(dir.path().join("script"), options).unwrap();
        assert_eq!(walker.iter().count(), 1);
    }

    #[test]
    fn test_missing_root() {
        let dir = TempDir::new().unwrap();
        let err = SourceWalker::new(dir.path().join("nope"), WalkOptions::default()).err().unwrap();
        assert!(matches!(err, Error::PathNotFound(_)));
    }

    #[test]
    fn test_io_errors_keep_permission_kind() {
        let err = ignore::Error::WithPath {
            path: PathBuf::from("/repo/secret"),
            err: Box::new(ignore::Error::Io(std::io::Error::from(std::io::ErrorKind::PermissionDenied))),
        };
        match walk_error(err, Path::new("/repo")) {
            Error::PermissionDenied(path) => assert_eq!(path, PathBuf::from("/repo/secret")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_terminates() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "a/file.rs");
        std::os::unix::fs::symlink(dir.path(), dir.path().join("a/loop")).unwrap();

        // Without following links the cycle is invisible
        let walker = SourceWalker::new(dir.path(), WalkOptions::default()).unwrap();
        assert_eq!(relative(&walker), vec!["a/file.rs"]);

        let options = WalkOptions {
            follow_links: true,
            ..WalkOptions::default()
        };
        let walker = SourceWalker::new(dir.path(), options).unwrap();
        let results: Vec<_> = walker.iter().collect();
        assert!(results.iter().any(|r| matches!(r, Err(Error::SymlinkLoop { .. }))));
        let files = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(files, 1);
    }
}
