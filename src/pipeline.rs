//! Search pipeline
//!
//! Ties the walker, grammar registry, parser adapters and match engine
//! together:
//! - One producer thread walks the tree and feeds a bounded work queue;
//!   at most `queue_capacity + threads` entries are between the walk and
//!   the sink at any time
//! - A pool of workers reads, parses and matches one file at a time, each
//!   worker keeping its own parser adapter per language
//! - The calling thread collects outcomes and hands them to the sink in
//!   walk order, whatever the number of workers
//!
//! Per-file and per-entry failures become skipped outcomes; only a missing
//! root or an unusable pattern fails the whole run.

use crate::adapter::{Grammar, GrammarRegistry, ParserAdapter};
use crate::pattern::{MatchMode, Pattern, PatternError};
use crate::query::{evaluate, MatchRecord};
use crate::source::SourceFile;
use crate::tree::SyntaxTree;
use crate::walker::{SourceWalker, WalkOptions};
use crate::{Error, Result};
use crossbeam::channel;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Shared flag that stops a running search.
///
/// Once canceled no new files are dispatched. Parses already in flight run
/// to completion and everything delivered so far is kept.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Parse every file as this language instead of going by extension
    pub language: Option<String>,
    pub walk: WalkOptions,
    /// Worker count; `None` uses the available parallelism
    pub threads: Option<usize>,
    pub queue_capacity: usize,
    pub parse_timeout: Option<Duration>,
    pub mode: MatchMode,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            language: None,
            walk: WalkOptions::default(),
            threads: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            parse_timeout: None,
            mode: MatchMode::All,
        }
    }
}

/// What happened to one walked entry
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub language: Option<String>,
    pub records: Vec<MatchRecord>,
    pub match_count: usize,
    /// The tree carried error or missing nodes
    pub partial: bool,
    /// Set when the entry was skipped
    pub error: Option<Error>,
}

impl FileOutcome {
    fn skipped(path: PathBuf, error: Error) -> Self {
        Self {
            path,
            language: None,
            records: Vec::new(),
            match_count: 0,
            partial: false,
            error: Some(error),
        }
    }

    fn matched(path: &Path, pattern: &Pattern, tree: &SyntaxTree) -> Self {
        let file_path = path.to_string_lossy();
        let mut records = Vec::new();
        let mut match_count = 0;
        for found in evaluate(pattern, tree) {
            match_count += 1;
            records.extend(MatchRecord::from_match(&file_path, &found));
        }
        Self {
            path: path.to_path_buf(),
            language: Some(tree.language().to_string()),
            records,
            match_count,
            partial: tree.has_errors(),
            error: None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        self.error.is_some()
    }
}

/// An entry that could not be searched
#[derive(Debug)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct SearchSummary {
    pub files_scanned: usize,
    pub files_with_matches: usize,
    pub matches: usize,
    pub records: usize,
    pub partial_parses: usize,
    pub skipped: Vec<SkippedEntry>,
    pub canceled: bool,
    pub elapsed: Duration,
}

impl SearchSummary {
    fn record(&mut self, outcome: FileOutcome) {
        if let Some(error) = outcome.error {
            self.skipped.push(SkippedEntry {
                path: outcome.path,
                error,
            });
            return;
        }
        self.files_scanned += 1;
        self.matches += outcome.match_count;
        self.records += outcome.records.len();
        if outcome.match_count > 0 {
            self.files_with_matches += 1;
        }
        if outcome.partial {
            self.partial_parses += 1;
        }
    }

    /// True when every walked file was searched and the run was not canceled
    pub fn is_exhaustive(&self) -> bool {
        self.skipped.is_empty() && !self.canceled
    }
}

struct Work {
    seq: usize,
    path: PathBuf,
}

pub struct Searcher {
    registry: GrammarRegistry,
    patterns: HashMap<String, Pattern>,
    pattern_errors: Vec<(String, PatternError)>,
    options: SearchOptions,
    cancel: CancelToken,
}

impl Searcher {
    /// Compile `pattern_text` for every candidate language.
    ///
    /// Candidates are all registered languages, or only the override
    /// language. Languages the pattern does not fit are remembered in
    /// [`Searcher::pattern_errors`]; the call fails only if no language
    /// accepts the pattern.
    pub fn new(registry: GrammarRegistry, pattern_text: &str, options: SearchOptions) -> Result<Self> {
        let candidates: Vec<Arc<dyn Grammar>> = match &options.language {
            Some(tag) => vec![registry.get(tag)?],
            None => registry.grammars().cloned().collect(),
        };

        let mut patterns = HashMap::new();
        let mut pattern_errors = Vec::new();
        for grammar in candidates {
            let language = grammar.language_name().to_string();
            match Pattern::compile(pattern_text, grammar.as_ref()) {
                Ok(pattern) => {
                    patterns.insert(language, pattern.with_mode(options.mode));
                }
                Err(err) => {
                    tracing::debug!("Pattern does not apply to {}: {}", language, err);
                    pattern_errors.push((language, err));
                }
            }
        }

        if patterns.is_empty() {
            return Err(match pattern_errors.into_iter().next() {
                Some((_, err)) => Error::Pattern(err),
                None => Error::UnsupportedLanguage("no languages registered".to_string()),
            });
        }

        Ok(Self {
            registry,
            patterns,
            pattern_errors,
            options,
            cancel: CancelToken::new(),
        })
    }

    /// Languages the pattern failed to compile for, with the reason
    pub fn pattern_errors(&self) -> &[(String, PatternError)] {
        &self.pattern_errors
    }

    /// Languages with a compiled pattern, in registry order
    pub fn languages(&self) -> Vec<&str> {
        self.registry
            .languages()
            .filter(|l| self.patterns.contains_key(*l))
            .collect()
    }

    pub fn pattern(&self, language: &str) -> Option<&Pattern> {
        self.patterns.get(language)
    }

    pub fn registry(&self) -> &GrammarRegistry {
        &self.registry
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    fn thread_count(&self) -> usize {
        self.options
            .threads
            .unwrap_or_else(|| thread::available_parallelism().map_or(1, |n| n.get()))
            .max(1)
    }

    /// Walk options with the extension filter defaulted to the searchable
    /// languages
    fn walk_options(&self) -> Result<WalkOptions> {
        let mut walk = self.options.walk.clone();
        if walk.extensions.is_empty() {
            walk.extensions = match &self.options.language {
                Some(tag) => self
                    .registry
                    .get(tag)?
                    .file_extensions()
                    .iter()
                    .map(|e| e.to_string())
                    .collect(),
                None => self.registry.extensions().map(str::to_string).collect(),
            };
        }
        Ok(walk)
    }

    /// Search every file under `root`, handing outcomes to `sink` in walk
    /// order.
    ///
    /// A sink error cancels the run and is returned as `Error::Output`.
    pub fn run<F>(&self, root: impl AsRef<Path>, mut sink: F) -> Result<SearchSummary>
    where
        F: FnMut(&FileOutcome) -> std::io::Result<()>,
    {
        let started = Instant::now();
        let walker = SourceWalker::new(root.as_ref(), self.walk_options()?)?;
        let threads = self.thread_count();
        tracing::info!(
            "Searching {} with {} workers ({} languages)",
            walker.root().display(),
            threads,
            self.patterns.len()
        );

        let capacity = self.options.queue_capacity.max(1);
        let (work_tx, work_rx) = channel::bounded::<Work>(capacity);
        let (done_tx, done_rx) = channel::unbounded::<(usize, Option<FileOutcome>)>();
        let mut summary = SearchSummary::default();

        let delivered = thread::scope(|scope| -> Result<()> {
            // One permit per entry between the walk and the sink
            let in_flight = capacity + threads;
            let (permit_tx, permit_rx) = channel::bounded::<()>(in_flight);
            for _ in 0..in_flight {
                let _ = permit_tx.send(());
            }

            let producer_done = done_tx.clone();
            let walker = &walker;
            scope.spawn(move || {
                for (seq, entry) in walker.iter().enumerate() {
                    if permit_rx.recv().is_err() || self.cancel.is_canceled() {
                        tracing::debug!("Canceled, stopping walk");
                        break;
                    }
                    let sent = match entry {
                        Ok(path) => work_tx.send(Work { seq, path }).is_ok(),
                        Err(err) => {
                            let path = err.path().unwrap_or(walker.root()).to_path_buf();
                            producer_done.send((seq, Some(FileOutcome::skipped(path, err)))).is_ok()
                        }
                    };
                    if !sent {
                        break;
                    }
                }
            });

            for _ in 0..threads {
                let work_rx = work_rx.clone();
                let done_tx = done_tx.clone();
                scope.spawn(move || self.work(work_rx, done_tx));
            }
            drop(work_rx);
            drop(done_tx);

            // Outcomes arrive out of order; release them by sequence number
            let mut pending = BTreeMap::new();
            let mut next = 0;
            for (seq, outcome) in done_rx.iter() {
                pending.insert(seq, outcome);
                while let Some(outcome) = pending.remove(&next) {
                    next += 1;
                    if let Some(outcome) = outcome {
                        if let Err(err) = sink(&outcome) {
                            self.cancel.cancel();
                            return Err(Error::Output(err));
                        }
                        summary.record(outcome);
                    }
                    let _ = permit_tx.send(());
                }
            }
            // Only reachable with gaps if a worker died
            for outcome in pending.into_values().flatten() {
                sink(&outcome).map_err(Error::Output)?;
                summary.record(outcome);
            }
            Ok(())
        });
        delivered?;

        summary.canceled = self.cancel.is_canceled();
        summary.elapsed = started.elapsed();
        tracing::info!(
            "Searched {} files, {} matches, {} skipped in {:?}",
            summary.files_scanned,
            summary.matches,
            summary.skipped.len(),
            summary.elapsed
        );
        Ok(summary)
    }

    fn work(&self, queue: channel::Receiver<Work>, done: channel::Sender<(usize, Option<FileOutcome>)>) {
        let mut adapters: HashMap<String, Box<dyn ParserAdapter>> = HashMap::new();

        for Work { seq, path } in queue.iter() {
            if self.cancel.is_canceled() {
                if done.send((seq, None)).is_err() {
                    break;
                }
                continue;
            }

            let outcome = match self.search_file(&path, &mut adapters) {
                Ok(outcome) => outcome,
                Err(err) => {
                    match err {
                        Error::PatternUnavailable(_) | Error::UnsupportedLanguage(_) => {
                            tracing::debug!("Skipping {}: {}", path.display(), err)
                        }
                        _ => tracing::warn!("Skipping {}: {}", path.display(), err),
                    }
                    FileOutcome::skipped(path, err)
                }
            };
            if done.send((seq, Some(outcome))).is_err() {
                break;
            }
        }
    }

    fn grammar_for(&self, path: &Path) -> Result<Arc<dyn Grammar>> {
        match &self.options.language {
            Some(tag) => self.registry.get(tag),
            None => self.registry.for_path(path),
        }
    }

    fn search_file(
        &self,
        path: &Path,
        adapters: &mut HashMap<String, Box<dyn ParserAdapter>>,
    ) -> Result<FileOutcome> {
        let grammar = self.grammar_for(path)?;
        let language = grammar.language_name().to_string();
        let pattern = self
            .patterns
            .get(&language)
            .ok_or_else(|| Error::PatternUnavailable(language.clone()))?;
        let file = SourceFile::read(path, language.as_str())?;

        let adapter = match adapters.entry(language) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let mut adapter = grammar.adapter()?;
                adapter.set_timeout(self.options.parse_timeout);
                entry.insert(adapter)
            }
        };

        tracing::debug!("Parsing {} as {}", path.display(), file.language());
        let tree = adapter.parse(file.content())?;
        Ok(FileOutcome::matched(file.path(), pattern, &tree))
    }

    /// Parse and match one in-memory text. Records carry `<source>` as
    /// their file path.
    pub fn search_source(&self, language: &str, source: impl AsRef<[u8]>) -> Result<FileOutcome> {
        let grammar = self.registry.get(language)?;
        let language = grammar.language_name();
        let pattern = self
            .patterns
            .get(language)
            .ok_or_else(|| Error::PatternUnavailable(language.to_string()))?;

        let mut adapter = grammar.adapter()?;
        adapter.set_timeout(self.options.parse_timeout);
        let tree = adapter.parse(source.as_ref())?;
        Ok(FileOutcome::matched(Path::new("<source>"), pattern, &tree))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::default_registry;
    use std::fs;
    use tempfile::TempDir;

    const FUNCTION_NAMES: &str = "(function_declaration name: (identifier) @function_name)";

    fn collect(searcher: &Searcher, root: &Path) -> (Vec<FileOutcome>, SearchSummary) {
        let mut outcomes = Vec::new();
        let summary = searcher
            .run(root, |outcome| {
                outcomes.push(FileOutcome {
                    path: outcome.path.clone(),
                    language: outcome.language.clone(),
                    records: outcome.records.clone(),
                    match_count: outcome.match_count,
                    partial: outcome.partial,
                    error: None,
                });
                Ok(())
            })
            .unwrap();
        (outcomes, summary)
    }

    #[test]
    fn test_ts_and_tsx_scenario() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("math.ts"),
            "function add(a: number, b: number) { return a + b; }\nfunction sub(a: number, b: number) { return a - b; }\n",
        )
        .unwrap();
        fs::write(dir.path().join("view.tsx"), "const View = () => <div>hi</div>;\n").unwrap();

        let searcher = Searcher::new(default_registry(), FUNCTION_NAMES, SearchOptions::default()).unwrap();
        let (outcomes, summary) = collect(&searcher, dir.path());

        let records: Vec<_> = outcomes.iter().flat_map(|o| o.records.iter()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].node_text, "add");
        assert_eq!(records[1].node_text, "sub");
        assert!(records.iter().all(|r| r.file_path.ends_with("math.ts")));
        assert!(records.iter().all(|r| r.capture_label.as_deref() == Some("function_name")));

        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.files_with_matches, 1);
        assert_eq!(summary.matches, 2);
        assert!(summary.is_exhaustive());
    }

    #[test]
    fn test_output_order_is_independent_of_threads() {
        let dir = TempDir::new().unwrap();
        for i in 0..20 {
            fs::write(
                dir.path().join(format!("f{:02}.js", i)),
                format!("function fn{i}() {{}}\nfunction other{i}() {{}}\n"),
            )
            .unwrap();
        }

        let run = |threads| {
            let options = SearchOptions {
                threads: Some(threads),
                queue_capacity: 2,
                ..SearchOptions::default()
            };
            let searcher = Searcher::new(default_registry(), FUNCTION_NAMES, options).unwrap();
            let (outcomes, _) = collect(&searcher, dir.path());
            outcomes
                .into_iter()
                .flat_map(|o| o.records)
                .map(|r| r.node_text)
                .collect::<Vec<_>>()
        };

        let single = run(1);
        assert_eq!(single.len(), 40);
        assert_eq!(&single[..2], &["fn0".to_string(), "other0".to_string()]);
        assert_eq!(run(4), single);
    }

    #[test]
    fn test_pattern_compiled_per_language() {
        let searcher = Searcher::new(default_registry(), "(function_definition name: (identifier) @f)", SearchOptions::default())
            .unwrap();
        assert_eq!(searcher.languages(), vec!["python"]);
        assert!(searcher.pattern_errors().iter().any(|(l, _)| l == "javascript"));

        let err = Searcher::new(default_registry(), "(no_such_node)", SearchOptions::default()).err().unwrap();
        assert!(matches!(err, Error::Pattern(PatternError::UnknownNodeType { .. })));
    }

    #[test]
    fn test_unmatched_language_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.py"), "def a():\n    pass\n").unwrap();
        fs::write(dir.path().join("b.py"), "def b():\n    pass\n").unwrap();
        fs::write(dir.path().join("c.js"), "function c() {}\n").unwrap();

        let searcher = Searcher::new(default_registry(), FUNCTION_NAMES, SearchOptions::default()).unwrap();
        let (_, summary) = collect(&searcher, dir.path());

        assert_eq!(summary.files_scanned, 1);
        assert_eq!(summary.matches, 1);
        assert_eq!(summary.skipped.len(), 2);
        assert!(summary.skipped.iter().all(|s| matches!(s.error, Error::PatternUnavailable(_))));
        assert!(!summary.is_exhaustive());
    }

    #[test]
    fn test_language_override_and_partial_parse() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("broken.js"), "function ok() { return 1; }\nfunction broken( {\n").unwrap();

        let options = SearchOptions {
            language: Some("javascript".to_string()),
            ..SearchOptions::default()
        };
        let searcher = Searcher::new(default_registry(), FUNCTION_NAMES, options).unwrap();
        assert_eq!(searcher.languages(), vec!["javascript"]);

        let (outcomes, summary) = collect(&searcher, dir.path());
        assert_eq!(summary.partial_parses, 1);
        assert!(outcomes[0].partial);
        assert!(outcomes[0].records.iter().any(|r| r.node_text == "ok"));
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let searcher = Searcher::new(default_registry(), FUNCTION_NAMES, SearchOptions::default()).unwrap();
        let err = searcher.run(dir.path().join("missing"), |_| Ok(())).err().unwrap();
        assert!(matches!(err, Error::PathNotFound(_)));
    }

    #[test]
    fn test_cancel_keeps_delivered_results() {
        let dir = TempDir::new().unwrap();
        for i in 0..50 {
            fs::write(dir.path().join(format!("f{:02}.js", i)), "function f() {}\n").unwrap();
        }

        let options = SearchOptions {
            threads: Some(2),
            queue_capacity: 1,
            ..SearchOptions::default()
        };
        let searcher = Searcher::new(default_registry(), FUNCTION_NAMES, options).unwrap();
        let token = searcher.cancel_token();
        let mut seen = 0;
        let summary = searcher
            .run(dir.path(), |_| {
                seen += 1;
                if seen == 3 {
                    token.cancel();
                }
                Ok(())
            })
            .unwrap();

        assert!(summary.canceled);
        assert!(!summary.is_exhaustive());
        assert!(summary.files_scanned >= 3);
        assert_eq!(summary.files_scanned, seen);
    }

    #[test]
    fn test_cancel_before_run_dispatches_nothing() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "function a() {}\n").unwrap();

        let searcher = Searcher::new(default_registry(), FUNCTION_NAMES, SearchOptions::default()).unwrap();
        searcher.cancel_token().cancel();
        let summary = searcher.run(dir.path(), |_| Ok(())).unwrap();
        assert!(summary.canceled);
        assert_eq!(summary.files_scanned, 0);
    }

    #[test]
    fn test_sink_error_stops_run() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.js"), "function a() {}\n").unwrap();

        let searcher = Searcher::new(default_registry(), FUNCTION_NAMES, SearchOptions::default()).unwrap();
        let err = searcher
            .run(dir.path(), |_| Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe)))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Output(_)));
    }

    #[test]
    fn test_any_grammar_backend() {
        use crate::adapter::framework::tests::WordGrammar;

        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "hay needle hay").unwrap();
        fs::write(dir.path().join("b.txt"), "hay hay").unwrap();
        fs::write(dir.path().join("c.js"), "function needle() {}").unwrap();

        let mut registry = GrammarRegistry::new();
        registry.register(WordGrammar::new());
        let pattern = r#"(document item: (word) @w (#eq? @w "needle"))"#;
        let searcher = Searcher::new(registry, pattern, SearchOptions::default()).unwrap();
        let (outcomes, summary) = collect(&searcher, dir.path());

        assert_eq!(summary.files_scanned, 2);
        assert_eq!(summary.matches, 1);
        assert!(summary.is_exhaustive());
        assert!(outcomes[0].records[0].file_path.ends_with("a.txt"));
        assert_eq!(outcomes[0].records[0].start_position, crate::tree::Point::new(0, 4));
    }

    #[test]
    fn test_parse_timeout_skips_file() {
        let dir = TempDir::new().unwrap();
        let large = "function f(a, b) { return [a, b].map(x => x * 2); }\n".repeat(50_000);
        fs::write(dir.path().join("large.js"), large).unwrap();

        let options = SearchOptions {
            parse_timeout: Some(Duration::from_micros(1)),
            ..SearchOptions::default()
        };
        let searcher = Searcher::new(default_registry(), FUNCTION_NAMES, options).unwrap();
        let (outcomes, summary) = collect(&searcher, dir.path());

        assert_eq!(outcomes.len(), 1);
        assert_eq!(summary.files_scanned, 0);
        assert_eq!(summary.skipped.len(), 1);
        assert!(summary.skipped[0].path.ends_with("large.js"));
        assert!(matches!(
            summary.skipped[0].error,
            Error::Parse(crate::adapter::ParseFailure::Aborted { .. })
        ));
        assert!(!summary.is_exhaustive());
    }

    /// Word grammar whose parser stalls on text starting with `slow` and
    /// counts every parse
    struct SlowWords {
        inner: crate::adapter::framework::tests::WordGrammar,
        parsed: Arc<std::sync::atomic::AtomicUsize>,
    }

    struct SlowParser {
        inner: Box<dyn ParserAdapter>,
        parsed: Arc<std::sync::atomic::AtomicUsize>,
    }

    impl ParserAdapter for SlowParser {
        fn language_name(&self) -> &str {
            self.inner.language_name()
        }

        fn parse(&mut self, source: &[u8]) -> std::result::Result<SyntaxTree, crate::adapter::ParseFailure> {
            if source.starts_with(b"slow") {
                thread::sleep(Duration::from_millis(300));
            }
            self.parsed.fetch_add(1, Ordering::SeqCst);
            self.inner.parse(source)
        }
    }

    impl Grammar for SlowWords {
        fn language_name(&self) -> &str {
            self.inner.language_name()
        }

        fn file_extensions(&self) -> &[&str] {
            self.inner.file_extensions()
        }

        fn vocabulary(&self) -> &crate::adapter::Vocabulary {
            self.inner.vocabulary()
        }

        fn adapter(&self) -> std::result::Result<Box<dyn ParserAdapter>, crate::adapter::ParseFailure> {
            Ok(Box::new(SlowParser {
                inner: self.inner.adapter()?,
                parsed: Arc::clone(&self.parsed),
            }))
        }
    }

    #[test]
    fn test_slow_first_file_bounds_buffered_outcomes() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a000.txt"), "slow hay").unwrap();
        for i in 1..200 {
            fs::write(dir.path().join(format!("a{:03}.txt", i)), "hay needle").unwrap();
        }

        let parsed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let mut registry = GrammarRegistry::new();
        registry.register(SlowWords {
            inner: crate::adapter::framework::tests::WordGrammar::new(),
            parsed: Arc::clone(&parsed),
        });
        let options = SearchOptions {
            threads: Some(2),
            queue_capacity: 2,
            ..SearchOptions::default()
        };
        let searcher = Searcher::new(registry, "(word) @w", options).unwrap();

        let mut parsed_at_first_delivery = None;
        let mut delivered = 0;
        let summary = searcher
            .run(dir.path(), |_| {
                parsed_at_first_delivery.get_or_insert_with(|| parsed.load(Ordering::SeqCst));
                delivered += 1;
                Ok(())
            })
            .unwrap();

        assert!(parsed_at_first_delivery.unwrap() <= 2 + 2);
        assert_eq!(delivered, 200);
        assert_eq!(summary.files_scanned, 200);
        assert!(summary.is_exhaustive());
    }

    #[test]
    fn test_search_source() {
        let searcher = Searcher::new(default_registry(), FUNCTION_NAMES, SearchOptions::default()).unwrap();
        let outcome = searcher
            .search_source("javascript", r#"function greet(name) { return "Hello, " + name; }"#)
            .unwrap();
        assert_eq!(outcome.match_count, 1);
        assert_eq!(outcome.records[0].node_text, "greet");
        assert_eq!(outcome.records[0].file_path, "<source>");

        let err = searcher.search_source("cobol", "").err().unwrap();
        assert!(matches!(err, Error::UnsupportedLanguage(_)));
        let err = searcher.search_source("python", "pass").err().unwrap();
        assert!(matches!(err, Error::PatternUnavailable(_)));
    }
}
