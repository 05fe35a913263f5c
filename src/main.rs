//! Shapegrep CLI - structural code search over a source tree

use anyhow::Context;
use clap::Parser;
use shapegrep::config::{load_config, ShapegrepConfig};
use shapegrep::report::{create_reporter, OutputFormat};
use shapegrep::ui::{self, SearchProgress};
use shapegrep::{default_registry, Error, GrammarRegistry, MatchMode, SearchOptions, Searcher, SourceFile};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_PATTERN: &str = "(function_declaration name: (identifier) @function_name)";

#[derive(Parser)]
#[command(name = "shapegrep")]
#[command(version)]
#[command(about = "Structural code search - find syntax tree shapes across a source tree")]
#[command(long_about = r#"
Shapegrep parses every supported file under ROOT and reports each place a
tree pattern matches.

Example usage:
  shapegrep src -p '(function_declaration name: (identifier) @name)'
  shapegrep . --lang python -p '(function_definition name: (identifier) @fn)'
  shapegrep --format json -f patterns/todo.scm
  shapegrep --dump-tree src/app.ts
"#)]
struct Cli {
    /// Directory or file to search
    #[arg(default_value = ".")]
    root: PathBuf,

    /// Pattern text
    #[arg(short, long)]
    pattern: Option<String>,

    /// Read the pattern from a file
    #[arg(short = 'f', long, conflicts_with = "pattern")]
    pattern_file: Option<PathBuf>,

    /// Parse every file as this language
    #[arg(short, long = "lang")]
    lang: Option<String>,

    /// Output format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Skip matches nested inside an earlier match
    #[arg(long)]
    non_overlapping: bool,

    /// Extra gitignore-style exclude pattern (repeatable)
    #[arg(long)]
    exclude: Vec<String>,

    /// Only search files with this extension (repeatable)
    #[arg(long)]
    ext: Vec<String>,

    /// Follow symbolic links
    #[arg(long)]
    follow_links: bool,

    /// Maximum directory depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Number of worker threads
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Config file (defaults to ./shapegrep.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the syntax tree of one file and exit
    #[arg(long, value_name = "FILE")]
    dump_tree: Option<PathBuf>,

    /// List supported languages and exit
    #[arg(long)]
    list_languages: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ui::error(&format!("{:#}", err));
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?.unwrap_or_default();
    let registry = default_registry();

    if cli.list_languages {
        println!("{}", ui::languages_table(&registry));
        return Ok(());
    }

    let language = cli.lang.clone().or_else(|| config.language.clone());
    if let Some(path) = &cli.dump_tree {
        return dump_tree(&registry, path, language.as_deref());
    }

    let pattern = match (&cli.pattern, &cli.pattern_file) {
        (Some(text), _) => text.clone(),
        (None, Some(file)) => std::fs::read_to_string(file)
            .with_context(|| format!("failed to read pattern file {}", file.display()))?,
        (None, None) => config.pattern.clone().unwrap_or_else(|| DEFAULT_PATTERN.to_string()),
    };
    let format = cli.format.or(config.format).unwrap_or_default();
    let options = search_options(&cli, &config);

    let searcher = Searcher::new(registry, &pattern, options)?;
    for (language, err) in searcher.pattern_errors() {
        tracing::debug!("Pattern skipped for {}: {}", language, err);
    }
    tracing::info!("Pattern applies to: {}", searcher.languages().join(", "));

    search(&searcher, &cli.root, format)
}

/// Config file settings with command-line flags layered on top
fn search_options(cli: &Cli, config: &ShapegrepConfig) -> SearchOptions {
    let mut options = config.search_options();
    if let Some(language) = &cli.lang {
        options.language = Some(language.clone());
    }
    options.walk.excludes.extend(cli.exclude.iter().cloned());
    if !cli.ext.is_empty() {
        options.walk.extensions = cli
            .ext
            .iter()
            .map(|e| e.trim_start_matches('.').to_string())
            .collect();
    }
    if cli.follow_links {
        options.walk.follow_links = true;
    }
    if cli.max_depth.is_some() {
        options.walk.max_depth = cli.max_depth;
    }
    if cli.threads.is_some() {
        options.threads = cli.threads;
    }
    if cli.non_overlapping {
        options.mode = MatchMode::NonOverlapping;
    }
    options
}

fn search(searcher: &Searcher, root: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let mut reporter = create_reporter(format);
    let mut progress = (format == OutputFormat::Text).then(SearchProgress::new);
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let result = searcher.run(root, |outcome| {
        match &mut progress {
            Some(progress) => {
                progress.observe(outcome);
                progress.suspend(|| {
                    reporter.file(outcome, &mut out)?;
                    out.flush()
                })
            }
            None => reporter.file(outcome, &mut out),
        }
    });
    if let Some(progress) = &progress {
        progress.clear();
    }

    let summary = match result {
        Ok(summary) => summary,
        // Downstream closed the pipe, e.g. `| head`
        Err(Error::Output(err)) if err.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    };

    if reporter.summary_on_stdout() {
        reporter.finish(&summary, &mut out)?;
        out.flush()?;
    } else {
        out.flush()?;
        reporter.finish(&summary, &mut io::stderr().lock())?;
    }
    Ok(())
}

fn dump_tree(registry: &GrammarRegistry, path: &Path, language: Option<&str>) -> anyhow::Result<()> {
    let grammar = match language {
        Some(tag) => registry.get(tag)?,
        None => registry.for_path(path)?,
    };
    let file = SourceFile::read(path, grammar.language_name())?;
    let tree = grammar.adapter()?.parse(file.content())?;

    println!("{}", tree.to_sexp());
    let mut err = io::stderr().lock();
    for site in tree.errors() {
        ui::warn(&mut err, &format!("{:?} node at {}", site.kind, site.span.start))?;
    }
    Ok(())
}
