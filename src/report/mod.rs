//! Result reporters
//!
//! A reporter receives outcomes one file at a time, in walk order, and a
//! summary once the search is over. It decides how records are serialized.

pub mod json;
pub mod text;

use crate::pipeline::{FileOutcome, SearchSummary};
use crate::ui::theme;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `path:row:col: label: text` lines and a human summary
    #[default]
    Text,
    /// One JSON object per record, then a summary object
    Json,
}

pub trait Reporter {
    /// Write the records of one searched or skipped file
    fn file(&mut self, outcome: &FileOutcome, out: &mut dyn Write) -> io::Result<()>;

    /// Write whatever closes the report
    fn finish(&mut self, summary: &SearchSummary, out: &mut dyn Write) -> io::Result<()>;

    /// Whether the summary belongs on stdout with the records
    fn summary_on_stdout(&self) -> bool {
        false
    }
}

pub fn create_reporter(format: OutputFormat) -> Box<dyn Reporter> {
    match format {
        OutputFormat::Text => Box::new(text::TextReporter::new(std::env::current_dir().ok(), theme().clone())),
        OutputFormat::Json => Box::new(json::JsonReporter::new()),
    }
}
