use crate::pipeline::{FileOutcome, SearchSummary};
use crate::query::MatchRecord;
use crate::report::Reporter;
use serde::Serialize;
use std::io::{self, Write};

/// JSON lines: one object per record, skipped entries as they happen, and a
/// closing summary. Every line carries a `type` tag.
pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Serialize)]
struct MatchLine<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(flatten)]
    record: &'a MatchRecord,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum Line {
    #[serde(rename_all = "camelCase")]
    Skipped {
        path: String,
        error_kind: &'static str,
        message: String,
    },
    #[serde(rename_all = "camelCase")]
    Summary {
        files_scanned: usize,
        files_with_matches: usize,
        matches: usize,
        records: usize,
        partial_parses: usize,
        skipped: usize,
        canceled: bool,
        exhaustive: bool,
        elapsed_ms: u64,
    },
}

fn write_line(line: &impl Serialize, out: &mut dyn Write) -> io::Result<()> {
    serde_json::to_writer(&mut *out, line)?;
    writeln!(out)
}

impl Reporter for JsonReporter {
    fn file(&mut self, outcome: &FileOutcome, out: &mut dyn Write) -> io::Result<()> {
        if let Some(error) = &outcome.error {
            return write_line(
                &Line::Skipped {
                    path: outcome.path.to_string_lossy().into_owned(),
                    error_kind: error.kind(),
                    message: error.to_string(),
                },
                out,
            );
        }
        for record in &outcome.records {
            write_line(&MatchLine { kind: "match", record }, out)?;
        }
        Ok(())
    }

    fn finish(&mut self, summary: &SearchSummary, out: &mut dyn Write) -> io::Result<()> {
        write_line(
            &Line::Summary {
                files_scanned: summary.files_scanned,
                files_with_matches: summary.files_with_matches,
                matches: summary.matches,
                records: summary.records,
                partial_parses: summary.partial_parses,
                skipped: summary.skipped.len(),
                canceled: summary.canceled,
                exhaustive: summary.is_exhaustive(),
                elapsed_ms: u64::try_from(summary.elapsed.as_millis()).unwrap_or(u64::MAX),
            },
            out,
        )
    }

    fn summary_on_stdout(&self) -> bool {
        true
    }
}
