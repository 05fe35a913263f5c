use crate::output::is_quiet;
use crate::pipeline::{FileOutcome, SearchSummary};
use crate::query::MatchRecord;
use crate::report::Reporter;
use crate::ui::{self, Theme};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Skipped entries listed in the summary before eliding the rest
const MAX_LISTED_SKIPS: usize = 10;

pub struct TextReporter {
    base: Option<PathBuf>,
    theme: Theme,
}

impl TextReporter {
    /// Paths under `base` are shown relative to it
    pub fn new(base: Option<PathBuf>, theme: Theme) -> Self {
        Self { base, theme }
    }

    fn display_path(&self, path: &Path) -> String {
        let shown = self
            .base
            .as_deref()
            .and_then(|base| path.strip_prefix(base).ok())
            .unwrap_or(path);
        shown.to_string_lossy().into_owned()
    }

    fn write_record(&self, record: &MatchRecord, out: &mut dyn Write) -> io::Result<()> {
        let path = self.display_path(Path::new(&record.file_path));
        let label = record.capture_label.as_deref().unwrap_or("match");
        let text = record.node_text.lines().next().unwrap_or("");
        writeln!(
            out,
            "{}:{}: {}: {}",
            path.style(self.theme.info.clone()),
            record.start_position,
            label.style(self.theme.muted.clone()),
            text
        )
    }
}

impl Reporter for TextReporter {
    fn file(&mut self, outcome: &FileOutcome, out: &mut dyn Write) -> io::Result<()> {
        for record in &outcome.records {
            self.write_record(record, out)?;
        }
        Ok(())
    }

    fn finish(&mut self, summary: &SearchSummary, out: &mut dyn Write) -> io::Result<()> {
        if is_quiet() {
            return Ok(());
        }

        writeln!(out)?;
        let headline = format!(
            "{} {} in {} of {} {}",
            summary.matches,
            plural(summary.matches, "match", "matches"),
            summary.files_with_matches,
            summary.files_scanned,
            plural(summary.files_scanned, "file", "files"),
        );
        if summary.is_exhaustive() {
            ui::success(out, &headline)?;
        } else {
            ui::warn(out, &format!("{} (results may be incomplete)", headline))?;
        }

        let mut table = ui::TableBuilder::new();
        table.add_row("Files searched", &summary.files_scanned.to_string());
        table.add_row("Files with matches", &summary.files_with_matches.to_string());
        table.add_row("Matches", &summary.matches.to_string());
        table.add_row("Partial parses", &summary.partial_parses.to_string());
        table.add_row("Skipped entries", &summary.skipped.len().to_string());
        if summary.canceled {
            table.add_row("Canceled", "yes");
        }
        writeln!(out, "{}", table.build())?;

        for skipped in summary.skipped.iter().take(MAX_LISTED_SKIPS) {
            ui::summary_row(out, &self.display_path(&skipped.path), &skipped.error.to_string())?;
        }
        if summary.skipped.len() > MAX_LISTED_SKIPS {
            ui::summary_row(out, "...", &format!("{} more", summary.skipped.len() - MAX_LISTED_SKIPS))?;
        }
        ui::timing(out, &format!("{:.2?}", summary.elapsed))
    }
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}
