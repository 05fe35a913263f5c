use crate::pipeline::FileOutcome;
use crate::ui::Icons;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Spinner on stderr counting searched files while results stream to stdout
pub struct SearchProgress {
    pb: ProgressBar,
    files: u64,
    matches: usize,
}

impl SearchProgress {
    pub fn new() -> Self {
        let pb = if console::Term::stderr().is_term() {
            let pb = ProgressBar::new_spinner();
            pb.set_draw_target(ProgressDrawTarget::stderr());
            if let Ok(style) = ProgressStyle::with_template("{spinner} {prefix} {wide_msg}") {
                pb.set_style(style);
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        } else {
            ProgressBar::hidden()
        };
        pb.set_prefix(Icons::SEARCH);

        Self { pb, files: 0, matches: 0 }
    }

    pub fn observe(&mut self, outcome: &FileOutcome) {
        self.files += 1;
        self.matches += outcome.match_count;
        self.pb.set_message(format!(
            "{} files, {} matches: {}",
            self.files,
            self.matches,
            outcome.path.display()
        ));
    }

    /// Run `f` with the spinner hidden so its output is not clobbered
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.pb.suspend(f)
    }

    pub fn clear(&self) {
        self.pb.finish_and_clear();
    }
}

impl Default for SearchProgress {
    fn default() -> Self {
        Self::new()
    }
}
