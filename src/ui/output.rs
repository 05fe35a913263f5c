use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;
use std::io::{self, Write};

pub fn success(out: &mut dyn Write, label: &str) -> io::Result<()> {
    writeln!(out, "{} {}", Icons::CHECK, label.style(theme().success.clone()))
}

pub fn warn(out: &mut dyn Write, label: &str) -> io::Result<()> {
    writeln!(out, "{} {}", Icons::WARN, label.style(theme().warn.clone()))
}

/// Fatal errors always go to stderr
pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn timing(out: &mut dyn Write, elapsed: &str) -> io::Result<()> {
    writeln!(out, "{} {}", Icons::CLOCK.style(theme().dim.clone()), elapsed)
}

pub fn summary_row(out: &mut dyn Write, label: &str, value: &str) -> io::Result<()> {
    writeln!(out, "  {} {}", label.style(theme().dim.clone()), value)
}
