use crate::pattern::MatchMode;
use crate::pipeline::SearchOptions;
use crate::report::OutputFormat;
use crate::walker::WalkOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings read from `shapegrep.toml`. Every key is optional; command-line
/// flags override whatever is set here.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ShapegrepConfig {
    pub pattern: Option<String>,
    pub language: Option<String>,
    /// Gitignore-style lines added after the built-in excludes
    pub exclude: Vec<String>,
    /// File extensions to search, without the dot
    pub extensions: Vec<String>,
    pub follow_links: Option<bool>,
    pub max_depth: Option<usize>,
    pub threads: Option<usize>,
    pub queue_capacity: Option<usize>,
    pub parse_timeout_ms: Option<u64>,
    pub non_overlapping: Option<bool>,
    pub format: Option<OutputFormat>,
}

impl ShapegrepConfig {
    /// Search options with only this file's settings applied
    pub fn search_options(&self) -> SearchOptions {
        let defaults = SearchOptions::default();
        SearchOptions {
            language: self.language.clone(),
            walk: WalkOptions {
                extensions: self.extensions.clone(),
                excludes: self.exclude.clone(),
                follow_links: self.follow_links.unwrap_or(false),
                max_depth: self.max_depth,
            },
            threads: self.threads,
            queue_capacity: self.queue_capacity.unwrap_or(defaults.queue_capacity),
            parse_timeout: self.parse_timeout_ms.map(Duration::from_millis),
            mode: if self.non_overlapping.unwrap_or(false) {
                MatchMode::NonOverlapping
            } else {
                MatchMode::All
            },
        }
    }
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("shapegrep.toml")
}

/// Load the config at `path`, or `./shapegrep.toml` when no path is given.
///
/// A missing default file is not an error; a missing explicit file is.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<ShapegrepConfig>> {
    let explicit = path.is_some();
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        if explicit {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: ShapegrepConfig = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("invalid config {}: {}", path.display(), e))?;
    tracing::debug!("Loaded config from {}", path.display());
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &ShapegrepConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (pass force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}
