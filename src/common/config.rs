use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG: &str = include_str!("../../fractal.default.toml");

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub tree: TreeSettings,
    #[serde(default)]
    pub allocation: AllocationSettings,
}

/// Housekeeping performed by the container tree after a move.
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct TreeSettings {
    /// Dissolve single-child simple containers once a move completes.
    #[serde(default = "yes")]
    pub collapse_after_move: bool,
    /// Drop empty simple containers once a move completes.
    #[serde(default = "no")]
    pub prune_empty_after_move: bool,
    /// Draw the whole tree at `trace` level after every move.
    #[serde(default = "no")]
    pub log_tree_after_move: bool,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            collapse_after_move: true,
            prune_empty_after_move: false,
            log_tree_after_move: false,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct AllocationSettings {
    /// Emit a `warn` event for every allocation diagnostic.
    #[serde(default = "yes")]
    pub log_diagnostics: bool,
    /// Slack allowed when comparing a minimum size against its share.
    #[serde(default)]
    pub tolerance: f64,
}

impl Default for AllocationSettings {
    fn default() -> Self { Self { log_diagnostics: true, tolerance: 0.0 } }
}

fn yes() -> bool { true }

fn no() -> bool { false }

impl Settings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();
        issues.extend(self.allocation.validate());
        issues
    }
}

impl AllocationSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if !self.tolerance.is_finite() {
            issues.push(format!(
                "allocation.tolerance must be finite, got {}",
                self.tolerance
            ));
        } else if !(0.0..1.0).contains(&self.tolerance) {
            issues.push(format!(
                "allocation.tolerance must be in [0, 1), got {}",
                self.tolerance
            ));
        }

        issues
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&buf)
    }

    /// Parses a TOML document and rejects it if any setting is out of range.
    pub fn parse(buf: &str) -> anyhow::Result<Config> {
        let config: Config = match toml::from_str(buf) {
            Ok(c) => c,
            Err(e) => bail!("{e}"),
        };
        let issues = config.validate();
        if !issues.is_empty() {
            bail!("invalid configuration:\n  {}", issues.join("\n  "));
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let toml_string = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, toml_string.as_bytes())
            .with_context(|| format!("writing config file {}", path.display()))?;
        Ok(())
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }
}
