//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `$ESTAD_CONFIG` environment variable
//! 2. `~/.config/estad/config.toml`
//! 3. Built-in defaults (everything is optional)

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use estad_core::{BinCount, EducationLevel, EstadError};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub analysis: AnalysisConfig,
    pub remote: RemoteConfig,
    pub report: ReportConfig,
}

/// Database storage settings.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path. Default: platform-specific data dir.
    pub path: Option<String>,
}

/// Defaults for frequency tables and position measures.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Pick the class count with Sturges' rule instead of `bins`.
    pub use_sturges: bool,
    pub bins: usize,
    pub percentile: f64,
    pub decile: f64,
    pub quartile: f64,
    pub confidence_level: u8,
}

/// Report generation and tutor chat endpoints.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub base_url: String,
    pub chat_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub education_level: String,
}

// --- Defaults ---

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            use_sturges: true,
            bins: 5,
            percentile: 50.0,
            decile: 5.0,
            quartile: 1.0,
            confidence_level: 95,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:8001".into(),
            chat_url: "http://localhost:5001/profeMarceChat".into(),
            timeout_secs: 30,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            education_level: "secundario".into(),
        }
    }
}

impl AnalysisConfig {
    pub fn bin_count(&self) -> BinCount {
        if self.use_sturges {
            BinCount::Sturges
        } else {
            BinCount::Fixed(self.bins)
        }
    }
}

impl ReportConfig {
    pub fn level(&self) -> Result<EducationLevel, EstadError> {
        self.education_level
            .parse()
            .map_err(|e: String| EstadError::Config(format!("report.education_level: {e}")))
    }
}

/// Load config from disk. Returns defaults if no config file exists.
pub fn load_config() -> Result<Config> {
    let path = config_path();

    if let Some(p) = &path {
        if p.exists() {
            let content =
                std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
            let config: Config =
                toml::from_str(&content).with_context(|| format!("parsing {}", p.display()))?;
            return Ok(config);
        }
    }

    Ok(Config::default())
}

/// Resolve the config file path.
fn config_path() -> Option<PathBuf> {
    // 1. Environment variable
    if let Ok(p) = std::env::var("ESTAD_CONFIG") {
        return Some(PathBuf::from(p));
    }

    // 2. ~/.config/estad/config.toml
    if let Some(home) = dirs_home() {
        let p = home.join(".config").join("estad").join("config.toml");
        return Some(p);
    }

    None
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

/// Show the active config path (for `estad config`).
pub fn show_config_path() -> String {
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}
