//! Settings management

use anyhow::{Context, Result};
use latch_render::BackendTier;
use latch_shaders::SoftwareConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Runtime settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Capability preset the software device reports.
    pub tier: BackendTier,
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub log_level: String,
    pub software: SoftwareConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tier: BackendTier::Software,
            log_level: "info".to_string(),
            software: SoftwareConfig::default(),
        }
    }
}

impl Settings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(text)?;
        settings
            .software
            .validate()
            .context("invalid software device settings")?;
        Ok(settings)
    }

    pub fn level(&self) -> Result<tracing::Level> {
        self.log_level
            .parse()
            .with_context(|| format!("invalid log level '{}'", self.log_level))
    }
}
