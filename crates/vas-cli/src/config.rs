//! Application configuration, loaded from TOML
//!
//! Every section is optional:
//!
//! ```toml
//! state_dir = ".vas"
//!
//! [pipeline]
//! phase_timeout_secs = 600
//! estimate_overrides_secs = { competitive = 150 }
//!
//! [state]
//! namespace = "vas"
//! max_archived = 20
//! archive_on_complete = true
//!
//! [simulation]
//! scale_ms = 20
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vas_pipeline::PipelineConfig;
use vas_state::StateStoreConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct AppConfig {
    /// Directory of the file backend
    pub(crate) state_dir: PathBuf,
    pub(crate) pipeline: PipelineConfig,
    pub(crate) state: StateStoreConfig,
    pub(crate) simulation: SimulationConfig,
}

/// Simulated collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct SimulationConfig {
    /// Milliseconds of simulated work per estimated second
    pub(crate) scale_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".vas"),
            pipeline: PipelineConfig::default(),
            state: StateStoreConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self { scale_ms: 20 }
    }
}

impl AppConfig {
    /// Load from `path`, or defaults when no path is given
    pub(crate) fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub(crate) fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    #[must_use]
    pub(crate) fn with_state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.state_dir = dir.into();
        self
    }

    #[must_use]
    pub(crate) fn with_scale_ms(mut self, scale_ms: u64) -> Self {
        self.simulation.scale_ms = scale_ms;
        self
    }
}
