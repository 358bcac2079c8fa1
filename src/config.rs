// Copyright 2025 STARGA Inc.
// Licensed under the Apache License, Version 2.0 (the “License”);
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at:
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an “AS IS” BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Deployment configuration for the simulator path.
//!
//! The two file paths are forwarded verbatim to the simulator and are never
//! opened here. A config may be written as a standalone TOML document or as a
//! `[simulator]` table inside a larger manifest:
//!
//! ```toml
//! [simulator]
//! simulation_file_path = "arch/test.cfg"
//! tiles_file_path = "arch/tile_configuration_conv1.txt"
//! sparsity_ratio = 0.0
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("sparsity_ratio must be within [0, 1], got {0}")]
    InvalidSparsity(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Simulator architecture configuration file.
    pub simulation_file_path: String,
    /// Tile configuration file.
    pub tiles_file_path: String,
    /// Fraction of zero weights assumed by the simulator; affects timing only.
    pub sparsity_ratio: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            simulation_file_path: String::new(),
            tiles_file_path: String::new(),
            sparsity_ratio: 0.0,
        }
    }
}

#[derive(Deserialize)]
struct Manifest {
    simulator: SimulatorConfig,
}

impl SimulatorConfig {
    pub fn new(simulation_file_path: impl Into<String>, tiles_file_path: impl Into<String>) -> Self {
        Self {
            simulation_file_path: simulation_file_path.into(),
            tiles_file_path: tiles_file_path.into(),
            sparsity_ratio: 0.0,
        }
    }

    pub fn with_sparsity_ratio(mut self, sparsity_ratio: f64) -> Self {
        self.sparsity_ratio = sparsity_ratio;
        self
    }

    /// Parse a config from TOML text, accepting either a bare document or a
    /// `[simulator]` table.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = toml::from_str(text)?;
        let config = if table.contains_key("simulator") {
            toml::from_str::<Manifest>(text)?.simulator
        } else {
            toml::from_str::<SimulatorConfig>(text)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sparsity_ratio.is_finite() || !(0.0..=1.0).contains(&self.sparsity_ratio) {
            return Err(ConfigError::InvalidSparsity(self.sparsity_ratio));
        }
        Ok(())
    }
}
