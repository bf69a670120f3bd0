//! Configuration management.

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use fabric_enroller::MaterialSelection;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::output::OutputFormat;

/// Overrides the config file location
pub const CONFIG_ENV: &str = "FABRIC_ENROLLER_CONFIG";

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// fabric-ca-client binary.
    pub ca_client_bin: Option<PathBuf>,

    /// Per-invocation timeout in seconds.
    pub timeout_secs: Option<u64>,

    /// Default output format.
    pub output_format: Option<OutputFormat>,

    /// Policy when several CA output files match.
    pub material_selection: Option<MaterialSelection>,

    /// Default log filter.
    pub log_level: Option<String>,
}

impl Config {
    /// Get the config file path.
    pub fn path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }

        let dirs = ProjectDirs::from("org", "fabric-tools", "fabric-enroller")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::path()?)
    }

    /// Load configuration from `path`; a missing file is the default configuration.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::path()?)
    }

    /// Save configuration to `path`.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Set one key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "ca_client_bin" | "ca-client-bin" => self.ca_client_bin = Some(PathBuf::from(value)),
            "timeout_secs" | "timeout" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("invalid timeout {value:?}"))?;
                if secs == 0 {
                    anyhow::bail!("timeout must be at least one second");
                }
                self.timeout_secs = Some(secs);
            }
            "output_format" | "output" => self.output_format = Some(value.parse()?),
            "material_selection" => self.material_selection = Some(value.parse()?),
            "log_level" => self.log_level = Some(value.to_string()),
            _ => anyhow::bail!(
                "Unknown config key: {}\n\n\
                 Available keys:\n  \
                 ca_client_bin       - Path to fabric-ca-client\n  \
                 timeout_secs        - Per-call timeout in seconds\n  \
                 output_format       - Default output format (pretty/json/yaml)\n  \
                 material_selection  - first-lexical or require-unique\n  \
                 log_level           - Default log filter (e.g. warn, info)",
                key
            ),
        }
        Ok(())
    }
}
