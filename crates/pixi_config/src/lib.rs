use std::path::{Path, PathBuf};

use miette::Diagnostic;
use pixi_consts::consts;
use serde::Deserialize;
use thiserror::Error;

/// Returns the path to the pixi home directory.
///
/// This is `$PIXI_HOME` when set, otherwise `~/.pixi`.
pub fn pixi_home() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(consts::PIXI_HOME_ENV) {
        Some(PathBuf::from(path))
    } else {
        dirs::home_dir().map(|home| home.join(consts::PIXI_DIR))
    }
}

/// Returns the directory conda and mamba use for per-user state (`~/.conda`).
pub fn conda_home() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(consts::CONDA_HOME_DIR))
}

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config from '{}'", .0.display())]
    Read(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config from '{}'", .0.display())]
    #[diagnostic(help("check the syntax of the file, unknown keys are rejected"))]
    Parse(PathBuf, #[source] toml_edit::de::Error),
}

/// The global configuration of pixi-conda.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct Config {
    /// The directory that holds named environments.
    #[serde(default)]
    pub envs_dir: Option<PathBuf>,

    /// The file that lists the prefixes of all known environments.
    #[serde(default)]
    pub environments_file: Option<PathBuf>,

    /// The location this configuration was loaded from, if any.
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

impl Config {
    /// Parses a configuration from its toml representation.
    pub fn from_toml(source: &str, path: &Path) -> Result<Self, ConfigError> {
        let mut config: Config = toml_edit::de::from_str(source)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.loaded_from = Some(path.to_path_buf());
        Ok(config)
    }

    /// Loads the configuration stored at the given path.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let source = fs_err::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        Self::from_toml(&source, path)
    }

    /// Loads the global configuration from `$PIXI_HOME/config.toml`.
    ///
    /// This never fails. A missing file results in the default
    /// configuration, a file that cannot be read or parsed is reported and
    /// then ignored.
    pub fn load_global() -> Self {
        let Some(path) = pixi_home().map(|home| home.join(consts::CONFIG_FILE)) else {
            return Self::default();
        };

        if !path.is_file() {
            tracing::debug!("no global config found at '{}'", path.display());
            return Self::default();
        }

        match Self::from_path(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!("ignoring global config: {err}");
                Self::default()
            }
        }
    }

    /// Returns the directory that holds named environments.
    pub fn envs_root(&self) -> PathBuf {
        self.envs_dir
            .clone()
            .or_else(|| pixi_home().map(|home| home.join(consts::ENVIRONMENTS_DIR)))
            .unwrap_or_else(|| PathBuf::from(consts::ENVIRONMENTS_DIR))
    }

    /// Returns the location of the file that lists all known environments.
    ///
    /// The `PIXI_CONDA_ENVIRONMENTS_FILE` environment variable takes
    /// precedence over the configuration, which in turn takes precedence
    /// over `~/.conda/environments.txt`.
    pub fn environments_file(&self) -> PathBuf {
        if let Some(path) = std::env::var_os(consts::ENVIRONMENTS_FILE_ENV) {
            return PathBuf::from(path);
        }
        self.environments_file
            .clone()
            .or_else(|| conda_home().map(|home| home.join(consts::ENVIRONMENTS_TXT)))
            .unwrap_or_else(|| PathBuf::from(consts::ENVIRONMENTS_TXT))
    }
}
