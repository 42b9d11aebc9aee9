use console::Style;
use std::sync::LazyLock;

/// The directory inside every conda prefix that holds its metadata.
pub const CONDA_META_DIR: &str = "conda-meta";

/// The file inside [`CONDA_META_DIR`] whose presence marks a directory as a
/// live conda environment.
pub const CONDA_HISTORY_FILE: &str = "history";

/// The name of the file that lists the prefixes of all known environments.
/// This is the same file conda and mamba maintain.
pub const ENVIRONMENTS_TXT: &str = "environments.txt";

/// The directory in the user's home that holds [`ENVIRONMENTS_TXT`].
pub const CONDA_HOME_DIR: &str = ".conda";

pub const PIXI_DIR: &str = ".pixi";
pub const ENVIRONMENTS_DIR: &str = "envs";
pub const CONFIG_FILE: &str = "config.toml";

pub const PIXI_HOME_ENV: &str = "PIXI_HOME";
pub const ENVIRONMENTS_FILE_ENV: &str = "PIXI_CONDA_ENVIRONMENTS_FILE";

pub static ENVIRONMENT_STYLE: LazyLock<Style> = LazyLock::new(|| Style::new().magenta());
pub static PREFIX_STYLE: LazyLock<Style> = LazyLock::new(|| Style::new().cyan());
