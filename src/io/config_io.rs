use std::fs;
use std::path::{Path, PathBuf};

use crate::model::config::BoardConfig;

/// Name of the data directory a board lives in
pub const BOARD_DIR: &str = ".plank";
/// Name of the config file inside the data directory
pub const CONFIG_FILE: &str = "plank.toml";

/// Error type for board discovery and config I/O
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("not a plank board: no {BOARD_DIR}/ directory found")]
    NotABoard,
    #[error("could not parse {CONFIG_FILE}: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialize {CONFIG_FILE}: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Walk up from `start` looking for a `.plank/` directory holding a
/// `plank.toml`; returns the directory containing it.
pub fn discover_board(start: &Path) -> Result<PathBuf, ConfigError> {
    let mut current = start.to_path_buf();
    loop {
        let board_dir = current.join(BOARD_DIR);
        if board_dir.is_dir() && board_dir.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(ConfigError::NotABoard);
        }
    }
}

/// Load the board config from `<root>/.plank/plank.toml`
pub fn load_config(root: &Path) -> Result<BoardConfig, ConfigError> {
    let path = root.join(BOARD_DIR).join(CONFIG_FILE);
    let text = fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

/// Write the board config, creating the data directory if needed
pub fn save_config(root: &Path, config: &BoardConfig) -> Result<(), ConfigError> {
    let dir = root.join(BOARD_DIR);
    fs::create_dir_all(&dir)?;
    let text = toml::to_string_pretty(config)?;
    fs::write(dir.join(CONFIG_FILE), text)?;
    Ok(())
}
