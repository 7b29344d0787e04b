use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::ExitError;

/// Config file name constant.
pub const CONFIG_TOML: &str = "rewind.toml";

/// Top-level rewind.toml config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The bot's own nickname, used for docs requests and to ignore its own
    /// nick changes.
    pub nick: String,
    /// Lines of history kept per user per channel. Fixed for the lifetime
    /// of the process.
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,
    /// Nicks whose events are dropped entirely.
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_recall_limit() -> usize {
    50
}

impl Config {
    /// Minimal config when no file exists: just a nick and defaults.
    pub fn with_nick(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            recall_limit: default_recall_limit(),
            ignore: Vec::new(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.nick.trim().is_empty() {
            return Err(ExitError::Config("nick must not be empty".to_string()).into());
        }
        if self.recall_limit == 0 {
            return Err(ExitError::Config("recall_limit must be positive".to_string()).into());
        }
        Ok(())
    }
}

/// Find the config file in a directory. Returns None if it does not exist.
pub fn find_config(dir: &Path) -> Option<PathBuf> {
    let path = dir.join(CONFIG_TOML);
    if path.exists() { Some(path) } else { None }
}

/// Find config in the standard locations: current directory, then the
/// user's config directory (`<config_dir>/rewind/rewind.toml`).
pub fn discover() -> Option<PathBuf> {
    if let Some(path) = find_config(Path::new(".")) {
        return Some(path);
    }
    dirs::config_dir().and_then(|dir| find_config(&dir.join("rewind")))
}

/// Load and validate a config file.
pub fn load(path: &Path) -> anyhow::Result<Config> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let config: Config = toml::from_str(&raw)
        .map_err(|e| ExitError::Config(format!("{}: {e}", path.display())))?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_full_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "nick = \"rewind\"\nrecall_limit = 25\nignore = [\"spambot\"]"
        )
        .unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.nick, "rewind");
        assert_eq!(config.recall_limit, 25);
        assert_eq!(config.ignore, vec!["spambot".to_string()]);
    }

    #[test]
    fn recall_limit_defaults_when_absent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nick = \"rewind\"").unwrap();

        let config = load(file.path()).unwrap();
        assert_eq!(config.recall_limit, 50);
        assert!(config.ignore.is_empty());
    }

    #[test]
    fn zero_recall_limit_is_a_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "nick = \"rewind\"\nrecall_limit = 0").unwrap();

        let err = load(file.path()).unwrap_err();
        assert!(err.downcast_ref::<ExitError>().is_some());
    }

    #[test]
    fn empty_nick_is_a_config_error() {
        assert!(Config::with_nick("  ").validate().is_err());
    }
}
