use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "ccs";
const CONFIG_NAME: &str = "config";

/// File name of the aggregate snapshot inside the Claude data dir
pub const STATS_CACHE_FILE: &str = "stats-cache.json";

/// Per-project side index maintained by Claude Code
pub const SESSION_INDEX_FILE: &str = "sessions-index.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Claude Code data directory, `~` is expanded
    pub claude_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            claude_dir: "~/.claude".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Rows shown by `sessions` when `-n` is not given
    pub session_limit: usize,
    /// Rows shown in the sessions box of today/week/month
    pub period_session_limit: usize,
    /// Busiest hours listed by `summary`
    pub peak_hours: usize,
    /// Trailing days in the `tokens` daily chart
    pub token_days: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            session_limit: 20,
            period_session_limit: 15,
            peak_hours: 5,
            token_days: 14,
        }
    }
}

/// Load configuration.
///
/// An explicit path must exist. Otherwise the platform config file is used when
/// present; a missing file yields defaults and nothing is written to disk.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        return confy::load_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let path = match confy::get_configuration_file_path(APP_NAME, CONFIG_NAME) {
        Ok(p) => p,
        Err(e) => {
            log::debug!("No config location available: {}", e);
            return Ok(Config::default());
        }
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    confy::load_path(&path).with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Resolved locations of the Claude Code data this tool reads
#[derive(Debug, Clone)]
pub struct ClaudePaths {
    root: PathBuf,
}

impl ClaudePaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve the data dir: CLI/env override first, then the config value.
    pub fn resolve(config: &Config, override_dir: Option<&Path>) -> Result<Self> {
        if let Some(dir) = override_dir {
            return Ok(Self::new(dir));
        }
        Ok(Self::new(expand_path(&config.data.claude_dir)?))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn projects_dir(&self) -> PathBuf {
        self.root.join("projects")
    }

    pub fn stats_cache(&self) -> PathBuf {
        self.root.join(STATS_CACHE_FILE)
    }
}

/// Expand `~` and environment variables in a configured path
fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full_with_context(raw, home_dir_str, |var| {
        std::env::var(var).map(Some)
    })
    .with_context(|| format!("Invalid path in config: {}", raw))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

fn home_dir_str() -> Option<String> {
    dirs::home_dir().map(|h| h.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.data.claude_dir, "~/.claude");
        assert_eq!(config.display.session_limit, 20);
        assert_eq!(config.display.period_session_limit, 15);
    }

    #[test]
    fn test_paths_layout() {
        let paths = ClaudePaths::new("/data/claude");
        assert_eq!(paths.projects_dir(), PathBuf::from("/data/claude/projects"));
        assert_eq!(
            paths.stats_cache(),
            PathBuf::from("/data/claude/stats-cache.json")
        );
    }

    #[test]
    fn test_override_wins() {
        let config = Config::default();
        let paths = ClaudePaths::resolve(&config, Some(Path::new("/tmp/other"))).unwrap();
        assert_eq!(paths.root(), Path::new("/tmp/other"));
    }

    #[test]
    fn test_tilde_expanded() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let config = Config::default();
        let paths = ClaudePaths::resolve(&config, None).unwrap();
        assert_eq!(paths.root(), home.join(".claude"));
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ccs.toml");
        std::fs::write(
            &path,
            "[data]\nclaude_dir = \"/srv/claude\"\n\n[display]\nsession_limit = 5\n",
        )
        .unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.data.claude_dir, "/srv/claude");
        assert_eq!(config.display.session_limit, 5);
        // Unspecified fields keep their defaults
        assert_eq!(config.display.token_days, 14);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(load_config(Some(&path)).is_err());
        assert!(!path.exists());
    }
}
