use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Contact database file.
    #[serde(default = "default_database")]
    pub database: PathBuf,
    /// Directory holding `lid-mapping-*_reverse.json` files.
    #[serde(default = "default_session_path")]
    pub session_path: PathBuf,
    #[serde(default)]
    pub pass: SweepPass,
    #[serde(default)]
    pub dry_run: bool,
    /// Records listed after a run.
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
}

fn default_database() -> PathBuf {
    PathBuf::from("contacts.db")
}

fn default_session_path() -> PathBuf {
    PathBuf::from("./bot_sessions")
}

fn default_sample_size() -> usize {
    5
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            session_path: default_session_path(),
            pass: SweepPass::default(),
            dry_run: false,
            sample_size: default_sample_size(),
        }
    }
}

// ---------------------------------------------------------------------------
// Pass
// ---------------------------------------------------------------------------

/// Which part of the reconciliation a sweep performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepPass {
    /// Migrate and deduplicate.
    #[default]
    Full,
    /// Rewrite non-canonical values in place; never delete.
    Migrate,
    /// Remove duplicates; never rewrite.
    Dedupe,
}

impl std::fmt::Display for SweepPass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Migrate => write!(f, "migrate"),
            Self::Dedupe => write!(f, "dedupe"),
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

const MAX_SAMPLE_SIZE: usize = 1000;

impl SweepConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        let config: SweepConfig =
            toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.as_os_str().is_empty() {
            return Err(ConfigError::Validation("database path is empty".into()));
        }
        if self.session_path.as_os_str().is_empty() {
            return Err(ConfigError::Validation("session_path is empty".into()));
        }
        if self.sample_size > MAX_SAMPLE_SIZE {
            return Err(ConfigError::Validation(format!(
                "sample_size must be at most {MAX_SAMPLE_SIZE}, got {}",
                self.sample_size
            )));
        }
        Ok(())
    }

    /// Resolve relative paths against the config file's directory.
    pub fn rebase(mut self, base_dir: &Path) -> Self {
        if self.database.is_relative() {
            self.database = base_dir.join(&self.database);
        }
        if self.session_path.is_relative() {
            self.session_path = base_dir.join(&self.session_path);
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
database = "data/contacts.db"
session_path = "bot_sessions"
pass = "migrate"
dry_run = true
sample_size = 10
"#;

    #[test]
    fn parse_full() {
        let config = SweepConfig::from_toml(FULL).unwrap();
        assert_eq!(config.database, PathBuf::from("data/contacts.db"));
        assert_eq!(config.session_path, PathBuf::from("bot_sessions"));
        assert_eq!(config.pass, SweepPass::Migrate);
        assert!(config.dry_run);
        assert_eq!(config.sample_size, 10);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = SweepConfig::from_toml("").unwrap();
        assert_eq!(config.database, PathBuf::from("contacts.db"));
        assert_eq!(config.session_path, PathBuf::from("./bot_sessions"));
        assert_eq!(config.pass, SweepPass::Full);
        assert!(!config.dry_run);
        assert_eq!(config.sample_size, 5);
    }

    #[test]
    fn unknown_pass_rejected() {
        let err = SweepConfig::from_toml(r#"pass = "purge""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn unknown_key_rejected() {
        let err = SweepConfig::from_toml(r#"databse = "x.db""#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn empty_database_rejected() {
        let err = SweepConfig::from_toml(r#"database = """#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn oversized_sample_rejected() {
        let err = SweepConfig::from_toml("sample_size = 5000").unwrap_err();
        assert!(err.to_string().contains("sample_size"));
    }

    #[test]
    fn rebase_relative_paths_only() {
        let config = SweepConfig {
            database: PathBuf::from("contacts.db"),
            session_path: PathBuf::from("/var/lib/bot/sessions"),
            ..SweepConfig::default()
        }
        .rebase(Path::new("/etc/lidsweep"));
        assert_eq!(config.database, PathBuf::from("/etc/lidsweep/contacts.db"));
        assert_eq!(config.session_path, PathBuf::from("/var/lib/bot/sessions"));
    }
}
