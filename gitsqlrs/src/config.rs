//! Configuration system for gitsql.
//!
//! Supports TOML-based configuration; every field has a built-in default.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dialect::DialectKind;
use crate::error::{CompileError, Result};

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitSqlConfig {
    pub compiler: CompilerConfig,
    pub templates: TemplateConfig,
    pub generic: GenericConfig,
}

/// Output shape of compiled statements.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Target SQL dialect (default: mysql).
    pub dialect: DialectKind,
    /// Emit bind placeholders instead of inlined values (default: false).
    pub parameterize: bool,
    /// Input beyond this many characters is ignored (default: 4096).
    pub max_input_chars: usize,
}

/// Knobs of the special-case templates.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// LIMIT for "top contributors" without a number (default: 10).
    pub top_contributors_limit: u64,
    /// LIMIT for "bottom contributors" without a number (default: 3).
    pub bottom_contributors_limit: u64,
    /// Window of the recent-activity templates, in days (default: 30).
    pub recent_window_days: u32,
}

/// Generic assembler switches.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GenericConfig {
    /// Emit GROUP BY for repositories/authors on grouping cues (default: false).
    pub group_by: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::MySql,
            parameterize: false,
            max_input_chars: 4096,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            top_contributors_limit: 10,
            bottom_contributors_limit: 3,
            recent_window_days: 30,
        }
    }
}

impl GitSqlConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| CompileError::Config(format!("failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| CompileError::Config(format!("failed to parse config: {e}")))
    }

    /// Load from default locations (env var, cwd, user config dir, or defaults).
    ///
    /// Search order:
    /// 1. `GITSQL_CONFIG` environment variable
    /// 2. `./gitsql.toml` (current directory)
    /// 3. `~/.config/gitsql/config.toml` (user config dir)
    /// 4. Built-in defaults
    pub fn load_default() -> Self {
        if let Ok(path) = std::env::var("GITSQL_CONFIG") {
            match Self::from_file(&path) {
                Ok(cfg) => {
                    tracing::info!(path = %path, "loaded config from GITSQL_CONFIG");
                    return cfg;
                }
                Err(e) => tracing::warn!(path = %path, error = %e, "ignoring GITSQL_CONFIG"),
            }
        }

        if let Ok(cfg) = Self::from_file("gitsql.toml") {
            tracing::info!("loaded config from ./gitsql.toml");
            return cfg;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("gitsql").join("config.toml");
            if let Ok(cfg) = Self::from_file(&user_config) {
                tracing::info!(path = %user_config.display(), "loaded config from user config dir");
                return cfg;
            }
        }

        tracing::debug!("no config file found, using defaults");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = GitSqlConfig::default();
        assert_eq!(cfg.compiler.dialect, DialectKind::MySql);
        assert!(!cfg.compiler.parameterize);
        assert_eq!(cfg.templates.top_contributors_limit, 10);
        assert_eq!(cfg.templates.bottom_contributors_limit, 3);
        assert_eq!(cfg.templates.recent_window_days, 30);
        assert!(!cfg.generic.group_by);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[compiler]
dialect = "postgres"
parameterize = true

[templates]
bottom_contributors_limit = 5
"#;
        let cfg = GitSqlConfig::from_toml(toml).unwrap();
        assert_eq!(cfg.compiler.dialect, DialectKind::Postgres);
        assert!(cfg.compiler.parameterize);
        assert_eq!(cfg.compiler.max_input_chars, 4096);
        assert_eq!(cfg.templates.bottom_contributors_limit, 5);
        assert_eq!(cfg.templates.top_contributors_limit, 10);
    }

    #[test]
    fn test_rejects_unknown_dialect() {
        let err = GitSqlConfig::from_toml("[compiler]\ndialect = \"oracle\"\n").unwrap_err();
        assert!(matches!(err, CompileError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitsql.toml");
        std::fs::write(&path, "[generic]\ngroup_by = true\n").unwrap();
        let cfg = GitSqlConfig::from_file(&path).unwrap();
        assert!(cfg.generic.group_by);

        let missing = GitSqlConfig::from_file(dir.path().join("absent.toml"));
        assert!(matches!(missing, Err(CompileError::Config(_))));
    }

    // The only test that touches GITSQL_CONFIG, so no other test races it.
    #[test]
    fn test_load_default_reads_env_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[compiler]\ndialect = \"postgres\"\n\n[templates]\nrecent_window_days = 14\n",
        )
        .unwrap();

        std::env::set_var("GITSQL_CONFIG", &path);
        let cfg = GitSqlConfig::load_default();

        // An unreadable path is skipped rather than failing the load.
        std::env::set_var("GITSQL_CONFIG", dir.path().join("absent.toml"));
        let fallback = GitSqlConfig::load_default();
        std::env::remove_var("GITSQL_CONFIG");

        assert_eq!(cfg.compiler.dialect, DialectKind::Postgres);
        assert_eq!(cfg.templates.recent_window_days, 14);
        assert_ne!(fallback.templates.recent_window_days, 14);
    }
}
