//! YAML file with named database connections.
//!
//! ```yaml
//! default_timezone: Europe/Berlin
//! databases:
//!   dwh:
//!     type: postgres
//!     host: localhost
//!     database: dwh
//! ```

use crate::dialect::DbConfig;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable pointing at the connections file.
pub const CONFIG_ENV: &str = "DBPIPE_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionsFile {
    /// Session timezone for clients that can set one
    pub default_timezone: Option<String>,
    /// Connections by alias
    pub databases: BTreeMap<String, DbConfig>,
}

impl ConnectionsFile {
    /// Load and validate a connections file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let file: ConnectionsFile = serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        file.validate()?;
        Ok(file)
    }

    /// Load from `explicit`, `$DBPIPE_CONFIG` or the user config directory,
    /// in that order.
    pub fn discover(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match default_path(explicit) {
            Some(path) => Self::load(&path),
            None => bail!(
                "No connections file found. Pass --config, set {} or create {}",
                CONFIG_ENV,
                user_config_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "dbpipe/connections.yaml in your config directory".into())
            ),
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        for (alias, config) in &self.databases {
            config
                .validate()
                .with_context(|| format!("Invalid connection '{}'", alias))?;
        }
        Ok(())
    }

    /// Look up a connection by alias.
    pub fn resolve(&self, alias: &str) -> anyhow::Result<&DbConfig> {
        match self.databases.get(alias) {
            Some(config) => Ok(config),
            None if self.databases.is_empty() => {
                bail!("Unknown database alias '{}': no databases configured", alias)
            }
            None => bail!(
                "Unknown database alias '{}'. Configured: {}",
                alias,
                self.aliases().collect::<Vec<_>>().join(", ")
            ),
        }
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.databases.keys().map(String::as_str)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dbpipe").join("connections.yaml"))
}

/// The connections file to read, if any.
///
/// An explicit path or `$DBPIPE_CONFIG` is returned even when missing, so the
/// load error names it; the user config path only when it exists.
pub fn default_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|v| !v.is_empty()) {
        return Some(PathBuf::from(path));
    }
    user_config_path().filter(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;

    #[test]
    fn test_parse_tagged_databases() {
        let yaml = r#"
default_timezone: UTC
databases:
  dwh:
    type: postgres
    host: localhost
    port: 5432
  legacy:
    type: mssql
    host: sql01
"#;
        let file: ConnectionsFile = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(file.default_timezone.as_deref(), Some("UTC"));
        assert_eq!(file.resolve("dwh").unwrap().dialect(), Dialect::Postgres);
        assert_eq!(file.resolve("legacy").unwrap().dialect(), Dialect::Sqsh);
    }

    #[test]
    fn test_resolve_lists_aliases() {
        let yaml = "databases:\n  a:\n    type: sqlite\n    file_name: a.db\n  b:\n    type: sqlite\n    file_name: b.db\n";
        let file: ConnectionsFile = serde_yaml_ng::from_str(yaml).unwrap();
        let err = file.resolve("c").unwrap_err().to_string();
        assert!(err.contains("'c'"));
        assert!(err.contains("a, b"));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = Path::new("/tmp/explicit.yaml");
        assert_eq!(default_path(Some(path)), Some(path.to_path_buf()));
    }
}
