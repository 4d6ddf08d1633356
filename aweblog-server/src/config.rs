use aweblog_data::DbConfig;
use serde::Deserialize;
use std::path::Path;

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9000,
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Server secret mixed into the cookie digest.
    pub secret: String,
    /// Cookie lifetime in seconds.
    pub max_age: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            secret: "Awesome".to_string(),
            max_age: 86400,
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub db: DbConfig,
    pub session: SessionConfig,
}

#[derive(Debug)]
pub enum ConfigError {
    Load(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Load(msg) => write!(f, "config load error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl AppConfig {
    /// Load the base config file, then merge the override file over it
    /// when one exists. A missing override file is not an error.
    pub fn load(base: &Path, override_path: &Path) -> Result<Self, ConfigError> {
        let mut value = read_yaml(base)?;
        if override_path.exists() {
            let overrides = read_yaml(override_path)?;
            merge(&mut value, overrides);
        }
        serde_yaml::from_value(value).map_err(|err| ConfigError::Load(err.to_string()))
    }
}

fn read_yaml(path: &Path) -> Result<serde_yaml::Value, ConfigError> {
    let content =
        std::fs::read_to_string(path).map_err(|err| ConfigError::Load(format!("{}: {err}", path.display())))?;
    serde_yaml::from_str(&content).map_err(|err| ConfigError::Load(format!("{}: {err}", path.display())))
}

/// Recursively merge mappings; override scalars win over base scalars.
fn merge(base: &mut serde_yaml::Value, overrides: serde_yaml::Value) {
    match (base, overrides) {
        (serde_yaml::Value::Mapping(base_map), serde_yaml::Value::Mapping(override_map)) => {
            for (key, value) in override_map {
                match base_map.get_mut(&key) {
                    Some(slot) => merge(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> serde_yaml::Value {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn override_values_win() {
        let mut base = parse(
            "db:\n  host: localhost\n  user: www-data\nsession:\n  secret: Awesome\n",
        );
        let overrides = parse("db:\n  host: 192.168.0.100\n");
        merge(&mut base, overrides);
        let config: AppConfig = serde_yaml::from_value(base).unwrap();
        assert_eq!(config.db.host, "192.168.0.100");
        // untouched keys keep their base values
        assert_eq!(config.db.user, "www-data");
        assert_eq!(config.session.secret, "Awesome");
    }

    #[test]
    fn defaults_fill_missing_sections() {
        let config: AppConfig = serde_yaml::from_value(parse("session:\n  secret: s\n")).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.db.port, 3306);
        assert_eq!(config.db.max_connections, 10);
        assert_eq!(config.session.max_age, 86400);
    }
}
