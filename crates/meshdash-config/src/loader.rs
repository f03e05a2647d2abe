//! Configuration loading

use crate::{Config, ConfigFormat};
use meshdash_core::{Error, Result};
use regex::Regex;
use std::env;
use std::fs;
use std::path::Path;

/// Load configuration from a file
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    let format = ConfigFormat::from_path(path)?;

    load_from_str(&content, format)
}

/// Expand environment variables in configuration string
/// Supports syntax: ${VAR} and ${VAR:-default}
fn expand_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(:-([^}]*))?\}")
        .map_err(|e| Error::Config(format!("Invalid regex: {e}")))?;

    let mut result = String::with_capacity(content.len());
    let mut last_match = 0;

    for cap in re.captures_iter(content) {
        let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let var_name = var_name.as_str();
        let default_value = cap.get(3).map(|m| m.as_str());

        let value = match (env::var(var_name), default_value) {
            (Ok(val), _) => val,
            (Err(_), Some(default)) => default.to_string(),
            (Err(_), None) => {
                return Err(Error::Config(format!(
                    "Environment variable '{var_name}' not set and no default provided"
                )));
            }
        };

        result.push_str(&content[last_match..full_match.start()]);
        result.push_str(&value);
        last_match = full_match.end();
    }

    result.push_str(&content[last_match..]);

    Ok(result)
}

/// Load configuration from a string
pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<Config> {
    let expanded_content = expand_env_vars(content)?;

    let config = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse YAML: {e}")))?,
        ConfigFormat::Toml => toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {e}")))?,
        ConfigFormat::Json => serde_json::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse JSON: {e}")))?,
    };

    Ok(config)
}

/// Load and validate configuration.
///
/// When `path` does not exist and `allow_missing` is set, defaults are used.
pub fn load_config<P: AsRef<Path>>(path: P, allow_missing: bool) -> Result<Config> {
    let path = path.as_ref();

    let config = if allow_missing && !path.exists() {
        tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        Config::default()
    } else {
        load_from_file(path)?
    };

    crate::validator::validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML_CONFIG: &str = r#"
url: "http://localhost:5984"
dbname: "mesh"
admin:
  url: "http://admin:pw@localhost:5984"
dashboard:
  port: 8080
  max_age: "1h"
  views_dir: "/srv/dash/views"
replication:
  timeout: "3s"
apps:
  - id: "geo"
    base_path: "/srv/apps/geo"
logging:
  level: "debug"
  format: "json"
"#;

    #[test]
    fn test_load_yaml() {
        let config = load_from_str(YAML_CONFIG, ConfigFormat::Yaml).unwrap();

        assert_eq!(config.dbname, "mesh");
        assert_eq!(config.dashboard.port, 8080);
        assert_eq!(config.dashboard.max_age.as_secs(), 3600);
        assert_eq!(config.dashboard.template_extension, "tmpl");
        assert_eq!(config.replication.timeout.as_secs(), 3);
        assert_eq!(config.apps.len(), 1);
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_load_toml() {
        let toml = r#"
dbname = "steelmesh"

[dashboard]
port = 3300
"#;
        let config = load_from_str(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.dashboard.port, 3300);
        assert_eq!(config.url, None);
    }

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = load_from_str("{}", ConfigFormat::Json).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_yaml() {
        let result = load_from_str("invalid: [yaml", ConfigFormat::Yaml);
        assert!(result.is_err());
    }

    #[test]
    fn test_env_var_substitution() {
        env::set_var("MESHDASH_TEST_PORT", "9090");

        let config = load_from_str(
            "dashboard:\n  port: ${MESHDASH_TEST_PORT}\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.dashboard.port, 9090);

        env::remove_var("MESHDASH_TEST_PORT");
    }

    #[test]
    fn test_env_var_with_default() {
        env::remove_var("MESHDASH_UNDEFINED_DB");

        let config = load_from_str(
            "dbname: \"${MESHDASH_UNDEFINED_DB:-steelmesh}\"\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert_eq!(config.dbname, "steelmesh");
    }

    #[test]
    fn test_missing_env_var_no_default() {
        env::remove_var("MESHDASH_MISSING_URL");

        let result = load_from_str("url: \"${MESHDASH_MISSING_URL}\"\n", ConfigFormat::Yaml);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("MESHDASH_MISSING_URL"));
    }

    #[test]
    fn test_multiple_env_vars() {
        env::set_var("MESHDASH_COUCH_HOST", "couch");
        env::set_var("MESHDASH_COUCH_PORT", "5984");

        let expanded =
            expand_env_vars("http://${MESHDASH_COUCH_HOST}:${MESHDASH_COUCH_PORT}/").unwrap();
        assert_eq!(expanded, "http://couch:5984/");

        env::remove_var("MESHDASH_COUCH_HOST");
        env::remove_var("MESHDASH_COUCH_PORT");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(YAML_CONFIG.as_bytes()).unwrap();

        let config = load_config(file.path(), false).unwrap();
        assert_eq!(config.dashboard.port, 8080);
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meshdash.yaml");

        assert!(load_config(&path, false).is_err());
        assert_eq!(load_config(&path, true).unwrap(), Config::default());
    }
}
