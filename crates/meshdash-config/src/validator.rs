//! Configuration validation

use crate::Config;
use meshdash_core::{Error, Result};

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_database(config)?;
    validate_dashboard(config)?;
    validate_replication(config)?;
    validate_logging(config)?;

    Ok(())
}

fn validate_database(config: &Config) -> Result<()> {
    if config.dbname.trim().is_empty() {
        return Err(Error::Config("dbname cannot be empty".to_string()));
    }

    let admin_url = config.admin.as_ref().and_then(|a| a.url.as_deref());
    for (field, value) in [("url", config.url.as_deref()), ("admin.url", admin_url)] {
        if let Some(value) = value {
            url::Url::parse(value)
                .map_err(|e| Error::Config(format!("Invalid {field} '{value}': {e}")))?;
        }
    }

    if config.replication_url().is_none() {
        tracing::warn!("No url or admin.url configured, replication mode detection disabled");
    }

    Ok(())
}

fn validate_dashboard(config: &Config) -> Result<()> {
    let dashboard = &config.dashboard;

    if dashboard.port == 0 {
        return Err(Error::Config("dashboard.port must be > 0".to_string()));
    }

    let ext = dashboard.template_extension.trim_start_matches('.');
    if ext.is_empty() {
        return Err(Error::Config(
            "dashboard.template_extension cannot be empty".to_string(),
        ));
    }
    if ext == "html" {
        return Err(Error::Config(
            "dashboard.template_extension must differ from 'html'".to_string(),
        ));
    }

    if dashboard.max_age.as_secs() > 365 * 24 * 3600 {
        tracing::warn!("dashboard.max_age is very high (>1 year)");
    }

    Ok(())
}

fn validate_replication(config: &Config) -> Result<()> {
    if config.replication.timeout.is_zero() {
        return Err(Error::Config("replication.timeout must be > 0".to_string()));
    }

    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    match config.logging.format.as_str() {
        "text" | "json" => Ok(()),
        other => Err(Error::Config(format!(
            "Invalid logging.format: {other} (must be text or json)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AdminConfig;
    use std::time::Duration;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_dbname() {
        let config = Config {
            dbname: "  ".to_string(),
            ..Config::default()
        };
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_invalid_admin_url() {
        let config = Config {
            admin: Some(AdminConfig {
                url: Some("not a url".to_string()),
            }),
            ..Config::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("admin.url"));
    }

    #[test]
    fn test_zero_port() {
        let mut config = Config::default();
        config.dashboard.port = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_template_extension_rules() {
        let mut config = Config::default();

        config.dashboard.template_extension = ".html".to_string();
        assert!(validate_config(&config).is_err());

        config.dashboard.template_extension = String::new();
        assert!(validate_config(&config).is_err());

        config.dashboard.template_extension = ".tmpl".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_replication_timeout() {
        let mut config = Config::default();
        config.replication.timeout = Duration::ZERO;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_logging_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_string();
        assert!(validate_config(&config).is_err());
    }
}
