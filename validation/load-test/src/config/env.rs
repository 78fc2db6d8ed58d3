//! Deployment environments and their base URLs.

use crate::error::ConfigError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Supported deployment stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentName {
    Dev,
    Qa,
    #[default]
    Staging,
    Prod,
}

impl EnvironmentName {
    pub const ALL: [EnvironmentName; 4] = [
        EnvironmentName::Dev,
        EnvironmentName::Qa,
        EnvironmentName::Staging,
        EnvironmentName::Prod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EnvironmentName::Dev => "dev",
            EnvironmentName::Qa => "qa",
            EnvironmentName::Staging => "staging",
            EnvironmentName::Prod => "prod",
        }
    }
}

impl fmt::Display for EnvironmentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EnvironmentName::ALL
            .iter()
            .copied()
            .find(|env| env.as_str() == s)
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                name: s.to_string(),
                available: EnvironmentName::ALL
                    .iter()
                    .map(EnvironmentName::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}

/// Base URLs for one environment, one per logical domain.
///
/// Only `polanji` is used today; the other domains exist for cross-domain runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentConfig {
    pub name: EnvironmentName,
    pub polanji: String,
    pub domain_2: Option<String>,
    pub domain_3: Option<String>,
}

impl EnvironmentConfig {
    /// Built-in URLs for `name`.
    ///
    /// Only staging has a real deployment. The others point at local
    /// placeholders; pass `--base-url` to target an actual host.
    pub fn builtin(name: EnvironmentName) -> Self {
        let polanji = match name {
            EnvironmentName::Dev => "http://localhost:8000",
            EnvironmentName::Qa => "http://localhost:8001",
            EnvironmentName::Staging => "https://api.polanji.com",
            EnvironmentName::Prod => "http://localhost:8002",
        };
        Self {
            name,
            polanji: polanji.to_string(),
            domain_2: None,
            domain_3: None,
        }
    }

    /// Replace the Polanji base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, ConfigError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(ConfigError::MissingBaseUrl(self.name.to_string()));
        }
        self.polanji = base_url;
        Ok(self)
    }

    /// Fail unless this environment is one of `allowed`.
    pub fn require(&self, allowed: &[EnvironmentName]) -> Result<(), ConfigError> {
        if allowed.contains(&self.name) {
            Ok(())
        } else {
            Err(ConfigError::EnvironmentNotSupported {
                selected: self.name.to_string(),
                allowed: allowed
                    .iter()
                    .map(EnvironmentName::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
        }
    }
}

/// Resolve an environment by name; `None` selects `staging`.
pub fn resolve_environment(name: Option<&str>) -> Result<EnvironmentConfig, ConfigError> {
    let name = match name {
        Some(raw) => raw.parse()?,
        None => EnvironmentName::default(),
    };
    Ok(EnvironmentConfig::builtin(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_environment_has_base_url() {
        for env in EnvironmentName::ALL {
            let config = resolve_environment(Some(env.as_str())).unwrap();
            assert_eq!(config.name, env);
            assert!(!config.polanji.is_empty());
        }
    }

    #[test]
    fn test_only_staging_points_at_a_remote_host() {
        for env in EnvironmentName::ALL {
            let url = EnvironmentConfig::builtin(env).polanji;
            let local = url.starts_with("http://localhost:");
            assert_eq!(local, env != EnvironmentName::Staging, "{} -> {}", env, url);
        }
    }

    #[test]
    fn test_unknown_environment_is_fatal() {
        let err = resolve_environment(Some("uat")).unwrap_err();
        match err {
            ConfigError::UnknownEnvironment { name, available } => {
                assert_eq!(name, "uat");
                assert_eq!(available, "dev, qa, staging, prod");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_default_is_staging() {
        let config = resolve_environment(None).unwrap();
        assert_eq!(config.name, EnvironmentName::Staging);
        assert_eq!(config.polanji, "https://api.polanji.com");
    }

    #[test]
    fn test_require_guards_environment() {
        let dev = EnvironmentConfig::builtin(EnvironmentName::Dev);
        assert!(dev.require(&[EnvironmentName::Staging]).is_err());
        assert!(dev.require(&[EnvironmentName::Dev, EnvironmentName::Staging]).is_ok());
    }

    #[test]
    fn test_base_url_override() {
        let config = EnvironmentConfig::builtin(EnvironmentName::Qa)
            .with_base_url("http://127.0.0.1:3000")
            .unwrap();
        assert_eq!(config.polanji, "http://127.0.0.1:3000");
        assert!(EnvironmentConfig::builtin(EnvironmentName::Qa).with_base_url(" ").is_err());
    }
}
