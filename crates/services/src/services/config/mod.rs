//! Process configuration read from the environment.

use std::{path::PathBuf, time::Duration};

use db::{D1Config, DEFAULT_MAX_CONNECTIONS};
use thiserror::Error;
use utils::assets::{default_database_path, expand_tilde};

use super::meta::MetaApp;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_SCHEDULED_POST_INTERVAL_SECS: u64 = 5 * 60 * 60;
pub const DEFAULT_DISCORD_DIGEST_INTERVAL_SECS: u64 = 60;
const MAX_SQLITE_CONNECTIONS: u32 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BOARDROOM_STORAGE=d1 requires {0}")]
    MissingD1Setting(&'static str),
    #[error("Unknown storage backend '{0}', expected 'sqlite' or 'd1'")]
    UnknownStorage(String),
}

#[derive(Debug, Clone)]
pub enum StorageConfig {
    Sqlite { path: PathBuf, max_connections: u32 },
    D1(D1Config),
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageConfig,
    /// Base used for the Twitter OAuth callback. Derived from the request when unset.
    pub public_base_url: Option<String>,
    pub scheduled_post_interval: Duration,
    pub discord_digest_interval: Duration,
    pub meta_app: Option<MetaApp>,
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get("PORT").or_else(|| get("BACKEND_PORT")) {
            Some(raw) => parse_or_default("PORT", &raw, DEFAULT_PORT),
            None => DEFAULT_PORT,
        };

        let storage = match get("BOARDROOM_STORAGE").as_deref() {
            None | Some("sqlite") => {
                let path = get("DATABASE_PATH")
                    .map(|p| expand_tilde(&p))
                    .unwrap_or_else(default_database_path);
                let max_connections = match get("BOARDROOM_SQLITE_MAX_CONNECTIONS") {
                    Some(raw) => {
                        let parsed = parse_or_default(
                            "BOARDROOM_SQLITE_MAX_CONNECTIONS",
                            &raw,
                            DEFAULT_MAX_CONNECTIONS,
                        );
                        if (1..=MAX_SQLITE_CONNECTIONS).contains(&parsed) {
                            parsed
                        } else {
                            tracing::warn!(
                                "BOARDROOM_SQLITE_MAX_CONNECTIONS={} out of range 1..={}, using {}",
                                parsed,
                                MAX_SQLITE_CONNECTIONS,
                                DEFAULT_MAX_CONNECTIONS
                            );
                            DEFAULT_MAX_CONNECTIONS
                        }
                    }
                    None => DEFAULT_MAX_CONNECTIONS,
                };
                StorageConfig::Sqlite {
                    path,
                    max_connections,
                }
            }
            Some("d1") => StorageConfig::D1(D1Config {
                account_id: get("D1_ACCOUNT_ID")
                    .ok_or(ConfigError::MissingD1Setting("D1_ACCOUNT_ID"))?,
                database_id: get("D1_DATABASE_ID")
                    .ok_or(ConfigError::MissingD1Setting("D1_DATABASE_ID"))?,
                api_token: get("D1_API_TOKEN")
                    .ok_or(ConfigError::MissingD1Setting("D1_API_TOKEN"))?,
                api_base: get("D1_API_BASE"),
            }),
            Some(other) => return Err(ConfigError::UnknownStorage(other.to_string())),
        };

        let interval = |key: &str, default: u64| {
            let secs = match get(key) {
                Some(raw) => parse_or_default(key, &raw, default),
                None => default,
            };
            if secs == 0 {
                tracing::warn!("{} must be positive, using {}", key, default);
                return Duration::from_secs(default);
            }
            Duration::from_secs(secs)
        };

        let meta_app = match (get("META_APP_ID"), get("META_APP_SECRET")) {
            (Some(app_id), Some(app_secret)) => Some(MetaApp { app_id, app_secret }),
            _ => None,
        };

        Ok(Self {
            host,
            port,
            storage,
            public_base_url: get("PUBLIC_BASE_URL").map(|url| url.trim_end_matches('/').to_string()),
            scheduled_post_interval: interval(
                "SCHEDULED_POST_INTERVAL_SECS",
                DEFAULT_SCHEDULED_POST_INTERVAL_SECS,
            ),
            discord_digest_interval: interval(
                "DISCORD_DIGEST_INTERVAL_SECS",
                DEFAULT_DISCORD_DIGEST_INTERVAL_SECS,
            ),
            meta_app,
            cookie_secure: get("COOKIE_SECURE")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or_default<T: std::str::FromStr + std::fmt::Display + Copy>(
    key: &str,
    raw: &str,
    default: T,
) -> T {
    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!("Invalid {} value '{}', using {}", key, raw, default);
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serial_test::serial;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config(&[]).unwrap();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
        assert_eq!(config.scheduled_post_interval, Duration::from_secs(18000));
        assert_eq!(config.discord_digest_interval, Duration::from_secs(60));
        assert!(config.meta_app.is_none());
        assert!(!config.cookie_secure);
        match config.storage {
            StorageConfig::Sqlite {
                max_connections, ..
            } => assert_eq!(max_connections, DEFAULT_MAX_CONNECTIONS),
            StorageConfig::D1(_) => panic!("expected sqlite"),
        }
    }

    #[test]
    fn invalid_values_fall_back() {
        let config = config(&[
            ("PORT", "not-a-port"),
            ("BOARDROOM_SQLITE_MAX_CONNECTIONS", "500"),
            ("SCHEDULED_POST_INTERVAL_SECS", "0"),
        ])
        .unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.scheduled_post_interval, Duration::from_secs(18000));
        let StorageConfig::Sqlite {
            max_connections, ..
        } = config.storage
        else {
            panic!("expected sqlite");
        };
        assert_eq!(max_connections, DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn backend_port_is_accepted() {
        let config = config(&[("BACKEND_PORT", "8787")]).unwrap();
        assert_eq!(config.port, 8787);
    }

    #[test]
    fn d1_requires_credentials() {
        let err = config(&[("BOARDROOM_STORAGE", "d1"), ("D1_ACCOUNT_ID", "acc")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingD1Setting("D1_DATABASE_ID")));

        let config = config(&[
            ("BOARDROOM_STORAGE", "d1"),
            ("D1_ACCOUNT_ID", "acc"),
            ("D1_DATABASE_ID", "db"),
            ("D1_API_TOKEN", "token"),
        ])
        .unwrap();
        let StorageConfig::D1(d1) = config.storage else {
            panic!("expected d1");
        };
        assert_eq!(d1.account_id, "acc");
        assert!(d1.api_base.is_none());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(
            config(&[("BOARDROOM_STORAGE", "postgres")]),
            Err(ConfigError::UnknownStorage(_))
        ));
    }

    #[test]
    fn meta_app_needs_both_halves() {
        assert!(config(&[("META_APP_ID", "1")]).unwrap().meta_app.is_none());
        let app = config(&[("META_APP_ID", "1"), ("META_APP_SECRET", "s")])
            .unwrap()
            .meta_app
            .unwrap();
        assert_eq!(app.app_id, "1");
    }

    #[test]
    #[serial]
    fn reads_process_environment() {
        // SAFETY: serialized with every other test touching the environment.
        unsafe {
            std::env::set_var("PUBLIC_BASE_URL", "https://board.example.com/");
            std::env::set_var("COOKIE_SECURE", "true");
        }
        let config = AppConfig::from_env().unwrap();
        unsafe {
            std::env::remove_var("PUBLIC_BASE_URL");
            std::env::remove_var("COOKIE_SECURE");
        }
        assert_eq!(
            config.public_base_url.as_deref(),
            Some("https://board.example.com")
        );
        assert!(config.cookie_secure);
    }
}
