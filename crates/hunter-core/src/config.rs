//! Process configuration, read once from the environment at startup.
//!
//! Every setting is independently overridable. `from_lookup` takes any key → value
//! function so tests never have to touch the real process environment.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::records::DayRange;

pub mod env_vars {
    pub const OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
    pub const OLLAMA_MODEL: &str = "OLLAMA_MODEL";
    pub const API_KEY: &str = "API_KEY";
    pub const REMOTE_HOST: &str = "REMOTE_HOST";
    pub const SSH_PORT: &str = "SSH_PORT";
    pub const SSH_USERNAME: &str = "SSH_USERNAME";
    pub const SSH_PRIVATE_KEY: &str = "SSH_PRIVATE_KEY";
    pub const SSH_KNOWN_HOSTS: &str = "SSH_KNOWN_HOSTS";
    pub const LOG_ARCHIVE_ROOT: &str = "LOG_ARCHIVE_ROOT";
    pub const LOG_ARCHIVE_PREFIX: &str = "LOG_ARCHIVE_PREFIX";
    pub const PORT: &str = "HUNTER_PORT";
    pub const DEFAULT_DAYS: &str = "HUNTER_DEFAULT_DAYS";
    pub const QUERY_TIMEOUT_SECS: &str = "HUNTER_QUERY_TIMEOUT_SECS";
    pub const ANSWER_LANGUAGE: &str = "HUNTER_ANSWER_LANGUAGE";
    pub const LOG_FILE: &str = "HUNTER_LOG_FILE";
}

const DEFAULT_BACKEND_URL: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "llama3";
const DEFAULT_SSH_PORT: u16 = 22;
const DEFAULT_SSH_USER: &str = "root";
const DEFAULT_SSH_KEY: &str = ".ssh/key";
const DEFAULT_ARCHIVE_ROOT: &str = "/var/ossec/logs/archives";
const DEFAULT_ARCHIVE_PREFIX: &str = "ossec-archive";
const DEFAULT_LOG_FILE: &str = "/var/ossec/logs/threat_hunter.log";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Connection details for reading archives over SSH.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub private_key: PathBuf,
    /// `None` accepts any host key.
    pub known_hosts: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub backend_url: String,
    pub model: String,
    pub temperature: f64,
    pub max_output_tokens: u32,
    pub api_key: Option<SecretString>,
    pub remote: Option<RemoteConfig>,
    pub archive_root: PathBuf,
    pub archive_prefix: String,
    pub port: u16,
    pub default_days: DayRange,
    pub query_timeout: Duration,
    pub answer_language: Option<String>,
    pub log_file: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            max_output_tokens: 512,
            api_key: None,
            remote: None,
            archive_root: PathBuf::from(DEFAULT_ARCHIVE_ROOT),
            archive_prefix: DEFAULT_ARCHIVE_PREFIX.to_string(),
            port: DEFAULT_PORT,
            default_days: DayRange::default(),
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            answer_language: None,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Empty values count as unset so `REMOTE_HOST=` selects local mode.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let port = match get(env_vars::PORT) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: env_vars::PORT,
                expected: "a TCP port",
                value: raw,
            })?,
            None => defaults.port,
        };

        let default_days = match get(env_vars::DEFAULT_DAYS) {
            Some(raw) => DayRange::parse(&raw).map_err(|_| ConfigError::Invalid {
                key: env_vars::DEFAULT_DAYS,
                expected: "an integer between 1 and 365",
                value: raw,
            })?,
            None => defaults.default_days,
        };

        let query_timeout = match get(env_vars::QUERY_TIMEOUT_SECS) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::Invalid {
                        key: env_vars::QUERY_TIMEOUT_SECS,
                        expected: "a positive number of seconds",
                        value: raw,
                    })
                }
            },
            None => defaults.query_timeout,
        };

        let ssh_port = match get(env_vars::SSH_PORT) {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                key: env_vars::SSH_PORT,
                expected: "a TCP port",
                value: raw,
            })?,
            None => DEFAULT_SSH_PORT,
        };

        let remote = get(env_vars::REMOTE_HOST).map(|host| RemoteConfig {
            host,
            port: ssh_port,
            user: get(env_vars::SSH_USERNAME).unwrap_or_else(|| DEFAULT_SSH_USER.to_string()),
            private_key: get(env_vars::SSH_PRIVATE_KEY)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SSH_KEY)),
            known_hosts: get(env_vars::SSH_KNOWN_HOSTS).map(PathBuf::from),
        });

        Ok(Self {
            backend_url: get(env_vars::OLLAMA_BASE_URL)
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.backend_url),
            model: get(env_vars::OLLAMA_MODEL).unwrap_or(defaults.model),
            api_key: get(env_vars::API_KEY).map(SecretString::from),
            remote,
            archive_root: get(env_vars::LOG_ARCHIVE_ROOT)
                .map(PathBuf::from)
                .unwrap_or(defaults.archive_root),
            archive_prefix: get(env_vars::LOG_ARCHIVE_PREFIX).unwrap_or(defaults.archive_prefix),
            port,
            default_days,
            query_timeout,
            answer_language: get(env_vars::ANSWER_LANGUAGE),
            log_file: get(env_vars::LOG_FILE)
                .map(PathBuf::from)
                .unwrap_or(defaults.log_file),
            ..defaults
        })
    }

    /// Point remote ingestion at `host`, keeping the SSH user/key settings.
    pub fn with_remote_host(mut self, host: impl Into<String>) -> Self {
        let host = host.into();
        match self.remote.as_mut() {
            Some(remote) => remote.host = host,
            None => {
                self.remote = Some(RemoteConfig {
                    host,
                    port: DEFAULT_SSH_PORT,
                    user: DEFAULT_SSH_USER.to_string(),
                    private_key: PathBuf::from(DEFAULT_SSH_KEY),
                    known_hosts: None,
                });
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_env_empty() {
        let cfg = ServiceConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.backend_url, "http://localhost:11434");
        assert_eq!(cfg.model, "llama3");
        assert!(cfg.remote.is_none());
        assert!(cfg.api_key.is_none());
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.default_days.get(), 1);
        assert_eq!(cfg.query_timeout, Duration::from_secs(60));
    }

    #[test]
    fn remote_settings_from_env() {
        let cfg = ServiceConfig::from_lookup(lookup(&[
            ("REMOTE_HOST", "10.1.2.3"),
            ("SSH_USERNAME", "wazuh"),
            ("SSH_PRIVATE_KEY", "/keys/id_rsa"),
            ("SSH_KNOWN_HOSTS", "/keys/known_hosts"),
        ]))
        .unwrap();
        let remote = cfg.remote.unwrap();
        assert_eq!(remote.host, "10.1.2.3");
        assert_eq!(remote.user, "wazuh");
        assert_eq!(remote.private_key, PathBuf::from("/keys/id_rsa"));
        assert_eq!(remote.known_hosts, Some(PathBuf::from("/keys/known_hosts")));
        assert_eq!(remote.port, 22);
    }

    #[test]
    fn ssh_port_override() {
        let cfg = ServiceConfig::from_lookup(lookup(&[
            ("REMOTE_HOST", "10.1.2.3"),
            ("SSH_PORT", "2222"),
        ]))
        .unwrap();
        assert_eq!(cfg.remote.unwrap().port, 2222);

        let err = ServiceConfig::from_lookup(lookup(&[("SSH_PORT", "ssh")])).unwrap_err();
        assert!(err.to_string().contains("SSH_PORT"));
    }

    #[test]
    fn blank_remote_host_means_local() {
        let cfg = ServiceConfig::from_lookup(lookup(&[("REMOTE_HOST", "  ")])).unwrap();
        assert!(cfg.remote.is_none());
    }

    #[test]
    fn trailing_slash_stripped_from_backend() {
        let cfg =
            ServiceConfig::from_lookup(lookup(&[("OLLAMA_BASE_URL", "http://gpu:11434/")])).unwrap();
        assert_eq!(cfg.backend_url, "http://gpu:11434");
    }

    #[test]
    fn invalid_numbers_rejected() {
        assert!(ServiceConfig::from_lookup(lookup(&[("HUNTER_PORT", "http")])).is_err());
        assert!(ServiceConfig::from_lookup(lookup(&[("HUNTER_DEFAULT_DAYS", "500")])).is_err());
        assert!(ServiceConfig::from_lookup(lookup(&[("HUNTER_QUERY_TIMEOUT_SECS", "0")])).is_err());
    }

    #[test]
    fn cli_host_override_keeps_ssh_settings() {
        let cfg = ServiceConfig::from_lookup(lookup(&[
            ("REMOTE_HOST", "10.1.2.3"),
            ("SSH_USERNAME", "wazuh"),
        ]))
        .unwrap()
        .with_remote_host("192.168.0.9");
        let remote = cfg.remote.unwrap();
        assert_eq!(remote.host, "192.168.0.9");
        assert_eq!(remote.user, "wazuh");
    }

    #[test]
    fn cli_host_override_enables_remote() {
        let cfg = ServiceConfig::default().with_remote_host("192.168.0.9");
        assert_eq!(cfg.remote.unwrap().user, "root");
    }
}
