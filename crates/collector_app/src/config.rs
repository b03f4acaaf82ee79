//! RON configuration for the collector binary.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use collector_core::{AuthScheme, Group, InputError};
use collector_engine::{ClientSettings, LookupLayout, StaticCredentials, DEFAULT_MAX_LINE_BYTES};
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the install root when the config leaves it out.
pub const INSTALL_ROOT_ENV: &str = "SPLUNK_HOME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("{0}")]
    Invalid(String),
    #[error("group {group}: {source}")]
    Group {
        group: String,
        #[source]
        source: InputError,
    },
    #[error("group {group}: environment variable {var} is not set")]
    MissingToken { group: String, var: String },
    #[error("no install_root configured and SPLUNK_HOME is not set")]
    MissingInstallRoot,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CollectorConfig {
    #[serde(default = "default_realm")]
    pub realm: String,
    pub checkpoint_dir: PathBuf,
    #[serde(default)]
    pub install_root: Option<PathBuf>,
    #[serde(default = "default_lookup_dir")]
    pub lookup_dir: PathBuf,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    #[serde(default)]
    pub groups: Vec<GroupConfig>,
}

/// One group entry. Exactly one of `token` and `token_env` must be set.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    /// Defaults to the top-level realm.
    #[serde(default)]
    pub realm: Option<String>,
    pub endpoint: String,
    pub group_id: String,
    pub name: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub token_env: Option<String>,
    #[serde(default)]
    pub auth_scheme: AuthScheme,
}

fn default_realm() -> String {
    "default".to_string()
}

fn default_lookup_dir() -> PathBuf {
    PathBuf::from(LookupLayout::DEFAULT_LOOKUP_DIR)
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_read_timeout_secs() -> u64 {
    120
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

impl CollectorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ron(&text).map_err(|err| match err {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        Ok(config)
    }

    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(text).map_err(|err| ConfigError::Parse {
            path: PathBuf::new(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.realm.trim().is_empty() {
            return Err(ConfigError::Invalid("realm must not be empty".into()));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "poll_interval_secs must be greater than zero".into(),
            ));
        }
        if self.connect_timeout_secs == 0
            || self.request_timeout_secs == 0
            || self.read_timeout_secs == 0
        {
            return Err(ConfigError::Invalid("timeouts must be greater than zero".into()));
        }
        if self.max_line_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_line_bytes must be greater than zero".into(),
            ));
        }

        let mut names = HashSet::new();
        for group in &self.groups {
            if group.name.trim().is_empty() {
                return Err(ConfigError::Invalid("group name must not be empty".into()));
            }
            if !names.insert(group.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate group name {}",
                    group.name
                )));
            }
            match (&group.token, &group.token_env) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return Err(ConfigError::Invalid(format!(
                        "group {} needs exactly one of token and token_env",
                        group.name
                    )))
                }
            }
            Group::new(&group.endpoint, "", &group.name, "", group.auth_scheme).map_err(
                |source| ConfigError::Group {
                    group: group.name.clone(),
                    source,
                },
            )?;
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn client_settings(&self) -> ClientSettings {
        ClientSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            read_timeout: Duration::from_secs(self.read_timeout_secs),
        }
    }

    /// `install_root` from the file, else `env(SPLUNK_HOME)`.
    pub fn lookup_layout(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<LookupLayout, ConfigError> {
        let install_root = match &self.install_root {
            Some(root) => root.clone(),
            None => env(INSTALL_ROOT_ENV)
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .ok_or(ConfigError::MissingInstallRoot)?,
        };
        Ok(LookupLayout::new(install_root, &self.lookup_dir))
    }

    /// Builds every configured group, resolving `token_env` through `env`.
    pub fn credentials(
        &self,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<StaticCredentials, ConfigError> {
        let mut credentials = StaticCredentials::new();
        for entry in &self.groups {
            let token = match (&entry.token, &entry.token_env) {
                (Some(token), _) => token.clone(),
                (None, Some(var)) => env(var).ok_or_else(|| ConfigError::MissingToken {
                    group: entry.name.clone(),
                    var: var.clone(),
                })?,
                (None, None) => {
                    return Err(ConfigError::Invalid(format!(
                        "group {} has no token",
                        entry.name
                    )))
                }
            };
            let group = Group::new(
                &entry.endpoint,
                entry.group_id.as_str(),
                entry.name.as_str(),
                token,
                entry.auth_scheme,
            )
            .map_err(|source| ConfigError::Group {
                group: entry.name.clone(),
                source,
            })?;
            let realm = entry.realm.clone().unwrap_or_else(|| self.realm.clone());
            credentials = credentials.with_group(realm, group);
        }
        Ok(credentials)
    }
}
