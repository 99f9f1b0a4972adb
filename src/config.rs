//! TOML configuration.
//!
//! Every field has a serde default, so an absent file or a partial one is
//! valid. Lookup order: `--config <path>`, then
//! `$XDG_CONFIG_HOME/ontology-search/config.toml` when it exists.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fetch::FetchOptions;
use crate::graph::DocumentFormat;
use crate::graph::parser::DEFAULT_MEDIA_TYPE;
use crate::ingest::IngestConfig;
use crate::paths::AppPaths;
use crate::store::UpsertPolicy;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration, persisted as TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OntologySearchConfig {
    /// Where the durable store lives. Defaults to the XDG data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub ingest: IngestSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Media type or short name used when `--format` is not given.
    #[serde(default = "default_format")]
    pub default_format: String,
    #[serde(default)]
    pub policy: UpsertPolicy,
    #[serde(default = "default_true")]
    pub parallel: bool,
    #[serde(default)]
    pub include_blank_nodes: bool,
    #[serde(default = "default_progress_every")]
    pub progress_every: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_timeout_secs() -> u64 {
    60
}
fn default_max_body_bytes() -> u64 {
    256 * 1024 * 1024
}
fn default_user_agent() -> String {
    format!("ontology-search/{}", env!("CARGO_PKG_VERSION"))
}
fn default_format() -> String {
    DEFAULT_MEDIA_TYPE.into()
}
fn default_true() -> bool {
    true
}
fn default_progress_every() -> usize {
    100
}
fn default_bind() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8300
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_body_bytes: default_max_body_bytes(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            default_format: default_format(),
            policy: UpsertPolicy::default(),
            parallel: true,
            include_blank_nodes: false,
            progress_every: default_progress_every(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl OntologySearchConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given (it must exist), otherwise the XDG config file
    /// if present, otherwise defaults.
    pub fn discover(explicit: Option<&Path>, paths: &AppPaths) -> ConfigResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let implicit = paths.config_file();
        if implicit.is_file() {
            tracing::debug!(path = %implicit.display(), "loading config");
            return Self::load(&implicit);
        }
        Ok(Self::default())
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: "<effective config>".into(),
            message: e.to_string(),
        })
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent() {
            crate::paths::ensure_dir(parent)?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch.timeout_secs",
                message: "must be greater than zero".into(),
            });
        }
        if self.fetch.max_body_bytes == 0 {
            return Err(ConfigError::Invalid {
                field: "fetch.max_body_bytes",
                message: "must be greater than zero".into(),
            });
        }
        DocumentFormat::resolve(&self.ingest.default_format).map_err(|e| ConfigError::Invalid {
            field: "ingest.default_format",
            message: e.to_string(),
        })?;
        Ok(())
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_secs(self.fetch.timeout_secs),
            max_body_bytes: self.fetch.max_body_bytes,
            user_agent: self.fetch.user_agent.clone(),
        }
    }

    /// Ingestion settings. No format override is set; the configured default
    /// format applies when neither `--format` nor a file extension decides.
    pub fn ingest_config(&self) -> ConfigResult<IngestConfig> {
        let default_format =
            DocumentFormat::resolve(&self.ingest.default_format).map_err(|e| ConfigError::Invalid {
                field: "ingest.default_format",
                message: e.to_string(),
            })?;
        Ok(IngestConfig {
            format: None,
            default_format,
            policy: self.ingest.policy,
            parallel: self.ingest.parallel,
            include_blank_nodes: self.ingest.include_blank_nodes,
            progress_every: self.ingest.progress_every,
        })
    }
}

impl ServerSettings {
    /// Apply `ONTOLOGY_SEARCH_BIND` / `ONTOLOGY_SEARCH_PORT`.
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.with_overrides(
            std::env::var("ONTOLOGY_SEARCH_BIND").ok(),
            std::env::var("ONTOLOGY_SEARCH_PORT").ok(),
        )
    }

    fn with_overrides(mut self, bind: Option<String>, port: Option<String>) -> ConfigResult<Self> {
        if let Some(bind) = bind {
            self.bind = bind;
        }
        if let Some(port) = port {
            self.port = port.parse().map_err(|_| ConfigError::Invalid {
                field: "server.port",
                message: format!("\"{port}\" is not a valid port number"),
            })?;
        }
        Ok(self)
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = OntologySearchConfig::parse("", Path::new("empty.toml")).unwrap();
        assert_eq!(cfg, OntologySearchConfig::default());
        assert_eq!(cfg.fetch.timeout_secs, 60);
        assert!(cfg.ingest.parallel);
        assert_eq!(cfg.ingest.policy, UpsertPolicy::InsertOnly);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = OntologySearchConfig::parse(
            "[ingest]\npolicy = \"merge-fields\"\ninclude_blank_nodes = true\n",
            Path::new("partial.toml"),
        )
        .unwrap();
        assert_eq!(cfg.ingest.policy, UpsertPolicy::MergeFields);
        assert!(cfg.ingest.include_blank_nodes);
        assert_eq!(cfg.ingest.progress_every, 100);
        assert_eq!(cfg.server.port, 8300);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = OntologySearchConfig::parse("[fetch]\ntimeout_secs = 0\n", Path::new("x.toml"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "fetch.timeout_secs", .. }));

        let err = OntologySearchConfig::parse(
            "[ingest]\ndefault_format = \"application/pdf\"\n",
            Path::new("x.toml"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "ingest.default_format", .. }));

        let err = OntologySearchConfig::parse("[ingest\n", Path::new("x.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn config_roundtrip_toml() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("conf/config.toml");
        let cfg = OntologySearchConfig {
            data_dir: Some(tmp.path().join("data")),
            ..Default::default()
        };
        cfg.save(&path).unwrap();
        assert_eq!(OntologySearchConfig::load(&path).unwrap(), cfg);
    }

    #[test]
    fn discover_prefers_explicit_and_tolerates_missing_implicit() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = AppPaths {
            config_dir: tmp.path().join("config"),
            data_dir: tmp.path().join("data"),
        };
        assert_eq!(
            OntologySearchConfig::discover(None, &paths).unwrap(),
            OntologySearchConfig::default()
        );

        let missing = tmp.path().join("nope.toml");
        assert!(matches!(
            OntologySearchConfig::discover(Some(&missing), &paths),
            Err(ConfigError::Read { .. })
        ));

        std::fs::create_dir_all(&paths.config_dir).unwrap();
        std::fs::write(paths.config_file(), "[server]\nport = 9000\n").unwrap();
        let cfg = OntologySearchConfig::discover(None, &paths).unwrap();
        assert_eq!(cfg.server.port, 9000);
    }

    #[test]
    fn ingest_config_resolves_short_format_names() {
        let mut cfg = OntologySearchConfig::default();
        cfg.ingest.default_format = "ttl".into();
        let ingest = cfg.ingest_config().unwrap();
        assert_eq!(ingest.format, None);
        assert_eq!(ingest.default_format, DocumentFormat::TURTLE);
    }

    #[test]
    fn server_overrides() {
        let server = ServerSettings::default()
            .with_overrides(Some("127.0.0.1".into()), Some("9100".into()))
            .unwrap();
        assert_eq!(server.addr(), "127.0.0.1:9100");
        assert!(ServerSettings::default()
            .with_overrides(None, Some("http".into()))
            .is_err());
    }
}
