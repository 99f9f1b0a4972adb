//! XDG-compliant path resolution for ontology-search.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

const APP_DIR: &str = "ontology-search";

/// Global XDG directories for ontology-search.
#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    /// `$XDG_CONFIG_HOME/ontology-search/`
    pub config_dir: PathBuf,
    /// `$XDG_DATA_HOME/ontology-search/`
    pub data_dir: PathBuf,
}

impl AppPaths {
    /// Resolve XDG directories from environment variables with standard fallbacks.
    pub fn resolve() -> Result<Self, ConfigError> {
        let home = std::env::var("HOME").map(PathBuf::from).ok();
        Self::from_env(
            home,
            std::env::var("XDG_CONFIG_HOME").ok().map(PathBuf::from),
            std::env::var("XDG_DATA_HOME").ok().map(PathBuf::from),
        )
    }

    fn from_env(
        home: Option<PathBuf>,
        config_home: Option<PathBuf>,
        data_home: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        let base = |xdg: Option<PathBuf>, fallback: &str| -> Result<PathBuf, ConfigError> {
            match xdg.filter(|p| p.is_absolute()) {
                Some(dir) => Ok(dir),
                None => home
                    .as_ref()
                    .map(|h| h.join(fallback))
                    .ok_or(ConfigError::NoHome),
            }
        };
        Ok(Self {
            config_dir: base(config_home, ".config")?.join(APP_DIR),
            data_dir: base(data_home, ".local/share")?.join(APP_DIR),
        })
    }

    /// Override the data directory (`--data-dir` or `data_dir` in config).
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Path to the global config file.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Create the data directory. Idempotent.
    pub fn ensure_dirs(&self) -> Result<(), ConfigError> {
        ensure_dir(&self.data_dir)
    }
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<(), ConfigError> {
    std::fs::create_dir_all(dir).map_err(|source| ConfigError::CreateDir {
        path: dir.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_vars_take_precedence() {
        let paths = AppPaths::from_env(
            Some("/home/u".into()),
            Some("/xdg/config".into()),
            Some("/xdg/data".into()),
        )
        .unwrap();
        assert_eq!(paths.config_dir, PathBuf::from("/xdg/config/ontology-search"));
        assert_eq!(paths.data_dir, PathBuf::from("/xdg/data/ontology-search"));
        assert_eq!(
            paths.config_file(),
            PathBuf::from("/xdg/config/ontology-search/config.toml")
        );
    }

    #[test]
    fn falls_back_to_home() {
        // Relative XDG values are invalid and ignored.
        let paths = AppPaths::from_env(Some("/home/u".into()), None, Some("rel".into())).unwrap();
        assert_eq!(paths.config_dir, PathBuf::from("/home/u/.config/ontology-search"));
        assert_eq!(paths.data_dir, PathBuf::from("/home/u/.local/share/ontology-search"));
    }

    #[test]
    fn no_home_no_xdg_is_an_error() {
        assert!(matches!(
            AppPaths::from_env(None, None, None),
            Err(ConfigError::NoHome)
        ));
    }

    #[test]
    fn ensure_dirs_creates_data_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let paths = AppPaths::from_env(Some(tmp.path().into()), None, None).unwrap()
            .with_data_dir(tmp.path().join("nested/data"));
        paths.ensure_dirs().unwrap();
        assert!(paths.data_dir.is_dir());
    }
}
