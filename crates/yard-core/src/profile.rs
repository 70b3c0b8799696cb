//! Cluster profile persistence.
//!
//! Profiles live as TOML under the kubeyard home directory:
//! `<root>/profiles/<name>/config.toml`. The root is `$KUBEYARD_HOME` when
//! set, otherwise `~/.kubeyard`.

use std::fs;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

use crate::config::{ClusterConfig, ClusterConfigError};

/// Environment variable overriding the profile store root.
pub const HOME_ENV: &str = "KUBEYARD_HOME";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("no cluster profile named {0}")]
    NotFound(String),

    #[error("could not determine a home directory for the profile store")]
    NoHome,

    #[error("failed to read {p}: {source}", p = .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {p}: {source}", p = .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {p}: {source}", p = .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize cluster profile: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Invalid(#[from] ClusterConfigError),
}

/// On-disk store for cluster profiles.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    root: PathBuf,
}

impl ProfileStore {
    /// Open the store at `$KUBEYARD_HOME`, falling back to `~/.kubeyard`.
    pub fn open_default() -> Result<ProfileStore, ProfileError> {
        if let Ok(root) = std::env::var(HOME_ENV) {
            if !root.is_empty() {
                return Ok(ProfileStore::with_root(root));
            }
        }
        let home = dirs::home_dir().ok_or(ProfileError::NoHome)?;
        Ok(ProfileStore::with_root(home.join(".kubeyard")))
    }

    pub fn with_root(root: impl Into<PathBuf>) -> ProfileStore {
        ProfileStore { root: root.into() }
    }

    /// Path of a profile's config file within the store.
    pub fn config_path(&self, name: &str) -> PathBuf {
        self.root.join("profiles").join(name).join("config.toml")
    }

    /// Load and validate a cluster profile.
    pub fn load(&self, name: &str) -> Result<ClusterConfig, ProfileError> {
        let path = self.config_path(name);
        let content = fs::read_to_string(&path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                ProfileError::NotFound(name.to_string())
            } else {
                ProfileError::Read {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let config: ClusterConfig =
            toml::from_str(&content).map_err(|source| ProfileError::Parse {
                path: path.clone(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Persist a cluster profile, creating the profile directory as needed.
    pub fn save(&self, name: &str, config: &ClusterConfig) -> Result<(), ProfileError> {
        let path = self.config_path(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ProfileError::Write {
                path: path.clone(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(config)?;
        fs::write(&path, content).map_err(|source| ProfileError::Write {
            path: path.clone(),
            source,
        })?;
        debug!(profile = name, path = %path.display(), "saved cluster profile");
        Ok(())
    }
}
