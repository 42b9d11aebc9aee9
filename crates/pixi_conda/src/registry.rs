use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use miette::Diagnostic;
use pixi_config::Config;
use serde::Serialize;
use thiserror::Error;

use crate::{
    prefix::{inspect, normalize_prefix, NormalizePrefixError},
    store::{EnvironmentsFile, PrefixStore, StoreError},
    EnvironmentName,
};

#[derive(Debug, Error, Diagnostic)]
pub enum RegistryError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Normalize(#[from] NormalizePrefixError),

    #[error("failed to read the environments directory '{}'", .path.display())]
    ReadEnvsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The result of [`Registry::unregister_env`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterOutcome {
    /// The prefix was removed from the registry.
    Removed,

    /// The prefix was not registered to begin with.
    NotRegistered,

    /// The metadata directory of the prefix contains more than the marker
    /// file, the prefix stays registered.
    Pinned,
}

/// An environment as reported by [`Registry::all_environments`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnownEnvironment {
    /// The name of the environment if it lives in the environments root.
    pub name: Option<EnvironmentName>,

    /// The location of the environment.
    pub prefix: PathBuf,
}

/// Keeps track of the conda environments on this machine.
///
/// Environments are known either because they live in the environments root
/// (and can be referred to by name), or because their prefix was registered
/// in the store.
pub struct Registry<S = EnvironmentsFile> {
    root: PathBuf,
    store: S,
}

impl Registry<EnvironmentsFile> {
    /// Constructs a registry from the given configuration.
    pub fn from_config(config: &Config) -> Self {
        let root = config.envs_root();
        let root = normalize_prefix(&root).unwrap_or(root);
        Self::new(root, EnvironmentsFile::new(config.environments_file()))
    }

    /// Constructs a new registry by reading the environment.
    ///
    /// By default, this will look for the `PIXI_HOME` environment variable
    /// and the global configuration stored there.
    pub fn from_env() -> Self {
        Self::from_config(&Config::load_global())
    }
}

impl<S: PrefixStore> Registry<S> {
    /// Constructs a new instance rooted at the given path.
    pub fn new(root: PathBuf, store: S) -> Self {
        Self { root, store }
    }

    /// Returns the root directory of the registry.
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Returns the store that holds the registered prefixes.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the prefix of the environment with the given name.
    pub fn prefix_for_name(&self, name: &EnvironmentName) -> PathBuf {
        self.root.join(name)
    }

    /// Returns all registered prefixes that are still conda environments.
    ///
    /// Prefixes that lost their `conda-meta/history` file are removed from
    /// the store as a side effect, so they will not be reported again.
    pub fn list_all_known_prefixes(&self) -> Result<Vec<PathBuf>, RegistryError> {
        let prefixes: Vec<PathBuf> = self.store.update(|prefixes| {
            prefixes.retain(|prefix| {
                let is_environment = inspect(prefix).is_environment();
                if !is_environment {
                    tracing::debug!(
                        "forgetting '{}' because it is no longer a conda environment",
                        prefix.display()
                    );
                }
                is_environment
            });
            prefixes.iter().cloned().collect()
        })?;
        Ok(prefixes)
    }

    /// Adds a prefix to the registry.
    ///
    /// The prefix does not need to be a conda environment (yet). If it still
    /// isn't one the next time the prefixes are listed it is dropped again.
    /// Returns `false` if the prefix was already registered.
    pub fn register_env(&self, prefix: &Path) -> Result<bool, RegistryError> {
        let prefix = normalize_prefix(prefix)?;
        let inserted = self.store.update(|prefixes| prefixes.insert(prefix.clone()))?;
        if inserted {
            tracing::info!("registered '{}'", prefix.display());
        } else {
            tracing::debug!("'{}' is already registered", prefix.display());
        }
        Ok(inserted)
    }

    /// Removes a prefix from the registry.
    ///
    /// A prefix whose `conda-meta` directory holds anything besides the
    /// history file is still in use and stays registered.
    pub fn unregister_env(&self, prefix: &Path) -> Result<UnregisterOutcome, RegistryError> {
        let prefix = normalize_prefix(prefix)?;
        if inspect(&prefix).is_pinned() {
            tracing::debug!(
                "not unregistering '{}' because its metadata directory is not empty",
                prefix.display()
            );
            return Ok(UnregisterOutcome::Pinned);
        }

        let removed = self
            .store
            .update(|prefixes| prefixes.shift_remove(&prefix))?;
        if removed {
            tracing::info!("unregistered '{}'", prefix.display());
            Ok(UnregisterOutcome::Removed)
        } else {
            Ok(UnregisterOutcome::NotRegistered)
        }
    }

    /// Returns the environments that live in the environments root, sorted
    /// by name.
    pub fn named_environments(&self) -> Result<Vec<(EnvironmentName, PathBuf)>, RegistryError> {
        let entries = match fs_err::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(RegistryError::ReadEnvsDir {
                    path: self.root.clone(),
                    source,
                })
            }
        };

        let mut environments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| RegistryError::ReadEnvsDir {
                path: self.root.clone(),
                source,
            })?;
            let prefix = entry.path();
            if !prefix.is_dir() || !inspect(&prefix).is_environment() {
                continue;
            }
            match EnvironmentName::from_prefix(&self.root, &prefix) {
                Some(name) => environments.push((name, prefix)),
                None => tracing::debug!(
                    "skipping '{}' because its name is not a valid environment name",
                    prefix.display()
                ),
            }
        }

        Ok(environments
            .into_iter()
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .collect())
    }

    /// Returns every environment known to the registry: the named
    /// environments first, followed by the registered prefixes.
    ///
    /// Like [`Self::list_all_known_prefixes`] this prunes stale prefixes.
    pub fn all_environments(&self) -> Result<Vec<KnownEnvironment>, RegistryError> {
        let mut environments = self
            .named_environments()?
            .into_iter()
            .map(|(name, prefix)| KnownEnvironment {
                name: Some(name),
                prefix,
            })
            .collect_vec();

        for prefix in self.list_all_known_prefixes()? {
            if environments.iter().any(|env| env.prefix == prefix) {
                continue;
            }
            environments.push(KnownEnvironment {
                name: EnvironmentName::from_prefix(&self.root, &prefix),
                prefix,
            });
        }

        Ok(environments)
    }
}
