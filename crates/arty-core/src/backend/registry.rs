//! Model selection, built once at startup and shared by reference.

use std::collections::BTreeMap;

use super::{Backend, LocalBackend, RemoteBackend};
use crate::error::GenerationError;

/// Maps model names to the backend that serves them.
///
/// Local engines are registered by name. Any other name is looked up on the
/// remote server, if one is configured.
#[derive(Clone, Default)]
pub struct ModelRegistry {
    local: BTreeMap<String, LocalBackend>,
    remote: Option<RemoteBackend>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("local", &self.local.keys().collect::<Vec<_>>())
            .field("remote", &self.remote.as_ref().map(RemoteBackend::base_url))
            .finish()
    }
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an in-process engine under `name`, replacing any previous one.
    pub fn with_local(mut self, name: impl Into<String>, backend: LocalBackend) -> Self {
        self.local.insert(name.into(), backend);
        self
    }

    pub fn with_remote(mut self, remote: RemoteBackend) -> Self {
        self.remote = Some(remote);
        self
    }

    /// `true` when at least one model source is configured.
    pub fn is_loaded(&self) -> bool {
        !self.local.is_empty() || self.remote.is_some()
    }

    /// Local model names followed by the remote server's models.
    pub async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let mut models: Vec<String> = self.local.keys().cloned().collect();
        if let Some(remote) = &self.remote {
            for name in remote.list_models().await? {
                if !self.local.contains_key(&name) {
                    models.push(name);
                }
            }
        }
        Ok(models)
    }

    /// Resolve `model` to a backend or fail with
    /// [`GenerationError::Selection`].
    pub async fn select(&self, model: &str) -> Result<Backend, GenerationError> {
        if let Some(local) = self.local.get(model) {
            return Ok(Backend::Local(local.clone()));
        }
        if let Some(remote) = &self.remote {
            if remote.list_models().await?.iter().any(|m| m == model) {
                return Ok(Backend::Remote(remote.clone()));
            }
        }
        Err(GenerationError::Selection {
            model: model.to_owned(),
        })
    }
}
