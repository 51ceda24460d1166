//! Pre-run loading of the registry state a provisioning run works from.
//! This is the only hard-failure path in the crate: if loading fails, no
//! partial run is attempted.

use crate::provision::contracts::ProvisionClient;
use crate::registry::{Model, Module, ModuleMap, Workspace};
use anyhow::Error as AnyError;
use std::fmt;

/// Resource that failed to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadResource {
    Workspace,
    Modules,
    Models,
    Mapping,
}

impl fmt::Display for LoadResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Workspace => "workspace",
            Self::Modules => "module registry",
            Self::Models => "model registry",
            Self::Mapping => "module mapping",
        };
        f.write_str(name)
    }
}

/// Failure to assemble the initial state before a run starts. Fatal: it is
/// surfaced to the caller and no phase of the pipeline executes.
#[derive(Debug)]
pub struct LoadError {
    resource: LoadResource,
    source: AnyError,
}

impl LoadError {
    pub(crate) fn new(resource: LoadResource, source: AnyError) -> Self {
        Self { resource, source }
    }

    pub fn resource(&self) -> LoadResource {
        self.resource
    }

    pub fn into_source(self) -> AnyError {
        self.source
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to load {}: {}", self.resource, self.source)
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

/// Immutable snapshot of everything one provisioning run works from:
/// the workspace, the known module and model sets, and the persisted
/// mapping at the moment the run started.
#[derive(Debug, Clone)]
pub struct ProvisionContext {
    pub workspace: Workspace,
    pub modules: Vec<Module>,
    pub models: Vec<Model>,
    pub mapping: ModuleMap,
}

impl ProvisionContext {
    /// Fetches the workspace, both registries, and the persisted mapping.
    pub async fn load<C: ProvisionClient>(client: &C) -> Result<Self, LoadError> {
        let workspace = client
            .get_workspace()
            .await
            .map_err(|err| LoadError::new(LoadResource::Workspace, err))?;
        let modules = client
            .list_modules()
            .await
            .map_err(|err| LoadError::new(LoadResource::Modules, err))?;
        let models = client
            .list_models()
            .await
            .map_err(|err| LoadError::new(LoadResource::Models, err))?;
        let mapping = client
            .get_mapping()
            .await
            .map_err(|err| LoadError::new(LoadResource::Mapping, err))?;

        tracing::debug!(
            workspace = %workspace.id,
            modules = modules.len(),
            models = models.len(),
            mapped = mapping.len(),
            "loaded provisioning context"
        );

        Ok(Self {
            workspace,
            modules,
            models,
            mapping,
        })
    }

    pub fn module(&self, module_id: &str) -> Option<&Module> {
        self.modules.iter().find(|module| module.id == module_id)
    }

    pub fn model(&self, model_id: &str) -> Option<&Model> {
        self.models.iter().find(|model| model.id == model_id)
    }
}
