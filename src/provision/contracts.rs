//! Typed contracts for the remote collaborators a provisioning run drives.
//! Object-safe so scenario tests can stand in doubles for the backend.

use crate::provision::readiness::ReadinessResult;
use crate::registry::{Model, Module, ModuleMap, NeuralNetSpec, Workspace};
use anyhow::Result;
use futures::future::BoxFuture;
use serde_json::Value;

/// Outcome of a remote train or evaluate job.
///
/// Jobs are not idempotent: submitting the same request twice may produce
/// two distinct artifacts, so consumers must use the ids and payloads of
/// each individual outcome rather than assume repeatability.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobOutcome {
    pub success: bool,
    /// Model produced by a training job.
    pub model_id: Option<String>,
    /// Metrics payload produced by an evaluation job.
    pub metrics: Option<Value>,
    /// Failure detail reported by the job runner.
    pub error: Option<String>,
}

/// Submits train/evaluate requests to the remote job runner. Each call
/// suspends until the job resolves.
pub trait JobClient: Send + Sync {
    fn train<'a>(
        &'a self,
        module_id: &'a str,
        seed: u64,
        nn_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<JobOutcome>>;

    fn evaluate<'a>(
        &'a self,
        module_id: &'a str,
        seed: u64,
        model_id: &'a str,
    ) -> BoxFuture<'a, Result<JobOutcome>>;
}

/// Reads and writes the persisted module-to-model association.
pub trait MappingStore: Send + Sync {
    fn get_mapping(&self) -> BoxFuture<'_, Result<ModuleMap>>;

    fn save_mapping<'a>(&'a self, mapping: &'a ModuleMap) -> BoxFuture<'a, Result<()>>;
}

/// Workspace-wide readiness check. Read-only. A transport failure is
/// distinct from a successful `not_ready` reply, though the polling loop
/// treats both as "not yet ready".
pub trait ReadinessProbe: Send + Sync {
    fn probe(&self) -> BoxFuture<'_, Result<ReadinessResult>>;
}

/// Registry reads plus workspace persistence.
pub trait WorkspaceRegistry: Send + Sync {
    fn list_modules(&self) -> BoxFuture<'_, Result<Vec<Module>>>;

    fn list_models(&self) -> BoxFuture<'_, Result<Vec<Model>>>;

    fn list_neural_nets(&self) -> BoxFuture<'_, Result<Vec<NeuralNetSpec>>>;

    fn get_workspace(&self) -> BoxFuture<'_, Result<Workspace>>;

    fn save_workspace<'a>(
        &'a self,
        selected: &'a [String],
        name: Option<&'a str>,
        seed: Option<u64>,
    ) -> BoxFuture<'a, Result<Workspace>>;
}

/// Everything the orchestrator needs from one backend connection.
pub trait ProvisionClient: JobClient + MappingStore + ReadinessProbe + WorkspaceRegistry {}

impl<C> ProvisionClient for C where C: JobClient + MappingStore + ReadinessProbe + WorkspaceRegistry {}
