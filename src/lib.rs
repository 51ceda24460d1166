//! Provisions a runtime workspace for user-selected capability modules by
//! ensuring each module has a usable, compatible model before the
//! interactive runtime is unblocked.
//!
//! The core is transport-agnostic: [`Provisioner`] drives the typed
//! contracts in [`provision::contracts`], and [`ApiClient`] is the JSON-RPC
//! implementation of those contracts. A run is one linear best-effort pass
//! (train missing models, persist the mapping, evaluate, then wait bounded
//! for readiness); remote failures degrade into warnings on the final
//! report instead of aborting the run.

pub mod provision;
pub mod registry;
pub mod rpc;
pub mod runtime;

pub use provision::{
    JobClient, JobOutcome, LoadError, LoadResource, MappingStore, ProvisionClient,
    ProvisionContext, ProvisionReport, ProvisionStep, ProvisionWarning, Provisioner,
    ReadinessError, ReadinessProbe, ReadinessResult, ReadinessStatus, WorkspaceRegistry,
    POLL_INTERVAL, READINESS_DEADLINE,
};
pub use registry::{
    compatible_models, is_compatible, Model, Module, ModuleMap, NeuralNetSpec, Workspace,
    DEFAULT_SEED,
};
pub use rpc::{ApiClient, ApiClientOptions, ApiError, ApiMetricsSnapshot};
pub use runtime::config::{BackendConfig, BackendConfigBuilder};
pub use runtime::telemetry::{init_tracing, Telemetry, TelemetrySnapshot};
