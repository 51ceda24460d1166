//! Workspace provisioning core: client contracts, the orchestrator state
//! machine, warning accumulation, readiness types, and bounded polling.

pub mod contracts;
pub mod context;
pub mod orchestrator;
pub(crate) mod poll;
pub mod readiness;
pub mod warnings;

pub use contracts::{
    JobClient, JobOutcome, MappingStore, ProvisionClient, ReadinessProbe, WorkspaceRegistry,
};
pub use context::{LoadError, LoadResource, ProvisionContext};
pub use orchestrator::{ProvisionReport, Provisioner, POLL_INTERVAL, READINESS_DEADLINE};
pub use readiness::{ReadinessError, ReadinessResult, ReadinessStatus};
pub use warnings::{ProvisionStep, ProvisionWarning};
