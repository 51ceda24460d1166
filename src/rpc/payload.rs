//! Wire payload types for the provisioning backend's JSON-RPC replies and
//! their conversion into the typed outcomes the orchestrator consumes.

use crate::provision::contracts::JobOutcome;
use crate::registry::{Model, Module, ModuleMap, NeuralNetSpec, Workspace};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Finished,
    Failed,
}

/// Job record carried inside `train` and `evaluate` replies.
#[derive(Debug, Clone, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub status: JobStatus,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobReply {
    #[serde(default)]
    pub ok: bool,
    pub job: JobRecord,
}

impl JobReply {
    /// Collapses the wire record into the outcome shape the orchestrator
    /// consumes. A train result surfaces its `model_id`; an evaluate result
    /// is carried whole as the metrics payload.
    pub fn into_outcome(self) -> JobOutcome {
        let JobRecord {
            status,
            result,
            error,
            ..
        } = self.job;
        let model_id = result
            .as_ref()
            .and_then(|value| value.get("model_id"))
            .and_then(Value::as_str)
            .map(str::to_owned);
        JobOutcome {
            success: self.ok && status == JobStatus::Finished,
            model_id,
            metrics: result,
            error,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MappingReply {
    #[serde(default)]
    pub module_map: ModuleMap,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct AckReply {
    #[serde(default)]
    pub ok: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModulesReply {
    #[serde(default)]
    pub modules: Vec<Module>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsReply {
    #[serde(default)]
    pub models: Vec<Model>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NeuralNetsReply {
    #[serde(default)]
    pub neural_nets: Vec<NeuralNetSpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkspaceReply {
    #[serde(default)]
    pub ok: bool,
    pub workspace: Workspace,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthReply {
    pub status: String,
}
