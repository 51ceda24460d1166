//! Workspace readiness: the gate that decides whether the interactive
//! runtime may be unblocked, plus the structured errors explaining why not.

use serde::{Deserialize, Serialize};

/// Workspace-wide readiness status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadinessStatus {
    Ready,
    /// Older backends report this state as `blocked`.
    #[serde(alias = "blocked")]
    NotReady,
}

/// One structured blocking error from a readiness reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessError {
    pub error_code: String,
    pub human_message: String,
    #[serde(default)]
    pub hint: String,
    #[serde(default)]
    pub where_to_find_logs: String,
}

/// Result of one readiness probe.
///
/// Transient: recomputed on every probe and never cached by the
/// orchestrator beyond the current poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadinessResult {
    pub status: ReadinessStatus,
    #[serde(default)]
    pub errors: Vec<ReadinessError>,
}

impl ReadinessResult {
    pub fn is_ready(&self) -> bool {
        self.status == ReadinessStatus::Ready
    }

    /// Stand-in reported when every probe attempt of a run failed.
    pub fn no_successful_probe() -> Self {
        Self {
            status: ReadinessStatus::NotReady,
            errors: vec![ReadinessError {
                error_code: "no_successful_probe".into(),
                human_message: "Every readiness probe failed before the deadline.".into(),
                hint: "Check that the backend is running and reachable.".into(),
                where_to_find_logs: "backend service logs".into(),
            }],
        }
    }
}
