//! Diagnostics accumulated during a provisioning run. Warnings replace the
//! silent per-step discard policy: every swallowed failure is reported
//! while the run itself keeps going.

use std::fmt;
use std::time::Duration;

/// Pipeline step a swallowed failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    Train,
    WarmUp,
    Persist,
    Evaluate,
}

impl fmt::Display for ProvisionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Train => "training",
            Self::WarmUp => "warm-up training",
            Self::Persist => "mapping persistence",
            Self::Evaluate => "evaluation",
        };
        f.write_str(name)
    }
}

/// One diagnostic attached to an otherwise successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisionWarning {
    /// A remote step failed (or a training job finished without producing a
    /// model id) and was skipped.
    Step {
        step: ProvisionStep,
        module_id: Option<String>,
        message: String,
    },
    /// A pre-existing mapping entry references a model the session does not
    /// know about. The entry stays in place but is excluded from
    /// evaluation.
    UnknownModel { module_id: String, model_id: String },
    /// A pre-existing mapping entry fails the compatibility check. The
    /// entry stays in place but is excluded from evaluation.
    Incompatible { module_id: String, model_id: String },
    /// Readiness did not turn `ready` before the polling deadline.
    ReadinessTimeout { waited: Duration },
}

impl fmt::Display for ProvisionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step {
                step,
                module_id: Some(module_id),
                message,
            } => write!(f, "{step} failed for module {module_id}: {message}"),
            Self::Step {
                step,
                module_id: None,
                message,
            } => write!(f, "{step} failed: {message}"),
            Self::UnknownModel {
                module_id,
                model_id,
            } => write!(
                f,
                "module {module_id} is mapped to unknown model {model_id}; skipping evaluation"
            ),
            Self::Incompatible {
                module_id,
                model_id,
            } => write!(
                f,
                "model {model_id} is not compatible with module {module_id}; skipping evaluation"
            ),
            Self::ReadinessTimeout { waited } => write!(
                f,
                "workspace not ready after {} ms; proceeding without blocking",
                waited.as_millis()
            ),
        }
    }
}
