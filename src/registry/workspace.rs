//! Workspace snapshots: the module selection and seed a provisioning run
//! works from.

use serde::{Deserialize, Serialize};

/// Fallback seed applied when a workspace does not pin one.
pub const DEFAULT_SEED: u64 = 1337;

/// A saved workspace: the selected module set and the seed that makes every
/// training and evaluation call of a run reproducible.
///
/// `selected_modules` is ordered; the orchestrator processes modules in
/// selection order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub selected_modules: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Workspace {
    /// The seed fed into every training/evaluation call of a run.
    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }
}
