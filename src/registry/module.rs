//! Capability modules and the compatibility predicate deciding which
//! trained models can back them.

use crate::registry::model::Model;
use serde::{Deserialize, Serialize};

/// A user-selectable capability unit requiring a compatible model to run.
///
/// Loaded from the backend registry and immutable for the lifetime of a
/// session. Listings may contain manifest-invalid entries carrying only an
/// `id` and an `error`; those deserialize with empty metadata and therefore
/// match no model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    /// Capability tags; a mapped model must provide one of them.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Single task tag; a mapped model must match it exactly.
    #[serde(default)]
    pub task: String,
    /// Declared UI panel identifiers. Carried for callers; the core never
    /// reads them.
    #[serde(default)]
    pub ui_panels: Vec<String>,
    /// Manifest validation error reported by the backend registry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Decides whether `model` satisfies `module`'s requirements: the model's
/// capability tag must be a member of the module's capability set and the
/// task tags must be equal exactly (case-sensitive, no fuzzy matching).
///
/// Pure and total: no I/O, no side effects, never panics.
pub fn is_compatible(module: &Module, model: &Model) -> bool {
    module.capabilities.iter().any(|cap| cap == &model.capability) && module.task == model.task
}

/// Filters `models` down to the ones `module` can run, preserving order.
pub fn compatible_models<'a>(module: &Module, models: &'a [Model]) -> Vec<&'a Model> {
    models
        .iter()
        .filter(|model| is_compatible(module, model))
        .collect()
}
