//! The module-to-model association used at runtime.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Association from module id to model id, at most one model per module.
///
/// The orchestrator holds a working copy that may diverge from the
/// persisted copy until explicitly saved. A working copy only ever grows:
/// [`ModuleMap::record`] never displaces an existing entry, so the mapping
/// at the end of a run is always a superset-or-equal, by key, of the
/// mapping the run started from.
///
/// Entries are stored sorted for deterministic iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleMap {
    entries: BTreeMap<String, String>,
}

impl ModuleMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Model mapped to `module_id`, if any.
    pub fn model_for(&self, module_id: &str) -> Option<&str> {
        self.entries.get(module_id).map(String::as_str)
    }

    pub fn contains(&self, module_id: &str) -> bool {
        self.entries.contains_key(module_id)
    }

    /// Records a freshly trained model for `module_id`. Returns `false` and
    /// leaves the mapping untouched if the module is already mapped: an
    /// existing entry is never displaced.
    pub fn record(&mut self, module_id: impl Into<String>, model_id: impl Into<String>) -> bool {
        let module_id = module_id.into();
        if self.entries.contains_key(&module_id) {
            return false;
        }
        self.entries.insert(module_id, model_id.into());
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(module, model)| (module.as_str(), model.as_str()))
    }

    /// True if every entry of `other` is present here, key-wise.
    pub fn is_superset_of(&self, other: &ModuleMap) -> bool {
        other
            .entries
            .keys()
            .all(|module| self.entries.contains_key(module))
    }
}

impl From<BTreeMap<String, String>> for ModuleMap {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self { entries }
    }
}

impl FromIterator<(String, String)> for ModuleMap {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
