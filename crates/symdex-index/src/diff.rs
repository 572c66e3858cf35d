//! Diff envelope for the cross-file merge engine.
//!
//! When two `IndexedFile`s for the same logical path are compared, the merge
//! engine emits removed/added/changed lists per entity kind. Only the shape
//! is fixed here; the records are opaque to the core and currently carry the
//! entity USR. The diff algorithm itself lives with the merger.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDiff {
    pub usr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuncDiff {
    pub usr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VarDiff {
    pub usr: String,
}

/// The payload emitted for one re-indexed translation unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexDiff {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_types: Vec<TypeDiff>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_funcs: Vec<FuncDiff>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub removed_vars: Vec<VarDiff>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_types: Vec<TypeDiff>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_funcs: Vec<FuncDiff>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_vars: Vec<VarDiff>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_types: Vec<TypeDiff>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_funcs: Vec<FuncDiff>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_vars: Vec<VarDiff>,
}

impl IndexDiff {
    pub fn is_empty(&self) -> bool {
        self.removed_types.is_empty()
            && self.removed_funcs.is_empty()
            && self.removed_vars.is_empty()
            && self.added_types.is_empty()
            && self.added_funcs.is_empty()
            && self.added_vars.is_empty()
            && self.changed_types.is_empty()
            && self.changed_funcs.is_empty()
            && self.changed_vars.is_empty()
    }
}
