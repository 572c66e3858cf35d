//! The per-translation-unit index store.
//!
//! An `IndexedFile` owns the three record vectors plus the USR intern tables
//! that are the sole source of entity identity: two sites reporting the same
//! USR resolve to the same record, two sites with different USRs are always
//! distinct even when names collide. Record vectors are append-only during a
//! single parse; existing indices never shift. After the build completes the
//! value is handed off immutable to the consumer.

use crate::files::FileTable;
use crate::ids::{FuncId, LocalId, TypeId, VarId};
use crate::records::{IndexedFunc, IndexedType, IndexedVar};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use symdex_core::IndexError;

/// The queryable index of one translation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexedFileRepr", into = "IndexedFileRepr")]
pub struct IndexedFile {
    /// Logical path of the translation unit this index was built from.
    pub path: String,

    /// Path interning for every `Location` in the records.
    pub files: FileTable,

    pub types: Vec<IndexedType>,
    pub funcs: Vec<IndexedFunc>,
    pub vars: Vec<IndexedVar>,

    usr_to_type: HashMap<String, TypeId>,
    usr_to_func: HashMap<String, FuncId>,
    usr_to_var: HashMap<String, VarId>,
}

impl IndexedFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            files: FileTable::new(),
            types: Vec::new(),
            funcs: Vec::new(),
            vars: Vec::new(),
            usr_to_type: HashMap::new(),
            usr_to_func: HashMap::new(),
            usr_to_var: HashMap::new(),
        }
    }

    /// Intern a type USR. Returns the existing id when present, otherwise
    /// appends a fresh record. Anonymous types are accepted as long as the
    /// frontend synthesizes a unique key for them.
    pub fn to_type_id(&mut self, usr: &str) -> TypeId {
        if let Some(id) = self.usr_to_type.get(usr) {
            return *id;
        }
        let id = LocalId::from_index(self.types.len());
        self.types.push(IndexedType::new(id, usr));
        self.usr_to_type.insert(usr.to_string(), id);
        id
    }

    /// Intern a function USR. An empty USR is a malformed event and aborts
    /// the parse.
    pub fn to_func_id(&mut self, usr: &str) -> Result<FuncId, IndexError> {
        if usr.is_empty() {
            return Err(IndexError::InvariantViolated(
                "empty USR for function".to_string(),
            ));
        }
        if let Some(id) = self.usr_to_func.get(usr) {
            return Ok(*id);
        }
        let id = LocalId::from_index(self.funcs.len());
        self.funcs.push(IndexedFunc::new(id, usr));
        self.usr_to_func.insert(usr.to_string(), id);
        Ok(id)
    }

    /// Intern a variable USR. An empty USR is a malformed event and aborts
    /// the parse.
    pub fn to_var_id(&mut self, usr: &str) -> Result<VarId, IndexError> {
        if usr.is_empty() {
            return Err(IndexError::InvariantViolated(
                "empty USR for variable".to_string(),
            ));
        }
        if let Some(id) = self.usr_to_var.get(usr) {
            return Ok(*id);
        }
        let id = LocalId::from_index(self.vars.len());
        self.vars.push(IndexedVar::new(id, usr));
        self.usr_to_var.insert(usr.to_string(), id);
        Ok(id)
    }

    // Resolution is a plain bounds-checked index: an out-of-range LocalId
    // cannot be produced by the intern tables, so hitting one is a bug and
    // the panic is the assertion.

    pub fn resolve_type(&self, id: TypeId) -> &IndexedType {
        &self.types[id.index()]
    }

    pub fn resolve_type_mut(&mut self, id: TypeId) -> &mut IndexedType {
        &mut self.types[id.index()]
    }

    pub fn resolve_func(&self, id: FuncId) -> &IndexedFunc {
        &self.funcs[id.index()]
    }

    pub fn resolve_func_mut(&mut self, id: FuncId) -> &mut IndexedFunc {
        &mut self.funcs[id.index()]
    }

    pub fn resolve_var(&self, id: VarId) -> &IndexedVar {
        &self.vars[id.index()]
    }

    pub fn resolve_var_mut(&mut self, id: VarId) -> &mut IndexedVar {
        &mut self.vars[id.index()]
    }

    /// Non-interning lookups, for queries over a finished index.
    pub fn find_type_id(&self, usr: &str) -> Option<TypeId> {
        self.usr_to_type.get(usr).copied()
    }

    pub fn find_func_id(&self, usr: &str) -> Option<FuncId> {
        self.usr_to_func.get(usr).copied()
    }

    pub fn find_var_id(&self, usr: &str) -> Option<VarId> {
        self.usr_to_var.get(usr).copied()
    }

    /// Serialize to the JSON tree form: record arrays in id order, locations
    /// in string form, optional fields omitted, the file table as a path
    /// array.
    pub fn to_json(&self) -> Result<String, IndexError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse the JSON tree form back; inverse of [`IndexedFile::to_json`].
    pub fn from_json(json: &str) -> Result<Self, IndexError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Wire shape of `IndexedFile`: the intern tables are derived data and are
/// rebuilt from the record vectors on the way in.
#[derive(Serialize, Deserialize)]
struct IndexedFileRepr {
    path: String,
    files: FileTable,
    #[serde(default)]
    types: Vec<IndexedType>,
    #[serde(default)]
    funcs: Vec<IndexedFunc>,
    #[serde(default)]
    vars: Vec<IndexedVar>,
}

impl From<IndexedFileRepr> for IndexedFile {
    fn from(repr: IndexedFileRepr) -> Self {
        let mut usr_to_type = HashMap::new();
        for t in &repr.types {
            usr_to_type.insert(t.def.usr.clone(), t.def.id);
        }
        let mut usr_to_func = HashMap::new();
        for f in &repr.funcs {
            usr_to_func.insert(f.def.usr.clone(), f.def.id);
        }
        let mut usr_to_var = HashMap::new();
        for v in &repr.vars {
            usr_to_var.insert(v.def.usr.clone(), v.def.id);
        }
        Self {
            path: repr.path,
            files: repr.files,
            types: repr.types,
            funcs: repr.funcs,
            vars: repr.vars,
            usr_to_type,
            usr_to_func,
            usr_to_var,
        }
    }
}

impl From<IndexedFile> for IndexedFileRepr {
    fn from(file: IndexedFile) -> Self {
        Self {
            path: file.path,
            files: file.files,
            types: file.types,
            funcs: file.funcs,
            vars: file.vars,
        }
    }
}
