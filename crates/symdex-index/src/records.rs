//! Entity records: types, functions, and variables.
//!
//! Each kind is split into a def payload (identity and definition-side
//! facts) and an index wrapper adding the cross-reference lists populated as
//! the rest of the translation unit is seen (usages, derived types/methods,
//! callers, instances). The three kinds share a shape but deliberately no
//! trait: the few uniform operations live as parallel methods on
//! `IndexedFile` instead of behind dynamic dispatch.

use crate::ids::{FuncId, FuncRef, TypeId, VarId};
use crate::location::Location;
use serde::{Deserialize, Serialize};

/// Merge `loc` into a usage list.
///
/// Usage lists are insertion-ordered and deduplicated by position (equality
/// ignoring the interesting bit). When the location is already present, the
/// interesting bit is promoted if `loc` carries it: the same token can be
/// reported by several frontend events, and the stronger signal wins.
/// Interestingness is monotonic; once set it stays.
fn add_usage(uses: &mut Vec<Location>, loc: Location, insert_if_not_present: bool) {
    for existing in uses.iter_mut() {
        if existing.equals_ignoring_interesting(&loc) {
            if loc.interesting() && !existing.interesting() {
                *existing = existing.with_interesting(true);
            }
            return;
        }
    }
    if insert_if_not_present {
        uses.push(loc);
    }
}

// ── Types ─────────────────────────────────────────────────────────────────

/// Definition-side payload of a type record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub id: TypeId,
    /// Unique within the type kind. May be a synthesized value for
    /// anonymous types, but never collides.
    pub usr: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub qualified_name: String,

    /// Site of the type definition. Forward declarations are not separately
    /// recorded; the frontend cannot reliably distinguish them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Location>,

    /// Set iff this type comes from a type-alias declaration; the aliased
    /// underlying type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<TypeId>,

    /// Immediate base types, in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<TypeId>,

    /// Types, functions, and variables declared lexically inside this type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<TypeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub funcs: Vec<FuncId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vars: Vec<VarId>,
}

impl TypeDef {
    pub fn new(id: TypeId, usr: impl Into<String>) -> Self {
        Self {
            id,
            usr: usr.into(),
            short_name: String::new(),
            qualified_name: String::new(),
            definition: None,
            alias_of: None,
            parents: Vec::new(),
            types: Vec::new(),
            funcs: Vec::new(),
            vars: Vec::new(),
        }
    }
}

/// A type record together with its cross-reference lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedType {
    pub def: TypeDef,

    /// Immediate derived types; inverse of `def.parents`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<TypeId>,

    /// Variables whose type is this one; inverse of `VarDef::variable_type`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instances: Vec<VarId>,

    /// Every reference location, insertion-ordered. Do not push directly;
    /// use `add_usage`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<Location>,

    #[serde(default)]
    pub is_system_def: bool,
}

impl IndexedType {
    pub fn new(id: TypeId, usr: impl Into<String>) -> Self {
        Self {
            def: TypeDef::new(id, usr),
            derived: Vec::new(),
            instances: Vec::new(),
            uses: Vec::new(),
            is_system_def: false,
        }
    }

    pub fn add_usage(&mut self, loc: Location, insert_if_not_present: bool) {
        add_usage(&mut self.uses, loc, insert_if_not_present);
    }

    pub fn add_derived(&mut self, id: TypeId) {
        if !self.derived.contains(&id) {
            self.derived.push(id);
        }
    }

    pub fn add_instance(&mut self, id: VarId) {
        if !self.instances.contains(&id) {
            self.instances.push(id);
        }
    }
}

// ── Functions ─────────────────────────────────────────────────────────────

/// Definition-side payload of a function record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuncDef {
    pub id: FuncId,
    pub usr: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Location>,

    /// The type that declares this function, when it is a method.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaring_type: Option<TypeId>,

    /// The method this one overrides. When a method overrides several bases
    /// the first override link in frontend order is kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<FuncId>,

    /// Local variables declared in this function.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locals: Vec<VarId>,

    /// Functions this one calls, recorded at the call site.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callees: Vec<FuncRef>,
}

impl FuncDef {
    pub fn new(id: FuncId, usr: impl Into<String>) -> Self {
        let usr = usr.into();
        debug_assert!(!usr.is_empty());
        Self {
            id,
            usr,
            short_name: String::new(),
            qualified_name: String::new(),
            definition: None,
            declaring_type: None,
            base: None,
            locals: Vec::new(),
            callees: Vec::new(),
        }
    }
}

/// A function record together with its cross-reference lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedFunc {
    pub def: FuncDef,

    /// Forward-declaration sites.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub declarations: Vec<Location>,

    /// Methods which directly override this one; inverse of `def.base`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub derived: Vec<FuncId>,

    /// Functions which call this one; mirror of the callers' `callees`
    /// entries, same location on both sides.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub callers: Vec<FuncRef>,

    /// Every syntactic reference, including call sites. Do not push
    /// directly; use `add_usage`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<Location>,

    #[serde(default)]
    pub is_system_def: bool,
}

impl IndexedFunc {
    pub fn new(id: FuncId, usr: impl Into<String>) -> Self {
        Self {
            def: FuncDef::new(id, usr),
            declarations: Vec::new(),
            derived: Vec::new(),
            callers: Vec::new(),
            uses: Vec::new(),
            is_system_def: false,
        }
    }

    pub fn add_usage(&mut self, loc: Location, insert_if_not_present: bool) {
        add_usage(&mut self.uses, loc, insert_if_not_present);
    }

    pub fn add_derived(&mut self, id: FuncId) {
        if !self.derived.contains(&id) {
            self.derived.push(id);
        }
    }

    pub fn add_declaration(&mut self, loc: Location) {
        if !self.declarations.iter().any(|d| *d == loc) {
            self.declarations.push(loc);
        }
    }
}

// ── Variables ─────────────────────────────────────────────────────────────

/// Definition-side payload of a variable record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDef {
    pub id: VarId,
    pub usr: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub qualified_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaration: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<Location>,

    /// Type of the variable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_type: Option<TypeId>,

    /// The type that declares this variable, when it is a member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declaring_type: Option<TypeId>,
}

impl VarDef {
    pub fn new(id: VarId, usr: impl Into<String>) -> Self {
        let usr = usr.into();
        debug_assert!(!usr.is_empty());
        Self {
            id,
            usr,
            short_name: String::new(),
            qualified_name: String::new(),
            declaration: None,
            definition: None,
            variable_type: None,
            declaring_type: None,
        }
    }
}

/// A variable record together with its usage list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedVar {
    pub def: VarDef,

    /// Every reference location. Do not push directly; use `add_usage`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<Location>,

    #[serde(default)]
    pub is_system_def: bool,
}

impl IndexedVar {
    pub fn new(id: VarId, usr: impl Into<String>) -> Self {
        Self {
            def: VarDef::new(id, usr),
            uses: Vec::new(),
            is_system_def: false,
        }
    }

    pub fn add_usage(&mut self, loc: Location, insert_if_not_present: bool) {
        add_usage(&mut self.uses, loc, insert_if_not_present);
    }
}
