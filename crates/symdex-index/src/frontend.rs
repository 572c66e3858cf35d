//! Frontend interface: the event vocabulary the index builder consumes.
//!
//! A frontend parses one translation unit and reports a flat stream of
//! declaration/reference events. The builder never sees frontend-native
//! cursors; everything it needs travels in these types, so a semantic
//! frontend (e.g. a compiler-backed one) can be swapped in behind the same
//! trait as the bundled syntactic one.

use std::path::Path;
use symdex_core::IndexError;

/// Identity of an entity as reported by the frontend.
///
/// The USR (Unified Symbol Reference) is a string that is stable across
/// translation units and unique within an entity kind. Anonymous entities
/// receive synthesized USRs; the empty string is never a valid USR for
/// functions or variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityInfo {
    pub usr: String,
    pub short_name: String,
    pub qualified_name: String,
}

impl EntityInfo {
    pub fn new(
        usr: impl Into<String>,
        short_name: impl Into<String>,
        qualified_name: impl Into<String>,
    ) -> Self {
        Self {
            usr: usr.into(),
            short_name: short_name.into(),
            qualified_name: qualified_name.into(),
        }
    }
}

/// A point in the source as reported by the frontend. Lines and columns are
/// 1-based; `file` is `None` when the frontend could not attribute the
/// position to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePos {
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
    /// True when the position lies in a compiler/system header.
    pub in_system_header: bool,
}

impl SourcePos {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: Some(file.into()),
            line,
            column,
            in_system_header: false,
        }
    }

    pub fn unknown(line: u32, column: u32) -> Self {
        Self {
            file: None,
            line,
            column,
            in_system_header: false,
        }
    }
}

/// One indexing event. Events arrive in source order for one translation
/// unit; the builder dispatches on the variant.
#[derive(Debug, Clone)]
pub enum IndexEvent {
    /// A type declaration or definition, including aliases. `pos` is the
    /// name token.
    TypeDecl {
        entity: EntityInfo,
        pos: SourcePos,
        is_definition: bool,
        /// Lexically enclosing record type, for nested types.
        declaring_type: Option<EntityInfo>,
        /// Immediate base specifiers, in declaration order.
        bases: Vec<EntityInfo>,
        /// The aliased type, when this declaration is a using/typedef.
        alias_of: Option<EntityInfo>,
    },

    /// A function declaration or definition. `overrides` lists the methods
    /// this one overrides, in frontend order.
    FuncDecl {
        entity: EntityInfo,
        pos: SourcePos,
        is_definition: bool,
        declaring_type: Option<EntityInfo>,
        overrides: Vec<EntityInfo>,
    },

    /// A variable declaration or definition: global, member, local, or
    /// parameter.
    VarDecl {
        entity: EntityInfo,
        pos: SourcePos,
        is_definition: bool,
        variable_type: Option<EntityInfo>,
        /// The record type declaring this variable, for members.
        declaring_type: Option<EntityInfo>,
        /// The function declaring this variable, for locals and parameters.
        enclosing_func: Option<EntityInfo>,
    },

    /// A direct call. `caller` is `None` when the call site's semantic
    /// parent is not a function (e.g. a static initializer); such calls
    /// contribute a usage on the callee but no caller/callee edge.
    Call {
        callee: EntityInfo,
        caller: Option<EntityInfo>,
        pos: SourcePos,
    },

    /// A non-call reference to a function (e.g. taking its address).
    FuncRef { entity: EntityInfo, pos: SourcePos },

    /// A reference to a variable.
    VarRef { entity: EntityInfo, pos: SourcePos },

    /// A name-token reference to a type.
    TypeRef { entity: EntityInfo, pos: SourcePos },
}

/// A C/C++ frontend: parses one translation unit into an event stream.
pub trait Frontend: Send + Sync {
    /// Human-readable frontend name, for logs.
    fn name(&self) -> &str;

    /// File extensions this frontend accepts (e.g. `["cc", "h"]`).
    fn file_extensions(&self) -> &[&str];

    /// Parse `path` with the given compiler arguments and report the events
    /// of the whole translation unit in source order.
    fn parse_unit(&self, path: &Path, args: &[String]) -> Result<Vec<IndexEvent>, IndexError>;
}
