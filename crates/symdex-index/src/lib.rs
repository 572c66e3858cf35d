//! symdex-index: The per-translation-unit indexing core of the symdex
//! C/C++ code-intelligence engine.
//!
//! Given a source file plus compiler arguments, a frontend parses the
//! program and reports declaration/reference events; the builder maps them
//! into a compact, queryable graph of declarations, definitions, references,
//! and cross-relationships (type parents/derived, method base/overrides,
//! caller/callee, type instances, declaring types). Downstream services (a
//! language server, a persistent store, a diff engine joining per-file
//! indexes into a global database) consume the resulting `IndexedFile`.
//!
//! # Architecture
//!
//! - **location** — 64-bit packed source locations with an "interesting" flag
//! - **files** — path ⇔ `FileId` interning, one table per indexed file
//! - **ids** — typed `LocalId`/`Ref` handles into the record vectors
//! - **records** — Type/Func/Var records: def payload + cross-reference lists
//! - **indexed_file** — the store: record vectors, USR intern tables, JSON form
//! - **builder** — maps frontend events onto an `IndexedFile`
//! - **frontend** — the event vocabulary and the `Frontend` trait
//! - **cpp** — bundled tree-sitter-cpp syntactic frontend
//! - **diff** — envelope shape consumed by the cross-file merge engine
//! - **indexer** — parse entry point, worker-pool fan-out, directory walking
//! - **incremental** — SHA-256 based change detection

pub mod builder;
pub mod cpp;
pub mod diff;
pub mod files;
pub mod frontend;
pub mod ids;
pub mod incremental;
pub mod indexed_file;
pub mod indexer;
pub mod location;
pub mod records;

pub use builder::IndexBuilder;
pub use cpp::CppFrontend;
pub use diff::{FuncDiff, IndexDiff, TypeDiff, VarDiff};
pub use files::{FileId, FileTable};
pub use frontend::{EntityInfo, Frontend, IndexEvent, SourcePos};
pub use ids::{FuncId, FuncRef, LocalId, Ref, TypeId, TypeRef, VarId, VarRef};
pub use incremental::ChangeDetector;
pub use indexed_file::IndexedFile;
pub use indexer::{parse, IndexResult, Indexer, TranslationUnit};
pub use location::Location;
pub use records::{FuncDef, IndexedFunc, IndexedType, IndexedVar, TypeDef, VarDef};
