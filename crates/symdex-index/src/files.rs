//! File path interning.
//!
//! Every `Location` refers to its file through a compact `FileId`. The
//! `FileTable` owns the bidirectional mapping between absolute paths and ids
//! for one translation unit. Id 0 is reserved for "no file / unknown"; fresh
//! ids are assigned monotonically from 1. Inside one indexed file the ids are
//! not globally meaningful; the cross-file merger rewrites them.

use crate::location::{Location, FILE_ID_MAX};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use symdex_core::IndexError;

/// Compact identifier for a file path. `FileId(0)` means "unknown".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(u32);

impl FileId {
    /// Sentinel for "no file / unknown".
    pub const UNKNOWN: FileId = FileId(0);

    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interning table between absolute file paths and `FileId`s.
///
/// Serializes as a path array indexed by file id; the path at index 0 is
/// empty.
#[derive(Debug, Clone, PartialEq)]
pub struct FileTable {
    paths: Vec<String>,
    ids: HashMap<String, FileId>,
}

impl FileTable {
    pub fn new() -> Self {
        // Reserve id 0 for unfound.
        let mut ids = HashMap::new();
        ids.insert(String::new(), FileId::UNKNOWN);
        Self {
            paths: vec![String::new()],
            ids,
        }
    }

    /// Intern `path`, assigning a fresh id equal to the current table size
    /// when it has not been seen before.
    pub fn intern(&mut self, path: &str) -> Result<FileId, IndexError> {
        if let Some(id) = self.ids.get(path) {
            return Ok(*id);
        }
        let raw = self.paths.len();
        if raw > FILE_ID_MAX as usize {
            return Err(IndexError::CapacityExceeded(format!(
                "file table full: {raw} paths"
            )));
        }
        let id = FileId::new(raw as u32);
        self.paths.push(path.to_string());
        self.ids.insert(path.to_string(), id);
        Ok(id)
    }

    /// Resolve a frontend position into a packed `Location`. An absent file
    /// maps to id 0.
    pub fn resolve(
        &mut self,
        file: Option<&str>,
        line: u32,
        column: u32,
        interesting: bool,
    ) -> Result<Location, IndexError> {
        let file_id = match file {
            Some(path) => self.intern(path)?,
            None => FileId::UNKNOWN,
        };
        Location::checked(interesting, file_id, line, column)
    }

    /// Look up the path for an id. Id 0 yields the empty path.
    pub fn path(&self, id: FileId) -> Option<&str> {
        self.paths.get(id.raw() as usize).map(String::as_str)
    }

    pub fn lookup(&self, path: &str) -> Option<FileId> {
        self.ids.get(path).copied()
    }

    /// Number of interned paths, including the reserved empty path.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        // The reserved empty path is always present.
        self.paths.len() <= 1
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for FileTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.paths.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FileTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let paths = Vec::<String>::deserialize(deserializer)?;
        let mut table = FileTable::new();
        for path in paths.iter().skip(1) {
            table
                .intern(path)
                .map_err(|e| serde::de::Error::custom(e.to_string()))?;
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_path_is_id_zero() {
        let table = FileTable::new();
        assert_eq!(table.lookup(""), Some(FileId::UNKNOWN));
        assert_eq!(table.path(FileId::UNKNOWN), Some(""));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn ids_assigned_monotonically_from_one() {
        let mut table = FileTable::new();
        let a = table.intern("/src/a.cc").unwrap();
        let b = table.intern("/src/b.cc").unwrap();
        assert_eq!(a, FileId::new(1));
        assert_eq!(b, FileId::new(2));
    }

    #[test]
    fn interning_is_stable() {
        let mut table = FileTable::new();
        let first = table.intern("/src/a.cc").unwrap();
        let second = table.intern("/src/a.cc").unwrap();
        assert_eq!(first, second);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn resolve_absent_file_uses_id_zero() {
        let mut table = FileTable::new();
        let loc = table.resolve(None, 3, 4, false).unwrap();
        assert_eq!(loc.file_id(), FileId::UNKNOWN);
        assert_eq!(loc.line(), 3);
        assert_eq!(loc.column(), 4);
    }

    #[test]
    fn resolve_interns_and_packs() {
        let mut table = FileTable::new();
        let loc = table.resolve(Some("/src/a.cc"), 10, 2, true).unwrap();
        assert_eq!(loc.file_id(), FileId::new(1));
        assert!(loc.interesting());
        assert_eq!(table.path(loc.file_id()), Some("/src/a.cc"));
    }

    #[test]
    fn resolve_overflowing_line_fails() {
        let mut table = FileTable::new();
        let err = table.resolve(Some("/src/a.cc"), u32::MAX, 0, false);
        assert!(matches!(err, Err(IndexError::CapacityExceeded(_))));
    }

    #[test]
    fn serde_roundtrips_as_path_array() {
        let mut table = FileTable::new();
        table.intern("/src/a.cc").unwrap();
        table.intern("/src/b.cc").unwrap();

        let json = serde_json::to_string(&table).unwrap();
        assert_eq!(json, r#"["","/src/a.cc","/src/b.cc"]"#);

        let back: FileTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
        assert_eq!(back.lookup("/src/b.cc"), Some(FileId::new(2)));
    }
}
