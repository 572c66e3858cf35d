//! Bit-packed source locations.
//!
//! A `Location` packs an "interesting" flag, a file id, a line, and a column
//! into a single `u64`. Interesting locations are semantically load-bearing
//! references (declarations, definitions, direct calls) that consumers want
//! to highlight; incidental tokens are not interesting. Equality and hashing
//! ignore the interesting bit so that usage lists deduplicate by position.

use crate::files::FileId;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use symdex_core::IndexError;

const INTERESTING_SHIFT: u64 = 0;
const FILE_ID_SHIFT: u64 = 1;
const LINE_SHIFT: u64 = 30;
const COLUMN_SHIFT: u64 = 50;

/// Largest file id a `Location` can carry (29 bits).
pub const FILE_ID_MAX: u32 = (1 << 29) - 1;
/// Largest line number a `Location` can carry (20 bits).
pub const LINE_MAX: u32 = (1 << 20) - 1;
/// Largest column number a `Location` can carry (14 bits).
pub const COLUMN_MAX: u32 = (1 << 14) - 1;

/// A compact source location.
///
/// Textual form is `<file_id>:<line>:<column>`, prefixed with `*` when the
/// location is interesting, e.g. `*1:2:3`.
#[derive(Clone, Copy)]
pub struct Location {
    raw: u64,
}

impl Location {
    /// Pack a location. Asserts that each field fits its bit width; use
    /// [`Location::checked`] for the fallible path.
    pub fn new(interesting: bool, file_id: FileId, line: u32, column: u32) -> Self {
        assert!(file_id.raw() <= FILE_ID_MAX, "file id out of range");
        assert!(line <= LINE_MAX, "line out of range");
        assert!(column <= COLUMN_MAX, "column out of range");
        let raw = (u64::from(interesting) << INTERESTING_SHIFT)
            | (u64::from(file_id.raw()) << FILE_ID_SHIFT)
            | (u64::from(line) << LINE_SHIFT)
            | (u64::from(column) << COLUMN_SHIFT);
        Self { raw }
    }

    /// Pack a location, failing with `CapacityExceeded` when a field would
    /// overflow its bit width.
    pub fn checked(
        interesting: bool,
        file_id: FileId,
        line: u32,
        column: u32,
    ) -> Result<Self, IndexError> {
        if file_id.raw() > FILE_ID_MAX {
            return Err(IndexError::CapacityExceeded(format!(
                "file id {} exceeds {}",
                file_id.raw(),
                FILE_ID_MAX
            )));
        }
        if line > LINE_MAX {
            return Err(IndexError::CapacityExceeded(format!(
                "line {line} exceeds {LINE_MAX}"
            )));
        }
        if column > COLUMN_MAX {
            return Err(IndexError::CapacityExceeded(format!(
                "column {column} exceeds {COLUMN_MAX}"
            )));
        }
        Ok(Self::new(interesting, file_id, line, column))
    }

    pub fn interesting(&self) -> bool {
        (self.raw >> INTERESTING_SHIFT) & 1 != 0
    }

    pub fn file_id(&self) -> FileId {
        FileId::new(((self.raw >> FILE_ID_SHIFT) & u64::from(FILE_ID_MAX)) as u32)
    }

    pub fn line(&self) -> u32 {
        ((self.raw >> LINE_SHIFT) & u64::from(LINE_MAX)) as u32
    }

    pub fn column(&self) -> u32 {
        ((self.raw >> COLUMN_SHIFT) & u64::from(COLUMN_MAX)) as u32
    }

    /// Returns a copy with the interesting bit set to `interesting`.
    pub fn with_interesting(&self, interesting: bool) -> Self {
        let raw = (self.raw & !1) | u64::from(interesting);
        Self { raw }
    }

    /// Position comparison that ignores the interesting bit. This is the
    /// same relation as `==`; the explicit name exists for call sites where
    /// the masking matters.
    pub fn equals_ignoring_interesting(&self, other: &Location) -> bool {
        self == other
    }
}

// Equality, ordering, and hashing all ignore the interesting bit.

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        (self.raw >> 1) == (other.raw >> 1)
    }
}

impl Eq for Location {}

impl std::hash::Hash for Location {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (self.raw >> 1).hash(state);
    }
}

impl Ord for Location {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.file_id(), self.line(), self.column()).cmp(&(
            other.file_id(),
            other.line(),
            other.column(),
        ))
    }
}

impl PartialOrd for Location {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.interesting() {
            write!(f, "*")?;
        }
        write!(
            f,
            "{}:{}:{}",
            self.file_id().raw(),
            self.line(),
            self.column()
        )
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Location({self})")
    }
}

impl FromStr for Location {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || IndexError::InvariantViolated(format!("malformed location `{s}`"));
        let (interesting, rest) = match s.strip_prefix('*') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let mut parts = rest.splitn(3, ':');
        let file_id: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        let line: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        let column: u32 = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        Location::checked(interesting, FileId::new(file_id), line, column)
    }
}

impl Serialize for Location {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Location {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_unpack() {
        let loc = Location::new(true, FileId::new(7), 120, 14);
        assert!(loc.interesting());
        assert_eq!(loc.file_id(), FileId::new(7));
        assert_eq!(loc.line(), 120);
        assert_eq!(loc.column(), 14);
    }

    #[test]
    fn max_values_fit() {
        let loc = Location::new(false, FileId::new(FILE_ID_MAX), LINE_MAX, COLUMN_MAX);
        assert_eq!(loc.file_id().raw(), FILE_ID_MAX);
        assert_eq!(loc.line(), LINE_MAX);
        assert_eq!(loc.column(), COLUMN_MAX);
    }

    #[test]
    fn checked_rejects_overflow() {
        let err = Location::checked(false, FileId::new(0), LINE_MAX + 1, 0);
        assert!(matches!(err, Err(IndexError::CapacityExceeded(_))));
        let err = Location::checked(false, FileId::new(0), 0, COLUMN_MAX + 1);
        assert!(matches!(err, Err(IndexError::CapacityExceeded(_))));
    }

    #[test]
    fn equality_ignores_interesting() {
        let a = Location::new(true, FileId::new(1), 2, 3);
        let b = Location::new(false, FileId::new(1), 2, 3);
        assert_eq!(a, b);
        assert!(a.equals_ignoring_interesting(&b));
        let c = Location::new(true, FileId::new(1), 2, 4);
        assert_ne!(a, c);
    }

    #[test]
    fn ordering_is_lexicographic() {
        let a = Location::new(false, FileId::new(1), 10, 5);
        let b = Location::new(false, FileId::new(1), 10, 6);
        let c = Location::new(false, FileId::new(1), 11, 1);
        let d = Location::new(false, FileId::new(2), 1, 1);
        assert!(a < b);
        assert!(b < c);
        assert!(c < d);
    }

    #[test]
    fn with_interesting_is_pure() {
        let a = Location::new(false, FileId::new(1), 2, 3);
        let b = a.with_interesting(true);
        assert!(!a.interesting());
        assert!(b.interesting());
        assert_eq!(a, b);
    }

    #[test]
    fn to_string_form() {
        let plain = Location::new(false, FileId::new(1), 2, 3);
        assert_eq!(plain.to_string(), "1:2:3");
        let interesting = plain.with_interesting(true);
        assert_eq!(interesting.to_string(), "*1:2:3");
    }

    #[test]
    fn string_roundtrip() {
        for loc in [
            Location::new(false, FileId::new(0), 0, 0),
            Location::new(true, FileId::new(12), 1024, 80),
            Location::new(false, FileId::new(FILE_ID_MAX), LINE_MAX, COLUMN_MAX),
        ] {
            let parsed: Location = loc.to_string().parse().expect("parse back");
            assert_eq!(parsed, loc);
            assert_eq!(parsed.interesting(), loc.interesting());
        }
    }

    #[test]
    fn malformed_strings_rejected() {
        assert!("".parse::<Location>().is_err());
        assert!("1:2".parse::<Location>().is_err());
        assert!("x:y:z".parse::<Location>().is_err());
        assert!("*".parse::<Location>().is_err());
    }

    #[test]
    fn serde_uses_string_form() {
        let loc = Location::new(true, FileId::new(3), 4, 5);
        let json = serde_json::to_string(&loc).unwrap();
        assert_eq!(json, "\"*3:4:5\"");
        let back: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc);
        assert!(back.interesting());
    }
}
