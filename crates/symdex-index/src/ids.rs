//! Typed per-file entity handles.
//!
//! Entity records live in append-only vectors, one per kind, and refer to
//! each other by `LocalId<K>`: a zero-based index into the corresponding
//! vector of the owning `IndexedFile`. This keeps the cyclic relationship
//! graph (parents/derived, callees/callers) free of ownership cycles and
//! makes serialization trivial. There is no null id; absence is represented
//! by the containing field being unset.

use crate::location::Location;
use crate::records::{IndexedFunc, IndexedType, IndexedVar};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Typed index into one of the record vectors of an `IndexedFile`. Only
/// meaningful inside the file that produced it; the cross-file merger
/// rewrites ids when joining into the global database.
pub struct LocalId<K> {
    raw: u32,
    _kind: PhantomData<fn() -> K>,
}

pub type TypeId = LocalId<IndexedType>;
pub type FuncId = LocalId<IndexedFunc>;
pub type VarId = LocalId<IndexedVar>;

impl<K> LocalId<K> {
    pub fn new(raw: u32) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    pub fn from_index(index: usize) -> Self {
        Self::new(index as u32)
    }

    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// Position in the owning record vector.
    pub fn index(&self) -> usize {
        self.raw as usize
    }
}

// Manual impls: the derives would bound on `K`, which is only a marker.

impl<K> Clone for LocalId<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for LocalId<K> {}

impl<K> PartialEq for LocalId<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K> Eq for LocalId<K> {}

impl<K> PartialOrd for LocalId<K> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for LocalId<K> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.raw.cmp(&other.raw)
    }
}

impl<K> Hash for LocalId<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K> fmt::Debug for LocalId<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalId({})", self.raw)
    }
}

impl<K> Serialize for LocalId<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.raw)
    }
}

impl<'de, K> Deserialize<'de> for LocalId<K> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::new)
    }
}

/// A (handle, location) reference: which entity, and where in the source.
#[derive(Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Ref<K> {
    pub id: LocalId<K>,
    pub loc: Location,
}

pub type TypeRef = Ref<IndexedType>;
pub type FuncRef = Ref<IndexedFunc>;
pub type VarRef = Ref<IndexedVar>;

impl<K> Ref<K> {
    pub fn new(id: LocalId<K>, loc: Location) -> Self {
        Self { id, loc }
    }
}

impl<K> Clone for Ref<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Ref<K> {}

impl<K> PartialEq for Ref<K> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.loc == other.loc
    }
}

impl<K> Eq for Ref<K> {}

impl<K> fmt::Debug for Ref<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ref({} @ {})", self.id.raw, self.loc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileId;

    #[test]
    fn zero_is_a_valid_id() {
        let id: TypeId = LocalId::new(0);
        assert_eq!(id.index(), 0);
    }

    #[test]
    fn ids_of_same_kind_compare_by_value() {
        let a: FuncId = LocalId::new(3);
        let b: FuncId = LocalId::from_index(3);
        let c: FuncId = LocalId::new(4);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a < c);
    }

    #[test]
    fn serde_is_transparent() {
        let id: VarId = LocalId::new(17);
        assert_eq!(serde_json::to_string(&id).unwrap(), "17");
        let back: VarId = serde_json::from_str("17").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn ref_pairs_id_and_location() {
        let loc = Location::new(true, FileId::new(1), 2, 3);
        let r: FuncRef = Ref::new(LocalId::new(5), loc);
        assert_eq!(r.id, LocalId::new(5));
        assert_eq!(r.loc, loc);

        let json = serde_json::to_string(&r).unwrap();
        let back: FuncRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
