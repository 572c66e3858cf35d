//! SHA-256 based change detection for incremental indexing.
//!
//! Tracks content hashes of previously indexed translation units so
//! unchanged units can be skipped on subsequent indexing runs. The unit of
//! change is the whole file; no intra-file deltas are tracked.

use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Tracks file content hashes for incremental change detection.
pub struct ChangeDetector {
    /// Map of file_path -> SHA-256 hex hash from last index run.
    known_hashes: HashMap<String, String>,
}

impl ChangeDetector {
    /// Create a new empty ChangeDetector.
    pub fn new() -> Self {
        Self {
            known_hashes: HashMap::new(),
        }
    }

    /// Check if a file has changed since the last index.
    /// Returns `true` if the file is new or its content hash differs.
    pub fn is_changed(&self, path: &str, content: &[u8]) -> bool {
        let hash = Self::hash_content(content);
        self.known_hashes.get(path) != Some(&hash)
    }

    /// Update the stored hash for a file after successful indexing.
    pub fn update_hash(&mut self, path: &str, content: &[u8]) {
        let hash = Self::hash_content(content);
        self.known_hashes.insert(path.to_string(), hash);
    }

    /// Remove the hash for a file (e.g., when it's deleted).
    pub fn remove_hash(&mut self, path: &str) {
        self.known_hashes.remove(path);
    }

    /// Get the number of tracked files.
    pub fn tracked_count(&self) -> usize {
        self.known_hashes.len()
    }

    /// Compute SHA-256 hash of content bytes.
    fn hash_content(content: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content);
        format!("{:x}", hasher.finalize())
    }
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_file_is_changed() {
        let detector = ChangeDetector::new();
        assert!(detector.is_changed("foo.cc", b"int main() {}"));
    }

    #[test]
    fn same_content_not_changed() {
        let mut detector = ChangeDetector::new();
        let content = b"int main() {}";
        detector.update_hash("foo.cc", content);
        assert!(!detector.is_changed("foo.cc", content));
    }

    #[test]
    fn different_content_is_changed() {
        let mut detector = ChangeDetector::new();
        detector.update_hash("foo.cc", b"int main() {}");
        assert!(detector.is_changed("foo.cc", b"int main() { return 1; }"));
    }

    #[test]
    fn remove_hash_makes_changed() {
        let mut detector = ChangeDetector::new();
        detector.update_hash("foo.cc", b"content");
        assert!(!detector.is_changed("foo.cc", b"content"));
        detector.remove_hash("foo.cc");
        assert!(detector.is_changed("foo.cc", b"content"));
    }

    #[test]
    fn tracked_count() {
        let mut detector = ChangeDetector::new();
        assert_eq!(detector.tracked_count(), 0);
        detector.update_hash("a.cc", b"a");
        detector.update_hash("b.cc", b"b");
        assert_eq!(detector.tracked_count(), 2);
    }
}
