//! In-memory suspect registry.
//!
//! Maps a caller-supplied suspect ID to one face embedding. Entries are
//! only ever added or overwritten (last write wins); nothing is persisted,
//! evicted or capped, so the registry grows with every new ID until the
//! process exits. A single `RwLock` guards every access.

use crate::types::{DistanceMatcher, Embedding, SuspectMatch};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct SuspectRegistry {
    entries: RwLock<HashMap<String, Embedding>>,
}

impl SuspectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `embedding` under `suspect_id`, returning the embedding it replaced.
    pub fn register(&self, suspect_id: impl Into<String>, embedding: Embedding) -> Option<Embedding> {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(suspect_id.into(), embedding)
    }

    pub fn get(&self, suspect_id: &str) -> Option<Embedding> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(suspect_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rank every registered suspect against `probe`.
    pub fn rank(&self, probe: &Embedding, matcher: &DistanceMatcher) -> Vec<SuspectMatch> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        matcher.rank(probe, entries.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emb(values: &[f32]) -> Embedding {
        Embedding::new(values.to_vec())
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = SuspectRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_register_twice_keeps_last() {
        let registry = SuspectRegistry::new();
        assert!(registry.register("A", emb(&[1.0, 0.0])).is_none());
        let replaced = registry.register("A", emb(&[0.0, 1.0]));

        assert_eq!(replaced, Some(emb(&[1.0, 0.0])));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("A"), Some(emb(&[0.0, 1.0])));
    }

    #[test]
    fn test_rank_uses_registered_entries() {
        let registry = SuspectRegistry::new();
        registry.register("near", emb(&[1.0, 0.1]));
        registry.register("far", emb(&[0.0, 1.0]));

        let matches = registry.rank(&emb(&[1.0, 0.0]), &DistanceMatcher::default());
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].suspect_id, "near");
    }

    #[test]
    fn test_rank_empty_registry() {
        let matches = SuspectRegistry::new().rank(&emb(&[0.0]), &DistanceMatcher::default());
        assert!(matches.is_empty());
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = std::sync::Arc::new(SuspectRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        registry.register(format!("{t}-{i}"), emb(&[i as f32]));
                        let _ = registry.rank(&emb(&[0.0]), &DistanceMatcher::default());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.len(), 400);
    }
}
