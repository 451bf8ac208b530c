//! Corpus key resolution
//!
//! The indexer never interprets sequence keys itself. Key semantics live
//! behind the [`Corpus`] trait: the corpus declares whether keys are decimal
//! numbers or symbolic tokens, and resolves symbolic tokens to numeric ids.
//! [`KeyRegistry`] is the provided implementation, a thread-safe interner
//! that assigns dense ids in first-seen order.

use std::collections::HashMap;

use auto_impl::auto_impl;
use parking_lot::Mutex;

/// Key semantics of a corpus, as consumed by an indexing pass
///
/// Implementations must be cheap to query: [`key_to_id`] is called once per
/// sequence boundary candidate while scanning.
///
/// [`key_to_id`]: Corpus::key_to_id
#[auto_impl(&, Box, Arc)]
pub trait Corpus {
    /// Returns `true` when sequence keys are decimal numbers that map to
    /// themselves, and `false` when they are symbolic tokens that need
    /// resolution
    fn is_numeric_keys(&self) -> bool;

    /// Resolves a symbolic key to its numeric id
    ///
    /// Resolution is infallible: a registry-style corpus interns unseen keys
    /// on first use rather than rejecting them.
    fn key_to_id(&self, key: &str) -> u64;
}

/// A thread-safe registry mapping symbolic keys to dense numeric ids
///
/// Ids are assigned in first-seen order starting from zero, and the reverse
/// mapping is retained so diagnostics can recover the original key.
pub struct KeyRegistry {
    /// Whether keys are decimal numbers rather than registry tokens
    numeric: bool,

    /// Forward and reverse key mappings
    inner: Mutex<Registry>,
}

#[derive(Default)]
struct Registry {
    /// Key to id mapping
    ids: HashMap<String, u64>,

    /// Id to key mapping; the id is the position
    keys: Vec<String>,
}

impl KeyRegistry {
    /// Creates a registry for a corpus whose keys are decimal numbers
    ///
    /// Numeric keys map to themselves, so the registry stays empty unless
    /// [`key_to_id`] is called directly.
    ///
    /// [`key_to_id`]: Corpus::key_to_id
    #[must_use]
    pub fn numeric() -> Self {
        Self {
            numeric: true,
            inner: Mutex::default(),
        }
    }

    /// Creates a registry for a corpus whose keys are symbolic tokens
    #[must_use]
    pub fn symbolic() -> Self {
        Self {
            numeric: false,
            inner: Mutex::default(),
        }
    }

    /// Returns the number of distinct keys interned so far
    #[must_use]
    pub fn num_keys(&self) -> usize {
        self.inner.lock().keys.len()
    }

    /// Returns the key that was assigned the given id
    ///
    /// Returns `None` if no key has been assigned that id.
    #[must_use]
    pub fn key_of(&self, id: u64) -> Option<String> {
        let inner = self.inner.lock();
        usize::try_from(id)
            .ok()
            .and_then(|idx| inner.keys.get(idx).cloned())
    }
}

impl Corpus for KeyRegistry {
    fn is_numeric_keys(&self) -> bool {
        self.numeric
    }

    fn key_to_id(&self, key: &str) -> u64 {
        let mut inner = self.inner.lock();
        if let Some(&id) = inner.ids.get(key) {
            return id;
        }
        let id = inner.keys.len() as u64;
        inner.ids.insert(key.to_owned(), id);
        inner.keys.push(key.to_owned());
        id
    }
}

#[cfg(test)]
mod testing {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_registry_assigns_dense_ids_in_first_seen_order() {
        let registry = KeyRegistry::symbolic();
        assert_eq!(registry.key_to_id("utt-b"), 0);
        assert_eq!(registry.key_to_id("utt-a"), 1);
        assert_eq!(registry.key_to_id("utt-b"), 0);
        assert_eq!(registry.key_to_id("utt-c"), 2);
        assert_eq!(registry.num_keys(), 3);
    }

    #[test]
    fn test_registry_recovers_keys_by_id() {
        let registry = KeyRegistry::symbolic();
        registry.key_to_id("speaker/003");
        registry.key_to_id("speaker/001");
        assert_eq!(registry.key_of(0).as_deref(), Some("speaker/003"));
        assert_eq!(registry.key_of(1).as_deref(), Some("speaker/001"));
        assert_eq!(registry.key_of(2), None);
    }

    #[test]
    fn test_key_mode_flags() {
        assert!(KeyRegistry::numeric().is_numeric_keys());
        assert!(!KeyRegistry::symbolic().is_numeric_keys());
    }

    #[test]
    fn test_registry_shared_across_threads() {
        let registry = Arc::new(KeyRegistry::symbolic());
        let mut handles = Vec::new();
        for _ in 0..4 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..64 {
                    registry.key_to_id(&format!("key-{i}"));
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.num_keys(), 64);
        for i in 0..64 {
            let id = registry.key_to_id(&format!("key-{i}"));
            assert_eq!(registry.key_of(id).as_deref(), Some(format!("key-{i}").as_str()));
        }
    }
}
