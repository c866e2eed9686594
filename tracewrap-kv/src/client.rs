//! The wrapped capability: a synchronous key-value client.
//!
//! The client is modeled as a trait so that the tracing layer can decorate
//! it by composition rather than by inheriting from a concrete type. The
//! operations deliberately cover the argument shapes a tracer has to render:
//! string keys, raw byte keys and values, key lists, and field maps.

use indexmap::IndexMap;
use std::sync::Mutex;
use thiserror::Error;

/// Failures a key-value operation may declare.
#[derive(Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum KvError {
    /// The requested key does not exist.
    #[error("key {key} not found")]
    NotFound {
        /// The missing key.
        key: String,
    },

    /// The operation did not complete in time.
    #[error("operation timed out")]
    Timeout,

    /// The connection to the store failed.
    #[error("connection error: {0}")]
    Connection(String),
}

/// A synchronous key-value client.
///
/// All operations are blocking and return `Result`; the declared failure
/// kind is [`KvError`]. Implementations must not panic on absent keys;
/// absence is either `NotFound` or an operation-specific count.
pub trait KvClient {
    /// Fetches the value stored under `key`.
    fn get(&self, key: &str) -> Result<String, KvError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), KvError>;

    /// Removes `key`. Returns whether the key existed.
    fn del(&self, key: &str) -> Result<bool, KvError>;

    /// Removes every key in `keys`. Returns how many existed.
    fn del_many(&self, keys: &[String]) -> Result<usize, KvError>;

    /// Fetches several keys at once; missing keys yield `None`.
    fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, KvError>;

    /// Fetches the raw value stored under a binary key.
    fn get_bytes(&self, key: &[u8]) -> Result<Vec<u8>, KvError>;

    /// Stores a raw value under a binary key.
    fn set_bytes(&self, key: &[u8], value: &[u8]) -> Result<(), KvError>;

    /// Replaces all fields of the hash stored under `key`.
    fn hash_set_all(&self, key: &str, fields: &IndexMap<String, String>) -> Result<(), KvError>;

    /// Fetches all fields of the hash stored under `key`, in insertion
    /// order.
    fn hash_get_all(&self, key: &str) -> Result<IndexMap<String, String>, KvError>;
}

#[derive(Debug, Default)]
struct KvState {
    strings: IndexMap<String, String>,
    blobs: IndexMap<Vec<u8>, Vec<u8>>,
    hashes: IndexMap<String, IndexMap<String, String>>,
}

/// A [`KvClient`] backed by process memory.
///
/// Used by tests and demos; it has no connection to drop, so its only
/// failure modes are `NotFound` and a poisoned state lock.
#[derive(Debug, Default)]
pub struct InMemoryKv {
    state: Mutex<KvState>,
}

impl InMemoryKv {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut KvState) -> Result<T, KvError>) -> Result<T, KvError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| KvError::Connection("state lock poisoned".into()))?;
        f(&mut state)
    }
}

impl KvClient for InMemoryKv {
    fn get(&self, key: &str) -> Result<String, KvError> {
        self.with_state(|state| {
            state
                .strings
                .get(key)
                .cloned()
                .ok_or_else(|| KvError::NotFound { key: key.into() })
        })
    }

    fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        self.with_state(|state| {
            state.strings.insert(key.into(), value.into());
            Ok(())
        })
    }

    fn del(&self, key: &str) -> Result<bool, KvError> {
        self.with_state(|state| Ok(state.strings.shift_remove(key).is_some()))
    }

    fn del_many(&self, keys: &[String]) -> Result<usize, KvError> {
        self.with_state(|state| {
            Ok(keys
                .iter()
                .filter(|key| state.strings.shift_remove(key.as_str()).is_some())
                .count())
        })
    }

    fn mget(&self, keys: &[String]) -> Result<Vec<Option<String>>, KvError> {
        self.with_state(|state| {
            Ok(keys
                .iter()
                .map(|key| state.strings.get(key.as_str()).cloned())
                .collect())
        })
    }

    fn get_bytes(&self, key: &[u8]) -> Result<Vec<u8>, KvError> {
        self.with_state(|state| {
            state.blobs.get(key).cloned().ok_or_else(|| KvError::NotFound {
                key: tracewrap::tags::bytes(Some(key)),
            })
        })
    }

    fn set_bytes(&self, key: &[u8], value: &[u8]) -> Result<(), KvError> {
        self.with_state(|state| {
            state.blobs.insert(key.to_vec(), value.to_vec());
            Ok(())
        })
    }

    fn hash_set_all(&self, key: &str, fields: &IndexMap<String, String>) -> Result<(), KvError> {
        self.with_state(|state| {
            state.hashes.insert(key.into(), fields.clone());
            Ok(())
        })
    }

    fn hash_get_all(&self, key: &str) -> Result<IndexMap<String, String>, KvError> {
        self.with_state(|state| {
            state
                .hashes
                .get(key)
                .cloned()
                .ok_or_else(|| KvError::NotFound { key: key.into() })
        })
    }
}
