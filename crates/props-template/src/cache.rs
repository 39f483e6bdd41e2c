//! Fragment caching.
//!
//! A cached node is stored as the raw JSON text of its value together with
//! the deferred and fragment descriptors recorded while it rendered. A later
//! hit splices the text back verbatim and replays the descriptors, so the
//! output and the side lists are the same as if the node had rendered again.
use std::{
    collections::HashMap,
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;

use crate::{
    deferment::DeferredDescriptor, error::BoxError, fragment::FragmentDescriptor, value::Value,
};

type DeriveKey = dyn Fn(&Value) -> String + Send + Sync;

/// A cache key: a literal, or a function of the collection item being
/// rendered.
#[derive(Clone)]
pub enum CacheKey {
    Literal(String),
    Derived(Arc<DeriveKey>),
}

impl CacheKey {
    /// A key computed from each collection item.
    pub fn derive<F>(f: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Self::Derived(Arc::new(f))
    }

    /// Resolves a derived key against `item`.
    pub(crate) fn resolve(&self, item: &Value) -> Self {
        match self {
            Self::Literal(key) => Self::Literal(key.clone()),
            Self::Derived(f) => Self::Literal(f(item)),
        }
    }
}

impl fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(key) => f.debug_tuple("Literal").field(key).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

impl From<&str> for CacheKey {
    fn from(key: &str) -> Self {
        Self::Literal(key.to_owned())
    }
}

impl From<String> for CacheKey {
    fn from(key: String) -> Self {
        Self::Literal(key)
    }
}

/// Options forwarded to the store on write.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheOptions {
    /// Time after which the entry should no longer be served.
    pub expires_in: Option<Duration>,
}

/// The `cache` option of a node.
#[derive(Debug, Clone)]
pub struct Cache {
    pub(crate) key: CacheKey,
    pub(crate) options: CacheOptions,
}

impl Cache {
    pub fn new(key: impl Into<CacheKey>) -> Self {
        Self {
            key: key.into(),
            options: CacheOptions::default(),
        }
    }

    #[must_use]
    pub fn expires_in(mut self, ttl: Duration) -> Self {
        self.options.expires_in = Some(ttl);
        self
    }
}

impl From<CacheKey> for Cache {
    fn from(key: CacheKey) -> Self {
        Self::new(key)
    }
}

impl From<&str> for Cache {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for Cache {
    fn from(key: String) -> Self {
        Self::new(key)
    }
}

/// Prefixes `key` with the cache namespace.
pub(crate) fn expand_key(namespace: &str, key: &str) -> String {
    if namespace.is_empty() {
        key.to_owned()
    } else {
        format!("{namespace}/{key}")
    }
}

/// A stored node: its raw JSON and the descriptors recorded inside it.
#[cfg_attr(
    any(test, feature = "serde"),
    derive(serde::Serialize, serde::Deserialize)
)]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CacheEntry {
    pub raw_json: String,
    pub deferred: Vec<DeferredDescriptor>,
    pub fragments: Vec<FragmentDescriptor>,
}

#[cfg(any(test, feature = "serde"))]
impl CacheEntry {
    /// Encodes the entry as a one line JSON metadata header
    /// (`[deferred, fragments]`), a newline, and the raw JSON.
    ///
    /// # Errors
    ///
    /// Fails if the descriptors cannot be serialized.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        let mut out = serde_json::to_string(&(&self.deferred, &self.fragments))?;
        out.push('\n');
        out.push_str(&self.raw_json);
        Ok(out)
    }

    /// Decodes the format written by [`CacheEntry::encode`].
    ///
    /// # Errors
    ///
    /// Fails if the metadata header is not valid.
    pub fn decode(encoded: &str) -> Result<Self, serde_json::Error> {
        let (meta, raw) = encoded.split_once('\n').unwrap_or((encoded, ""));
        let (deferred, fragments) = serde_json::from_str(meta)?;
        Ok(Self {
            raw_json: raw.to_owned(),
            deferred,
            fragments,
        })
    }
}

/// Persistent storage for cached nodes.
///
/// Stores are shared across renders and threads. A miss followed by a write
/// may race with another writer; implementations only need to ensure the
/// stored entry is one of the complete values written.
pub trait CacheStore: Send + Sync {
    /// Reads one entry.
    ///
    /// # Errors
    ///
    /// Backend failures abort the render.
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, BoxError>;

    /// Writes one entry.
    ///
    /// # Errors
    ///
    /// Backend failures abort the render.
    fn put(&self, key: &str, entry: &CacheEntry, options: &CacheOptions) -> Result<(), BoxError>;

    /// Reads many entries in one round trip. Missing keys are absent from the
    /// result.
    ///
    /// # Errors
    ///
    /// Backend failures abort the render.
    fn get_many(&self, keys: &[String]) -> Result<HashMap<String, CacheEntry>, BoxError> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = self.get(key)? {
                found.insert(key.clone(), entry);
            }
        }
        Ok(found)
    }
}

/// A store that never holds anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStore;

impl CacheStore for NullStore {
    fn get(&self, _key: &str) -> Result<Option<CacheEntry>, BoxError> {
        Ok(None)
    }

    fn put(&self, _key: &str, _entry: &CacheEntry, _options: &CacheOptions) -> Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Debug)]
struct Stored {
    entry: CacheEntry,
    expires_at: Option<Instant>,
}

impl Stored {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// An in-process concurrent store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Stored>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<CacheEntry>, BoxError> {
        let now = Instant::now();
        let live = self
            .entries
            .get(key)
            .map(|stored| stored.is_live(now).then(|| stored.entry.clone()));
        match live {
            Some(Some(entry)) => Ok(Some(entry)),
            Some(None) => {
                self.entries.remove_if(key, |_, stored| !stored.is_live(now));
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, entry: &CacheEntry, options: &CacheOptions) -> Result<(), BoxError> {
        let expires_at = options.expires_in.map(|ttl| Instant::now() + ttl);
        self.entries.insert(
            key.to_owned(),
            Stored {
                entry: entry.clone(),
                expires_at,
            },
        );
        Ok(())
    }
}
