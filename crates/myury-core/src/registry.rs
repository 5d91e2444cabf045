//! The metadata key registry: key name → [`MetadataKey`], loaded in bulk on
//! first use and served from memory afterwards.

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;

use crate::{Error, metadata::MetadataKey, store::KeySource};

/// Lookup tables built from one bulk load of the key table.
#[derive(Debug, Default)]
struct KeyIndex {
  by_name: HashMap<String, MetadataKey>,
  by_id:   HashMap<i64, MetadataKey>,
}

impl KeyIndex {
  fn build(keys: Vec<MetadataKey>) -> Self {
    let mut index = Self::default();
    for key in keys {
      index.by_id.insert(key.id, key.clone());
      index.by_name.insert(key.name.clone(), key);
    }
    index
  }
}

enum RegistryState {
  Unloaded,
  Loaded(Arc<KeyIndex>),
}

/// Cached registry of metadata keys.
///
/// Constructed once per process and shared. The first lookup loads every key
/// under the write lock; concurrent first lookups wait for that load instead
/// of issuing their own.
pub struct KeyRegistry<K> {
  source: Arc<K>,
  state:  RwLock<RegistryState>,
}

impl<K: KeySource> KeyRegistry<K> {
  pub fn new(source: Arc<K>) -> Self {
    Self { source, state: RwLock::new(RegistryState::Unloaded) }
  }

  async fn index(&self) -> Result<Arc<KeyIndex>, K::Error> {
    if let RegistryState::Loaded(index) = &*self.state.read().await {
      return Ok(Arc::clone(index));
    }

    let mut state = self.state.write().await;
    if let RegistryState::Loaded(index) = &*state {
      return Ok(Arc::clone(index));
    }

    let keys = self.source.load_metadata_keys().await?;
    tracing::debug!(count = keys.len(), "loaded metadata keys");
    let index = Arc::new(KeyIndex::build(keys));
    *state = RegistryState::Loaded(Arc::clone(&index));
    Ok(index)
  }

  /// The key registered under `name`.
  pub async fn key(&self, name: &str) -> Result<MetadataKey, K::Error> {
    self
      .index()
      .await?
      .by_name
      .get(name)
      .cloned()
      .ok_or_else(|| Error::UnknownKey(name.to_owned()).into())
  }

  /// The id of the key registered under `name`.
  pub async fn resolve(&self, name: &str) -> Result<i64, K::Error> {
    Ok(self.key(name).await?.id)
  }

  /// Whether the key with `id` allows several active values per owner.
  pub async fn allows_multiple(&self, id: i64) -> Result<bool, K::Error> {
    self
      .index()
      .await?
      .by_id
      .get(&id)
      .map(|k| k.allows_multiple)
      .ok_or_else(|| Error::UnknownKeyId(id).into())
  }

  /// The key with `id`.
  pub async fn key_by_id(&self, id: i64) -> Result<MetadataKey, K::Error> {
    self
      .index()
      .await?
      .by_id
      .get(&id)
      .cloned()
      .ok_or_else(|| Error::UnknownKeyId(id).into())
  }

  /// Every registered key, ordered by id.
  pub async fn keys(&self) -> Result<Vec<MetadataKey>, K::Error> {
    let mut keys: Vec<_> = self.index().await?.by_id.values().cloned().collect();
    keys.sort_by_key(|k| k.id);
    Ok(keys)
  }

  /// Drop the cached keys; the next lookup reloads them.
  pub async fn invalidate(&self) {
    *self.state.write().await = RegistryState::Unloaded;
  }

  pub async fn is_loaded(&self) -> bool {
    matches!(&*self.state.read().await, RegistryState::Loaded(_))
  }
}
