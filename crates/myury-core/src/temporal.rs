//! [`TemporalMetadata`] — versioned metadata reads and writes for owners.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
  metadata::{
    EffectiveRange, MetadataInput, MetadataValue, OwnerMetadata, OwnerRef,
    WriteRequest,
  },
  registry::KeyRegistry,
  store::SchedulerStore,
};

/// Resolves key names through a shared [`KeyRegistry`] and applies versioned
/// writes through a [`SchedulerStore`].
pub struct TemporalMetadata<S> {
  store:    Arc<S>,
  registry: Arc<KeyRegistry<S>>,
}

impl<S: SchedulerStore> TemporalMetadata<S> {
  pub fn new(store: Arc<S>, registry: Arc<KeyRegistry<S>>) -> Self {
    Self { store, registry }
  }

  pub fn registry(&self) -> &KeyRegistry<S> { &self.registry }

  /// Build the in-memory mirror of every open row for `owner`.
  pub async fn load(&self, owner: OwnerRef) -> Result<OwnerMetadata, S::Error> {
    let rows = self.store.open_metadata(owner, None).await?;
    Ok(OwnerMetadata::from_rows(owner, rows))
  }

  /// Set `key_name` on the owner of `meta` to `input`, acting as `actor_id`.
  ///
  /// Returns `false` without writing anything if every supplied value is
  /// already active. On success `meta` reflects the post-write state.
  pub async fn set_value(
    &self,
    meta: &mut OwnerMetadata,
    key_name: &str,
    input: MetadataInput,
    range: EffectiveRange,
    actor_id: i64,
  ) -> Result<bool, S::Error> {
    let key = self.registry.key(key_name).await?;
    let key_id = key.id;
    let request = WriteRequest::new(key, meta.owner, input, range, actor_id)?;

    let outcome = self.store.set_metadata(request).await?;

    if outcome.changed {
      tracing::info!(
        owner = %meta.owner.kind,
        owner_id = meta.owner.id,
        key = key_name,
        actor_id,
        "metadata updated"
      );
    } else {
      tracing::debug!(key = key_name, "metadata unchanged");
    }

    meta.replace(key_id, outcome.current);
    Ok(outcome.changed)
  }

  /// The first active value of `key_name`, if any. For single-value keys this
  /// is the value.
  pub async fn get_value(
    &self,
    meta: &OwnerMetadata,
    key_name: &str,
  ) -> Result<Option<String>, S::Error> {
    Ok(self.get_values(meta, key_name).await?.into_iter().next())
  }

  /// Every active value of `key_name`, in insertion order.
  pub async fn get_values(
    &self,
    meta: &OwnerMetadata,
    key_name: &str,
  ) -> Result<Vec<String>, S::Error> {
    let key_id = self.registry.resolve(key_name).await?;
    Ok(meta.rows(key_id).iter().map(|r| r.value.clone()).collect())
  }

  /// The full audit trail for `key_name` on `owner`, oldest first.
  pub async fn history(
    &self,
    owner: OwnerRef,
    key_name: &str,
  ) -> Result<Vec<MetadataValue>, S::Error> {
    let key_id = self.registry.resolve(key_name).await?;
    self.store.metadata_history(owner, key_id).await
  }

  /// Rows of `key_name` on `owner` that were in effect at `at`.
  pub async fn values_at(
    &self,
    owner: OwnerRef,
    key_name: &str,
    at: DateTime<Utc>,
  ) -> Result<Vec<MetadataValue>, S::Error> {
    let key_id = self.registry.resolve(key_name).await?;
    self.store.metadata_at(owner, key_id, at).await
  }
}
