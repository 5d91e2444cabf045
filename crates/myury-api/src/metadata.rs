//! Handlers for `/owners/{kind}/{id}/metadata` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/owners/:kind/:id/metadata` | `{key name: [active values]}` |
//! | `GET`  | `/owners/:kind/:id/metadata/:key` | Optional `as_of` or `history=true` |
//! | `PUT`  | `/owners/:kind/:id/metadata/:key` | Body: [`SetBody`] |
//!
//! `kind` is one of `show`, `season` or `timeslot`.

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use myury_core::{
  metadata::{EffectiveRange, MetadataInput, MetadataValue, OwnerKind, OwnerRef},
  store::SchedulerStore,
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /owners/:kind/:id/metadata`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  Path((kind, id)): Path<(OwnerKind, i64)>,
) -> Result<Json<BTreeMap<String, Vec<String>>>, ApiError>
where
  S: SchedulerStore,
{
  let meta = state
    .metadata
    .load(OwnerRef::new(kind, id))
    .await
    .map_err(ApiError::from_store)?;

  let mut out = BTreeMap::new();
  for key_id in meta.key_ids() {
    let key = state
      .metadata
      .registry()
      .key_by_id(key_id)
      .await
      .map_err(ApiError::from_store)?;
    let values = meta.rows(key_id).iter().map(|r| r.value.clone()).collect();
    out.insert(key.name, values);
  }
  Ok(Json(out))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GetParams {
  /// Return the rows in effect at this instant instead of the open rows.
  pub as_of:   Option<DateTime<Utc>>,
  /// Return every row ever written. Takes precedence over `as_of`.
  #[serde(default)]
  pub history: bool,
}

/// `GET /owners/:kind/:id/metadata/:key[?as_of=...][&history=true]`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  Path((kind, id, key)): Path<(OwnerKind, i64, String)>,
  Query(params): Query<GetParams>,
) -> Result<Json<Vec<MetadataValue>>, ApiError>
where
  S: SchedulerStore,
{
  let owner = OwnerRef::new(kind, id);
  let svc = &state.metadata;

  let rows = match (params.history, params.as_of) {
    (true, _) => svc.history(owner, &key).await,
    (false, Some(at)) => svc.values_at(owner, &key, at).await,
    (false, None) => {
      let key_id = svc
        .registry()
        .resolve(&key)
        .await
        .map_err(ApiError::from_store)?;
      state.store.open_metadata(owner, Some(key_id)).await
    }
  };

  Ok(Json(rows.map_err(ApiError::from_store)?))
}

// ─── Set ──────────────────────────────────────────────────────────────────────

/// Body for `PUT /owners/:kind/:id/metadata/:key`.
#[derive(Debug, Deserialize)]
pub struct SetBody {
  /// A string, or an array of strings for keys allowing multiple values.
  pub value:          MetadataInput,
  /// Defaults to now.
  pub effective_from: Option<DateTime<Utc>>,
  pub effective_to:   Option<DateTime<Utc>>,
  /// Member recorded as settor and approver.
  pub actor_id:       i64,
}

#[derive(Debug, Serialize)]
pub struct SetResponse {
  pub changed: bool,
  /// Active values after the write.
  pub values:  Vec<String>,
}

/// `PUT /owners/:kind/:id/metadata/:key`
pub async fn set_one<S>(
  State(state): State<ApiState<S>>,
  Path((kind, id, key)): Path<(OwnerKind, i64, String)>,
  Json(body): Json<SetBody>,
) -> Result<Json<SetResponse>, ApiError>
where
  S: SchedulerStore,
{
  let mut range = body
    .effective_from
    .map(EffectiveRange::starting_at)
    .unwrap_or_default();
  if let Some(to) = body.effective_to {
    if to <= range.from {
      return Err(ApiError::BadRequest(
        "effective_to must be after effective_from".into(),
      ));
    }
    range = range.until(to);
  }

  let svc = &state.metadata;
  let mut meta = svc
    .load(OwnerRef::new(kind, id))
    .await
    .map_err(ApiError::from_store)?;

  let changed = svc
    .set_value(&mut meta, &key, body.value, range, body.actor_id)
    .await
    .map_err(ApiError::from_store)?;
  let values = svc.get_values(&meta, &key).await.map_err(ApiError::from_store)?;

  Ok(Json(SetResponse { changed, values }))
}
