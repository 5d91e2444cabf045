//! Handlers for `/metadata-keys` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/metadata-keys` | All registered keys |
//! | `POST` | `/metadata-keys` | Body: `{"name":"genre","allows_multiple":false}` |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use myury_core::{metadata::MetadataKey, store::SchedulerStore};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

/// `GET /metadata-keys`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
) -> Result<Json<Vec<MetadataKey>>, ApiError>
where
  S: SchedulerStore,
{
  let keys = state
    .metadata
    .registry()
    .keys()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(keys))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name:            String,
  #[serde(default)]
  pub allows_multiple: bool,
}

/// `POST /metadata-keys` — registers the key and reloads the registry.
pub async fn create<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchedulerStore,
{
  if body.name.trim().is_empty() {
    return Err(ApiError::BadRequest("key name must not be empty".into()));
  }

  let key = state
    .store
    .create_metadata_key(body.name, body.allows_multiple)
    .await
    .map_err(ApiError::from_store)?;
  state.metadata.registry().invalidate().await;
  Ok((StatusCode::CREATED, Json(key)))
}
