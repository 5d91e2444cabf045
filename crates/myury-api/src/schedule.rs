//! Handlers for terms, timeslots and conflict checks.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/terms` | Body: [`NewTerm`]; returns 201 + term |
//! | `GET`  | `/terms/:id` | 404 if not found |
//! | `POST` | `/terms/:id/conflicts` | Body: [`ProposedSlot`] |
//! | `POST` | `/timeslots` | Body: [`NewTimeslot`]; returns 201 + timeslot |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use myury_core::{
  conflict::ConflictReport,
  schedule::{NewTerm, NewTimeslot, ProposedSlot, Term},
  store::SchedulerStore,
};
use serde::Serialize;

use crate::{ApiState, error::ApiError};

// ─── Terms ────────────────────────────────────────────────────────────────────

/// `POST /terms`
pub async fn create_term<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewTerm>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchedulerStore,
{
  if body.finish_date <= body.start_date {
    return Err(ApiError::BadRequest(
      "finish_date must be after start_date".into(),
    ));
  }
  let term = state.store.add_term(body).await.map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(term)))
}

/// `GET /terms/:id`
pub async fn get_term<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<i64>,
) -> Result<Json<Term>, ApiError>
where
  S: SchedulerStore,
{
  let term = state
    .store
    .get_term(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("term {id} not found")))?;
  Ok(Json(term))
}

// ─── Timeslots ────────────────────────────────────────────────────────────────

/// `POST /timeslots`
pub async fn book<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<NewTimeslot>,
) -> Result<impl IntoResponse, ApiError>
where
  S: SchedulerStore,
{
  let timeslot = state
    .store
    .book_timeslot(body)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(timeslot)))
}

// ─── Conflicts ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ConflictsResponse {
  /// Week index → conflicting timeslot id.
  pub conflicts: ConflictReport,
}

/// `POST /terms/:id/conflicts` — body: `{"day":0,"start_secs":36000,"duration_secs":3600}`
pub async fn conflicts<S>(
  State(state): State<ApiState<S>>,
  Path(term_id): Path<i64>,
  Json(slot): Json<ProposedSlot>,
) -> Result<Json<ConflictsResponse>, ApiError>
where
  S: SchedulerStore,
{
  let conflicts = state
    .conflicts
    .find_conflicts(term_id, slot)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(ConflictsResponse { conflicts }))
}
