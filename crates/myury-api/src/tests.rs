//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode},
};
use myury_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{ApiState, api_router};

async fn app() -> Router {
  let store = SqliteStore::open_in_memory()
    .await
    .expect("in-memory store");
  api_router(ApiState::new(Arc::new(store)))
}

async fn send(
  app: &Router,
  method: Method,
  uri: &str,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
  let req = Request::builder()
    .method(method)
    .uri(uri)
    .header("content-type", "application/json")
    .body(body)
    .unwrap();

  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
    .await
    .unwrap();
  (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

// ─── Keys ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn lists_seeded_keys() {
  let app = app().await;
  let (status, body) = send(&app, Method::GET, "/metadata-keys", None).await;
  assert_eq!(status, StatusCode::OK);
  let names: Vec<_> = body
    .as_array()
    .unwrap()
    .iter()
    .map(|k| k["name"].as_str().unwrap().to_owned())
    .collect();
  assert_eq!(names, ["title", "description", "tag"]);
}

#[tokio::test]
async fn created_key_is_usable_immediately() {
  let app = app().await;
  // Load the registry before the key exists.
  send(&app, Method::GET, "/metadata-keys", None).await;

  let (status, key) = send(
    &app,
    Method::POST,
    "/metadata-keys",
    Some(json!({ "name": "genre", "allows_multiple": false })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(key["name"], "genre");

  let (status, body) = send(
    &app,
    Method::PUT,
    "/owners/show/1/metadata/genre",
    Some(json!({ "value": "Jazz", "actor_id": 7 })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["changed"], true);
}

// ─── Metadata ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn put_is_idempotent_and_listed() {
  let app = app().await;
  let put = json!({ "value": "Breakfast", "actor_id": 3 });

  let (status, body) =
    send(&app, Method::PUT, "/owners/season/5/metadata/title", Some(put.clone())).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "changed": true, "values": ["Breakfast"] }));

  let (_, body) =
    send(&app, Method::PUT, "/owners/season/5/metadata/title", Some(put)).await;
  assert_eq!(body["changed"], false);

  let (status, body) = send(&app, Method::GET, "/owners/season/5/metadata", None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "title": ["Breakfast"] }));

  let (_, body) =
    send(&app, Method::GET, "/owners/season/5/metadata/title?history=true", None).await;
  let rows = body.as_array().unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0]["settor_id"], 3);
}

#[tokio::test]
async fn multiple_values_accumulate() {
  let app = app().await;
  send(
    &app,
    Method::PUT,
    "/owners/show/2/metadata/tag",
    Some(json!({ "value": ["a", "b"], "actor_id": 1 })),
  )
  .await;
  let (_, body) = send(
    &app,
    Method::PUT,
    "/owners/show/2/metadata/tag",
    Some(json!({ "value": ["b", "c"], "actor_id": 1 })),
  )
  .await;
  assert_eq!(body, json!({ "changed": true, "values": ["a", "b", "c"] }));
}

#[tokio::test]
async fn point_in_time_read() {
  let app = app().await;
  for (value, from) in [("Old", "2024-01-01T00:00:00Z"), ("New", "2024-02-01T00:00:00Z")] {
    send(
      &app,
      Method::PUT,
      "/owners/timeslot/9/metadata/description",
      Some(json!({ "value": value, "effective_from": from, "actor_id": 1 })),
    )
    .await;
  }

  let (status, body) = send(
    &app,
    Method::GET,
    "/owners/timeslot/9/metadata/description?as_of=2024-01-15T00:00:00Z",
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body[0]["value"], "Old");

  let (_, body) =
    send(&app, Method::GET, "/owners/timeslot/9/metadata/description", None).await;
  assert_eq!(body.as_array().unwrap().len(), 1);
  assert_eq!(body[0]["value"], "New");
}

#[tokio::test]
async fn metadata_errors_map_to_statuses() {
  let app = app().await;

  let (status, body) = send(
    &app,
    Method::PUT,
    "/owners/show/1/metadata/title",
    Some(json!({ "value": ["a", "b"], "actor_id": 1 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("multiple"));

  let (status, _) = send(
    &app,
    Method::PUT,
    "/owners/show/1/metadata/mood",
    Some(json!({ "value": "calm", "actor_id": 1 })),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(
    &app,
    Method::PUT,
    "/owners/show/1/metadata/title",
    Some(json!({
      "value": "x",
      "effective_from": "2024-02-01T00:00:00Z",
      "effective_to": "2024-01-01T00:00:00Z",
      "actor_id": 1
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(&app, Method::GET, "/owners/member/1/metadata", None).await;
  assert!(status.is_client_error());
}

// ─── Schedule ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn conflicts_for_term() {
  let app = app().await;

  let (status, term) = send(
    &app,
    Method::POST,
    "/terms",
    Some(json!({
      "start_date": "1970-01-01T00:00:00Z",
      "finish_date": "1970-03-19T00:00:00Z",
      "description": "Autumn"
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let term_id = term["term_id"].as_i64().unwrap();

  let (status, slot) = send(
    &app,
    Method::POST,
    "/timeslots",
    Some(json!({
      "season_id": 4,
      "start_time": "1970-01-22T10:30:00Z",
      "duration_secs": 900
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let slot_id = slot["timeslot_id"].clone();

  let proposed = json!({ "day": 0, "start_secs": 36000, "duration_secs": 3600 });
  let (status, body) = send(
    &app,
    Method::POST,
    &format!("/terms/{term_id}/conflicts"),
    Some(proposed.clone()),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!({ "conflicts": { "3": slot_id } }));

  let (status, _) = send(
    &app,
    Method::POST,
    &format!("/terms/{}/conflicts", term_id + 1),
    Some(proposed),
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = send(
    &app,
    Method::POST,
    &format!("/terms/{term_id}/conflicts"),
    Some(json!({ "day": 7, "start_secs": 0, "duration_secs": 60 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_term_is_404() {
  let app = app().await;
  let (status, body) = send(&app, Method::GET, "/terms/42", None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
  assert_eq!(body["error"], "term 42 not found");
}

#[tokio::test]
async fn unrepresentable_inputs_are_bad_requests() {
  let app = app().await;

  let (status, term) = send(
    &app,
    Method::POST,
    "/terms",
    Some(json!({
      "start_date": "+262142-12-01T00:00:00Z",
      "finish_date": "+262142-12-30T00:00:00Z",
      "description": "Far"
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let term_id = term["term_id"].as_i64().unwrap();

  let (status, _) = send(
    &app,
    Method::POST,
    &format!("/terms/{term_id}/conflicts"),
    Some(json!({ "day": 0, "start_secs": 0, "duration_secs": 60 })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = send(
    &app,
    Method::POST,
    "/timeslots",
    Some(json!({
      "season_id": 1,
      "start_time": "1970-01-08T00:00:00.900Z",
      "duration_secs": 1
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}
