//! JSON REST API for the MyURY scheduler.
//!
//! Exposes an axum [`Router`] backed by any
//! [`myury_core::store::SchedulerStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", myury_api::api_router(ApiState::new(store.clone())))
//! ```

pub mod error;
pub mod keys;
pub mod metadata;
pub mod schedule;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use myury_core::{
  conflict::ConflictDetector, registry::KeyRegistry, store::SchedulerStore,
  temporal::TemporalMetadata,
};

pub use error::ApiError;

/// Shared state threaded through all handlers.
pub struct ApiState<S> {
  pub store:     Arc<S>,
  pub metadata:  Arc<TemporalMetadata<S>>,
  pub conflicts: Arc<ConflictDetector<S>>,
}

impl<S: SchedulerStore> ApiState<S> {
  /// Build the key registry and services over `store`.
  pub fn new(store: Arc<S>) -> Self {
    let registry = Arc::new(KeyRegistry::new(Arc::clone(&store)));
    Self {
      metadata: Arc::new(TemporalMetadata::new(Arc::clone(&store), registry)),
      conflicts: Arc::new(ConflictDetector::new(Arc::clone(&store))),
      store,
    }
  }
}

impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      store:     Arc::clone(&self.store),
      metadata:  Arc::clone(&self.metadata),
      conflicts: Arc::clone(&self.conflicts),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: SchedulerStore + 'static,
{
  Router::new()
    // Metadata keys
    .route("/metadata-keys", get(keys::list::<S>).post(keys::create::<S>))
    // Metadata values
    .route("/owners/{kind}/{id}/metadata", get(metadata::list::<S>))
    .route(
      "/owners/{kind}/{id}/metadata/{key}",
      get(metadata::get_one::<S>).put(metadata::set_one::<S>),
    )
    // Schedule
    .route("/terms", post(schedule::create_term::<S>))
    .route("/terms/{id}", get(schedule::get_term::<S>))
    .route("/terms/{id}/conflicts", post(schedule::conflicts::<S>))
    .route("/timeslots", post(schedule::book::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
