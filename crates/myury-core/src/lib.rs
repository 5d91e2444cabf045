//! Core types, traits and services for the MyURY scheduler.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! Storage backends implement [`store::SchedulerStore`]; the services here
//! ([`temporal::TemporalMetadata`], [`conflict::ConflictDetector`]) are
//! generic over it.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod conflict;
pub mod error;
pub mod metadata;
pub mod registry;
pub mod schedule;
pub mod store;
pub mod temporal;

pub use error::{Error, Result, StoreError};
