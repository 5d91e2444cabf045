//! Error types for `myury-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown metadata key: {0:?}")]
  UnknownKey(String),

  #[error("unknown metadata key id: {0}")]
  UnknownKeyId(i64),

  #[error("unrecognised metadata table: {0:?}")]
  InvalidTable(String),

  #[error("column {field:?} is not the owner column of table {table:?}")]
  InvalidOwnerField { table: String, field: String },

  #[error("metadata key {0:?} does not allow multiple values")]
  MultipleValuesNotAllowed(String),

  #[error("invalid day of week: {0}")]
  InvalidDay(u8),

  #[error("invalid slot: {0}")]
  InvalidSlot(String),

  #[error("invalid term: {0}")]
  InvalidTerm(String),

  #[error("term not found: {0}")]
  TermNotFound(i64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Implemented by storage backend errors so that callers can recover the
/// domain error underneath a backend failure.
pub trait StoreError:
  std::error::Error + From<Error> + Send + Sync + 'static
{
  /// The wrapped domain error, if this is one.
  fn as_core(&self) -> Option<&Error>;
}
