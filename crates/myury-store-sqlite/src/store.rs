//! [`SqliteStore`] — the SQLite implementation of [`SchedulerStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{OptionalExtension as _, TransactionBehavior};

use myury_core::{
  metadata::{
    MetadataKey, MetadataValue, MetadataWrite, OwnerRef, WriteOutcome,
    WriteRequest,
  },
  schedule::{NewTerm, NewTimeslot, ScheduleTimeslot, Term},
  store::{KeySource, SchedulerStore},
};

use crate::{
  Error, Result,
  encode::{
    RawKey, RawMetadataValue, RawTerm, RawTimeslot, encode_dt,
    encode_epoch, whole_epoch,
  },
  schema::{SCHEMA, metadata_id_column},
};

// ─── SQL helpers ─────────────────────────────────────────────────────────────

/// `SELECT` over the metadata table of `owner`'s kind, in the column order
/// read by [`RawMetadataValue::from_row`].
fn select_metadata(owner: OwnerRef) -> String {
  format!(
    "SELECT {id}, metadata_key_id, {owner_col}, metadata_value,
            memberid, approvedid, effective_from, effective_to
     FROM {table}",
    id = metadata_id_column(owner.kind),
    owner_col = owner.kind.owner_column(),
    table = owner.kind.table(),
  )
}

/// Open rows for `owner`, optionally restricted to one key.
fn query_open(
  conn: &rusqlite::Connection,
  owner: OwnerRef,
  key_id: Option<i64>,
) -> rusqlite::Result<Vec<RawMetadataValue>> {
  let sql = format!(
    "{select}
     WHERE {owner_col} = ?1
       AND effective_to IS NULL
       AND (?2 IS NULL OR metadata_key_id = ?2)
     ORDER BY {id}",
    select = select_metadata(owner),
    owner_col = owner.kind.owner_column(),
    id = metadata_id_column(owner.kind),
  );
  let mut stmt = conn.prepare(&sql)?;
  let rows = stmt
    .query_map(rusqlite::params![owner.id, key_id], RawMetadataValue::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Apply a planned write: close open rows, then insert the new ones.
///
/// A row opened after the close time is closed at its own start, leaving it
/// superseded rather than with an inverted range.
fn apply_write(
  conn: &rusqlite::Connection,
  write: &MetadataWrite,
) -> rusqlite::Result<usize> {
  let table = write.owner.kind.table();
  let owner_col = write.owner.kind.owner_column();

  let mut closed = 0;
  if let Some(at) = write.close_open_at {
    closed = conn.execute(
      &format!(
        "UPDATE {table} SET effective_to = MAX(effective_from, ?1)
         WHERE {owner_col} = ?2
           AND metadata_key_id = ?3
           AND effective_to IS NULL"
      ),
      rusqlite::params![encode_dt(at), write.owner.id, write.key_id],
    )?;
  }

  let mut stmt = conn.prepare(&format!(
    "INSERT INTO {table} (
       metadata_key_id, {owner_col}, metadata_value,
       effective_from, effective_to, memberid, approvedid
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
  ))?;
  for row in &write.inserts {
    stmt.execute(rusqlite::params![
      write.key_id,
      write.owner.id,
      row.value,
      encode_dt(row.effective_from),
      row.effective_to.map(encode_dt),
      row.settor_id,
      row.approver_id,
    ])?;
  }

  Ok(closed)
}

fn decode_rows(
  owner: OwnerRef,
  raws: Vec<RawMetadataValue>,
) -> Result<Vec<MetadataValue>> {
  raws.into_iter().map(|r| r.into_value(owner.kind)).collect()
}

fn raw_timeslot(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTimeslot> {
  Ok(RawTimeslot {
    timeslot_id:   row.get(0)?,
    season_id:     row.get(1)?,
    start_time:    row.get(2)?,
    duration_secs: row.get(3)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A scheduler store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::debug!("schema initialised");
    Ok(())
  }
}

// ─── KeySource impl ──────────────────────────────────────────────────────────

impl KeySource for SqliteStore {
  type Error = Error;

  async fn load_metadata_keys(&self) -> Result<Vec<MetadataKey>> {
    let raws: Vec<RawKey> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT metadata_key_id, name, allow_multiple
           FROM metadata_keys
           ORDER BY metadata_key_id",
        )?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawKey {
              id:              row.get(0)?,
              name:            row.get(1)?,
              allows_multiple: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(raws.into_iter().map(MetadataKey::from).collect())
  }
}

// ─── SchedulerStore impl ─────────────────────────────────────────────────────

impl SchedulerStore for SqliteStore {
  // ── Metadata keys ─────────────────────────────────────────────────────────

  async fn create_metadata_key(
    &self,
    name: String,
    allows_multiple: bool,
  ) -> Result<MetadataKey> {
    let insert_name = name.clone();
    let id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO metadata_keys (name, allow_multiple) VALUES (?1, ?2)",
          rusqlite::params![insert_name, allows_multiple],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    tracing::info!(id, name = %name, allows_multiple, "metadata key created");
    Ok(MetadataKey { id, name, allows_multiple })
  }

  // ── Metadata values ───────────────────────────────────────────────────────

  async fn open_metadata(
    &self,
    owner: OwnerRef,
    key_id: Option<i64>,
  ) -> Result<Vec<MetadataValue>> {
    let raws = self
      .conn
      .call(move |conn| Ok(query_open(conn, owner, key_id)?))
      .await?;
    decode_rows(owner, raws)
  }

  async fn set_metadata(&self, request: WriteRequest) -> Result<WriteOutcome> {
    let owner = request.owner();
    let key_id = request.key().id;

    // Read, plan and write under one write-locked transaction so concurrent
    // writers for the same owner and key are serialised.
    let (changed, closed, raws) = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = query_open(&tx, owner, Some(key_id))?;
        let Some(write) = request.plan(current.iter().map(|r| r.value.as_str()))
        else {
          return Ok((false, 0, current));
        };

        let closed = apply_write(&tx, &write)?;
        let after = query_open(&tx, owner, Some(key_id))?;
        tx.commit()?;
        Ok((true, closed, after))
      })
      .await?;

    tracing::debug!(
      owner = %owner.kind,
      owner_id = owner.id,
      key_id,
      changed,
      closed,
      "applied metadata write"
    );

    Ok(WriteOutcome { changed, current: decode_rows(owner, raws)? })
  }

  async fn metadata_history(
    &self,
    owner: OwnerRef,
    key_id: i64,
  ) -> Result<Vec<MetadataValue>> {
    let raws = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{select}
           WHERE {owner_col} = ?1 AND metadata_key_id = ?2
           ORDER BY effective_from, {id}",
          select = select_metadata(owner),
          owner_col = owner.kind.owner_column(),
          id = metadata_id_column(owner.kind),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![owner.id, key_id], RawMetadataValue::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    decode_rows(owner, raws)
  }

  async fn metadata_at(
    &self,
    owner: OwnerRef,
    key_id: i64,
    at: DateTime<Utc>,
  ) -> Result<Vec<MetadataValue>> {
    let at_str = encode_dt(at);
    let raws = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "{select}
           WHERE {owner_col} = ?1
             AND metadata_key_id = ?2
             AND effective_from <= ?3
             AND (effective_to IS NULL OR effective_to > ?3)
           ORDER BY {id}",
          select = select_metadata(owner),
          owner_col = owner.kind.owner_column(),
          id = metadata_id_column(owner.kind),
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![owner.id, key_id, at_str],
            RawMetadataValue::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    decode_rows(owner, raws)
  }

  // ── Terms ─────────────────────────────────────────────────────────────────

  async fn add_term(&self, term: NewTerm) -> Result<Term> {
    let (Some(start), Some(finish)) =
      (whole_epoch(term.start_date), whole_epoch(term.finish_date))
    else {
      return Err(
        myury_core::Error::InvalidTerm(
          "term dates must be whole seconds".into(),
        )
        .into(),
      );
    };
    let descr = term.description.clone();

    let term_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO terms (start_date, finish_date, descr) VALUES (?1, ?2, ?3)",
          rusqlite::params![start, finish, descr],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    RawTerm {
      term_id,
      start_date: start,
      finish_date: finish,
      description: term.description,
    }
    .into_term()
  }

  async fn get_term(&self, term_id: i64) -> Result<Option<Term>> {
    let raw: Option<RawTerm> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT term_id, start_date, finish_date, descr
               FROM terms WHERE term_id = ?1",
              rusqlite::params![term_id],
              |row| {
                Ok(RawTerm {
                  term_id:     row.get(0)?,
                  start_date:  row.get(1)?,
                  finish_date: row.get(2)?,
                  description: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTerm::into_term).transpose()
  }

  // ── Timeslots ─────────────────────────────────────────────────────────────

  async fn book_timeslot(&self, timeslot: NewTimeslot) -> Result<ScheduleTimeslot> {
    if timeslot.duration_secs <= 0 {
      return Err(
        myury_core::Error::InvalidSlot("duration must be positive".into()).into(),
      );
    }

    let Some(start) = whole_epoch(timeslot.start_time) else {
      return Err(
        myury_core::Error::InvalidSlot(format!(
          "start time {} is not a whole second",
          timeslot.start_time
        ))
        .into(),
      );
    };
    let season_id = timeslot.season_id;
    let duration = timeslot.duration_secs;

    let timeslot_id = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO show_season_timeslots (show_season_id, start_time, duration_secs)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![season_id, start, duration],
        )?;
        Ok(conn.last_insert_rowid())
      })
      .await?;

    RawTimeslot { timeslot_id, season_id, start_time: start, duration_secs: duration }
      .into_timeslot()
  }

  async fn first_overlapping_timeslot(
    &self,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
  ) -> Result<Option<ScheduleTimeslot>> {
    // Stored times are whole seconds, so round the window outwards.
    let start = encode_epoch(start);
    let end = whole_epoch(end).unwrap_or(encode_epoch(end) + 1);

    let raw: Option<RawTimeslot> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT show_season_timeslot_id, show_season_id, start_time, duration_secs
               FROM show_season_timeslots
               WHERE (start_time <= ?1 AND start_time + duration_secs > ?1)
                  OR (start_time > ?1 AND start_time < ?2)
               ORDER BY start_time, show_season_timeslot_id
               LIMIT 1",
              rusqlite::params![start, end],
              raw_timeslot,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTimeslot::into_timeslot).transpose()
  }
}
