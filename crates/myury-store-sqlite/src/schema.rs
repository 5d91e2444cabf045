//! SQL schema for the MyURY scheduler SQLite store.
//!
//! Executed once at connection startup. The DDL is idempotent and stamps
//! `PRAGMA user_version = 1`; nothing reads the version back yet.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS` / `OR IGNORE`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS metadata_keys (
    metadata_key_id INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT    NOT NULL UNIQUE,
    allow_multiple  INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO metadata_keys (name, allow_multiple) VALUES
    ('title',       0),
    ('description', 0),
    ('tag',         1);

-- Metadata tables are append-only. Rows are closed by setting effective_to;
-- no row is ever deleted. Timestamps are fixed-width RFC 3339 UTC strings so
-- that lexical order is chronological order.
CREATE TABLE IF NOT EXISTS show_metadata (
    show_metadata_id INTEGER PRIMARY KEY AUTOINCREMENT,
    metadata_key_id  INTEGER NOT NULL REFERENCES metadata_keys(metadata_key_id),
    show_id          INTEGER NOT NULL,
    metadata_value   TEXT    NOT NULL,
    effective_from   TEXT    NOT NULL,
    effective_to     TEXT,
    memberid         INTEGER NOT NULL,
    approvedid       INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS season_metadata (
    season_metadata_id INTEGER PRIMARY KEY AUTOINCREMENT,
    metadata_key_id    INTEGER NOT NULL REFERENCES metadata_keys(metadata_key_id),
    show_season_id     INTEGER NOT NULL,
    metadata_value     TEXT    NOT NULL,
    effective_from     TEXT    NOT NULL,
    effective_to       TEXT,
    memberid           INTEGER NOT NULL,
    approvedid         INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS timeslot_metadata (
    timeslot_metadata_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    metadata_key_id         INTEGER NOT NULL REFERENCES metadata_keys(metadata_key_id),
    show_season_timeslot_id INTEGER NOT NULL,
    metadata_value          TEXT    NOT NULL,
    effective_from          TEXT    NOT NULL,
    effective_to            TEXT,
    memberid                INTEGER NOT NULL,
    approvedid              INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS show_metadata_owner_idx
    ON show_metadata(show_id, metadata_key_id);
CREATE INDEX IF NOT EXISTS season_metadata_owner_idx
    ON season_metadata(show_season_id, metadata_key_id);
CREATE INDEX IF NOT EXISTS timeslot_metadata_owner_idx
    ON timeslot_metadata(show_season_timeslot_id, metadata_key_id);

CREATE TABLE IF NOT EXISTS terms (
    term_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    start_date  INTEGER NOT NULL,   -- unix seconds
    finish_date INTEGER NOT NULL,   -- unix seconds
    descr       TEXT    NOT NULL DEFAULT ''
);

-- Booked timeslots occupy [start_time, start_time + duration_secs).
CREATE TABLE IF NOT EXISTS show_season_timeslots (
    show_season_timeslot_id INTEGER PRIMARY KEY AUTOINCREMENT,
    show_season_id          INTEGER NOT NULL,
    start_time              INTEGER NOT NULL,   -- unix seconds
    duration_secs           INTEGER NOT NULL CHECK (duration_secs > 0)
);

CREATE INDEX IF NOT EXISTS timeslots_start_idx
    ON show_season_timeslots(start_time);

PRAGMA user_version = 1;
";

/// Primary-key column of each metadata table, matched to
/// [`myury_core::metadata::OwnerKind::table`].
pub fn metadata_id_column(kind: myury_core::metadata::OwnerKind) -> &'static str {
  use myury_core::metadata::OwnerKind;
  match kind {
    OwnerKind::Show => "show_metadata_id",
    OwnerKind::Season => "season_metadata_id",
    OwnerKind::Timeslot => "timeslot_metadata_id",
  }
}
