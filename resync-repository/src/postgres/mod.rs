//! Postgres implementation of the record store.
//!
//! Records live in a single table with a `JSONB` column holding their
//! fields. Cursors stream rows with `sqlx::fetch`, so a sweep never
//! materializes the whole table.

mod record_store;

pub use record_store::PgRecordStore;
