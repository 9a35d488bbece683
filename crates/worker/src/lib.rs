//! Background jobs for the attendance ledger.
//!
//! - [`reconcile`] -- backfills attendance sessions from raw time entries.
//! - [`config`] -- environment configuration for the periodic runner.

pub mod config;
pub mod reconcile;
