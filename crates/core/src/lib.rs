//! Domain layer for the attendance ledger.
//!
//! Pure types, validation and hashing with no I/O, shared by the database,
//! event, worker and API crates.

pub mod attendance;
pub mod audit;
pub mod error;
pub mod export;
pub mod fingerprint;
pub mod period;
pub mod roles;
pub mod types;
