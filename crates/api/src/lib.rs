//! Attendance ledger API server library.
//!
//! Exposes config, state, error handling, the ledger services and routes so
//! integration tests and the binary entrypoint share them.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod middleware;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
