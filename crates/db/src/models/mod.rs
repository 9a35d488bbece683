//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A create DTO for inserts

pub mod attendance_session;
pub mod audit;
pub mod correction;
pub mod directory;
pub mod period_lock;
pub mod review_flag;
pub mod time_entry;
