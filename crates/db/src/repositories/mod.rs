//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Methods that take `&PgPool` run standalone; methods that take
//! `&mut PgConnection` are meant to be called inside a caller-owned
//! transaction (`&mut *tx`).

pub mod attendance_session_repo;
pub mod audit_repo;
pub mod correction_repo;
pub mod directory_repo;
pub mod period_lock_repo;
pub mod review_flag_repo;
pub mod time_entry_repo;

pub use attendance_session_repo::AttendanceSessionRepo;
pub use audit_repo::AuditLogRepo;
pub use correction_repo::CorrectionLogRepo;
pub use directory_repo::DirectoryRepo;
pub use period_lock_repo::PeriodLockRepo;
pub use review_flag_repo::ReviewFlagRepo;
pub use time_entry_repo::TimeEntryRepo;
