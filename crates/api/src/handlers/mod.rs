pub mod attendance;
pub mod period_lock;
pub mod reconcile;
