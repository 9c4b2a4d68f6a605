//! Background processing: queue workers and the cron scheduler.

#[cfg(feature = "scheduler")]
pub mod scheduler;
pub mod workers;
