//! # Persistent Storage
//!
//! redb-backed attendance store. See [`attendance_db`] for the table layout
//! and transaction semantics.

pub mod attendance_db;

pub use attendance_db::{AttendanceStore, ClockInsert};
