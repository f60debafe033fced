//! Supabase row schema
//!
//! Row shapes for the `sleep_logs` and `shifts` tables and the adapter that
//! turns them into [`SleepSession`](crate::types::SleepSession) and
//! [`ShiftRecord`](crate::types::ShiftRecord) values.

mod adapter;
mod rows;

pub use adapter::*;
pub use rows::*;
