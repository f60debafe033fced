//! ShiftLag - circadian strain scoring for shift workers
//!
//! ShiftLag turns a shift worker's logged sleep and rota into a 0-100 score of
//! how far their body clock is out of step with their schedule, through a
//! deterministic pipeline: row adaptation → typical sleep need → sleep debt →
//! circadian misalignment → schedule instability → templated explanation.
//!
//! ## Components
//!
//! - **Sleep debt** (0-40): weekly shortfall against the user's typical need
//! - **Circadian misalignment** (0-40): shift hours inside the biological night
//! - **Schedule instability** (0-20): spread of recent shift start times
//!
//! ## Example
//!
//! ```ignore
//! use shiftlag::{MemoryStore, ShiftLagEngine};
//!
//! let engine = ShiftLagEngine::new(MemoryStore::new(sessions, shifts));
//! let result = engine.calculate(user_id);
//! println!("{} ({})", result.score, result.category.as_str());
//! ```

pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod explain;
pub mod instability;
pub mod misalignment;
pub mod schema;
pub mod sleep_debt;
pub mod sleep_need;
pub mod source;
pub mod stats;
pub mod types;

pub use config::ShiftLagConfig;
pub use engine::{shift_lag_from_json, ShiftLagComponents, ShiftLagEngine};
pub use error::ComputeError;
pub use source::{DateWindow, MemoryStore, SleepShiftSource};
pub use types::{ShiftLagCategory, ShiftLagResult, ShiftRecord, SleepSession, UserId};

// Schema exports
pub use schema::{AdapterReport, RowAdapter, ShiftRow, SleepLogRow};

/// Engine version reported by the CLI
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
