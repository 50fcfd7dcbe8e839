//! Rundown Procedural Core
//!
//! Deterministic level generation for a rundown of tiered levels:
//! - Weighted random engine (seeded string -> reproducible stream)
//! - Difficulty director (per-bulkhead budgets, objectives, enemy pools)
//! - Zone graph planner (append-only arena keyed by stable zone ids)
//! - Layout composition (phase-ordered builder, objective handlers, fragments)
//! - Enrichment passes (blood doors, error alarms, scouts)
//! - Validation, rundown pipeline and a parallel Monte-Carlo audit
//!
//! The core does no I/O while building; finished levels are plain serde
//! types handed to whatever persists them.

pub mod audit;
pub mod config;
pub mod constants;
pub mod director;
pub mod enrichment;
pub mod error;
pub mod layout;
pub mod level;
pub mod logging;
pub mod objective;
pub mod planner;
pub mod random;
pub mod rundown;
pub mod validate;

pub use config::GenerationConfig;
pub use error::{ConfigError, GenResult, GenerationError};
pub use layout::{build_level, LayoutOptions, LevelLayout};
pub use level::{Bulkhead, Complex, LevelRequest, Tier};
pub use random::Generator;
pub use rundown::{build_rundown, GenerationContext, Rundown};
