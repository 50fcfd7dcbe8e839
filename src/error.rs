//! Error taxonomy for the generation core.
//!
//! Only [`GenerationError`] aborts a level build. Degraded fallbacks (empty
//! objective candidates, tileset-constrained fragments) never surface as
//! errors, and cosmetic lookups that fail are logged and skipped.

use std::path::PathBuf;
use thiserror::Error;

use crate::level::Bulkhead;
use crate::objective::ObjectiveKind;
use crate::planner::ZoneId;

/// Build-abort conditions. Fatal for the level being built, never for the
/// surrounding rundown.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenerationError {
    #[error("no start zone for {objective:?} in the {bulkhead:?} bulkhead")]
    MissingStartZone {
        bulkhead: Bulkhead,
        objective: ObjectiveKind,
    },

    #[error("zone {0} is not registered in the planner")]
    UnknownZone(ZoneId),

    #[error("zone {child} is already built from {existing}")]
    AlreadyConnected { child: ZoneId, existing: ZoneId },

    #[error("zone {0} cannot be built from itself")]
    SelfConnection(ZoneId),

    #[error("building {child} from {parent} would close a cycle")]
    CycleDetected { parent: ZoneId, child: ZoneId },

    #[error("missing prerequisite structure: {0}")]
    MissingPrerequisite(String),
}

pub type GenResult<T> = Result<T, GenerationError>;

/// Errors raised while loading or validating a [`crate::config::GenerationConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid RON config: {0}")]
    Ron(#[from] ron::error::SpannedError),

    #[error("invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;
