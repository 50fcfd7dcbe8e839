//! Centralized generation constants for the rundown procedural core.
//!
//! Tier/bulkhead lookup tables live next to the code that owns them
//! (director budgets, enrichment chances); this file only holds the scalar
//! knobs shared by several modules.

// =====================================================
// Seeding
// =====================================================

/// Seed used when the config does not name one
pub const DEFAULT_SEED: &str = "rundown";

// =====================================================
// Zone budget
// =====================================================

/// Divisor applied to a zone's average coverage before scaling by tier
pub const COVERAGE_NORMALIZATION: f64 = 10.0;

/// Default per-zone enemy point multiplier
pub const DEFAULT_ZONE_MULTIPLIER: f64 = 1.0;

/// Multiplier for zones that hold the objective or a boss
pub const OBJECTIVE_ZONE_MULTIPLIER: f64 = 1.5;

/// Multiplier for quiet connector zones (hubs, bulkhead entrances)
pub const CONNECTOR_ZONE_MULTIPLIER: f64 = 0.6;

// =====================================================
// Zone graph
// =====================================================

/// Sub-branch label applied to zones created without one
pub const PRIMARY_BRANCH: &str = "primary";

/// Default max connections for a normal zone (one way in, one way on)
pub const DEFAULT_MAX_CONNECTIONS: u8 = 2;

/// Max connections for hub zones
pub const HUB_MAX_CONNECTIONS: u8 = 4;

// =====================================================
// Enrichment
// =====================================================

/// Each successful error-alarm roll multiplies the next chance by this
pub const ERROR_ALARM_DECAY: f64 = 0.5;

/// Hard cap on error alarms added to one branch by the enrichment pass
pub const MAX_ERROR_ALARMS: usize = 3;

// =====================================================
// Finalisation
// =====================================================

/// Inclusive range for the per-level display alias base
pub const ALIAS_BASE_MIN: u32 = 50;
pub const ALIAS_BASE_MAX: u32 = 800;
