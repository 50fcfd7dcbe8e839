//! Zone content: everything the host needs to dress one explorable area.
//! Enemy, item and light identifiers are opaque tokens.

use serde::{Deserialize, Serialize};

use super::ZoneId;
use crate::constants::DEFAULT_ZONE_MULTIPLIER;
use crate::director::EnemyGroup;
use crate::level::{Bulkhead, Geometry, Tier};
use crate::random::Generator;

/// Declared size range of a zone
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coverage {
    pub min: f64,
    pub max: f64,
}

impl Default for Coverage {
    fn default() -> Self {
        CoverageSize::Medium.coverage()
    }
}

/// Size classes handlers ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageSize {
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
}

impl CoverageSize {
    pub fn coverage(&self) -> Coverage {
        let (min, max) = match self {
            CoverageSize::Tiny => (10.0, 20.0),
            CoverageSize::Small => (20.0, 35.0),
            CoverageSize::Medium => (35.0, 50.0),
            CoverageSize::Large => (50.0, 75.0),
            CoverageSize::Huge => (75.0, 110.0),
        };
        Coverage { min, max }
    }

    /// Default size roll for an ordinary zone
    pub fn roll(rng: &mut Generator) -> Self {
        rng.select_copy(&[
            (1.0, CoverageSize::Small),
            (3.0, CoverageSize::Medium),
            (1.5, CoverageSize::Large),
        ])
        .unwrap_or(CoverageSize::Medium)
    }
}

/// Lighting preset token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Light {
    Bright,
    Standard,
    Dim,
    Reactor,
    Emergency,
    Blackout,
}

impl Light {
    pub fn roll(tier: Tier, rng: &mut Generator) -> Self {
        let dark = tier.rank() as f64;
        rng.select_copy(&[
            (3.0 - dark * 0.5, Light::Bright),
            (4.0, Light::Standard),
            (1.0 + dark, Light::Dim),
            (0.5 + dark * 0.5, Light::Emergency),
            (dark * 0.4, Light::Blackout),
        ])
        .unwrap_or(Light::Standard)
    }
}

/// Security door style on a zone's entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorKind {
    Standard,
    Apex,
    Bulkhead,
}

/// What keeps a door shut
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorLock {
    None,
    Keycard(String),
    /// Door powered by a generator that needs the named cell
    Generator(String),
    Bulkhead(Bulkhead),
}

/// Alarm puzzle triggered when the door opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmPuzzle {
    None,
    /// Ordinary bioscan sequence; class 1 (quiet) to 5 (surge)
    Scan { class: u8 },
    /// Alarm that keeps spawning until turned off (at a terminal in
    /// `turn_off`, when present)
    ErrorAlarm { turn_off: Option<ZoneId> },
    Apex,
}

impl AlarmPuzzle {
    pub fn is_error_alarm(&self) -> bool {
        matches!(self, AlarmPuzzle::ErrorAlarm { .. })
    }

    pub fn scan_class(tier: Tier, rng: &mut Generator) -> AlarmPuzzle {
        let base = 1 + tier.rank() as u8 / 2;
        AlarmPuzzle::Scan {
            class: (base + rng.range(0, 1) as u8).min(5),
        }
    }
}

/// Blood door: a door that releases a horde when opened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloodDoor {
    pub horde: String,
}

/// Entry gate of a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    pub door: DoorKind,
    pub lock: DoorLock,
    pub puzzle: AlarmPuzzle,
    pub blood_door: Option<BloodDoor>,
}

impl Default for Gate {
    fn default() -> Self {
        Self {
            door: DoorKind::Standard,
            lock: DoorLock::None,
            puzzle: AlarmPuzzle::None,
            blood_door: None,
        }
    }
}

impl Gate {
    /// True when the gate already carries a special mechanic that enrichment
    /// must not stack on
    pub fn is_special(&self) -> bool {
        self.door != DoorKind::Standard
            || matches!(self.lock, DoorLock::Bulkhead(_))
            || matches!(self.puzzle, AlarmPuzzle::ErrorAlarm { .. } | AlarmPuzzle::Apex)
    }
}

/// Item placed in a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Item {
    Keycard(String),
    GeneratorCell(String),
    BulkheadKey(Bulkhead),
    /// Objective item token (small item, big item, HSU, ...)
    Objective(String),
}

/// Terminal placed in a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Terminal {
    Standard,
    /// Holds a code, uplink or command needed by the objective
    Objective(String),
    /// Turns off the named zone's error alarm
    AlarmOff(ZoneId),
}

/// Scripted events attached to a zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ZoneEvent {
    LightsOffOnDoorOpen,
    FogRise,
    SpawnOnTerminalUse,
}

/// Resource pack multipliers (1.0 = baseline)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Resources {
    pub health: f64,
    pub ammo: f64,
    pub tool: f64,
}

impl Default for Resources {
    fn default() -> Self {
        Self {
            health: 1.0,
            ammo: 1.0,
            tool: 1.0,
        }
    }
}

/// Scout pack drawn by the scout enrichment pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoutPack {
    pub token: String,
    pub count: u32,
}

/// Gameplay content of one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub coverage: Coverage,
    pub light: Light,
    pub gate: Gate,
    pub enemy_points: u32,
    pub enemy_multiplier: f64,
    pub enemies: Vec<EnemyGroup>,
    pub items: Vec<Item>,
    pub terminals: Vec<Terminal>,
    pub resources: Resources,
    pub events: Vec<ZoneEvent>,
    pub scouts: Vec<ScoutPack>,
    pub geometry: Option<Geometry>,
    /// Display number assigned when the level is finalised
    pub alias: Option<u32>,
}

impl Default for Zone {
    fn default() -> Self {
        Self {
            coverage: Coverage::default(),
            light: Light::Standard,
            gate: Gate::default(),
            enemy_points: 0,
            enemy_multiplier: DEFAULT_ZONE_MULTIPLIER,
            enemies: Vec::new(),
            items: Vec::new(),
            terminals: vec![Terminal::Standard],
            resources: Resources::default(),
            events: Vec::new(),
            scouts: Vec::new(),
            geometry: None,
            alias: None,
        }
    }
}

impl Zone {
    pub fn with_size(size: CoverageSize) -> Self {
        Self {
            coverage: size.coverage(),
            ..Self::default()
        }
    }

    pub fn has_item(&self, item: &Item) -> bool {
        self.items.contains(item)
    }

    pub fn objective_items(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i, Item::Objective(_)))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coverage_classes_increase() {
        let sizes = [
            CoverageSize::Tiny,
            CoverageSize::Small,
            CoverageSize::Medium,
            CoverageSize::Large,
            CoverageSize::Huge,
        ];
        for pair in sizes.windows(2) {
            assert!(pair[0].coverage().max <= pair[1].coverage().min);
        }
    }

    #[test]
    fn test_gate_special_detection() {
        let mut gate = Gate::default();
        assert!(!gate.is_special());
        gate.puzzle = AlarmPuzzle::Scan { class: 3 };
        assert!(!gate.is_special());
        gate.puzzle = AlarmPuzzle::ErrorAlarm { turn_off: None };
        assert!(gate.is_special());

        let bulkhead = Gate {
            door: DoorKind::Bulkhead,
            lock: DoorLock::Bulkhead(Bulkhead::Extreme),
            ..Gate::default()
        };
        assert!(bulkhead.is_special());
    }

    #[test]
    fn test_scan_class_bounded() {
        let mut rng = Generator::seeded("scan");
        for tier in Tier::ALL {
            for _ in 0..50 {
                match AlarmPuzzle::scan_class(tier, &mut rng) {
                    AlarmPuzzle::Scan { class } => assert!((1..=5).contains(&class)),
                    other => panic!("unexpected {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_light_roll_never_blackout_on_a() {
        let mut rng = Generator::seeded("light");
        for _ in 0..300 {
            assert_ne!(Light::roll(Tier::A, &mut rng), Light::Blackout);
        }
    }
}
