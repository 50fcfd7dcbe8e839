//! Objective catalog and parameter prebuild.
//!
//! The catalog is closed: every [`ObjectiveKind`] has a layout handler and a
//! prebuild rule. Parameters are a tagged enum so each handler can only see
//! the fields that make sense for its objective.

use serde::{Deserialize, Serialize};

use crate::level::{Bulkhead, Geometry, Tier};
use crate::random::Generator;

/// Mission goal type driving which layout handler runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ObjectiveKind {
    HsuFindSample,
    ReactorStartup,
    ReactorShutdown,
    GatherSmallItems,
    ClearPath,
    SpecialTerminalCommand,
    RetrieveBigItems,
    PowerCellDistribution,
    TerminalUplink,
    CentralGeneratorCluster,
    HsuActivateSmall,
    Survival,
    GatherTerminal,
    CorruptedTerminalUplink,
    TimedTerminalSequence,
}

impl ObjectiveKind {
    pub const ALL: [ObjectiveKind; 15] = [
        ObjectiveKind::HsuFindSample,
        ObjectiveKind::ReactorStartup,
        ObjectiveKind::ReactorShutdown,
        ObjectiveKind::GatherSmallItems,
        ObjectiveKind::ClearPath,
        ObjectiveKind::SpecialTerminalCommand,
        ObjectiveKind::RetrieveBigItems,
        ObjectiveKind::PowerCellDistribution,
        ObjectiveKind::TerminalUplink,
        ObjectiveKind::CentralGeneratorCluster,
        ObjectiveKind::HsuActivateSmall,
        ObjectiveKind::Survival,
        ObjectiveKind::GatherTerminal,
        ObjectiveKind::CorruptedTerminalUplink,
        ObjectiveKind::TimedTerminalSequence,
    ];

    /// Returned when exclusion leaves no candidate. Legal in every bulkhead
    /// and every complex.
    pub const FALLBACK: ObjectiveKind = ObjectiveKind::HsuFindSample;

    /// Objectives that end in a final extraction and so only make sense on
    /// the Main bulkhead
    pub fn requires_extraction(&self) -> bool {
        matches!(self, Self::ClearPath | Self::Survival)
    }

    /// Objectives reserved for the Main bulkhead
    pub fn main_only(&self) -> bool {
        matches!(
            self,
            Self::ReactorStartup
                | Self::ReactorShutdown
                | Self::CentralGeneratorCluster
                | Self::TimedTerminalSequence
        )
    }

    /// Fixed geometry the objective cannot be built without
    pub fn required_geometry(&self) -> Option<Geometry> {
        match self {
            Self::ReactorStartup | Self::ReactorShutdown => Some(Geometry::Reactor),
            Self::CentralGeneratorCluster => Some(Geometry::GeneratorCluster),
            _ => None,
        }
    }

    pub fn allowed_in(&self, bulkhead: Bulkhead) -> bool {
        bulkhead.is_primary() || !(self.requires_extraction() || self.main_only())
    }
}

/// Opaque small-item token collected by GatherSmallItems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmallItem {
    Id,
    Gls,
    Pd,
    Osip,
    PlantSample,
    MemoryStick,
    DataCube,
}

impl SmallItem {
    const ALL: [SmallItem; 7] = [
        SmallItem::Id,
        SmallItem::Gls,
        SmallItem::Pd,
        SmallItem::Osip,
        SmallItem::PlantSample,
        SmallItem::MemoryStick,
        SmallItem::DataCube,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            SmallItem::Id => "id",
            SmallItem::Gls => "gls",
            SmallItem::Pd => "pd",
            SmallItem::Osip => "osip",
            SmallItem::PlantSample => "plant_sample",
            SmallItem::MemoryStick => "memory_stick",
            SmallItem::DataCube => "data_cube",
        }
    }
}

/// Opaque big-item token carried by RetrieveBigItems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BigItem {
    MatterWaveProjector,
    DataSphere,
    CargoCrate,
    Neonate,
    Cryo,
}

impl BigItem {
    pub fn token(&self) -> &'static str {
        match self {
            BigItem::MatterWaveProjector => "matter_wave_projector",
            BigItem::DataSphere => "data_sphere",
            BigItem::CargoCrate => "cargo_crate",
            BigItem::Neonate => "neonate",
            BigItem::Cryo => "cryo",
        }
    }
}

/// Terminal command families for SpecialTerminalCommand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalCommand {
    LightsOff,
    FogFlood,
    ErrorAlarm,
    KingOfTheHill,
}

/// Objective-specific parameters produced by the prebuild step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectiveParams {
    HsuFindSample { candidate_zones: u32 },
    ReactorStartup { waves: u32, fetch_code_waves: u32 },
    ReactorShutdown { verify_on_terminal: bool },
    GatherSmallItems { item: SmallItem, count: u32, spread_zones: u32 },
    ClearPath,
    SpecialTerminalCommand { command: TerminalCommand },
    RetrieveBigItems { items: Vec<BigItem> },
    PowerCellDistribution { generators: u32 },
    TerminalUplink { uplinks: u32, words: u32 },
    CentralGeneratorCluster { cells: u32 },
    HsuActivateSmall,
    Survival { seconds: u32 },
    GatherTerminal { terminals: u32, required: u32 },
    CorruptedTerminalUplink { uplinks: u32 },
    TimedTerminalSequence { rounds: u32, terminals: u32 },
}

/// Type-tagged objective record carried by a director
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub kind: ObjectiveKind,
    pub params: ObjectiveParams,
}

impl Objective {
    /// Roll parameters for `kind`. Counts grow with tier and shrink on
    /// secondary bulkheads.
    pub fn prebuild(kind: ObjectiveKind, tier: Tier, bulkhead: Bulkhead, rng: &mut Generator) -> Self {
        let rank = tier.rank();
        let secondary = !bulkhead.is_primary();

        let params = match kind {
            ObjectiveKind::HsuFindSample => ObjectiveParams::HsuFindSample {
                candidate_zones: rng.range(1, 1 + rank / 2),
            },
            ObjectiveKind::ReactorStartup => {
                let waves = rng.range(3 + rank, 5 + rank);
                let fetch_code_waves = match tier {
                    Tier::A | Tier::B => 0,
                    Tier::C => rng.range(0, 1),
                    Tier::D => rng.range(1, 2),
                    Tier::E => rng.range(1, 3),
                };
                ObjectiveParams::ReactorStartup {
                    waves,
                    fetch_code_waves: fetch_code_waves.min(waves),
                }
            }
            ObjectiveKind::ReactorShutdown => ObjectiveParams::ReactorShutdown {
                verify_on_terminal: rank >= 2 && rng.flip(0.5),
            },
            ObjectiveKind::GatherSmallItems => {
                let item = rng
                    .pick(&SmallItem::ALL)
                    .copied()
                    .unwrap_or(SmallItem::Id);
                let count = match (tier, secondary) {
                    (Tier::A, _) => rng.range(4, 6),
                    (Tier::B, _) => rng.range(5, 8),
                    (Tier::C, false) => rng.range(7, 10),
                    (Tier::D, false) => rng.range(9, 12),
                    (Tier::E, false) => rng.range(10, 14),
                    (_, true) => rng.range(5, 8),
                };
                ObjectiveParams::GatherSmallItems {
                    item,
                    count,
                    spread_zones: rng.range(2, 3 + rank / 2),
                }
            }
            ObjectiveKind::ClearPath => ObjectiveParams::ClearPath,
            ObjectiveKind::SpecialTerminalCommand => {
                let command = rng
                    .select_copy(&[
                        (1.0, TerminalCommand::LightsOff),
                        (1.0, TerminalCommand::FogFlood),
                        (0.5 * rank as f64, TerminalCommand::ErrorAlarm),
                        (0.5, TerminalCommand::KingOfTheHill),
                    ])
                    .unwrap_or(TerminalCommand::LightsOff);
                ObjectiveParams::SpecialTerminalCommand { command }
            }
            ObjectiveKind::RetrieveBigItems => {
                let count = if secondary || rank < 2 { 1 } else { rng.range(1, 2) };
                let pool = [
                    BigItem::MatterWaveProjector,
                    BigItem::DataSphere,
                    BigItem::CargoCrate,
                    BigItem::Neonate,
                    BigItem::Cryo,
                ];
                let items = (0..count)
                    .map(|_| rng.pick(&pool).copied().unwrap_or(BigItem::CargoCrate))
                    .collect();
                ObjectiveParams::RetrieveBigItems { items }
            }
            ObjectiveKind::PowerCellDistribution => ObjectiveParams::PowerCellDistribution {
                generators: if secondary {
                    rng.range(2, 3)
                } else {
                    rng.range(2, 3 + rank / 2)
                },
            },
            ObjectiveKind::TerminalUplink => ObjectiveParams::TerminalUplink {
                uplinks: if secondary {
                    1
                } else {
                    rng.range(1, 1 + (rank + 1) / 2)
                },
                words: rng.range(4, 6 + rank),
            },
            ObjectiveKind::CentralGeneratorCluster => ObjectiveParams::CentralGeneratorCluster {
                cells: rng.range(2 + rank / 2, 4 + rank / 2),
            },
            ObjectiveKind::HsuActivateSmall => ObjectiveParams::HsuActivateSmall,
            ObjectiveKind::Survival => ObjectiveParams::Survival {
                seconds: 60 * rng.range(4 + rank, 6 + rank * 2),
            },
            ObjectiveKind::GatherTerminal => {
                let terminals = rng.range(3, 4 + rank / 2);
                ObjectiveParams::GatherTerminal {
                    terminals,
                    required: terminals.saturating_sub(rng.range(0, 1)).max(1),
                }
            }
            ObjectiveKind::CorruptedTerminalUplink => ObjectiveParams::CorruptedTerminalUplink {
                uplinks: rng.range(1, 1 + rank / 2),
            },
            ObjectiveKind::TimedTerminalSequence => ObjectiveParams::TimedTerminalSequence {
                rounds: rng.range(2, 3 + rank / 2),
                terminals: rng.range(3, 4),
            },
        };

        Self { kind, params }
    }

    /// Generic "how many of the thing" used by handlers that spread content
    pub fn count(&self) -> u32 {
        match &self.params {
            ObjectiveParams::HsuFindSample { candidate_zones } => *candidate_zones,
            ObjectiveParams::ReactorStartup { waves, .. } => *waves,
            ObjectiveParams::GatherSmallItems { count, .. } => *count,
            ObjectiveParams::RetrieveBigItems { items } => items.len() as u32,
            ObjectiveParams::PowerCellDistribution { generators } => *generators,
            ObjectiveParams::TerminalUplink { uplinks, .. } => *uplinks,
            ObjectiveParams::CentralGeneratorCluster { cells } => *cells,
            ObjectiveParams::GatherTerminal { terminals, .. } => *terminals,
            ObjectiveParams::CorruptedTerminalUplink { uplinks } => *uplinks,
            ObjectiveParams::TimedTerminalSequence { terminals, .. } => *terminals,
            ObjectiveParams::ReactorShutdown { .. }
            | ObjectiveParams::ClearPath
            | ObjectiveParams::SpecialTerminalCommand { .. }
            | ObjectiveParams::HsuActivateSmall
            | ObjectiveParams::Survival { .. } => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_is_legal_everywhere() {
        let fallback = ObjectiveKind::FALLBACK;
        for bulkhead in Bulkhead::ALL {
            assert!(fallback.allowed_in(bulkhead));
        }
        assert!(fallback.required_geometry().is_none());
    }

    #[test]
    fn test_extraction_objectives_main_only() {
        assert!(!ObjectiveKind::ClearPath.allowed_in(Bulkhead::Extreme));
        assert!(!ObjectiveKind::Survival.allowed_in(Bulkhead::Overload));
        assert!(ObjectiveKind::ClearPath.allowed_in(Bulkhead::Main));
        assert!(!ObjectiveKind::ReactorStartup.allowed_in(Bulkhead::Extreme));
        assert!(ObjectiveKind::GatherSmallItems.allowed_in(Bulkhead::Overload));
    }

    #[test]
    fn test_prebuild_matches_kind() {
        let mut rng = Generator::seeded("prebuild");
        for kind in ObjectiveKind::ALL {
            for tier in Tier::ALL {
                let objective = Objective::prebuild(kind, tier, Bulkhead::Main, &mut rng);
                assert_eq!(objective.kind, kind);
                assert!(objective.count() >= 1, "{kind:?} on {tier} rolled zero");
            }
        }
    }

    #[test]
    fn test_reactor_fetch_waves_bounded_by_waves() {
        let mut rng = Generator::seeded("reactor");
        for _ in 0..200 {
            let objective =
                Objective::prebuild(ObjectiveKind::ReactorStartup, Tier::E, Bulkhead::Main, &mut rng);
            match objective.params {
                ObjectiveParams::ReactorStartup {
                    waves,
                    fetch_code_waves,
                } => assert!(fetch_code_waves <= waves),
                other => panic!("unexpected params {other:?}"),
            }
        }
    }

    #[test]
    fn test_params_serialize_tagged() {
        let objective = Objective {
            kind: ObjectiveKind::GatherSmallItems,
            params: ObjectiveParams::GatherSmallItems {
                item: SmallItem::Gls,
                count: 6,
                spread_zones: 2,
            },
        };
        let json = serde_json::to_string(&objective).unwrap();
        assert!(json.contains("\"type\":\"gather_small_items\""));
        let back: Objective = serde_json::from_str(&json).unwrap();
        assert_eq!(back, objective);
    }
}
