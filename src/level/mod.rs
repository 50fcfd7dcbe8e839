//! Level vocabulary: difficulty tiers, bulkheads, complexes and the request
//! that describes one level to build.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::objective::ObjectiveKind;
use crate::random::Generator;

/// Difficulty band. A is the easiest, E the hardest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tier {
    A,
    B,
    C,
    D,
    E,
}

impl Tier {
    pub const ALL: [Tier; 5] = [Tier::A, Tier::B, Tier::C, Tier::D, Tier::E];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::A => "A",
            Tier::B => "B",
            Tier::C => "C",
            Tier::D => "D",
            Tier::E => "E",
        }
    }

    /// 0 for A through 4 for E
    pub fn rank(&self) -> u32 {
        match self {
            Tier::A => 0,
            Tier::B => 1,
            Tier::C => 2,
            Tier::D => 3,
            Tier::E => 4,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Tier::A),
            "B" => Some(Tier::B),
            "C" => Some(Tier::C),
            "D" => Some(Tier::D),
            "E" => Some(Tier::E),
            _ => None,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mission branch kind. Main is the primary path; Extreme and Overload are
/// optional secondary paths behind their own bulkhead doors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Bulkhead {
    Main,
    Extreme,
    Overload,
}

impl Bulkhead {
    pub const ALL: [Bulkhead; 3] = [Bulkhead::Main, Bulkhead::Extreme, Bulkhead::Overload];

    pub fn is_primary(&self) -> bool {
        matches!(self, Bulkhead::Main)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Bulkhead::Main => "Main",
            Bulkhead::Extreme => "Extreme",
            Bulkhead::Overload => "Overload",
        }
    }
}

impl fmt::Display for Bulkhead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tileset family. Constrains which structural fragments are legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Complex {
    Mining,
    Tech,
    Service,
}

impl Complex {
    pub const ALL: [Complex; 3] = [Complex::Mining, Complex::Tech, Complex::Service];

    /// Whether this tileset carries the given fixed geometry
    pub fn supports(&self, geometry: Geometry) -> bool {
        match geometry {
            Geometry::Reactor => matches!(self, Complex::Mining | Complex::Tech),
            Geometry::GeneratorCluster => matches!(self, Complex::Mining | Complex::Service),
            Geometry::Garden => matches!(self, Complex::Service),
            Geometry::Elevator
            | Geometry::Hub
            | Geometry::Exit
            | Geometry::BossArena
            | Geometry::ApexChamber
            | Geometry::BulkheadHub => true,
        }
    }

    /// Weighted complex roll for a new level
    pub fn roll(rng: &mut Generator) -> Self {
        rng.select_copy(&[
            (1.0, Complex::Mining),
            (1.0, Complex::Tech),
            (0.8, Complex::Service),
        ])
        .unwrap_or(Complex::Mining)
    }
}

/// Fixed geometry a zone may request. Concrete tile assets are chosen by the
/// host; the core only knows which families exist per complex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Geometry {
    Elevator,
    Hub,
    BulkheadHub,
    Exit,
    Reactor,
    GeneratorCluster,
    BossArena,
    ApexChamber,
    Garden,
}

/// Structural complexity rolled per director; scales chain lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn roll(tier: Tier, rng: &mut Generator) -> Self {
        let table: [(f64, Complexity); 3] = match tier {
            Tier::A => [(0.7, Self::Low), (0.3, Self::Medium), (0.0, Self::High)],
            Tier::B => [(0.5, Self::Low), (0.4, Self::Medium), (0.1, Self::High)],
            Tier::C => [(0.3, Self::Low), (0.5, Self::Medium), (0.2, Self::High)],
            Tier::D => [(0.2, Self::Low), (0.4, Self::Medium), (0.4, Self::High)],
            Tier::E => [(0.1, Self::Low), (0.3, Self::Medium), (0.6, Self::High)],
        };
        rng.select_copy(&table).unwrap_or(Complexity::Medium)
    }

    /// Extra zones handlers add to their chains
    pub fn extra_zones(&self) -> u32 {
        match self {
            Complexity::Low => 0,
            Complexity::Medium => 1,
            Complexity::High => 2,
        }
    }
}

/// How secondary bulkheads attach to the starting area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BulkheadTopology {
    /// Bulkhead doors sit one after another along a single corridor
    SingleChain,
    /// One hub zone holds every bulkhead door
    SharedHub,
    /// Each bulkhead door hangs off its own starting-area zone
    IndependentRoots,
}

/// Everything needed to build one level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelRequest {
    pub tier: Tier,
    /// Position of the level within its tier, starting at 1
    pub index: u32,
    pub complex: Complex,
    pub bulkheads: Vec<Bulkhead>,
    /// Pin the objective per bulkhead; unpinned bulkheads roll one
    #[serde(default)]
    pub objectives: Vec<(Bulkhead, ObjectiveKind)>,
    /// Objectives to keep out of every bulkhead roll in this level
    #[serde(default)]
    pub excluded: Vec<ObjectiveKind>,
}

impl LevelRequest {
    pub fn new(tier: Tier, index: u32, complex: Complex) -> Self {
        Self {
            tier,
            index,
            complex,
            bulkheads: vec![Bulkhead::Main],
            objectives: Vec::new(),
            excluded: Vec::new(),
        }
    }

    pub fn with_bulkheads(mut self, bulkheads: &[Bulkhead]) -> Self {
        let mut list: Vec<Bulkhead> = bulkheads.to_vec();
        if !list.contains(&Bulkhead::Main) {
            list.push(Bulkhead::Main);
        }
        list.sort();
        list.dedup();
        self.bulkheads = list;
        self
    }

    pub fn with_objective(mut self, bulkhead: Bulkhead, objective: ObjectiveKind) -> Self {
        self.objectives.retain(|(b, _)| *b != bulkhead);
        self.objectives.push((bulkhead, objective));
        self
    }

    pub fn pinned_objective(&self, bulkhead: Bulkhead) -> Option<ObjectiveKind> {
        self.objectives
            .iter()
            .find(|(b, _)| *b == bulkhead)
            .map(|(_, o)| *o)
    }

    pub fn has_secondary(&self) -> bool {
        self.bulkheads.iter().any(|b| !b.is_primary())
    }

    /// Short label used in logs, e.g. "C2"
    pub fn label(&self) -> String {
        format!("{}{}", self.tier, self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_order_and_labels() {
        assert!(Tier::A < Tier::E);
        assert_eq!(Tier::from_label("c"), Some(Tier::C));
        assert_eq!(Tier::from_label("Z"), None);
        assert_eq!(Tier::D.rank(), 3);
    }

    #[test]
    fn test_complex_geometry_support() {
        assert!(!Complex::Service.supports(Geometry::Reactor));
        assert!(Complex::Tech.supports(Geometry::Reactor));
        assert!(!Complex::Tech.supports(Geometry::GeneratorCluster));
        assert!(Complex::Service.supports(Geometry::Garden));
        assert!(!Complex::Mining.supports(Geometry::Garden));
        for complex in Complex::ALL {
            assert!(complex.supports(Geometry::Hub));
            assert!(complex.supports(Geometry::BossArena));
        }
    }

    #[test]
    fn test_tier_a_never_rolls_high_complexity() {
        let mut rng = Generator::seeded("complexity");
        for _ in 0..500 {
            assert_ne!(Complexity::roll(Tier::A, &mut rng), Complexity::High);
        }
    }

    #[test]
    fn test_request_always_has_main() {
        let request = LevelRequest::new(Tier::B, 1, Complex::Tech)
            .with_bulkheads(&[Bulkhead::Overload, Bulkhead::Extreme]);
        assert_eq!(
            request.bulkheads,
            vec![Bulkhead::Main, Bulkhead::Extreme, Bulkhead::Overload]
        );
        assert!(request.has_secondary());
        assert_eq!(request.label(), "B1");
    }

    #[test]
    fn test_pinned_objective_replaces() {
        let request = LevelRequest::new(Tier::C, 2, Complex::Mining)
            .with_objective(Bulkhead::Main, ObjectiveKind::ClearPath)
            .with_objective(Bulkhead::Main, ObjectiveKind::GatherSmallItems);
        assert_eq!(
            request.pinned_objective(Bulkhead::Main),
            Some(ObjectiveKind::GatherSmallItems)
        );
        assert_eq!(request.pinned_objective(Bulkhead::Extreme), None);
    }
}
