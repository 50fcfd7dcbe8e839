//! Difficulty director.
//!
//! One director per bulkhead per level. It owns the bulkhead's point budget,
//! the objective chosen for it and the enemy group pool zones draw from, and
//! moves through Prebuild -> Build -> Postbuild exactly once.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::COVERAGE_NORMALIZATION;
use crate::level::{Bulkhead, Complex, Complexity, Tier};
use crate::objective::{Objective, ObjectiveKind};
use crate::planner::zone::Zone;
use crate::random::{FrequencyPool, Generator};

/// Lifecycle of a director
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DirectorPhase {
    Prebuild,
    Build,
    Postbuild,
}

/// Opaque enemy group token with its point cost
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyGroup {
    pub token: String,
    pub cost: u32,
}

impl EnemyGroup {
    pub fn new(token: &str, cost: u32) -> Self {
        Self {
            token: token.to_string(),
            cost,
        }
    }
}

/// Fixed budget lookup keyed by tier and bulkhead
pub fn compute_budget(tier: Tier, bulkhead: Bulkhead) -> u32 {
    match (tier, bulkhead) {
        (Tier::A, Bulkhead::Main) => 60,
        (Tier::A, Bulkhead::Extreme) => 40,
        (Tier::A, Bulkhead::Overload) => 30,
        (Tier::B, Bulkhead::Main) => 100,
        (Tier::B, Bulkhead::Extreme) => 70,
        (Tier::B, Bulkhead::Overload) => 50,
        (Tier::C, Bulkhead::Main) => 160,
        (Tier::C, Bulkhead::Extreme) => 110,
        (Tier::C, Bulkhead::Overload) => 80,
        (Tier::D, Bulkhead::Main) => 230,
        (Tier::D, Bulkhead::Extreme) => 160,
        (Tier::D, Bulkhead::Overload) => 120,
        (Tier::E, Bulkhead::Main) => 320,
        (Tier::E, Bulkhead::Extreme) => 220,
        (Tier::E, Bulkhead::Overload) => 170,
    }
}

/// Fraction a branch may overshoot its budget
pub fn budget_tolerance(tier: Tier) -> f64 {
    match tier {
        Tier::A => 0.0,
        Tier::B => 0.05,
        Tier::C => 0.10,
        Tier::D => 0.15,
        Tier::E => 0.20,
    }
}

/// Hard ceiling for a branch: budget plus tier tolerance, rounded down
pub fn budget_ceiling(tier: Tier, bulkhead: Bulkhead) -> u32 {
    let budget = compute_budget(tier, bulkhead) as f64;
    (budget * (1.0 + budget_tolerance(tier))).floor() as u32
}

fn tier_point_range(tier: Tier) -> (f64, f64) {
    match tier {
        Tier::A => (2.0, 3.0),
        Tier::B => (2.5, 3.5),
        Tier::C => (3.0, 4.5),
        Tier::D => (4.0, 5.5),
        Tier::E => (5.0, 7.0),
    }
}

/// Raw point request for a zone before the director clamps it
pub fn points_for_zone(zone: &Zone, tier: Tier, rng: &mut Generator) -> u32 {
    let (lo, hi) = tier_point_range(tier);
    let coverage = (zone.coverage.min + zone.coverage.max) / 2.0;
    let raw = coverage / COVERAGE_NORMALIZATION * zone.enemy_multiplier * rng.range_f64(lo, hi);
    raw.max(0.0).round() as u32
}

/// Choose an objective from the catalog minus exclusions, bulkhead
/// restrictions and tileset restrictions. Collapses to
/// [`ObjectiveKind::FALLBACK`] instead of failing.
pub fn select_objective(
    excluded: &[ObjectiveKind],
    bulkhead: Bulkhead,
    complex: Complex,
    rng: &mut Generator,
) -> ObjectiveKind {
    let candidates: Vec<ObjectiveKind> = ObjectiveKind::ALL
        .iter()
        .copied()
        .filter(|kind| objective_fits(*kind, excluded, bulkhead, complex))
        .collect();

    match rng.pick(&candidates) {
        Some(kind) => *kind,
        None => {
            debug!(
                ?bulkhead,
                ?complex,
                excluded = excluded.len(),
                "objective candidates exhausted, using fallback"
            );
            ObjectiveKind::FALLBACK
        }
    }
}

/// Whether `kind` may be used: not excluded, allowed in the bulkhead and
/// supported by the complex's geometry
pub fn objective_fits(kind: ObjectiveKind, excluded: &[ObjectiveKind], bulkhead: Bulkhead, complex: Complex) -> bool {
    !excluded.contains(&kind)
        && kind.allowed_in(bulkhead)
        && kind
            .required_geometry()
            .map_or(true, |geometry| complex.supports(geometry))
}

fn enemy_pool(tier: Tier) -> FrequencyPool<EnemyGroup> {
    let pool = FrequencyPool::new()
        .with_recurring(6.0, 8, EnemyGroup::new("striker_pack", 4))
        .with_recurring(3.0, 6, EnemyGroup::new("shooter_pack", 5))
        .with_recurring(1.0 + tier.rank() as f64, 4, EnemyGroup::new("big_striker", 8));

    match tier {
        Tier::A => pool,
        Tier::B => pool.with_forced(1.0, EnemyGroup::new("charger_pack", 10)),
        Tier::C => pool
            .with_forced(1.0, EnemyGroup::new("charger_pack", 10))
            .with_forced(1.0, EnemyGroup::new("shadow_pack", 10)),
        Tier::D => pool
            .with_recurring(1.5, 3, EnemyGroup::new("hybrid_pack", 9))
            .with_forced(1.0, EnemyGroup::new("charger_pack", 10))
            .with_forced(1.0, EnemyGroup::new("shadow_pack", 10))
            .with_forced(1.0, EnemyGroup::new("big_shooter", 12)),
        Tier::E => pool
            .with_recurring(2.0, 4, EnemyGroup::new("hybrid_pack", 9))
            .with_forced(1.0, EnemyGroup::new("charger_pack", 10))
            .with_forced(1.0, EnemyGroup::new("shadow_pack", 10))
            .with_forced(1.0, EnemyGroup::new("big_shooter", 12))
            .with_forced(1.0, EnemyGroup::new("big_charger", 14)),
    }
}

/// Read-only snapshot handed to objective handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectorView {
    pub bulkhead: Bulkhead,
    pub tier: Tier,
    pub complex: Complex,
    pub complexity: Complexity,
}

/// Per-bulkhead difficulty state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildDirector {
    pub bulkhead: Bulkhead,
    pub tier: Tier,
    pub complex: Complex,
    pub complexity: Complexity,
    pub objective: Option<Objective>,
    /// Budget from [`compute_budget`]
    pub points: u32,
    /// Points already granted to zones
    pub spent: u32,
    phase: DirectorPhase,
    enemy_pool: FrequencyPool<EnemyGroup>,
}

impl BuildDirector {
    pub fn new(tier: Tier, bulkhead: Bulkhead, complex: Complex, rng: &mut Generator) -> Self {
        Self {
            bulkhead,
            tier,
            complex,
            complexity: Complexity::roll(tier, rng),
            objective: None,
            points: compute_budget(tier, bulkhead),
            spent: 0,
            phase: DirectorPhase::Prebuild,
            enemy_pool: enemy_pool(tier),
        }
    }

    pub fn phase(&self) -> DirectorPhase {
        self.phase
    }

    pub fn view(&self) -> DirectorView {
        DirectorView {
            bulkhead: self.bulkhead,
            tier: self.tier,
            complex: self.complex,
            complexity: self.complexity,
        }
    }

    pub fn objective_kind(&self) -> Option<ObjectiveKind> {
        self.objective.as_ref().map(|o| o.kind)
    }

    /// Prebuild: choose (or accept a pinned) objective and roll its params
    pub fn prebuild(
        &mut self,
        pinned: Option<ObjectiveKind>,
        excluded: &[ObjectiveKind],
        rng: &mut Generator,
    ) -> &Objective {
        assert_eq!(
            self.phase,
            DirectorPhase::Prebuild,
            "director prebuild called twice for {:?}",
            self.bulkhead
        );
        let kind = match pinned {
            Some(kind) if objective_fits(kind, excluded, self.bulkhead, self.complex) => kind,
            Some(kind) => {
                warn!(
                    ?kind,
                    bulkhead = ?self.bulkhead,
                    complex = ?self.complex,
                    "pinned objective excluded or unsupported here, rolling instead"
                );
                select_objective(excluded, self.bulkhead, self.complex, rng)
            }
            None => select_objective(excluded, self.bulkhead, self.complex, rng),
        };
        self.phase = DirectorPhase::Build;
        self.objective
            .insert(Objective::prebuild(kind, self.tier, self.bulkhead, rng))
    }

    pub fn ceiling(&self) -> u32 {
        budget_ceiling(self.tier, self.bulkhead)
    }

    pub fn remaining(&self) -> u32 {
        self.ceiling().saturating_sub(self.spent)
    }

    /// Grant up to `requested` points, never letting the branch total pass
    /// the tier ceiling. Returns the granted amount.
    pub fn allocate(&mut self, requested: u32) -> u32 {
        assert_eq!(
            self.phase,
            DirectorPhase::Build,
            "points allocated outside the build phase for {:?}",
            self.bulkhead
        );
        let granted = requested.min(self.remaining());
        self.spent += granted;
        granted
    }

    /// Spend a zone's granted points on enemy groups. Only groups that still
    /// fit are drawn, until none does; whatever is left goes back to the
    /// bulkhead's budget for later zones.
    pub fn draw_enemy_groups(&mut self, points: u32, rng: &mut Generator) -> Vec<EnemyGroup> {
        let mut left = points;
        let mut groups = Vec::new();
        while left > 0 {
            let fits = |group: &EnemyGroup| group.cost > 0 && group.cost <= left;
            let Some(group) = self.enemy_pool.draw_where(rng, fits) else {
                break;
            };
            left -= group.cost;
            groups.push(group);
        }
        self.spent = self.spent.saturating_sub(left);
        groups
    }

    pub fn finish(&mut self) {
        assert_eq!(
            self.phase,
            DirectorPhase::Build,
            "director finished before build for {:?}",
            self.bulkhead
        );
        self.phase = DirectorPhase::Postbuild;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::zone::{Coverage, Zone};

    #[test]
    fn test_budget_grows_with_tier() {
        for bulkhead in Bulkhead::ALL {
            let budgets: Vec<u32> = Tier::ALL.iter().map(|t| compute_budget(*t, bulkhead)).collect();
            assert!(budgets.windows(2).all(|w| w[0] < w[1]), "{bulkhead:?}: {budgets:?}");
        }
        assert!(compute_budget(Tier::C, Bulkhead::Main) > compute_budget(Tier::C, Bulkhead::Extreme));
    }

    #[test]
    fn test_ceiling_uses_tolerance() {
        assert_eq!(budget_ceiling(Tier::A, Bulkhead::Main), 60);
        assert_eq!(budget_ceiling(Tier::E, Bulkhead::Main), 384);
    }

    #[test]
    fn test_exclusion_collapse_returns_fallback() {
        let mut rng = Generator::seeded("collapse");
        for bulkhead in Bulkhead::ALL {
            for complex in Complex::ALL {
                let kind = select_objective(&ObjectiveKind::ALL, bulkhead, complex, &mut rng);
                assert_eq!(kind, ObjectiveKind::FALLBACK);
            }
        }
    }

    #[test]
    fn test_selection_respects_restrictions() {
        let mut rng = Generator::seeded("restrict");
        for _ in 0..500 {
            let kind = select_objective(&[], Bulkhead::Extreme, Complex::Service, &mut rng);
            assert!(kind.allowed_in(Bulkhead::Extreme));
            assert_ne!(kind, ObjectiveKind::ReactorStartup);
            assert_ne!(kind, ObjectiveKind::ClearPath);

            let kind = select_objective(&[], Bulkhead::Main, Complex::Service, &mut rng);
            assert_ne!(kind, ObjectiveKind::ReactorShutdown);
            assert_ne!(kind, ObjectiveKind::ReactorStartup);

            let kind = select_objective(&[], Bulkhead::Main, Complex::Tech, &mut rng);
            assert_ne!(kind, ObjectiveKind::CentralGeneratorCluster);
        }
    }

    #[test]
    fn test_selection_honours_exclusions() {
        let mut rng = Generator::seeded("exclude");
        let excluded = [ObjectiveKind::GatherSmallItems, ObjectiveKind::HsuFindSample];
        for _ in 0..300 {
            let kind = select_objective(&excluded, Bulkhead::Main, Complex::Mining, &mut rng);
            assert!(!excluded.contains(&kind));
        }
    }

    #[test]
    fn test_points_for_zone_scales_with_coverage_and_tier() {
        let mut rng = Generator::seeded("points");
        let mut zone = Zone::default();
        zone.coverage = Coverage { min: 40.0, max: 60.0 };
        zone.enemy_multiplier = 1.0;
        for _ in 0..100 {
            let a = points_for_zone(&zone, Tier::A, &mut rng);
            assert!((10..=15).contains(&a), "tier A points {a}");
            let e = points_for_zone(&zone, Tier::E, &mut rng);
            assert!((25..=35).contains(&e), "tier E points {e}");
        }
        zone.enemy_multiplier = 0.0;
        assert_eq!(points_for_zone(&zone, Tier::E, &mut rng), 0);
    }

    #[test]
    fn test_allocation_never_exceeds_ceiling() {
        let mut rng = Generator::seeded("alloc");
        let mut director = BuildDirector::new(Tier::C, Bulkhead::Main, Complex::Mining, &mut rng);
        director.prebuild(None, &[], &mut rng);
        let mut total = 0;
        for _ in 0..40 {
            total += director.allocate(25);
        }
        assert_eq!(total, director.ceiling());
        assert_eq!(director.allocate(10), 0);
    }

    #[test]
    #[should_panic(expected = "outside the build phase")]
    fn test_allocation_before_prebuild_is_a_bug() {
        let mut rng = Generator::seeded("early");
        let mut director = BuildDirector::new(Tier::B, Bulkhead::Main, Complex::Tech, &mut rng);
        director.allocate(5);
    }

    #[test]
    fn test_pinned_objective_rejected_on_wrong_bulkhead() {
        let mut rng = Generator::seeded("pinned");
        let mut director = BuildDirector::new(Tier::D, Bulkhead::Extreme, Complex::Mining, &mut rng);
        let objective = director.prebuild(Some(ObjectiveKind::ClearPath), &[], &mut rng);
        assert_ne!(objective.kind, ObjectiveKind::ClearPath);
        assert_eq!(director.phase(), DirectorPhase::Build);
    }

    #[test]
    fn test_pinned_objective_obeys_exclusions_and_tileset() {
        let mut rng = Generator::seeded("pinned-filters");
        let mut taken = BuildDirector::new(Tier::D, Bulkhead::Extreme, Complex::Tech, &mut rng);
        let objective = taken.prebuild(
            Some(ObjectiveKind::GatherSmallItems),
            &[ObjectiveKind::GatherSmallItems],
            &mut rng,
        );
        assert_ne!(objective.kind, ObjectiveKind::GatherSmallItems);

        let mut reactorless = BuildDirector::new(Tier::C, Bulkhead::Main, Complex::Service, &mut rng);
        let objective = reactorless.prebuild(Some(ObjectiveKind::ReactorStartup), &[], &mut rng);
        assert!(objective.kind.required_geometry().map_or(true, |g| Complex::Service.supports(g)));

        let mut fine = BuildDirector::new(Tier::C, Bulkhead::Main, Complex::Mining, &mut rng);
        let objective = fine.prebuild(Some(ObjectiveKind::ReactorStartup), &[], &mut rng);
        assert_eq!(objective.kind, ObjectiveKind::ReactorStartup);
    }

    #[test]
    fn test_enemy_groups_fit_points() {
        let mut rng = Generator::seeded("groups");
        let mut director = BuildDirector::new(Tier::E, Bulkhead::Main, Complex::Tech, &mut rng);
        for points in [0, 3, 12, 40] {
            let groups = director.draw_enemy_groups(points, &mut rng);
            let cost: u32 = groups.iter().map(|g| g.cost).sum();
            assert!(cost <= points);
        }
    }

    #[test]
    fn test_draining_a_branch_keeps_hard_groups_and_spends_points() {
        let hard = ["charger_pack", "shadow_pack", "big_shooter", "big_charger"];
        let mut rng = Generator::seeded("drain");
        let mut director = BuildDirector::new(Tier::E, Bulkhead::Main, Complex::Mining, &mut rng);
        director.prebuild(None, &[], &mut rng);

        let mut placed = Vec::new();
        let mut assigned = 0;
        for _ in 0..40 {
            let granted = director.allocate(30);
            let groups = director.draw_enemy_groups(granted, &mut rng);
            let cost: u32 = groups.iter().map(|g| g.cost).sum();
            let left = granted - cost;
            assert!(
                !director.enemy_pool.can_draw_where(|g| g.cost > 0 && g.cost <= left),
                "{left} points left while an affordable group remains"
            );
            assigned += cost;
            placed.extend(groups.into_iter().map(|g| g.token));
        }

        for token in hard {
            assert_eq!(placed.iter().filter(|t| *t == token).count(), 1, "{token}");
        }
        assert_eq!(director.enemy_pool.forced_remaining(), 0);
        assert_eq!(director.spent, assigned);
        assert!(director.ceiling() - assigned < 4);
    }
}
