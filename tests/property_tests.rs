//! Property-based tests using proptest
//!
//! Invariants that must hold for ALL seeds:
//! - Levels: any seed, tier and bulkhead set -> structurally valid level
//! - Determinism: same seed -> identical level
//! - Budgets: assigned points never exceed the branch ceiling
//! - Weighted selection: only positive weights are ever picked

use proptest::prelude::*;

use rundown_core::layout::tags;
use rundown_core::objective::ObjectiveKind;
use rundown_core::random::Generator;
use rundown_core::validate::validate_level;
use rundown_core::{build_level, Bulkhead, Complex, LayoutOptions, LevelLayout, LevelRequest, Tier};

fn tier_strategy() -> impl Strategy<Value = Tier> {
    prop::sample::select(Tier::ALL.to_vec())
}

fn complex_strategy() -> impl Strategy<Value = Complex> {
    prop::sample::select(Complex::ALL.to_vec())
}

fn secondaries_strategy() -> impl Strategy<Value = Vec<Bulkhead>> {
    prop::sample::select(vec![
        vec![],
        vec![Bulkhead::Extreme],
        vec![Bulkhead::Extreme, Bulkhead::Overload],
    ])
}

fn build(seed: &str, tier: Tier, complex: Complex, secondaries: &[Bulkhead]) -> LevelLayout {
    let mut rng = Generator::seeded(seed);
    let request = LevelRequest::new(tier, 1, complex).with_bulkheads(secondaries);
    build_level(&mut rng, LayoutOptions::default(), &request).expect("level build aborted")
}

// ============================================================
// Level Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_any_seed_builds_valid_level(
        seed in "[a-z0-9-]{1,16}",
        tier in tier_strategy(),
        complex in complex_strategy(),
        secondaries in secondaries_strategy(),
    ) {
        let level = build(&seed, tier, complex, &secondaries);
        let violations = validate_level(&level);
        prop_assert!(violations.is_empty(), "seed {seed}: {violations:?}");
        prop_assert_eq!(level.roots().len(), 1);
        prop_assert_eq!(level.zones_with_tag(tags::EXTRACTION).len(), 1);
        prop_assert_eq!(level.branches.len(), secondaries.len() + 1);
    }

    #[test]
    fn prop_level_is_deterministic(
        seed in "[a-z0-9-]{1,16}",
        tier in tier_strategy(),
        complex in complex_strategy(),
        secondaries in secondaries_strategy(),
    ) {
        let a = build(&seed, tier, complex, &secondaries);
        let b = build(&seed, tier, complex, &secondaries);
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_budget_within_ceiling(
        seed in "[a-z0-9-]{1,16}",
        tier in tier_strategy(),
        secondaries in secondaries_strategy(),
    ) {
        let level = build(&seed, tier, Complex::Mining, &secondaries);
        for branch in &level.branches {
            prop_assert!(
                branch.points_assigned() <= branch.ceiling,
                "{} assigned {} over {}",
                branch.bulkhead,
                branch.points_assigned(),
                branch.ceiling
            );
        }
    }

    #[test]
    fn prop_no_objective_repeats_within_level(
        seed in "[a-z0-9-]{1,16}",
        tier in tier_strategy(),
    ) {
        let level = build(&seed, tier, Complex::Tech, &[Bulkhead::Extreme, Bulkhead::Overload]);
        let mut kinds: Vec<ObjectiveKind> = level.branches.iter().map(|b| b.objective.kind).collect();
        let before = kinds.len();
        kinds.sort_by_key(|k| format!("{k:?}"));
        kinds.dedup();
        prop_assert_eq!(kinds.len(), before);
    }
}

// ============================================================
// Random Engine Properties
// ============================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_select_skips_zero_weights(
        seed in "[a-z]{1,8}",
        weights in prop::collection::vec(prop_oneof![Just(0.0), 0.1f64..10.0], 1..8),
    ) {
        prop_assume!(weights.iter().any(|w| *w > 0.0));
        let mut rng = Generator::seeded(&seed);
        for _ in 0..50 {
            let index = rng.select_index(&weights).unwrap();
            prop_assert!(weights[index] > 0.0, "picked zero weight at {index} of {weights:?}");
        }
    }

    #[test]
    fn prop_range_stays_inside(seed in "[a-z]{1,8}", lo in 0u32..100, span in 0u32..100) {
        let mut rng = Generator::seeded(&seed);
        for _ in 0..20 {
            let value = rng.range(lo, lo + span);
            prop_assert!(value >= lo && value <= lo + span);
        }
    }
}
