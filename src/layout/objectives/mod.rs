//! Objective handlers.
//!
//! One handler per objective kind. Each receives the bulkhead's director
//! view, the prebuilt objective and the start zone, and grows the bulkhead's
//! graph from weighted template tables keyed by tier and bulkhead.

mod extraction;
mod items;
mod power;
mod reactor;
mod terminals;

use tracing::error;

use super::{fragment, Fragment};
use crate::director::DirectorView;
use crate::error::{GenResult, GenerationError};
use crate::layout::LayoutBuilder;
use crate::level::{Bulkhead, Geometry, Tier};
use crate::objective::{Objective, ObjectiveKind};
use crate::planner::ZoneId;

pub use extraction::{build_clear_path, build_survival};
pub use items::{build_gather_small_items, build_hsu_activate_small, build_hsu_find_sample, build_retrieve_big_items};
pub use power::{build_central_generator_cluster, build_power_cell_distribution};
pub use reactor::{build_reactor_shutdown, build_reactor_startup};
pub use terminals::{
    build_corrupted_terminal_uplink, build_gather_terminal, build_special_terminal_command,
    build_terminal_uplink, build_timed_terminal_sequence,
};

pub type ObjectiveHandler =
    fn(&mut LayoutBuilder<'_>, &DirectorView, &Objective, Option<ZoneId>) -> GenResult<()>;

pub fn handler_for(kind: ObjectiveKind) -> ObjectiveHandler {
    match kind {
        ObjectiveKind::HsuFindSample => build_hsu_find_sample,
        ObjectiveKind::ReactorStartup => build_reactor_startup,
        ObjectiveKind::ReactorShutdown => build_reactor_shutdown,
        ObjectiveKind::GatherSmallItems => build_gather_small_items,
        ObjectiveKind::ClearPath => build_clear_path,
        ObjectiveKind::SpecialTerminalCommand => build_special_terminal_command,
        ObjectiveKind::RetrieveBigItems => build_retrieve_big_items,
        ObjectiveKind::PowerCellDistribution => build_power_cell_distribution,
        ObjectiveKind::TerminalUplink => build_terminal_uplink,
        ObjectiveKind::CentralGeneratorCluster => build_central_generator_cluster,
        ObjectiveKind::HsuActivateSmall => build_hsu_activate_small,
        ObjectiveKind::Survival => build_survival,
        ObjectiveKind::GatherTerminal => build_gather_terminal,
        ObjectiveKind::CorruptedTerminalUplink => build_corrupted_terminal_uplink,
        ObjectiveKind::TimedTerminalSequence => build_timed_terminal_sequence,
    }
}

/// Abort the level when a handler has nowhere to start from
fn require_start(director: &DirectorView, objective: &Objective, start: Option<ZoneId>) -> GenResult<ZoneId> {
    start.ok_or_else(|| {
        error!(
            bulkhead = %director.bulkhead,
            objective = ?objective.kind,
            "objective handler has no start zone"
        );
        GenerationError::MissingStartZone {
            bulkhead: director.bulkhead,
            objective: objective.kind,
        }
    })
}

/// Zones between the bulkhead start and the objective area
fn approach_len(director: &DirectorView) -> u32 {
    let base = 1 + director.complexity.extra_zones() + director.tier.rank() / 2;
    if director.bulkhead.is_primary() {
        base
    } else {
        base.saturating_sub(1).max(1)
    }
}

/// Gated run from the bulkhead start to where the objective area begins
fn approach_templates<'t, 'g>(director: &DirectorView, start: ZoneId) -> Vec<Fragment<'t, 'g>> {
    let n = approach_len(director);
    let short = n.saturating_sub(1);
    let mut templates = match (director.tier, director.bulkhead) {
        (Tier::A, _) => vec![
            fragment(1.0, move |b| b.chain(start, n)),
            fragment(0.4, move |b| {
                let z = b.chain(start, short)?;
                b.build_challenge_keycard(z, 1)
            }),
        ],
        (Tier::B | Tier::C, Bulkhead::Main) => vec![
            fragment(1.0, move |b| b.chain(start, n)),
            fragment(0.8, move |b| {
                let z = b.chain(start, short)?;
                b.build_challenge_keycard(z, 1)
            }),
            fragment(0.5, move |b| {
                let z = b.chain(start, short)?;
                b.build_challenge_generator_cell(z, 1)
            }),
        ],
        (Tier::B | Tier::C, Bulkhead::Extreme | Bulkhead::Overload) => vec![
            fragment(1.0, move |b| b.chain(start, n)),
            fragment(0.5, move |b| b.build_challenge_keycard(start, 1)),
        ],
        (Tier::D | Tier::E, Bulkhead::Main) => vec![
            fragment(1.0, move |b| {
                let z = b.chain(start, short)?;
                b.build_challenge_error_alarm(z, 1, true)
            }),
            fragment(0.8, move |b| {
                let z = b.build_challenge_generator_cell(start, 2)?;
                b.chain(z, short)
            }),
            fragment(0.6, move |b| {
                let z = b.build_challenge_keycard(start, 1)?;
                b.chain(z, short)
            }),
        ],
        (Tier::D | Tier::E, Bulkhead::Extreme | Bulkhead::Overload) => vec![
            fragment(1.0, move |b| {
                let z = b.build_challenge_error_alarm(start, 1, true)?;
                b.chain(z, short)
            }),
            fragment(0.7, move |b| b.build_challenge_keycard(start, 1)),
            fragment(0.4, move |b| {
                let z = b.chain(start, short)?;
                b.build_challenge_apex_alarm(z)
            }),
        ],
    };
    if director.complex.supports(Geometry::Garden) {
        templates.push(fragment(0.5, move |b| {
            let z = b.chain(start, short)?;
            b.build_garden_detour(z)
        }));
    }
    templates
}

/// Gate in front of a single objective spur hanging off `from`
fn spur_gate_templates<'t, 'g>(director: &DirectorView, from: ZoneId) -> Vec<Fragment<'t, 'g>> {
    match (director.tier, director.bulkhead) {
        (Tier::A, _) => vec![fragment(1.0, move |_| Ok(from))],
        (Tier::B | Tier::C, Bulkhead::Main) => vec![
            fragment(1.0, move |_| Ok(from)),
            fragment(0.5, move |b| b.build_challenge_keycard(from, 1)),
        ],
        (Tier::B | Tier::C, Bulkhead::Extreme | Bulkhead::Overload) => {
            vec![fragment(1.0, move |_| Ok(from))]
        }
        (Tier::D | Tier::E, Bulkhead::Main) => vec![
            fragment(0.5, move |_| Ok(from)),
            fragment(0.8, move |b| b.build_challenge_error_alarm(from, 1, true)),
            fragment(0.6, move |b| b.build_challenge_generator_cell(from, 1)),
        ],
        (Tier::D | Tier::E, Bulkhead::Extreme | Bulkhead::Overload) => vec![
            fragment(0.5, move |_| Ok(from)),
            fragment(1.0, move |b| b.build_challenge_keycard(from, 1)),
        ],
    }
}

/// Hub connection limit for `spokes` exits plus the way in
fn hub_connections(spokes: u32) -> u8 {
    spokes.saturating_add(1).min(u8::MAX as u32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::director::BuildDirector;
    use crate::layout::{build_level, tags, LayoutOptions};
    use crate::level::{Complex, LevelRequest};
    use crate::random::Generator;

    fn build(kind: ObjectiveKind, tier: Tier, complex: Complex, seed: &str) -> crate::layout::LevelLayout {
        let mut rng = Generator::seeded(seed);
        let request = LevelRequest::new(tier, 1, complex).with_objective(Bulkhead::Main, kind);
        build_level(&mut rng, LayoutOptions::default(), &request).unwrap()
    }

    #[test]
    fn test_missing_start_aborts() {
        let mut rng = Generator::seeded("no-start");
        let request = LevelRequest::new(Tier::B, 1, Complex::Tech);
        let mut builder = LayoutBuilder::new(request, LayoutOptions::default(), &mut rng);
        builder.select_topology();
        builder.place_entrances().unwrap();
        builder.prebuild_objectives();

        let mut dice = Generator::seeded("view");
        let director = BuildDirector::new(Tier::B, Bulkhead::Extreme, Complex::Tech, &mut dice);
        let objective = Objective::prebuild(ObjectiveKind::HsuFindSample, Tier::B, Bulkhead::Extreme, &mut dice);
        let handler = handler_for(ObjectiveKind::HsuFindSample);
        assert_eq!(
            handler(&mut builder, &director.view(), &objective, None),
            Err(GenerationError::MissingStartZone {
                bulkhead: Bulkhead::Extreme,
                objective: ObjectiveKind::HsuFindSample,
            })
        );
    }

    #[test]
    fn test_every_objective_builds_on_main() {
        for (i, kind) in ObjectiveKind::ALL.iter().enumerate() {
            for tier in Tier::ALL {
                let complex = match kind.required_geometry() {
                    Some(Geometry::GeneratorCluster) => Complex::Mining,
                    Some(_) => Complex::Tech,
                    None => Complex::ALL[i % 3],
                };
                let seed = format!("objective-{i}-{tier}");
                let level = build(*kind, tier, complex, &seed);
                let main = level.branch(Bulkhead::Main).unwrap();
                assert_eq!(main.objective.kind, *kind);
                assert!(!main.objective_zones.is_empty(), "{kind:?} on {tier} recorded no objective zones");
                assert_eq!(level.zones_with_tag(tags::EXTRACTION).len(), 1);
            }
        }
    }

    #[test]
    fn test_secondary_objectives_build() {
        let secondary: Vec<ObjectiveKind> = ObjectiveKind::ALL
            .iter()
            .copied()
            .filter(|k| k.allowed_in(Bulkhead::Extreme))
            .collect();
        for (i, kind) in secondary.into_iter().enumerate() {
            let mut rng = Generator::seeded(&format!("secondary-{i}"));
            let request = LevelRequest::new(Tier::D, 1, Complex::ALL[i % 3])
                .with_bulkheads(&[Bulkhead::Extreme])
                .with_objective(Bulkhead::Extreme, kind);
            let level = build_level(&mut rng, LayoutOptions::default(), &request).unwrap();
            let extreme = level.branch(Bulkhead::Extreme).unwrap();
            assert_eq!(extreme.objective.kind, kind);
            assert!(!extreme.objective_zones.is_empty());
            assert!(extreme.objective_zones.iter().all(|z| z.bulkhead == Bulkhead::Extreme));
        }
    }

    #[test]
    fn test_approach_len_shorter_for_secondaries() {
        let mut rng = Generator::seeded("approach");
        let main = BuildDirector::new(Tier::E, Bulkhead::Main, Complex::Tech, &mut rng).view();
        let mut extreme = main;
        extreme.bulkhead = Bulkhead::Extreme;
        assert!(approach_len(&extreme) < approach_len(&main));
        assert!(approach_len(&extreme) >= 1);
    }
}
