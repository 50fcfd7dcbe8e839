//! Objectives that end at an exit zone.

use tracing::debug;

use super::{approach_len, approach_templates, fragment, require_start};
use crate::director::DirectorView;
use crate::error::GenResult;
use crate::layout::{LayoutBuilder, NewZone};
use crate::level::Tier;
use crate::objective::{Objective, ObjectiveParams};
use crate::planner::zone::{CoverageSize, ZoneEvent};
use crate::planner::ZoneId;

/// Fight through to the exit
pub fn build_clear_path(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let n = approach_len(director);

    let templates = match (director.tier, director.bulkhead) {
        (Tier::A, _) => vec![
            fragment(1.0, move |b| b.chain(start, n + 1)),
            fragment(0.5, move |b| {
                let z = b.chain(start, n)?;
                b.build_challenge_keycard(z, 1)
            }),
        ],
        (Tier::B | Tier::C, _) => vec![
            fragment(1.0, move |b| {
                let z = b.chain(start, n)?;
                b.build_challenge_keycard(z, 1)
            }),
            fragment(1.0, move |b| {
                let z = b.chain(start, n)?;
                b.build_challenge_generator_cell(z, 1)
            }),
            fragment(0.6, move |b| {
                let z = b.chain(start, n)?;
                b.build_challenge_error_alarm(z, 1, true)
            }),
        ],
        (Tier::D | Tier::E, _) => vec![
            fragment(1.0, move |b| {
                let z = b.build_challenge_error_alarm(start, 2, true)?;
                b.chain(z, n)
            }),
            fragment(0.8, move |b| {
                let z = b.chain(start, n)?;
                b.build_challenge_boss(z)
            }),
            fragment(0.6, move |b| {
                let z = b.build_challenge_keycard(start, 1)?;
                let z = b.chain(z, n)?;
                b.build_challenge_apex_alarm(z)
            }),
        ],
    };
    let end = b.run_templates(start, templates)?;
    let exit = b.add_exit_zone(end)?;
    b.mark_objective(exit)?;
    debug!(exit = %exit, "clear path built");
    Ok(())
}

/// Hold out in an arena, then run for the exit
pub fn build_survival(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let seconds = match &objective.params {
        ObjectiveParams::Survival { seconds } => *seconds,
        _ => 0,
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    let arena = b.add_zone(
        front,
        NewZone::objective()
            .size(CoverageSize::Huge)
            .max_connections(3),
    )?;
    b.mark_objective(arena)?;
    let zone = b.zone_mut(arena)?;
    zone.resources.ammo += 1.0;
    if seconds >= 600 {
        zone.events.push(ZoneEvent::FogRise);
    }

    let run = match director.tier {
        Tier::A | Tier::B => vec![fragment(1.0, move |_| Ok(arena))],
        Tier::C => vec![
            fragment(1.0, move |b| b.chain(arena, 1)),
            fragment(0.5, move |_| Ok(arena)),
        ],
        Tier::D | Tier::E => vec![
            fragment(1.0, move |b| b.build_challenge_error_alarm(arena, 1, false)),
            fragment(0.7, move |b| b.chain(arena, 2)),
        ],
    };
    let end = b.run_templates(arena, run)?;
    let exit = b.add_exit_zone(end)?;
    debug!(arena = %arena, exit = %exit, seconds, "survival built");
    Ok(())
}
