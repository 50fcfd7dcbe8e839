//! Reactor startup and shutdown.

use tracing::debug;

use super::{approach_templates, fragment, require_start};
use crate::director::DirectorView;
use crate::error::GenResult;
use crate::layout::{labels, tags, LayoutBuilder, NewZone};
use crate::level::{Geometry, Tier};
use crate::objective::{Objective, ObjectiveParams};
use crate::planner::zone::{CoverageSize, Terminal, ZoneEvent};
use crate::planner::ZoneId;

fn reactor_zone(b: &mut LayoutBuilder<'_>, from: ZoneId) -> GenResult<ZoneId> {
    let reactor = b.add_zone(
        from,
        NewZone::objective()
            .tag(tags::REACTOR)
            .geometry(Geometry::Reactor)
            .size(CoverageSize::Huge)
            .max_connections(3),
    )?;
    b.mark_objective(reactor)?;
    Ok(reactor)
}

/// Start the reactor; later waves need codes fetched from spur terminals
pub fn build_reactor_startup(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let (waves, fetch) = match &objective.params {
        ObjectiveParams::ReactorStartup {
            waves,
            fetch_code_waves,
        } => (*waves, *fetch_code_waves),
        _ => (0, 0),
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    let reactor = reactor_zone(b, front)?;
    b.place_terminal(reactor, Terminal::Objective("reactor_startup".to_string()))?;
    b.zone_mut(reactor)?.events.push(ZoneEvent::SpawnOnTerminalUse);

    for wave in 0..fetch {
        let open = b.open_zones_past_start(director.bulkhead);
        let from = b.rng.pick(&open).copied().unwrap_or(reactor);
        let len = match director.tier {
            Tier::A | Tier::B | Tier::C | Tier::D => 1,
            Tier::E => b.rng.range(1, 2),
        };
        let spur = b.add_branch(from, len, labels::REACTOR_CODES, None)?;
        let holder = spur.last().copied().unwrap_or(from);
        b.place_terminal(holder, Terminal::Objective(format!("reactor_code_{}", wave + 1)))?;
        b.mark_objective(holder)?;
    }
    debug!(reactor = %reactor, waves, fetch, "reactor startup built");
    Ok(())
}

/// Shut the reactor down, optionally confirming on a separate terminal
pub fn build_reactor_shutdown(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let verify = matches!(
        objective.params,
        ObjectiveParams::ReactorShutdown {
            verify_on_terminal: true
        }
    );

    let front = b.run_templates(start, approach_templates(director, start))?;
    let guard = match director.tier {
        Tier::A | Tier::B | Tier::C => vec![fragment(1.0, move |_| Ok(front))],
        Tier::D => vec![
            fragment(1.0, move |_| Ok(front)),
            fragment(0.5, move |b| b.build_challenge_error_alarm(front, 1, true)),
        ],
        Tier::E => vec![
            fragment(1.0, move |b| b.build_challenge_boss(front)),
            fragment(0.6, move |b| b.build_challenge_error_alarm(front, 1, true)),
        ],
    };
    let before = b.run_templates(front, guard)?;
    let reactor = reactor_zone(b, before)?;
    b.place_terminal(reactor, Terminal::Objective("reactor_shutdown".to_string()))?;

    if verify {
        let side = b.add_zone(reactor, NewZone::new().label(labels::REACTOR_VERIFY))?;
        b.place_terminal(side, Terminal::Objective("reactor_verify".to_string()))?;
        b.mark_objective(side)?;
    }
    debug!(reactor = %reactor, verify, "reactor shutdown built");
    Ok(())
}
