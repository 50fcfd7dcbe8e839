//! Terminal objectives: special commands, uplinks, terminal gathering and
//! timed sequences.

use tracing::debug;

use super::{approach_templates, fragment, hub_connections, require_start, spur_gate_templates};
use crate::director::DirectorView;
use crate::error::GenResult;
use crate::layout::{dark_corridor, labels, tags, LayoutBuilder, NewZone};
use crate::level::{Bulkhead, Geometry, Tier};
use crate::objective::{Objective, ObjectiveParams, TerminalCommand};
use crate::planner::zone::{CoverageSize, Terminal, ZoneEvent};
use crate::planner::ZoneId;

/// Run a command on one terminal; the command decides what happens next
pub fn build_special_terminal_command(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let command = match &objective.params {
        ObjectiveParams::SpecialTerminalCommand { command } => *command,
        _ => TerminalCommand::LightsOff,
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    let size = match command {
        TerminalCommand::KingOfTheHill => CoverageSize::Huge,
        _ => CoverageSize::Large,
    };
    let terminal_zone = b.add_zone(front, NewZone::objective().size(size))?;
    b.place_terminal(terminal_zone, Terminal::Objective("special_command".to_string()))?;
    b.mark_objective(terminal_zone)?;

    match command {
        TerminalCommand::LightsOff => {
            b.zone_mut(terminal_zone)?.events.push(ZoneEvent::SpawnOnTerminalUse);
        }
        TerminalCommand::FogFlood => {
            b.zone_mut(terminal_zone)?.events.push(ZoneEvent::FogRise);
        }
        TerminalCommand::ErrorAlarm => {
            let off = b.add_zone(
                terminal_zone,
                NewZone::new()
                    .label(labels::ERROR_ALARM_OFF)
                    .tag(tags::ERROR_ALARM_OFF),
            )?;
            b.place_terminal(off, Terminal::AlarmOff(terminal_zone))?;
        }
        TerminalCommand::KingOfTheHill => {
            let zone = b.zone_mut(terminal_zone)?;
            zone.events.push(ZoneEvent::SpawnOnTerminalUse);
            zone.resources.ammo += 1.0;
        }
    }
    debug!(zone = %terminal_zone, ?command, "terminal command built");
    Ok(())
}

/// Uplink terminals, each on its own gated spur
pub fn build_terminal_uplink(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let (uplinks, words) = match &objective.params {
        ObjectiveParams::TerminalUplink { uplinks, words } => ((*uplinks).max(1), *words),
        _ => (1, 0),
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    for i in 0..uplinks {
        let open = b.open_zones_past_start(director.bulkhead);
        let from = b.rng.pick(&open).copied().unwrap_or(front);
        let gated = b.run_templates(from, spur_gate_templates(director, from))?;
        let zone = b.add_zone(gated, NewZone::objective().label(labels::UPLINK))?;
        b.place_terminal(zone, Terminal::Objective(format!("uplink_{}", i + 1)))?;
        b.mark_objective(zone)?;
    }
    debug!(uplinks, words, "terminal uplinks built");
    Ok(())
}

/// Uplinks whose verification codes show up on a paired terminal elsewhere
pub fn build_corrupted_terminal_uplink(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let uplinks = match &objective.params {
        ObjectiveParams::CorruptedTerminalUplink { uplinks } => (*uplinks).max(1),
        _ => 1,
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    for i in 0..uplinks {
        let zone = b.add_zone(front, NewZone::objective().label(labels::UPLINK))?;
        b.place_terminal(zone, Terminal::Objective(format!("uplink_{}", i + 1)))?;
        b.mark_objective(zone)?;

        let pair_len = match (director.tier, director.bulkhead) {
            (Tier::A | Tier::B, _) => 1,
            (Tier::C | Tier::D | Tier::E, Bulkhead::Main) => 2,
            (Tier::C | Tier::D | Tier::E, Bulkhead::Extreme | Bulkhead::Overload) => 1,
        };
        let open = b.open_zones_past_start(director.bulkhead);
        let from = b.rng.pick(&open).copied().unwrap_or(zone);
        let pair = b.add_branch(from, pair_len, labels::UPLINK_PAIR, Some(dark_corridor))?;
        let holder = pair.last().copied().unwrap_or(zone);
        b.place_terminal(holder, Terminal::Objective(format!("uplink_{}_verify", i + 1)))?;
        b.mark_objective(holder)?;
    }
    debug!(uplinks, "corrupted uplinks built");
    Ok(())
}

/// Terminals spread over spurs off a hub; only `required` must be used
pub fn build_gather_terminal(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let (terminals, required) = match &objective.params {
        ObjectiveParams::GatherTerminal { terminals, required } => ((*terminals).max(1), *required),
        _ => (1, 1),
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    let spokes = terminals.div_ceil(2);
    let hub = b.add_zone(front, NewZone::hub().max_connections(hub_connections(spokes)))?;

    let mut holders = Vec::new();
    for spoke in 0..spokes {
        let len = (terminals - spoke * 2).min(2);
        let gated = match (director.tier, director.bulkhead) {
            (Tier::D | Tier::E, Bulkhead::Main) if spoke == spokes - 1 => {
                b.build_challenge_keycard(hub, 1)?
            }
            _ => hub,
        };
        holders.extend(b.add_branch(gated, len, labels::GATHER_TERMINAL, None)?);
    }
    for (i, holder) in holders.iter().enumerate() {
        b.place_terminal(*holder, Terminal::Objective(format!("gather_terminal_{}", i + 1)))?;
        b.mark_objective(*holder)?;
    }
    debug!(hub = %hub, terminals, required, "gather terminals built");
    Ok(())
}

/// Central terminal plus outlying terminals visited in timed rounds
pub fn build_timed_terminal_sequence(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let (rounds, terminals) = match &objective.params {
        ObjectiveParams::TimedTerminalSequence { rounds, terminals } => (*rounds, (*terminals).max(1)),
        _ => (1, 1),
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    let central = b.add_zone(
        front,
        NewZone::objective()
            .tag(tags::HUB)
            .geometry(Geometry::Hub)
            .size(CoverageSize::Huge)
            .max_connections(hub_connections(terminals)),
    )?;
    b.place_terminal(central, Terminal::Objective("timed_sequence_central".to_string()))?;
    b.zone_mut(central)?.events.push(ZoneEvent::SpawnOnTerminalUse);
    b.mark_objective(central)?;

    for i in 0..terminals {
        let templates = match director.tier {
            Tier::A | Tier::B | Tier::C => vec![fragment(1.0, move |_| Ok(central))],
            Tier::D | Tier::E => vec![
                fragment(1.0, move |_| Ok(central)),
                fragment(0.4, move |b| b.build_challenge_error_alarm(central, 1, false)),
            ],
        };
        let from = b.run_templates(central, templates)?;
        let spur = b.add_branch(from, 1, labels::TIMED_TERMINAL, Some(dark_corridor))?;
        let holder = spur.last().copied().unwrap_or(central);
        b.place_terminal(holder, Terminal::Objective(format!("timed_terminal_{}", i + 1)))?;
        b.mark_objective(holder)?;
    }
    debug!(central = %central, rounds, terminals, "timed sequence built");
    Ok(())
}
