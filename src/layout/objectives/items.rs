//! Item objectives: HSU sample, HSU activation, small and big items.

use tracing::debug;

use super::{approach_templates, fragment, hub_connections, require_start, spur_gate_templates};
use crate::director::DirectorView;
use crate::error::GenResult;
use crate::layout::{dark_corridor, labels, resource_cache, LayoutBuilder, NewZone};
use crate::level::{Bulkhead, Tier};
use crate::objective::{Objective, ObjectiveParams, SmallItem};
use crate::planner::zone::{CoverageSize, DoorLock, Item, Terminal};
use crate::planner::ZoneId;

/// Find the HSU among a few candidate storage zones
pub fn build_hsu_find_sample(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let candidates = match &objective.params {
        ObjectiveParams::HsuFindSample { candidate_zones } => (*candidate_zones).max(1),
        _ => 1,
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    let area = match (director.tier, director.bulkhead) {
        (Tier::A | Tier::B, _) => vec![fragment(1.0, move |b| {
            b.add_zone(front, NewZone::new().size(CoverageSize::Large))
        })],
        (Tier::C, _) => vec![
            fragment(1.0, move |b| b.add_zone(front, NewZone::hub())),
            fragment(0.5, move |b| b.build_challenge_keycard(front, 1)),
        ],
        (Tier::D | Tier::E, Bulkhead::Main) => vec![
            fragment(1.0, move |b| b.build_challenge_apex_alarm(front)),
            fragment(0.7, move |b| b.build_challenge_error_alarm(front, 1, true)),
            fragment(0.5, move |b| b.build_challenge_boss(front)),
        ],
        (Tier::D | Tier::E, Bulkhead::Extreme | Bulkhead::Overload) => vec![
            fragment(1.0, move |b| b.build_challenge_keycard(front, 1)),
            fragment(0.5, move |b| b.build_challenge_apex_alarm(front)),
        ],
    };
    let hall = b.run_templates(front, area)?;

    let search = b.add_branch(hall, candidates, labels::HSU_SEARCH, Some(dark_corridor))?;
    let holder = b.rng.pick(&search).copied().unwrap_or(hall);
    b.place_item(holder, Item::Objective("hsu".to_string()))?;
    b.mark_objective(holder)?;
    debug!(holder = %holder, candidates, "hsu placed");
    Ok(())
}

/// Carry a small item to an HSU and activate it
pub fn build_hsu_activate_small(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let front = b.run_templates(start, approach_templates(director, start))?;

    let item_len = if director.tier >= Tier::C { 2 } else { 1 };
    let spur = b.add_branch(front, item_len, labels::HSU_ITEM, Some(resource_cache))?;
    let item_zone = spur.last().copied().unwrap_or(front);
    b.place_item(item_zone, Item::Objective("hsu_activation_item".to_string()))?;
    b.mark_objective(item_zone)?;

    let gate = match (director.tier, director.bulkhead) {
        (Tier::A | Tier::B, _) => vec![fragment(1.0, move |b| b.chain(front, 1))],
        (Tier::C, _) => vec![
            fragment(1.0, move |b| b.build_challenge_error_alarm(front, 1, true)),
            fragment(1.0, move |b| b.chain(front, 1)),
        ],
        (Tier::D | Tier::E, Bulkhead::Main) => vec![
            fragment(1.0, move |b| b.build_challenge_generator_cell(front, 1)),
            fragment(0.6, move |b| b.build_challenge_error_alarm(front, 2, true)),
        ],
        (Tier::D | Tier::E, Bulkhead::Extreme | Bulkhead::Overload) => {
            vec![fragment(1.0, move |b| b.build_challenge_keycard(front, 1))]
        }
    };
    let before = b.run_templates(front, gate)?;
    let station = b.add_zone(before, NewZone::objective().size(CoverageSize::Large))?;
    b.place_terminal(station, Terminal::Objective("hsu_activation".to_string()))?;
    b.mark_objective(station)?;
    debug!(item = %item_zone, station = %station, "hsu activation built");
    Ok(())
}

/// Spread small items across labeled spurs off a hub
pub fn build_gather_small_items(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let (item, count, spread) = match &objective.params {
        ObjectiveParams::GatherSmallItems {
            item,
            count,
            spread_zones,
        } => (*item, *count, (*spread_zones).max(1)),
        _ => (SmallItem::Id, 1, 1),
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    let hub = b.add_zone(front, NewZone::hub().max_connections(hub_connections(spread)))?;

    let mut spurs: Vec<Vec<ZoneId>> = Vec::with_capacity(spread as usize);
    for _ in 0..spread {
        let len = match (director.tier, director.bulkhead) {
            (Tier::A, _) => 1,
            (Tier::B | Tier::C, Bulkhead::Main) => b.rng.range(1, 2),
            (Tier::B | Tier::C, Bulkhead::Extreme | Bulkhead::Overload) => 1,
            (Tier::D | Tier::E, Bulkhead::Main) => 2,
            (Tier::D | Tier::E, Bulkhead::Extreme | Bulkhead::Overload) => b.rng.range(1, 2),
        };
        spurs.push(b.add_branch(hub, len, labels::GATHER_ITEMS, Some(resource_cache))?);
    }

    // from C up, one spur is locked behind a card found in another
    if director.tier >= Tier::C && spurs.len() >= 2 {
        let card_zone = spurs.first().and_then(|s| s.last()).copied();
        let locked = spurs.last().and_then(|s| s.first()).copied();
        if let (Some(card_zone), Some(locked)) = (card_zone, locked) {
            let card = format!("key_gather_{}", b.next_serial());
            b.place_item(card_zone, Item::Keycard(card.clone()))?;
            b.zone_mut(locked)?.gate.lock = DoorLock::Keycard(card);
        }
    }

    let holders: Vec<ZoneId> = spurs.into_iter().flatten().collect();
    for i in 0..count as usize {
        let holder = holders.get(i % holders.len().max(1)).copied().unwrap_or(hub);
        b.place_item(holder, Item::Objective(item.token().to_string()))?;
        b.mark_objective(holder)?;
    }
    debug!(hub = %hub, spread, count, item = item.token(), "small items spread");
    Ok(())
}

/// One gated spur per big item
pub fn build_retrieve_big_items(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let items = match &objective.params {
        ObjectiveParams::RetrieveBigItems { items } => items.clone(),
        _ => Vec::new(),
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    let mut placed = 0;
    for item in &items {
        let gated = b.run_templates(front, spur_gate_templates(director, front))?;
        let zone = b.add_zone(gated, NewZone::objective().label(labels::BIG_ITEM))?;
        b.place_item(zone, Item::Objective(item.token().to_string()))?;
        b.mark_objective(zone)?;
        placed += 1;
    }
    if placed == 0 {
        let zone = b.add_zone(front, NewZone::objective().label(labels::BIG_ITEM))?;
        b.mark_objective(zone)?;
    }
    debug!(items = items.len(), "big items placed");
    Ok(())
}
