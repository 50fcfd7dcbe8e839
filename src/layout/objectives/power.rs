//! Generator objectives: power cell distribution and the central cluster.

use tracing::debug;

use super::{approach_templates, hub_connections, require_start, spur_gate_templates};
use crate::director::DirectorView;
use crate::error::GenResult;
use crate::layout::{labels, resource_cache, LayoutBuilder, NewZone};
use crate::level::{Bulkhead, Geometry, Tier};
use crate::objective::{Objective, ObjectiveParams};
use crate::planner::zone::{CoverageSize, Item};
use crate::planner::ZoneId;

/// Cells start at a hub; each generator sits at the end of its own spur
pub fn build_power_cell_distribution(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let generators = match &objective.params {
        ObjectiveParams::PowerCellDistribution { generators } => (*generators).max(1),
        _ => 1,
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    let hub = b.add_zone(front, NewZone::hub().max_connections(hub_connections(generators)))?;
    for i in 0..generators {
        b.place_item(hub, Item::GeneratorCell(format!("power_cell_{}", i + 1)))?;
    }
    b.mark_objective(hub)?;

    for i in 0..generators {
        let gated = b.run_templates(hub, spur_gate_templates(director, hub))?;
        let generator = b.add_zone(
            gated,
            NewZone::objective()
                .label(labels::POWER_GENERATOR)
                .size(CoverageSize::Medium),
        )?;
        b.place_item(generator, Item::Objective(format!("generator_{}", i + 1)))?;
        b.mark_objective(generator)?;
    }
    debug!(hub = %hub, generators, "power cell distribution built");
    Ok(())
}

/// Generator cluster fed by cells scattered through the bulkhead
pub fn build_central_generator_cluster(
    b: &mut LayoutBuilder<'_>,
    director: &DirectorView,
    objective: &Objective,
    start: Option<ZoneId>,
) -> GenResult<()> {
    let start = require_start(director, objective, start)?;
    let cells = match &objective.params {
        ObjectiveParams::CentralGeneratorCluster { cells } => (*cells).max(1),
        _ => 1,
    };

    let front = b.run_templates(start, approach_templates(director, start))?;
    let cluster = b.add_zone(
        front,
        NewZone::objective()
            .geometry(Geometry::GeneratorCluster)
            .size(CoverageSize::Huge)
            .max_connections(3),
    )?;
    b.mark_objective(cluster)?;

    for i in 0..cells {
        let open = b.open_zones_past_start(director.bulkhead);
        let from = b.rng.pick(&open).copied().unwrap_or(cluster);
        let len = match (director.tier, director.bulkhead) {
            (Tier::A | Tier::B | Tier::C, _) => 1,
            (Tier::D | Tier::E, Bulkhead::Main) => b.rng.range(1, 2),
            (Tier::D | Tier::E, Bulkhead::Extreme | Bulkhead::Overload) => 1,
        };
        let spur = b.add_branch(from, len, labels::GENERATOR_CELLS, Some(resource_cache))?;
        let holder = spur.last().copied().unwrap_or(from);
        b.place_item(holder, Item::GeneratorCell(format!("cluster_cell_{}", i + 1)))?;
        b.mark_objective(holder)?;
    }
    debug!(cluster = %cluster, cells, "generator cluster built");
    Ok(())
}
