//! Layout composition engine.
//!
//! A [`LayoutBuilder`] grows one level: it owns the level's planner and one
//! director per bulkhead, borrows the build's generator, and walks a fixed
//! phase sequence:
//!
//! topology -> entrances -> objective prebuild -> objective handlers ->
//! bulkhead keys -> special zones -> enrichment -> finalisation
//!
//! Calling a phase out of order panics. Handler failures come back as
//! [`GenerationError`] and abort only the level being built.

pub mod bulkheads;
pub mod challenge;
pub mod finished;
pub mod objectives;

use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::constants::{
    CONNECTOR_ZONE_MULTIPLIER, DEFAULT_MAX_CONNECTIONS, HUB_MAX_CONNECTIONS,
    OBJECTIVE_ZONE_MULTIPLIER, PRIMARY_BRANCH,
};
use crate::director::{points_for_zone, BuildDirector};
use crate::enrichment;
use crate::error::{GenResult, GenerationError};
use crate::level::{Bulkhead, BulkheadTopology, Complex, Geometry, LevelRequest, Tier};
use crate::logging::TimingSpan;
use crate::objective::ObjectiveKind;
use crate::planner::zone::{
    AlarmPuzzle, CoverageSize, DoorKind, DoorLock, Item, Light, Terminal, Zone, ZoneEvent,
};
use crate::planner::{entrance_tag, LevelPlanner, ZoneId, ZoneNode};
use crate::random::{select_run, Generator, RandomSource, Template};

pub use finished::{BranchLayout, LevelLayout, ZoneRecord};

/// Tags the engine puts on zones
pub mod tags {
    pub const STARTING_AREA: &str = "starting_area";
    pub const HUB: &str = "hub";
    pub const EXTRACTION: &str = "extraction";
    pub const EXIT: &str = "exit";
    pub const OBJECTIVE: &str = "objective";
    pub const REACTOR: &str = "reactor";
    pub const BOSS: &str = "boss";
    pub const APEX: &str = "apex";
    pub const ERROR_ALARM_OFF: &str = "error_alarm_off";
    pub const BULKHEAD_KEY: &str = "bulkhead_key";
    pub const GARDEN: &str = "garden";
}

/// Sub-branch labels used by fragments and handlers
pub mod labels {
    pub const GATHER_ITEMS: &str = "small_items";
    pub const BIG_ITEM: &str = "big_item";
    pub const HSU_SEARCH: &str = "hsu_search";
    pub const HSU_ITEM: &str = "hsu_item";
    pub const REACTOR_CODES: &str = "reactor_codes";
    pub const REACTOR_VERIFY: &str = "reactor_verify";
    pub const UPLINK: &str = "uplink";
    pub const UPLINK_PAIR: &str = "uplink_pair";
    pub const GATHER_TERMINAL: &str = "gather_terminal";
    pub const TIMED_TERMINAL: &str = "timed_terminal";
    pub const POWER_GENERATOR: &str = "power_generator";
    pub const GENERATOR_CELLS: &str = "generator_cells";
    pub const GENERATOR_CELL: &str = "generator_cell";
    pub const KEYCARD: &str = "keycard";
    pub const ERROR_ALARM: &str = "error_alarm";
    pub const ERROR_ALARM_OFF: &str = "error_alarm_off";
    pub const GARDEN: &str = "garden";
}

/// Level-wide switches taken from the generation config
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutOptions {
    pub forward_extraction: bool,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            forward_extraction: true,
        }
    }
}

/// Ordered build phases of one level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BuildPhase {
    Created,
    TopologySelected,
    EntrancesPlaced,
    ObjectivesPrebuilt,
    ObjectivesBuilt,
    KeysPlaced,
    SpecialZonesAdjusted,
    Enriched,
    Finalized,
}

impl BuildPhase {
    fn next(self) -> Option<Self> {
        match self {
            BuildPhase::Created => Some(BuildPhase::TopologySelected),
            BuildPhase::TopologySelected => Some(BuildPhase::EntrancesPlaced),
            BuildPhase::EntrancesPlaced => Some(BuildPhase::ObjectivesPrebuilt),
            BuildPhase::ObjectivesPrebuilt => Some(BuildPhase::ObjectivesBuilt),
            BuildPhase::ObjectivesBuilt => Some(BuildPhase::KeysPlaced),
            BuildPhase::KeysPlaced => Some(BuildPhase::SpecialZonesAdjusted),
            BuildPhase::SpecialZonesAdjusted => Some(BuildPhase::Enriched),
            BuildPhase::Enriched => Some(BuildPhase::Finalized),
            BuildPhase::Finalized => None,
        }
    }
}

/// Per-zone dressing applied by [`LayoutBuilder::add_branch`]
pub type ZoneDressing = fn(&mut Zone, &mut Generator);

/// Extra ammo and tool refills
pub fn resource_cache(zone: &mut Zone, rng: &mut Generator) {
    zone.resources.ammo += rng.range_f64(0.2, 0.6);
    zone.resources.tool += rng.range_f64(0.1, 0.4);
}

/// Dim corridor that may go dark when its door opens
pub fn dark_corridor(zone: &mut Zone, rng: &mut Generator) {
    if zone.light != Light::Blackout {
        zone.light = Light::Dim;
    }
    if rng.flip(0.3) {
        zone.events.push(ZoneEvent::LightsOffOnDoorOpen);
    }
}

/// Zone with rising fog and extra health packs
pub fn fogged(zone: &mut Zone, rng: &mut Generator) {
    zone.events.push(ZoneEvent::FogRise);
    zone.resources.health += rng.range_f64(0.2, 0.5);
}

/// Options for a zone about to be created
#[derive(Debug, Clone, Default)]
pub struct NewZone {
    label: Option<String>,
    tags: Vec<String>,
    size: Option<CoverageSize>,
    geometry: Option<Geometry>,
    multiplier: Option<f64>,
    max_connections: Option<u8>,
    quiet: bool,
}

impl NewZone {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub zone with room for several exits
    pub fn hub() -> Self {
        Self::new()
            .tag(tags::HUB)
            .geometry(Geometry::Hub)
            .size(CoverageSize::Large)
            .multiplier(CONNECTOR_ZONE_MULTIPLIER)
            .max_connections(HUB_MAX_CONNECTIONS)
    }

    /// Zone holding the objective; heavier enemy presence
    pub fn objective() -> Self {
        Self::new()
            .tag(tags::OBJECTIVE)
            .multiplier(OBJECTIVE_ZONE_MULTIPLIER)
    }

    /// Starting-area zone: no enemies, no points drawn
    pub fn starting_area() -> Self {
        Self::new().tag(tags::STARTING_AREA).quiet()
    }

    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn size(mut self, size: CoverageSize) -> Self {
        self.size = Some(size);
        self
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    pub fn max_connections(mut self, max: u8) -> Self {
        self.max_connections = Some(max);
        self
    }

    pub fn quiet(mut self) -> Self {
        self.quiet = true;
        self
    }
}

/// Weighted structural template run by [`LayoutBuilder::run_templates`].
/// Yields the zone later fragments keep chaining from.
pub type Fragment<'t, 'g> = Template<'t, LayoutBuilder<'g>, GenResult<ZoneId>>;

pub fn fragment<'t, 'g, F>(weight: f64, build: F) -> Fragment<'t, 'g>
where
    F: FnOnce(&mut LayoutBuilder<'g>) -> GenResult<ZoneId> + 't,
{
    (weight, Box::new(build))
}

/// Builds one level
pub struct LayoutBuilder<'g> {
    rng: &'g mut Generator,
    request: LevelRequest,
    options: LayoutOptions,
    planner: LevelPlanner,
    directors: BTreeMap<Bulkhead, BuildDirector>,
    phase: BuildPhase,
    topology: BulkheadTopology,
    objective_zones: BTreeMap<Bulkhead, Vec<ZoneId>>,
    extraction: Option<ZoneId>,
    serial: u32,
}

impl RandomSource for LayoutBuilder<'_> {
    fn generator(&mut self) -> &mut Generator {
        self.rng
    }
}

impl<'g> LayoutBuilder<'g> {
    pub fn new(request: LevelRequest, options: LayoutOptions, rng: &'g mut Generator) -> Self {
        let directors = request
            .bulkheads
            .iter()
            .map(|&bulkhead| {
                let director = BuildDirector::new(request.tier, bulkhead, request.complex, rng);
                (bulkhead, director)
            })
            .collect();

        Self {
            rng,
            request,
            options,
            planner: LevelPlanner::new(),
            directors,
            phase: BuildPhase::Created,
            topology: BulkheadTopology::SingleChain,
            objective_zones: BTreeMap::new(),
            extraction: None,
            serial: 0,
        }
    }

    fn advance(&mut self, next: BuildPhase) {
        assert_eq!(
            self.phase.next(),
            Some(next),
            "layout phase {:?} entered from {:?}",
            next,
            self.phase
        );
        self.phase = next;
    }

    pub fn phase(&self) -> BuildPhase {
        self.phase
    }

    pub fn tier(&self) -> Tier {
        self.request.tier
    }

    pub fn complex(&self) -> Complex {
        self.request.complex
    }

    pub fn request(&self) -> &LevelRequest {
        &self.request
    }

    pub fn planner(&self) -> &LevelPlanner {
        &self.planner
    }

    pub fn topology(&self) -> BulkheadTopology {
        self.topology
    }

    pub fn director(&self, bulkhead: Bulkhead) -> Option<&BuildDirector> {
        self.directors.get(&bulkhead)
    }

    pub fn objective_zones(&self, bulkhead: Bulkhead) -> &[ZoneId] {
        self.objective_zones
            .get(&bulkhead)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Per-level counter for key and cell names
    fn next_serial(&mut self) -> u32 {
        self.serial += 1;
        self.serial
    }

    // =====================================================
    // Primitives
    // =====================================================

    /// Append one zone as a child of `from`, in `from`'s bulkhead
    pub fn add_zone(&mut self, from: ZoneId, new_zone: NewZone) -> GenResult<ZoneId> {
        self.create_zone(from.bulkhead, Some(from), new_zone)
    }

    /// Append the first zone of `bulkhead` behind a zone of another bulkhead
    pub fn add_zone_into(&mut self, bulkhead: Bulkhead, from: ZoneId, new_zone: NewZone) -> GenResult<ZoneId> {
        self.create_zone(bulkhead, Some(from), new_zone)
    }

    /// Chain `count` zones under `label`, dressing each new zone. Returns the
    /// new zones in order; empty when `count` is zero.
    pub fn add_branch(
        &mut self,
        from: ZoneId,
        count: u32,
        label: &str,
        dressing: Option<ZoneDressing>,
    ) -> GenResult<Vec<ZoneId>> {
        let mut created = Vec::with_capacity(count as usize);
        let mut cursor = from;
        for _ in 0..count {
            cursor = self.add_zone(cursor, NewZone::new().label(label))?;
            if let Some(dress) = dressing {
                let zone = self.planner.zone_mut(cursor)?;
                dress(zone, self.rng);
            }
            created.push(cursor);
        }
        debug!(from = %from, count, label, "branch added");
        Ok(created)
    }

    /// Unlabeled chain; returns the last zone, or `from` for a zero count
    pub fn chain(&mut self, from: ZoneId, count: u32) -> GenResult<ZoneId> {
        let created = self.add_branch(from, count, PRIMARY_BRANCH, None)?;
        Ok(created.last().copied().unwrap_or(from))
    }

    /// Exit zone; extraction candidate on the Main bulkhead
    pub fn add_exit_zone(&mut self, from: ZoneId) -> GenResult<ZoneId> {
        self.add_zone(
            from,
            NewZone::new()
                .tag(tags::EXIT)
                .geometry(Geometry::Exit)
                .size(CoverageSize::Medium),
        )
    }

    fn create_zone(
        &mut self,
        bulkhead: Bulkhead,
        from: Option<ZoneId>,
        new_zone: NewZone,
    ) -> GenResult<ZoneId> {
        if let Some(parent) = from {
            if !self.planner.contains(parent) {
                return Err(GenerationError::UnknownZone(parent));
            }
        }
        let tier = self.request.tier;
        let complex = self.request.complex;

        let size = match new_zone.size {
            Some(size) => size,
            None => CoverageSize::roll(self.rng),
        };
        let mut zone = Zone::with_size(size);
        zone.geometry = match new_zone.geometry {
            Some(geometry) if complex.supports(geometry) => Some(geometry),
            Some(geometry) => {
                debug!(?geometry, ?complex, "geometry not in complex, building a plain zone");
                None
            }
            None => None,
        };
        zone.light = if zone.geometry == Some(Geometry::Reactor) {
            Light::Reactor
        } else {
            Light::roll(tier, self.rng)
        };
        if from.is_some() {
            zone.gate.puzzle = AlarmPuzzle::scan_class(tier, self.rng);
        }

        if new_zone.quiet {
            zone.enemy_multiplier = 0.0;
        } else {
            if let Some(multiplier) = new_zone.multiplier {
                zone.enemy_multiplier = multiplier;
            }
            let director = self.directors.get_mut(&bulkhead).ok_or_else(|| {
                GenerationError::MissingPrerequisite(format!("no director for the {bulkhead} bulkhead"))
            })?;
            let requested = points_for_zone(&zone, tier, self.rng);
            let granted = director.allocate(requested);
            zone.enemies = director.draw_enemy_groups(granted, self.rng);
            zone.enemy_points = zone.enemies.iter().map(|g| g.cost).sum();
        }

        let id = ZoneId::new(bulkhead, self.planner.next_index(bulkhead));
        let mut node = ZoneNode::new(id)
            .with_max_connections(new_zone.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS));
        if let Some(label) = &new_zone.label {
            node = node.with_label(label);
        }
        for tag in &new_zone.tags {
            node = node.with_tag(tag);
        }
        let points = zone.enemy_points;
        self.planner.add_zone(node, zone);
        if let Some(parent) = from {
            self.planner.connect(parent, id)?;
        }
        debug!(zone = %id, parent = ?from, points, "zone added");
        Ok(id)
    }

    pub fn zone_mut(&mut self, id: ZoneId) -> GenResult<&mut Zone> {
        self.planner.zone_mut(id)
    }

    pub fn tag(&mut self, id: ZoneId, tag: &str) -> GenResult<()> {
        self.planner.tag(id, tag)
    }

    pub fn place_item(&mut self, id: ZoneId, item: Item) -> GenResult<()> {
        self.planner.zone_mut(id)?.items.push(item);
        Ok(())
    }

    pub fn place_terminal(&mut self, id: ZoneId, terminal: Terminal) -> GenResult<()> {
        self.planner.zone_mut(id)?.terminals.push(terminal);
        Ok(())
    }

    /// Record a zone the postbuild step attaches win conditions to
    pub fn mark_objective(&mut self, id: ZoneId) -> GenResult<()> {
        self.planner.tag(id, tags::OBJECTIVE)?;
        let zones = self.objective_zones.entry(id.bulkhead).or_default();
        if !zones.contains(&id) {
            zones.push(id);
        }
        Ok(())
    }

    /// Open primary zones of a bulkhead outside the starting area
    pub fn open_zones_past_start(&self, bulkhead: Bulkhead) -> Vec<ZoneId> {
        self.planner
            .get_open_zones(bulkhead, Some(PRIMARY_BRANCH))
            .into_iter()
            .filter(|id| {
                self.planner
                    .get_node(*id)
                    .map_or(false, |node| !node.has_tag(tags::STARTING_AREA))
            })
            .collect()
    }

    /// Pick one template and run it; an empty table leaves the graph as is
    pub fn run_templates(&mut self, fallback: ZoneId, templates: Vec<Fragment<'_, 'g>>) -> GenResult<ZoneId> {
        select_run(self, templates).unwrap_or(Ok(fallback))
    }

    // =====================================================
    // Phases
    // =====================================================

    /// Roll every director's objective. Objectives already taken by an
    /// earlier bulkhead of this level are excluded for the later ones.
    pub fn prebuild_objectives(&mut self) {
        self.advance(BuildPhase::ObjectivesPrebuilt);
        let mut excluded: Vec<ObjectiveKind> = self.request.excluded.clone();
        for (bulkhead, director) in self.directors.iter_mut() {
            let pinned = self.request.pinned_objective(*bulkhead);
            let kind = director.prebuild(pinned, &excluded, self.rng).kind;
            debug!(
                level = %self.request.label(),
                bulkhead = %bulkhead,
                objective = ?kind,
                complexity = ?director.complexity,
                "objective prebuilt"
            );
            excluded.push(kind);
        }
    }

    /// Start zone for a bulkhead's handler. With secondaries present every
    /// bulkhead (Main included) begins behind a bulkhead door hanging off its
    /// entrance zone; a Main-only level starts at the elevator.
    fn open_bulkhead(&mut self, bulkhead: Bulkhead) -> GenResult<Option<ZoneId>> {
        if !self.request.has_secondary() {
            return Ok(self.planner.branch_root(Bulkhead::Main));
        }
        let entrance = self
            .planner
            .zones_with_tag(&entrance_tag(bulkhead))
            .first()
            .copied();
        let Some(entrance) = entrance else {
            return Ok(None);
        };
        let entry = self.add_zone_into(bulkhead, entrance, NewZone::new().size(CoverageSize::Medium))?;
        let gate = &mut self.planner.zone_mut(entry)?.gate;
        gate.door = DoorKind::Bulkhead;
        gate.lock = DoorLock::Bulkhead(bulkhead);
        Ok(Some(entry))
    }

    /// Dispatch each bulkhead's objective handler
    pub fn build_objectives(&mut self) -> GenResult<()> {
        self.advance(BuildPhase::ObjectivesBuilt);
        let bulkheads: Vec<Bulkhead> = self.directors.keys().copied().collect();
        for bulkhead in bulkheads {
            let Some(director) = self.directors.get(&bulkhead) else {
                continue;
            };
            let view = director.view();
            let objective = director.objective.clone().ok_or_else(|| {
                GenerationError::MissingPrerequisite(format!("{bulkhead} objective was never prebuilt"))
            })?;
            let start = self.open_bulkhead(bulkhead)?;
            let handler = objectives::handler_for(objective.kind);
            handler(self, &view, &objective, start)?;
            debug!(
                bulkhead = %bulkhead,
                objective = ?objective.kind,
                zones = self.planner.get_zones(bulkhead, None).len(),
                "objective built"
            );
        }
        Ok(())
    }

    /// Decorate every bulkhead with blood doors, error alarms and scouts
    pub fn run_enrichment(&mut self) {
        self.advance(BuildPhase::Enriched);
        let tier = self.request.tier;
        for bulkhead in self.request.bulkheads.clone() {
            let report = enrichment::enrich_branch(&mut self.planner, bulkhead, tier, self.rng);
            debug!(bulkhead = %bulkhead, ?report, "enrichment applied");
        }
    }
}

/// Run every phase for one level
pub fn build_level(
    rng: &mut Generator,
    options: LayoutOptions,
    request: &LevelRequest,
) -> GenResult<LevelLayout> {
    let _span = TimingSpan::level(&request.label());
    let mut builder = LayoutBuilder::new(request.clone(), options, rng);
    builder.select_topology();
    builder.place_entrances()?;
    builder.prebuild_objectives();
    builder.build_objectives()?;
    builder.place_bulkhead_keys()?;
    builder.adjust_special_zones()?;
    builder.run_enrichment();
    let layout = builder.finalize()?;
    info!(
        level = %layout.label(),
        zones = layout.zone_count(),
        topology = ?layout.topology,
        extraction = %layout.extraction,
        "level built"
    );
    Ok(layout)
}
