//! Starting area, bulkhead doors and extraction.

use tracing::{debug, warn};

use super::{tags, BuildPhase, LayoutBuilder, NewZone};
use crate::error::{GenResult, GenerationError};
use crate::level::{Bulkhead, BulkheadTopology, Geometry, Tier};
use crate::planner::zone::{CoverageSize, Item, Light};
use crate::planner::{entrance_tag, ZoneId};

/// Chance a non-extraction Main objective gets an exit zone past the
/// objective instead of extracting at the elevator
pub fn forward_extraction_chance(tier: Tier) -> f64 {
    match tier {
        Tier::A => 0.0,
        Tier::B => 0.1,
        Tier::C => 0.2,
        Tier::D => 0.3,
        Tier::E => 0.4,
    }
}

impl<'g> LayoutBuilder<'g> {
    /// Main-only levels always use a single chain
    pub fn select_topology(&mut self) -> BulkheadTopology {
        self.advance(BuildPhase::TopologySelected);
        self.topology = if self.request.has_secondary() {
            self.rng
                .select_copy(&[
                    (1.0, BulkheadTopology::SingleChain),
                    (1.5, BulkheadTopology::SharedHub),
                    (1.0, BulkheadTopology::IndependentRoots),
                ])
                .unwrap_or(BulkheadTopology::SharedHub)
        } else {
            BulkheadTopology::SingleChain
        };
        debug!(level = %self.request.label(), topology = ?self.topology, "topology selected");
        self.topology
    }

    /// Build the elevator and, when secondaries exist, the starting-area
    /// zones tagged as each bulkhead's entrance
    pub fn place_entrances(&mut self) -> GenResult<()> {
        self.advance(BuildPhase::EntrancesPlaced);
        let elevator = self.create_zone(
            Bulkhead::Main,
            None,
            NewZone::starting_area()
                .geometry(Geometry::Elevator)
                .size(CoverageSize::Medium)
                .max_connections(3),
        )?;
        if !self.request.has_secondary() {
            return Ok(());
        }

        let bulkheads = self.request.bulkheads.clone();
        match self.topology {
            BulkheadTopology::SingleChain => {
                let mut cursor = elevator;
                for bulkhead in bulkheads {
                    cursor = self.add_zone(cursor, NewZone::starting_area().tag(&entrance_tag(bulkhead)))?;
                }
            }
            BulkheadTopology::SharedHub => {
                let corridor = self.add_zone(elevator, NewZone::starting_area())?;
                let mut hub = NewZone::starting_area()
                    .tag(tags::HUB)
                    .geometry(Geometry::BulkheadHub)
                    .size(CoverageSize::Large)
                    .max_connections(bulkheads.len() as u8 + 1);
                for bulkhead in &bulkheads {
                    hub = hub.tag(&entrance_tag(*bulkhead));
                }
                self.add_zone(corridor, hub)?;
            }
            BulkheadTopology::IndependentRoots => {
                for bulkhead in bulkheads {
                    let open: Vec<ZoneId> = self
                        .planner
                        .get_open_zones(Bulkhead::Main, None)
                        .into_iter()
                        .filter(|id| {
                            self.planner
                                .get_node(*id)
                                .map_or(false, |n| n.has_tag(tags::STARTING_AREA))
                        })
                        .collect();
                    let from = self.rng.pick(&open).copied().unwrap_or(elevator);
                    self.add_zone(from, NewZone::starting_area().tag(&entrance_tag(bulkhead)))?;
                }
            }
        }
        debug!(
            topology = ?self.topology,
            zones = self.planner.zone_count(),
            "bulkhead entrances placed"
        );
        Ok(())
    }

    /// Zones that may hold the key to `bulkhead`'s door: the starting area,
    /// plus Main zones for secondary bulkheads
    fn key_candidates(&self, bulkhead: Bulkhead) -> Vec<ZoneId> {
        self.planner
            .get_zones(Bulkhead::Main, None)
            .into_iter()
            .filter(|id| {
                let starting = self
                    .planner
                    .get_node(*id)
                    .map_or(false, |n| n.has_tag(tags::STARTING_AREA));
                starting || !bulkhead.is_primary()
            })
            .collect()
    }

    /// Every bulkhead door gets its key somewhere reachable without crossing
    /// that door
    pub fn place_bulkhead_keys(&mut self) -> GenResult<()> {
        self.advance(BuildPhase::KeysPlaced);
        if !self.request.has_secondary() {
            return Ok(());
        }
        for bulkhead in self.request.bulkheads.clone() {
            let candidates = self.key_candidates(bulkhead);
            let Some(holder) = self.rng.pick(&candidates).copied() else {
                return Err(GenerationError::MissingPrerequisite(format!(
                    "no zone can hold the {bulkhead} bulkhead key"
                )));
            };
            self.place_item(holder, Item::BulkheadKey(bulkhead))?;
            self.tag(holder, tags::BULKHEAD_KEY)?;
            debug!(bulkhead = %bulkhead, holder = %holder, "bulkhead key placed");
        }
        Ok(())
    }

    /// Make room at bulkhead entrances and settle the single extraction zone
    pub fn adjust_special_zones(&mut self) -> GenResult<()> {
        self.advance(BuildPhase::SpecialZonesAdjusted);
        let large = CoverageSize::Large.coverage();
        for (bulkhead, id) in self.planner.get_bulkhead_entrance_zones() {
            match self.planner.zone_mut(id) {
                Ok(zone) => {
                    if zone.coverage.max < large.min {
                        zone.coverage = large;
                    }
                    if zone.light == Light::Blackout {
                        zone.light = Light::Emergency;
                    }
                }
                Err(err) => warn!(%err, bulkhead = %bulkhead, "entrance adjustment skipped"),
            }
        }

        let extraction = self.resolve_extraction()?;
        self.tag(extraction, tags::EXTRACTION)?;
        self.extraction = Some(extraction);
        debug!(extraction = %extraction, "extraction settled");
        Ok(())
    }

    fn resolve_extraction(&mut self) -> GenResult<ZoneId> {
        let exits: Vec<ZoneId> = self
            .planner
            .zones_with_tag(tags::EXIT)
            .into_iter()
            .filter(|id| id.bulkhead.is_primary())
            .collect();
        if let Some(exit) = exits.last().copied() {
            return Ok(exit);
        }

        let elevator = self.planner.branch_root(Bulkhead::Main).ok_or_else(|| {
            GenerationError::MissingPrerequisite("level has no elevator zone".to_string())
        })?;
        if self.options.forward_extraction
            && self.rng.flip(forward_extraction_chance(self.request.tier))
        {
            let from = self
                .objective_zones(Bulkhead::Main)
                .last()
                .copied()
                .or_else(|| self.planner.get_last_zone(Bulkhead::Main, None))
                .unwrap_or(elevator);
            let exit = self.add_exit_zone(from)?;
            debug!(from = %from, exit = %exit, "forward extraction added");
            return Ok(exit);
        }
        Ok(elevator)
    }
}
