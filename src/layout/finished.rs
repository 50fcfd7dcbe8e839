//! Finished, read-only level output handed to the serializer and the
//! objective postbuild step.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use super::{BuildPhase, LayoutBuilder};
use crate::constants::{ALIAS_BASE_MAX, ALIAS_BASE_MIN};
use crate::error::{GenResult, GenerationError};
use crate::level::{Bulkhead, BulkheadTopology, Complex, Complexity, Tier};
use crate::objective::Objective;
use crate::planner::zone::Zone;
use crate::planner::ZoneId;

/// One zone of a finished branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneRecord {
    pub id: ZoneId,
    pub parent: Option<ZoneId>,
    /// Sub-branch label
    pub branch: String,
    pub tags: Vec<String>,
    pub max_connections: u8,
    pub zone: Zone,
}

impl ZoneRecord {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Finished graph of one bulkhead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchLayout {
    pub bulkhead: Bulkhead,
    pub objective: Objective,
    pub complexity: Complexity,
    pub budget: u32,
    pub ceiling: u32,
    pub root: ZoneId,
    /// Zones the postbuild step attaches win conditions to
    pub objective_zones: Vec<ZoneId>,
    /// Zones in creation order
    pub zones: Vec<ZoneRecord>,
    /// Build-from edges whose child lives in this bulkhead
    pub edges: Vec<(ZoneId, ZoneId)>,
}

impl BranchLayout {
    pub fn zone(&self, id: ZoneId) -> Option<&ZoneRecord> {
        self.zones.iter().find(|z| z.id == id)
    }

    pub fn points_assigned(&self) -> u32 {
        self.zones.iter().map(|z| z.zone.enemy_points).sum()
    }

    pub fn zones_in<'a>(&'a self, branch: &'a str) -> impl Iterator<Item = &'a ZoneRecord> + 'a {
        self.zones.iter().filter(move |z| z.branch == branch)
    }

    pub fn error_alarms(&self) -> usize {
        self.zones
            .iter()
            .filter(|z| z.zone.gate.puzzle.is_error_alarm())
            .count()
    }
}

/// Finished level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelLayout {
    pub tier: Tier,
    pub index: u32,
    pub complex: Complex,
    pub topology: BulkheadTopology,
    pub alias_base: u32,
    pub extraction: ZoneId,
    pub branches: Vec<BranchLayout>,
}

impl LevelLayout {
    pub fn label(&self) -> String {
        format!("{}{}", self.tier, self.index)
    }

    pub fn branch(&self, bulkhead: Bulkhead) -> Option<&BranchLayout> {
        self.branches.iter().find(|b| b.bulkhead == bulkhead)
    }

    pub fn zones(&self) -> impl Iterator<Item = &ZoneRecord> {
        self.branches.iter().flat_map(|b| b.zones.iter())
    }

    pub fn zone(&self, id: ZoneId) -> Option<&ZoneRecord> {
        self.branch(id.bulkhead).and_then(|b| b.zone(id))
    }

    pub fn zone_count(&self) -> usize {
        self.branches.iter().map(|b| b.zones.len()).sum()
    }

    pub fn zones_with_tag(&self, tag: &str) -> Vec<ZoneId> {
        self.zones().filter(|z| z.has_tag(tag)).map(|z| z.id).collect()
    }

    /// Zones without a parent; a well-formed level has exactly one
    pub fn roots(&self) -> Vec<ZoneId> {
        self.zones().filter(|z| z.parent.is_none()).map(|z| z.id).collect()
    }
}

impl<'g> LayoutBuilder<'g> {
    /// Close every director, number the zones and freeze the graph
    pub fn finalize(mut self) -> GenResult<LevelLayout> {
        self.advance(BuildPhase::Finalized);
        for director in self.directors.values_mut() {
            director.finish();
        }

        let alias_base = self.rng.range(ALIAS_BASE_MIN, ALIAS_BASE_MAX);
        let mut ordinal = 0;
        for bulkhead in Bulkhead::ALL {
            for id in self.planner.get_zones(bulkhead, None) {
                self.planner.zone_mut(id)?.alias = Some(alias_base + ordinal);
                ordinal += 1;
            }
        }

        let extraction = self.extraction.ok_or_else(|| {
            GenerationError::MissingPrerequisite("extraction zone was never settled".to_string())
        })?;

        let mut branches = Vec::with_capacity(self.directors.len());
        for (bulkhead, director) in &self.directors {
            let root = self.planner.branch_root(*bulkhead).ok_or_else(|| {
                GenerationError::MissingPrerequisite(format!("{bulkhead} bulkhead has no zones"))
            })?;
            let objective = director.objective.clone().ok_or_else(|| {
                GenerationError::MissingPrerequisite(format!("{bulkhead} objective was never prebuilt"))
            })?;

            let mut zones = Vec::new();
            for (node, zone) in self.planner.iter().filter(|(n, _)| n.id.bulkhead == *bulkhead) {
                zones.push(ZoneRecord {
                    id: node.id,
                    parent: self.planner.parent_of(node.id),
                    branch: node.branch().to_string(),
                    tags: node.tags.iter().cloned().collect(),
                    max_connections: node.max_connections,
                    zone: zone.clone(),
                });
            }
            let edges = self
                .planner
                .edges()
                .into_iter()
                .filter(|(_, child)| child.bulkhead == *bulkhead)
                .collect();

            branches.push(BranchLayout {
                bulkhead: *bulkhead,
                objective,
                complexity: director.complexity,
                budget: director.points,
                ceiling: director.ceiling(),
                root,
                objective_zones: self.objective_zones(*bulkhead).to_vec(),
                zones,
                edges,
            });
        }

        let spent: BTreeMap<Bulkhead, u32> = self
            .directors
            .iter()
            .map(|(b, d)| (*b, d.spent))
            .collect();
        debug!(alias_base, ?spent, "level finalised");

        Ok(LevelLayout {
            tier: self.request.tier,
            index: self.request.index,
            complex: self.request.complex,
            topology: self.topology,
            alias_base,
            extraction,
            branches,
        })
    }
}
