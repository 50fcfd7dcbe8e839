//! Zone graph planner.
//!
//! Append-only arena of zones keyed by [`ZoneId`]. Zones are registered,
//! then built from exactly one already-registered parent. Nothing is ever
//! removed; content and tags may be updated in place, identity never changes.
//! All queries return ids or borrowed views, never handles into the growing
//! storage.

pub mod zone;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{trace, warn};

use crate::constants::{DEFAULT_MAX_CONNECTIONS, PRIMARY_BRANCH};
use crate::error::{GenResult, GenerationError};
use crate::level::Bulkhead;
use zone::Zone;

/// Stable identity of a zone: bulkhead plus bulkhead-scoped number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId {
    pub bulkhead: Bulkhead,
    pub number: u32,
}

impl ZoneId {
    pub fn new(bulkhead: Bulkhead, number: u32) -> Self {
        Self { bulkhead, number }
    }
}

impl fmt::Display for ZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.bulkhead, self.number)
    }
}

/// Graph identity record of a zone. The sub-branch label is fixed at
/// creation; tags may change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneNode {
    pub id: ZoneId,
    pub label: Option<String>,
    pub tags: BTreeSet<String>,
    pub max_connections: u8,
}

impl ZoneNode {
    pub fn new(id: ZoneId) -> Self {
        Self {
            id,
            label: None,
            tags: BTreeSet::new(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    pub fn with_max_connections(mut self, max: u8) -> Self {
        self.max_connections = max;
        self
    }

    /// Sub-branch label; unlabeled zones belong to the primary sub-branch
    pub fn branch(&self) -> &str {
        self.label.as_deref().unwrap_or(PRIMARY_BRANCH)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    fn matches(&self, bulkhead: Bulkhead, branch: Option<&str>) -> bool {
        self.id.bulkhead == bulkhead && branch.map_or(true, |b| self.branch() == b)
    }
}

/// Tag naming the zone that holds the bulkhead door into `bulkhead`
pub fn entrance_tag(bulkhead: Bulkhead) -> String {
    format!("bulkhead_entrance:{}", bulkhead.as_str().to_ascii_lowercase())
}

#[derive(Debug, Clone, PartialEq)]
struct Slot {
    node: ZoneNode,
    zone: Zone,
    parent: Option<ZoneId>,
    children: Vec<ZoneId>,
    /// Creation order across the whole planner
    order: usize,
}

/// Append-only zone store for one level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelPlanner {
    slots: Vec<Slot>,
    index: BTreeMap<ZoneId, usize>,
    counters: BTreeMap<Bulkhead, u32>,
}

impl LevelPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next zone number for a bulkhead. Monotonic: numbers handed out are
    /// never reused even if the caller never registers the zone.
    pub fn next_index(&mut self, bulkhead: Bulkhead) -> u32 {
        let counter = self.counters.entry(bulkhead).or_insert(0);
        let number = *counter;
        *counter += 1;
        number
    }

    /// Register a zone, or replace its content if already registered.
    /// Identity fields of an existing node are left untouched; tags from
    /// `node` are merged in.
    pub fn add_zone(&mut self, node: ZoneNode, zone: Zone) -> ZoneId {
        let id = node.id;
        if let Some(&slot) = self.index.get(&id) {
            let existing = &mut self.slots[slot];
            existing.zone = zone;
            existing.node.tags.extend(node.tags);
            return id;
        }

        // keep the counter ahead of explicitly numbered zones
        let counter = self.counters.entry(id.bulkhead).or_insert(0);
        if *counter <= id.number {
            *counter = id.number + 1;
        }

        let order = self.slots.len();
        self.index.insert(id, order);
        self.slots.push(Slot {
            node,
            zone,
            parent: None,
            children: Vec::new(),
            order,
        });
        trace!(zone = %id, "zone registered");
        id
    }

    /// Record the build-from edge `parent -> child`
    pub fn connect(&mut self, parent: ZoneId, child: ZoneId) -> GenResult<()> {
        if parent == child {
            return Err(GenerationError::SelfConnection(child));
        }
        let parent_slot = self.slot_index(parent)?;
        let child_slot = self.slot_index(child)?;

        if let Some(existing) = self.slots[child_slot].parent {
            return Err(GenerationError::AlreadyConnected { child, existing });
        }

        // walking up from the parent must never reach the child
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == child {
                return Err(GenerationError::CycleDetected { parent, child });
            }
            cursor = self.parent_of(id);
        }

        let parent_node = &self.slots[parent_slot];
        if parent_node.children.len() >= parent_node.node.max_connections as usize {
            warn!(
                parent = %parent,
                child = %child,
                max = parent_node.node.max_connections,
                "zone connection limit exceeded"
            );
        }

        self.slots[parent_slot].children.push(child);
        self.slots[child_slot].parent = Some(parent);
        Ok(())
    }

    fn slot_index(&self, id: ZoneId) -> GenResult<usize> {
        self.index
            .get(&id)
            .copied()
            .ok_or(GenerationError::UnknownZone(id))
    }

    pub fn contains(&self, id: ZoneId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn zone_count(&self) -> usize {
        self.slots.len()
    }

    pub fn get_zone(&self, id: ZoneId) -> Option<&Zone> {
        self.index.get(&id).map(|&i| &self.slots[i].zone)
    }

    pub fn get_node(&self, id: ZoneId) -> Option<&ZoneNode> {
        self.index.get(&id).map(|&i| &self.slots[i].node)
    }

    /// Mutable access to a zone's content (not its identity)
    pub fn zone_mut(&mut self, id: ZoneId) -> GenResult<&mut Zone> {
        let slot = self.slot_index(id)?;
        Ok(&mut self.slots[slot].zone)
    }

    /// Add a tag to an existing zone
    pub fn tag(&mut self, id: ZoneId, tag: &str) -> GenResult<()> {
        let slot = self.slot_index(id)?;
        self.slots[slot].node.tags.insert(tag.to_string());
        Ok(())
    }

    pub fn untag(&mut self, id: ZoneId, tag: &str) -> GenResult<()> {
        let slot = self.slot_index(id)?;
        self.slots[slot].node.tags.remove(tag);
        Ok(())
    }

    pub fn parent_of(&self, id: ZoneId) -> Option<ZoneId> {
        self.index.get(&id).and_then(|&i| self.slots[i].parent)
    }

    pub fn children_of(&self, id: ZoneId) -> &[ZoneId] {
        self.index
            .get(&id)
            .map(|&i| self.slots[i].children.as_slice())
            .unwrap_or(&[])
    }

    /// Creation position of a zone across the whole planner
    pub fn order_of(&self, id: ZoneId) -> Option<usize> {
        self.index.get(&id).map(|&i| self.slots[i].order)
    }

    /// All zones in creation order
    pub fn iter(&self) -> impl Iterator<Item = (&ZoneNode, &Zone)> {
        self.slots.iter().map(|s| (&s.node, &s.zone))
    }

    /// Every registered id in creation order
    pub fn ids(&self) -> Vec<ZoneId> {
        self.slots.iter().map(|s| s.node.id).collect()
    }

    /// Build-from edges in child creation order
    pub fn edges(&self) -> Vec<(ZoneId, ZoneId)> {
        self.slots
            .iter()
            .filter_map(|s| s.parent.map(|p| (p, s.node.id)))
            .collect()
    }

    /// Zones of a bulkhead, optionally limited to one sub-branch, in
    /// creation order
    pub fn get_zones(&self, bulkhead: Bulkhead, branch: Option<&str>) -> Vec<ZoneId> {
        self.slots
            .iter()
            .filter(|s| s.node.matches(bulkhead, branch))
            .map(|s| s.node.id)
            .collect()
    }

    /// Zones that can still take another connection
    pub fn get_open_zones(&self, bulkhead: Bulkhead, branch: Option<&str>) -> Vec<ZoneId> {
        self.slots
            .iter()
            .filter(|s| s.node.matches(bulkhead, branch))
            .filter(|s| s.children.len() < s.node.max_connections as usize)
            .map(|s| s.node.id)
            .collect()
    }

    /// Zones of a bulkhead with no children yet
    pub fn get_leaf_zones(&self, bulkhead: Bulkhead) -> Vec<ZoneId> {
        self.slots
            .iter()
            .filter(|s| s.node.id.bulkhead == bulkhead && s.children.is_empty())
            .map(|s| s.node.id)
            .collect()
    }

    /// Most recently added zone matching the filter
    pub fn get_last_zone(&self, bulkhead: Bulkhead, branch: Option<&str>) -> Option<ZoneId> {
        self.slots
            .iter()
            .rev()
            .find(|s| s.node.matches(bulkhead, branch))
            .map(|s| s.node.id)
    }

    pub fn zones_with_tag(&self, tag: &str) -> Vec<ZoneId> {
        self.slots
            .iter()
            .filter(|s| s.node.has_tag(tag))
            .map(|s| s.node.id)
            .collect()
    }

    /// Zones (in any bulkhead) tagged as the entrance to another bulkhead,
    /// paired with the bulkhead they lead into
    pub fn get_bulkhead_entrance_zones(&self) -> Vec<(Bulkhead, ZoneId)> {
        let mut out = Vec::new();
        for slot in &self.slots {
            for bulkhead in Bulkhead::ALL {
                if slot.node.has_tag(&entrance_tag(bulkhead)) {
                    out.push((bulkhead, slot.node.id));
                }
            }
        }
        out
    }

    /// First zone of a bulkhead whose parent is absent or lives in another
    /// bulkhead
    pub fn branch_root(&self, bulkhead: Bulkhead) -> Option<ZoneId> {
        self.slots
            .iter()
            .filter(|s| s.node.id.bulkhead == bulkhead)
            .find(|s| s.parent.map_or(true, |p| p.bulkhead != bulkhead))
            .map(|s| s.node.id)
    }

    /// Bulkheads that have at least one zone, in canonical order
    pub fn bulkheads(&self) -> Vec<Bulkhead> {
        Bulkhead::ALL
            .iter()
            .copied()
            .filter(|b| self.slots.iter().any(|s| s.node.id.bulkhead == *b))
            .collect()
    }

    /// Number of edges between the zone and its bulkhead's root
    pub fn depth(&self, id: ZoneId) -> usize {
        let mut depth = 0;
        let mut cursor = self.parent_of(id);
        while let Some(parent) = cursor {
            if parent.bulkhead != id.bulkhead {
                break;
            }
            depth += 1;
            cursor = self.parent_of(parent);
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(planner: &mut LevelPlanner, bulkhead: Bulkhead, label: Option<&str>) -> ZoneId {
        let number = planner.next_index(bulkhead);
        let mut node = ZoneNode::new(ZoneId::new(bulkhead, number));
        if let Some(label) = label {
            node = node.with_label(label);
        }
        planner.add_zone(node, Zone::default())
    }

    #[test]
    fn test_next_index_is_per_bulkhead() {
        let mut planner = LevelPlanner::new();
        assert_eq!(planner.next_index(Bulkhead::Main), 0);
        assert_eq!(planner.next_index(Bulkhead::Main), 1);
        assert_eq!(planner.next_index(Bulkhead::Extreme), 0);
        assert_eq!(planner.next_index(Bulkhead::Main), 2);
    }

    #[test]
    fn test_connect_rejects_reparenting() {
        let mut planner = LevelPlanner::new();
        let root = add(&mut planner, Bulkhead::Main, None);
        let a = add(&mut planner, Bulkhead::Main, None);
        let b = add(&mut planner, Bulkhead::Main, None);
        planner.connect(root, a).unwrap();
        planner.connect(root, b).unwrap();
        let err = planner.connect(a, b).unwrap_err();
        assert_eq!(
            err,
            GenerationError::AlreadyConnected {
                child: b,
                existing: root
            }
        );
        assert_eq!(planner.parent_of(b), Some(root));
    }

    #[test]
    fn test_connect_rejects_cycles_and_unknowns() {
        let mut planner = LevelPlanner::new();
        let root = add(&mut planner, Bulkhead::Main, None);
        let a = add(&mut planner, Bulkhead::Main, None);
        planner.connect(root, a).unwrap();
        assert_eq!(
            planner.connect(a, root),
            Err(GenerationError::CycleDetected {
                parent: a,
                child: root
            })
        );
        assert_eq!(
            planner.connect(root, root),
            Err(GenerationError::SelfConnection(root))
        );
        let ghost = ZoneId::new(Bulkhead::Overload, 9);
        assert_eq!(
            planner.connect(root, ghost),
            Err(GenerationError::UnknownZone(ghost))
        );
    }

    #[test]
    fn test_add_zone_is_idempotent() {
        let mut planner = LevelPlanner::new();
        let id = add(&mut planner, Bulkhead::Main, Some("spur"));
        let mut zone = Zone::default();
        zone.enemy_points = 12;
        planner.add_zone(ZoneNode::new(id).with_tag("hub"), zone);
        assert_eq!(planner.zone_count(), 1);
        assert_eq!(planner.get_zone(id).unwrap().enemy_points, 12);
        let node = planner.get_node(id).unwrap();
        assert_eq!(node.branch(), "spur");
        assert!(node.has_tag("hub"));
    }

    #[test]
    fn test_unlabeled_zones_are_primary() {
        let mut planner = LevelPlanner::new();
        let a = add(&mut planner, Bulkhead::Main, None);
        let b = add(&mut planner, Bulkhead::Main, Some("items"));
        assert_eq!(planner.get_zones(Bulkhead::Main, Some(PRIMARY_BRANCH)), vec![a]);
        assert_eq!(planner.get_zones(Bulkhead::Main, Some("items")), vec![b]);
        assert_eq!(planner.get_zones(Bulkhead::Main, None), vec![a, b]);
    }

    #[test]
    fn test_open_leaf_and_last_queries() {
        let mut planner = LevelPlanner::new();
        let root = add(&mut planner, Bulkhead::Main, None);
        let a = add(&mut planner, Bulkhead::Main, None);
        let b = add(&mut planner, Bulkhead::Main, Some("side"));
        planner.connect(root, a).unwrap();
        planner.connect(root, b).unwrap();

        assert_eq!(planner.get_open_zones(Bulkhead::Main, None), vec![a, b]);
        assert_eq!(planner.get_leaf_zones(Bulkhead::Main), vec![a, b]);
        assert_eq!(planner.get_last_zone(Bulkhead::Main, None), Some(b));
        assert_eq!(planner.get_last_zone(Bulkhead::Main, Some(PRIMARY_BRANCH)), Some(a));
        assert_eq!(planner.get_last_zone(Bulkhead::Extreme, None), None);
    }

    #[test]
    fn test_bulkhead_entrances_and_roots() {
        let mut planner = LevelPlanner::new();
        let root = add(&mut planner, Bulkhead::Main, None);
        planner.tag(root, &entrance_tag(Bulkhead::Extreme)).unwrap();
        let extreme = add(&mut planner, Bulkhead::Extreme, None);
        planner.connect(root, extreme).unwrap();
        let deeper = add(&mut planner, Bulkhead::Extreme, None);
        planner.connect(extreme, deeper).unwrap();

        assert_eq!(
            planner.get_bulkhead_entrance_zones(),
            vec![(Bulkhead::Extreme, root)]
        );
        assert_eq!(planner.branch_root(Bulkhead::Main), Some(root));
        assert_eq!(planner.branch_root(Bulkhead::Extreme), Some(extreme));
        assert_eq!(planner.depth(deeper), 1);
        assert_eq!(planner.bulkheads(), vec![Bulkhead::Main, Bulkhead::Extreme]);
    }

    #[test]
    fn test_connection_limit_is_soft() {
        let mut planner = LevelPlanner::new();
        let root_id = ZoneId::new(Bulkhead::Main, planner.next_index(Bulkhead::Main));
        let root = planner.add_zone(ZoneNode::new(root_id).with_max_connections(1), Zone::default());
        let a = add(&mut planner, Bulkhead::Main, None);
        let b = add(&mut planner, Bulkhead::Main, None);
        planner.connect(root, a).unwrap();
        assert!(planner.connect(root, b).is_ok());
        assert!(planner.get_open_zones(Bulkhead::Main, None).iter().all(|z| *z != root));
    }
}
