//! Structural checks over a finished level.
//!
//! Everything here re-derives properties the builder is supposed to
//! guarantee, straight from the frozen [`LevelLayout`]: identity, parentage,
//! reachability, budgets and extraction. A clean level yields no violations.

use petgraph::algo::is_cyclic_directed;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::Bfs;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::layout::{tags, LevelLayout};
use crate::level::Bulkhead;
use crate::planner::ZoneId;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Violation {
    #[error("zone {0} appears more than once")]
    DuplicateZone(ZoneId),

    #[error("zone {child} has more than one build-from edge")]
    MultipleParents { child: ZoneId },

    #[error("zone {child} is built from {parent}, which does not exist yet")]
    ForwardReference { parent: ZoneId, child: ZoneId },

    #[error("zone {zone} cannot be reached from the {bulkhead} root")]
    Unreachable { bulkhead: Bulkhead, zone: ZoneId },

    #[error("build-from edges contain a cycle")]
    Cycle,

    #[error("{bulkhead} assigned {assigned} points over a ceiling of {ceiling}")]
    OverBudget {
        bulkhead: Bulkhead,
        assigned: u32,
        ceiling: u32,
    },

    #[error("level has {0} root zones")]
    RootCount(usize),

    #[error("level has {0} extraction zones")]
    ExtractionCount(usize),

    #[error("extraction {recorded} is not the zone tagged for extraction")]
    ExtractionMismatch { recorded: ZoneId },
}

/// Every violation found in `level`, in check order
pub fn validate_level(level: &LevelLayout) -> Vec<Violation> {
    let mut violations = Vec::new();
    check_identity(level, &mut violations);
    check_parentage(level, &mut violations);
    check_reachability(level, &mut violations);
    check_budgets(level, &mut violations);
    check_roots_and_extraction(level, &mut violations);
    violations
}

pub fn is_valid(level: &LevelLayout) -> bool {
    validate_level(level).is_empty()
}

fn check_identity(level: &LevelLayout, out: &mut Vec<Violation>) {
    let mut seen = BTreeSet::new();
    for record in level.zones() {
        if !seen.insert(record.id) {
            out.push(Violation::DuplicateZone(record.id));
        }
    }
}

/// Parents must come from an earlier position: earlier in the same
/// bulkhead, or from a bulkhead finalised before this one
fn check_parentage(level: &LevelLayout, out: &mut Vec<Violation>) {
    let mut parents: BTreeMap<ZoneId, usize> = BTreeMap::new();
    for branch in &level.branches {
        for (_, child) in &branch.edges {
            *parents.entry(*child).or_default() += 1;
        }
    }
    for (child, count) in &parents {
        if *count > 1 {
            out.push(Violation::MultipleParents { child: *child });
        }
    }

    let mut built: BTreeSet<ZoneId> = BTreeSet::new();
    for branch in &level.branches {
        for record in &branch.zones {
            if let Some(parent) = record.parent {
                if !built.contains(&parent) {
                    out.push(Violation::ForwardReference {
                        parent,
                        child: record.id,
                    });
                }
            }
            built.insert(record.id);
        }
    }
}

/// The whole level as one directed graph of build-from edges
pub fn level_graph(level: &LevelLayout) -> DiGraphMap<ZoneId, ()> {
    let mut graph = DiGraphMap::new();
    for record in level.zones() {
        graph.add_node(record.id);
        if let Some(parent) = record.parent {
            graph.add_edge(parent, record.id, ());
        }
    }
    graph
}

fn check_reachability(level: &LevelLayout, out: &mut Vec<Violation>) {
    let graph = level_graph(level);
    if is_cyclic_directed(&graph) {
        out.push(Violation::Cycle);
    }
    for branch in &level.branches {
        let mut reached = BTreeSet::new();
        let mut bfs = Bfs::new(&graph, branch.root);
        while let Some(zone) = bfs.next(&graph) {
            reached.insert(zone);
        }
        for record in &branch.zones {
            if !reached.contains(&record.id) {
                out.push(Violation::Unreachable {
                    bulkhead: branch.bulkhead,
                    zone: record.id,
                });
            }
        }
    }
}

fn check_budgets(level: &LevelLayout, out: &mut Vec<Violation>) {
    for branch in &level.branches {
        let assigned = branch.points_assigned();
        if assigned > branch.ceiling {
            out.push(Violation::OverBudget {
                bulkhead: branch.bulkhead,
                assigned,
                ceiling: branch.ceiling,
            });
        }
    }
}

fn check_roots_and_extraction(level: &LevelLayout, out: &mut Vec<Violation>) {
    let roots = level.roots().len();
    if roots != 1 {
        out.push(Violation::RootCount(roots));
    }
    let extraction = level.zones_with_tag(tags::EXTRACTION);
    if extraction.len() != 1 {
        out.push(Violation::ExtractionCount(extraction.len()));
    } else if extraction[0] != level.extraction {
        out.push(Violation::ExtractionMismatch {
            recorded: level.extraction,
        });
    }
}
