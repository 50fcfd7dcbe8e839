//! Enrichment passes.
//!
//! Run once per bulkhead after the graph is complete. The passes only touch
//! zone content (gates, terminals, scouts) and never add zones. Zones whose
//! entry already carries an error alarm, an apex alarm or a bulkhead door are
//! left alone, as are quiet starting-area zones.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::constants::{ERROR_ALARM_DECAY, MAX_ERROR_ALARMS};
use crate::layout::tags;
use crate::level::{Bulkhead, Tier};
use crate::planner::zone::{AlarmPuzzle, BloodDoor, DoorLock, ScoutPack, Terminal};
use crate::planner::{LevelPlanner, ZoneId};
use crate::random::{FrequencyPool, Generator};

/// What the passes added to one bulkhead
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentReport {
    pub blood_doors: usize,
    pub error_alarms: usize,
    pub alarm_off_terminals: usize,
    pub scouts: usize,
}

/// Per-zone blood door chance and the branch cap
pub fn blood_door_table(tier: Tier) -> (f64, usize) {
    match tier {
        Tier::A => (0.0, 0),
        Tier::B => (0.10, 1),
        Tier::C => (0.15, 1),
        Tier::D => (0.20, 2),
        Tier::E => (0.25, 3),
    }
}

/// Chance of the first error alarm; later ones decay geometrically
pub fn error_alarm_chance(tier: Tier) -> f64 {
    match tier {
        Tier::A => 0.0,
        Tier::B => 0.20,
        Tier::C => 0.35,
        Tier::D => 0.55,
        Tier::E => 0.90,
    }
}

/// Per-zone scout chance and the branch cap
pub fn scout_table(tier: Tier) -> (f64, usize) {
    match tier {
        Tier::A => (0.0, 0),
        Tier::B => (0.10, 1),
        Tier::C => (0.15, 2),
        Tier::D => (0.20, 3),
        Tier::E => (0.25, 4),
    }
}

/// Chance that an added error alarm also gets a turn-off terminal
fn alarm_off_chance(tier: Tier) -> f64 {
    match tier {
        Tier::A | Tier::B => 1.0,
        Tier::C => 0.7,
        Tier::D => 0.5,
        Tier::E => 0.35,
    }
}

/// How many error alarms to add to a branch
pub fn roll_error_alarm_count(tier: Tier, rng: &mut Generator) -> usize {
    roll_decaying(error_alarm_chance(tier), 0, rng)
}

fn roll_decaying(chance: f64, count: usize, rng: &mut Generator) -> usize {
    if count >= MAX_ERROR_ALARMS || !rng.flip(chance) {
        return count;
    }
    roll_decaying(chance * ERROR_ALARM_DECAY, count + 1, rng)
}

fn horde_token(tier: Tier) -> &'static str {
    match tier {
        Tier::A | Tier::B => "horde_small",
        Tier::C | Tier::D => "horde_medium",
        Tier::E => "horde_large",
    }
}

fn scout_pool(tier: Tier) -> FrequencyPool<ScoutPack> {
    let scout = |token: &str, count: u32| ScoutPack {
        token: token.to_string(),
        count,
    };
    let pool = FrequencyPool::new()
        .with_recurring(3.0, 3, scout("scout", 1))
        .with_recurring(1.0, 2, scout("scout", 2));
    match tier {
        Tier::A | Tier::B => pool,
        Tier::C => pool.with_forced(1.0, scout("scout_shadow", 1)),
        Tier::D | Tier::E => pool
            .with_forced(1.0, scout("scout_shadow", 1))
            .with_forced(1.0, scout("scout_charger", 1)),
    }
}

/// Zones the passes may decorate, in creation order
fn decoratable(planner: &LevelPlanner, bulkhead: Bulkhead) -> Vec<ZoneId> {
    planner
        .get_zones(bulkhead, None)
        .into_iter()
        .filter(|id| planner.parent_of(*id).is_some())
        .filter(|id| {
            planner
                .get_node(*id)
                .map_or(false, |node| !node.has_tag(tags::STARTING_AREA))
        })
        .filter(|id| {
            planner
                .get_zone(*id)
                .map_or(false, |zone| !zone.gate.is_special() && zone.enemy_multiplier > 0.0)
        })
        .collect()
}

/// Run blood door, error alarm and scout passes over one bulkhead
pub fn enrich_branch(
    planner: &mut LevelPlanner,
    bulkhead: Bulkhead,
    tier: Tier,
    rng: &mut Generator,
) -> EnrichmentReport {
    let mut report = EnrichmentReport::default();
    report.blood_doors = place_blood_doors(planner, bulkhead, tier, rng);
    let (alarms, offs) = place_error_alarms(planner, bulkhead, tier, rng);
    report.error_alarms = alarms;
    report.alarm_off_terminals = offs;
    report.scouts = place_scouts(planner, bulkhead, tier, rng);
    report
}

/// Per-zone Bernoulli trial until the tier cap is reached
pub fn place_blood_doors(
    planner: &mut LevelPlanner,
    bulkhead: Bulkhead,
    tier: Tier,
    rng: &mut Generator,
) -> usize {
    let (chance, cap) = blood_door_table(tier);
    if cap == 0 {
        return 0;
    }
    let mut candidates = decoratable(planner, bulkhead);
    rng.shuffle(&mut candidates);

    let mut placed = 0;
    for id in candidates {
        if placed >= cap {
            break;
        }
        if !rng.flip(chance) {
            continue;
        }
        if let Ok(zone) = planner.zone_mut(id) {
            if zone.gate.blood_door.is_some() {
                continue;
            }
            zone.gate.blood_door = Some(BloodDoor {
                horde: horde_token(tier).to_string(),
            });
            placed += 1;
            trace!(zone = %id, "blood door");
        }
    }
    placed
}

/// Interior zones first: not the branch root, not the newest zone, and no
/// lock, blood door or alarm already on the door
fn alarm_candidates(planner: &LevelPlanner, bulkhead: Bulkhead) -> Vec<ZoneId> {
    let root = planner.branch_root(bulkhead);
    let last = planner.get_last_zone(bulkhead, None);
    let open_gate = |id: &ZoneId| {
        planner.get_zone(*id).map_or(false, |zone| {
            zone.gate.lock == DoorLock::None
                && zone.gate.blood_door.is_none()
                && !zone.gate.puzzle.is_error_alarm()
        })
    };

    let decoratable = decoratable(planner, bulkhead);
    let interior: Vec<ZoneId> = decoratable
        .iter()
        .copied()
        .filter(|id| Some(*id) != root && Some(*id) != last)
        .filter(open_gate)
        .collect();
    if !interior.is_empty() {
        return interior;
    }

    let mut ends: Vec<ZoneId> = Vec::new();
    for id in [decoratable.first().copied(), last].into_iter().flatten() {
        if decoratable.contains(&id) && !ends.contains(&id) {
            ends.push(id);
        }
    }
    ends
}

/// Every zone built, directly or indirectly, from `id` inside its bulkhead
fn descendants(planner: &LevelPlanner, id: ZoneId) -> Vec<ZoneId> {
    let mut out = Vec::new();
    let mut stack: Vec<ZoneId> = planner.children_of(id).to_vec();
    while let Some(next) = stack.pop() {
        if next.bulkhead != id.bulkhead {
            continue;
        }
        out.push(next);
        stack.extend_from_slice(planner.children_of(next));
    }
    out.sort();
    out
}

/// Returns (alarms added, turn-off terminals added)
pub fn place_error_alarms(
    planner: &mut LevelPlanner,
    bulkhead: Bulkhead,
    tier: Tier,
    rng: &mut Generator,
) -> (usize, usize) {
    let wanted = roll_error_alarm_count(tier, rng);
    let mut placed = 0;
    let mut offs = 0;

    for _ in 0..wanted {
        let mut candidates = alarm_candidates(planner, bulkhead);
        let Some(alarm) = rng.draw(&mut candidates) else {
            debug!(bulkhead = %bulkhead, wanted, placed, "no zone left for an error alarm");
            break;
        };

        let mut turn_off = None;
        if rng.flip(alarm_off_chance(tier)) {
            let below = descendants(planner, alarm);
            if let Some(off) = rng.pick(&below).copied() {
                if let Ok(zone) = planner.zone_mut(off) {
                    zone.terminals.push(Terminal::AlarmOff(alarm));
                    turn_off = Some(off);
                    offs += 1;
                }
                if let Err(err) = planner.tag(off, tags::ERROR_ALARM_OFF) {
                    debug!(zone = %off, %err, "could not tag alarm-off zone");
                }
            }
        }

        if let Ok(zone) = planner.zone_mut(alarm) {
            zone.gate.puzzle = AlarmPuzzle::ErrorAlarm { turn_off };
            placed += 1;
            trace!(zone = %alarm, off = ?turn_off, "error alarm");
        }
    }
    (placed, offs)
}

/// Per-zone Bernoulli trial until the cap; each hit draws one scout pack
pub fn place_scouts(
    planner: &mut LevelPlanner,
    bulkhead: Bulkhead,
    tier: Tier,
    rng: &mut Generator,
) -> usize {
    let (chance, cap) = scout_table(tier);
    if cap == 0 {
        return 0;
    }
    let mut pool = scout_pool(tier);
    let candidates: Vec<ZoneId> = decoratable(planner, bulkhead)
        .into_iter()
        .filter(|id| {
            planner
                .get_zone(*id)
                .map_or(false, |zone| !zone.gate.puzzle.is_error_alarm())
        })
        .collect();

    let mut placed = 0;
    for id in candidates {
        if placed >= cap {
            break;
        }
        if !rng.flip(chance) {
            continue;
        }
        let Some(pack) = pool.draw(rng) else {
            break;
        };
        if let Ok(zone) = planner.zone_mut(id) {
            zone.scouts.push(pack);
            placed += 1;
        }
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::zone::{DoorKind, Zone};
    use crate::planner::ZoneNode;

    /// Elevator plus a straight chain of `len` ordinary zones
    fn chain(len: u32) -> LevelPlanner {
        let mut planner = LevelPlanner::new();
        let quiet = Zone {
            enemy_multiplier: 0.0,
            ..Zone::default()
        };
        let root = ZoneId::new(Bulkhead::Main, planner.next_index(Bulkhead::Main));
        planner.add_zone(ZoneNode::new(root).with_tag(tags::STARTING_AREA), quiet);
        let mut parent = root;
        for _ in 0..len {
            let id = ZoneId::new(Bulkhead::Main, planner.next_index(Bulkhead::Main));
            planner.add_zone(ZoneNode::new(id), Zone::default());
            planner.connect(parent, id).unwrap();
            parent = id;
        }
        planner
    }

    fn alarms(planner: &LevelPlanner) -> usize {
        planner
            .iter()
            .filter(|(_, zone)| zone.gate.puzzle.is_error_alarm())
            .count()
    }

    #[test]
    fn test_tier_a_rolls_no_alarms() {
        let mut rng = Generator::seeded("alarm-a");
        for _ in 0..2000 {
            assert_eq!(roll_error_alarm_count(Tier::A, &mut rng), 0);
        }
    }

    #[test]
    fn test_tier_e_alarm_rate() {
        let mut rng = Generator::seeded("alarm-e");
        let samples = 10_000;
        let mut hits = 0;
        for _ in 0..samples {
            let count = roll_error_alarm_count(Tier::E, &mut rng);
            assert!(count <= MAX_ERROR_ALARMS);
            if count > 0 {
                hits += 1;
            }
        }
        assert!(hits as f64 / samples as f64 >= 0.85, "only {hits} of {samples}");
    }

    #[test]
    fn test_enrichment_never_adds_zones() {
        for tier in Tier::ALL {
            let mut rng = Generator::seeded(&format!("grow-{tier}"));
            let mut planner = chain(8);
            let before = planner.zone_count();
            let edges = planner.edges();
            enrich_branch(&mut planner, Bulkhead::Main, tier, &mut rng);
            assert_eq!(planner.zone_count(), before);
            assert_eq!(planner.edges(), edges);
        }
    }

    #[test]
    fn test_caps_hold() {
        for i in 0..50 {
            let mut rng = Generator::seeded(&format!("caps-{i}"));
            let mut planner = chain(30);
            let report = enrich_branch(&mut planner, Bulkhead::Main, Tier::E, &mut rng);
            assert!(report.blood_doors <= 3);
            assert!(report.scouts <= 4);
            assert!(report.error_alarms <= MAX_ERROR_ALARMS);
            assert_eq!(alarms(&planner), report.error_alarms);
        }
    }

    #[test]
    fn test_tier_a_adds_nothing() {
        let mut rng = Generator::seeded("calm");
        let mut planner = chain(12);
        let report = enrich_branch(&mut planner, Bulkhead::Main, Tier::A, &mut rng);
        assert_eq!(report, EnrichmentReport::default());
    }

    #[test]
    fn test_special_gates_are_skipped() {
        let mut rng = Generator::seeded("special");
        let mut planner = chain(4);
        for id in planner.ids() {
            let gate = &mut planner.zone_mut(id).unwrap().gate;
            gate.door = DoorKind::Apex;
            gate.puzzle = AlarmPuzzle::Apex;
        }
        let report = enrich_branch(&mut planner, Bulkhead::Main, Tier::E, &mut rng);
        assert_eq!(report, EnrichmentReport::default());
    }

    #[test]
    fn test_alarms_prefer_interior_zones() {
        for i in 0..40 {
            let mut rng = Generator::seeded(&format!("interior-{i}"));
            let mut planner = chain(6);
            place_error_alarms(&mut planner, Bulkhead::Main, Tier::E, &mut rng);
            let last = planner.get_last_zone(Bulkhead::Main, None).unwrap();
            assert!(!planner.get_zone(last).unwrap().gate.puzzle.is_error_alarm());
        }
    }

    #[test]
    fn test_alarm_off_terminal_sits_past_the_alarm() {
        for i in 0..40 {
            let mut rng = Generator::seeded(&format!("off-{i}"));
            let mut planner = chain(6);
            place_error_alarms(&mut planner, Bulkhead::Main, Tier::B, &mut rng);
            for (node, zone) in planner.iter() {
                if let AlarmPuzzle::ErrorAlarm { turn_off: Some(off) } = zone.gate.puzzle {
                    assert!(planner.depth(off) > planner.depth(node.id));
                    let terminals = &planner.get_zone(off).unwrap().terminals;
                    assert!(terminals.contains(&Terminal::AlarmOff(node.id)));
                }
            }
        }
    }
}
