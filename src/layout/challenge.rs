//! Gated challenge fragments.
//!
//! Each fragment grows a short segment from `start` and returns the zone on
//! the far side of its gate so callers can keep chaining.

use tracing::debug;

use super::{dark_corridor, fogged, labels, resource_cache, tags, LayoutBuilder, NewZone};
use crate::constants::OBJECTIVE_ZONE_MULTIPLIER;
use crate::director::EnemyGroup;
use crate::error::GenResult;
use crate::level::{Geometry, Tier};
use crate::planner::zone::{AlarmPuzzle, CoverageSize, DoorKind, DoorLock, Item, Terminal};
use crate::planner::ZoneId;

const KEYCARD_COLORS: [&str; 8] = [
    "red", "blue", "green", "yellow", "purple", "orange", "grey", "white",
];

impl<'g> LayoutBuilder<'g> {
    fn keycard_name(&mut self) -> String {
        let color = self.rng.pick(&KEYCARD_COLORS).copied().unwrap_or("grey");
        format!("key_{}_{}", color, self.next_serial())
    }

    fn cell_name(&mut self) -> String {
        format!("cell_{}", self.next_serial())
    }

    /// Hub whose side room holds a generator cell; the hub's far exit is a
    /// generator-powered door
    pub fn build_challenge_generator_cell(&mut self, start: ZoneId, side_len: u32) -> GenResult<ZoneId> {
        let cell = self.cell_name();
        let hub = self.add_zone(start, NewZone::hub())?;
        let side = self.add_branch(hub, side_len.max(1), labels::GENERATOR_CELL, Some(resource_cache))?;
        let holder = side.last().copied().unwrap_or(hub);
        self.place_item(holder, Item::GeneratorCell(cell.clone()))?;

        let far = self.add_zone(hub, NewZone::new())?;
        self.zone_mut(far)?.gate.lock = DoorLock::Generator(cell);
        debug!(hub = %hub, cell_zone = %holder, far = %far, "generator cell challenge");
        Ok(far)
    }

    /// Hub whose side room holds a keycard for the hub's far exit
    pub fn build_challenge_keycard(&mut self, start: ZoneId, side_len: u32) -> GenResult<ZoneId> {
        let card = self.keycard_name();
        let hub = self.add_zone(start, NewZone::hub())?;
        let side = self.add_branch(hub, side_len.max(1), labels::KEYCARD, None)?;
        let holder = side.last().copied().unwrap_or(hub);
        self.place_item(holder, Item::Keycard(card.clone()))?;

        let far = self.add_zone(hub, NewZone::new())?;
        self.zone_mut(far)?.gate.lock = DoorLock::Keycard(card);
        debug!(hub = %hub, card_zone = %holder, far = %far, "keycard challenge");
        Ok(far)
    }

    /// Corridor whose first door sets off an error alarm. With `turn_off`, a
    /// side room off the first corridor zone holds the terminal that stops it.
    pub fn build_challenge_error_alarm(
        &mut self,
        start: ZoneId,
        corridor_len: u32,
        turn_off: bool,
    ) -> GenResult<ZoneId> {
        let corridor = self.add_branch(start, corridor_len.max(1), labels::ERROR_ALARM, Some(dark_corridor))?;
        let alarm = corridor.first().copied().unwrap_or(start);
        let far = corridor.last().copied().unwrap_or(start);

        let off_zone = if turn_off {
            let side = self.add_zone(
                alarm,
                NewZone::new()
                    .label(labels::ERROR_ALARM_OFF)
                    .tag(tags::ERROR_ALARM_OFF)
                    .size(CoverageSize::Small),
            )?;
            self.place_terminal(side, Terminal::AlarmOff(alarm))?;
            Some(side)
        } else {
            None
        };
        self.zone_mut(alarm)?.gate.puzzle = AlarmPuzzle::ErrorAlarm { turn_off: off_zone };
        debug!(alarm = %alarm, off = ?off_zone, far = %far, "error alarm challenge");
        Ok(far)
    }

    /// Boss arena. The boss is an extra enemy group on top of the zone's
    /// points and does not draw from the budget.
    pub fn build_challenge_boss(&mut self, start: ZoneId) -> GenResult<ZoneId> {
        let arena = self.add_zone(
            start,
            NewZone::new()
                .tag(tags::BOSS)
                .geometry(Geometry::BossArena)
                .size(CoverageSize::Huge)
                .multiplier(OBJECTIVE_ZONE_MULTIPLIER),
        )?;
        let boss = match self.request.tier {
            Tier::A | Tier::B => "boss_tank",
            Tier::C => self
                .rng
                .select_copy(&[(2.0, "boss_tank"), (1.0, "boss_mother")])
                .unwrap_or("boss_tank"),
            Tier::D | Tier::E => self
                .rng
                .select_copy(&[(1.0, "boss_tank"), (1.0, "boss_mother"), (0.6, "boss_pouncer")])
                .unwrap_or("boss_mother"),
        };
        let zone = self.zone_mut(arena)?;
        zone.enemies.push(EnemyGroup::new(boss, 0));
        zone.resources.ammo += 1.0;
        debug!(arena = %arena, boss, "boss challenge");
        Ok(arena)
    }

    /// Chamber behind an apex door with an apex alarm
    pub fn build_challenge_apex_alarm(&mut self, start: ZoneId) -> GenResult<ZoneId> {
        let chamber = self.add_zone(
            start,
            NewZone::new()
                .tag(tags::APEX)
                .geometry(Geometry::ApexChamber)
                .size(CoverageSize::Large),
        )?;
        let gate = &mut self.zone_mut(chamber)?.gate;
        gate.door = DoorKind::Apex;
        gate.puzzle = AlarmPuzzle::Apex;
        debug!(chamber = %chamber, "apex alarm challenge");
        Ok(chamber)
    }

    /// Fogged garden detour. Only Service complexes carry gardens; elsewhere
    /// the fragment adds nothing and returns `start`.
    pub fn build_garden_detour(&mut self, start: ZoneId) -> GenResult<ZoneId> {
        if !self.request.complex.supports(Geometry::Garden) {
            debug!(complex = ?self.request.complex, "no garden tiles, detour skipped");
            return Ok(start);
        }
        let garden = self.add_zone(
            start,
            NewZone::new()
                .label(labels::GARDEN)
                .tag(tags::GARDEN)
                .geometry(Geometry::Garden)
                .size(CoverageSize::Large),
        )?;
        let zone = self.planner.zone_mut(garden)?;
        fogged(zone, self.rng);
        Ok(garden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutOptions;
    use crate::level::{Bulkhead, Complex, LevelRequest};
    use crate::random::Generator;

    fn with_builder(seed: &str, tier: Tier, complex: Complex, test: impl FnOnce(&mut LayoutBuilder<'_>, ZoneId)) {
        let mut rng = Generator::seeded(seed);
        let request = LevelRequest::new(tier, 1, complex);
        let mut builder = LayoutBuilder::new(request, LayoutOptions::default(), &mut rng);
        builder.select_topology();
        builder.place_entrances().unwrap();
        builder.prebuild_objectives();
        let root = builder.planner().branch_root(Bulkhead::Main).unwrap();
        test(&mut builder, root);
    }

    #[test]
    fn test_keycard_unlocks_far_side() {
        with_builder("keycard", Tier::C, Complex::Tech, |b, root| {
            let far = b.build_challenge_keycard(root, 2).unwrap();
            let hub = b.planner().parent_of(far).unwrap();
            assert!(b.planner().get_node(hub).unwrap().has_tag(tags::HUB));

            let DoorLock::Keycard(card) = b.planner().get_zone(far).unwrap().gate.lock.clone() else {
                panic!("far side is not keycard locked");
            };
            let holders: Vec<ZoneId> = b
                .planner()
                .get_zones(Bulkhead::Main, Some(labels::KEYCARD))
                .into_iter()
                .filter(|id| b.planner().get_zone(*id).unwrap().has_item(&Item::Keycard(card.clone())))
                .collect();
            assert_eq!(holders.len(), 1);
        });
    }

    #[test]
    fn test_generator_cell_lock_matches_item() {
        with_builder("cell", Tier::D, Complex::Mining, |b, root| {
            let far = b.build_challenge_generator_cell(root, 1).unwrap();
            let DoorLock::Generator(cell) = b.planner().get_zone(far).unwrap().gate.lock.clone() else {
                panic!("far side is not generator locked");
            };
            let side = b.planner().get_zones(Bulkhead::Main, Some(labels::GENERATOR_CELL));
            assert_eq!(side.len(), 1);
            assert!(b.planner().get_zone(side[0]).unwrap().has_item(&Item::GeneratorCell(cell)));
        });
    }

    #[test]
    fn test_error_alarm_turn_off_branch() {
        with_builder("alarm", Tier::E, Complex::Tech, |b, root| {
            let far = b.build_challenge_error_alarm(root, 2, true).unwrap();
            let corridor = b.planner().get_zones(Bulkhead::Main, Some(labels::ERROR_ALARM));
            assert_eq!(corridor.len(), 2);
            assert_eq!(corridor[1], far);

            let off = b.planner().zones_with_tag(tags::ERROR_ALARM_OFF);
            assert_eq!(off.len(), 1);
            assert_eq!(b.planner().parent_of(off[0]), Some(corridor[0]));
            assert_eq!(
                b.planner().get_zone(corridor[0]).unwrap().gate.puzzle,
                AlarmPuzzle::ErrorAlarm { turn_off: Some(off[0]) }
            );
            assert!(b
                .planner()
                .get_zone(off[0])
                .unwrap()
                .terminals
                .contains(&Terminal::AlarmOff(corridor[0])));
        });
    }

    #[test]
    fn test_error_alarm_without_turn_off() {
        with_builder("alarm-bare", Tier::B, Complex::Tech, |b, root| {
            let far = b.build_challenge_error_alarm(root, 1, false).unwrap();
            assert_eq!(
                b.planner().get_zone(far).unwrap().gate.puzzle,
                AlarmPuzzle::ErrorAlarm { turn_off: None }
            );
            assert!(b.planner().zones_with_tag(tags::ERROR_ALARM_OFF).is_empty());
        });
    }

    #[test]
    fn test_boss_and_apex_fragments() {
        with_builder("boss", Tier::E, Complex::Mining, |b, root| {
            let arena = b.build_challenge_boss(root).unwrap();
            let zone = b.planner().get_zone(arena).unwrap();
            assert_eq!(zone.geometry, Some(Geometry::BossArena));
            assert!(zone.enemies.iter().any(|g| g.token.starts_with("boss_") && g.cost == 0));

            let chamber = b.build_challenge_apex_alarm(arena).unwrap();
            let gate = &b.planner().get_zone(chamber).unwrap().gate;
            assert_eq!(gate.door, DoorKind::Apex);
            assert_eq!(gate.puzzle, AlarmPuzzle::Apex);
        });
    }

    #[test]
    fn test_garden_only_in_service() {
        with_builder("garden-tech", Tier::C, Complex::Tech, |b, root| {
            assert_eq!(b.build_garden_detour(root).unwrap(), root);
            assert!(b.planner().zones_with_tag(tags::GARDEN).is_empty());
        });
        with_builder("garden-service", Tier::C, Complex::Service, |b, root| {
            let garden = b.build_garden_detour(root).unwrap();
            assert_ne!(garden, root);
            assert_eq!(b.planner().get_zone(garden).unwrap().geometry, Some(Geometry::Garden));
        });
    }
}
