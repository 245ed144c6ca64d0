use crate::rng::MissionRng;
use itertools::Itertools;
use nova_domain::{
    Attacker, Catalog, DefenseInFight, DefenseKind, Defender, FightOutcome, FleetId, ResourceKind, ShipInFight, ShipKind, Universe,
};
use std::collections::HashMap;
use tracing::{event, Level};

/// The reference engine resolves at most this many rounds before calling
/// the fight a draw.
pub const MAX_ROUNDS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Attacker,
    Defender,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnitKind {
    Ship(ShipKind),
    Defense(DefenseKind),
}

/// One homogeneous block of units still standing. `hull_left` tracks the
/// damage eaten by the block's current lead unit.
#[derive(Debug, Clone)]
struct Block {
    side: Side,
    wave: usize,
    fleet: Option<FleetId>,
    kind: UnitKind,
    count: u32,
    initial: u32,
    weapon: f64,
    shield: f64,
    hull: f64,
    hull_left: f64,
    rapid_fire_ships: HashMap<ShipKind, u32>,
    rapid_fire_defenses: HashMap<DefenseKind, u32>,
}

impl Block {
    fn from_ship(side: Side, wave: usize, group: &ShipInFight) -> Block {
        Block {
            side,
            wave,
            fleet: (!group.fleet.0.is_nil()).then_some(group.fleet),
            kind: UnitKind::Ship(group.kind),
            count: group.count,
            initial: group.count,
            weapon: group.weapon,
            shield: group.shield,
            hull: group.hull,
            hull_left: group.hull,
            rapid_fire_ships: group.rapid_fire_ships.clone(),
            rapid_fire_defenses: group.rapid_fire_defenses.clone(),
        }
    }

    fn from_defense(side: Side, group: &DefenseInFight) -> Block {
        Block {
            side,
            wave: usize::MAX,
            fleet: None,
            kind: UnitKind::Defense(group.kind),
            count: group.count,
            initial: group.count,
            weapon: group.weapon,
            shield: group.shield,
            hull: group.hull,
            hull_left: group.hull,
            rapid_fire_ships: HashMap::new(),
            rapid_fire_defenses: HashMap::new(),
        }
    }

    fn alive(&self) -> bool {
        self.count > 0
    }

    /// Applies one shot to the block's lead unit; damage below the shield
    /// is shrugged off entirely.
    fn take_hit(&mut self, weapon: f64) -> bool {
        let damage = (weapon - self.shield).max(0.0);
        if damage <= 0.0 {
            return false;
        }
        self.hull_left -= damage;
        if self.hull_left <= 0.0 {
            self.count -= 1;
            self.hull_left = self.hull;
            return true;
        }
        false
    }

    fn rapid_fire_against(&self, target: &Block) -> u32 {
        match target.kind {
            UnitKind::Ship(kind) => self.rapid_fire_ships.get(&kind).copied().unwrap_or(0),
            UnitKind::Defense(kind) => self.rapid_fire_defenses.get(&kind).copied().unwrap_or(0),
        }
    }
}

/// Survivors and losses of one side after the dust settles.
#[derive(Debug, Clone, Default)]
pub struct SideTally {
    pub surviving_ships: HashMap<Option<FleetId>, HashMap<ShipKind, u32>>,
    pub surviving_defenses: HashMap<DefenseKind, u32>,
    pub destroyed_ships: HashMap<ShipKind, u32>,
    pub destroyed_defenses: HashMap<DefenseKind, u32>,
}

#[derive(Debug, Clone)]
pub struct EngineResult {
    pub outcome: FightOutcome,
    pub rounds: usize,
    pub attacker: SideTally,
    pub defender: SideTally,
    pub debris: HashMap<ResourceKind, f64>,
}

/// Round-based resolution: every unit fires once per round at a uniformly
/// random opposing unit, rapid fire replays with probability `(rf-1)/rf`,
/// hull exhaustion removes units, and the fight ends after `MAX_ROUNDS`
/// rounds or when one side is swept. The outcome reads from the defender's
/// side: `Loss` means the defender was wiped out.
pub fn resolve_fight(attacker: &Attacker, defender: &Defender, universe: &Universe, catalog: &Catalog, rng: &mut MissionRng) -> EngineResult {
    let mut blocks: Vec<Block> = Vec::new();
    for (wave, fleet_units) in attacker.units.iter().enumerate() {
        blocks.extend(fleet_units.ships.iter().map(|group| Block::from_ship(Side::Attacker, wave, group)));
    }
    blocks.extend(defender.indigenous.iter().map(|group| Block::from_ship(Side::Defender, 0, group)));
    blocks.extend(defender.reinforcements.iter().map(|group| Block::from_ship(Side::Defender, 1, group)));
    blocks.extend(defender.defenses.iter().map(|group| Block::from_defense(Side::Defender, group)));

    let mut rounds = 0;
    while rounds < MAX_ROUNDS && both_sides_standing(&blocks) {
        rounds += 1;
        fire_round(&mut blocks, rng);
    }

    let attacker_alive = blocks.iter().any(|block| block.side == Side::Attacker && block.alive());
    let defender_alive = blocks.iter().any(|block| block.side == Side::Defender && block.alive());
    let outcome = match (attacker_alive, defender_alive) {
        (false, _) => FightOutcome::Victory,
        (true, true) => FightOutcome::Draw,
        (true, false) => FightOutcome::Loss,
    };

    let attacker_tally = tally(&blocks, Side::Attacker);
    let defender_tally = tally(&blocks, Side::Defender);
    let debris = debris_of(&attacker_tally, &defender_tally, universe, catalog);

    event!(Level::DEBUG, rounds, ?outcome, debris_total = debris.values().sum::<f64>(), "fight resolved");

    EngineResult {
        outcome,
        rounds,
        attacker: attacker_tally,
        defender: defender_tally,
        debris,
    }
}

fn both_sides_standing(blocks: &[Block]) -> bool {
    blocks.iter().any(|block| block.side == Side::Attacker && block.alive()) && blocks.iter().any(|block| block.side == Side::Defender && block.alive())
}

/// Firing order: attacker waves in join order, then the defender's blocks.
/// Hits land immediately, so later shooters see the round's earlier losses.
fn fire_round(blocks: &mut Vec<Block>, rng: &mut MissionRng) {
    let order: Vec<usize> = blocks
        .iter()
        .enumerate()
        .sorted_by_key(|(index, block)| (block.side == Side::Defender, block.wave, *index))
        .map(|(index, _)| index)
        .collect();

    for shooter_index in order {
        let shots = blocks[shooter_index].count;
        if shots == 0 {
            continue;
        }
        for _ in 0..shots {
            let mut keep_firing = true;
            while keep_firing {
                let Some(target_index) = pick_opponent(blocks, blocks[shooter_index].side, rng) else {
                    return;
                };

                let weapon = blocks[shooter_index].weapon;
                blocks[target_index].take_hit(weapon);

                let rapid_fire = blocks[shooter_index].rapid_fire_against(&blocks[target_index]);
                keep_firing = rapid_fire > 1 && rng.roll() < (rapid_fire - 1) as f64 / rapid_fire as f64;
            }
        }
    }
}

fn pick_opponent(blocks: &[Block], shooter_side: Side, rng: &mut MissionRng) -> Option<usize> {
    let total: u32 = blocks.iter().filter(|block| block.side != shooter_side).map(|block| block.count).sum();
    if total == 0 {
        return None;
    }

    let mut pick = rng.pick(total as usize) as u32;
    for (index, block) in blocks.iter().enumerate() {
        if block.side == shooter_side || block.count == 0 {
            continue;
        }
        if pick < block.count {
            return Some(index);
        }
        pick -= block.count;
    }
    None
}

fn tally(blocks: &[Block], side: Side) -> SideTally {
    let mut out = SideTally::default();
    for block in blocks.iter().filter(|block| block.side == side) {
        let lost = block.initial - block.count;
        match block.kind {
            UnitKind::Ship(kind) => {
                if block.count > 0 {
                    *out.surviving_ships.entry(block.fleet).or_default().entry(kind).or_insert(0) += block.count;
                }
                if lost > 0 {
                    *out.destroyed_ships.entry(kind).or_insert(0) += lost;
                }
            }
            UnitKind::Defense(kind) => {
                if block.count > 0 {
                    *out.surviving_defenses.entry(kind).or_insert(0) += block.count;
                }
                if lost > 0 {
                    *out.destroyed_defenses.entry(kind).or_insert(0) += lost;
                }
            }
        }
    }
    out
}

fn debris_of(attacker: &SideTally, defender: &SideTally, universe: &Universe, catalog: &Catalog) -> HashMap<ResourceKind, f64> {
    let mut debris: HashMap<ResourceKind, f64> = HashMap::new();

    for (kind, count) in attacker.destroyed_ships.iter().chain(defender.destroyed_ships.iter()) {
        if let Some(descriptor) = catalog.ship(kind) {
            for (resource, amount) in &descriptor.cost {
                *debris.entry(*resource).or_insert(0.0) += amount * *count as f64 * universe.ships_to_ruins;
            }
        }
    }
    for (kind, count) in &defender.destroyed_defenses {
        if let Some(descriptor) = catalog.defense(kind) {
            for (resource, amount) in &descriptor.cost {
                *debris.entry(*resource).or_insert(0.0) += amount * *count as f64 * universe.defenses_to_ruins;
            }
        }
    }

    debris.retain(|_, amount| *amount > 0.0);
    debris
}
