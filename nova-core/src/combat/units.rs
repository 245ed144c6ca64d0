use crate::error::MissionError;
use itertools::Itertools;
use nova_domain::{Attacker, Catalog, CelestialBody, DefenseInFight, Defender, Fleet, FleetId, FleetUnits, PlayerId, ShipInFight, TechnologyKind};
use std::collections::HashMap;

fn weapon_multiplier(technologies: &HashMap<TechnologyKind, u32>) -> f64 {
    1.0 + technologies.get(&TechnologyKind::WeaponsTechnology).copied().unwrap_or(0) as f64 * 0.1
}

fn shield_multiplier(technologies: &HashMap<TechnologyKind, u32>) -> f64 {
    1.0 + technologies.get(&TechnologyKind::ShieldingTechnology).copied().unwrap_or(0) as f64 * 0.1
}

fn hull_multiplier(technologies: &HashMap<TechnologyKind, u32>) -> f64 {
    1.0 + technologies.get(&TechnologyKind::ArmourTechnology).copied().unwrap_or(0) as f64 * 0.1
}

/// Folds a fleet's ships into fight view groups, the owner's combat tech
/// multipliers baked into every stat.
pub fn ships_of_fleet(fleet: &Fleet, technologies: &HashMap<TechnologyKind, u32>, catalog: &Catalog) -> Result<Vec<ShipInFight>, MissionError> {
    ship_groups(fleet.id, &fleet.ships, technologies, catalog)
}

fn ship_groups(
    fleet: FleetId,
    ships: &HashMap<nova_domain::ShipKind, u32>,
    technologies: &HashMap<TechnologyKind, u32>,
    catalog: &Catalog,
) -> Result<Vec<ShipInFight>, MissionError> {
    let weapon = weapon_multiplier(technologies);
    let shield = shield_multiplier(technologies);
    let hull = hull_multiplier(technologies);

    ships
        .iter()
        .sorted_by_key(|(kind, _)| **kind)
        .filter(|(_, count)| **count > 0)
        .map(|(kind, count)| {
            let descriptor = catalog
                .ship(kind)
                .ok_or_else(|| MissionError::NotFound(format!("ship descriptor {kind}")))?;
            Ok(ShipInFight {
                fleet,
                kind: *kind,
                count: *count,
                cargo_capacity: descriptor.cargo_capacity,
                shield: descriptor.shield * shield,
                weapon: descriptor.weapon * weapon,
                hull: descriptor.hull * hull,
                rapid_fire_ships: descriptor.rapid_fire_ships.clone(),
                rapid_fire_defenses: descriptor.rapid_fire_defenses.clone(),
            })
        })
        .collect()
}

/// The attacking side: one wave per fleet, in join order, which also fixes
/// the firing order in the engine.
pub fn assemble_attacker(
    fleets: &[Fleet],
    technologies: &HashMap<PlayerId, HashMap<TechnologyKind, u32>>,
    catalog: &Catalog,
) -> Result<Attacker, MissionError> {
    let empty = HashMap::new();
    let mut units = Vec::with_capacity(fleets.len());
    for fleet in fleets {
        let techs = technologies.get(&fleet.player).unwrap_or(&empty);
        units.push(FleetUnits {
            fleet: fleet.id,
            ships: ships_of_fleet(fleet, techs, catalog)?,
        });
    }
    Ok(Attacker { units })
}

/// The defending side: the body's own ships, any reinforcement fleets
/// holding position there (fighting with their owners' research), and the
/// stationary defenses. The body snapshot carries its owner's levels.
pub fn assemble_defender(
    body: &CelestialBody,
    reinforcements: &[Fleet],
    technologies: &HashMap<PlayerId, HashMap<TechnologyKind, u32>>,
    catalog: &Catalog,
) -> Result<Defender, MissionError> {
    // Indigenous ships belong to no fleet; a nil id keeps the grouping
    // uniform through the engine.
    let indigenous = ship_groups(FleetId(uuid::Uuid::nil()), &body.ships, &body.technologies, catalog)?;

    let empty = HashMap::new();
    let mut reinforcement_ships = Vec::new();
    for fleet in reinforcements {
        let techs = technologies.get(&fleet.player).unwrap_or(&empty);
        reinforcement_ships.extend(ships_of_fleet(fleet, techs, catalog)?);
    }

    let weapon = weapon_multiplier(&body.technologies);
    let shield = shield_multiplier(&body.technologies);
    let hull = hull_multiplier(&body.technologies);

    let defenses = body
        .defenses
        .iter()
        .sorted_by_key(|(kind, _)| **kind)
        .filter(|(_, count)| **count > 0)
        .map(|(kind, count)| {
            let descriptor = catalog
                .defense(kind)
                .ok_or_else(|| MissionError::NotFound(format!("defense descriptor {kind}")))?;
            Ok(DefenseInFight {
                body: body.id,
                kind: *kind,
                count: *count,
                shield: descriptor.shield * shield,
                weapon: descriptor.weapon * weapon,
                hull: descriptor.hull * hull,
            })
        })
        .collect::<Result<Vec<_>, MissionError>>()?;

    Ok(Defender {
        indigenous,
        reinforcements: reinforcement_ships,
        defenses,
    })
}
