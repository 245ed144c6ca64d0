use itertools::Itertools;
use nova_domain::ResourceKind;
use std::collections::HashMap;

/// Amounts below this are treated as exhausted; keeps the share loops from
/// chasing floating-point dust.
pub const EPSILON: f64 = 1e-6;

/// Fair-share collection of a resource pool into a single capacity: while
/// space and anything to take remain, every still-active resource gets an
/// equal slice of the remaining space, capped at what is left of it.
pub fn fair_share(available: f64, pool: &HashMap<ResourceKind, f64>) -> HashMap<ResourceKind, f64> {
    let mut remaining: HashMap<ResourceKind, f64> = pool.iter().filter(|(_, amount)| **amount > EPSILON).map(|(kind, amount)| (*kind, *amount)).collect();
    let mut space = available.max(0.0);
    let mut collected: HashMap<ResourceKind, f64> = HashMap::new();

    loop {
        let active = remaining.values().filter(|amount| **amount > EPSILON).count();
        let left: f64 = remaining.values().sum();
        if space <= EPSILON || left <= EPSILON || active == 0 {
            break;
        }

        let share = space / active as f64;
        for kind in remaining.keys().copied().sorted().collect_vec() {
            let in_pool = remaining[&kind];
            if in_pool <= EPSILON {
                continue;
            }
            let take = share.min(in_pool);
            *collected.entry(kind).or_insert(0.0) += take;
            remaining.insert(kind, in_pool - take);
            space -= take;
        }
    }

    collected.retain(|_, amount| *amount > EPSILON);
    collected
}

/// Two-dimensional fair share: a pool of resources split across several
/// capacities (one per fleet, in join order). Every pass, each active
/// (fleet, resource) cell takes `min(space / activeResources, left /
/// activeFleets)`; a resource that runs dry or a fleet that fills up drops
/// out of the next pass.
pub fn fair_share_across(pool: &HashMap<ResourceKind, f64>, capacities: &[f64]) -> Vec<HashMap<ResourceKind, f64>> {
    let mut remaining: HashMap<ResourceKind, f64> = pool.iter().filter(|(_, amount)| **amount > EPSILON).map(|(kind, amount)| (*kind, *amount)).collect();
    let mut spaces: Vec<f64> = capacities.iter().map(|capacity| capacity.max(0.0)).collect();
    let mut allocations: Vec<HashMap<ResourceKind, f64>> = vec![HashMap::new(); capacities.len()];

    loop {
        let active_fleets = spaces.iter().filter(|space| **space > EPSILON).count();
        let active_resources = remaining.values().filter(|amount| **amount > EPSILON).count();
        if active_fleets == 0 || active_resources == 0 {
            break;
        }

        let mut progressed = false;
        for fleet_index in 0..spaces.len() {
            if spaces[fleet_index] <= EPSILON {
                continue;
            }
            let fleet_share = spaces[fleet_index] / active_resources as f64;

            for kind in remaining.keys().copied().sorted().collect_vec() {
                let left = remaining[&kind];
                if left <= EPSILON {
                    continue;
                }
                let take = fleet_share.min(left / active_fleets as f64).min(spaces[fleet_index]);
                if take <= EPSILON {
                    continue;
                }
                *allocations[fleet_index].entry(kind).or_insert(0.0) += take;
                remaining.insert(kind, left - take);
                spaces[fleet_index] -= take;
                progressed = true;
            }
        }

        if !progressed {
            break;
        }
    }

    for allocation in &mut allocations {
        allocation.retain(|_, amount| *amount > EPSILON);
    }
    allocations
}
