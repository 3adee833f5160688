//! Lane-change protocol
//!
//! A blocked vehicle looks for a safe slot in an adjacent lane, right lane
//! first. Once accepted it is listed in both lanes and drifts sideways a
//! fixed amount per tick until it has covered a full lane width.

use log::debug;

use super::config::SimConfig;
use super::road_network::RoadNetwork;
use super::types::{LaneId, VehicleId};
use super::vehicle::{LaneChange, LaneOccupant, VehicleRegistry};

/// Where a vehicle could slot into a candidate lane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneSlot {
    /// Something ahead or behind is too close
    Blocked,
    /// Nothing behind the vehicle; append at the back
    Back,
    /// Insert in front of the vehicle at this index
    Before(usize),
}

/// Evaluates one candidate lane for `vehicle`
///
/// A vehicle ahead must leave room for the candidate's stopping distance; a
/// vehicle behind must not be cut off, which means it needs its own stopping
/// distance and the distance it covers this tick. A vehicle level with the
/// candidate always blocks.
pub fn evaluate_slot(
    network: &RoadNetwork,
    vehicles: &VehicleRegistry,
    vehicle: VehicleId,
    lane: LaneId,
    delta_secs: f32,
) -> LaneSlot {
    let Some(candidate) = vehicles.get(&vehicle) else {
        return LaneSlot::Blocked;
    };
    let position = candidate.distance();

    for (index, other_id) in network.lane_vehicles(lane).iter().enumerate() {
        if *other_id == vehicle {
            return LaneSlot::Blocked;
        }
        let Some(other) = vehicles.get(other_id) else {
            continue;
        };

        if other.distance() > position {
            if other.rear() < position || other.rear() - candidate.stopping_distance() < position {
                return LaneSlot::Blocked;
            }
        } else if other.distance() < position {
            let reach = other.stopping_distance().max(other.speed() * delta_secs);
            if candidate.rear() < other.distance() + reach {
                return LaneSlot::Blocked;
            }
            return LaneSlot::Before(index);
        } else {
            return LaneSlot::Blocked;
        }
    }

    LaneSlot::Back
}

/// Right lane (next index) first, then left; the first lane offering a slot wins
pub fn can_switch(
    network: &RoadNetwork,
    vehicles: &VehicleRegistry,
    vehicle: VehicleId,
    delta_secs: f32,
) -> Option<(LaneId, LaneSlot)> {
    let origin = vehicles.get(&vehicle)?.lane?;
    let index = network.lane(origin)?.index;

    let candidates = [Some(index + 1), index.checked_sub(1)];
    candidates
        .into_iter()
        .flatten()
        .filter_map(|candidate| network.sibling_lane(origin, candidate))
        .map(|lane| (lane, evaluate_slot(network, vehicles, vehicle, lane, delta_secs)))
        .find(|(_, slot)| *slot != LaneSlot::Blocked)
}

/// Tries to start a lane change; on success the vehicle is listed in both lanes
pub fn try_start_switch(
    network: &mut RoadNetwork,
    vehicles: &mut VehicleRegistry,
    vehicle: VehicleId,
    delta_secs: f32,
) -> bool {
    let Some((target, slot)) = can_switch(network, vehicles, vehicle, delta_secs) else {
        return false;
    };
    let index = match slot {
        LaneSlot::Before(index) => Some(index),
        LaneSlot::Back => None,
        LaneSlot::Blocked => return false,
    };

    network.insert_at(target, index, vehicle);
    if let Some(v) = vehicles.get_mut(&vehicle) {
        v.lane_change = LaneChange::Switching {
            target,
            progress: 0.0,
        };
    }
    debug!("Vehicle {} switching into lane {:?}", vehicle, target);
    true
}

/// Advances every in-progress lane change by one tick
///
/// Returns the vehicles that completed their switch.
pub fn progress_switches(
    network: &mut RoadNetwork,
    vehicles: &mut VehicleRegistry,
    config: &SimConfig,
) -> Vec<VehicleId> {
    let mut completed = Vec::new();

    for vehicle in vehicles.values_mut() {
        let (Some(origin), LaneChange::Switching { target, progress }) =
            (vehicle.lane, vehicle.lane_change)
        else {
            continue;
        };

        let origin_index = network.lane(origin).map_or(0, |lane| lane.index);
        let target_index = network.lane(target).map_or(0, |lane| lane.index);
        let direction = if target_index > origin_index { 1.0 } else { -1.0 };
        let progress = progress + config.switch_rate * direction;

        if progress.abs() >= config.lane_width {
            network.remove_vehicle(origin, vehicle.id);
            vehicle.lane = Some(target);
            vehicle.lane_change = LaneChange::Cruising;
            completed.push(vehicle.id);
            debug!("Vehicle {} settled in lane {:?}", vehicle.id, target);
        } else {
            vehicle.lane_change = LaneChange::Switching { target, progress };
        }

        if let Some(position) = network.vehicle_position(vehicle) {
            vehicle.position = position;
        }
    }

    completed
}
