//! Car-following model
//!
//! Speeds are updated lane by lane, front to back, against the positions of
//! the previous tick. Only then does every vehicle move, once, and each lane
//! is checked for rear-end collisions.

use log::warn;
use std::collections::BTreeSet;

use super::events::SimEvent;
use super::lane_change::try_start_switch;
use super::road_network::RoadNetwork;
use super::types::{VehicleId, CONTACT_EPSILON};
use super::vehicle::{LaneChange, LaneOccupant, Movable, Vehicle, VehicleRegistry};

/// The closest vehicle ahead, looking at the origin lane and, while
/// switching, the target lane as well
pub fn leader_of(
    network: &RoadNetwork,
    vehicles: &VehicleRegistry,
    vehicle: &Vehicle,
) -> Option<VehicleId> {
    vehicle
        .occupied_lanes()
        .into_iter()
        .filter_map(|lane| network.lane(lane)?.leader_of(vehicle.id))
        .filter_map(|leader| vehicles.get(&leader))
        .min_by(|a, b| a.distance().total_cmp(&b.distance()))
        .map(|leader| leader.id)
}

/// Free road up to the closest rear bumper ahead, over every lane the vehicle occupies
fn room_ahead(network: &RoadNetwork, vehicles: &VehicleRegistry, vehicle: &Vehicle) -> Option<f32> {
    vehicle
        .occupied_lanes()
        .into_iter()
        .filter_map(|lane| network.lane(lane)?.leader_of(vehicle.id))
        .filter_map(|leader| vehicles.get(&leader))
        .map(|leader| leader.rear() - vehicle.distance())
        .min_by(f32::total_cmp)
}

/// Accelerates towards the preferred speed without overshooting it
fn pursue_preferred(vehicle: &mut Vehicle, delta_secs: f32) {
    if vehicle.speed < vehicle.preferred_speed {
        if !vehicle.lane_change.is_switching() {
            vehicle.speed =
                (vehicle.speed + vehicle.acceleration * delta_secs).min(vehicle.preferred_speed);
        }
    } else if vehicle.speed > vehicle.preferred_speed {
        vehicle.speed = (vehicle.speed - vehicle.brakes * delta_secs).max(vehicle.preferred_speed);
    }
}

/// Speed update for one vehicle
///
/// Below the safe gap the vehicle asks for a lane change and brakes whatever
/// the answer. The resulting speed never carries it past the leader's rear
/// bumper within this tick.
fn update_speed(
    network: &mut RoadNetwork,
    vehicles: &mut VehicleRegistry,
    id: VehicleId,
    delta_secs: f32,
) {
    let Some(vehicle) = vehicles.get(&id) else {
        return;
    };
    let leader = leader_of(network, vehicles, vehicle)
        .and_then(|leader| vehicles.get(&leader))
        .map(|leader| (leader.distance(), leader.width()));

    let Some((leader_distance, leader_width)) = leader else {
        if let Some(vehicle) = vehicles.get_mut(&id) {
            if vehicle.lane_change == LaneChange::Requesting {
                vehicle.lane_change = LaneChange::Cruising;
            }
            pursue_preferred(vehicle, delta_secs);
        }
        return;
    };

    let gap = leader_distance - vehicle.distance();
    let safe_gap = vehicle.stopping_distance() + leader_width;
    let switching = vehicle.lane_change.is_switching();

    if gap < safe_gap {
        if !switching && !try_start_switch(network, vehicles, id, delta_secs) {
            if let Some(vehicle) = vehicles.get_mut(&id) {
                vehicle.lane_change = LaneChange::Requesting;
            }
        }
        if let Some(vehicle) = vehicles.get_mut(&id) {
            vehicle.speed = (vehicle.speed - vehicle.brakes * delta_secs).max(0.0);
        }
    } else if let Some(vehicle) = vehicles.get_mut(&id) {
        if vehicle.lane_change == LaneChange::Requesting {
            vehicle.lane_change = LaneChange::Cruising;
        }
        if gap > safe_gap
            && !vehicle.lane_change.is_switching()
            && vehicle.speed < vehicle.preferred_speed
        {
            vehicle.speed =
                (vehicle.speed + vehicle.acceleration * delta_secs).min(vehicle.preferred_speed);
        }
    }

    // Includes the target lane of a switch that started just now
    let room = vehicles
        .get(&id)
        .and_then(|vehicle| room_ahead(network, vehicles, vehicle));
    if let (Some(room), Some(vehicle)) = (room, vehicles.get_mut(&id)) {
        if delta_secs > 0.0 {
            vehicle.speed = vehicle.speed.min(room.max(0.0) / delta_secs);
        }
    }
}

/// Updates the speed of every in-transit vehicle
pub fn update_speeds(network: &mut RoadNetwork, vehicles: &mut VehicleRegistry, delta_secs: f32) {
    let lanes: Vec<_> = network.lane_ids().collect();
    for lane in lanes {
        let snapshot = network.lane_vehicles(lane).to_vec();
        for id in snapshot {
            // A switching vehicle is listed twice; handle it in its origin lane
            if vehicles.get(&id).and_then(|v| v.lane) != Some(lane) {
                continue;
            }
            update_speed(network, vehicles, id, delta_secs);
        }
    }
}

/// Moves every in-transit vehicle once, then removes vehicles that collided
///
/// Returns the crashed vehicles, each exactly once.
pub fn move_and_detect(
    network: &mut RoadNetwork,
    vehicles: &mut VehicleRegistry,
    delta_secs: f32,
    events: &mut Vec<SimEvent>,
) -> Vec<Vehicle> {
    for vehicle in vehicles.values_mut().filter(|v| v.in_transit()) {
        vehicle.advance(delta_secs);
        if let Some(position) = network.vehicle_position(vehicle) {
            vehicle.position = position;
        }
    }

    let mut crashed = BTreeSet::new();
    for lane in network.lanes() {
        for pair in lane.vehicles().windows(2) {
            let (Some(leader), Some(follower)) = (vehicles.get(&pair[0]), vehicles.get(&pair[1]))
            else {
                continue;
            };
            if follower.distance() - leader.rear() > CONTACT_EPSILON {
                warn!(
                    "Vehicle {} ran into vehicle {} at {:.1}",
                    follower.id,
                    leader.id,
                    leader.distance()
                );
                events.push(SimEvent::Crashed {
                    position: leader.position,
                    a: follower.id,
                    b: leader.id,
                });
                crashed.insert(follower.id);
                crashed.insert(leader.id);
            }
        }
    }

    let mut removed = Vec::with_capacity(crashed.len());
    for id in crashed {
        let Some(vehicle) = vehicles.remove(&id) else {
            continue;
        };
        for lane in vehicle.occupied_lanes() {
            network.remove_vehicle(lane, id);
        }
        removed.push(vehicle);
    }
    removed
}
