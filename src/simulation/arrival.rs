//! Arrival handling
//!
//! Vehicles close enough to the end of their road leave it and park in the
//! destination city.

use log::debug;

use super::config::SimConfig;
use super::events::SimEvent;
use super::road_network::RoadNetwork;
use super::types::VehicleId;
use super::vehicle::VehicleRegistry;

/// Detaches every vehicle that reached the end of its road
///
/// Persistent vehicles stay parked in the destination city; the others are
/// dropped from the registry. Returns the ids of the arrived vehicles.
pub fn handle_arrivals(
    network: &mut RoadNetwork,
    vehicles: &mut VehicleRegistry,
    config: &SimConfig,
    events: &mut Vec<SimEvent>,
) -> Vec<VehicleId> {
    let arrived: Vec<VehicleId> = vehicles
        .values()
        .filter(|vehicle| {
            vehicle
                .road
                .and_then(|road| network.road(road))
                .is_some_and(|road| {
                    vehicle.distance_travelled > road.length - config.arrival_threshold
                })
        })
        .map(|vehicle| vehicle.id)
        .collect();

    for id in &arrived {
        let Some(vehicle) = vehicles.get_mut(id) else {
            continue;
        };
        let Some(destination) = vehicle.road.and_then(|road| network.road(road)).map(|r| r.to)
        else {
            continue;
        };

        for lane in vehicle.occupied_lanes() {
            network.remove_vehicle(lane, *id);
        }

        events.push(SimEvent::Arrived {
            vehicle: *id,
            distance_travelled: vehicle.distance_travelled,
            class: vehicle.class_name.clone(),
        });
        debug!(
            "Vehicle {} arrived after {:.1} units",
            id, vehicle.distance_travelled
        );

        vehicle.park(destination);
        if let Some(city) = network.city_mut(destination) {
            city.population = city.population.saturating_add(1);
        }
        if !vehicle.persistent {
            vehicles.remove(id);
        }
    }

    arrived
}
