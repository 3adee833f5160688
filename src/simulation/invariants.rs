//! Consistency checks between lanes and the vehicle registry
//!
//! These hold after every tick. The world asserts them in debug builds and
//! tests call them directly.

use anyhow::{bail, Context, Result};

use super::road_network::RoadNetwork;
use super::stats::SimStats;
use super::types::CONTACT_EPSILON;
use super::vehicle::{LaneOccupant, VehicleRegistry};

/// Every lane is ordered by strictly decreasing distance and free of overlap
pub fn check_lane_order(network: &RoadNetwork, vehicles: &VehicleRegistry) -> Result<()> {
    for lane in network.lanes() {
        for pair in lane.vehicles().windows(2) {
            let leader = vehicles
                .get(&pair[0])
                .with_context(|| format!("Lane {:?} lists unknown vehicle {}", lane.id, pair[0]))?;
            let follower = vehicles
                .get(&pair[1])
                .with_context(|| format!("Lane {:?} lists unknown vehicle {}", lane.id, pair[1]))?;

            if follower.distance() >= leader.distance() {
                bail!(
                    "Lane {:?} out of order: {} at {} is behind {} at {}",
                    lane.id,
                    follower.id,
                    follower.distance(),
                    leader.id,
                    leader.distance()
                );
            }
            if follower.distance() - leader.rear() > CONTACT_EPSILON {
                bail!(
                    "Vehicles {} and {} overlap in lane {:?}",
                    follower.id,
                    leader.id,
                    lane.id
                );
            }
        }
    }
    Ok(())
}

/// Lanes list exactly the vehicles whose state places them there
pub fn check_membership(network: &RoadNetwork, vehicles: &VehicleRegistry) -> Result<()> {
    for vehicle in vehicles.values() {
        if vehicle.speed < 0.0 {
            bail!("Vehicle {} has negative speed {}", vehicle.id, vehicle.speed);
        }
        if vehicle.in_transit() == vehicle.city.is_some() {
            bail!("Vehicle {} is both parked and on a road, or neither", vehicle.id);
        }
        for lane in vehicle.occupied_lanes() {
            let listed = network
                .lane(lane)
                .with_context(|| format!("Vehicle {} is on unknown lane {:?}", vehicle.id, lane))?
                .contains(vehicle.id);
            if !listed {
                bail!("Vehicle {} is missing from lane {:?}", vehicle.id, lane);
            }
        }
    }

    for lane in network.lanes() {
        for id in lane.vehicles() {
            let vehicle = vehicles
                .get(id)
                .with_context(|| format!("Lane {:?} lists unknown vehicle {}", lane.id, id))?;
            if !vehicle.occupied_lanes().contains(&lane.id) {
                bail!("Vehicle {} is listed in lane {:?} it does not occupy", id, lane.id);
            }
        }
    }
    Ok(())
}

/// Trips started equal trips finished plus trips still on the road
pub fn check_conservation(stats: &SimStats, vehicles: &VehicleRegistry) -> Result<()> {
    let in_transit = vehicles.values().filter(|v| v.in_transit()).count();
    if !stats.is_conserved(in_transit) {
        bail!(
            "Conservation broken: dispatched {} != arrived {} + crashed {} + in transit {}",
            stats.dispatched,
            stats.arrived,
            stats.crashed,
            in_transit
        );
    }
    Ok(())
}

pub fn check_all(network: &RoadNetwork, vehicles: &VehicleRegistry, stats: &SimStats) -> Result<()> {
    check_lane_order(network, vehicles)?;
    check_membership(network, vehicles)?;
    check_conservation(stats, vehicles)
}
