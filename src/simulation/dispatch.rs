//! Dispatch scheduling
//!
//! Each tick, queued wave requests are served first. Organic traffic then
//! comes from a pluggable `DispatchPolicy`: either a demand curve peaking at
//! rush hour, or persistent commuters leaving inside their departure windows.
//! A lane that cannot take another vehicle simply defers to the next tick.

use log::{debug, warn};
use std::fmt::Debug;

use super::clock::Clock;
use super::config::SimConfig;
use super::events::SimEvent;
use super::level::{VehicleCatalog, VehicleClass};
use super::random::SimRng;
use super::road_network::RoadNetwork;
use super::types::{CityCategory, CityId, LaneId, RoadId, VehicleId};
use super::vehicle::{stopping_distance, LaneOccupant, Trip, Vehicle, VehicleRegistry};

/// Everything a dispatch pass may read or touch
pub struct DispatchContext<'a> {
    pub network: &'a mut RoadNetwork,
    pub vehicles: &'a mut VehicleRegistry,
    pub catalog: &'a VehicleCatalog,
    pub clock: &'a Clock,
    pub config: &'a SimConfig,
    pub rng: &'a mut SimRng,
    pub next_id: &'a mut usize,
    pub events: &'a mut Vec<SimEvent>,
}

impl DispatchContext<'_> {
    pub fn allocate_id(&mut self) -> VehicleId {
        let id = VehicleId(*self.next_id);
        *self.next_id += 1;
        id
    }

    /// Whether `lane` can take a vehicle entering at `speed` with the given brakes
    ///
    /// The rearmost vehicle must have cleared the minimum travel distance and
    /// must be far enough ahead for the newcomer to stop behind it.
    pub fn can_dispatch(&self, lane: LaneId, speed: f32, brakes: f32) -> bool {
        can_dispatch(&*self.network, &*self.vehicles, self.config, lane, speed, brakes)
    }

    /// First lane, by index, of the first road in `roads` with capacity
    pub fn free_lane(&self, roads: &[RoadId], speed: f32, brakes: f32) -> Option<(RoadId, LaneId)> {
        roads.iter().find_map(|road_id| {
            let road = self.network.road(*road_id)?;
            road.lanes
                .iter()
                .find(|lane| self.can_dispatch(**lane, speed, brakes))
                .map(|lane| (*road_id, *lane))
        })
    }

    /// Speed a vehicle has when leaving a city
    pub fn departure_speed(&self, vehicle: &Vehicle) -> f32 {
        self.config.departure_speed.min(vehicle.preferred_speed)
    }

    /// Puts a registered vehicle at the back of `lane`
    pub fn depart(&mut self, id: VehicleId, road: RoadId, lane: LaneId) {
        let Some(vehicle) = self.vehicles.get_mut(&id) else {
            return;
        };
        let from = vehicle.city.unwrap_or(vehicle.home);
        let speed = self.config.departure_speed.min(vehicle.preferred_speed);
        vehicle.depart(road, lane, speed);
        if let Some(position) = self.network.vehicle_position(vehicle) {
            vehicle.position = position;
        }

        self.network.insert_at(lane, None, id);
        if let Some(city) = self.network.city_mut(from) {
            city.population = city.population.saturating_sub(1);
        }
        self.events.push(SimEvent::Dispatched {
            vehicle: id,
            from,
            road,
        });
        debug!("Dispatched vehicle {} from {:?} onto {:?}", id, from, lane);
    }

    /// Creates a vehicle of `class` idle in `home`
    pub fn create_vehicle(
        &mut self,
        class: &VehicleClass,
        home: CityId,
        destination: CityCategory,
        persistent: bool,
    ) -> VehicleId {
        let id = self.allocate_id();
        let mut vehicle = Vehicle::new(id, class, home, destination, self.rng);
        if persistent {
            vehicle = vehicle.with_commute(self.rng);
        }
        self.vehicles.insert(id, vehicle);
        id
    }
}

pub fn can_dispatch(
    network: &RoadNetwork,
    vehicles: &VehicleRegistry,
    config: &SimConfig,
    lane: LaneId,
    speed: f32,
    brakes: f32,
) -> bool {
    let Some(lane) = network.lane(lane) else {
        return false;
    };
    let Some(rear) = lane.rear().and_then(|id| vehicles.get(&id)) else {
        return lane.is_empty();
    };
    rear.rear() >= config.min_travel_distance
        && rear.distance() >= stopping_distance(speed, brakes) + rear.width()
}

/// Organic traffic generation
pub trait DispatchPolicy: Debug {
    fn name(&self) -> &'static str;

    /// Whether vehicles stay in the registry after arriving
    fn keeps_vehicles(&self) -> bool;

    /// Dispatches this tick's vehicles; returns how many entered a lane
    fn dispatch(&mut self, ctx: &mut DispatchContext<'_>) -> u32;
}

/// Serves queued wave requests, one dispatch per request per tick
///
/// Requests that find no lane stay queued. `DispatchFailed` is raised for a
/// city only when none of its requests got a lane this tick.
pub fn drain_queues(ctx: &mut DispatchContext<'_>, persistent: bool) -> u32 {
    let catalog = ctx.catalog;
    let mut dispatched = 0;
    let cities: Vec<CityId> = ctx.network.city_ids().collect();

    for city_id in cities {
        let requests = match ctx.network.city(city_id) {
            Some(city) if !city.queue.is_empty() => city.queue.clone(),
            _ => continue,
        };

        let mut congested = false;
        let mut unroutable = false;
        let mut sent = 0;
        for (index, request) in requests.iter().enumerate() {
            let Some(class) = catalog.get(&request.class_name) else {
                warn!("Dropping request for unknown class {:?}", request.class_name);
                if let Some(city) = ctx.network.city_mut(city_id) {
                    city.queue[index].amount = 0;
                }
                continue;
            };
            let roads = ctx.network.roads_towards(city_id, request.to);
            if roads.is_empty() {
                unroutable = true;
                continue;
            }
            let speed = ctx.config.departure_speed.min(class.max_speed);

            match ctx.free_lane(&roads, speed, class.brakes) {
                Some((road, lane)) => {
                    let id = ctx.create_vehicle(class, city_id, request.to, persistent);
                    ctx.depart(id, road, lane);
                    sent += 1;
                    if let Some(city) = ctx.network.city_mut(city_id) {
                        city.queue[index].amount -= 1;
                    }
                }
                None => congested = true,
            }
        }

        if let Some(city) = ctx.network.city_mut(city_id) {
            city.prune_queue();
        }
        dispatched += sent;

        // Only a city that sent nothing this tick is out of capacity
        if sent == 0 && (congested || unroutable) {
            if congested {
                warn!("No lane available for queued traffic from {:?}", city_id);
            } else {
                debug!("No road from {:?} leads to a queued destination", city_id);
            }
            ctx.events.push(SimEvent::DispatchFailed { city: city_id });
        }
    }

    dispatched
}

/// Share of the population that wants to travel at `hour`
///
/// `1 / (1 + d^p)` where `d` is the distance in hours to the closest rush hour.
pub fn demand_at(hour: f32, rush_hours: &[f32], exponent: f32) -> f32 {
    let distance = rush_hours
        .iter()
        .map(|rush| (hour - rush).abs())
        .fold(f32::INFINITY, f32::min);
    if !distance.is_finite() {
        return 0.0;
    }
    1.0 / (1.0 + distance.powf(exponent))
}

/// Number of vehicles a city wants to send out at `hour`
pub fn estimate(population: u32, hour: f32, config: &SimConfig) -> u32 {
    let demand = demand_at(hour, &config.rush_hours, config.demand_exponent);
    (population as f32 * demand / config.demand_normalizer).floor() as u32
}

/// Ephemeral vehicles of the default class, spread over roads and lanes by demand
#[derive(Debug, Default)]
pub struct DemandCurvePolicy;

impl DispatchPolicy for DemandCurvePolicy {
    fn name(&self) -> &'static str {
        "demand"
    }

    fn keeps_vehicles(&self) -> bool {
        false
    }

    fn dispatch(&mut self, ctx: &mut DispatchContext<'_>) -> u32 {
        let catalog = ctx.catalog;
        let Some(class) = catalog.default_class() else {
            return 0;
        };
        let hour = ctx.clock.time_of_day_hours();
        let speed = ctx.config.departure_speed.min(class.max_speed);
        let mut dispatched = 0;

        let cities: Vec<CityId> = ctx.network.city_ids().collect();
        for city_id in cities {
            let roads = ctx.network.outgoing_roads(city_id);
            let Some(population) = ctx.network.city(city_id).map(|city| city.population) else {
                continue;
            };
            if roads.is_empty() {
                continue;
            }
            let per_road = estimate(population, hour, ctx.config) / roads.len() as u32;

            for (road_id, to) in roads {
                let Some(destination) = ctx.network.city(to).map(|city| city.category) else {
                    continue;
                };
                let lanes = match ctx.network.road(road_id) {
                    Some(road) => road.lanes.clone(),
                    None => continue,
                };

                let mut remaining = per_road;
                for lane in lanes {
                    let has_people = ctx
                        .network
                        .city(city_id)
                        .is_some_and(|city| city.population > 0);
                    if remaining == 0 || !has_people {
                        break;
                    }
                    if !ctx.can_dispatch(lane, speed, class.brakes) {
                        continue;
                    }
                    let id = ctx.create_vehicle(class, city_id, destination, false);
                    ctx.depart(id, road_id, lane);
                    remaining -= 1;
                    dispatched += 1;
                }
            }
        }

        dispatched
    }
}

/// Persistent commuters leaving inside their daily departure windows
#[derive(Debug, Default)]
pub struct ScheduledDeparturePolicy;

impl ScheduledDeparturePolicy {
    fn candidate_roads(
        network: &RoadNetwork,
        vehicle: &Vehicle,
        city: CityId,
        trip: Trip,
    ) -> Vec<RoadId> {
        match trip {
            Trip::Outbound if city == vehicle.home => {
                network.roads_towards(city, vehicle.destination)
            }
            Trip::Return if city != vehicle.home => network
                .find_road_between(city, vehicle.home)
                .into_iter()
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl DispatchPolicy for ScheduledDeparturePolicy {
    fn name(&self) -> &'static str {
        "scheduled"
    }

    fn keeps_vehicles(&self) -> bool {
        true
    }

    fn dispatch(&mut self, ctx: &mut DispatchContext<'_>) -> u32 {
        let minute = ctx.clock.minute_of_day();
        let day = ctx.clock.day();
        let half_width = ctx.config.departure_window_minutes;
        let mut dispatched = 0;

        let idle: Vec<VehicleId> = ctx
            .vehicles
            .values()
            .filter(|vehicle| vehicle.persistent && vehicle.city.is_some())
            .map(|vehicle| vehicle.id)
            .collect();

        for id in idle {
            let Some(vehicle) = ctx.vehicles.get(&id) else {
                continue;
            };
            let Some(city) = vehicle.city else {
                continue;
            };
            let Some(window) = vehicle.schedule.iter().position(|window| {
                window.used_on != Some(day) && window.contains(minute, half_width)
            }) else {
                continue;
            };

            let trip = vehicle.schedule[window].trip;
            let roads = Self::candidate_roads(ctx.network, vehicle, city, trip);
            if roads.is_empty() {
                // Already where this leg would take it
                if let Some(vehicle) = ctx.vehicles.get_mut(&id) {
                    vehicle.schedule[window].used_on = Some(day);
                }
                continue;
            }

            let speed = ctx.departure_speed(vehicle);
            let brakes = vehicle.brakes;
            if let Some((road, lane)) = ctx.free_lane(&roads, speed, brakes) {
                if let Some(vehicle) = ctx.vehicles.get_mut(&id) {
                    vehicle.schedule[window].used_on = Some(day);
                }
                ctx.depart(id, road, lane);
                dispatched += 1;
            }
        }

        dispatched
    }
}

/// Builds a policy from its command-line name
pub fn policy_from_name(name: &str) -> Option<Box<dyn DispatchPolicy>> {
    match name {
        "demand" => Some(Box::new(DemandCurvePolicy)),
        "scheduled" => Some(Box::new(ScheduledDeparturePolicy)),
        _ => None,
    }
}
