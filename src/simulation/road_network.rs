//! Road network arena
//!
//! Cities, roads and lanes live in flat vectors addressed by typed indices.
//! A petgraph `DiGraph` mirrors the city/road topology for route lookups.
//! Every lane owns its vehicle list, kept sorted front to back.

use anyhow::{bail, Context, Result};
use ordered_float::OrderedFloat;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::HashMap;

use super::city::City;
use super::types::{CityCategory, CityId, LaneId, Position, RoadId, VehicleId, LANE_INSET};
use super::vehicle::Vehicle;

/// A directed road between two cities
#[derive(Debug, Clone)]
pub struct Road {
    pub id: RoadId,
    pub from: CityId,
    pub to: CityId,
    pub start: Position,
    pub end: Position,
    pub length: f32,
    /// Rendering only
    pub rotation: f32,
    /// Unit vector from `start` to `end`
    pub direction: Position,
    /// Lanes ordered by index, 0 first
    pub lanes: Vec<LaneId>,
}

impl Road {
    /// World position `distance` units along the road and `lateral` units across it
    pub fn point_at(&self, distance: f32, lateral: f32) -> Position {
        self.start.offset(&self.direction, distance, lateral)
    }

    /// Lateral offset of a vehicle centred in the lane with the given index
    pub fn lane_offset(&self, index: usize, lane_width: f32) -> f32 {
        index as f32 * lane_width + LANE_INSET
    }
}

/// A single-file channel within a road
#[derive(Debug, Clone)]
pub struct Lane {
    pub id: LaneId,
    pub road: RoadId,
    pub index: usize,
    /// Sorted by strictly decreasing distance travelled, front of the lane first
    vehicles: Vec<VehicleId>,
}

impl Lane {
    pub fn vehicles(&self) -> &[VehicleId] {
        &self.vehicles
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn rear(&self) -> Option<VehicleId> {
        self.vehicles.last().copied()
    }

    pub fn contains(&self, vehicle: VehicleId) -> bool {
        self.vehicles.contains(&vehicle)
    }

    /// The vehicle immediately in front of `vehicle`, if any
    pub fn leader_of(&self, vehicle: VehicleId) -> Option<VehicleId> {
        let index = self.vehicles.iter().position(|v| *v == vehicle)?;
        index.checked_sub(1).map(|i| self.vehicles[i])
    }
}

#[derive(Debug, Default)]
pub struct RoadNetwork {
    graph: DiGraph<CityId, RoadId>,
    city_to_node: HashMap<CityId, NodeIndex>,
    cities: Vec<City>,
    roads: Vec<Road>,
    lanes: Vec<Lane>,
    lane_width: f32,
}

impl RoadNetwork {
    pub fn new(lane_width: f32) -> Self {
        Self {
            lane_width,
            ..Self::default()
        }
    }

    pub fn lane_width(&self) -> f32 {
        self.lane_width
    }

    pub fn add_city(
        &mut self,
        name: impl Into<String>,
        position: Position,
        category: CityCategory,
        population: u32,
    ) -> CityId {
        let id = CityId(self.cities.len());
        let mut city = City::new(id, name.into(), position, category);
        city.population = population;
        self.cities.push(city);

        let node = self.graph.add_node(id);
        self.city_to_node.insert(id, node);
        id
    }

    /// Builds a one-lane road between two distinct cities
    pub fn add_road(&mut self, from: CityId, to: CityId) -> Result<RoadId> {
        if from == to {
            bail!("Cannot build a road from {:?} to itself", from);
        }
        if self.find_road_between(from, to).is_some() {
            bail!("A road from {:?} to {:?} already exists", from, to);
        }

        let start = self.city(from).context("Start city not found")?.position;
        let end = self.city(to).context("End city not found")?.position;
        let from_node = self.city_to_node[&from];
        let to_node = self.city_to_node[&to];

        let id = RoadId(self.roads.len());
        self.roads.push(Road {
            id,
            from,
            to,
            start,
            end,
            length: start.distance(&end),
            rotation: start.rotation_to(&end),
            direction: start.direction_to(&end),
            lanes: Vec::new(),
        });
        self.graph.add_edge(from_node, to_node, id);
        self.cities[from.0].roads.push(id);

        self.add_lane(id)?;
        Ok(id)
    }

    /// Appends a lane at the next free index of a road
    pub fn add_lane(&mut self, road_id: RoadId) -> Result<LaneId> {
        let road = self
            .roads
            .get_mut(road_id.0)
            .with_context(|| format!("Road {:?} not found", road_id))?;

        let id = LaneId(self.lanes.len());
        let index = road.lanes.len();
        road.lanes.push(id);
        self.lanes.push(Lane {
            id,
            road: road_id,
            index,
            vehicles: Vec::new(),
        });
        Ok(id)
    }

    pub fn city(&self, id: CityId) -> Option<&City> {
        self.cities.get(id.0)
    }

    pub fn city_mut(&mut self, id: CityId) -> Option<&mut City> {
        self.cities.get_mut(id.0)
    }

    pub fn road(&self, id: RoadId) -> Option<&Road> {
        self.roads.get(id.0)
    }

    pub fn lane(&self, id: LaneId) -> Option<&Lane> {
        self.lanes.get(id.0)
    }

    pub fn cities(&self) -> &[City] {
        &self.cities
    }

    pub fn roads(&self) -> &[Road] {
        &self.roads
    }

    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }

    pub fn city_ids(&self) -> impl Iterator<Item = CityId> {
        (0..self.cities.len()).map(CityId)
    }

    pub fn lane_ids(&self) -> impl Iterator<Item = LaneId> {
        (0..self.lanes.len()).map(LaneId)
    }

    pub fn find_road_between(&self, from: CityId, to: CityId) -> Option<RoadId> {
        let from_node = self.city_to_node.get(&from)?;
        let to_node = self.city_to_node.get(&to)?;
        self.graph.find_edge(*from_node, *to_node).map(|edge| self.graph[edge])
    }

    /// Outgoing roads of a city paired with their destination, ordered by road id
    pub fn outgoing_roads(&self, city: CityId) -> Vec<(RoadId, CityId)> {
        let Some(node) = self.city_to_node.get(&city) else {
            return Vec::new();
        };
        let mut roads: Vec<_> = self
            .graph
            .edges(*node)
            .map(|edge| (*edge.weight(), self.graph[edge.target()]))
            .collect();
        roads.sort();
        roads
    }

    /// Outgoing roads whose destination has the requested category
    pub fn roads_towards(&self, city: CityId, category: CityCategory) -> Vec<RoadId> {
        self.outgoing_roads(city)
            .into_iter()
            .filter(|(_, to)| {
                self.city(*to)
                    .is_some_and(|destination| destination.category == category)
            })
            .map(|(road, _)| road)
            .collect()
    }

    /// The lane of the same road at `index`, if the road has that many lanes
    pub fn sibling_lane(&self, lane: LaneId, index: usize) -> Option<LaneId> {
        let road = self.road(self.lane(lane)?.road)?;
        road.lanes.get(index).copied()
    }

    pub fn lane_vehicles(&self, lane: LaneId) -> &[VehicleId] {
        self.lane(lane).map(Lane::vehicles).unwrap_or(&[])
    }

    /// Inserts at a known position; `None` appends at the back
    pub fn insert_at(&mut self, lane: LaneId, index: Option<usize>, vehicle: VehicleId) {
        if let Some(lane) = self.lanes.get_mut(lane.0) {
            match index {
                Some(index) if index <= lane.vehicles.len() => lane.vehicles.insert(index, vehicle),
                _ => lane.vehicles.push(vehicle),
            }
        }
    }

    /// Inserts behind every vehicle that has travelled at least `distance`
    pub fn insert_by_distance(
        &mut self,
        lane: LaneId,
        vehicle: VehicleId,
        distance: f32,
        distance_of: impl Fn(VehicleId) -> f32,
    ) -> usize {
        let Some(lane) = self.lanes.get_mut(lane.0) else {
            return 0;
        };
        let key = OrderedFloat(distance);
        let index = lane
            .vehicles
            .partition_point(|other| OrderedFloat(distance_of(*other)) >= key);
        lane.vehicles.insert(index, vehicle);
        index
    }

    /// Removes a vehicle by identity; returns whether it was present
    pub fn remove_vehicle(&mut self, lane: LaneId, vehicle: VehicleId) -> bool {
        let Some(lane) = self.lanes.get_mut(lane.0) else {
            return false;
        };
        match lane.vehicles.iter().position(|v| *v == vehicle) {
            Some(index) => {
                lane.vehicles.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn rear_vehicle(&self, lane: LaneId) -> Option<VehicleId> {
        self.lane(lane).and_then(Lane::rear)
    }

    /// World position of a vehicle on its road, including any lateral switch offset
    pub fn vehicle_position(&self, vehicle: &Vehicle) -> Option<Position> {
        let lane = self.lane(vehicle.lane?)?;
        let road = self.road(lane.road)?;
        let lateral = road.lane_offset(lane.index, self.lane_width) + vehicle.lane_change.progress();
        Some(road.point_at(vehicle.distance_travelled, lateral))
    }

    pub fn city_count(&self) -> usize {
        self.cities.len()
    }

    pub fn road_count(&self) -> usize {
        self.roads.len()
    }

    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    /// Total number of lane slots occupied; a switching vehicle counts twice
    pub fn occupied_slots(&self) -> usize {
        self.lanes.iter().map(Lane::len).sum()
    }
}
