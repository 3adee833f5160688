//! Cities are the sources and sinks of traffic

use super::types::{CityCategory, CityId, Position, RoadId};

/// A pending request to send vehicles of one class towards a city category
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRequest {
    pub class_name: String,
    pub amount: u32,
    pub to: CityCategory,
}

/// A node in the road network
#[derive(Debug, Clone)]
pub struct City {
    pub id: CityId,
    pub name: String,
    pub position: Position,
    pub category: CityCategory,
    /// Outgoing roads, in the order they were built
    pub roads: Vec<RoadId>,
    /// Demand counter: decremented on departure, incremented on arrival
    pub population: u32,
    /// Requests queued by waves, drained before organic traffic
    pub queue: Vec<DispatchRequest>,
}

impl City {
    pub fn new(id: CityId, name: String, position: Position, category: CityCategory) -> Self {
        Self {
            id,
            name,
            position,
            category,
            roads: Vec::new(),
            population: 0,
            queue: Vec::new(),
        }
    }

    pub fn enqueue(&mut self, requests: impl IntoIterator<Item = DispatchRequest>) {
        self.queue
            .extend(requests.into_iter().filter(|request| request.amount > 0));
    }

    /// Vehicles still waiting in the dispatch queue
    pub fn queued(&self) -> u32 {
        self.queue.iter().map(|request| request.amount).sum()
    }

    /// Drops fully served requests
    pub fn prune_queue(&mut self) {
        self.queue.retain(|request| request.amount > 0);
    }
}
