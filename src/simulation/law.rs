//! Speed enforcement
//!
//! Cameras sit on roads. Every vehicle on a watched road going faster than
//! the limit is fined, at most once per simulated minute.

use log::debug;
use std::collections::{BTreeSet, HashMap};

use super::events::SimEvent;
use super::types::{RoadId, VehicleId};
use super::vehicle::VehicleRegistry;

/// Speed limit used when a law is enabled without an explicit value
pub const DEFAULT_MAX_SPEED: f32 = 120.0;

/// Simulated seconds before the same vehicle can be fined again
pub const FINE_COOLDOWN_SECS: f64 = 60.0;

#[derive(Debug, Clone, Default)]
pub struct SpeedLaw {
    /// `None` disables enforcement
    pub max_speed: Option<f32>,
    pub fine: i64,
    cameras: BTreeSet<RoadId>,
    /// Simulated time of each vehicle's last fine
    last_fined: HashMap<VehicleId, f64>,
}

impl SpeedLaw {
    pub fn new(max_speed: f32, fine: i64) -> Self {
        Self {
            max_speed: Some(max_speed),
            fine,
            ..Self::default()
        }
    }

    pub fn add_camera(&mut self, road: RoadId) -> bool {
        self.cameras.insert(road)
    }

    pub fn remove_camera(&mut self, road: RoadId) -> bool {
        self.cameras.remove(&road)
    }

    pub fn cameras(&self) -> impl Iterator<Item = RoadId> + '_ {
        self.cameras.iter().copied()
    }

    /// Fines speeders on watched roads; returns the total collected
    pub fn enforce(
        &mut self,
        vehicles: &VehicleRegistry,
        now_secs: f64,
        events: &mut Vec<SimEvent>,
    ) -> i64 {
        let Some(limit) = self.max_speed else {
            return 0;
        };
        if self.cameras.is_empty() {
            return 0;
        }

        let mut collected = 0;
        for vehicle in vehicles.values() {
            let Some(road) = vehicle.road else {
                continue;
            };
            if !self.cameras.contains(&road) || vehicle.speed <= limit {
                continue;
            }
            let recently_fined = self
                .last_fined
                .get(&vehicle.id)
                .is_some_and(|last| now_secs - last < FINE_COOLDOWN_SECS);
            if recently_fined {
                continue;
            }

            self.last_fined.insert(vehicle.id, now_secs);
            collected += self.fine;
            events.push(SimEvent::SpeedingFine {
                vehicle: vehicle.id,
                road,
                speed: vehicle.speed,
                fine: self.fine,
            });
            debug!("Vehicle {} fined at {:.1} on {:?}", vehicle.id, vehicle.speed, road);
        }

        // Forget vehicles that left the registry
        self.last_fined.retain(|id, _| vehicles.contains_key(id));
        collected
    }
}
