//! Vehicles ("commuters") and their per-trip state

use std::collections::BTreeMap;

use super::level::VehicleClass;
use super::random::SimRng;
use super::types::{CityCategory, CityId, LaneId, Position, RoadId, VehicleId};

/// All live vehicles, iterated in id order so runs are reproducible
pub type VehicleRegistry = BTreeMap<VehicleId, Vehicle>;

/// Lane-change state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LaneChange {
    Cruising,
    /// Blocked by its leader with no free gap next door
    ///
    /// A label only: it behaves exactly like `Cruising` and is retried each tick.
    Requesting,
    /// Listed in both lanes while drifting sideways towards `target`
    Switching { target: LaneId, progress: f32 },
}

impl LaneChange {
    pub fn is_switching(&self) -> bool {
        matches!(self, LaneChange::Switching { .. })
    }

    pub fn target(&self) -> Option<LaneId> {
        match self {
            LaneChange::Switching { target, .. } => Some(*target),
            _ => None,
        }
    }

    pub fn progress(&self) -> f32 {
        match self {
            LaneChange::Switching { progress, .. } => *progress,
            _ => 0.0,
        }
    }
}

/// Which leg of the daily commute a departure window starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trip {
    /// Leave home for the vehicle's destination category
    Outbound,
    /// Head back to the home city
    Return,
}

/// A daily window around `centre_minute` during which the vehicle wants to leave
#[derive(Debug, Clone, PartialEq)]
pub struct DepartureWindow {
    pub centre_minute: f32,
    pub trip: Trip,
    /// Day on which this window was last used
    pub used_on: Option<u32>,
}

impl DepartureWindow {
    pub fn contains(&self, minute_of_day: f32, half_width: f32) -> bool {
        (minute_of_day - self.centre_minute).abs() <= half_width
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: VehicleId,
    pub class_name: String,
    pub home: CityId,
    /// City the vehicle is idle in; `None` while on a road
    pub city: Option<CityId>,
    pub destination: CityCategory,
    pub road: Option<RoadId>,
    pub lane: Option<LaneId>,
    pub distance_travelled: f32,
    pub speed: f32,
    pub preferred_speed: f32,
    pub acceleration: f32,
    pub brakes: f32,
    pub width: f32,
    pub lane_change: LaneChange,
    pub schedule: Vec<DepartureWindow>,
    /// Persistent vehicles stay in the registry between trips
    pub persistent: bool,
    /// Rendering only
    pub position: Position,
}

impl Vehicle {
    /// An idle vehicle parked in `home`, with a preferred speed drawn from the class range
    pub fn new(
        id: VehicleId,
        class: &VehicleClass,
        home: CityId,
        destination: CityCategory,
        rng: &mut SimRng,
    ) -> Self {
        Self {
            id,
            class_name: class.name.clone(),
            home,
            city: Some(home),
            destination,
            road: None,
            lane: None,
            distance_travelled: 0.0,
            speed: 0.0,
            preferred_speed: rng.range_f32(class.min_speed, class.max_speed),
            acceleration: class.acceleration,
            brakes: class.brakes,
            width: class.length,
            lane_change: LaneChange::Cruising,
            schedule: Vec::new(),
            persistent: false,
            position: Position::default(),
        }
    }

    /// Gives the vehicle a morning and an evening departure window
    ///
    /// The morning window is centred between 06:00 and 09:00 and sends the
    /// vehicle out; the evening one, between 16:00 and 20:00, brings it home.
    pub fn with_commute(mut self, rng: &mut SimRng) -> Self {
        let morning = 6.0 * 60.0 + rng.range_f32(0.0, 180.0);
        let evening = 16.0 * 60.0 + rng.range_f32(0.0, 240.0);
        self.schedule = vec![
            DepartureWindow {
                centre_minute: morning,
                trip: Trip::Outbound,
                used_on: None,
            },
            DepartureWindow {
                centre_minute: evening,
                trip: Trip::Return,
                used_on: None,
            },
        ];
        self.persistent = true;
        self
    }

    pub fn in_transit(&self) -> bool {
        self.lane.is_some()
    }

    /// Lanes whose lists must contain this vehicle, origin lane first
    pub fn occupied_lanes(&self) -> Vec<LaneId> {
        self.lane
            .into_iter()
            .chain(self.lane_change.target())
            .collect()
    }

    /// Puts the vehicle at the head of a lane
    pub fn depart(&mut self, road: RoadId, lane: LaneId, speed: f32) {
        self.city = None;
        self.road = Some(road);
        self.lane = Some(lane);
        self.distance_travelled = 0.0;
        self.speed = speed;
        self.lane_change = LaneChange::Cruising;
    }

    /// Detaches the vehicle from its road and parks it in `city`
    pub fn park(&mut self, city: CityId) {
        self.city = Some(city);
        self.road = None;
        self.lane = None;
        self.distance_travelled = 0.0;
        self.speed = 0.0;
        self.lane_change = LaneChange::Cruising;
    }
}

/// Anything that occupies a slot in a lane
pub trait LaneOccupant {
    fn distance(&self) -> f32;
    fn width(&self) -> f32;
    fn speed(&self) -> f32;
    fn brakes(&self) -> f32;

    /// Distance needed to stop from the current speed
    fn stopping_distance(&self) -> f32 {
        stopping_distance(self.speed(), self.brakes())
    }

    /// Position of the rear bumper along the road
    fn rear(&self) -> f32 {
        self.distance() - self.width()
    }
}

/// Anything that moves along a road
pub trait Movable {
    fn advance(&mut self, delta_secs: f32);
}

impl LaneOccupant for Vehicle {
    fn distance(&self) -> f32 {
        self.distance_travelled
    }

    fn width(&self) -> f32 {
        self.width
    }

    fn speed(&self) -> f32 {
        self.speed
    }

    fn brakes(&self) -> f32 {
        self.brakes
    }
}

impl Movable for Vehicle {
    fn advance(&mut self, delta_secs: f32) {
        self.distance_travelled += self.speed * delta_secs;
    }
}

/// `(v / b) * (v / 2)`
pub fn stopping_distance(speed: f32, brakes: f32) -> f32 {
    if brakes <= 0.0 {
        return f32::INFINITY;
    }
    (speed / brakes) * (speed / 2.0)
}
