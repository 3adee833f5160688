//! Core types for the traffic simulation
//!
//! Identifiers, geometry and the default tunables shared by every stage.

use std::fmt;

/// Index of a city in the road network arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CityId(pub usize);

/// Index of a road in the road network arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoadId(pub usize);

/// Index of a lane in the road network arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LaneId(pub usize);

/// A unique vehicle identifier, never reused within a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Category of a city, used to match dispatch requests to destinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CityCategory {
    Residential,
    Commercial,
    Industrial,
    Leisure,
}

impl fmt::Display for CityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CityCategory::Residential => "residential",
            CityCategory::Commercial => "commercial",
            CityCategory::Industrial => "industrial",
            CityCategory::Leisure => "leisure",
        };
        f.write_str(name)
    }
}

/// A 2D position in world units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Unit vector pointing from this position towards `other`
    pub fn direction_to(&self, other: &Position) -> Position {
        let len = self.distance(other);
        if len > 0.0 {
            Position::new((other.x - self.x) / len, (other.y - self.y) / len)
        } else {
            Position::default()
        }
    }

    /// Rotation in degrees of the segment from this position towards `other`
    pub fn rotation_to(&self, other: &Position) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dy.atan2(dx).to_degrees()
    }

    /// Moves `along` units in `direction` and `across` units along its left normal
    pub fn offset(&self, direction: &Position, along: f32, across: f32) -> Position {
        Position {
            x: self.x + direction.x * along - direction.y * across,
            y: self.y + direction.y * along + direction.x * across,
        }
    }
}

/// Distance the rearmost vehicle of a lane must have covered before the lane
/// accepts another departure
pub const MIN_TRAVEL_DISTANCE: f32 = 24.0;

/// A vehicle counts as arrived once it is this close to the end of its road
pub const ARRIVAL_THRESHOLD: f32 = 15.0;

/// Lateral width of one lane in world units
pub const LANE_WIDTH: f32 = 10.0;

/// Inset of a vehicle from the lane edge, (lane width - vehicle height) / 2
pub const LANE_INSET: f32 = 2.0;

/// Lateral units covered per tick while changing lanes
pub const SWITCH_RATE: f32 = 1.0;

/// Speed a vehicle has when it leaves a city
pub const DEPARTURE_SPEED: f32 = 50.0;

/// Simulated seconds per tick-second: one real second is one simulated minute
pub const SIM_SECONDS_PER_TICK_SECOND: f64 = 60.0;

/// Hour of day at which a new session starts
pub const START_HOUR: f64 = 6.0;

/// Rush hours used by the demand curve (08:30 and 17:30)
pub const RUSH_HOURS: [f32; 2] = [8.5, 17.5];

/// Exponent applied to the distance to the nearest rush hour
pub const DEMAND_EXPONENT: f32 = 3.0;

/// Divides the per-city demand estimate
pub const DEMAND_NORMALIZER: f32 = 2.0;

/// Half-width in minutes of a scheduled departure window
pub const DEPARTURE_WINDOW_MINUTES: f32 = 60.0;

/// Follow distances closer than this are treated as contact
pub const CONTACT_EPSILON: f32 = 1e-3;
