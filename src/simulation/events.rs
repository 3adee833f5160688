//! Outcomes of a tick, handed back to the driver in the order they happened

use super::types::{CityId, Position, RoadId, VehicleId};

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    /// A vehicle entered a lane
    Dispatched {
        vehicle: VehicleId,
        from: CityId,
        road: RoadId,
    },
    /// A vehicle reached the end of its road
    Arrived {
        vehicle: VehicleId,
        distance_travelled: f32,
        class: String,
    },
    /// `a` ran into `b`; both are gone
    Crashed {
        position: Position,
        a: VehicleId,
        b: VehicleId,
    },
    /// No lane of the city had room for a queued request this tick
    DispatchFailed { city: CityId },
    /// A camera caught a vehicle above the limit
    SpeedingFine {
        vehicle: VehicleId,
        road: RoadId,
        speed: f32,
        fine: i64,
    },
}
