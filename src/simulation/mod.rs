//! Standalone traffic simulation module
//!
//! Cities joined by multi-lane roads, vehicles dispatched onto lanes,
//! car following, lane changes and arrivals. Nothing here renders; a driver
//! calls `SimWorld::tick` and consumes the returned events.

mod arrival;
mod car_following;
mod city;
mod clock;
mod config;
mod dispatch;
mod economy;
mod events;
pub mod invariants;
mod lane_change;
mod law;
mod level;
mod random;
mod road_network;
mod stats;
mod types;
mod vehicle;
mod world;

pub use arrival::handle_arrivals;
pub use car_following::{leader_of, move_and_detect, update_speeds};
pub use city::{City, DispatchRequest};
pub use clock::{Clock, SPEED_ONE, SPEED_PAUSE, SPEED_THREE, SPEED_TWO};
pub use config::SimConfig;
pub use dispatch::{
    can_dispatch, demand_at, drain_queues, estimate, policy_from_name, DemandCurvePolicy,
    DispatchContext, DispatchPolicy, ScheduledDeparturePolicy,
};
pub use economy::{Economy, COST_PER_UNIT, SPEEDING_FINE, STARTING_MONEY};
pub use events::SimEvent;
pub use lane_change::{can_switch, evaluate_slot, progress_switches, try_start_switch, LaneSlot};
pub use law::{SpeedLaw, DEFAULT_MAX_SPEED, FINE_COOLDOWN_SECS};
pub use level::{Level, LevelCity, LevelRoad, VehicleCatalog, VehicleClass, Wave, WaveComponent, WaveFromCity};
pub use random::SimRng;
pub use road_network::{Lane, Road, RoadNetwork};
pub use stats::SimStats;
pub use types::{
    CityCategory, CityId, LaneId, Position, RoadId, VehicleId, ARRIVAL_THRESHOLD,
    CONTACT_EPSILON, DEMAND_EXPONENT, DEMAND_NORMALIZER, DEPARTURE_SPEED,
    DEPARTURE_WINDOW_MINUTES, LANE_INSET, LANE_WIDTH, MIN_TRAVEL_DISTANCE, RUSH_HOURS,
    SIM_SECONDS_PER_TICK_SECOND, START_HOUR, SWITCH_RATE,
};
pub use vehicle::{
    stopping_distance, DepartureWindow, LaneChange, LaneOccupant, Movable, Trip, Vehicle,
    VehicleRegistry,
};
pub use world::SimWorld;
