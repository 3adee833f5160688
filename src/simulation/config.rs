//! Tunables for a simulation session

use super::types::{
    ARRIVAL_THRESHOLD, DEMAND_EXPONENT, DEMAND_NORMALIZER, DEPARTURE_SPEED,
    DEPARTURE_WINDOW_MINUTES, LANE_WIDTH, MIN_TRAVEL_DISTANCE, RUSH_HOURS,
    SIM_SECONDS_PER_TICK_SECOND, START_HOUR, SWITCH_RATE,
};

/// Session-wide simulation parameters
///
/// Every field defaults to the matching constant in `types`; the headless
/// binary overrides a few of them from the command line.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub min_travel_distance: f32,
    pub arrival_threshold: f32,
    pub lane_width: f32,
    pub switch_rate: f32,
    pub departure_speed: f32,
    pub sim_seconds_per_tick_second: f64,
    pub start_hour: f64,
    pub rush_hours: Vec<f32>,
    pub demand_exponent: f32,
    pub demand_normalizer: f32,
    pub departure_window_minutes: f32,
    /// Seed for reproducible runs; `None` draws from the thread RNG
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            min_travel_distance: MIN_TRAVEL_DISTANCE,
            arrival_threshold: ARRIVAL_THRESHOLD,
            lane_width: LANE_WIDTH,
            switch_rate: SWITCH_RATE,
            departure_speed: DEPARTURE_SPEED,
            sim_seconds_per_tick_second: SIM_SECONDS_PER_TICK_SECOND,
            start_hour: START_HOUR,
            rush_hours: RUSH_HOURS.to_vec(),
            demand_exponent: DEMAND_EXPONENT,
            demand_normalizer: DEMAND_NORMALIZER,
            departure_window_minutes: DEPARTURE_WINDOW_MINUTES,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Self::default()
        }
    }

    /// Number of ticks a lane change takes to complete
    pub fn ticks_per_lane_change(&self) -> u32 {
        (self.lane_width / self.switch_rate).ceil() as u32
    }
}
