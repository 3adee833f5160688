//! Running counters for a simulation session

use log::info;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimStats {
    /// Trips started, including every departure of a persistent vehicle
    pub dispatched: usize,
    pub arrived: usize,
    /// Vehicles removed by collisions
    pub crashed: usize,
    pub crash_events: usize,
    pub lane_changes: usize,
    pub dispatch_failures: usize,
    pub fines: usize,
    pub ticks: u64,
    pub elapsed_secs: f64,
}

impl SimStats {
    /// Percentage of finished trips that arrived, 0 when none finished
    pub fn arrival_rate(&self) -> f32 {
        let finished = self.arrived + self.crashed;
        if finished == 0 {
            0.0
        } else {
            self.arrived as f32 / finished as f32 * 100.0
        }
    }

    /// `dispatched == arrived + crashed + in_transit`
    pub fn is_conserved(&self, in_transit: usize) -> bool {
        self.dispatched == self.arrived + self.crashed + in_transit
    }

    pub fn log_summary(&self, in_transit: usize) {
        info!("=== SIMULATION COMPLETE ===");
        info!("Ticks run: {}", self.ticks);
        info!("Simulated time: {:.0}s", self.elapsed_secs);
        info!("Total vehicles dispatched: {}", self.dispatched);
        info!("Total arrivals: {}", self.arrived);
        info!("Total crashed: {}", self.crashed);
        info!("In transit: {}", in_transit);
        info!("Lane changes: {}", self.lane_changes);
        info!("Deferred dispatches: {}", self.dispatch_failures);
        info!("Speeding fines: {}", self.fines);
        info!("Arrival rate: {:.1}%", self.arrival_rate());
    }
}
