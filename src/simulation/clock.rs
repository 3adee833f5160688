//! Simulated time of day
//!
//! The clock only moves forward inside a tick. Its speed level decides how
//! many ticks the driver runs per rendered frame; the length of a tick never
//! changes, so a faster game is just more ticks.

/// Ticks per frame while paused
pub const SPEED_PAUSE: u32 = 0;
/// Ticks per frame at normal speed
pub const SPEED_ONE: u32 = 1;
/// Ticks per frame at double speed
pub const SPEED_TWO: u32 = 2;
/// Ticks per frame at the fastest speed
pub const SPEED_THREE: u32 = 30;

const SECONDS_PER_DAY: f64 = 24.0 * 60.0 * 60.0;

#[derive(Debug, Clone)]
pub struct Clock {
    /// Simulated seconds since the session started
    elapsed_secs: f64,
    /// Seconds past midnight at which the session started
    start_secs: f64,
    /// Simulated seconds added per second of tick delta
    scale: f64,
    /// Ticks per frame
    speed: u32,
}

impl Clock {
    pub fn new(start_hour: f64, scale: f64) -> Self {
        Self {
            elapsed_secs: 0.0,
            start_secs: start_hour * 3600.0,
            scale,
            speed: SPEED_ONE,
        }
    }

    pub fn advance(&mut self, delta_secs: f32) {
        self.elapsed_secs += delta_secs as f64 * self.scale;
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed;
    }

    pub fn is_paused(&self) -> bool {
        self.speed == SPEED_PAUSE
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    fn absolute_secs(&self) -> f64 {
        self.start_secs + self.elapsed_secs
    }

    /// Whole days passed since the midnight before the session started
    pub fn day(&self) -> u32 {
        (self.absolute_secs() / SECONDS_PER_DAY).floor() as u32
    }

    /// Minutes past midnight, in `[0, 1440)`
    pub fn minute_of_day(&self) -> f32 {
        (self.absolute_secs().rem_euclid(SECONDS_PER_DAY) / 60.0) as f32
    }

    /// Hours past midnight, in `[0, 24)`
    pub fn time_of_day_hours(&self) -> f32 {
        self.minute_of_day() / 60.0
    }

    /// `HH:MM` display of the time of day
    pub fn display(&self) -> String {
        let minutes = self.minute_of_day().floor() as u32;
        format!("{:02}:{:02}", minutes / 60, minutes % 60)
    }
}
