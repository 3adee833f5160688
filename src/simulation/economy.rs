//! Money ledger for sessions played as a game
//!
//! Arrivals earn the vehicle class reward, crashes cost the class value of
//! every vehicle involved, and building roads and lanes costs money by length.

/// Money available when a session starts
pub const STARTING_MONEY: i64 = 1_000_000;

/// Building cost per unit of road length, also charged per lane
pub const COST_PER_UNIT: f32 = 100.0;

/// Fine charged by a speed camera
pub const SPEEDING_FINE: i64 = 250;

#[derive(Debug, Clone)]
pub struct Economy {
    pub money: i64,

    /// Rewards collected from arrivals
    pub earned: i64,

    /// Money lost to crashes
    pub crash_losses: i64,

    /// Money spent on roads and lanes
    pub construction: i64,

    /// Money collected from speeding fines
    pub fines: i64,
}

impl Default for Economy {
    fn default() -> Self {
        Self::new()
    }
}

impl Economy {
    pub fn new() -> Self {
        Self::with_money(STARTING_MONEY)
    }

    pub fn with_money(money: i64) -> Self {
        Self {
            money,
            earned: 0,
            crash_losses: 0,
            construction: 0,
            fines: 0,
        }
    }

    /// Price of building `length` units of road or lane
    pub fn construction_cost(length: f32) -> i64 {
        (length * COST_PER_UNIT).round() as i64
    }

    pub fn can_afford(&self, cost: i64) -> bool {
        self.money >= cost
    }

    /// Returns false and leaves the balance untouched when funds are short
    pub fn spend(&mut self, cost: i64) -> bool {
        if self.can_afford(cost) {
            self.money -= cost;
            self.construction += cost;
            true
        } else {
            false
        }
    }

    pub fn reward_arrival(&mut self, reward: i64) {
        self.money += reward;
        self.earned += reward;
    }

    /// Crash losses may push the balance below zero
    pub fn charge_crash(&mut self, cost: i64) {
        self.money -= cost;
        self.crash_losses += cost;
    }

    pub fn collect_fine(&mut self, fine: i64) {
        self.money += fine;
        self.fines += fine;
    }

    pub fn is_bankrupt(&self) -> bool {
        self.money < 0
    }

    pub fn summary(&self) -> String {
        format!(
            "Money: ${} | Earned: ${} | Crash losses: ${} | Construction: ${} | Fines: ${}",
            self.money, self.earned, self.crash_losses, self.construction, self.fines
        )
    }
}
