//! Main simulation world that ties everything together
//!
//! Owns the road network, the vehicle registry and the clock, and runs the
//! tick pipeline: clock, dispatch, car following, lane changes, arrivals and
//! speed enforcement, each stage to completion before the next.

use anyhow::{bail, Context, Result};
use log::{debug, info};
use std::collections::VecDeque;

use super::arrival::handle_arrivals;
use super::car_following::{move_and_detect, update_speeds};
use super::city::DispatchRequest;
use super::clock::Clock;
use super::config::SimConfig;
use super::dispatch::{drain_queues, DispatchContext, DispatchPolicy, ScheduledDeparturePolicy};
use super::economy::{Economy, SPEEDING_FINE};
use super::events::SimEvent;
use super::invariants;
use super::lane_change::progress_switches;
use super::law::{SpeedLaw, DEFAULT_MAX_SPEED};
use super::level::{Level, VehicleCatalog};
use super::random::SimRng;
use super::road_network::RoadNetwork;
use super::stats::SimStats;
use super::types::{CityCategory, CityId, LaneId, Position, RoadId, VehicleId};
use super::vehicle::{Vehicle, VehicleRegistry};

/// Dispatch requests per city, activated together
type PendingWave = Vec<(CityId, Vec<DispatchRequest>)>;

#[derive(Debug)]
pub struct SimWorld {
    pub config: SimConfig,
    pub network: RoadNetwork,
    pub vehicles: VehicleRegistry,
    pub catalog: VehicleCatalog,
    pub clock: Clock,
    pub stats: SimStats,

    /// Money tracking (optional - only used when playing as a game)
    pub economy: Option<Economy>,

    pub law: SpeedLaw,

    policy: Box<dyn DispatchPolicy>,
    waves: VecDeque<PendingWave>,
    waves_started: usize,
    rng: SimRng,
    next_vehicle_id: usize,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl SimWorld {
    fn new_internal(config: SimConfig, catalog: VehicleCatalog, economy: Option<Economy>) -> Self {
        Self {
            network: RoadNetwork::new(config.lane_width),
            vehicles: VehicleRegistry::new(),
            catalog,
            clock: Clock::new(config.start_hour, config.sim_seconds_per_tick_second),
            stats: SimStats::default(),
            economy,
            law: SpeedLaw::default(),
            policy: Box::new(ScheduledDeparturePolicy),
            waves: VecDeque::new(),
            waves_started: 0,
            rng: SimRng::new(config.seed),
            next_vehicle_id: 0,
            config,
        }
    }

    /// An empty world using the demo vehicle catalog
    pub fn new(config: SimConfig) -> Self {
        Self::new_internal(config, VehicleCatalog::demo(), None)
    }

    pub fn new_with_seed(seed: u64) -> Self {
        Self::new(SimConfig::with_seed(seed))
    }

    /// An empty world that keeps a money ledger
    pub fn new_with_economy(config: SimConfig) -> Self {
        Self::new_internal(config, VehicleCatalog::demo(), Some(Economy::new()))
    }

    /// Builds cities, roads and lanes of a validated level and queues its waves
    pub fn from_level(level: &Level, catalog: VehicleCatalog, config: SimConfig) -> Result<Self> {
        catalog.validate().context("Invalid vehicle catalog")?;
        level.validate(&catalog).context("Invalid level")?;

        let mut world = Self::new_internal(config, catalog, None);
        let cities: Vec<CityId> = level
            .cities
            .iter()
            .map(|city| {
                world
                    .network
                    .add_city(city.name.clone(), city.position, city.category, city.population)
            })
            .collect();

        for road in &level.roads {
            let road_id = world.network.add_road(cities[road.from], cities[road.to])?;
            for _ in 1..road.lanes {
                world.network.add_lane(road_id)?;
            }
        }

        for wave in &level.waves {
            let pending = wave
                .iter()
                .map(|from_city| {
                    let requests = from_city
                        .vehicles
                        .iter()
                        .map(|component| DispatchRequest {
                            class_name: component.class_name.clone(),
                            amount: component.amount,
                            to: component.to,
                        })
                        .collect();
                    (cities[from_city.from], requests)
                })
                .collect();
            world.waves.push_back(pending);
        }

        info!(
            "Loaded level: {} cities, {} roads, {} lanes, {} waves",
            world.network.city_count(),
            world.network.road_count(),
            world.network.lane_count(),
            world.waves.len()
        );
        Ok(world)
    }

    pub fn enable_economy(&mut self) {
        if self.economy.is_none() {
            self.economy = Some(Economy::new());
        }
    }

    pub fn set_policy(&mut self, policy: Box<dyn DispatchPolicy>) {
        info!("Using {} dispatch policy", policy.name());
        self.policy = policy;
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// Sets the number of ticks per frame; 0 pauses
    pub fn set_speed(&mut self, speed: u32) {
        self.clock.set_speed(speed);
    }

    fn next_id(&mut self) -> VehicleId {
        let id = VehicleId(self.next_vehicle_id);
        self.next_vehicle_id += 1;
        id
    }

    /// Deducts money if playing as a game. Returns false if insufficient funds.
    fn spend_for_game(&mut self, cost: i64) -> bool {
        match &mut self.economy {
            Some(economy) => economy.spend(cost),
            None => true,
        }
    }

    pub fn add_city(
        &mut self,
        name: impl Into<String>,
        position: Position,
        category: CityCategory,
        population: u32,
    ) -> CityId {
        self.network.add_city(name, position, category, population)
    }

    /// Builds a road without charging for it
    pub fn add_road(&mut self, from: CityId, to: CityId) -> Result<RoadId> {
        self.network.add_road(from, to)
    }

    /// Adds a lane without charging for it
    pub fn add_lane(&mut self, road: RoadId) -> Result<LaneId> {
        self.network.add_lane(road)
    }

    /// Builds a road if the ledger can pay for it; `Ok(None)` when it cannot
    pub fn try_add_road(&mut self, from: CityId, to: CityId) -> Result<Option<RoadId>> {
        let start = self.network.city(from).context("Start city not found")?.position;
        let end = self.network.city(to).context("End city not found")?.position;
        if from == to || self.network.find_road_between(from, to).is_some() {
            bail!("Cannot build a road from {:?} to {:?}", from, to);
        }

        let cost = Economy::construction_cost(start.distance(&end));
        if !self.spend_for_game(cost) {
            debug!("Not enough money for a road costing {}", cost);
            return Ok(None);
        }
        self.network.add_road(from, to).map(Some)
    }

    /// Adds a lane if the ledger can pay for it; `Ok(None)` when it cannot
    pub fn try_add_lane(&mut self, road: RoadId) -> Result<Option<LaneId>> {
        let length = self
            .network
            .road(road)
            .with_context(|| format!("Road {:?} not found", road))?
            .length;

        let cost = Economy::construction_cost(length);
        if !self.spend_for_game(cost) {
            debug!("Not enough money for a lane costing {}", cost);
            return Ok(None);
        }
        self.network.add_lane(road).map(Some)
    }

    /// Enforces `max_speed` on every road that has a camera
    pub fn set_speed_limit(&mut self, max_speed: f32) {
        self.law.max_speed = Some(max_speed);
        if self.law.fine == 0 {
            self.law.fine = SPEEDING_FINE;
        }
    }

    pub fn add_speed_camera(&mut self, road: RoadId) -> Result<()> {
        self.network
            .road(road)
            .with_context(|| format!("Road {:?} not found", road))?;
        if self.law.max_speed.is_none() {
            self.set_speed_limit(DEFAULT_MAX_SPEED);
        }
        self.law.add_camera(road);
        Ok(())
    }

    /// Queues requests on a city; they are served before organic traffic
    pub fn enqueue_wave(&mut self, city: CityId, requests: Vec<DispatchRequest>) -> Result<()> {
        for request in &requests {
            self.catalog
                .get(&request.class_name)
                .with_context(|| format!("Unknown vehicle class {:?}", request.class_name))?;
        }
        self.network
            .city_mut(city)
            .with_context(|| format!("City {:?} not found", city))?
            .enqueue(requests);
        Ok(())
    }

    /// Activates the next scripted wave; false once all waves are spent
    pub fn next_wave(&mut self) -> Result<bool> {
        let Some(wave) = self.waves.pop_front() else {
            return Ok(false);
        };
        self.waves_started += 1;

        let mut total = 0;
        for (city, requests) in wave {
            total += requests.iter().map(|request| request.amount).sum::<u32>();
            self.enqueue_wave(city, requests)?;
        }
        info!(
            "Wave {} started with {} vehicles at {}",
            self.waves_started,
            total,
            self.clock.display()
        );
        Ok(true)
    }

    pub fn waves_remaining(&self) -> usize {
        self.waves.len()
    }

    /// Vehicles still waiting in city queues
    pub fn queued_vehicles(&self) -> u32 {
        self.network.cities().iter().map(|city| city.queued()).sum()
    }

    /// Parks one persistent commuter per resident in every residential city
    ///
    /// Each commuter works in a category reachable by a road from home.
    /// Returns the number of commuters created.
    pub fn populate_commuters(&mut self) -> usize {
        let Some(class) = self.catalog.default_class().cloned() else {
            return 0;
        };
        let homes: Vec<(CityId, u32)> = self
            .network
            .cities()
            .iter()
            .filter(|city| city.category == CityCategory::Residential)
            .map(|city| (city.id, city.population))
            .collect();

        let mut created = 0;
        for (home, population) in homes {
            let mut workplaces: Vec<CityCategory> = self
                .network
                .outgoing_roads(home)
                .into_iter()
                .filter_map(|(_, to)| self.network.city(to).map(|city| city.category))
                .filter(|category| *category != CityCategory::Residential)
                .collect();
            workplaces.sort();
            workplaces.dedup();
            if workplaces.is_empty() {
                continue;
            }

            for _ in 0..population {
                let Some(destination) = self.rng.choose(&workplaces).copied() else {
                    continue;
                };
                let id = self.next_id();
                let vehicle =
                    Vehicle::new(id, &class, home, destination, &mut self.rng).with_commute(&mut self.rng);
                self.vehicles.insert(id, vehicle);
                created += 1;
            }
        }

        info!("Parked {} commuters in residential cities", created);
        created
    }

    /// Places a vehicle directly on a lane at `distance`, keeping the lane sorted
    pub fn spawn_on_lane(
        &mut self,
        lane: LaneId,
        class_name: &str,
        distance: f32,
        speed: f32,
    ) -> Result<VehicleId> {
        let class = self
            .catalog
            .get(class_name)
            .with_context(|| format!("Unknown vehicle class {:?}", class_name))?
            .clone();
        let road_id = self
            .network
            .lane(lane)
            .with_context(|| format!("Lane {:?} not found", lane))?
            .road;
        let road = self.network.road(road_id).context("Lane belongs to no road")?;
        let home = road.from;
        let destination = self
            .network
            .city(road.to)
            .context("Road leads to no city")?
            .category;

        let id = self.next_id();
        let mut vehicle = Vehicle::new(id, &class, home, destination, &mut self.rng);
        vehicle.depart(road_id, lane, speed);
        vehicle.distance_travelled = distance;
        if let Some(position) = self.network.vehicle_position(&vehicle) {
            vehicle.position = position;
        }

        let vehicles = &self.vehicles;
        self.network.insert_by_distance(lane, id, distance, |other| {
            vehicles.get(&other).map_or(0.0, |v| v.distance_travelled)
        });
        self.vehicles.insert(id, vehicle);
        self.stats.dispatched += 1;
        Ok(id)
    }

    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(&id)
    }

    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(&id)
    }

    pub fn in_transit(&self) -> usize {
        self.vehicles.values().filter(|v| v.in_transit()).count()
    }

    /// Runs one tick of the pipeline and returns what happened, in order
    pub fn tick(&mut self, delta_secs: f32) -> Vec<SimEvent> {
        let mut events = Vec::new();
        self.clock.advance(delta_secs);

        // Dispatch: queued waves first, then the organic policy
        let persistent = self.policy.keeps_vehicles();
        let mut ctx = DispatchContext {
            network: &mut self.network,
            vehicles: &mut self.vehicles,
            catalog: &self.catalog,
            clock: &self.clock,
            config: &self.config,
            rng: &mut self.rng,
            next_id: &mut self.next_vehicle_id,
            events: &mut events,
        };
        let dispatched = drain_queues(&mut ctx, persistent) + self.policy.dispatch(&mut ctx);
        self.stats.dispatched += dispatched as usize;

        // Car following
        update_speeds(&mut self.network, &mut self.vehicles, delta_secs);
        let crashed = move_and_detect(&mut self.network, &mut self.vehicles, delta_secs, &mut events);
        self.stats.crashed += crashed.len();
        if let Some(economy) = &mut self.economy {
            for vehicle in &crashed {
                let cost = self.catalog.get(&vehicle.class_name).map_or(0, |c| c.cost);
                economy.charge_crash(cost);
            }
        }

        // Lane changes
        let completed = progress_switches(&mut self.network, &mut self.vehicles, &self.config);
        self.stats.lane_changes += completed.len();

        // Arrivals
        let arrived = handle_arrivals(&mut self.network, &mut self.vehicles, &self.config, &mut events);
        self.stats.arrived += arrived.len();

        // Speed enforcement
        let collected = self
            .law
            .enforce(&self.vehicles, self.clock.elapsed_secs(), &mut events);

        for event in &events {
            match event {
                SimEvent::Arrived { class, .. } => {
                    if let Some(economy) = &mut self.economy {
                        let reward = self.catalog.get(class).map_or(0, |c| c.reward);
                        economy.reward_arrival(reward);
                    }
                }
                SimEvent::Crashed { .. } => self.stats.crash_events += 1,
                SimEvent::DispatchFailed { .. } => self.stats.dispatch_failures += 1,
                SimEvent::SpeedingFine { .. } => self.stats.fines += 1,
                SimEvent::Dispatched { .. } => {}
            }
        }
        if let Some(economy) = &mut self.economy {
            economy.collect_fine(collected);
        }

        self.stats.ticks += 1;
        self.stats.elapsed_secs = self.clock.elapsed_secs();

        #[cfg(debug_assertions)]
        self.assert_invariants();

        events
    }

    /// Runs as many ticks as the clock speed asks for; nothing while paused
    pub fn frame(&mut self, delta_secs: f32) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for _ in 0..self.clock.speed() {
            events.extend(self.tick(delta_secs));
        }
        events
    }

    pub fn check_invariants(&self) -> Result<()> {
        invariants::check_all(&self.network, &self.vehicles, &self.stats)
    }

    #[cfg(debug_assertions)]
    fn assert_invariants(&self) {
        if let Err(err) = self.check_invariants() {
            panic!("Simulation invariant broken: {err:#}");
        }
    }

    /// Creates the demo level with the demo catalog
    pub fn create_demo_world(config: SimConfig) -> Result<Self> {
        Self::from_level(&Level::demo(), VehicleCatalog::demo(), config)
    }

    /// Logs the end-of-run summary
    pub fn log_summary(&self) {
        self.stats.log_summary(self.in_transit());
        info!(
            "Cities: {}, Roads: {}, Lanes: {}",
            self.network.city_count(),
            self.network.road_count(),
            self.network.lane_count()
        );
        info!("Clock: day {} {}", self.clock.day(), self.clock.display());
        if let Some(economy) = &self.economy {
            info!("{}", economy.summary());
        }
    }
}
