//! Whole-world tests: levels, waves, clock and long seeded runs

use traffic_manager::simulation::{
    Clock, DemandCurvePolicy, Level, LevelRoad, SimConfig, SimEvent, SimWorld, VehicleCatalog,
    VehicleClass, WaveComponent, WaveFromCity, CityCategory, SPEED_PAUSE, SPEED_TWO,
};

#[test]
fn test_clock_starts_at_six() {
    let mut clock = Clock::new(6.0, 60.0);
    assert_eq!(clock.display(), "06:00");
    assert_eq!(clock.day(), 0);

    // One tick-second is one simulated minute
    clock.advance(1.0);
    assert_eq!(clock.display(), "06:01");

    for _ in 0..(18 * 60) {
        clock.advance(1.0);
    }
    assert_eq!(clock.day(), 1);
    assert_eq!(clock.display(), "00:01");
}

#[test]
fn test_frame_runs_speed_ticks() {
    let mut world = SimWorld::create_demo_world(SimConfig::with_seed(2)).unwrap();

    world.frame(0.1);
    assert_eq!(world.stats.ticks, 1);

    world.set_speed(SPEED_TWO);
    world.frame(0.1);
    assert_eq!(world.stats.ticks, 3);

    world.set_speed(SPEED_PAUSE);
    assert!(world.clock.is_paused());
    assert!(world.frame(0.1).is_empty());
    assert_eq!(world.stats.ticks, 3);
}

#[test]
fn test_demo_level_loads() {
    let world = SimWorld::create_demo_world(SimConfig::with_seed(1)).unwrap();
    let level = Level::demo();

    assert_eq!(world.network.city_count(), level.cities.len());
    assert_eq!(world.network.road_count(), level.roads.len());
    let lanes: usize = level.roads.iter().map(|road| road.lanes).sum();
    assert_eq!(world.network.lane_count(), lanes);
    assert_eq!(world.waves_remaining(), level.waves.len());
}

#[test]
fn test_invalid_level_is_rejected() {
    let catalog = VehicleCatalog::demo();

    let mut level = Level::demo();
    level.waves[0][0].vehicles.push(WaveComponent {
        class_name: "zeppelin".to_string(),
        amount: 1,
        to: CityCategory::Commercial,
    });
    assert!(SimWorld::from_level(&level, catalog.clone(), SimConfig::default()).is_err());

    let mut level = Level::demo();
    level.roads.push(LevelRoad { from: 0, to: 9, lanes: 1 });
    assert!(level.validate(&catalog).is_err());

    let mut level = Level::demo();
    level.waves.push(vec![WaveFromCity {
        from: 99,
        vehicles: Vec::new(),
    }]);
    assert!(level.validate(&catalog).is_err());
}

#[test]
fn test_invalid_vehicle_class_is_rejected() {
    let broken = VehicleClass {
        name: "wreck".to_string(),
        length: 10.0,
        min_speed: 90.0,
        max_speed: 50.0,
        brakes: 100.0,
        acceleration: 50.0,
        cost: 1,
        reward: 1,
    };
    assert!(broken.validate().is_err());
    assert!(VehicleCatalog::new(vec![broken]).is_err());

    let car = VehicleCatalog::demo().get("car").cloned().unwrap();
    assert!(VehicleCatalog::new(vec![car.clone(), car]).is_err());
}

#[test]
fn test_waves_activate_in_order() {
    let mut world = SimWorld::create_demo_world(SimConfig::with_seed(4)).unwrap();
    let level = Level::demo();

    for wave in &level.waves {
        let expected: u32 = wave
            .iter()
            .flat_map(|from| from.vehicles.iter())
            .map(|component| component.amount)
            .sum();
        let queued = world.queued_vehicles();
        assert!(world.next_wave().unwrap());
        assert_eq!(world.queued_vehicles(), queued + expected);
    }
    assert!(!world.next_wave().unwrap());
    assert_eq!(world.waves_remaining(), 0);
}

#[test]
fn test_waves_drain_and_conserve_vehicles() {
    let mut world = SimWorld::create_demo_world(SimConfig::with_seed(8)).unwrap();
    world.next_wave().unwrap();
    let queued = world.queued_vehicles() as usize;

    for _ in 0..2000 {
        world.tick(0.1);
    }

    assert_eq!(world.queued_vehicles(), 0);
    assert_eq!(world.stats.dispatched, queued);
    assert!(world.stats.arrived > 0);
    assert!(world.check_invariants().is_ok());
    assert!(world.stats.is_conserved(world.in_transit()));
}

#[test]
fn test_long_commuter_run_keeps_invariants() {
    let mut world = SimWorld::create_demo_world(SimConfig::with_seed(42)).unwrap();
    world.populate_commuters();
    world.next_wave().unwrap();

    for tick in 0..3000 {
        let events = world.tick(0.1);
        assert!(
            !events.iter().any(|event| matches!(event, SimEvent::Crashed { .. })),
            "Crash at tick {}",
            tick
        );
        if tick % 100 == 0 {
            world.check_invariants().unwrap();
        }
    }

    world.check_invariants().unwrap();
    assert!(world.stats.dispatched > 0);
    assert!(world.stats.arrived > 0);
    assert_eq!(world.stats.crashed, 0);
    assert!(world.stats.is_conserved(world.in_transit()));
}

#[test]
fn test_demand_run_keeps_invariants() {
    let config = SimConfig {
        start_hour: 8.0,
        ..SimConfig::with_seed(13)
    };
    let mut world = SimWorld::create_demo_world(config).unwrap();
    world.set_policy(Box::new(DemandCurvePolicy));

    for _ in 0..1500 {
        world.tick(0.1);
    }

    world.check_invariants().unwrap();
    assert!(world.stats.dispatched > 0);
    assert_eq!(world.stats.crashed, 0);
    assert!(world.stats.is_conserved(world.in_transit()));
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let run = |seed| {
        let mut world = SimWorld::create_demo_world(SimConfig::with_seed(seed)).unwrap();
        world.populate_commuters();
        world.next_wave().unwrap();
        for _ in 0..1000 {
            world.tick(0.1);
        }
        world.stats.clone()
    };

    assert_eq!(run(99), run(99));
}
