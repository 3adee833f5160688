//! Dispatch scheduler tests: wave queues, demand curve and scheduled commuters

use traffic_manager::simulation::{
    demand_at, estimate, CityCategory, CityId, DemandCurvePolicy, DispatchRequest, Position,
    RoadId, SimConfig, SimEvent, SimWorld, Trip,
};

fn request(class: &str, amount: u32, to: CityCategory) -> DispatchRequest {
    DispatchRequest {
        class_name: class.to_string(),
        amount,
        to,
    }
}

/// A residential city with one road to a commercial city
fn two_cities(config: SimConfig, population: u32) -> (SimWorld, CityId, CityId, RoadId) {
    let mut world = SimWorld::new(config);
    let home = world.add_city("Home", Position::new(0.0, 0.0), CityCategory::Residential, population);
    let work = world.add_city("Work", Position::new(1000.0, 0.0), CityCategory::Commercial, 0);
    let road = world.add_road(home, work).unwrap();
    (world, home, work, road)
}

fn dispatched_count(events: &[SimEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, SimEvent::Dispatched { .. }))
        .count()
}

#[test]
fn test_congested_lane_defers_dispatch() {
    let (mut world, home, _, road) = two_cities(SimConfig::with_seed(1), 10);
    let lane = world.network.road(road).unwrap().lanes[0];
    let blocker = world.spawn_on_lane(lane, "car", 5.0, 0.0).unwrap();
    world.vehicle_mut(blocker).unwrap().preferred_speed = 0.0;

    world
        .enqueue_wave(home, vec![request("car", 3, CityCategory::Commercial)])
        .unwrap();

    for _ in 0..10 {
        let events = world.tick(0.1);
        assert_eq!(dispatched_count(&events), 0);
        assert!(events
            .iter()
            .any(|event| matches!(event, SimEvent::DispatchFailed { city } if *city == home)));
    }

    assert_eq!(world.network.city(home).unwrap().queued(), 3);
    assert_eq!(world.stats.dispatched, 1);
    assert_eq!(world.network.lane_vehicles(lane), &[blocker]);
}

#[test]
fn test_wave_without_matching_road_is_deferred() {
    let (mut world, home, _, _) = two_cities(SimConfig::with_seed(1), 10);
    world
        .enqueue_wave(home, vec![request("car", 2, CityCategory::Leisure)])
        .unwrap();

    let events = world.tick(0.1);
    assert_eq!(dispatched_count(&events), 0);
    assert_eq!(world.queued_vehicles(), 2);
}

#[test]
fn test_enqueue_rejects_unknown_class_and_city() {
    let (mut world, home, _, _) = two_cities(SimConfig::with_seed(1), 10);
    assert!(world
        .enqueue_wave(home, vec![request("hovercraft", 1, CityCategory::Commercial)])
        .is_err());
    assert!(world
        .enqueue_wave(CityId(42), vec![request("car", 1, CityCategory::Commercial)])
        .is_err());
}

#[test]
fn test_wave_dispatch_keeps_minimum_spacing() {
    let config = SimConfig::with_seed(3);
    let min_travel = config.min_travel_distance;
    let (mut world, home, _, road) = two_cities(config, 20);
    let lane = world.network.road(road).unwrap().lanes[0];
    world
        .enqueue_wave(home, vec![request("car", 6, CityCategory::Commercial)])
        .unwrap();

    let mut total = 0;
    for _ in 0..300 {
        let rear_before = world
            .network
            .rear_vehicle(lane)
            .and_then(|id| world.vehicle(id))
            .map(|v| v.distance_travelled - v.width);

        let events = world.tick(0.1);
        if dispatched_count(&events) > 0 {
            total += 1;
            if let Some(rear) = rear_before {
                assert!(rear >= min_travel, "Dispatched behind a rear bumper at {}", rear);
            }
        }
    }

    assert_eq!(total, 6);
    assert_eq!(world.queued_vehicles(), 0);
    assert!(world.check_invariants().is_ok());
}

#[test]
fn test_one_dispatch_per_request_per_tick() {
    let (mut world, home, _, road) = two_cities(SimConfig::with_seed(5), 20);
    world.add_lane(road).unwrap();
    world.add_lane(road).unwrap();
    world
        .enqueue_wave(home, vec![request("car", 5, CityCategory::Commercial)])
        .unwrap();

    let events = world.tick(0.1);
    assert_eq!(dispatched_count(&events), 1);

    world
        .enqueue_wave(home, vec![request("van", 1, CityCategory::Commercial)])
        .unwrap();
    let events = world.tick(0.1);
    // Lane 0 is still busy with the first car, lanes 1 and 2 take one each
    assert_eq!(dispatched_count(&events), 2);
    assert_eq!(world.queued_vehicles(), 3);
}

#[test]
fn test_dispatch_moves_population() {
    let (mut world, home, _, _) = two_cities(SimConfig::with_seed(5), 4);
    world
        .enqueue_wave(home, vec![request("car", 1, CityCategory::Commercial)])
        .unwrap();
    world.tick(0.1);
    assert_eq!(world.network.city(home).unwrap().population, 3);
}

#[test]
fn test_demand_peaks_at_rush_hour() {
    let config = SimConfig::default();
    let rush = &config.rush_hours;

    assert_eq!(demand_at(8.5, rush, 3.0), 1.0);
    assert_eq!(demand_at(17.5, rush, 3.0), 1.0);
    assert!(demand_at(9.0, rush, 3.0) > demand_at(12.0, rush, 3.0));
    assert!(demand_at(3.0, rush, 3.0) < 0.01);

    assert_eq!(estimate(100, 8.5, &config), 50);
    assert_eq!(estimate(100, 13.0, &config), 0);
    assert_eq!(estimate(0, 8.5, &config), 0);
}

#[test]
fn test_demand_policy_fills_one_vehicle_per_lane() {
    let config = SimConfig {
        start_hour: 8.5,
        ..SimConfig::with_seed(9)
    };
    let mut world = SimWorld::new(config);
    world.set_policy(Box::new(DemandCurvePolicy));
    let home = world.add_city("Home", Position::new(0.0, 0.0), CityCategory::Residential, 100);
    let shop = world.add_city("Shop", Position::new(800.0, 0.0), CityCategory::Commercial, 0);
    let mill = world.add_city("Mill", Position::new(0.0, 800.0), CityCategory::Industrial, 0);
    let to_shop = world.add_road(home, shop).unwrap();
    world.add_lane(to_shop).unwrap();
    world.add_road(home, mill).unwrap();

    let events = world.tick(0.1);

    assert_eq!(dispatched_count(&events), 3);
    assert_eq!(world.network.city(home).unwrap().population, 97);
    assert!(world.vehicles.values().all(|v| !v.persistent));
}

#[test]
fn test_demand_policy_quiet_at_night() {
    let config = SimConfig {
        start_hour: 2.0,
        ..SimConfig::with_seed(9)
    };
    let mut world = SimWorld::new(config);
    world.set_policy(Box::new(DemandCurvePolicy));
    let home = world.add_city("Home", Position::new(0.0, 0.0), CityCategory::Residential, 100);
    let shop = world.add_city("Shop", Position::new(800.0, 0.0), CityCategory::Commercial, 0);
    world.add_road(home, shop).unwrap();

    for _ in 0..10 {
        assert_eq!(dispatched_count(&world.tick(0.1)), 0);
    }
}

#[test]
fn test_commuters_go_to_work_and_come_home() {
    let mut world = SimWorld::new(SimConfig::with_seed(21));
    let home = world.add_city("Home", Position::new(0.0, 0.0), CityCategory::Residential, 2);
    let work = world.add_city("Work", Position::new(300.0, 0.0), CityCategory::Commercial, 0);
    world.add_road(home, work).unwrap();
    world.add_road(work, home).unwrap();

    assert_eq!(world.populate_commuters(), 2);
    for vehicle in world.vehicles.values_mut() {
        assert!(vehicle.persistent);
        assert_eq!(vehicle.destination, CityCategory::Commercial);
        for window in &mut vehicle.schedule {
            window.centre_minute = match window.trip {
                Trip::Outbound => 6.0 * 60.0,
                Trip::Return => 7.5 * 60.0,
            };
        }
    }

    // One tick is one simulated minute at delta 1.0; run until 08:40
    for _ in 0..160 {
        world.tick(1.0);
    }

    assert_eq!(world.stats.dispatched, 4);
    assert_eq!(world.stats.arrived, 4);
    assert_eq!(world.stats.crashed, 0);
    assert_eq!(world.vehicles.len(), 2);
    for vehicle in world.vehicles.values() {
        assert_eq!(vehicle.city, Some(home));
        assert!(vehicle.schedule.iter().all(|w| w.used_on == Some(0)));
    }
    assert_eq!(world.network.city(home).unwrap().population, 2);
    assert_eq!(world.network.city(work).unwrap().population, 0);
}

#[test]
fn test_dispatch_failure_only_when_city_sends_nothing() {
    let (mut world, home, _, road) = two_cities(SimConfig::with_seed(2), 10);
    let mill = world.add_city("Mill", Position::new(0.0, 800.0), CityCategory::Industrial, 0);
    world.add_road(home, mill).unwrap();
    let lane = world.network.road(road).unwrap().lanes[0];
    let blocker = world.spawn_on_lane(lane, "car", 5.0, 0.0).unwrap();
    world.vehicle_mut(blocker).unwrap().preferred_speed = 0.0;

    world
        .enqueue_wave(
            home,
            vec![
                request("car", 1, CityCategory::Commercial),
                request("car", 1, CityCategory::Industrial),
            ],
        )
        .unwrap();

    // The mill request gets a lane, so the city is not out of capacity
    let events = world.tick(0.1);
    assert_eq!(dispatched_count(&events), 1);
    assert!(!events
        .iter()
        .any(|event| matches!(event, SimEvent::DispatchFailed { .. })));

    // Only the blocked request is left
    let events = world.tick(0.1);
    assert_eq!(dispatched_count(&events), 0);
    assert!(events
        .iter()
        .any(|event| matches!(event, SimEvent::DispatchFailed { city } if *city == home)));
    assert_eq!(world.queued_vehicles(), 1);
}

#[test]
fn test_unroutable_wave_reports_failure() {
    let (mut world, home, _, _) = two_cities(SimConfig::with_seed(1), 10);
    world
        .enqueue_wave(home, vec![request("car", 1, CityCategory::Leisure)])
        .unwrap();

    for _ in 0..3 {
        let events = world.tick(0.1);
        assert_eq!(
            events
                .iter()
                .filter(|event| matches!(event, SimEvent::DispatchFailed { .. }))
                .count(),
            1
        );
    }
    assert_eq!(world.stats.dispatch_failures, 3);
}
