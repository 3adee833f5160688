//! Car-following and collision tests on a single straight road

use traffic_manager::simulation::{
    CityCategory, LaneId, Position, SimEvent, SimWorld, CONTACT_EPSILON,
};

/// One road of length 1000 from a residential to a commercial city
fn straight_road(lanes: usize) -> (SimWorld, Vec<LaneId>) {
    let mut world = SimWorld::new_with_seed(7);
    let a = world.add_city("A", Position::new(0.0, 0.0), CityCategory::Residential, 0);
    let b = world.add_city("B", Position::new(1000.0, 0.0), CityCategory::Commercial, 0);
    let road = world.add_road(a, b).unwrap();
    for _ in 1..lanes {
        world.add_lane(road).unwrap();
    }
    let lanes = world.network.road(road).unwrap().lanes.clone();
    (world, lanes)
}

#[test]
fn test_free_vehicle_reaches_preferred_speed() {
    let (mut world, lanes) = straight_road(1);
    let id = world.spawn_on_lane(lanes[0], "car", 0.0, 0.0).unwrap();
    {
        let vehicle = world.vehicle_mut(id).unwrap();
        vehicle.preferred_speed = 80.0;
        vehicle.acceleration = 80.0;
    }

    world.tick(1.0);

    let vehicle = world.vehicle(id).unwrap();
    assert_eq!(vehicle.speed, 80.0);
    assert_eq!(vehicle.distance_travelled, 80.0);
}

#[test]
fn test_free_vehicle_slows_to_preferred_speed() {
    let (mut world, lanes) = straight_road(1);
    let id = world.spawn_on_lane(lanes[0], "car", 0.0, 100.0).unwrap();
    world.vehicle_mut(id).unwrap().preferred_speed = 80.0;

    world.tick(0.1);

    let vehicle = world.vehicle(id).unwrap();
    assert!(vehicle.speed < 100.0);
    assert!(vehicle.speed >= 80.0);

    for _ in 0..10 {
        world.tick(0.1);
    }
    assert_eq!(world.vehicle(id).unwrap().speed, 80.0);
}

#[test]
fn test_follower_never_crosses_stationary_leader() {
    for delta in [1.0, 0.5, 0.1, 0.01] {
        let (mut world, lanes) = straight_road(1);
        let leader = world.spawn_on_lane(lanes[0], "car", 100.0, 0.0).unwrap();
        world.vehicle_mut(leader).unwrap().preferred_speed = 0.0;
        let follower = world.spawn_on_lane(lanes[0], "car", 78.0, 50.0).unwrap();
        world.vehicle_mut(follower).unwrap().preferred_speed = 120.0;

        let leader_rear = 100.0 - 12.0;
        for _ in 0..500 {
            let events = world.tick(delta);
            assert!(
                !events.iter().any(|e| matches!(e, SimEvent::Crashed { .. })),
                "Unexpected crash at delta {}",
                delta
            );
            let follower = world.vehicle(follower).unwrap();
            assert!(
                follower.distance_travelled <= leader_rear + CONTACT_EPSILON,
                "Follower at {} crossed the leader's rear at delta {}",
                follower.distance_travelled,
                delta
            );
        }

        let follower = world.vehicle(follower).unwrap();
        assert!(follower.speed < 0.01, "Follower still moving at {}", follower.speed);
        assert!(!follower.lane_change.is_switching());
        assert_eq!(world.vehicle(leader).unwrap().distance_travelled, 100.0);
    }
}

#[test]
fn test_overlapping_vehicles_crash() {
    let (mut world, lanes) = straight_road(1);
    let leader = world.spawn_on_lane(lanes[0], "car", 100.0, 0.0).unwrap();
    let follower = world.spawn_on_lane(lanes[0], "car", 95.0, 0.0).unwrap();
    let bystander = world.spawn_on_lane(lanes[0], "car", 40.0, 0.0).unwrap();

    let events = world.tick(0.1);

    let crashes: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            SimEvent::Crashed { a, b, .. } => Some((*a, *b)),
            _ => None,
        })
        .collect();
    assert_eq!(crashes, vec![(follower, leader)]);

    assert!(world.vehicle(leader).is_none());
    assert!(world.vehicle(follower).is_none());
    assert!(world.vehicle(bystander).is_some());
    assert_eq!(world.network.lane_vehicles(lanes[0]), &[bystander]);
    assert_eq!(world.stats.crashed, 2);
    assert!(world.check_invariants().is_ok());
}

#[test]
fn test_crash_charges_class_cost() {
    let mut world = SimWorld::new_with_economy(Default::default());
    let a = world.add_city("A", Position::new(0.0, 0.0), CityCategory::Residential, 0);
    let b = world.add_city("B", Position::new(1000.0, 0.0), CityCategory::Commercial, 0);
    let road = world.add_road(a, b).unwrap();
    let lane = world.network.road(road).unwrap().lanes[0];
    let start = world.economy.as_ref().unwrap().money;

    world.spawn_on_lane(lane, "truck", 200.0, 0.0).unwrap();
    world.spawn_on_lane(lane, "car", 190.0, 0.0).unwrap();
    world.tick(0.1);

    let economy = world.economy.as_ref().unwrap();
    let truck = world.catalog.get("truck").unwrap().cost;
    let car = world.catalog.get("car").unwrap().cost;
    assert_eq!(economy.money, start - truck - car);
    assert_eq!(economy.crash_losses, truck + car);
}

#[test]
fn test_vehicle_position_follows_road() {
    let (mut world, lanes) = straight_road(2);
    let id = world.spawn_on_lane(lanes[1], "car", 0.0, 50.0).unwrap();
    world.vehicle_mut(id).unwrap().preferred_speed = 50.0;

    world.tick(1.0);

    let vehicle = world.vehicle(id).unwrap();
    assert_eq!(vehicle.position.x, 50.0);
    // Lane 1 sits one lane width plus the inset off the road axis
    assert_eq!(vehicle.position.y, 12.0);
}
