//! Vehicle movement, occupancy and the per-tick state machine

use std::sync::{Arc, Mutex};

use delivery_sim::simulation::{
    ArrivalAction, ComponentRef, ConfirmedOrder, DijkstraPathCalculator, EdgeKey, Event,
    Location, OrderId, PathCalculator, Region, RestaurantPreset, SimError, TickInterval,
    VehicleId, VehicleManager,
};

const RESTAURANT: Location = Location::new(0, 0);
const NEIGHBORHOOD: Location = Location::new(0, 3);
const CROSSING: Location = Location::new(3, 0);
const ISLAND: Location = Location::new(9, 9);

/// Restaurant with one neighborhood and one crossing, each 3 ticks away,
/// plus an unreachable island
fn manager() -> anyhow::Result<VehicleManager> {
    let mut builder = Region::builder();
    builder
        .add_restaurant(RESTAURANT, RestaurantPreset::TacoTruck)?
        .add_neighborhood("Hillside", NEIGHBORHOOD)?
        .add_node("Crossing", CROSSING)?
        .add_neighborhood("Island", ISLAND)?;
    builder
        .add_edge("Hill Road", RESTAURANT, NEIGHBORHOOD)?
        .add_edge("Cross Road", RESTAURANT, CROSSING)?;
    let region = Arc::new(builder.build()?);
    let path_calculator: Arc<dyn PathCalculator> =
        Arc::new(DijkstraPathCalculator::new(Arc::clone(&region)));
    Ok(VehicleManager::new(region, path_calculator))
}

fn order(id: u64, location: Location, weight: f64) -> anyhow::Result<ConfirmedOrder> {
    Ok(ConfirmedOrder::new(
        OrderId(id),
        location,
        RESTAURANT,
        TickInterval::new(5, 10)?,
        vec!["Taco".to_string()],
        weight,
    )?)
}

type CallLog = Arc<Mutex<Vec<(VehicleId, i64)>>>;

fn recording_callback(log: &CallLog) -> ArrivalAction {
    let log = Arc::clone(log);
    ArrivalAction::Callback(Box::new(move |vehicle, tick| {
        log.lock().unwrap().push((vehicle, tick));
    }))
}

#[test]
fn test_vehicle_spawns_on_next_tick() -> anyhow::Result<()> {
    let mut manager = manager()?;
    let vehicle = manager.add_vehicle(RESTAURANT, 10.0)?;

    assert_eq!(manager.vehicles().count(), 0);
    assert_eq!(manager.all_vehicles().count(), 1);
    assert_eq!(manager.pending_spawn(), &[vehicle]);

    let events = manager.tick(0);
    assert_eq!(
        events,
        vec![Event::Spawn {
            tick: 0,
            vehicle,
            node: RESTAURANT
        }]
    );
    assert_eq!(manager.vehicles().count(), 1);
    assert!(manager.pending_spawn().is_empty());

    let restaurant = manager.occupied_restaurant(RESTAURANT)?;
    assert!(restaurant.contains(vehicle));
    assert_eq!(restaurant.based_vehicles(), vec![vehicle]);
    assert_eq!(restaurant.stats(vehicle).map(|stats| stats.arrived), Some(0));
    Ok(())
}

#[test]
fn test_add_vehicle_validates_home() -> anyhow::Result<()> {
    let mut manager = manager()?;

    assert_eq!(
        manager.add_vehicle(NEIGHBORHOOD, 1.0),
        Err(SimError::NotARestaurant(NEIGHBORHOOD))
    );
    assert_eq!(
        manager.add_vehicle(Location::new(42, 42), 1.0),
        Err(SimError::NodeNotFound(Location::new(42, 42)))
    );
    assert!(matches!(
        manager.add_vehicle(RESTAURANT, 0.0),
        Err(SimError::InvalidParameter(_))
    ));
    assert_eq!(manager.all_vehicles().count(), 0);
    Ok(())
}

#[test]
fn test_vehicle_traverses_edge_in_duration_ticks() -> anyhow::Result<()> {
    let mut manager = manager()?;
    let vehicle = manager.add_vehicle(RESTAURANT, 10.0)?;
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));

    manager.tick(0);
    manager.queue_move(vehicle, NEIGHBORHOOD, Some(recording_callback(&calls)))?;
    assert_eq!(
        manager
            .occupied_node(RESTAURANT)?
            .stats(vehicle)
            .and_then(|stats| stats.departure),
        Some(1)
    );

    let events = manager.tick(1);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        Event::ArrivedAtEdge { tick: 1, last_node, .. } if *last_node == RESTAURANT
    ));
    let key = EdgeKey::between(RESTAURANT, NEIGHBORHOOD);
    assert_eq!(manager.vehicle(vehicle)?.position(), ComponentRef::Edge(key));
    assert!(!manager.occupied_node(RESTAURANT)?.contains(vehicle));

    // The edge skips vehicles that entered during the same tick
    let edge = manager.occupied_edge(NEIGHBORHOOD, RESTAURANT)?;
    assert_eq!(edge.traversal(vehicle).map(|t| t.progress), Some(0));

    assert!(manager.tick(2).is_empty());
    assert!(manager.tick(3).is_empty());
    let edge = manager.occupied_edge(RESTAURANT, NEIGHBORHOOD)?;
    assert_eq!(edge.traversal(vehicle).map(|t| t.progress), Some(2));

    let events = manager.tick(4);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        Event::ArrivedAtNode { tick: 4, node, last_edge, .. }
            if *node == NEIGHBORHOOD && last_edge.duration() == 3
    ));
    assert_eq!(*calls.lock().unwrap(), vec![(vehicle, 4)]);

    for tick in 5..10 {
        assert!(manager.tick(tick).is_empty());
    }
    assert_eq!(calls.lock().unwrap().len(), 1);

    let parked = manager.vehicle(vehicle)?;
    assert!(parked.is_idle());
    assert_eq!(parked.current_node(), Some(NEIGHBORHOOD));
    assert!(manager
        .occupied(ComponentRef::Node(NEIGHBORHOOD))?
        .vehicle_ids()
        .contains(&vehicle));
    Ok(())
}

#[test]
fn test_move_to_current_node_runs_action_once() -> anyhow::Result<()> {
    let mut manager = manager()?;
    let vehicle = manager.add_vehicle(RESTAURANT, 10.0)?;
    let calls: CallLog = Arc::new(Mutex::new(Vec::new()));

    manager.tick(0);
    manager.queue_move(vehicle, RESTAURANT, Some(recording_callback(&calls)))?;

    let events = manager.tick(1);
    assert!(events.is_empty());
    assert_eq!(*calls.lock().unwrap(), vec![(vehicle, 1)]);

    manager.tick(2);
    assert_eq!(calls.lock().unwrap().len(), 1);
    assert!(manager.vehicle(vehicle)?.is_idle());
    Ok(())
}

#[test]
fn test_unreachable_target_is_rejected_when_queued() -> anyhow::Result<()> {
    let mut manager = manager()?;
    let vehicle = manager.add_vehicle(RESTAURANT, 10.0)?;
    manager.tick(0);

    assert_eq!(
        manager.queue_move(vehicle, ISLAND, None),
        Err(SimError::NoPath {
            from: RESTAURANT,
            to: ISLAND
        })
    );
    assert_eq!(
        manager.queue_move(vehicle, Location::new(-1, -1), None),
        Err(SimError::NodeNotFound(Location::new(-1, -1)))
    );
    assert_eq!(
        manager.queue_move(VehicleId(7), NEIGHBORHOOD, None),
        Err(SimError::VehicleNotFound(VehicleId(7)))
    );
    assert!(manager.vehicle(vehicle)?.is_idle());
    Ok(())
}

#[test]
fn test_queued_moves_chain_from_previous_target() -> anyhow::Result<()> {
    let mut manager = manager()?;
    let vehicle = manager.add_vehicle(RESTAURANT, 10.0)?;
    manager.tick(0);

    manager.queue_move(vehicle, NEIGHBORHOOD, None)?;
    manager.queue_move(vehicle, CROSSING, None)?;
    assert_eq!(manager.vehicle(vehicle)?.queued_targets(), vec![NEIGHBORHOOD, CROSSING]);

    // 3 ticks out, 3 back to the restaurant, 3 more to the crossing
    let mut arrivals = Vec::new();
    for tick in 1..=13 {
        for event in manager.tick(tick) {
            if let Event::ArrivedAtNode { tick, node, .. } = event {
                arrivals.push((tick, node));
            }
        }
    }
    assert_eq!(
        arrivals,
        vec![(4, NEIGHBORHOOD), (8, RESTAURANT), (12, CROSSING)]
    );
    assert_eq!(manager.vehicle(vehicle)?.current_node(), Some(CROSSING));
    Ok(())
}

#[test]
fn test_move_direct_finishes_current_edge_first() -> anyhow::Result<()> {
    let mut manager = manager()?;
    let vehicle = manager.add_vehicle(RESTAURANT, 10.0)?;
    manager.tick(0);
    manager.queue_move(vehicle, NEIGHBORHOOD, None)?;
    manager.queue_move(vehicle, CROSSING, None)?;
    manager.tick(1);
    manager.tick(2);

    manager.move_direct(vehicle, RESTAURANT, None)?;
    assert_eq!(
        manager.vehicle(vehicle)?.queued_targets(),
        vec![NEIGHBORHOOD, RESTAURANT]
    );

    for tick in 3..=10 {
        manager.tick(tick);
    }
    let vehicle = manager.vehicle(vehicle)?;
    assert!(vehicle.is_idle());
    assert_eq!(vehicle.current_node(), Some(RESTAURANT));
    Ok(())
}

#[test]
fn test_load_order_checks_vehicle_state() -> anyhow::Result<()> {
    let mut manager = manager()?;
    let vehicle = manager.add_vehicle(RESTAURANT, 1.0)?;

    assert_eq!(
        manager.load_order(vehicle, order(1, NEIGHBORHOOD, 0.5)?, 0),
        Err(SimError::VehicleNotSpawned(vehicle))
    );

    manager.tick(0);
    let event = manager.load_order(vehicle, order(1, NEIGHBORHOOD, 0.5)?, 0)?;
    assert!(matches!(event, Event::LoadOrder { tick: 0, restaurant, .. } if restaurant == RESTAURANT));

    assert!(matches!(
        manager.load_order(vehicle, order(2, NEIGHBORHOOD, 0.6)?, 0),
        Err(SimError::CapacityExceeded { .. })
    ));
    manager.load_order(vehicle, order(3, NEIGHBORHOOD, 0.5)?, 0)?;
    assert_eq!(manager.vehicle(vehicle)?.remaining_capacity(), 0.0);

    let elsewhere = ConfirmedOrder::new(
        OrderId(4),
        NEIGHBORHOOD,
        CROSSING,
        TickInterval::new(0, 1)?,
        Vec::new(),
        0.0,
    )?;
    assert_eq!(
        manager.load_order(vehicle, elsewhere, 0),
        Err(SimError::NotARestaurant(CROSSING))
    );
    Ok(())
}

#[test]
fn test_deliver_orders_only_at_neighborhoods() -> anyhow::Result<()> {
    let mut manager = manager()?;
    let vehicle = manager.add_vehicle(RESTAURANT, 10.0)?;
    manager.tick(0);
    assert_eq!(
        manager.load_order(vehicle, order(1, CROSSING, 1.0)?, 0),
        Err(SimError::NotANeighborhood(CROSSING))
    );
    assert_eq!(
        manager.load_order(vehicle, order(3, RESTAURANT, 1.0)?, 0),
        Err(SimError::NotANeighborhood(RESTAURANT))
    );
    manager.load_order(vehicle, order(2, NEIGHBORHOOD, 1.0)?, 0)?;

    manager.queue_move(vehicle, CROSSING, Some(ArrivalAction::DeliverOrders))?;
    let mut delivered: Vec<(i64, ConfirmedOrder)> = Vec::new();
    for tick in 1..=5 {
        for event in manager.tick(tick) {
            if let Event::DeliverOrder { tick, order, .. } = event {
                delivered.push((tick, order));
            }
        }
    }
    assert!(delivered.is_empty());
    assert_eq!(manager.vehicle(vehicle)?.orders().len(), 1);

    // Crossing -> restaurant -> neighborhood, 3 ticks per edge
    manager.queue_move(vehicle, NEIGHBORHOOD, Some(ArrivalAction::DeliverOrders))?;
    for tick in 6..=15 {
        for event in manager.tick(tick) {
            if let Event::DeliverOrder { tick, order, .. } = event {
                delivered.push((tick, order));
            }
        }
    }
    assert_eq!(delivered.len(), 1);
    let (tick, order) = &delivered[0];
    assert_eq!(*tick, 13);
    assert_eq!(order.id(), OrderId(2));
    assert_eq!(order.actual_delivery_tick(), Some(13));
    assert!(manager.vehicle(vehicle)?.orders().is_empty());
    assert_eq!(manager.occupied_neighborhood(NEIGHBORHOOD)?.delivered_orders(), 1);
    Ok(())
}

#[test]
fn test_reset_is_idempotent() -> anyhow::Result<()> {
    let mut manager = manager()?;
    let vehicle = manager.add_vehicle(RESTAURANT, 10.0)?;
    manager.tick(0);
    manager.load_order(vehicle, order(1, NEIGHBORHOOD, 1.0)?, 0)?;
    manager.queue_move(vehicle, NEIGHBORHOOD, None)?;
    manager.tick(1);
    manager.tick(2);

    for _ in 0..2 {
        manager.reset();
        assert_eq!(manager.vehicles().count(), 0);
        assert_eq!(manager.pending_spawn(), &[vehicle]);
        assert!(manager.occupied_nodes().all(|node| node.vehicle_count() == 0));
        assert!(manager.occupied_edges().all(|edge| edge.vehicle_count() == 0));

        let reset = manager.vehicle(vehicle)?;
        assert!(reset.is_idle());
        assert!(reset.orders().is_empty());
        assert!(!reset.is_spawned());
        assert_eq!(reset.position(), ComponentRef::Node(RESTAURANT));
        assert_eq!(
            manager.occupied_restaurant(RESTAURANT)?.based_vehicles(),
            vec![vehicle]
        );
    }

    let events = manager.tick(0);
    assert!(matches!(events.as_slice(), [Event::Spawn { tick: 0, .. }]));
    Ok(())
}
