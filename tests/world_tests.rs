//! The built-in test world driven end to end

use delivery_sim::simulation::{RatingCriteria, SimWorld, TestWorldConfig};

#[test]
fn test_world_layout() -> anyhow::Result<()> {
    let world = SimWorld::create_test_world(1)?;
    let manager = world.delivery_service().vehicle_manager();
    let region = manager.region();

    assert_eq!(region.node_count(), 16);
    assert_eq!(region.edge_count(), 24);
    assert_eq!(region.restaurants().count(), 3);
    assert_eq!(region.neighborhoods().count(), 12);
    assert_eq!(manager.all_vehicles().count(), 6);
    assert_eq!(world.current_tick(), 0);
    Ok(())
}

#[test]
fn test_full_run_scores_are_bounded() -> anyhow::Result<()> {
    let mut world = SimWorld::create_test_world(17)?;

    for _ in 0..600 {
        world.tick()?;
        for vehicle in world.delivery_service().vehicle_manager().vehicles() {
            assert!(vehicle.current_weight() <= vehicle.capacity());
        }
    }

    let stats = world.stats();
    assert_eq!(stats.orders_received, 200);
    assert!(stats.orders_delivered > 0);
    assert!(stats.orders_delivered <= stats.orders_loaded);

    let scores = world.scores();
    assert_eq!(
        scores.keys().copied().collect::<Vec<_>>(),
        vec![
            RatingCriteria::InTime,
            RatingCriteria::TravelDistance,
            RatingCriteria::AmountDelivered
        ]
    );
    for (criteria, score) in scores {
        assert!((0.0..=1.0).contains(&score), "{} out of range: {}", criteria, score);
    }
    Ok(())
}

#[test]
fn test_same_seed_same_scores() -> anyhow::Result<()> {
    let config = TestWorldConfig {
        order_count: 60,
        last_order_tick: 120,
        seed: Some(99),
        ..TestWorldConfig::default()
    };

    let mut first = SimWorld::build_test_world(&config)?;
    let mut second = SimWorld::build_test_world(&config)?;
    first.run(200)?;
    second.run(200)?;
    assert_eq!(first.scores(), second.scores());
    assert_eq!(first.stats(), second.stats());

    first.reset();
    first.run(200)?;
    assert_eq!(first.scores(), second.scores());
    Ok(())
}
