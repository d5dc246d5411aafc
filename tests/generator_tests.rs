//! Order generation

use delivery_sim::simulation::{
    ConfirmedOrder, FridayOrderGenerator, Location, OrderGenerator, OrderId, Region,
    RestaurantPreset, ScriptedOrderGenerator, SimError, TickInterval,
};

fn region() -> anyhow::Result<Region> {
    let mut builder = Region::builder();
    builder
        .add_restaurant(Location::new(0, 0), RestaurantPreset::PizzaPalace)?
        .add_restaurant(Location::new(4, 0), RestaurantPreset::BurgerBarn)?
        .add_neighborhood("West", Location::new(0, 4))?
        .add_neighborhood("East", Location::new(4, 4))?
        .add_node("Middle", Location::new(2, 2))?;
    Ok(builder.build()?)
}

fn all_orders(
    generator: &mut dyn OrderGenerator,
    last_tick: i64,
) -> anyhow::Result<Vec<(i64, ConfirmedOrder)>> {
    let mut orders = Vec::new();
    for tick in 0..=last_tick {
        for order in generator.generate_orders(tick)? {
            orders.push((tick, order));
        }
    }
    Ok(orders)
}

#[test]
fn test_friday_orders_are_well_formed() -> anyhow::Result<()> {
    let region = region()?;
    let mut generator = FridayOrderGenerator::builder()
        .order_count(300)
        .last_tick(100)
        .delivery_interval(15)
        .max_weight(0.5)
        .seed(Some(7))
        .build(&region)?;

    let orders = all_orders(&mut generator, 100)?;
    assert_eq!(orders.len(), 300);

    for (tick, order) in &orders {
        let window = order.delivery_interval();
        assert_eq!(window.start(), *tick);
        assert_eq!(window.duration(), 15);
        assert!((0.0..0.5).contains(&order.weight()));
        assert!((1..10).contains(&order.food_list().len()));

        let restaurant = region.node(order.restaurant()).expect("restaurant exists");
        let menu = restaurant.available_food().expect("restaurant has a menu");
        assert!(order.food_list().iter().all(|food| menu.contains(food)));
        assert!(region
            .node(order.location())
            .is_some_and(|node| node.is_neighborhood()));
        assert!(order.actual_delivery_tick().is_none());
    }
    Ok(())
}

#[test]
fn test_friday_orders_cluster_mid_evening() -> anyhow::Result<()> {
    let region = region()?;
    let mut generator = FridayOrderGenerator::builder()
        .order_count(1000)
        .last_tick(480)
        .seed(Some(11))
        .build(&region)?;

    let ticks: Vec<i64> = all_orders(&mut generator, 480)?
        .into_iter()
        .map(|(tick, _)| tick)
        .collect();
    assert_eq!(ticks.len(), 1000);
    let mean = ticks.iter().sum::<i64>() as f64 / ticks.len() as f64;
    assert!((200.0..280.0).contains(&mean), "mean order tick {}", mean);
    Ok(())
}

#[test]
fn test_truncated_gaussian_stays_in_unit_interval() -> anyhow::Result<()> {
    let region = region()?;
    let mut generator = FridayOrderGenerator::builder()
        .standard_deviation(2.0)
        .seed(Some(3))
        .build(&region)?;
    for _ in 0..1000 {
        let sample = generator.random_gaussian_between_zero_and_one();
        assert!((0.0..=1.0).contains(&sample));
    }
    Ok(())
}

#[test]
fn test_same_seed_same_orders() -> anyhow::Result<()> {
    let region = region()?;
    let builder = FridayOrderGenerator::builder()
        .order_count(50)
        .last_tick(60)
        .seed(Some(42));

    let first = all_orders(&mut builder.build(&region)?, 60)?;
    let second = all_orders(&mut builder.build(&region)?, 60)?;
    assert_eq!(first, second);

    let other = all_orders(&mut builder.clone().seed(Some(43)).build(&region)?, 60)?;
    assert_ne!(first, other);
    Ok(())
}

#[test]
fn test_negative_tick_is_rejected() -> anyhow::Result<()> {
    let region = region()?;
    let mut generator = FridayOrderGenerator::builder()
        .order_count(10)
        .seed(Some(1))
        .build(&region)?;
    assert_eq!(generator.generate_orders(-1), Err(SimError::NegativeTick(-1)));

    let mut scripted = ScriptedOrderGenerator::new();
    assert_eq!(scripted.generate_orders(-3), Err(SimError::NegativeTick(-3)));
    Ok(())
}

#[test]
fn test_builder_rejects_bad_parameters() -> anyhow::Result<()> {
    let region = region()?;
    assert!(matches!(
        FridayOrderGenerator::builder().max_weight(0.0).build(&region),
        Err(SimError::InvalidParameter(_))
    ));
    assert!(matches!(
        FridayOrderGenerator::builder().standard_deviation(-1.0).build(&region),
        Err(SimError::InvalidParameter(_))
    ));
    assert!(matches!(
        FridayOrderGenerator::builder().delivery_interval(-5).build(&region),
        Err(SimError::InvalidParameter(_))
    ));

    let mut builder = Region::builder();
    builder.add_restaurant(Location::new(0, 0), RestaurantPreset::TacoTruck)?;
    let no_customers = builder.build()?;
    assert!(matches!(
        FridayOrderGenerator::builder().build(&no_customers),
        Err(SimError::InvalidRegion(_))
    ));
    Ok(())
}

#[test]
fn test_scripted_orders_replay() -> anyhow::Result<()> {
    let order = ConfirmedOrder::new(
        OrderId(9),
        Location::new(0, 4),
        Location::new(0, 0),
        TickInterval::new(3, 8)?,
        vec!["Salami".to_string()],
        0.3,
    )?;
    let mut scripted = ScriptedOrderGenerator::new();
    scripted.add_order(3, order.clone());
    assert_eq!(scripted.order_count(), 1);

    assert!(scripted.generate_orders(2)?.is_empty());
    assert_eq!(scripted.generate_orders(3)?, vec![order.clone()]);
    assert_eq!(scripted.generate_orders(3)?, vec![order]);
    Ok(())
}
