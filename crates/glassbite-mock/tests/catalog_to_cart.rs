//! Catalog data flowing into the session stores.

use glassbite_mock::{
    DataProvider, FixedLocationProvider, LocationError, MockDataProvider, locate,
};
use glassbite_state::{Coordinates, Customizations, LineKey, Money, Session};

fn provider() -> MockDataProvider {
    MockDataProvider::embedded().expect("embedded catalog parses")
}

#[test]
fn customized_item_prices_flow_into_cart_totals() {
    let p = provider();
    let restaurant = p.restaurant_by_id("r-bangkok-bowl").expect("fixture restaurant");
    let pad_thai = p.menu_item("m-pad-thai").expect("fixture item");

    let session = Session::new();
    let shrimp = Customizations::from([
        ("protein".to_string(), "shrimp".to_string()),
        ("spice".to_string(), "thai-hot".to_string()),
    ]);
    session.cart.add_item(pad_thai.clone(), restaurant.clone(), 2, shrimp.clone());
    session.cart.add_item(pad_thai, restaurant, 1, Customizations::new());

    let cart = session.cart.state();
    let line = cart.line(&LineKey::new("m-pad-thai", &shrimp)).expect("customized line");
    assert_eq!(line.unit_price(), Money::from_cents(1500));
    assert_eq!(cart.subtotal, Money::from_cents(3000 + 1200));
    assert_eq!(cart.total, Money::from_cents(4200 + 299));
    assert_eq!(cart.item_count(), 3);
}

#[test]
fn fixture_user_and_history_seed_the_session() {
    let p = provider();
    let session = Session::new();
    let user = p.user().expect("fixture user");
    session.orders.load_history(p.orders_for_user(&user.id));
    session.user.set_user(user);

    assert_eq!(
        session.user.default_address().map(|a| a.id),
        Some("addr-home".to_string())
    );
    assert_eq!(session.orders.state().order_history.len(), 2);
    assert!(!session.orders.has_active_order());
}

#[test]
fn located_user_sees_nearby_restaurants() {
    let p = provider();
    let session = Session::new();
    let here = Coordinates::new(37.7577, -122.4236);

    let location = locate(&FixedLocationProvider::at(here)).expect("scripted fix");
    session.app.set_location(Some(location));

    let origin = session.app.state().current_location.as_ref().map(|l| l.coordinates);
    let nearby = p.restaurants_within(origin.expect("location set"), 3.0);
    assert!(nearby.iter().any(|(r, _)| r.id == "r-bangkok-bowl"));
    assert!(nearby.iter().all(|(r, _)| r.id != "r-oakland-smoke"));
}

#[test]
fn denied_location_leaves_app_state_alone() {
    let session = Session::new();
    match locate(&FixedLocationProvider::denied()) {
        Ok(location) => session.app.set_location(Some(location)),
        Err(err) => assert_eq!(err, LocationError::PermissionDenied),
    }
    assert!(session.app.state().current_location.is_none());
}
