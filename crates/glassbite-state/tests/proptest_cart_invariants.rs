//! Property tests for the session slices.
//!
//! 1. Cart totals equal the sum of line totals plus the delivery fee after
//!    every single action.
//! 2. Every cart line keeps quantity >= 1 and a unique key.
//! 3. All cart lines come from the cart's restaurant.
//! 4. Any add, update, remove or default change leaves exactly one default
//!    address and payment method whenever those collections are non-empty.
//! 5. Distinct customization maps never share a line key.

use std::collections::HashSet;

use glassbite_state::{
    Address, CartAction, CartState, Coordinates, CustomizationGroup, CustomizationOption,
    Customizations, LineKey, MenuItem, Money, PaymentKind, PaymentMethod, Reducer, Restaurant,
    User, UserAction, UserState,
};
use proptest::prelude::*;

// ── Fixtures ────────────────────────────────────────────────────────────

fn restaurant(idx: u8) -> Restaurant {
    Restaurant {
        id: format!("r{idx}"),
        name: format!("Restaurant {idx}"),
        cuisine: "Fusion".into(),
        rating: 4.0,
        delivery_time: "30 min".into(),
        delivery_fee: Money::from_cents(i64::from(idx) * 100 + 99),
        address: "Somewhere".into(),
        coordinates: Coordinates::new(0.0, 0.0),
        is_open: true,
        tags: Vec::new(),
    }
}

fn menu_item(restaurant_idx: u8, item_idx: u8) -> MenuItem {
    MenuItem {
        id: format!("r{restaurant_idx}-m{item_idx}"),
        restaurant_id: format!("r{restaurant_idx}"),
        name: format!("Dish {item_idx}"),
        description: String::new(),
        price: Money::from_cents(500 + i64::from(item_idx) * 125),
        category: "Mains".into(),
        popular: false,
        customizations: vec![CustomizationGroup {
            id: "size".into(),
            name: "Size".into(),
            required: false,
            options: vec![
                CustomizationOption {
                    id: "s".into(),
                    name: "Small".into(),
                    price_delta: Money::ZERO,
                },
                CustomizationOption {
                    id: "l".into(),
                    name: "Large".into(),
                    price_delta: Money::from_cents(200),
                },
            ],
        }],
    }
}

fn customizations(choice: u8) -> Customizations {
    match choice {
        0 => Customizations::new(),
        1 => Customizations::from([("size".to_string(), "s".to_string())]),
        _ => Customizations::from([("size".to_string(), "l".to_string())]),
    }
}

fn cart_action() -> impl Strategy<Value = CartAction> {
    let add = (0u8..2, 0u8..4, 1u32..4, 0u8..3).prop_map(|(r, m, q, c)| CartAction::AddItem {
        menu_item: menu_item(r, m),
        restaurant: restaurant(r),
        quantity: q,
        customizations: customizations(c),
    });
    let key = (0u8..2, 0u8..4, 0u8..3)
        .prop_map(|(r, m, c)| LineKey::new(&format!("r{r}-m{m}"), &customizations(c)));
    prop_oneof![
        4 => add,
        1 => key.clone().prop_map(CartAction::RemoveItem),
        2 => (key, -2i64..6)
            .prop_map(|(key, quantity)| CartAction::UpdateQuantity { key, quantity }),
        1 => Just(CartAction::Clear),
    ]
}

fn check_cart(state: &CartState) -> Result<(), TestCaseError> {
    let sum: Money = state.items.iter().map(|l| l.line_total).sum();
    prop_assert_eq!(state.subtotal, sum);
    prop_assert_eq!(state.total, state.subtotal + state.delivery_fee);
    let expected_fee = state.restaurant.as_ref().map_or(Money::ZERO, |r| r.delivery_fee);
    prop_assert_eq!(state.delivery_fee, expected_fee);

    let mut keys = HashSet::new();
    for line in &state.items {
        prop_assert!(line.quantity >= 1);
        prop_assert_eq!(line.line_total, line.unit_price() * line.quantity);
        prop_assert!(keys.insert(line.key()), "duplicate line {}", line.key());
        prop_assert!(state.is_from_restaurant(&line.menu_item.restaurant_id));
    }
    if state.items.is_empty() {
        prop_assert!(state.restaurant.is_none());
        prop_assert_eq!(state.item_count(), 0);
    }
    Ok(())
}

proptest! {
    #[test]
    fn cart_invariants_hold_after_every_action(
        actions in prop::collection::vec(cart_action(), 0..60),
    ) {
        let mut state = CartState::default();
        for action in actions {
            state = state.reduce(action);
            check_cart(&state)?;
        }
    }
}

// ── User defaults ───────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum UserOp {
    AddAddress(u8, bool),
    UpdateAddress(u8, bool),
    RemoveAddress(u8),
    SetDefaultAddress(u8),
    AddCard(u8, bool),
    UpdateCard(u8, bool),
    RemoveCard(u8),
    SetDefaultCard(u8),
}

fn user_op() -> impl Strategy<Value = UserOp> {
    prop_oneof![
        (0u8..6, any::<bool>()).prop_map(|(i, d)| UserOp::AddAddress(i, d)),
        (0u8..6, any::<bool>()).prop_map(|(i, d)| UserOp::UpdateAddress(i, d)),
        (0u8..6).prop_map(UserOp::RemoveAddress),
        (0u8..6).prop_map(UserOp::SetDefaultAddress),
        (0u8..6, any::<bool>()).prop_map(|(i, d)| UserOp::AddCard(i, d)),
        (0u8..6, any::<bool>()).prop_map(|(i, d)| UserOp::UpdateCard(i, d)),
        (0u8..6).prop_map(UserOp::RemoveCard),
        (0u8..6).prop_map(UserOp::SetDefaultCard),
    ]
}

fn address(i: u8, is_default: bool) -> Address {
    Address {
        id: format!("a{i}"),
        label: format!("Place {i}"),
        street: "Street".into(),
        city: "City".into(),
        coordinates: None,
        is_default,
    }
}

fn card(i: u8, is_default: bool) -> PaymentMethod {
    PaymentMethod {
        id: format!("p{i}"),
        kind: PaymentKind::Card,
        label: "Card".into(),
        last4: None,
        is_default,
    }
}

fn to_action(op: UserOp) -> UserAction {
    match op {
        UserOp::AddAddress(i, d) => UserAction::AddAddress(address(i, d)),
        UserOp::UpdateAddress(i, d) => UserAction::UpdateAddress(address(i, d)),
        UserOp::RemoveAddress(i) => UserAction::RemoveAddress(format!("a{i}")),
        UserOp::SetDefaultAddress(i) => UserAction::SetDefaultAddress(format!("a{i}")),
        UserOp::AddCard(i, d) => UserAction::AddPaymentMethod(card(i, d)),
        UserOp::UpdateCard(i, d) => UserAction::UpdatePaymentMethod(card(i, d)),
        UserOp::RemoveCard(i) => UserAction::RemovePaymentMethod(format!("p{i}")),
        UserOp::SetDefaultCard(i) => UserAction::SetDefaultPaymentMethod(format!("p{i}")),
    }
}

proptest! {
    #[test]
    fn exactly_one_default_when_non_empty(ops in prop::collection::vec(user_op(), 0..40)) {
        let mut state = UserState::default().reduce(UserAction::SetUser(User {
            id: "u".into(),
            name: "U".into(),
            email: "u@example.com".into(),
            phone: String::new(),
            addresses: Vec::new(),
            payment_methods: Vec::new(),
        }));
        for op in ops {
            state = state.reduce(to_action(op));
            let Some(user) = state.user.as_ref() else {
                return Err(TestCaseError::fail("user vanished"));
            };
            let addr_defaults = user.addresses.iter().filter(|a| a.is_default).count();
            let card_defaults = user.payment_methods.iter().filter(|p| p.is_default).count();
            prop_assert_eq!(addr_defaults, usize::from(!user.addresses.is_empty()));
            prop_assert_eq!(card_defaults, usize::from(!user.payment_methods.is_empty()));
        }
    }
}

// ── Line identity ───────────────────────────────────────────────────────

fn option_text() -> impl Strategy<Value = String> {
    "[ab&=?]{0,4}"
}

proptest! {
    #[test]
    fn line_keys_equal_iff_customizations_equal(
        left in prop::collection::btree_map(option_text(), option_text(), 0..3),
        right in prop::collection::btree_map(option_text(), option_text(), 0..3),
    ) {
        let same_key = LineKey::new("m", &left) == LineKey::new("m", &right);
        prop_assert_eq!(same_key, left == right);
    }
}
