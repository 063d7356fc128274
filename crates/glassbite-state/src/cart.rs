#![forbid(unsafe_code)]

//! Cart slice.
//!
//! # Invariants
//!
//! After every transition:
//!
//! 1. `subtotal == Σ line_total` and `total == subtotal + delivery_fee`,
//!    recomputed from scratch.
//! 2. `delivery_fee` is the restaurant's fee, or zero without a restaurant.
//! 3. All lines come from one restaurant. Adding from another restaurant
//!    replaces the whole cart with the new line.
//! 4. Every line has `quantity >= 1`; the cart holds no restaurant once its
//!    last line is gone.
//!
//! # Decision Rules
//!
//! Two lines merge iff their [`LineKey`]s are equal, that is the menu item
//! id and the full customization map match.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{MenuItem, Money, Restaurant};
use crate::store::{Reducer, Store};

/// Selected option per customization group: group id → option id.
pub type Customizations = BTreeMap<String, String>;

/// Identity of a cart line: the menu item id plus the exact customization
/// map. Compared structurally, so option ids may contain any characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineKey {
    menu_item_id: String,
    customizations: Customizations,
}

impl LineKey {
    #[must_use]
    pub fn new(menu_item_id: &str, customizations: &Customizations) -> Self {
        Self {
            menu_item_id: menu_item_id.to_owned(),
            customizations: customizations.clone(),
        }
    }

    /// Key of an uncustomized line.
    #[must_use]
    pub fn plain(menu_item_id: &str) -> Self {
        Self::new(menu_item_id, &Customizations::new())
    }

    #[must_use]
    pub fn menu_item_id(&self) -> &str {
        &self.menu_item_id
    }

    #[must_use]
    pub fn customizations(&self) -> &Customizations {
        &self.customizations
    }

    fn matches(&self, line: &CartLine) -> bool {
        line.menu_item.id == self.menu_item_id && line.customizations == self.customizations
    }
}

/// Renders `id` or `id{group: option, ...}`; for logs only.
impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.menu_item_id)?;
        if !self.customizations.is_empty() {
            write!(f, "{:?}", self.customizations)?;
        }
        Ok(())
    }
}

/// One distinct item + customization combination in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub menu_item: MenuItem,
    pub quantity: u32,
    #[serde(default)]
    pub customizations: Customizations,
    pub line_total: Money,
}

impl CartLine {
    #[must_use]
    pub fn new(menu_item: MenuItem, quantity: u32, customizations: Customizations) -> Self {
        let mut line = Self {
            menu_item,
            quantity,
            customizations,
            line_total: Money::ZERO,
        };
        line.line_total = line.unit_price() * quantity;
        line
    }

    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey::new(&self.menu_item.id, &self.customizations)
    }

    /// Item price plus the deltas of the selected options.
    #[must_use]
    pub fn unit_price(&self) -> Money {
        let deltas: Money = self
            .customizations
            .iter()
            .map(|(group, option)| self.menu_item.option_delta(group, option))
            .sum();
        self.menu_item.price + deltas
    }

    fn set_quantity(&mut self, quantity: u32) {
        self.quantity = quantity;
        self.line_total = self.unit_price() * quantity;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartState {
    pub items: Vec<CartLine>,
    pub restaurant: Option<Restaurant>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartAction {
    AddItem {
        menu_item: MenuItem,
        restaurant: Restaurant,
        quantity: u32,
        customizations: Customizations,
    },
    RemoveItem(LineKey),
    /// Quantities `<= 0` remove the line.
    UpdateQuantity { key: LineKey, quantity: i64 },
    Clear,
    /// Switching to a different restaurant empties the cart.
    SetRestaurant(Option<Restaurant>),
}

impl Reducer for CartState {
    type Action = CartAction;

    fn reduce(mut self, action: CartAction) -> Self {
        match action {
            CartAction::AddItem {
                menu_item,
                restaurant,
                quantity,
                customizations,
            } => {
                if quantity == 0 {
                    tracing::warn!(item = %menu_item.id, "ignoring add of zero quantity");
                    return self;
                }
                let switching = self
                    .restaurant
                    .as_ref()
                    .is_some_and(|current| current.id != restaurant.id);
                if switching {
                    tracing::debug!(
                        to = %restaurant.id,
                        dropped = self.items.len(),
                        "cart replaced by another restaurant"
                    );
                    self.items.clear();
                }

                let line = CartLine::new(menu_item, quantity, customizations);
                let key = line.key();
                match self.items.iter_mut().find(|l| key.matches(l)) {
                    Some(existing) => {
                        existing.set_quantity(existing.quantity.saturating_add(quantity));
                    }
                    None => self.items.push(line),
                }
                self.restaurant = Some(restaurant);
            }
            CartAction::RemoveItem(key) => {
                self.items.retain(|l| !key.matches(l));
            }
            CartAction::UpdateQuantity { key, quantity } => {
                if quantity <= 0 {
                    self.items.retain(|l| !key.matches(l));
                } else if let Some(line) = self.items.iter_mut().find(|l| key.matches(l)) {
                    line.set_quantity(u32::try_from(quantity).unwrap_or(u32::MAX));
                }
            }
            CartAction::Clear => {
                self.items.clear();
            }
            CartAction::SetRestaurant(restaurant) => {
                let same = match (&self.restaurant, &restaurant) {
                    (Some(a), Some(b)) => a.id == b.id,
                    _ => false,
                };
                if !same {
                    self.items.clear();
                }
                self.restaurant = restaurant;
                // An explicit restaurant choice survives an empty cart.
                return self.recompute_keeping_restaurant();
            }
        }
        self.recompute()
    }
}

impl CartState {
    fn recompute(mut self) -> Self {
        if self.items.is_empty() {
            self.restaurant = None;
        }
        self.recompute_keeping_restaurant()
    }

    fn recompute_keeping_restaurant(mut self) -> Self {
        self.subtotal = self.items.iter().map(|l| l.line_total).sum();
        self.delivery_fee = self.restaurant.as_ref().map_or(Money::ZERO, |r| r.delivery_fee);
        self.total = self.subtotal + self.delivery_fee;
        self
    }

    /// Total number of units across all lines. Widened so lines at
    /// `u32::MAX` cannot overflow the sum.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|l| u64::from(l.quantity)).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn line(&self, key: &LineKey) -> Option<&CartLine> {
        self.items.iter().find(|l| key.matches(l))
    }

    /// Units of `menu_item_id` across every customization variant.
    #[must_use]
    pub fn quantity_of(&self, menu_item_id: &str) -> u64 {
        self.items
            .iter()
            .filter(|l| l.menu_item.id == menu_item_id)
            .map(|l| u64::from(l.quantity))
            .sum()
    }

    #[must_use]
    pub fn is_from_restaurant(&self, restaurant_id: &str) -> bool {
        self.restaurant.as_ref().is_some_and(|r| r.id == restaurant_id)
    }
}

impl Store<CartState> {
    pub fn add_item(
        &self,
        menu_item: MenuItem,
        restaurant: Restaurant,
        quantity: u32,
        customizations: Customizations,
    ) {
        self.dispatch(CartAction::AddItem {
            menu_item,
            restaurant,
            quantity,
            customizations,
        });
    }

    pub fn remove_item(&self, key: LineKey) {
        self.dispatch(CartAction::RemoveItem(key));
    }

    pub fn update_quantity(&self, key: LineKey, quantity: i64) {
        self.dispatch(CartAction::UpdateQuantity { key, quantity });
    }

    pub fn clear_cart(&self) {
        self.dispatch(CartAction::Clear);
    }

    pub fn set_restaurant(&self, restaurant: Option<Restaurant>) {
        self.dispatch(CartAction::SetRestaurant(restaurant));
    }

    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.state().item_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Coordinates, CustomizationGroup, CustomizationOption};

    fn restaurant(id: &str, fee_cents: i64) -> Restaurant {
        Restaurant {
            id: id.into(),
            name: format!("Restaurant {id}"),
            cuisine: "Thai".into(),
            rating: 4.5,
            delivery_time: "20-30 min".into(),
            delivery_fee: Money::from_cents(fee_cents),
            address: "1 Main St".into(),
            coordinates: Coordinates::new(37.77, -122.42),
            is_open: true,
            tags: Vec::new(),
        }
    }

    fn item(id: &str, restaurant_id: &str, cents: i64) -> MenuItem {
        MenuItem {
            id: id.into(),
            restaurant_id: restaurant_id.into(),
            name: id.to_uppercase(),
            description: String::new(),
            price: Money::from_cents(cents),
            category: "Mains".into(),
            popular: false,
            customizations: vec![CustomizationGroup {
                id: "size".into(),
                name: "Size".into(),
                required: false,
                options: vec![
                    CustomizationOption {
                        id: "regular".into(),
                        name: "Regular".into(),
                        price_delta: Money::ZERO,
                    },
                    CustomizationOption {
                        id: "large".into(),
                        name: "Large".into(),
                        price_delta: Money::from_cents(250),
                    },
                ],
            }],
        }
    }

    fn plain() -> Customizations {
        Customizations::new()
    }

    fn size(option: &str) -> Customizations {
        Customizations::from([("size".to_string(), option.to_string())])
    }

    fn add(
        state: CartState,
        item: MenuItem,
        r: Restaurant,
        qty: u32,
        c: Customizations,
    ) -> CartState {
        state.reduce(CartAction::AddItem {
            menu_item: item,
            restaurant: r,
            quantity: qty,
            customizations: c,
        })
    }

    #[test]
    fn line_key_is_order_independent() {
        let mut a = Customizations::new();
        a.insert("size".into(), "large".into());
        a.insert("spice".into(), "hot".into());
        let mut b = Customizations::new();
        b.insert("spice".into(), "hot".into());
        b.insert("size".into(), "large".into());
        assert_eq!(LineKey::new("m1", &a), LineKey::new("m1", &b));
        assert_eq!(LineKey::new("m1", &Customizations::new()), LineKey::plain("m1"));
    }

    #[test]
    fn separator_characters_do_not_collide_keys() {
        let packed = Customizations::from([("a".to_string(), "b&c=d".to_string())]);
        let split = Customizations::from([
            ("a".to_string(), "b".to_string()),
            ("c".to_string(), "d".to_string()),
        ]);
        assert_ne!(LineKey::new("m1", &packed), LineKey::new("m1", &split));

        let r = restaurant("r1", 0);
        let s = add(CartState::default(), item("m1", "r1", 1000), r.clone(), 1, packed.clone());
        let s = add(s, item("m1", "r1", 1000), r, 1, split);
        assert_eq!(s.items.len(), 2);
        assert_eq!(s.line(&LineKey::new("m1", &packed)).map(|l| l.quantity), Some(1));
    }

    #[test]
    fn item_count_survives_saturated_lines() {
        let r = restaurant("r1", 0);
        let s = add(CartState::default(), item("m1", "r1", 1), r.clone(), 1, Customizations::new());
        let s = s.reduce(CartAction::UpdateQuantity {
            key: LineKey::plain("m1"),
            quantity: i64::MAX,
        });
        let s = add(s, item("m2", "r1", 1), r, 2, Customizations::new());

        assert_eq!(s.items[0].quantity, u32::MAX);
        assert_eq!(s.item_count(), u64::from(u32::MAX) + 2);
        assert_eq!(s.quantity_of("m1"), u64::from(u32::MAX));
    }

    #[test]
    fn same_line_merges_quantities() {
        let r = restaurant("r1", 299);
        let s = add(CartState::default(), item("m1", "r1", 1000), r.clone(), 1, plain());
        let s = add(s, item("m1", "r1", 1000), r, 2, plain());

        assert_eq!(s.items.len(), 1);
        assert_eq!(s.items[0].quantity, 3);
        assert_eq!(s.subtotal, Money::from_cents(3000));
        assert_eq!(s.total, Money::from_cents(3299));
    }

    #[test]
    fn customizations_split_lines_and_price() {
        let r = restaurant("r1", 0);
        let s = add(CartState::default(), item("m1", "r1", 1000), r.clone(), 1, size("regular"));
        let s = add(s, item("m1", "r1", 1000), r, 1, size("large"));

        assert_eq!(s.items.len(), 2);
        assert_eq!(s.items[1].unit_price(), Money::from_cents(1250));
        assert_eq!(s.subtotal, Money::from_cents(2250));
        assert_eq!(s.quantity_of("m1"), 2);
    }

    #[test]
    fn other_restaurant_replaces_cart() {
        let a = restaurant("a", 199);
        let b = restaurant("b", 399);
        let s = add(CartState::default(), item("x", "a", 500), a.clone(), 2, Customizations::new());
        let s = add(s, item("y", "a", 700), a, 1, Customizations::new());
        let s = add(s, item("z", "b", 900), b, 1, Customizations::new());

        assert_eq!(s.items.len(), 1);
        assert_eq!(s.items[0].menu_item.id, "z");
        assert!(s.is_from_restaurant("b"));
        assert_eq!(s.delivery_fee, Money::from_cents(399));
        assert_eq!(s.total, Money::from_cents(1299));
    }

    #[test]
    fn non_positive_quantity_removes_line() {
        let r = restaurant("r1", 299);
        for q in [0, -1] {
            let s = add(CartState::default(), item("m1", "r1", 1000), r.clone(), 2, plain());
            let s = s.reduce(CartAction::UpdateQuantity {
                key: LineKey::plain("m1"),
                quantity: q,
            });
            assert!(s.is_empty());
            assert_eq!(s.item_count(), 0);
            assert_eq!(s.restaurant, None);
            assert_eq!(s.total, Money::ZERO);
        }
    }

    #[test]
    fn update_quantity_recomputes_totals() {
        let r = restaurant("r1", 100);
        let s = add(CartState::default(), item("m1", "r1", 450), r, 1, Customizations::new());
        let s = s.reduce(CartAction::UpdateQuantity {
            key: LineKey::plain("m1"),
            quantity: 4,
        });
        assert_eq!(s.items[0].line_total, Money::from_cents(1800));
        assert_eq!(s.total, Money::from_cents(1900));
    }

    #[test]
    fn unknown_key_is_noop() {
        let r = restaurant("r1", 100);
        let s = add(CartState::default(), item("m1", "r1", 450), r, 1, Customizations::new());
        let before = s.clone();
        let s = s.reduce(CartAction::RemoveItem(LineKey::plain("nope")));
        let s = s.reduce(CartAction::UpdateQuantity {
            key: LineKey::plain("nope"),
            quantity: 3,
        });
        assert_eq!(s, before);
    }

    #[test]
    fn zero_quantity_add_is_ignored() {
        let r = restaurant("r1", 100);
        let s = add(CartState::default(), item("m1", "r1", 450), r, 0, plain());
        assert_eq!(s, CartState::default());
    }

    #[test]
    fn set_restaurant_keeps_choice_on_empty_cart() {
        let s = CartState::default().reduce(CartAction::SetRestaurant(Some(restaurant("r1", 250))));
        assert!(s.is_empty());
        assert!(s.is_from_restaurant("r1"));
        assert_eq!(s.total, Money::from_cents(250));

        let s = s.reduce(CartAction::SetRestaurant(None));
        assert_eq!(s, CartState::default());
    }

    #[test]
    fn store_helpers_dispatch() {
        let store = Store::<CartState>::default();
        store.add_item(item("m1", "r1", 300), restaurant("r1", 0), 2, Customizations::new());
        assert_eq!(store.item_count(), 2);
        store.clear_cart();
        assert_eq!(store.item_count(), 0);
    }
}
