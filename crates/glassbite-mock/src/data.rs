#![forbid(unsafe_code)]

//! In-memory catalog behind the [`DataProvider`] queries.
//!
//! Misses are never errors: lookups return `None` and searches return an
//! empty `Vec`. Only loading a malformed fixture fails.

use std::collections::HashSet;

use glassbite_state::{Coordinates, MenuItem, Order, Restaurant, User};
use serde::Deserialize;

use crate::error::FixtureError;
use crate::location::haversine_km;

const EMBEDDED_CATALOG: &str = include_str!("../fixtures/catalog.json");

/// Read-only catalog queries used by screens and stores.
pub trait DataProvider {
    fn restaurants(&self) -> Vec<Restaurant>;
    fn restaurant_by_id(&self, id: &str) -> Option<Restaurant>;
    /// Case-insensitive match on name, cuisine or tag. A blank query matches all.
    fn search_restaurants(&self, query: &str) -> Vec<Restaurant>;
    fn menu_items_by_restaurant(&self, restaurant_id: &str) -> Vec<MenuItem>;
    fn user(&self) -> Option<User>;
    /// Newest first.
    fn orders_for_user(&self, user_id: &str) -> Vec<Order>;
    fn restaurants_by_cuisine(&self, cuisine: &str) -> Vec<Restaurant>;
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Catalog {
    restaurants: Vec<Restaurant>,
    #[serde(default)]
    menu_items: Vec<MenuItem>,
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    orders: Vec<Order>,
}

impl Catalog {
    fn validate(&self) -> Result<(), FixtureError> {
        let mut restaurant_ids = HashSet::new();
        for r in &self.restaurants {
            if !restaurant_ids.insert(r.id.as_str()) {
                return Err(FixtureError::DuplicateId {
                    kind: "restaurant",
                    id: r.id.clone(),
                });
            }
        }
        let mut item_ids = HashSet::new();
        for item in &self.menu_items {
            if !item_ids.insert(item.id.as_str()) {
                return Err(FixtureError::DuplicateId {
                    kind: "menu item",
                    id: item.id.clone(),
                });
            }
            if !restaurant_ids.contains(item.restaurant_id.as_str()) {
                return Err(FixtureError::UnknownRestaurant {
                    item: item.id.clone(),
                    restaurant: item.restaurant_id.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Fixture-backed [`DataProvider`].
#[derive(Debug, Clone)]
pub struct MockDataProvider {
    catalog: Catalog,
}

impl MockDataProvider {
    /// The catalog compiled into the crate.
    pub fn embedded() -> Result<Self, FixtureError> {
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Parse and validate a catalog document.
    pub fn from_json(json: &str) -> Result<Self, FixtureError> {
        let catalog: Catalog = serde_json::from_str(json)?;
        catalog.validate()?;
        tracing::debug!(
            restaurants = catalog.restaurants.len(),
            menu_items = catalog.menu_items.len(),
            orders = catalog.orders.len(),
            "catalog loaded"
        );
        Ok(Self { catalog })
    }

    /// An empty catalog.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            catalog: Catalog::default(),
        }
    }

    /// Restaurants within `radius_km` of `origin`, nearest first, with their
    /// distance.
    #[must_use]
    pub fn restaurants_within(
        &self,
        origin: Coordinates,
        radius_km: f64,
    ) -> Vec<(Restaurant, f64)> {
        let mut hits: Vec<(Restaurant, f64)> = self
            .catalog
            .restaurants
            .iter()
            .map(|r| (r, haversine_km(origin, r.coordinates)))
            .filter(|(_, d)| *d <= radius_km)
            .map(|(r, d)| (r.clone(), d))
            .collect();
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));
        hits
    }

    #[must_use]
    pub fn open_restaurants(&self) -> Vec<Restaurant> {
        self.catalog.restaurants.iter().filter(|r| r.is_open).cloned().collect()
    }

    #[must_use]
    pub fn menu_item(&self, id: &str) -> Option<MenuItem> {
        self.catalog.menu_items.iter().find(|m| m.id == id).cloned()
    }
}

impl DataProvider for MockDataProvider {
    fn restaurants(&self) -> Vec<Restaurant> {
        self.catalog.restaurants.clone()
    }

    fn restaurant_by_id(&self, id: &str) -> Option<Restaurant> {
        self.catalog.restaurants.iter().find(|r| r.id == id).cloned()
    }

    fn search_restaurants(&self, query: &str) -> Vec<Restaurant> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return self.restaurants();
        }
        self.catalog
            .restaurants
            .iter()
            .filter(|r| {
                r.name.to_lowercase().contains(&needle)
                    || r.cuisine.to_lowercase().contains(&needle)
                    || r.tags.iter().any(|t| t.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    fn menu_items_by_restaurant(&self, restaurant_id: &str) -> Vec<MenuItem> {
        self.catalog
            .menu_items
            .iter()
            .filter(|m| m.restaurant_id == restaurant_id)
            .cloned()
            .collect()
    }

    fn user(&self) -> Option<User> {
        self.catalog.user.clone()
    }

    fn orders_for_user(&self, user_id: &str) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .catalog
            .orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    fn restaurants_by_cuisine(&self, cuisine: &str) -> Vec<Restaurant> {
        self.catalog
            .restaurants
            .iter()
            .filter(|r| r.cuisine.eq_ignore_ascii_case(cuisine))
            .cloned()
            .collect()
    }
}
