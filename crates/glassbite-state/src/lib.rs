#![forbid(unsafe_code)]

//! Session state: cart, orders, user profile and app chrome.
//!
//! Each slice is a plain value with a pure [`Reducer::reduce`]. A
//! [`Store`] wraps a slice with dispatch and change notification, and the
//! per-slice helper methods (`add_item`, `add_order`, `reset_app`, ...) live
//! on `Store<Slice>`.

pub mod app;
pub mod cart;
pub mod model;
pub mod order;
pub mod store;
pub mod user;

pub use app::{AppAction, AppState};
pub use cart::{CartAction, CartLine, CartState, Customizations, LineKey};
pub use model::{
    Address, ChatMessage, ChatRole, Coordinates, CustomizationGroup, CustomizationOption, Driver,
    Location, MenuItem, Money, Order, OrderStatus, PaymentKind, PaymentMethod, Restaurant, Theme,
    TrackingSnapshot, User,
};
pub use order::{OrderAction, OrderState};
pub use store::{Reducer, Store, StoreSubscription};
pub use user::{ProfileUpdate, UserAction, UserState};

/// The four session slices, each behind its own store.
#[derive(Clone, Default)]
pub struct Session {
    pub cart: Store<CartState>,
    pub orders: Store<OrderState>,
    pub user: Store<UserState>,
    pub app: Store<AppState>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the cart and drop user, order and app state back to startup
    /// values, e.g. on sign-out.
    pub fn reset(&self) {
        self.cart.clear_cart();
        self.orders.clear_current_order();
        self.orders.load_history(Vec::new());
        self.user.logout();
        self.app.reset_app();
    }
}
