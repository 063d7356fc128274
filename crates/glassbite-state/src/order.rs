#![forbid(unsafe_code)]

//! Order slice: the order in progress, history, and live tracking.
//!
//! # Invariants
//!
//! 1. `AddOrder` sets `current_order` and pushes the same order to the front
//!    of `order_history` in one transition. History ids are unique: adding
//!    an id already in history moves it to the front instead of duplicating.
//! 2. `UpdateOrderStatus` rewrites `current_order` and the matching history
//!    entry together. Unknown ids are a no-op.
//! 3. Status values are accepted as given; forward-only progression is the
//!    caller's job (see [`OrderStatus::next`]).

use serde::{Deserialize, Serialize};

use crate::model::{Order, OrderStatus, TrackingSnapshot};
use crate::store::{Reducer, Store};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderState {
    pub current_order: Option<Order>,
    /// Most recent first.
    pub order_history: Vec<Order>,
    pub tracking_data: Option<TrackingSnapshot>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderAction {
    AddOrder(Order),
    UpdateOrderStatus { order_id: String, status: OrderStatus },
    SetTracking(Option<TrackingSnapshot>),
    ClearCurrentOrder,
    /// Replace history, e.g. from the data provider. Sorted newest first.
    LoadHistory(Vec<Order>),
}

impl Reducer for OrderState {
    type Action = OrderAction;

    fn reduce(mut self, action: OrderAction) -> Self {
        match action {
            OrderAction::AddOrder(order) => {
                self.order_history.retain(|o| o.id != order.id);
                self.order_history.insert(0, order.clone());
                self.current_order = Some(order);
            }
            OrderAction::UpdateOrderStatus { order_id, status } => {
                let mut found = false;
                if let Some(current) = self.current_order.as_mut().filter(|o| o.id == order_id) {
                    current.status = status;
                    found = true;
                }
                if let Some(entry) = self.order_history.iter_mut().find(|o| o.id == order_id) {
                    entry.status = status;
                    found = true;
                }
                if let Some(tracking) = self
                    .tracking_data
                    .as_mut()
                    .filter(|t| t.order_id == order_id)
                {
                    tracking.status = status;
                }
                if !found {
                    tracing::warn!(%order_id, %status, "status update for unknown order ignored");
                }
            }
            OrderAction::SetTracking(snapshot) => {
                self.tracking_data = snapshot;
            }
            OrderAction::ClearCurrentOrder => {
                self.current_order = None;
                self.tracking_data = None;
            }
            OrderAction::LoadHistory(mut orders) => {
                if let Some(current) = &self.current_order {
                    if !orders.iter().any(|o| o.id == current.id) {
                        orders.push(current.clone());
                    }
                }
                orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
                self.order_history = orders;
            }
        }
        self
    }
}

impl OrderState {
    /// Whether an order is in flight.
    #[must_use]
    pub fn has_active_order(&self) -> bool {
        self.current_order.as_ref().is_some_and(|o| !o.status.is_terminal())
    }

    #[must_use]
    pub fn order_by_id(&self, order_id: &str) -> Option<&Order> {
        self.current_order
            .iter()
            .chain(self.order_history.iter())
            .find(|o| o.id == order_id)
    }

    /// History entries that have not been delivered yet.
    pub fn active_orders(&self) -> impl Iterator<Item = &Order> {
        self.order_history.iter().filter(|o| !o.status.is_terminal())
    }

    #[must_use]
    pub fn orders_for_user<'a>(&'a self, user_id: &'a str) -> Vec<&'a Order> {
        self.order_history.iter().filter(|o| o.user_id == user_id).collect()
    }
}

impl Store<OrderState> {
    pub fn add_order(&self, order: Order) {
        self.dispatch(OrderAction::AddOrder(order));
    }

    pub fn update_order_status(&self, order_id: impl Into<String>, status: OrderStatus) {
        self.dispatch(OrderAction::UpdateOrderStatus {
            order_id: order_id.into(),
            status,
        });
    }

    /// Move the current order one step forward. Returns the new status.
    pub fn advance_current_order(&self) -> Option<OrderStatus> {
        let (id, next) = {
            let state = self.state();
            let current = state.current_order.as_ref()?;
            (current.id.clone(), current.status.next()?)
        };
        self.update_order_status(id, next);
        Some(next)
    }

    pub fn set_tracking(&self, snapshot: Option<TrackingSnapshot>) {
        self.dispatch(OrderAction::SetTracking(snapshot));
    }

    pub fn clear_current_order(&self) {
        self.dispatch(OrderAction::ClearCurrentOrder);
    }

    pub fn load_history(&self, orders: Vec<Order>) {
        self.dispatch(OrderAction::LoadHistory(orders));
    }

    #[must_use]
    pub fn has_active_order(&self) -> bool {
        self.state().has_active_order()
    }
}
