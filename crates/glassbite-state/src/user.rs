#![forbid(unsafe_code)]

//! User slice: profile, saved addresses, payment methods.
//!
//! # Invariants
//!
//! Within each of `addresses` and `payment_methods`, exactly one entry has
//! `is_default` set whenever the collection is non-empty. Any transition
//! that sets a default clears every other flag in the same step.
//!
//! # Decision Rules
//!
//! | Transition | Default handling |
//! |------------|------------------|
//! | add to an empty collection | the new entry becomes default |
//! | add/update with `is_default` | all others cleared |
//! | update clearing the current default | first entry promoted |
//! | remove the default | first remaining entry promoted |
//! | set default to unknown id | no-op |
//! | `SetUser` with several defaults | first one kept |
//! | `SetUser` with no default | first entry promoted |
//!
//! Every mutation except `SetUser` is a no-op while no user is set.

use serde::{Deserialize, Serialize};

use crate::model::{Address, PaymentMethod, User};
use crate::store::{Reducer, Store};

/// Entries of a collection with a single default.
trait DefaultFlag {
    fn id(&self) -> &str;
    fn is_default(&self) -> bool;
    fn set_default(&mut self, value: bool);
}

impl DefaultFlag for Address {
    fn id(&self) -> &str {
        &self.id
    }
    fn is_default(&self) -> bool {
        self.is_default
    }
    fn set_default(&mut self, value: bool) {
        self.is_default = value;
    }
}

impl DefaultFlag for PaymentMethod {
    fn id(&self) -> &str {
        &self.id
    }
    fn is_default(&self) -> bool {
        self.is_default
    }
    fn set_default(&mut self, value: bool) {
        self.is_default = value;
    }
}

fn make_default<T: DefaultFlag>(entries: &mut [T], id: &str) -> bool {
    if !entries.iter().any(|e| e.id() == id) {
        return false;
    }
    for entry in entries.iter_mut() {
        let selected = entry.id() == id;
        entry.set_default(selected);
    }
    true
}

fn add_entry<T: DefaultFlag>(entries: &mut Vec<T>, mut entry: T) {
    if entries.iter().any(|e| e.id() == entry.id()) {
        tracing::warn!(id = entry.id(), "duplicate id, entry not added");
        return;
    }
    if entries.is_empty() {
        entry.set_default(true);
    }
    let id = entry.id().to_owned();
    let wants_default = entry.is_default();
    entries.push(entry);
    if wants_default {
        make_default(entries, &id);
    }
}

fn update_entry<T: DefaultFlag>(entries: &mut [T], entry: T) {
    let id = entry.id().to_owned();
    let wants_default = entry.is_default();
    match entries.iter_mut().find(|e| e.id() == id) {
        Some(slot) => *slot = entry,
        None => {
            tracing::warn!(%id, "update for unknown entry ignored");
            return;
        }
    }
    if wants_default {
        make_default(entries, &id);
    } else {
        promote_first_if_none(entries);
    }
}

fn remove_entry<T: DefaultFlag>(entries: &mut Vec<T>, id: &str) {
    let Some(pos) = entries.iter().position(|e| e.id() == id) else {
        return;
    };
    entries.remove(pos);
    promote_first_if_none(entries);
}

fn promote_first_if_none<T: DefaultFlag>(entries: &mut [T]) {
    if entries.iter().any(|e| e.is_default()) {
        return;
    }
    if let Some(first) = entries.first_mut() {
        first.set_default(true);
    }
}

fn normalize<T: DefaultFlag>(entries: &mut [T]) {
    let mut seen = false;
    for entry in entries.iter_mut() {
        if entry.is_default() {
            if seen {
                entry.set_default(false);
            }
            seen = true;
        }
    }
    promote_first_if_none(entries);
}

/// Partial profile edit; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserState {
    pub user: Option<User>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    SetUser(User),
    UpdateProfile(ProfileUpdate),
    AddAddress(Address),
    UpdateAddress(Address),
    RemoveAddress(String),
    SetDefaultAddress(String),
    AddPaymentMethod(PaymentMethod),
    UpdatePaymentMethod(PaymentMethod),
    RemovePaymentMethod(String),
    SetDefaultPaymentMethod(String),
    Logout,
}

impl Reducer for UserState {
    type Action = UserAction;

    fn reduce(mut self, action: UserAction) -> Self {
        let action = match action {
            UserAction::SetUser(mut user) => {
                normalize(&mut user.addresses);
                normalize(&mut user.payment_methods);
                self.user = Some(user);
                return self;
            }
            UserAction::Logout => {
                self.user = None;
                return self;
            }
            other => other,
        };
        let Some(mut user) = self.user.take() else {
            tracing::warn!(action = ?action, "user mutation without a user ignored");
            return self;
        };

        match action {
            UserAction::UpdateProfile(update) => {
                if let Some(name) = update.name {
                    user.name = name;
                }
                if let Some(email) = update.email {
                    user.email = email;
                }
                if let Some(phone) = update.phone {
                    user.phone = phone;
                }
            }
            UserAction::AddAddress(address) => add_entry(&mut user.addresses, address),
            UserAction::UpdateAddress(address) => update_entry(&mut user.addresses, address),
            UserAction::RemoveAddress(id) => remove_entry(&mut user.addresses, &id),
            UserAction::SetDefaultAddress(id) => {
                if !make_default(&mut user.addresses, &id) {
                    tracing::warn!(%id, "default address not found");
                }
            }
            UserAction::AddPaymentMethod(method) => add_entry(&mut user.payment_methods, method),
            UserAction::UpdatePaymentMethod(method) => {
                update_entry(&mut user.payment_methods, method);
            }
            UserAction::RemovePaymentMethod(id) => remove_entry(&mut user.payment_methods, &id),
            UserAction::SetDefaultPaymentMethod(id) => {
                if !make_default(&mut user.payment_methods, &id) {
                    tracing::warn!(%id, "default payment method not found");
                }
            }
            UserAction::SetUser(_) | UserAction::Logout => {}
        }
        self.user = Some(user);
        self
    }
}

impl UserState {
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn default_address(&self) -> Option<&Address> {
        self.user.as_ref()?.addresses.iter().find(|a| a.is_default)
    }

    #[must_use]
    pub fn default_payment_method(&self) -> Option<&PaymentMethod> {
        self.user.as_ref()?.payment_methods.iter().find(|p| p.is_default)
    }

    #[must_use]
    pub fn address(&self, id: &str) -> Option<&Address> {
        self.user.as_ref()?.addresses.iter().find(|a| a.id == id)
    }
}

impl Store<UserState> {
    pub fn set_user(&self, user: User) {
        self.dispatch(UserAction::SetUser(user));
    }

    pub fn update_profile(&self, update: ProfileUpdate) {
        self.dispatch(UserAction::UpdateProfile(update));
    }

    pub fn add_address(&self, address: Address) {
        self.dispatch(UserAction::AddAddress(address));
    }

    pub fn update_address(&self, address: Address) {
        self.dispatch(UserAction::UpdateAddress(address));
    }

    pub fn remove_address(&self, id: impl Into<String>) {
        self.dispatch(UserAction::RemoveAddress(id.into()));
    }

    pub fn set_default_address(&self, id: impl Into<String>) {
        self.dispatch(UserAction::SetDefaultAddress(id.into()));
    }

    pub fn add_payment_method(&self, method: PaymentMethod) {
        self.dispatch(UserAction::AddPaymentMethod(method));
    }

    pub fn update_payment_method(&self, method: PaymentMethod) {
        self.dispatch(UserAction::UpdatePaymentMethod(method));
    }

    pub fn remove_payment_method(&self, id: impl Into<String>) {
        self.dispatch(UserAction::RemovePaymentMethod(id.into()));
    }

    pub fn set_default_payment_method(&self, id: impl Into<String>) {
        self.dispatch(UserAction::SetDefaultPaymentMethod(id.into()));
    }

    pub fn logout(&self) {
        self.dispatch(UserAction::Logout);
    }

    #[must_use]
    pub fn default_address(&self) -> Option<Address> {
        self.state().default_address().cloned()
    }

    #[must_use]
    pub fn default_payment_method(&self) -> Option<PaymentMethod> {
        self.state().default_payment_method().cloned()
    }
}
