#![forbid(unsafe_code)]

//! App-wide chrome: signed-in user, location, theme, loading flag, chat.

use serde::{Deserialize, Serialize};

use crate::model::{ChatMessage, Location, Theme, User};
use crate::store::{Reducer, Store};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    pub user: Option<User>,
    pub current_location: Option<Location>,
    pub theme: Theme,
    pub is_loading: bool,
    #[serde(default)]
    pub chat_transcript: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    SetUser(Option<User>),
    /// Overwrites whatever was there; no merging with a previous fix.
    SetLocation(Option<Location>),
    SetTheme(Theme),
    ToggleTheme,
    SetLoading(bool),
    AppendChatMessage(ChatMessage),
    ClearChat,
    /// Restore every field to its startup value.
    Reset,
}

impl Reducer for AppState {
    type Action = AppAction;

    fn reduce(mut self, action: AppAction) -> Self {
        match action {
            AppAction::SetUser(user) => self.user = user,
            AppAction::SetLocation(location) => self.current_location = location,
            AppAction::SetTheme(theme) => self.theme = theme,
            AppAction::ToggleTheme => self.theme = self.theme.toggled(),
            AppAction::SetLoading(loading) => self.is_loading = loading,
            AppAction::AppendChatMessage(message) => self.chat_transcript.push(message),
            AppAction::ClearChat => self.chat_transcript.clear(),
            AppAction::Reset => return Self::default(),
        }
        self
    }
}

impl AppState {
    #[must_use]
    pub fn is_dark(&self) -> bool {
        self.theme == Theme::Dark
    }

    #[must_use]
    pub fn has_location(&self) -> bool {
        self.current_location.is_some()
    }
}

impl Store<AppState> {
    pub fn set_user(&self, user: Option<User>) {
        self.dispatch(AppAction::SetUser(user));
    }

    pub fn set_location(&self, location: Option<Location>) {
        self.dispatch(AppAction::SetLocation(location));
    }

    pub fn set_theme(&self, theme: Theme) {
        self.dispatch(AppAction::SetTheme(theme));
    }

    pub fn toggle_theme(&self) {
        self.dispatch(AppAction::ToggleTheme);
    }

    pub fn set_loading(&self, loading: bool) {
        self.dispatch(AppAction::SetLoading(loading));
    }

    pub fn append_chat_message(&self, message: ChatMessage) {
        self.dispatch(AppAction::AppendChatMessage(message));
    }

    pub fn clear_chat(&self) {
        self.dispatch(AppAction::ClearChat);
    }

    pub fn reset_app(&self) {
        tracing::debug!("app state reset");
        self.dispatch(AppAction::Reset);
    }
}
