#![forbid(unsafe_code)]

//! Keyword-matched canned chat replies.
//!
//! [`CannedResponder`] picks the first rule whose keyword appears in the
//! message (case-insensitive) and falls back to a generic answer. A
//! configurable delay stands in for network latency, and a
//! [`FailurePolicy`] simulates dropped requests.

use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use glassbite_state::{AppState, ChatMessage, ChatRole, Store};

use crate::error::ChatError;

/// Text generator consumed by the chat screen.
pub trait ChatResponder {
    fn send_message(&self, text: &str, history: &[ChatMessage]) -> Result<String, ChatError>;
}

/// When the responder should simulate a network failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    #[default]
    Never,
    Always,
    /// Every `n`th call fails (1-based); `EveryNth(0)` never fails.
    EveryNth(u64),
}

#[derive(Debug, Clone)]
pub struct ResponderConfig {
    pub latency: Duration,
    pub failure: FailurePolicy,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(800),
            failure: FailurePolicy::Never,
        }
    }
}

impl ResponderConfig {
    /// No delay, no failures.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            latency: Duration::ZERO,
            failure: FailurePolicy::Never,
        }
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    #[must_use]
    pub fn with_failure(mut self, failure: FailurePolicy) -> Self {
        self.failure = failure;
        self
    }
}

#[derive(Debug, Clone)]
struct Rule {
    keywords: Vec<String>,
    reply: String,
}

const GREETING: &str =
    "Hi! I'm your food assistant. Ask me for recommendations, deals, or where your order is.";
const FALLBACK: &str =
    "I'm not sure about that one. Ask me about cuisines, healthy options, or your order.";

const DEFAULT_RULES: &[(&[&str], &str)] = &[
    (
        &["where is my order", "track", "status", "eta"],
        "Your order is on its way. Open the tracking screen for the driver's live position.",
    ),
    (
        &["vegan", "vegetarian", "healthy", "salad"],
        "Green Fork has excellent bowls and salads, and delivery is free today.",
    ),
    (
        &["pizza", "italian"],
        "Slice Society's Margherita is a crowd favourite. Go for the 16 inch if you're sharing.",
    ),
    (
        &["spicy", "thai", "curry", "noodle"],
        "Try the Pad Thai at Bangkok Bowl. Ask for Thai hot if you're brave.",
    ),
    (
        &["sushi", "ramen", "japanese"],
        "Sakura House does a great Tonkotsu Ramen and fresh salmon rolls.",
    ),
    (
        &["deal", "discount", "promo", "cheap"],
        "Green Fork has free delivery right now, and Taqueria Sol's fee is just $1.49.",
    ),
    (
        &["recommend", "suggest", "hungry", "what should i"],
        "Popular right now: Pad Thai, Harvest Bowl, and the Brisket Plate. Want details on any?",
    ),
    (&["hello", "hi", "hey"], GREETING),
    (&["thank"], "Happy to help. Enjoy your meal!"),
];

/// Canned-reply [`ChatResponder`].
#[derive(Debug)]
pub struct CannedResponder {
    config: ResponderConfig,
    rules: Vec<Rule>,
    calls: AtomicU64,
}

impl Default for CannedResponder {
    fn default() -> Self {
        Self::new(ResponderConfig::default())
    }
}

impl CannedResponder {
    #[must_use]
    pub fn new(config: ResponderConfig) -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(keywords, reply)| Rule {
                keywords: keywords.iter().map(|k| (*k).to_owned()).collect(),
                reply: (*reply).to_owned(),
            })
            .collect();
        Self {
            config,
            rules,
            calls: AtomicU64::new(0),
        }
    }

    /// Add a rule checked before the built-in ones.
    #[must_use]
    pub fn with_rule<I, S>(mut self, keywords: I, reply: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let rule = Rule {
            keywords: keywords.into_iter().map(|k| k.into().to_lowercase()).collect(),
            reply: reply.into(),
        };
        self.rules.insert(0, rule);
        self
    }

    #[must_use]
    pub fn config(&self) -> &ResponderConfig {
        &self.config
    }

    /// Reply for `text` without latency or failure simulation.
    #[must_use]
    pub fn reply_for(&self, text: &str) -> &str {
        let lowered = text.to_lowercase();
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        self.rules
            .iter()
            .find(|rule| rule.keywords.iter().any(|k| keyword_matches(k, &lowered, &words)))
            .map_or(FALLBACK, |rule| rule.reply.as_str())
    }

    fn should_fail(&self, call: u64) -> bool {
        match self.config.failure {
            FailurePolicy::Never => false,
            FailurePolicy::Always => true,
            FailurePolicy::EveryNth(n) => n != 0 && call % n == 0,
        }
    }
}

/// Multi-word keywords match as substrings; single words must match a
/// whole word so "hi" does not fire on "chicken".
fn keyword_matches(keyword: &str, lowered: &str, words: &[&str]) -> bool {
    if keyword.contains(' ') {
        lowered.contains(keyword)
    } else {
        words.iter().any(|w| *w == keyword || w.strip_suffix('s') == Some(keyword))
    }
}

impl ChatResponder for CannedResponder {
    fn send_message(&self, text: &str, history: &[ChatMessage]) -> Result<String, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if !self.config.latency.is_zero() {
            thread::sleep(self.config.latency);
        }
        if self.should_fail(call) {
            tracing::warn!(call, "simulated chat network failure");
            return Err(ChatError::Network("request timed out".into()));
        }

        let reply = self.reply_for(text);
        let first_contact = !history.iter().any(|m| m.role == ChatRole::Assistant);
        tracing::debug!(call, history = history.len(), "canned reply chosen");
        if first_contact && reply != GREETING && reply != FALLBACK {
            Ok(format!("Hi there! {reply}"))
        } else {
            Ok(reply.to_owned())
        }
    }
}

/// One chat round trip recorded in the app transcript.
///
/// The user's message is appended first. On success the reply follows; on
/// failure only the user's message remains and the error is returned. The
/// loading flag is set for the duration of the call.
pub fn converse(
    responder: &dyn ChatResponder,
    app: &Store<AppState>,
    text: &str,
    now_ms: u64,
) -> Result<String, ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    let history = app.state().chat_transcript.clone();
    app.append_chat_message(ChatMessage {
        id: format!("msg-{}", history.len()),
        role: ChatRole::User,
        text: text.to_owned(),
        sent_at: now_ms,
    });

    app.set_loading(true);
    let result = responder.send_message(text, &history);
    app.set_loading(false);

    let reply = result?;
    app.append_chat_message(ChatMessage {
        id: format!("msg-{}", history.len() + 1),
        role: ChatRole::Assistant,
        text: reply.clone(),
        sent_at: now_ms,
    });
    Ok(reply)
}
