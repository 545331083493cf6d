use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who sent an inbound message and where it arrived.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: UserId,
    pub display_name: Option<String>,
    pub conversation_id: String,
    pub is_group: bool,
    /// Group messages are only answered when the bot was mentioned.
    pub mentions_bot: bool,
    /// Last thing the bot said in this conversation, used to corroborate names.
    pub prior_bot_utterance: Option<String>,
    pub correlation_id: String,
}

impl UserContext {
    pub fn direct(user_id: impl Into<String>, conversation_id: impl Into<String>) -> Self {
        Self {
            user_id: UserId::new(user_id),
            display_name: None,
            conversation_id: conversation_id.into(),
            is_group: false,
            mentions_bot: false,
            prior_bot_utterance: None,
            correlation_id: "unassigned".to_owned(),
        }
    }

    pub fn in_group(mut self, mentions_bot: bool) -> Self {
        self.is_group = true;
        self.mentions_bot = mentions_bot;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_prior_utterance(mut self, utterance: impl Into<String>) -> Self {
        self.prior_bot_utterance = Some(utterance.into());
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn addressed_to_bot(&self) -> bool {
        !self.is_group || self.mentions_bot
    }
}
