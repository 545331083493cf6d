use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundKind {
    Reply,
    Question,
    Confirmation,
    Notice,
    Apology,
}

/// Transport-agnostic reply produced by the conversation runtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,
    pub kind: OutboundKind,
}

impl OutboundMessage {
    pub fn reply(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: OutboundKind::Reply }
    }

    pub fn question(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: OutboundKind::Question }
    }

    pub fn confirmation(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: OutboundKind::Confirmation }
    }

    pub fn notice(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: OutboundKind::Notice }
    }

    pub fn apology(text: impl Into<String>) -> Self {
        Self { text: text.into(), kind: OutboundKind::Apology }
    }

    pub fn expects_reply(&self) -> bool {
        matches!(self.kind, OutboundKind::Question | OutboundKind::Confirmation)
    }
}
