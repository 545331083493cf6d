use serde::Serialize;
use thunai_core::{OutboundKind, OutboundMessage};

pub const CONFIRM_YES_ACTION: &str = "thunai.confirm.yes.v1";
pub const CONFIRM_NO_ACTION: &str = "thunai.confirm.no.v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextObject {
    Plain { text: String },
    Mrkdwn { text: String },
}

impl TextObject {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain { text: text.into() }
    }

    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self::Mrkdwn { text: text.into() }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Plain { text } | Self::Mrkdwn { text } => text,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ButtonElement {
    pub action_id: String,
    pub text: TextObject,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ButtonStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl ButtonElement {
    pub fn new(action_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            action_id: action_id.into(),
            text: TextObject::plain(label),
            style: None,
            value: None,
        }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = Some(style);
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { block_id: String, text: TextObject },
    Actions { block_id: String, elements: Vec<ButtonElement> },
    Context { block_id: String, elements: Vec<TextObject> },
}

/// A rendered chat message: plain fallback text plus rich blocks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub blocks: Vec<Block>,
}

pub struct MessageBuilder {
    fallback_text: String,
    blocks: Vec<Block>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self { fallback_text: fallback_text.into(), blocks: Vec::new() }
    }

    pub fn section(mut self, block_id: impl Into<String>, text: TextObject) -> Self {
        self.blocks.push(Block::Section { block_id: block_id.into(), text });
        self
    }

    pub fn actions<F>(mut self, block_id: impl Into<String>, build: F) -> Self
    where
        F: FnOnce(&mut Vec<ButtonElement>),
    {
        let mut elements = Vec::new();
        build(&mut elements);
        self.blocks.push(Block::Actions { block_id: block_id.into(), elements });
        self
    }

    pub fn context(mut self, block_id: impl Into<String>, note: impl Into<String>) -> Self {
        self.blocks.push(Block::Context {
            block_id: block_id.into(),
            elements: vec![TextObject::plain(note)],
        });
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate { fallback_text: self.fallback_text, blocks: self.blocks }
    }
}

/// Renders a runtime reply. Confirmations get Yes/No buttons that answer the
/// numbered options in the text; apologies get a muted follow-up note.
pub fn render_outbound(message: &OutboundMessage) -> MessageTemplate {
    let block_id = format!("thunai.{}.v1", kind_slug(message.kind));
    let builder = MessageBuilder::new(message.text.clone())
        .section(block_id, TextObject::mrkdwn(&message.text));

    match message.kind {
        OutboundKind::Confirmation => builder
            .actions("thunai.confirm.actions.v1", |buttons| {
                buttons.push(
                    ButtonElement::new(CONFIRM_YES_ACTION, "Yes")
                        .style(ButtonStyle::Primary)
                        .value("1"),
                );
                buttons.push(ButtonElement::new(CONFIRM_NO_ACTION, "No").value("2"));
            })
            .build(),
        OutboundKind::Apology => builder
            .context("thunai.apology.context.v1", "Nothing was saved. You can try again anytime.")
            .build(),
        OutboundKind::Reply | OutboundKind::Question | OutboundKind::Notice => builder.build(),
    }
}

fn kind_slug(kind: OutboundKind) -> &'static str {
    match kind {
        OutboundKind::Reply => "reply",
        OutboundKind::Question => "question",
        OutboundKind::Confirmation => "confirmation",
        OutboundKind::Notice => "notice",
        OutboundKind::Apology => "apology",
    }
}
