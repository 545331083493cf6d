//! Conversation runtime for the Thunai culture assistant.
//!
//! Every inbound chat message goes through [`runtime::AgentRuntime::handle`]:
//!
//! 1. The sender's lock is taken so their messages are handled in order.
//! 2. An outstanding question, if any, is loaded (and expired when stale).
//! 3. With a question outstanding the message is read as its answer. Otherwise it
//!    is classified (`classifier`) and routed to a flow or a casual reply.
//! 4. Flow transitions come from the `thunai-core` flow engine and are carried out
//!    by `workflow`, which is the only place records are written.
//!
//! The language model is optional. Without it, or while it is unreachable, the
//! keyword classifier and canned replies in `fallback` take over.

pub mod classifier;
pub mod clock;
pub mod confirmation;
pub mod extraction;
pub mod fallback;
pub mod guardrails;
mod ingress;
pub mod llm;
pub mod locks;
pub mod resolver;
pub mod runtime;
pub mod sweeper;
pub mod templates;
mod text;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use classifier::{Classification, Intent, IntentClassifier};
pub use clock::{Clock, FixedClock, SystemClock};
pub use llm::{ChatMessage, ChatRole, LlmClient};
pub use runtime::{AgentPorts, AgentRuntime, AgentSettings};
pub use sweeper::StateSweeper;
