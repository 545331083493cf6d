//! Chat transport for Thunai.
//!
//! - **Events** (`events`) - inbound message and button events, the dispatcher and
//!   the `MessageService` seam the conversation runtime plugs into
//! - **Blocks** (`blocks`) - renders runtime replies as rich messages; confirmation
//!   questions get Yes/No buttons
//! - **Socket** (`socket`) - transport loop with reconnect backoff
//! - **Console** (`console`) - stdin/stdout transport used by `thunai chat`
//!
//! ```text
//! transport → SocketModeRunner → EventDispatcher → MessageService (AgentRuntime)
//!                                      ↓
//!                          render_outbound ← OutboundMessage
//! ```

pub mod blocks;
pub mod console;
pub mod events;
pub mod socket;

pub use blocks::{render_outbound, MessageTemplate};
pub use console::ConsoleTransport;
pub use events::{dispatcher_for, EventDispatcher, EventHandlerError, MessageService};
pub use socket::{ReconnectPolicy, SocketModeRunner, SocketTransport, TransportError};
