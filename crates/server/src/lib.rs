//! Thunai server: wires the conversation runtime to its HTTP backends, the
//! language model, the HTTP ingress and the background state sweeper.

pub mod audit;
pub mod backend;
pub mod bootstrap;
pub mod health;
pub mod llm;
pub mod logging;
pub mod messages;

pub use bootstrap::{bootstrap, bootstrap_with_config, build_runtime, Application, BootstrapError};
pub use logging::init_logging;
