pub mod engine;
pub mod states;

pub use engine::{CelebrationFlow, FlowDefinition, FlowEngine, FlowTransitionError, ScheduleFlow};
pub use states::{FlowAction, FlowContext, FlowEvent, FlowKind, FlowState, TransitionOutcome};
