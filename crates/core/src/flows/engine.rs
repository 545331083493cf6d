use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::attempt::AttemptReason;
use crate::flows::states::{
    FlowAction, FlowContext, FlowEvent, FlowKind, FlowState, TransitionOutcome,
};

pub trait FlowDefinition {
    fn flow_kind(&self) -> FlowKind;
    fn initial_state(&self) -> FlowState {
        FlowState::Idle
    }
    fn transition(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>;
}

#[derive(Clone, Debug, Default)]
pub struct CelebrationFlow;

impl FlowDefinition for CelebrationFlow {
    fn flow_kind(&self) -> FlowKind {
        FlowKind::Celebration
    }

    fn transition(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_celebration(current, event, context)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ScheduleFlow;

impl FlowDefinition for ScheduleFlow {
    fn flow_kind(&self) -> FlowKind {
        FlowKind::Schedule
    }

    fn transition(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_schedule(current, event, context)
    }
}

impl FlowDefinition for FlowKind {
    fn flow_kind(&self) -> FlowKind {
        *self
    }

    fn transition(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        match self {
            FlowKind::Celebration => transition_celebration(current, event, context),
            FlowKind::Schedule => transition_schedule(current, event, context),
        }
    }
}

pub struct FlowEngine<F> {
    flow: F,
}

impl<F> FlowEngine<F>
where
    F: FlowDefinition,
{
    pub fn new(flow: F) -> Self {
        Self { flow }
    }

    pub fn flow_kind(&self) -> FlowKind {
        self.flow.flow_kind()
    }

    pub fn initial_state(&self) -> FlowState {
        self.flow.initial_state()
    }

    pub fn apply(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        self.flow.transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, FlowTransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit.user_id.clone(),
                        audit.conversation_id.clone(),
                        audit.correlation_id.clone(),
                        "flow.transition_applied",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("flow", self.flow_kind().as_str())
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event))
                    .with_metadata("attempt_count", context.attempt_count.to_string()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit.user_id.clone(),
                        audit.conversation_id.clone(),
                        audit.correlation_id.clone(),
                        "flow.transition_rejected",
                        AuditCategory::Flow,
                        audit.actor.clone(),
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("flow", self.flow_kind().as_str())
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

impl Default for FlowEngine<CelebrationFlow> {
    fn default() -> Self {
        Self::new(CelebrationFlow)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid {kind:?} transition from {state:?} using event {event:?}")]
    InvalidTransition { kind: FlowKind, state: FlowState, event: FlowEvent },
}

fn transition_celebration(
    current: &FlowState,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        AskClarification, ClearState, Commit, IncrementAttempt, PresentForConfirmation,
        RecordAttempt, SendDeclineMessage, SendExitMessage, SendSuccessMessage,
    };
    use FlowEvent::{
        CandidateExtracted, CommitFailed, ExtractionMissing, ReplyAffirmative, ReplyNegative,
        StateExpired,
    };
    use FlowState::{
        AwaitingConfirmation, AwaitingSubject, Committed, Declined, Exhausted, Idle,
    };

    let (to, actions) = match (current, event) {
        (Idle, CandidateExtracted) | (AwaitingSubject, CandidateExtracted) => {
            (AwaitingConfirmation, vec![PresentForConfirmation])
        }
        (Idle, ExtractionMissing) => (AwaitingSubject, vec![IncrementAttempt, AskClarification]),
        (AwaitingSubject, ExtractionMissing) if context.at_limit() => (
            Exhausted,
            vec![RecordAttempt(AttemptReason::MaxAttempts), SendExitMessage, ClearState],
        ),
        (AwaitingSubject, ExtractionMissing) => {
            (AwaitingSubject, vec![IncrementAttempt, AskClarification])
        }
        (AwaitingSubject, ReplyNegative) | (AwaitingConfirmation, ReplyNegative) => (
            Declined,
            vec![RecordAttempt(AttemptReason::Declined), SendDeclineMessage, ClearState],
        ),
        (AwaitingConfirmation, ReplyAffirmative) => (
            Committed,
            vec![
                Commit,
                RecordAttempt(AttemptReason::Committed),
                SendSuccessMessage,
                ClearState,
            ],
        ),
        (AwaitingConfirmation, CommitFailed) => failed(),
        (AwaitingSubject, StateExpired) | (AwaitingConfirmation, StateExpired) => expired(),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                kind: FlowKind::Celebration,
                state: current.clone(),
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current.clone(), to, event: event.clone(), actions })
}

fn transition_schedule(
    current: &FlowState,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        AskClarification, AskQuestion, ClearState, Commit, IncrementAttempt,
        PresentForConfirmation, RecordAttempt, SendDeclineMessage, SendExitMessage,
        SendSuccessMessage,
    };
    use FlowEvent::{
        CandidateExtracted, CommitFailed, ExtractionMissing, QuestionAsked, ReplyAffirmative,
        ReplyNegative, StateExpired,
    };
    use FlowState::{
        AwaitingConfirmation, AwaitingExtraction, Committed, Declined, Exhausted, Idle,
    };

    let (to, actions) = match (current, event) {
        (Idle, QuestionAsked) => (AwaitingExtraction, vec![IncrementAttempt, AskQuestion]),
        (Idle, CandidateExtracted) | (AwaitingExtraction, CandidateExtracted) => {
            (AwaitingConfirmation, vec![PresentForConfirmation])
        }
        (Idle, ExtractionMissing) => {
            (AwaitingExtraction, vec![IncrementAttempt, AskClarification])
        }
        (AwaitingExtraction, ExtractionMissing) if context.at_limit() => (
            Exhausted,
            vec![RecordAttempt(AttemptReason::MaxAttempts), SendExitMessage, ClearState],
        ),
        (AwaitingExtraction, ExtractionMissing) => {
            (AwaitingExtraction, vec![IncrementAttempt, AskClarification])
        }
        (AwaitingExtraction, ReplyNegative) => (
            Declined,
            vec![RecordAttempt(AttemptReason::Declined), SendDeclineMessage, ClearState],
        ),
        (AwaitingConfirmation, ReplyAffirmative) => (
            Committed,
            vec![
                Commit,
                RecordAttempt(AttemptReason::Committed),
                SendSuccessMessage,
                ClearState,
            ],
        ),
        (AwaitingConfirmation, ReplyNegative) if context.at_limit() => (
            Exhausted,
            vec![
                RecordAttempt(AttemptReason::Declined),
                RecordAttempt(AttemptReason::MaxAttempts),
                SendExitMessage,
                ClearState,
            ],
        ),
        (AwaitingConfirmation, ReplyNegative) => (
            AwaitingExtraction,
            vec![RecordAttempt(AttemptReason::Declined), IncrementAttempt, AskClarification],
        ),
        (AwaitingConfirmation, CommitFailed) => failed(),
        (AwaitingExtraction, StateExpired) | (AwaitingConfirmation, StateExpired) => expired(),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                kind: FlowKind::Schedule,
                state: current.clone(),
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: current.clone(), to, event: event.clone(), actions })
}

fn failed() -> (FlowState, Vec<FlowAction>) {
    (
        FlowState::Failed,
        vec![
            FlowAction::RecordAttempt(AttemptReason::BackendFailure),
            FlowAction::ReportBackendFailure,
            FlowAction::ClearState,
        ],
    )
}

fn expired() -> (FlowState, Vec<FlowAction>) {
    (
        FlowState::Expired,
        vec![FlowAction::RecordAttempt(AttemptReason::Expired), FlowAction::ClearState],
    )
}
