use serde::{Deserialize, Serialize};

use crate::domain::attempt::AttemptReason;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowKind {
    Celebration,
    Schedule,
}

impl FlowKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Celebration => "celebration",
            Self::Schedule => "schedule",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    Idle,
    AwaitingSubject,
    AwaitingExtraction,
    AwaitingConfirmation,
    Committed,
    Declined,
    Exhausted,
    Failed,
    Expired,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Committed | Self::Declined | Self::Exhausted | Self::Failed | Self::Expired
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    QuestionAsked,
    CandidateExtracted,
    ExtractionMissing,
    ReplyAffirmative,
    ReplyNegative,
    CommitFailed,
    StateExpired,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowContext {
    pub attempt_count: u32,
    pub max_attempts: u32,
}

impl FlowContext {
    pub fn new(attempt_count: u32, max_attempts: u32) -> Self {
        Self { attempt_count, max_attempts }
    }

    pub fn at_limit(&self) -> bool {
        self.attempt_count >= self.max_attempts
    }
}

impl Default for FlowContext {
    fn default() -> Self {
        Self { attempt_count: 0, max_attempts: 2 }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    AskQuestion,
    AskClarification,
    IncrementAttempt,
    PresentForConfirmation,
    Commit,
    RecordAttempt(AttemptReason),
    SendSuccessMessage,
    SendDeclineMessage,
    SendExitMessage,
    ReportBackendFailure,
    ClearState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: FlowState,
    pub to: FlowState,
    pub event: FlowEvent,
    pub actions: Vec<FlowAction>,
}

impl TransitionOutcome {
    pub fn has(&self, action: &FlowAction) -> bool {
        self.actions.contains(action)
    }

    pub fn recorded_reasons(&self) -> Vec<AttemptReason> {
        self.actions
            .iter()
            .filter_map(|action| match action {
                FlowAction::RecordAttempt(reason) => Some(*reason),
                _ => None,
            })
            .collect()
    }
}
