use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::celebration::{CelebrationCandidate, CelebrationDraft};
use crate::domain::schedule::{OfficeScheduleCandidate, ScheduleQuestion};
use crate::domain::user::UserId;
use crate::flows::{FlowKind, FlowState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Awaiting {
    None,
    CelebrationSubject,
    CelebrationConfirmation,
    ScheduleResponse,
    ScheduleConfirmation,
}

impl Awaiting {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::CelebrationSubject => "celebration_subject",
            Self::CelebrationConfirmation => "celebration_confirmation",
            Self::ScheduleResponse => "schedule_response",
            Self::ScheduleConfirmation => "schedule_confirmation",
        }
    }
}

/// The outstanding question together with the payload it is about.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "awaiting", rename_all = "snake_case")]
pub enum PendingQuestion {
    CelebrationSubject { draft: CelebrationDraft },
    CelebrationConfirmation { candidate: CelebrationCandidate },
    ScheduleResponse { question: ScheduleQuestion },
    ScheduleConfirmation { question: ScheduleQuestion, candidate: OfficeScheduleCandidate },
}

impl PendingQuestion {
    pub fn awaiting(&self) -> Awaiting {
        match self {
            Self::CelebrationSubject { .. } => Awaiting::CelebrationSubject,
            Self::CelebrationConfirmation { .. } => Awaiting::CelebrationConfirmation,
            Self::ScheduleResponse { .. } => Awaiting::ScheduleResponse,
            Self::ScheduleConfirmation { .. } => Awaiting::ScheduleConfirmation,
        }
    }

    pub fn flow_kind(&self) -> FlowKind {
        match self {
            Self::CelebrationSubject { .. } | Self::CelebrationConfirmation { .. } => {
                FlowKind::Celebration
            }
            Self::ScheduleResponse { .. } | Self::ScheduleConfirmation { .. } => FlowKind::Schedule,
        }
    }

    pub fn flow_state(&self) -> FlowState {
        match self {
            Self::CelebrationSubject { .. } => FlowState::AwaitingSubject,
            Self::ScheduleResponse { .. } => FlowState::AwaitingExtraction,
            Self::CelebrationConfirmation { .. } | Self::ScheduleConfirmation { .. } => {
                FlowState::AwaitingConfirmation
            }
        }
    }

    pub fn topic(&self) -> String {
        match self {
            Self::CelebrationSubject { draft } => draft.topic(),
            Self::CelebrationConfirmation { candidate } => candidate.topic(),
            Self::ScheduleResponse { question } | Self::ScheduleConfirmation { question, .. } => {
                question.target_period.topic()
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_id: UserId,
    pub pending: PendingQuestion,
    pub attempt_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(
        user_id: UserId,
        pending: PendingQuestion,
        attempt_count: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self { user_id, pending, attempt_count, created_at: now, updated_at: now }
    }

    /// Replaces the outstanding question, keeping the original creation time.
    pub fn advance(self, pending: PendingQuestion, attempt_count: u32, now: DateTime<Utc>) -> Self {
        Self { pending, attempt_count, updated_at: now, ..self }
    }

    pub fn awaiting(&self) -> Awaiting {
        self.pending.awaiting()
    }

    pub fn is_stale(&self, cutoff: DateTime<Utc>) -> bool {
        self.updated_at < cutoff
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};

    use super::{Awaiting, ConversationState, PendingQuestion};
    use crate::domain::schedule::{ScheduleQuestion, TargetPeriod};
    use crate::domain::user::UserId;
    use crate::flows::{FlowKind, FlowState};

    fn schedule_question() -> ScheduleQuestion {
        ScheduleQuestion {
            target_period: TargetPeriod::Week {
                start: NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date"),
            },
            prompt: "Which days will you be in the office?".to_owned(),
        }
    }

    #[test]
    fn pending_question_maps_to_awaiting_and_flow_state() {
        let pending = PendingQuestion::ScheduleResponse { question: schedule_question() };

        assert_eq!(pending.awaiting(), Awaiting::ScheduleResponse);
        assert_eq!(pending.flow_kind(), FlowKind::Schedule);
        assert_eq!(pending.flow_state(), FlowState::AwaitingExtraction);
        assert_eq!(pending.topic(), "schedule:weekly:2026-10-19");
    }

    #[test]
    fn advance_keeps_creation_time_and_staleness_uses_last_update() {
        let start = Utc::now() - Duration::minutes(40);
        let state = ConversationState::new(
            UserId::new("U1"),
            PendingQuestion::ScheduleResponse { question: schedule_question() },
            1,
            start,
        );
        let later = start + Duration::minutes(30);
        let advanced = state.clone().advance(state.pending.clone(), 2, later);

        assert_eq!(advanced.created_at, start);
        assert_eq!(advanced.attempt_count, 2);
        assert!(state.is_stale(start + Duration::minutes(1)));
        assert!(!advanced.is_stale(start + Duration::minutes(20)));
    }

    #[test]
    fn state_serializes_with_awaiting_tag() {
        let state = ConversationState::new(
            UserId::new("U1"),
            PendingQuestion::ScheduleResponse { question: schedule_question() },
            1,
            Utc::now(),
        );

        let json = serde_json::to_value(&state).expect("serialize state");
        assert_eq!(json["pending"]["awaiting"], "schedule_response");

        let decoded: ConversationState = serde_json::from_value(json).expect("deserialize state");
        assert_eq!(decoded, state);
    }
}
