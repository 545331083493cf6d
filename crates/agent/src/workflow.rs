//! Drives the celebration and schedule confirmation flows.
//!
//! Every turn maps the user's message onto one [`FlowEvent`], asks the flow engine
//! for the transition, and then carries out the resulting actions in order. Nothing
//! is written to the record store unless the engine emits `Commit`, which it only
//! does after an affirmative reply to a confirmation prompt.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Duration as DateDuration, NaiveDate, Weekday};
use thunai_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use thunai_core::dates::{next_week_start, week_start};
use thunai_core::flows::{
    FlowAction, FlowContext, FlowEngine, FlowEvent, FlowKind, FlowState, TransitionOutcome,
};
use thunai_core::{
    ApplicationError, AttemptType, CollectionAttempt, CollectionDecision, CollectionLedger,
    CollectionPolicy, ConversationState, ConversationStateStore, DomainError, OutboundMessage,
    PendingQuestion, ScheduleQuestion, ScheduleScope, ScheduleStore, ScheduleSubmission,
    TargetPeriod, UserContext,
};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::confirmation::{interpret_reply, is_decline, ReplyInterpretation};
use crate::extraction::{
    admits_not_knowing, disclosed_period, draft_celebration, extract_celebration,
    extract_schedule, extract_subject, ExtractionHints,
};
use crate::guardrails::{GuardrailDecision, GuardrailIntent, GuardrailPolicy};
use crate::resolver::{bounded, CelebrantResolver};
use crate::templates;

/// Confidence given to a name typed in answer to "who should we celebrate?".
const SUBJECT_REPLY_CONFIDENCE: f64 = 0.85;

#[derive(Clone, Debug)]
pub struct WorkflowSettings {
    pub max_clarification_attempts: u32,
    pub min_office_days: usize,
    pub backend_timeout: Duration,
    pub dashboard_name: String,
    pub collection: CollectionPolicy,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_clarification_attempts: 2,
            min_office_days: 3,
            backend_timeout: Duration::from_secs(10),
            dashboard_name: "Thunai Dashboard".to_owned(),
            collection: CollectionPolicy::default(),
        }
    }
}

/// What a single inbound message contributed to a flow.
#[derive(Clone, Debug)]
enum Step {
    /// A question is being put to the user unprompted.
    Asked(PendingQuestion),
    /// A full candidate was read; holds the confirmation to present.
    Candidate(PendingQuestion),
    /// Nothing usable was read; holds the question to keep outstanding.
    Missing(PendingQuestion),
    Reply(ReplyInterpretation),
    Expired,
}

impl Step {
    fn event(&self) -> FlowEvent {
        match self {
            Self::Asked(_) => FlowEvent::QuestionAsked,
            Self::Candidate(_) => FlowEvent::CandidateExtracted,
            Self::Missing(_) => FlowEvent::ExtractionMissing,
            Self::Reply(ReplyInterpretation::Affirmative) => FlowEvent::ReplyAffirmative,
            Self::Reply(_) => FlowEvent::ReplyNegative,
            Self::Expired => FlowEvent::StateExpired,
        }
    }

    fn pending(&self) -> Option<&PendingQuestion> {
        match self {
            Self::Asked(pending) | Self::Candidate(pending) | Self::Missing(pending) => {
                Some(pending)
            }
            Self::Reply(_) | Self::Expired => None,
        }
    }
}

enum Executed {
    Done(Option<OutboundMessage>),
    CommitFailed,
}

pub struct ConfirmationWorkflow {
    states: Arc<dyn ConversationStateStore>,
    ledger: Arc<dyn CollectionLedger>,
    schedules: Arc<dyn ScheduleStore>,
    resolver: CelebrantResolver,
    audit: Arc<dyn AuditSink>,
    guardrails: GuardrailPolicy,
    clock: Arc<dyn Clock>,
    settings: WorkflowSettings,
}

impl ConfirmationWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        states: Arc<dyn ConversationStateStore>,
        ledger: Arc<dyn CollectionLedger>,
        schedules: Arc<dyn ScheduleStore>,
        resolver: CelebrantResolver,
        audit: Arc<dyn AuditSink>,
        guardrails: GuardrailPolicy,
        clock: Arc<dyn Clock>,
        settings: WorkflowSettings,
    ) -> Self {
        Self { states, ledger, schedules, resolver, audit, guardrails, clock, settings }
    }

    /// A celebration mentioned out of the blue: confirm it, or ask who it is for.
    pub async fn start_celebration(
        &self,
        context: &UserContext,
        text: &str,
        hints: &ExtractionHints,
    ) -> Result<Option<OutboundMessage>, ApplicationError> {
        let today = self.clock.today();
        let prior = context.prior_bot_utterance.as_deref();
        let step = match extract_celebration(text, hints, prior, today) {
            Some(candidate) => {
                Step::Candidate(PendingQuestion::CelebrationConfirmation { candidate })
            }
            None => Step::Missing(PendingQuestion::CelebrationSubject {
                draft: draft_celebration(text, hints, today),
            }),
        };
        self.drive(context, None, step).await
    }

    /// A schedule volunteered without being asked.
    pub async fn start_schedule(
        &self,
        context: &UserContext,
        text: &str,
        hints: &ExtractionHints,
    ) -> Result<Option<OutboundMessage>, ApplicationError> {
        let today = self.clock.today();
        let period = disclosed_period(text, today);
        let question = ScheduleQuestion {
            prompt: templates::schedule_question(&period, today),
            target_period: period,
        };
        let step = match extract_schedule(text, &question, hints) {
            Some(candidate) => {
                Step::Candidate(PendingQuestion::ScheduleConfirmation { question, candidate })
            }
            None => Step::Missing(PendingQuestion::ScheduleResponse { question }),
        };
        self.drive(context, None, step).await
    }

    /// Proactive collection prompt, subject to the collection backoff policy.
    /// Returns `None` when the policy says to stay quiet.
    pub async fn prompt_schedule(
        &self,
        context: &UserContext,
        scope: ScheduleScope,
    ) -> Result<Option<OutboundMessage>, ApplicationError> {
        let period = target_for(scope, self.clock.today());
        let topic = period.topic();
        let attempts = self.ledger.attempts_for(&context.user_id, &topic).await?;

        match self.settings.collection.evaluate(&attempts) {
            CollectionDecision::Stop { reason } => {
                info!(
                    event_name = "collection.prompt_skipped",
                    correlation_id = %context.correlation_id,
                    user_id = %context.user_id,
                    topic = %topic,
                    reason = reason.as_str(),
                    "collection policy suppressed schedule prompt"
                );
                self.audit.emit(
                    AuditEvent::from_context(
                        &audit_context(context),
                        "collection.prompt_skipped",
                        AuditCategory::Collection,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("topic", topic)
                    .with_metadata("reason", reason.as_str()),
                );
                Ok(None)
            }
            CollectionDecision::Ask { attempt_number } => {
                info!(
                    event_name = "collection.prompt_sent",
                    correlation_id = %context.correlation_id,
                    user_id = %context.user_id,
                    topic = %topic,
                    attempt_number,
                    "sending schedule prompt"
                );
                self.ask_schedule(context, period).await
            }
        }
    }

    /// Opens a schedule question for `period` without consulting the collection policy.
    pub async fn ask_schedule(
        &self,
        context: &UserContext,
        period: TargetPeriod,
    ) -> Result<Option<OutboundMessage>, ApplicationError> {
        let question = ScheduleQuestion {
            prompt: templates::schedule_question(&period, self.clock.today()),
            target_period: period,
        };
        let message = self
            .drive(context, None, Step::Asked(PendingQuestion::ScheduleResponse { question }))
            .await?;
        self.append(CollectionAttempt::asked(
            context.user_id.clone(),
            period.topic(),
            self.clock.now(),
        ))
        .await;
        Ok(message)
    }

    /// Interprets a message as the answer to the outstanding question. The
    /// classifier is never consulted here.
    pub async fn continue_flow(
        &self,
        context: &UserContext,
        state: ConversationState,
        text: &str,
    ) -> Result<Option<OutboundMessage>, ApplicationError> {
        let step = match &state.pending {
            PendingQuestion::CelebrationSubject { draft } => {
                if admits_not_knowing(text) {
                    Step::Missing(state.pending.clone())
                } else if is_decline(text) {
                    Step::Reply(ReplyInterpretation::Negative)
                } else {
                    match extract_subject(text) {
                        Some(name) => Step::Candidate(PendingQuestion::CelebrationConfirmation {
                            candidate: draft.clone().complete(name, SUBJECT_REPLY_CONFIDENCE),
                        }),
                        None => Step::Missing(state.pending.clone()),
                    }
                }
            }
            PendingQuestion::ScheduleResponse { question } => {
                match extract_schedule(text, question, &ExtractionHints::default()) {
                    Some(candidate) => Step::Candidate(PendingQuestion::ScheduleConfirmation {
                        question: question.clone(),
                        candidate,
                    }),
                    None if is_decline(text) => Step::Reply(ReplyInterpretation::Negative),
                    None => Step::Missing(state.pending.clone()),
                }
            }
            PendingQuestion::CelebrationConfirmation { .. }
            | PendingQuestion::ScheduleConfirmation { .. } => {
                let reply = interpret_reply(text);
                if reply == ReplyInterpretation::Unclear {
                    info!(
                        event_name = "workflow.unclear_reply",
                        correlation_id = %context.correlation_id,
                        user_id = %context.user_id,
                        "unclear confirmation reply treated as a no"
                    );
                }
                Step::Reply(reply)
            }
        };
        self.drive(context, Some(state), step).await
    }

    /// Ends an abandoned flow: records it as expired and clears the state.
    pub async fn expire(
        &self,
        context: &UserContext,
        state: ConversationState,
    ) -> Result<(), ApplicationError> {
        self.drive(context, Some(state), Step::Expired).await.map(|_| ())
    }

    async fn drive(
        &self,
        context: &UserContext,
        existing: Option<ConversationState>,
        step: Step,
    ) -> Result<Option<OutboundMessage>, ApplicationError> {
        let pending = match (step.pending(), existing.as_ref()) {
            (Some(pending), _) => pending,
            (None, Some(state)) => &state.pending,
            (None, None) => {
                return Err(DomainError::InvariantViolation(
                    "a reply arrived with no outstanding question".to_owned(),
                )
                .into());
            }
        };
        let kind = pending.flow_kind();
        let engine = FlowEngine::new(kind);
        let current = existing.as_ref().map_or(FlowState::Idle, |state| state.pending.flow_state());
        let attempt_count = existing.as_ref().map_or(0, |state| state.attempt_count);
        let flow_context =
            FlowContext::new(attempt_count, self.settings.max_clarification_attempts);
        let audit = audit_context(context);

        let mut event = step.event();
        loop {
            let outcome = engine
                .apply_with_audit(&current, &event, &flow_context, self.audit.as_ref(), &audit)
                .map_err(DomainError::from)?;
            info!(
                event_name = "workflow.transition",
                correlation_id = %context.correlation_id,
                user_id = %context.user_id,
                flow = kind.as_str(),
                from = ?outcome.from,
                to = ?outcome.to,
                event = ?outcome.event,
                "flow transition applied"
            );

            match self.execute(context, &existing, &step, kind, &outcome).await? {
                Executed::Done(message) => return Ok(message),
                Executed::CommitFailed => event = FlowEvent::CommitFailed,
            }
        }
    }

    async fn execute(
        &self,
        context: &UserContext,
        existing: &Option<ConversationState>,
        step: &Step,
        kind: FlowKind,
        outcome: &TransitionOutcome,
    ) -> Result<Executed, ApplicationError> {
        let mut attempt_count = existing.as_ref().map_or(0, |state| state.attempt_count);
        let mut message = None;
        let mut saved = None;

        for action in &outcome.actions {
            match action {
                FlowAction::IncrementAttempt => attempt_count += 1,
                FlowAction::AskQuestion | FlowAction::AskClarification => {
                    let pending = match step.pending() {
                        Some(pending) => pending.clone(),
                        None => reopen(existing)?,
                    };
                    message = Some(OutboundMessage::question(ask_text(
                        action,
                        &outcome.from,
                        &pending,
                    )));
                    self.save(context, existing, pending, attempt_count).await?;
                }
                FlowAction::PresentForConfirmation => {
                    let pending = step.pending().cloned().ok_or_else(|| {
                        DomainError::InvariantViolation("no candidate to confirm".to_owned())
                    })?;
                    message = Some(OutboundMessage::confirmation(confirmation_text(&pending)));
                    self.save(context, existing, pending, attempt_count).await?;
                }
                FlowAction::Commit => {
                    let Some(state) = existing else {
                        return Err(DomainError::InvariantViolation(
                            "commit without an outstanding confirmation".to_owned(),
                        )
                        .into());
                    };
                    let reply = match step {
                        Step::Reply(reply) => *reply,
                        _ => ReplyInterpretation::Unclear,
                    };
                    let decision = self.guardrails.evaluate(&GuardrailIntent::Commit {
                        awaiting: state.awaiting(),
                        reply,
                    });
                    if decision != GuardrailDecision::Allow {
                        return Err(DomainError::InvariantViolation(format!(
                            "commit blocked: {decision:?}"
                        ))
                        .into());
                    }

                    match self.commit(context, &state.pending).await {
                        Ok(text) => saved = Some(text),
                        Err(error) => {
                            warn!(
                                event_name = "workflow.commit_failed",
                                correlation_id = %context.correlation_id,
                                user_id = %context.user_id,
                                flow = kind.as_str(),
                                error = %error,
                                "record store rejected confirmed entry"
                            );
                            self.audit.emit(
                                AuditEvent::from_context(
                                    &audit_context(context),
                                    "workflow.commit_failed",
                                    AuditCategory::Commit,
                                    AuditOutcome::Failed,
                                )
                                .with_metadata("flow", kind.as_str())
                                .with_metadata("error", error.to_string()),
                            );
                            return Ok(Executed::CommitFailed);
                        }
                    }
                }
                FlowAction::RecordAttempt(reason) => {
                    let attempt_type = if outcome.from == FlowState::AwaitingConfirmation {
                        AttemptType::Confirmation
                    } else {
                        AttemptType::Clarification
                    };
                    let topic = step
                        .pending()
                        .or(existing.as_ref().map(|state| &state.pending))
                        .map(PendingQuestion::topic)
                        .unwrap_or_default();
                    self.append(CollectionAttempt::outcome(
                        context.user_id.clone(),
                        topic,
                        attempt_type,
                        *reason,
                        self.clock.now(),
                    ))
                    .await;
                }
                FlowAction::SendSuccessMessage => {
                    message = saved.take().map(OutboundMessage::reply);
                }
                FlowAction::SendDeclineMessage => {
                    message = Some(OutboundMessage::reply(match kind {
                        FlowKind::Celebration => templates::celebration_declined(),
                        FlowKind::Schedule => templates::schedule_declined(),
                    }));
                }
                FlowAction::SendExitMessage => {
                    message = Some(OutboundMessage::notice(match kind {
                        FlowKind::Celebration => templates::celebration_exit(),
                        FlowKind::Schedule => templates::schedule_exit(),
                    }));
                }
                FlowAction::ReportBackendFailure => {
                    message = Some(OutboundMessage::apology(templates::backend_failure(
                        &self.settings.dashboard_name,
                    )));
                }
                FlowAction::ClearState => self.states.clear(&context.user_id).await?,
            }
        }

        Ok(Executed::Done(message))
    }

    async fn commit(
        &self,
        context: &UserContext,
        pending: &PendingQuestion,
    ) -> Result<String, ApplicationError> {
        match pending {
            PendingQuestion::CelebrationConfirmation { candidate } => {
                self.resolver
                    .commit_moment(candidate, context)
                    .await
                    .map_err(|error| ApplicationError::BackendUnavailable(error.to_string()))?;
                Ok(templates::celebration_saved(candidate))
            }
            PendingQuestion::ScheduleConfirmation { candidate, .. } => {
                let submission = ScheduleSubmission::from_candidate(
                    context.user_id.clone(),
                    candidate,
                    self.settings.min_office_days,
                    self.clock.now(),
                );
                let compliant = submission.is_compliant;
                bounded(self.settings.backend_timeout, self.schedules.save_schedule(submission))
                    .await?;
                info!(
                    event_name = "workflow.schedule_saved",
                    correlation_id = %context.correlation_id,
                    user_id = %context.user_id,
                    office_days = candidate.office_days_count(),
                    compliant,
                    "schedule submission stored"
                );
                Ok(templates::schedule_saved(candidate, self.settings.min_office_days))
            }
            PendingQuestion::CelebrationSubject { .. }
            | PendingQuestion::ScheduleResponse { .. } => {
                let reason = "nothing confirmed to commit".to_owned();
                Err(DomainError::InvariantViolation(reason).into())
            }
        }
    }

    async fn save(
        &self,
        context: &UserContext,
        existing: &Option<ConversationState>,
        pending: PendingQuestion,
        attempt_count: u32,
    ) -> Result<(), ApplicationError> {
        let now = self.clock.now();
        let state = match existing {
            Some(state) => state.clone().advance(pending, attempt_count, now),
            None => ConversationState::new(context.user_id.clone(), pending, attempt_count, now),
        };
        self.states.put(state).await?;
        Ok(())
    }

    /// Ledger writes never fail the turn; the user has already been answered.
    async fn append(&self, attempt: CollectionAttempt) {
        if let Err(error) = self.ledger.append(attempt).await {
            warn!(
                event_name = "workflow.ledger_append_failed",
                error = %error,
                "could not record collection attempt"
            );
        }
    }
}

/// Period a proactive prompt of `scope` asks about on `today`.
pub fn target_for(scope: ScheduleScope, today: NaiveDate) -> TargetPeriod {
    match scope {
        ScheduleScope::Weekly => weekly_target(today),
        ScheduleScope::Daily => TargetPeriod::Day { date: next_workday(today) },
    }
}

/// Monday prompts ask about the current week. Any other day asks about the next one.
pub fn weekly_target(today: NaiveDate) -> TargetPeriod {
    let start =
        if today.weekday() == Weekday::Mon { week_start(today) } else { next_week_start(today) };
    TargetPeriod::Week { start }
}

fn next_workday(today: NaiveDate) -> NaiveDate {
    let mut date = today + DateDuration::days(1);
    while matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        date += DateDuration::days(1);
    }
    date
}

pub(crate) fn audit_context(context: &UserContext) -> AuditContext {
    AuditContext::new(
        Some(context.user_id.clone()),
        Some(context.conversation_id.clone()),
        context.correlation_id.clone(),
        "thunai-agent",
    )
}

/// Question to keep outstanding when a rejected confirmation sends the user back a step.
fn reopen(existing: &Option<ConversationState>) -> Result<PendingQuestion, ApplicationError> {
    match existing.as_ref().map(|state| &state.pending) {
        Some(PendingQuestion::ScheduleConfirmation { question, .. }) => {
            Ok(PendingQuestion::ScheduleResponse { question: question.clone() })
        }
        Some(pending) => Ok(pending.clone()),
        None => {
            Err(DomainError::InvariantViolation("no question to ask again".to_owned()).into())
        }
    }
}

fn ask_text(action: &FlowAction, from: &FlowState, pending: &PendingQuestion) -> String {
    match pending {
        PendingQuestion::ScheduleResponse { question } if *action == FlowAction::AskQuestion => {
            question.prompt.clone()
        }
        PendingQuestion::ScheduleResponse { .. } if *from == FlowState::AwaitingConfirmation => {
            templates::schedule_retry().to_owned()
        }
        PendingQuestion::ScheduleResponse { question } => {
            templates::schedule_clarification(question)
        }
        PendingQuestion::CelebrationSubject { draft } if *from == FlowState::Idle => {
            templates::celebration_subject_question(draft)
        }
        PendingQuestion::CelebrationSubject { .. } => {
            templates::celebration_subject_retry().to_owned()
        }
        PendingQuestion::CelebrationConfirmation { .. }
        | PendingQuestion::ScheduleConfirmation { .. } => confirmation_text(pending),
    }
}

fn confirmation_text(pending: &PendingQuestion) -> String {
    match pending {
        PendingQuestion::CelebrationConfirmation { candidate } => {
            templates::celebration_confirmation(candidate)
        }
        PendingQuestion::ScheduleConfirmation { candidate, .. } => {
            templates::schedule_confirmation(candidate)
        }
        PendingQuestion::CelebrationSubject { draft } => {
            templates::celebration_subject_question(draft)
        }
        PendingQuestion::ScheduleResponse { question } => question.prompt.clone(),
    }
}
