use thunai_core::Awaiting;

use crate::confirmation::ReplyInterpretation;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailIntent {
    AdministrativeRequest { user_id: String, is_admin: bool },
    Commit { awaiting: Awaiting, reply: ReplyInterpretation },
}

impl GuardrailIntent {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::AdministrativeRequest { .. } => "policy.administrative_request",
            Self::Commit { .. } => "policy.commit_record",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String, fallback_path: &'static str },
    Degrade { reason_code: &'static str, user_message: String, fallback_path: &'static str },
}

impl GuardrailDecision {
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Allow => None,
            Self::Deny { user_message, .. } | Self::Degrade { user_message, .. } => {
                Some(user_message)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GuardrailPolicy {
    /// Chat has no admin tooling; admins are pointed at the dashboard.
    pub admin_tools_in_chat: bool,
    pub dashboard_name: String,
}

impl Default for GuardrailPolicy {
    fn default() -> Self {
        Self { admin_tools_in_chat: false, dashboard_name: "Thunai Dashboard".to_string() }
    }
}

impl GuardrailPolicy {
    pub fn with_dashboard(dashboard_name: impl Into<String>) -> Self {
        Self { dashboard_name: dashboard_name.into(), ..Self::default() }
    }

    pub fn evaluate(&self, intent: &GuardrailIntent) -> GuardrailDecision {
        match intent {
            GuardrailIntent::AdministrativeRequest { is_admin: false, .. } => {
                GuardrailDecision::Deny {
                    reason_code: "admin_request_not_permitted",
                    user_message: "That one is reserved for workspace admins. I can still help you celebrate a colleague or share your office plans! 😊"
                        .to_string(),
                    fallback_path: "casual_conversation",
                }
            }
            GuardrailIntent::AdministrativeRequest { .. } if self.admin_tools_in_chat => {
                GuardrailDecision::Allow
            }
            GuardrailIntent::AdministrativeRequest { .. } => GuardrailDecision::Degrade {
                reason_code: "admin_tools_unavailable_in_chat",
                user_message: format!(
                    "Reports and admin tools live in the {}. Head over there for the full picture! 📊",
                    self.dashboard_name
                ),
                fallback_path: "dashboard",
            },
            GuardrailIntent::Commit {
                awaiting: Awaiting::CelebrationConfirmation | Awaiting::ScheduleConfirmation,
                reply: ReplyInterpretation::Affirmative,
            } => GuardrailDecision::Allow,
            GuardrailIntent::Commit { .. } => GuardrailDecision::Deny {
                reason_code: "commit_requires_confirmation",
                user_message: "I only save things after you've confirmed them.".to_string(),
                fallback_path: "request_confirmation",
            },
        }
    }
}
