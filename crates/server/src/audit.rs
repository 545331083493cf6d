use thunai_core::audit::{AuditEvent, AuditOutcome, AuditSink};
use tracing::{info, warn};

/// Writes audit events to the log under the `thunai::audit` target.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let metadata = serde_json::to_string(&event.metadata).unwrap_or_default();
        let user_id = event.user_id.as_ref().map_or("unknown", |user| user.as_str());
        let conversation_id = event.conversation_id.as_deref().unwrap_or("unknown");

        match event.outcome {
            AuditOutcome::Failed => warn!(
                target: "thunai::audit",
                event_name = %event.event_type,
                event_id = %event.event_id,
                category = ?event.category,
                correlation_id = %event.correlation_id,
                user_id,
                conversation_id,
                actor = %event.actor,
                metadata = %metadata,
                "audit event"
            ),
            AuditOutcome::Success | AuditOutcome::Rejected => info!(
                target: "thunai::audit",
                event_name = %event.event_type,
                event_id = %event.event_id,
                category = ?event.category,
                outcome = ?event.outcome,
                correlation_id = %event.correlation_id,
                user_id,
                conversation_id,
                actor = %event.actor,
                metadata = %metadata,
                "audit event"
            ),
        }
    }
}
