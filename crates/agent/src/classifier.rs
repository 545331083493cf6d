use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use thunai_core::dates::parse_weekday;
use thunai_core::{CelebrationCategory, UserContext, WorkDay};
use tracing::{debug, warn};

use crate::extraction::{self, ExtractionHints};
use crate::llm::{ChatMessage, LlmClient};
use crate::text::{contains_any, words};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Moment,
    ScheduleResponse,
    ScheduleProactiveNeeded,
    Administrative,
    Casual,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Moment => "moment",
            Self::ScheduleResponse => "wfo_response",
            Self::ScheduleProactiveNeeded => "wfo_proactive",
            Self::Administrative => "admin",
            Self::Casual => "general",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "moment" | "celebration" => Some(Self::Moment),
            "wfo_response" | "schedule_response" => Some(Self::ScheduleResponse),
            "wfo_proactive" | "schedule_proactive" => Some(Self::ScheduleProactiveNeeded),
            "admin" | "administrative" => Some(Self::Administrative),
            "general" | "casual" => Some(Self::Casual),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClassificationFailure {
    #[error("classifier output was malformed: {0}")]
    Malformed(String),
    #[error("classifier unavailable: {0}")]
    Unavailable(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f64,
    pub hints: ExtractionHints,
    pub reasoning: Option<String>,
    /// Set when the classifier failed closed and this result is the casual fallback.
    pub failure: Option<ClassificationFailure>,
}

impl Classification {
    pub fn new(intent: Intent, confidence: f64) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            hints: ExtractionHints::default(),
            reasoning: None,
            failure: None,
        }
    }

    pub fn failed_closed(failure: ClassificationFailure) -> Self {
        Self { failure: Some(failure), ..Self::new(Intent::Casual, 0.0) }
    }

    pub fn with_hints(mut self, hints: ExtractionHints) -> Self {
        self.hints = hints;
        self
    }
}

/// Minimum confidences before a classification is allowed to start a flow.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoutingThresholds {
    pub routing: f64,
    pub proactive: f64,
}

impl Default for RoutingThresholds {
    fn default() -> Self {
        Self { routing: 0.6, proactive: 0.7 }
    }
}

impl RoutingThresholds {
    /// Intent to act on; anything below its threshold is handled as casual.
    pub fn route(&self, classification: &Classification) -> Intent {
        let threshold = match classification.intent {
            Intent::Casual => return Intent::Casual,
            Intent::ScheduleProactiveNeeded => self.proactive,
            _ => self.routing,
        };
        if classification.confidence >= threshold {
            classification.intent
        } else {
            Intent::Casual
        }
    }
}

#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Never fails: errors surface as a casual classification with `failure` set.
    async fn classify(&self, text: &str, context: &UserContext) -> Classification;
}

const CLASSIFIER_PROMPT: &str = r#"You classify messages sent to Thunai, a workplace culture assistant.
Reply with a single JSON object and nothing else:
{"intent": "<label>", "confidence": <0.0-1.0>, "extracted_data": {...}, "reasoning": "<short>"}

Labels:
- moment: the user shares something to celebrate about a colleague (birthday, promotion, work anniversary, achievement).
- wfo_response: the user states which days they will work from the office or from home.
- wfo_proactive: the user talks about office plans without naming days, so they should be asked.
- admin: the user asks for reports, exports, dashboards or other administrative actions.
- general: anything else, including greetings and small talk.

extracted_data may contain: person_name, moment_type (birthday|promotion|anniversary|achievement), date (as written), office_days and home_days (lists of weekday names)."#;

#[derive(Debug, Deserialize)]
struct RawClassification {
    intent: String,
    confidence: Option<f64>,
    #[serde(default)]
    extracted_data: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Classifier backed by a chat-completion model. Timeouts, transport errors and
/// unparseable output all fail closed to a casual classification.
pub struct LlmIntentClassifier {
    llm: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl LlmIntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, timeout: Duration) -> Self {
        Self { llm, timeout }
    }

    fn messages(text: &str, context: &UserContext) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(CLASSIFIER_PROMPT)];
        if let Some(prior) = &context.prior_bot_utterance {
            messages.push(ChatMessage::assistant(prior.clone()));
        }
        messages.push(ChatMessage::user(text));
        messages
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, text: &str, context: &UserContext) -> Classification {
        let messages = Self::messages(text, context);
        let raw = match tokio::time::timeout(self.timeout, self.llm.complete(&messages)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(error)) => {
                warn!(
                    event_name = "classifier.llm_failed",
                    correlation_id = %context.correlation_id,
                    error = %error,
                    "intent classification failed, treating message as casual"
                );
                return Classification::failed_closed(ClassificationFailure::Unavailable(
                    error.to_string(),
                ));
            }
            Err(_) => {
                warn!(
                    event_name = "classifier.llm_timeout",
                    correlation_id = %context.correlation_id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "intent classification timed out, treating message as casual"
                );
                return Classification::failed_closed(ClassificationFailure::Unavailable(
                    format!("timed out after {}ms", self.timeout.as_millis()),
                ));
            }
        };

        match parse_classification(&raw) {
            Ok(classification) => {
                debug!(
                    event_name = "classifier.classified",
                    correlation_id = %context.correlation_id,
                    intent = classification.intent.as_str(),
                    confidence = classification.confidence,
                    "message classified"
                );
                classification
            }
            Err(failure) => {
                warn!(
                    event_name = "classifier.malformed_output",
                    correlation_id = %context.correlation_id,
                    error = %failure,
                    "classifier output rejected, treating message as casual"
                );
                Classification::failed_closed(failure)
            }
        }
    }
}

/// Parses the first JSON object in `raw`. Confidence is clamped to [0, 1] and
/// defaults to 0.5 when absent.
pub fn parse_classification(raw: &str) -> Result<Classification, ClassificationFailure> {
    let object = first_json_object(raw)
        .ok_or_else(|| ClassificationFailure::Malformed("no JSON object found".to_owned()))?;
    let parsed: RawClassification = serde_json::from_str(object)
        .map_err(|error| ClassificationFailure::Malformed(error.to_string()))?;
    let intent = Intent::from_label(&parsed.intent).ok_or_else(|| {
        ClassificationFailure::Malformed(format!("unknown intent label `{}`", parsed.intent))
    })?;

    let confidence = match parsed.confidence {
        Some(value) if value.is_finite() => value,
        Some(_) => {
            return Err(ClassificationFailure::Malformed("confidence is not a number".to_owned()))
        }
        None => 0.5,
    };

    let mut classification = Classification::new(intent, confidence)
        .with_hints(parsed.extracted_data.as_ref().map(hints_from_value).unwrap_or_default());
    classification.reasoning = parsed.reasoning;
    Ok(classification)
}

fn first_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, character) in raw[start..].char_indices() {
        if in_string {
            match character {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match character {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

fn hints_from_value(value: &Value) -> ExtractionHints {
    ExtractionHints {
        person_name: hint_text(value, &["person_name", "celebrant", "name"]).map(str::to_owned),
        category: hint_text(value, &["moment_type", "category"])
            .map(CelebrationCategory::from_label),
        date_text: hint_text(value, &["date", "moment_date"]).map(str::to_owned),
        office_days: hint_days(value, "office_days"),
        home_days: hint_days(value, "home_days"),
    }
}

fn hint_text<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        value.get(*key).and_then(Value::as_str).map(str::trim).filter(|text| !text.is_empty())
    })
}

fn hint_days(value: &Value, key: &str) -> Vec<WorkDay> {
    let Some(items) = value.get(key).and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_str)
        .filter_map(|day| parse_weekday(&day.trim().to_lowercase()))
        .filter_map(WorkDay::from_weekday)
        .collect()
}

const ADMIN_KEYWORDS: &[&str] =
    &["admin", "report", "reports", "dashboard", "export", "analytics", "stats"];

/// Keyword classifier used when no language model is configured.
#[derive(Clone, Debug, Default)]
pub struct KeywordIntentClassifier;

impl KeywordIntentClassifier {
    pub fn classify_text(&self, text: &str) -> Classification {
        let tokens = words(text);
        if contains_any(&tokens, ADMIN_KEYWORDS) {
            return Classification::new(Intent::Administrative, 0.7);
        }
        if extraction::mentions_schedule(text) {
            return if extraction::mentions_workday(text) {
                Classification::new(Intent::ScheduleResponse, 0.8)
            } else {
                Classification::new(Intent::ScheduleProactiveNeeded, 0.75)
            };
        }
        if extraction::mentions_celebration(text) {
            let category = extraction::detect_category(text);
            let hints = ExtractionHints {
                category: (category != CelebrationCategory::Other).then_some(category),
                ..ExtractionHints::default()
            };
            return Classification::new(Intent::Moment, 0.8).with_hints(hints);
        }
        Classification::new(Intent::Casual, 0.9)
    }
}

#[async_trait]
impl IntentClassifier for KeywordIntentClassifier {
    async fn classify(&self, text: &str, _context: &UserContext) -> Classification {
        self.classify_text(text)
    }
}
