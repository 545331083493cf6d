pub mod celebration;
pub mod schedule;

use serde::{Deserialize, Serialize};
use thunai_core::{CelebrationCategory, WorkDay};

pub use celebration::{
    admits_not_knowing, detect_category, draft_celebration, extract_celebration, extract_subject,
    mentions_celebration,
};
pub use schedule::{disclosed_period, extract_schedule, mentions_schedule, mentions_workday};

/// Structured fields a classifier pulled out of a message. Extractors treat them as
/// corroboration only; the message text stays authoritative.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionHints {
    pub person_name: Option<String>,
    pub category: Option<CelebrationCategory>,
    pub date_text: Option<String>,
    pub office_days: Vec<WorkDay>,
    pub home_days: Vec<WorkDay>,
}

impl ExtractionHints {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
