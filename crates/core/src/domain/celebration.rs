use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CelebrationCategory {
    Birthday,
    Promotion,
    Anniversary,
    Achievement,
    Other,
}

impl CelebrationCategory {
    /// Value sent to the record store as `moment_type`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Birthday => "birthday",
            Self::Promotion => "promotion",
            Self::Anniversary => "anniversary",
            Self::Achievement => "achievement",
            Self::Other => "celebration",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Birthday => "birthday",
            Self::Promotion => "promotion",
            Self::Anniversary => "work anniversary",
            Self::Achievement => "achievement",
            Self::Other => "celebration",
        }
    }

    /// Lenient parse of labels produced by classifiers and the record store.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().replace([' ', '-'], "_").as_str() {
            "birthday" | "bday" => Self::Birthday,
            "promotion" | "promoted" => Self::Promotion,
            "anniversary" | "work_anniversary" => Self::Anniversary,
            "achievement" => Self::Achievement,
            _ => Self::Other,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Self::Birthday => "🎂",
            Self::Promotion => "🚀",
            Self::Anniversary => "🎊",
            Self::Achievement => "🏆",
            Self::Other => "🎉",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CelebrationCandidate {
    pub person_name: String,
    pub category: CelebrationCategory,
    pub date: NaiveDate,
    pub source_text: String,
    pub confidence: f64,
}

impl CelebrationCandidate {
    pub fn topic(&self) -> String {
        format!("moment:{}:{}", self.person_name.to_lowercase(), self.date)
    }

    pub fn summary(&self) -> String {
        format!(
            "{}'s {} on {}",
            self.person_name,
            self.category.label(),
            self.date.format("%-d %B %Y")
        )
    }
}

/// What is known about a celebration before its subject has been named.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CelebrationDraft {
    pub category: CelebrationCategory,
    pub date: NaiveDate,
    pub source_text: String,
}

impl CelebrationDraft {
    pub fn topic(&self) -> String {
        format!("moment:unnamed:{}", self.date)
    }

    pub fn complete(self, person_name: impl Into<String>, confidence: f64) -> CelebrationCandidate {
        CelebrationCandidate {
            person_name: person_name.into(),
            category: self.category,
            date: self.date,
            source_text: self.source_text,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{CelebrationCandidate, CelebrationCategory};

    #[test]
    fn category_labels_round_trip_through_lenient_parser() {
        for category in [
            CelebrationCategory::Birthday,
            CelebrationCategory::Promotion,
            CelebrationCategory::Anniversary,
            CelebrationCategory::Achievement,
            CelebrationCategory::Other,
        ] {
            assert_eq!(CelebrationCategory::from_label(category.as_str()), category);
        }
        assert_eq!(
            CelebrationCategory::from_label("Work Anniversary"),
            CelebrationCategory::Anniversary
        );
        assert_eq!(CelebrationCategory::from_label("new_hire"), CelebrationCategory::Other);
    }

    #[test]
    fn summary_names_subject_category_and_date() {
        let candidate = CelebrationCandidate {
            person_name: "Priya".to_owned(),
            category: CelebrationCategory::Birthday,
            date: NaiveDate::from_ymd_opt(2026, 11, 15).expect("valid date"),
            source_text: "Priya's bday is nov 15th".to_owned(),
            confidence: 0.9,
        };

        assert_eq!(candidate.summary(), "Priya's birthday on 15 November 2026");
        assert_eq!(candidate.topic(), "moment:priya:2026-11-15");
    }
}
