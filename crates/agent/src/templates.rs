//! User-facing message texts for the confirmation flows.

use chrono::NaiveDate;
use thunai_core::dates::week_start;
use thunai_core::{
    CelebrationCandidate, CelebrationCategory, CelebrationDraft, OfficeScheduleCandidate,
    OfficeStatus, ScheduleQuestion, TargetPeriod,
};

/// Opening question for a proactive or requested schedule collection.
pub fn schedule_question(period: &TargetPeriod, today: NaiveDate) -> String {
    match period {
        TargetPeriod::Week { start } if *start == week_start(today) => {
            "Good morning! 🌅 Could you share your office schedule for this week?".to_owned()
        }
        TargetPeriod::Week { .. } => "Hey! 👋 Hope you had a productive week! Could you share your office plans for next week? It helps me coordinate better!".to_owned(),
        TargetPeriod::Day { date } if date.pred_opt() == Some(today) => {
            "Hi! 👋 Quick check - what's your office plan for tomorrow? Just trying to coordinate!"
                .to_owned()
        }
        TargetPeriod::Day { date } => format!(
            "Hi! 👋 Quick check - what's your office plan for {}?",
            date.format("%A %-d %B")
        ),
    }
}

pub fn schedule_clarification(question: &ScheduleQuestion) -> String {
    match question.target_period.day() {
        Some(day) => format!(
            "Sorry, I didn't quite get that. Will you be in the office or at home on {}?",
            day.title()
        ),
        None => format!(
            "Sorry, I didn't quite get that. Which days will you be in the office for {}? Something like \"Mon to Wed office, Thu and Fri home\" works.",
            question.target_period.describe()
        ),
    }
}

pub fn schedule_retry() -> &'static str {
    "No problem! Could you tell me which days you'll be in the office?"
}

pub fn schedule_confirmation(candidate: &OfficeScheduleCandidate) -> String {
    match candidate.target_period {
        TargetPeriod::Day { date } => {
            let status = candidate
                .target_period
                .day()
                .map(|day| candidate.status(day))
                .unwrap_or(OfficeStatus::Unknown);
            format!(
                "Perfect! So you'll be {} on {}. Should I note this down? (1) Yes (2) No",
                status_phrase(status),
                date.format("%A")
            )
        }
        TargetPeriod::Week { .. } => format!(
            "Got it! Let me confirm your WFO plans: {}. Should I save this to my notes? (1) Yes (2) No",
            candidate.summary()
        ),
    }
}

pub fn schedule_saved(candidate: &OfficeScheduleCandidate, min_office_days: usize) -> String {
    if candidate.target_period.day().is_some() || candidate.is_compliant(min_office_days) {
        return "Awesome! Your office schedule is all set. Thanks for letting me know! 🎉"
            .to_owned();
    }
    format!(
        "Awesome! Your office schedule is all set. Heads up: that's {} office day(s), and the team aims for at least {}. Thanks for letting me know! 🎉",
        candidate.office_days_count(),
        min_office_days
    )
}

pub fn schedule_declined() -> &'static str {
    "No worries! Feel free to reach out when you want to share your office plans. I'm here to help! 😊"
}

pub fn schedule_exit() -> &'static str {
    "No worries! Feel free to share your office plans whenever you're ready. 😊"
}

pub fn celebration_subject_question(draft: &CelebrationDraft) -> String {
    match draft.category {
        CelebrationCategory::Other => "🎊 I'd love to help create this moment! Who should we celebrate? Please tell me their name.".to_owned(),
        category => format!(
            "🎊 I'd love to help celebrate this {}! Who should we celebrate? Please tell me their name.",
            category.label()
        ),
    }
}

pub fn celebration_subject_retry() -> &'static str {
    "Sorry, I didn't catch a name there. Who is this celebration for?"
}

pub fn celebration_confirmation(candidate: &CelebrationCandidate) -> String {
    format!(
        "{} Sounds like {}! Should I add this to the celebrations calendar? (1) Yes (2) No",
        candidate.category.emoji(),
        candidate.summary()
    )
}

pub fn celebration_saved(candidate: &CelebrationCandidate) -> String {
    let date = candidate.date.format("%-d %B");
    match candidate.category {
        CelebrationCategory::Birthday => format!(
            "🎂 Done! {}'s birthday on {date} is on the calendar. I'll remind the team to send their wishes!",
            candidate.person_name
        ),
        CelebrationCategory::Promotion => format!(
            "🚀 Done! {}'s promotion is on the calendar for {date}. Time to cheer them on!",
            candidate.person_name
        ),
        CelebrationCategory::Anniversary => format!(
            "🎊 Done! {}'s work anniversary on {date} is on the calendar. Here's to many more years!",
            candidate.person_name
        ),
        CelebrationCategory::Achievement => format!(
            "🏆 Done! {}'s achievement is on the calendar for {date}. Well deserved!",
            candidate.person_name
        ),
        CelebrationCategory::Other => format!(
            "🎉 Done! The celebration for {} on {date} is on the calendar.",
            candidate.person_name
        ),
    }
}

pub fn celebration_declined() -> &'static str {
    "No problem, I won't add it. Let me know whenever there's something to celebrate! 😊"
}

pub fn celebration_exit() -> &'static str {
    "No worries! Whenever you remember who we're celebrating, just tell me and I'll set it up. 😊"
}

pub fn backend_failure(dashboard_name: &str) -> String {
    format!(
        "😔 Sorry, I couldn't save that to my notes right now. Please try again in a bit, or add it directly in the {dashboard_name}."
    )
}

fn status_phrase(status: OfficeStatus) -> &'static str {
    match status {
        OfficeStatus::Office => "in the office",
        OfficeStatus::Home => "working from home",
        OfficeStatus::Hybrid => "hybrid",
        OfficeStatus::Leave => "on leave",
        OfficeStatus::Unknown => "somewhere",
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use thunai_core::{
        CelebrationCandidate, CelebrationCategory, OfficeScheduleCandidate, OfficeStatus,
        TargetPeriod, WorkDay,
    };

    use super::{
        celebration_confirmation, schedule_confirmation, schedule_question, schedule_saved,
    };

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).expect("valid date")
    }

    #[test]
    fn weekly_confirmation_uses_numbered_options() {
        let mut candidate =
            OfficeScheduleCandidate::unknown(TargetPeriod::Week { start: date(19) }, "mon office");
        candidate.set(WorkDay::Monday, OfficeStatus::Office);

        let text = schedule_confirmation(&candidate);
        assert!(text.starts_with("Got it! Let me confirm your WFO plans: Monday office"));
        assert!(text.ends_with("(1) Yes (2) No"));
    }

    #[test]
    fn daily_confirmation_names_the_day() {
        let mut candidate =
            OfficeScheduleCandidate::unknown(TargetPeriod::Day { date: date(19) }, "wfh");
        candidate.set(WorkDay::Monday, OfficeStatus::Home);

        assert_eq!(
            schedule_confirmation(&candidate),
            "Perfect! So you'll be working from home on Monday. Should I note this down? (1) Yes (2) No"
        );
    }

    #[test]
    fn short_weeks_get_a_compliance_note() {
        let mut candidate =
            OfficeScheduleCandidate::unknown(TargetPeriod::Week { start: date(19) }, "mon office");
        candidate.set(WorkDay::Monday, OfficeStatus::Office);

        assert!(schedule_saved(&candidate, 3).contains("1 office day(s)"));
        assert!(!schedule_saved(&candidate, 1).contains("Heads up"));
    }

    #[test]
    fn question_wording_follows_the_period() {
        let friday = date(16);
        let next_week = TargetPeriod::Week { start: date(19) };
        assert!(schedule_question(&next_week, friday).contains("next week"));
        assert!(schedule_question(&TargetPeriod::Day { date: date(17) }, friday)
            .contains("for tomorrow"));

        let monday = date(19);
        assert!(schedule_question(&next_week, monday).contains("this week"));
    }

    #[test]
    fn celebration_confirmation_leads_with_category_emoji() {
        let candidate = CelebrationCandidate {
            person_name: "Priya".to_owned(),
            category: CelebrationCategory::Birthday,
            date: NaiveDate::from_ymd_opt(2026, 11, 15).expect("valid date"),
            source_text: "Priya's bday is nov 15th".to_owned(),
            confidence: 0.9,
        };
        let text = celebration_confirmation(&candidate);
        assert!(text.starts_with(CelebrationCategory::Birthday.emoji()));
        assert!(text.contains("Priya's birthday on 15 November 2026"));
    }
}
