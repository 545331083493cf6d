use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use thunai_core::dates::{next_week_start, parse_weekday, week_start};
use thunai_core::{OfficeScheduleCandidate, OfficeStatus, ScheduleQuestion, TargetPeriod, WorkDay};

use super::ExtractionHints;
use crate::text::{contains_phrase, words};

const CLAUSE_BREAK: &str = "|";
const ALL_WEEK: &str = "allweek";
const REST_OF_WEEK: &str = "rest";
const EXCEPT: &str = "except";
const NEGATORS: &[&str] = &["not", "never", "isnt", "wont", "cant", "aint"];
const RANGE_CONNECTORS: &[&str] = &["to", "through", "thru", "till", "until", "-"];

const EXPLICIT_CONFIDENCE: f64 = 0.9;
const DEFAULTED_CONFIDENCE: f64 = 0.75;

const PHRASES: &[(&[&str], &str)] = &[
    (&["work", "from", "home"], "wfh"),
    (&["working", "from", "home"], "wfh"),
    (&["work", "from", "office"], "wfo"),
    (&["working", "from", "office"], "wfo"),
    (&["in", "person"], "office"),
    (&["on", "site"], "onsite"),
    (&["coming", "in"], "office"),
    (&["rest", "of", "the", "week"], REST_OF_WEEK),
    (&["rest", "of", "week"], REST_OF_WEEK),
    (&["other", "days"], REST_OF_WEEK),
    (&["remaining", "days"], REST_OF_WEEK),
    (&["all", "week"], ALL_WEEK),
    (&["whole", "week"], ALL_WEEK),
    (&["entire", "week"], ALL_WEEK),
    (&["full", "week"], ALL_WEEK),
    (&["every", "day"], ALL_WEEK),
    (&["all", "days"], ALL_WEEK),
    (&["everyday"], ALL_WEEK),
    (&["except", "for"], EXCEPT),
    (&["other", "than"], EXCEPT),
    (&["apart", "from"], EXCEPT),
    (&["excluding"], EXCEPT),
    (&["besides"], EXCEPT),
];

fn status_keyword(token: &str) -> Option<OfficeStatus> {
    match token {
        "office" | "wfo" | "onsite" | "campus" => Some(OfficeStatus::Office),
        "home" | "wfh" | "remote" | "remotely" => Some(OfficeStatus::Home),
        "hybrid" => Some(OfficeStatus::Hybrid),
        "leave" | "off" | "vacation" | "pto" | "holiday" | "ooo" | "sick" => {
            Some(OfficeStatus::Leave)
        }
        _ => None,
    }
}

fn workday(token: &str) -> Option<WorkDay> {
    parse_weekday(token).and_then(WorkDay::from_weekday)
}

/// True when the text talks about where someone is working.
pub fn mentions_schedule(text: &str) -> bool {
    schedule_tokens(text).iter().any(|token| {
        matches!(
            status_keyword(token),
            Some(OfficeStatus::Office | OfficeStatus::Home | OfficeStatus::Hybrid)
        )
    })
}

/// True when the text names at least one working day, or today or tomorrow.
pub fn mentions_workday(text: &str) -> bool {
    schedule_tokens(text).iter().any(|token| {
        workday(token).is_some() || matches!(token.as_str(), ALL_WEEK | "today" | "tomorrow")
    })
}

/// Period a volunteered schedule is about when no question was asked.
/// "today"/"tomorrow" pick a single day, "this week" the current week,
/// anything else the coming week.
pub fn disclosed_period(text: &str, today: NaiveDate) -> TargetPeriod {
    let tokens = words(text);
    if contains_phrase(&tokens, "tomorrow") {
        TargetPeriod::Day { date: today + Duration::days(1) }
    } else if contains_phrase(&tokens, "today") {
        TargetPeriod::Day { date: today }
    } else if contains_phrase(&tokens, "this week") {
        TargetPeriod::Week { start: week_start(today) }
    } else {
        TargetPeriod::Week { start: next_week_start(today) }
    }
}

/// Reads per-day office statuses from a reply. Returns `None` when the reply names
/// no day at all, so callers can ask again rather than guess.
///
/// Days mentioned without any status default to office. Days never mentioned stay
/// unknown. A daily question with a status but no day applies it to the asked day.
/// Days excluded with "except"/"other than" or negated with "not" stay unknown unless
/// a later status in the same clause names them.
pub fn extract_schedule(
    text: &str,
    question: &ScheduleQuestion,
    hints: &ExtractionHints,
) -> Option<OfficeScheduleCandidate> {
    let tokens = schedule_tokens(text);
    let mut assigned: BTreeMap<WorkDay, (OfficeStatus, bool)> = BTreeMap::new();
    let mut pending: Vec<WorkDay> = Vec::new();
    let mut current: Option<OfficeStatus> = None;
    let mut first_status: Option<OfficeStatus> = None;
    // Exclusion state lasts until the end of the clause or the next plain status.
    let mut excluding = false;
    let mut negated_status = false;
    let mut excluded_in_clause: Vec<WorkDay> = Vec::new();
    let mut excluded: Vec<WorkDay> = Vec::new();

    let mut index = 0;
    while index < tokens.len() {
        let token = tokens[index].as_str();

        if token == CLAUSE_BREAK {
            current = None;
            excluding = false;
            negated_status = false;
            excluded_in_clause.clear();
            index += 1;
            continue;
        }

        if token == EXCEPT || NEGATORS.contains(&token) {
            excluding = true;
            negated_status = token != EXCEPT;
            index += 1;
            continue;
        }

        if let Some(status) = status_keyword(token) {
            if negated_status {
                negated_status = false;
                current = None;
                index += 1;
                continue;
            }
            for day in pending.drain(..).chain(excluded_in_clause.drain(..)) {
                excluded.retain(|other| *other != day);
                assigned.insert(day, (status, true));
            }
            excluding = false;
            current = Some(status);
            first_status.get_or_insert(status);
            index += 1;
            continue;
        }

        let (days, consumed) = match token {
            ALL_WEEK => (WorkDay::ALL.to_vec(), 1),
            REST_OF_WEEK => (
                WorkDay::ALL
                    .iter()
                    .copied()
                    .filter(|day| {
                        !assigned.contains_key(day)
                            && !pending.contains(day)
                            && !excluded.contains(day)
                    })
                    .collect(),
                1,
            ),
            _ => match workday(token) {
                Some(start) => match range_end(&tokens, index) {
                    Some(end) => (WorkDay::range(start, end), 3),
                    None => (vec![start], 1),
                },
                None => (Vec::new(), 1),
            },
        };

        if excluding {
            negated_status = negated_status && days.is_empty();
            for day in days {
                assigned.remove(&day);
                pending.retain(|other| *other != day);
                excluded_in_clause.push(day);
                excluded.push(day);
            }
            index += consumed;
            continue;
        }

        match current {
            Some(status) => {
                for day in days {
                    assigned.insert(day, (status, true));
                }
            }
            None => pending.extend(days),
        }
        index += consumed;
    }

    for day in pending {
        let status = if hints.home_days.contains(&day) {
            (OfficeStatus::Home, true)
        } else {
            (OfficeStatus::Office, hints.office_days.contains(&day))
        };
        assigned.insert(day, status);
    }

    if assigned.is_empty() {
        if let (Some(day), Some(status)) = (question.target_period.day(), first_status) {
            assigned.insert(day, (status, true));
        }
    }

    if assigned.is_empty() {
        return None;
    }

    let mut candidate = OfficeScheduleCandidate::unknown(question.target_period, text);
    let all_explicit = assigned.values().all(|(_, explicit)| *explicit);
    for (day, (status, _)) in assigned {
        candidate.set(day, status);
    }
    candidate.confidence = if all_explicit { EXPLICIT_CONFIDENCE } else { DEFAULTED_CONFIDENCE };
    Some(candidate)
}

fn range_end(tokens: &[String], index: usize) -> Option<WorkDay> {
    let connector = tokens.get(index + 1)?;
    if !RANGE_CONNECTORS.contains(&connector.as_str()) {
        return None;
    }
    workday(tokens.get(index + 2)?)
}

fn schedule_tokens(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        match character {
            c if c.is_alphanumeric() => sanitized.extend(c.to_lowercase()),
            '\'' | '\u{2019}' => {}
            ',' | ';' | '.' | '!' | '?' | '\n' => sanitized.push_str(" | "),
            '-' | '\u{2013}' | '\u{2014}' => sanitized.push_str(" - "),
            _ => sanitized.push(' '),
        }
    }

    let raw = sanitized
        .split_whitespace()
        .map(|token| if token == "but" { CLAUSE_BREAK.to_owned() } else { token.to_owned() })
        .collect::<Vec<_>>();

    let mut tokens = Vec::with_capacity(raw.len());
    let mut index = 0;
    'outer: while index < raw.len() {
        for (phrase, replacement) in PHRASES {
            let end = index + phrase.len();
            if end <= raw.len() && raw[index..end].iter().zip(phrase.iter()).all(|(a, b)| a == b) {
                tokens.push((*replacement).to_owned());
                index = end;
                continue 'outer;
            }
        }
        tokens.push(raw[index].clone());
        index += 1;
    }
    tokens
}
