//! Resolution of free-text date phrases against a reference date.
//!
//! Resolution never fails: text without a recognisable date resolves to the
//! reference date itself.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Resolve the first date phrase in `text`, falling back to `today`.
pub fn resolve_date(text: &str, today: NaiveDate) -> NaiveDate {
    find_date(text, today).unwrap_or(today)
}

/// Find a date phrase in `text`. Absolute dates take precedence over relative ones.
pub fn find_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let tokens = tokenize(text);
    find_absolute(&tokens, today).or_else(|| find_relative(&tokens, today))
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Monday of the week after the one containing `today`.
pub fn next_week_start(today: NaiveDate) -> NaiveDate {
    week_start(today) + Duration::days(7)
}

/// "this <weekday>" and a bare weekday: the next occurrence, a full week out
/// when `today` already is that weekday.
pub fn this_weekday(target: Weekday, today: NaiveDate) -> NaiveDate {
    let delta = weekday_delta(target, today);
    today + Duration::days(if delta == 0 { 7 } else { delta })
}

/// "next <weekday>": the occurrence in the following week, always 7 to 13 days out.
pub fn next_weekday(target: Weekday, today: NaiveDate) -> NaiveDate {
    today + Duration::days(weekday_delta(target, today) + 7)
}

pub fn parse_weekday(token: &str) -> Option<Weekday> {
    match token {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

pub fn parse_month(token: &str) -> Option<u32> {
    let month = match token {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn weekday_delta(target: Weekday, today: NaiveDate) -> i64 {
    let target = i64::from(target.num_days_from_monday());
    let current = i64::from(today.weekday().num_days_from_monday());
    (target - current + 7) % 7
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|ch| if ch.is_alphanumeric() || ch == '/' || ch == '-' { ch } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(|token| token.trim_matches('-').to_owned())
        .filter(|token| !token.is_empty())
        .collect()
}

fn find_absolute(tokens: &[String], today: NaiveDate) -> Option<NaiveDate> {
    for (index, token) in tokens.iter().enumerate() {
        if let Some(date) = parse_numeric(token, today) {
            return Some(date);
        }

        let Some(month) = parse_month(token) else {
            continue;
        };

        // "nov 15th", "november 15 2026"
        if let Some(day) = tokens.get(index + 1).and_then(|next| parse_day(next)) {
            let year = tokens.get(index + 2).and_then(|next| parse_year(next));
            if let Some(date) = build_date(year.unwrap_or(today.year()), month, day) {
                return Some(date);
            }
        }

        // "15 november", "15th of november 2026"
        let day_index = match index.checked_sub(1).and_then(|i| tokens.get(i)) {
            Some(previous) if previous == "of" => index.checked_sub(2),
            Some(_) => index.checked_sub(1),
            None => None,
        };
        if let Some(day) = day_index.and_then(|i| tokens.get(i)).and_then(|t| parse_day(t)) {
            let year = tokens.get(index + 1).and_then(|next| parse_year(next));
            if let Some(date) = build_date(year.unwrap_or(today.year()), month, day) {
                return Some(date);
            }
        }
    }
    None
}

fn parse_numeric(token: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        return Some(date);
    }

    let parts = token.split('/').collect::<Vec<_>>();
    match parts.as_slice() {
        [day, month, year] => {
            let year = parse_year(year)?;
            build_date(year, month.parse().ok()?, day.parse().ok()?)
        }
        [day, month] => build_date(today.year(), month.parse().ok()?, day.parse().ok()?),
        _ => None,
    }
}

fn parse_day(token: &str) -> Option<u32> {
    let digits = ["st", "nd", "rd", "th"]
        .iter()
        .find_map(|suffix| token.strip_suffix(suffix))
        .unwrap_or(token);
    let day = digits.parse::<u32>().ok()?;
    (1..=31).contains(&day).then_some(day)
}

fn parse_year(token: &str) -> Option<i32> {
    if token.len() != 4 {
        return None;
    }
    token.parse::<i32>().ok().filter(|year| (1900..=2200).contains(year))
}

fn build_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn find_relative(tokens: &[String], today: NaiveDate) -> Option<NaiveDate> {
    for (index, token) in tokens.iter().enumerate() {
        match token.as_str() {
            "today" | "tonight" => return Some(today),
            "tomorrow" | "tmrw" => return Some(today + Duration::days(1)),
            "yesterday" => return Some(today - Duration::days(1)),
            "next" => match tokens.get(index + 1).map(String::as_str) {
                Some("week") => return Some(today + Duration::days(7)),
                Some(next) => {
                    if let Some(weekday) = parse_weekday(next) {
                        return Some(next_weekday(weekday, today));
                    }
                }
                None => {}
            },
            "this" | "coming" | "on" => {
                if let Some(weekday) = tokens.get(index + 1).and_then(|next| parse_weekday(next))
                {
                    return Some(this_weekday(weekday, today));
                }
            }
            _ => {}
        }
    }

    // Bare weekday names only; abbreviations are too ambiguous without a qualifier.
    tokens.iter().find_map(|token| match token.as_str() {
        "monday" | "tuesday" | "wednesday" | "thursday" | "friday" | "saturday" | "sunday" => {
            parse_weekday(token).map(|weekday| this_weekday(weekday, today))
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, NaiveDate, Weekday};

    use super::{find_date, next_week_start, resolve_date, week_start};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn this_weekday_on_same_weekday_rolls_a_full_week() {
        let wednesday = date(2026, 10, 14);
        assert_eq!(wednesday.weekday(), Weekday::Wed);
        assert_eq!(resolve_date("this Wednesday", wednesday), date(2026, 10, 21));
        assert_eq!(resolve_date("wednesday", wednesday), date(2026, 10, 21));
    }

    #[test]
    fn this_weekday_later_in_week_stays_in_week() {
        let monday = date(2026, 10, 12);
        assert_eq!(resolve_date("this friday", monday), date(2026, 10, 16));
        assert_eq!(resolve_date("friday", monday), date(2026, 10, 16));
    }

    #[test]
    fn next_weekday_is_always_at_least_a_week_out_on_that_weekday() {
        let start = date(2026, 10, 12);
        for offset in 0..7 {
            let today = start + chrono::Duration::days(offset);
            let resolved = resolve_date("next Wednesday", today);
            let distance = (resolved - today).num_days();

            assert_eq!(resolved.weekday(), Weekday::Wed, "from {today}");
            assert!((7..=13).contains(&distance), "from {today} got {distance} days");
        }
    }

    #[test]
    fn simple_relative_terms() {
        let today = date(2026, 10, 16);
        assert_eq!(resolve_date("it's today!", today), today);
        assert_eq!(resolve_date("tomorrow is the day", today), date(2026, 10, 17));
        assert_eq!(resolve_date("that was yesterday", today), date(2026, 10, 15));
        assert_eq!(resolve_date("next week", today), date(2026, 10, 23));
    }

    #[test]
    fn month_name_with_ordinal_and_default_year() {
        let today = date(2026, 10, 16);
        assert_eq!(resolve_date("Priya's bday is nov 15th", today), date(2026, 11, 15));
        assert_eq!(resolve_date("on 3rd of March", today), date(2026, 3, 3));
        assert_eq!(resolve_date("15 November", today), date(2026, 11, 15));
        assert_eq!(resolve_date("November 15, 2027", today), date(2027, 11, 15));
    }

    #[test]
    fn numeric_formats() {
        let today = date(2026, 10, 16);
        assert_eq!(resolve_date("on 2026-12-01", today), date(2026, 12, 1));
        assert_eq!(resolve_date("on 05/11/2026", today), date(2026, 11, 5));
        assert_eq!(resolve_date("on 05/11", today), date(2026, 11, 5));
    }

    #[test]
    fn absolute_dates_win_over_relative_terms() {
        let today = date(2026, 10, 16);
        assert_eq!(resolve_date("tomorrow, no wait, dec 2nd", today), date(2026, 12, 2));
    }

    #[test]
    fn unparseable_text_defaults_to_today() {
        let today = date(2026, 10, 16);
        assert_eq!(find_date("Arjun got promoted!", today), None);
        assert_eq!(resolve_date("Arjun got promoted!", today), today);
        assert_eq!(resolve_date("on 31/02/2026", today), today);
        assert_eq!(resolve_date("may the force be with you", today), today);
    }

    #[test]
    fn week_boundaries() {
        let friday = date(2026, 10, 16);
        assert_eq!(week_start(friday), date(2026, 10, 12));
        assert_eq!(next_week_start(friday), date(2026, 10, 19));
        assert_eq!(week_start(date(2026, 10, 12)), date(2026, 10, 12));
    }
}
