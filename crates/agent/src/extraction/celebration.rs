use chrono::NaiveDate;
use thunai_core::dates::{find_date, parse_month, parse_weekday};
use thunai_core::{CelebrationCandidate, CelebrationCategory, CelebrationDraft};

use super::ExtractionHints;
use crate::text::{contains_any, title_case, words};

const BIRTHDAY_KEYWORDS: &[&str] = &["birthday", "bday", "born today", "turning"];
const PROMOTION_KEYWORDS: &[&str] = &["promoted", "promotion", "new role"];
const ANNIVERSARY_KEYWORDS: &[&str] = &["anniversary", "work anniversary", "years with", "joined"];
const ACHIEVEMENT_KEYWORDS: &[&str] =
    &["achieved", "achievement", "accomplished", "completed", "finished", "won", "milestone"];
const CELEBRATE_KEYWORDS: &[&str] = &[
    "celebrate",
    "celebrating",
    "celebration",
    "congrats",
    "congratulations",
    "kudos",
    "well done",
];

/// Words introducing the person being celebrated, as in "congrats Priya".
const SUBJECT_LEADERS: &[&str] = &["congrats", "congratulations", "kudos", "cheers"];
const MAX_NAME_WORDS: usize = 3;

const CORROBORATED_CONFIDENCE: f64 = 0.9;
const UNCORROBORATED_CONFIDENCE: f64 = 0.75;

const STOP_WORDS: &[&str] = &[
    "a", "all", "also", "and", "at", "but", "birthday", "bday", "can", "celebrate", "cheers",
    "congrats", "congratulations", "dear", "did", "do", "dont", "dunno", "everyone", "for",
    "good", "great", "guess", "guys", "happy", "he", "hello", "her", "hey", "hi", "his", "hmm",
    "i", "idea", "idk", "im", "in", "is", "it", "its", "just", "know", "kudos", "last", "lets",
    "maybe", "me", "my", "next", "no", "not", "oh", "on", "our", "please", "she", "so", "sorry",
    "sure", "team", "thank", "thanks", "that", "the", "their", "they", "this", "today", "to",
    "tomorrow", "um", "unsure", "was", "we", "well", "what", "who", "will", "wow", "yes", "you",
    "your",
];

/// Replies to "who should we celebrate?" that admit not knowing.
const NON_ANSWERS: &[&str] = &[
    "not sure", "no idea", "dont know", "idk", "dunno", "unsure", "no clue", "cant remember",
    "forgot", "not certain",
];

pub fn detect_category(text: &str) -> CelebrationCategory {
    let tokens = words(text);
    if contains_any(&tokens, BIRTHDAY_KEYWORDS) {
        CelebrationCategory::Birthday
    } else if contains_any(&tokens, PROMOTION_KEYWORDS) {
        CelebrationCategory::Promotion
    } else if contains_any(&tokens, ANNIVERSARY_KEYWORDS) {
        CelebrationCategory::Anniversary
    } else if contains_any(&tokens, ACHIEVEMENT_KEYWORDS) {
        CelebrationCategory::Achievement
    } else {
        CelebrationCategory::Other
    }
}

pub fn mentions_celebration(text: &str) -> bool {
    detect_category(text) != CelebrationCategory::Other
        || contains_any(&words(text), CELEBRATE_KEYWORDS)
}

/// Pulls a celebration out of `text`. Returns `None` when no subject can be named.
///
/// Names that a second source (the classifier hint or the bot's previous utterance)
/// also mentions win over names found in the text alone.
pub fn extract_celebration(
    text: &str,
    hints: &ExtractionHints,
    prior_utterance: Option<&str>,
    today: NaiveDate,
) -> Option<CelebrationCandidate> {
    let candidates = name_candidates(text);
    let mut sources = Vec::new();
    if let Some(hinted) = hints.person_name.as_deref() {
        sources.push(words(hinted));
    }
    if let Some(prior) = prior_utterance {
        sources.push(words(prior));
    }

    let corroborated = candidates.iter().find(|name| {
        let name_words = words(name);
        sources.iter().any(|source| name_words.iter().all(|word| source.contains(word)))
    });

    let (person_name, confidence) = match corroborated {
        Some(name) => (name.clone(), CORROBORATED_CONFIDENCE),
        None => match hinted_name_in_text(text, hints.person_name.as_deref()) {
            Some(name) => (name, CORROBORATED_CONFIDENCE),
            None => (candidates.into_iter().next()?, UNCORROBORATED_CONFIDENCE),
        },
    };

    Some(draft_celebration(text, hints, today).complete(person_name, confidence))
}

/// Category and date of a celebration whose subject is still unknown.
pub fn draft_celebration(
    text: &str,
    hints: &ExtractionHints,
    today: NaiveDate,
) -> CelebrationDraft {
    let category = match detect_category(text) {
        CelebrationCategory::Other => hints.category.unwrap_or(CelebrationCategory::Other),
        detected => detected,
    };
    let date = find_date(text, today)
        .or_else(|| hints.date_text.as_deref().and_then(|hint| find_date(hint, today)))
        .unwrap_or(today);

    CelebrationDraft { category, date, source_text: text.to_owned() }
}

pub fn admits_not_knowing(reply: &str) -> bool {
    contains_any(&words(reply), NON_ANSWERS)
}

/// Reads a name out of a reply to "who should we celebrate?". Short lowercase replies
/// such as "priya" are accepted as names.
pub fn extract_subject(reply: &str) -> Option<String> {
    if admits_not_knowing(reply) {
        return None;
    }
    if let Some(name) = name_candidates(reply).into_iter().next() {
        return Some(name);
    }

    let remaining = words(reply)
        .into_iter()
        .filter(|word| !is_stop_word(word) && word != "name")
        .collect::<Vec<_>>();
    let plausible = (1..=MAX_NAME_WORDS).contains(&remaining.len())
        && remaining.iter().all(|word| word.chars().all(char::is_alphabetic));
    plausible.then(|| remaining.iter().map(|word| title_case(word)).collect::<Vec<_>>().join(" "))
}

#[derive(Debug)]
struct Token {
    word: String,
    possessive: bool,
    ends_clause: bool,
}

fn tokens(text: &str) -> Vec<Token> {
    text.split_whitespace()
        .filter_map(|raw| {
            let ends_clause = raw.ends_with([',', '.', '!', '?', ';', ':']);
            let trimmed = raw
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'' && c != '\u{2019}');
            let trimmed = trimmed.trim_matches(|c| c == '\'' || c == '\u{2019}');
            let (word, possessive) = match trimmed
                .strip_suffix("'s")
                .or_else(|| trimmed.strip_suffix("\u{2019}s"))
            {
                Some(stem) => (stem, true),
                None => (trimmed, false),
            };
            (!word.is_empty()).then(|| Token { word: word.to_owned(), possessive, ends_clause })
        })
        .collect()
}

fn is_stop_word(lower: &str) -> bool {
    let single = [lower.to_owned()];
    STOP_WORDS.contains(&lower)
        || parse_weekday(lower).is_some()
        || parse_month(lower).is_some()
        || [
            BIRTHDAY_KEYWORDS,
            PROMOTION_KEYWORDS,
            ANNIVERSARY_KEYWORDS,
            ACHIEVEMENT_KEYWORDS,
            CELEBRATE_KEYWORDS,
        ]
        .iter()
        .any(|family| contains_any(&single, family))
}

fn is_name_word(word: &str) -> bool {
    word.chars().count() >= 2
        && word.chars().all(|c| c.is_alphabetic() || c == '-')
        && !is_stop_word(&word.to_lowercase())
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

/// Candidate names in priority order: "X's birthday" style possessives and
/// "congrats X" style greetings first, then runs of capitalized words.
fn name_candidates(text: &str) -> Vec<String> {
    let tokens = tokens(text);
    let mut candidates = Vec::new();

    for (index, token) in tokens.iter().enumerate() {
        if token.possessive && is_name_word(&token.word) {
            let follows_category = tokens.get(index + 1).is_some_and(|next| {
                let lower = [next.word.to_lowercase()];
                contains_any(&lower, BIRTHDAY_KEYWORDS)
                    || contains_any(&lower, PROMOTION_KEYWORDS)
                    || contains_any(&lower, ANNIVERSARY_KEYWORDS)
                    || contains_any(&lower, &["work", "big"])
            });
            if follows_category {
                push_unique(&mut candidates, title_case(&token.word));
            }
        }

        let lower = token.word.to_lowercase();
        let leads_subject = SUBJECT_LEADERS.contains(&lower.as_str())
            || (lower == "done"
                && index > 0
                && tokens[index - 1].word.eq_ignore_ascii_case("well"));
        if leads_subject && !token.ends_clause {
            if let Some(next) = tokens.get(index + 1).filter(|next| is_name_word(&next.word)) {
                push_unique(&mut candidates, title_case(&next.word));
            }
        }
    }

    let mut index = 0;
    while index < tokens.len() {
        let token = &tokens[index];
        if !(is_capitalized(&token.word) && is_name_word(&token.word)) {
            index += 1;
            continue;
        }

        let mut parts = vec![token.word.clone()];
        let mut end = index;
        while parts.len() < MAX_NAME_WORDS
            && !tokens[end].possessive
            && !tokens[end].ends_clause
            && tokens
                .get(end + 1)
                .is_some_and(|next| is_capitalized(&next.word) && is_name_word(&next.word))
        {
            end += 1;
            parts.push(tokens[end].word.clone());
        }
        push_unique(&mut candidates, parts.join(" "));
        index = end + 1;
    }

    candidates
}

fn push_unique(candidates: &mut Vec<String>, name: String) {
    if !candidates.iter().any(|existing| existing.eq_ignore_ascii_case(&name)) {
        candidates.push(name);
    }
}

fn hinted_name_in_text(text: &str, hinted: Option<&str>) -> Option<String> {
    let hinted = hinted?.trim();
    let hinted_words = words(hinted);
    if hinted_words.is_empty() || hinted_words.iter().any(|word| is_stop_word(word)) {
        return None;
    }
    let text_words = words(text);
    let present = hinted_words.iter().all(|word| {
        text_words.iter().any(|candidate| candidate == word || *candidate == format!("{word}s"))
    });
    present.then(|| hinted_words.iter().map(|word| title_case(word)).collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use thunai_core::CelebrationCategory;

    use super::{
        detect_category, draft_celebration, extract_celebration, extract_subject,
        mentions_celebration,
    };
    use crate::extraction::ExtractionHints;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 14).expect("valid date")
    }

    #[test]
    fn possessive_birthday_with_month_name_date() {
        let candidate = extract_celebration(
            "Priya's bday is nov 15th",
            &ExtractionHints::default(),
            None,
            today(),
        )
        .expect("candidate");

        assert_eq!(candidate.person_name, "Priya");
        assert_eq!(candidate.category, CelebrationCategory::Birthday);
        assert_eq!(candidate.date, NaiveDate::from_ymd_opt(2026, 11, 15).expect("valid date"));
        assert_eq!(candidate.source_text, "Priya's bday is nov 15th");
    }

    #[test]
    fn lowercase_possessive_before_category_is_a_name() {
        let candidate = extract_celebration(
            "it's arjun's work anniversary tomorrow",
            &ExtractionHints::default(),
            None,
            today(),
        )
        .expect("candidate");

        assert_eq!(candidate.person_name, "Arjun");
        assert_eq!(candidate.category, CelebrationCategory::Anniversary);
        assert_eq!(candidate.date, NaiveDate::from_ymd_opt(2026, 10, 15).expect("valid date"));
    }

    #[test]
    fn corroborated_name_is_preferred_over_first_capitalized_word() {
        let hints =
            ExtractionHints { person_name: Some("Meera".to_owned()), ..ExtractionHints::default() };
        let candidate = extract_celebration(
            "Rahul told me Meera got promoted",
            &hints,
            None,
            today(),
        )
        .expect("candidate");

        assert_eq!(candidate.person_name, "Meera");
        assert_eq!(candidate.category, CelebrationCategory::Promotion);
        assert!(candidate.confidence > 0.8);

        let uncorroborated = extract_celebration(
            "Rahul told me Meera got promoted",
            &ExtractionHints::default(),
            None,
            today(),
        )
        .expect("candidate");
        assert_eq!(uncorroborated.person_name, "Rahul");
        assert!(uncorroborated.confidence < candidate.confidence);
    }

    #[test]
    fn prior_utterance_corroborates_name() {
        let candidate = extract_celebration(
            "Yes and Karthik finished the migration",
            &ExtractionHints::default(),
            Some("Who finished the migration, Karthik or Deepa?"),
            today(),
        )
        .expect("candidate");
        assert_eq!(candidate.person_name, "Karthik");
        assert_eq!(candidate.category, CelebrationCategory::Achievement);
    }

    #[test]
    fn hinted_lowercase_name_present_in_text_is_accepted() {
        let hints =
            ExtractionHints { person_name: Some("priya".to_owned()), ..ExtractionHints::default() };
        let candidate =
            extract_celebration("congrats to priya on the launch!", &hints, None, today())
                .expect("candidate");
        assert_eq!(candidate.person_name, "Priya");
    }

    #[test]
    fn hallucinated_hint_absent_from_text_is_ignored() {
        let hints = ExtractionHints {
            person_name: Some("Vikram".to_owned()),
            ..ExtractionHints::default()
        };
        let extracted = extract_celebration("someone has a birthday today", &hints, None, today());
        assert!(extracted.is_none());
    }

    #[test]
    fn multi_word_names_are_kept_together() {
        let candidate = extract_celebration(
            "Happy birthday Anita Desai!",
            &ExtractionHints::default(),
            None,
            today(),
        )
        .expect("candidate");
        assert_eq!(candidate.person_name, "Anita Desai");
        assert_eq!(candidate.date, today());
    }

    #[test]
    fn missing_subject_yields_none_and_draft_keeps_category() {
        let text = "we should celebrate the birthday on 20/10";
        assert!(extract_celebration(text, &ExtractionHints::default(), None, today()).is_none());

        let draft = draft_celebration(text, &ExtractionHints::default(), today());
        assert_eq!(draft.category, CelebrationCategory::Birthday);
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2026, 10, 20).expect("valid date"));
    }

    #[test]
    fn subject_replies() {
        assert_eq!(extract_subject("Priya").as_deref(), Some("Priya"));
        assert_eq!(extract_subject("priya sharma").as_deref(), Some("Priya Sharma"));
        assert_eq!(extract_subject("her name is meera").as_deref(), Some("Meera"));
        assert_eq!(extract_subject("I am not sure what you mean by that"), None);
    }

    #[test]
    fn admitting_not_knowing_is_not_a_name() {
        for reply in ["Not sure", "Sorry, no idea", "idk", "Dunno, ask Priya", "I don't know"] {
            assert_eq!(extract_subject(reply), None, "{reply}");
        }
    }

    #[test]
    fn filler_words_are_not_taken_for_names() {
        let candidate = extract_celebration(
            "Guess what, Suresh got promoted",
            &ExtractionHints::default(),
            None,
            today(),
        )
        .expect("candidate");
        assert_eq!(candidate.person_name, "Suresh");
        assert_eq!(candidate.category, CelebrationCategory::Promotion);
    }

    #[test]
    fn category_and_mention_detection() {
        assert_eq!(detect_category("Arun got promoted!"), CelebrationCategory::Promotion);
        assert_eq!(detect_category("we won the hackathon"), CelebrationCategory::Achievement);
        assert_eq!(detect_category("lunch at noon?"), CelebrationCategory::Other);
        assert!(mentions_celebration("let's celebrate the team"));
        assert!(!mentions_celebration("what a wonderful day"));
    }
}
