//! Word-level helpers shared by the classifier and extractors.

/// Trims and collapses runs of whitespace. Case is kept for name extraction.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase alphanumeric words. Apostrophes are dropped so contractions stay one word.
pub(crate) fn words(text: &str) -> Vec<String> {
    let mut sanitized = String::with_capacity(text.len());
    for character in text.chars() {
        if character.is_alphanumeric() {
            sanitized.extend(character.to_lowercase());
        } else if matches!(character, '\'' | '\u{2019}') {
            continue;
        } else {
            sanitized.push(' ');
        }
    }
    sanitized.split_whitespace().map(str::to_owned).collect()
}

/// True when `phrase` occurs in `words` on word boundaries.
pub(crate) fn contains_phrase(words: &[String], phrase: &str) -> bool {
    let needle = phrase.split_whitespace().collect::<Vec<_>>();
    if needle.is_empty() || needle.len() > words.len() {
        return false;
    }
    words.windows(needle.len()).any(|window| window.iter().zip(&needle).all(|(a, b)| a == b))
}

pub(crate) fn contains_any(words: &[String], phrases: &[&str]) -> bool {
    phrases.iter().any(|phrase| contains_phrase(words, phrase))
}

pub(crate) fn title_case(word: &str) -> String {
    let mut characters = word.chars();
    match characters.next() {
        Some(first) => {
            first.to_uppercase().chain(characters.flat_map(char::to_lowercase)).collect()
        }
        None => String::new(),
    }
}
