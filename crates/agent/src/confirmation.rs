use crate::text::{contains_any, words};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyInterpretation {
    Affirmative,
    Negative,
    Unclear,
}

const AFFIRMATIVE: &[&str] = &[
    "yes", "y", "yeah", "yea", "yep", "yup", "sure", "correct", "right", "exactly", "confirm",
    "confirmed", "ok", "okay", "absolutely", "definitely", "save it", "go ahead", "sounds good",
    "looks good", "perfect",
];
const NEGATIVE: &[&str] =
    &["no", "n", "nope", "nah", "wrong", "incorrect", "cancel", "dont", "thats wrong", "dont save"];
const NEGATORS: &[&str] =
    &["not", "dont", "never", "isnt", "aint", "cant", "doesnt", "wont", "hardly"];
/// Words a negator may reach past: "not quite right", "don't really agree".
const NEGATION_REACH: usize = 2;
const DECLINES: &[&str] = &[
    "no", "nope", "nah", "not now", "maybe later", "later", "dont ask", "stop asking", "skip",
    "not interested", "busy", "never mind", "nevermind", "cancel", "leave it", "forget it",
];

/// Interprets a reply to a yes/no confirmation. Replies carrying both a yes and a no
/// signal are unclear; callers treat unclear as a refusal.
pub fn interpret_reply(text: &str) -> ReplyInterpretation {
    let trimmed = text.trim().trim_matches(|c: char| matches!(c, '(' | ')' | '.' | '!'));
    match trimmed {
        "1" => return ReplyInterpretation::Affirmative,
        "2" => return ReplyInterpretation::Negative,
        _ => {}
    }

    let mut tokens = words(text);
    let negated_affirmation = strip_negated_affirmations(&mut tokens);

    let yes = contains_any(&tokens, AFFIRMATIVE) || text.contains('\u{1F44D}');
    let no = negated_affirmation || contains_any(&tokens, NEGATIVE) || text.contains('\u{1F44E}');

    match (yes, no) {
        (true, false) => ReplyInterpretation::Affirmative,
        (false, true) => ReplyInterpretation::Negative,
        _ => ReplyInterpretation::Unclear,
    }
}

/// Removes affirmative words governed by a preceding negator ("not sure", "I'm not ok").
/// Returns whether any were removed.
fn strip_negated_affirmations(tokens: &mut Vec<String>) -> bool {
    let mut negated = false;
    let mut index = 0;
    while index < tokens.len() {
        if NEGATORS.contains(&tokens[index].as_str()) {
            let end = (index + 1 + NEGATION_REACH).min(tokens.len());
            let governed = tokens[index + 1..end]
                .iter()
                .position(|token| AFFIRMATIVE.contains(&token.as_str()));
            if let Some(offset) = governed {
                tokens.remove(index + 1 + offset);
                negated = true;
            }
        }
        index += 1;
    }
    negated
}

/// True when a reply to an open question is a refusal to answer.
pub fn is_decline(text: &str) -> bool {
    contains_any(&words(text), DECLINES)
}
