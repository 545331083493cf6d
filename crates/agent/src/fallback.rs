//! Canned replies used when the language model is unavailable.

use crate::text::{contains_any, words};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyCategory {
    Greeting,
    Celebration,
    Encouragement,
    Teamwork,
    Help,
    Achievement,
    Default,
}

const RULES: &[(ReplyCategory, &[&str])] = &[
    (
        ReplyCategory::Greeting,
        &["hi", "hello", "hey", "good morning", "good afternoon", "greetings"],
    ),
    (
        ReplyCategory::Celebration,
        &[
            "won",
            "achieved",
            "completed",
            "finished",
            "success",
            "celebrate",
            "victory",
            "accomplishment",
            "milestone",
        ],
    ),
    (
        ReplyCategory::Encouragement,
        &[
            "difficult",
            "hard",
            "challenging",
            "struggling",
            "tired",
            "stressed",
            "help",
            "encourage",
            "motivation",
            "tough day",
        ],
    ),
    (
        ReplyCategory::Teamwork,
        &["team", "colleagues", "collaboration", "together", "group", "working with", "partners"],
    ),
    (ReplyCategory::Help, &["what", "who", "how", "info", "about", "can you"]),
    (
        ReplyCategory::Achievement,
        &["project", "goal", "target", "delivered", "launched", "released", "proud", "achievement"],
    ),
];

impl ReplyCategory {
    pub fn classify(text: &str) -> Self {
        let tokens = words(text);
        RULES
            .iter()
            .find(|(_, keywords)| contains_any(&tokens, keywords))
            .map(|(category, _)| *category)
            .unwrap_or(Self::Default)
    }

    fn replies(&self) -> &'static [&'static str] {
        match self {
            Self::Greeting => &[
                "🎉 Hello there! I'm Thunai, your friendly workplace companion. What's got you excited today?",
                "Hey! 🌟 So good to hear from you. What amazing things are happening in your world?",
                "Hi! 😊 Welcome to the positive vibes zone. Anything worth celebrating today?",
            ],
            Self::Celebration => &[
                "🎊 That's absolutely amazing! Your hard work really paid off. The whole team should hear about this! 🌟",
                "🎉 Wow, this calls for a proper celebration! Moments like these make work meaningful. ✨",
                "💫 Fantastic news! This deserves all the recognition it can get.",
            ],
            Self::Encouragement => &[
                "🌟 I believe in you! Every challenge is another chance to shine, and I'm cheering you on. 💪",
                "✨ Even on tough days you're making a difference. You're valued here. 🎯",
                "🚀 You're stronger than you know. What's one small win we can celebrate right now?",
            ],
            Self::Teamwork => &[
                "👥 I love hearing about great teamwork! Your collaboration makes the workplace brighter. 🌈",
                "🤝 This is what team spirit looks like. When people support each other, magic happens. ✨",
            ],
            Self::Help => &[
                "😊 I'm your workplace companion! I can remember birthdays and milestones, note your office days, and cheer on your team. What would you like to celebrate? 🌟",
                "🎉 I help celebrate moments like birthdays, promotions and work anniversaries, and I keep track of office plans. How can I brighten your day? ✨",
            ],
            Self::Achievement => &[
                "🏆 Look at you crushing it! This achievement shows real dedication and talent.",
                "🎯 That's a big deal! Delivering like this deserves a shout-out. 🚀",
            ],
            Self::Default => &[
                "🌟 I'm here to spread joy and celebrate the good things happening at work. What's on your mind? 😊",
                "✨ Every conversation is a chance to create something positive. How can I brighten your day? 🎉",
                "💫 There's always something worth celebrating, even the small moments. What would you like to talk about? 🌈",
            ],
        }
    }
}

/// Deterministic keyword responder: the same text always gets the same reply.
#[derive(Clone, Debug, Default)]
pub struct FallbackResponder;

impl FallbackResponder {
    pub fn respond(&self, text: &str) -> String {
        let replies = ReplyCategory::classify(text).replies();
        replies[text.chars().count() % replies.len()].to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::{FallbackResponder, ReplyCategory};

    #[test]
    fn categories_follow_keyword_priority() {
        assert_eq!(ReplyCategory::classify("Hey there"), ReplyCategory::Greeting);
        assert_eq!(ReplyCategory::classify("we finished the release"), ReplyCategory::Celebration);
        assert_eq!(ReplyCategory::classify("rough, tough day"), ReplyCategory::Encouragement);
        assert_eq!(ReplyCategory::classify("my team rocks"), ReplyCategory::Teamwork);
        assert_eq!(ReplyCategory::classify("what can you do"), ReplyCategory::Help);
        assert_eq!(ReplyCategory::classify("the project launched"), ReplyCategory::Achievement);
        assert_eq!(ReplyCategory::classify("lunch soon"), ReplyCategory::Default);
        assert_eq!(ReplyCategory::classify("this is thin"), ReplyCategory::Default);
    }

    #[test]
    fn responses_are_deterministic() {
        let responder = FallbackResponder;
        assert_eq!(responder.respond("hello"), responder.respond("hello"));
        assert!(!responder.respond("lunch soon").is_empty());
    }
}
