//! First-person to second-person rewriting.
//!
//! Small local models routinely ignore the "speak in second person"
//! instruction, so answers get a mechanical pass. Phrase-level rules run
//! first, most-specific phrasing before shorter prefixes of it; a bare "I"
//! is only touched at the start of the text or after terminal punctuation,
//! so words like "India" are never clipped.

use regex::Regex;
use std::sync::LazyLock;

static REPLACEMENTS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\bI was\b", "You were"),
        (r"\bI am\b", "You are"),
        (r"\bI have\b", "You have"),
        (r"\bI had\b", "You had"),
        (r"\bI'm\b", "You're"),
        (r"\bI've\b", "You've"),
        (r"\bI'd\b", "You'd"),
        (r"\bI'll\b", "You'll"),
        (r"\bI will\b", "You will"),
        (r"\bI can\b", "You can"),
        (r"\bI could\b", "You could"),
        (r"\bI would\b", "You would"),
        (r"\bI should\b", "You should"),
        (r"\bI need\b", "You need"),
        (r"\bI want\b", "You want"),
        (r"\bI did\b", "You did"),
        (r"\bI do\b", "You do"),
        (r"\bmy\b", "your"),
        (r"\bMy\b", "Your"),
        (r"\bmine\b", "yours"),
        (r"\bmyself\b", "yourself"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("perspective pattern"), replacement))
    .collect()
});

/// "I" right after sentence-ending punctuation. The regex crate has no
/// lookbehind, so the punctuation is captured and re-emitted.
static SENTENCE_START_I: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([.!?]\s)I\b").expect("sentence-start pattern"));

static LEADING_I: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^I\b").expect("leading pattern"));

/// Rewrite first-person phrasing to second person. Idempotent on text that
/// is already second person.
pub fn rewrite_second_person(text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, replacement) in REPLACEMENTS.iter() {
        out = pattern.replace_all(&out, *replacement).into_owned();
    }
    out = SENTENCE_START_I.replace_all(&out, "${1}You").into_owned();
    LEADING_I.replace_all(&out, "You").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_rewrites() {
        assert_eq!(
            rewrite_second_person("I am at the office and my badge is active."),
            "You are at the office and your badge is active."
        );
        assert_eq!(rewrite_second_person("I've paid already."), "You've paid already.");
        assert_eq!(rewrite_second_person("My meeting moved."), "Your meeting moved.");
    }

    #[test]
    fn test_sentence_initial_i() {
        assert_eq!(
            rewrite_second_person("It shipped. I think it arrives Friday."),
            "It shipped. You think it arrives Friday."
        );
        assert_eq!(rewrite_second_person("I think so"), "You think so");
    }

    #[test]
    fn test_never_rewrites_inside_words() {
        assert_eq!(
            rewrite_second_person("India and Iceland are on my list."),
            "India and Iceland are on your list."
        );
        assert_eq!(rewrite_second_person("The army myth."), "The army myth.");
    }

    #[test]
    fn test_idempotent_on_second_person() {
        let text = "You were at the cafe and your receipt shows $4.50.";
        assert_eq!(rewrite_second_person(text), text);

        let once = rewrite_second_person("I was at the cafe. My receipt is attached.");
        assert_eq!(rewrite_second_person(&once), once);
    }
}
