//! Backslash escapes for Markdown metacharacters in text runs.

use std::sync::LazyLock;

use regex::Regex;

/// Ordered substitutions; each is applied once over the whole run. Anchored
/// patterns only look at the start of the run.
static ESCAPES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"\\", r"\\"),
        (r"\*", r"\*"),
        (r"^-", r"\-"),
        (r"^\+ ", r"\+ "),
        (r"^(=+)", r"\$1"),
        (r"^(#{1,6}) ", r"\$1 "),
        (r"`", r"\`"),
        (r"^~~~", r"\~~~"),
        (r"\[", r"\["),
        (r"\]", r"\]"),
        (r"^>", r"\>"),
        (r"_", r"\_"),
        (r"^(\d+)\. ", r"${1}\. "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("escape pattern should compile"), replacement))
    .collect()
});

/// Escapes Markdown syntax in plain text.
pub fn escape_markdown(text: &str) -> String {
    ESCAPES
        .iter()
        .fold(text.to_string(), |acc, (pattern, replacement)| pattern.replace_all(&acc, *replacement).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r"C:\path", r"C:\\path")]
    #[case("2 * 3", r"2 \* 3")]
    #[case("- not a list", r"\- not a list")]
    #[case("a - b", "a - b")]
    #[case("+ plus", r"\+ plus")]
    #[case("=== title", r"\=== title")]
    #[case("## not heading", r"\## not heading")]
    #[case("####### seven", "####### seven")]
    #[case("use `code`", r"use \`code\`")]
    #[case("~~~ fence", r"\~~~ fence")]
    #[case("[link]", r"\[link\]")]
    #[case("> quote", r"\> quote")]
    #[case("snake_case", r"snake\_case")]
    #[case("1984. A year", r"1984\. A year")]
    #[case("Version 1. Next", "Version 1. Next")]
    fn test_escape_markdown(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_markdown(input), expected);
    }

    #[test]
    fn test_plain_text_is_untouched() {
        let text = "Just a sentence, with punctuation. And another one!";
        assert_eq!(escape_markdown(text), text);
    }
}
