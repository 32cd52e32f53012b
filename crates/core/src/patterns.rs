//! Class/id heuristics as swappable data.
//!
//! The scoring and cleaning stages never hardcode their regular expressions;
//! they read them from a [`PatternSet`] carried in the extraction config, so
//! callers can tune or replace individual patterns and test them in isolation.

use std::sync::LazyLock;

use regex::Regex;

use crate::{ReadmarkError, Result};

/// Regular expressions the heuristics match against `class` and `id` strings.
#[derive(Debug, Clone)]
pub struct PatternSet {
    /// Class/id fragments of page chrome that is almost never content.
    pub unlikely: Regex,
    /// Overrides `unlikely` when both match.
    pub ok_maybe: Regex,
    /// Bonus for likely content containers.
    pub positive: Regex,
    /// Penalty for likely boilerplate.
    pub negative: Regex,
    /// Author lines.
    pub byline: Regex,
    /// Embeds from these hosts survive cleaning.
    pub videos: Regex,
    /// Share widgets.
    pub share: Regex,
    /// Print, login and similar utility links.
    pub extraneous: Regex,
}

static DEFAULT_PATTERNS: LazyLock<PatternSet> = LazyLock::new(|| PatternSet {
    unlikely: compile(
        r"(?i)-ad-|ai2html|banner|breadcrumbs|combx|comment|community|cover-wrap|disqus|extra|footer|gdpr|header|legends|menu|related|remark|replies|rss|shoutbox|sidebar|skyscraper|social|sponsor|supplemental|ad-break|agegate|pagination|pager|popup|yom-remote",
    ),
    ok_maybe: compile(r"(?i)and|article|body|column|content|main|shadow"),
    positive: compile(r"(?i)article|body|content|entry|hentry|h-entry|main|page|pagination|post|text|blog|story"),
    negative: compile(
        r"(?i)-ad-|hidden|^hid$| hid$| hid |^hid |banner|combx|comment|com-|contact|foot|footer|footnote|gdpr|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|tool|widget",
    ),
    byline: compile(r"(?i)byline|author|dateline|writtenby|p-author"),
    videos: compile(
        r"(?i)//(www\.)?((dailymotion|youtube|youtube-nocookie|player\.vimeo|v\.qq)\.com|(archive|upload\.wikimedia)\.org|player\.twitch\.tv)",
    ),
    share: compile(r"(?i)(\b|_)(share|sharedaddy)(\b|_)"),
    extraneous: compile(r"(?i)print|archive|comment|discuss|e[\-]?mail|share|reply|all|login|sign|single|utility"),
});

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in pattern should compile")
}

impl Default for PatternSet {
    fn default() -> Self {
        DEFAULT_PATTERNS.clone()
    }
}

impl PatternSet {
    /// Replaces one named pattern with a caller-supplied expression.
    ///
    /// Names are the field names: `unlikely`, `ok_maybe`, `positive`,
    /// `negative`, `byline`, `videos`, `share`, `extraneous`.
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::HtmlParseError`] for an invalid expression or an
    /// unknown pattern name.
    ///
    /// # Example
    ///
    /// ```rust
    /// use readmark_core::PatternSet;
    ///
    /// let patterns = PatternSet::default().with_pattern("negative", r"(?i)promo|teaser").unwrap();
    /// assert!(patterns.negative.is_match("Teaser-box"));
    /// ```
    pub fn with_pattern(mut self, name: &str, pattern: &str) -> Result<Self> {
        let regex =
            Regex::new(pattern).map_err(|e| ReadmarkError::HtmlParseError(format!("Invalid pattern {name}: {e}")))?;
        let slot = match name {
            "unlikely" => &mut self.unlikely,
            "ok_maybe" => &mut self.ok_maybe,
            "positive" => &mut self.positive,
            "negative" => &mut self.negative,
            "byline" => &mut self.byline,
            "videos" => &mut self.videos,
            "share" => &mut self.share,
            "extraneous" => &mut self.extraneous,
            other => return Err(ReadmarkError::HtmlParseError(format!("Unknown pattern name: {other}"))),
        };
        *slot = regex;
        Ok(self)
    }

    /// True when the string looks like chrome and nothing overrides it.
    pub fn is_unlikely(&self, class_and_id: &str) -> bool {
        self.unlikely.is_match(class_and_id) && !self.ok_maybe.is_match(class_and_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_patterns_compile() {
        let patterns = PatternSet::default();
        assert!(patterns.positive.is_match("post-body"));
        assert!(patterns.negative.is_match("site-footer"));
    }

    #[test]
    fn test_ok_maybe_overrides_unlikely() {
        let patterns = PatternSet::default();
        assert!(patterns.is_unlikely("sidebar "));
        assert!(!patterns.is_unlikely("sidebar article"));
        assert!(!patterns.is_unlikely("story "));
    }

    #[test]
    fn test_with_pattern_replaces_slot() {
        let patterns = PatternSet::default().with_pattern("unlikely", "(?i)teaser").unwrap();
        assert!(patterns.is_unlikely("teaser "));
        assert!(!patterns.is_unlikely("sidebar "));
    }

    #[test]
    fn test_with_pattern_rejects_bad_input() {
        assert!(PatternSet::default().with_pattern("positive", "(").is_err());
        assert!(PatternSet::default().with_pattern("nonsense", "a").is_err());
    }

    #[test]
    fn test_videos_pattern() {
        let patterns = PatternSet::default();
        assert!(patterns.videos.is_match("https://www.youtube.com/embed/xyz"));
        assert!(!patterns.videos.is_match("https://ads.example.com/frame"));
    }
}
