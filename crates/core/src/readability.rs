//! The readability pipeline: metadata, normalization, candidate extraction.
//!
//! [`Readability`] owns a [`ReadabilityConfig`] and turns a [`Document`]
//! into an [`Article`]. [`parse`] and [`is_probably_readable`] are the
//! one-call shortcuts.
//!
//! # Example
//!
//! ```rust
//! use readmark_core::{Document, Readability};
//!
//! let html = format!("<html><body><article>{}</article></body></html>", "<p>Some prose, with commas, long enough to be scored.</p>".repeat(20));
//! let doc = Document::parse(&html).unwrap();
//! let article = Readability::new().extract(&doc).unwrap();
//! assert!(article.text_content.contains("Some prose"));
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::article::Article;
use crate::extract::{ExtractConfig, ExtractHints, extract_content};
use crate::parse::Document;
use crate::patterns::PatternSet;
use crate::postprocess::PostProcessConfig;
use crate::preprocess::{PreprocessConfig, preprocess_document};
use crate::visibility::{AlwaysVisible, VisibilityOracle, is_probably_visible};
use crate::{ReadmarkError, Result};

#[cfg(feature = "fetch")]
use crate::fetch::{FetchConfig, fetch_url};

/// Minimum text length of a node counted by [`Readability::is_probably_readable`].
const READABLE_MIN_CONTENT_LENGTH: usize = 140;

/// Score [`Readability::is_probably_readable`] has to exceed.
const READABLE_MIN_SCORE: f64 = 20.0;

/// Configuration for the Readability builder.
///
/// # Example
///
/// ```rust
/// use readmark_core::ReadabilityConfig;
///
/// let config = ReadabilityConfig::builder()
///     .char_threshold(250)
///     .keep_classes(true)
///     .build();
/// assert_eq!(config.char_threshold, 250);
/// ```
#[derive(Debug, Clone)]
pub struct ReadabilityConfig {
    /// Maximum elements to parse (0 = unlimited, default: 0).
    pub max_elems_to_parse: usize,

    /// Number of top candidates to track (default: 5).
    pub nb_top_candidates: usize,

    /// Minimum character count for valid content (default: 500).
    pub char_threshold: usize,

    /// Classes kept when class attributes are stripped; `page` is always kept.
    pub classes_to_preserve: Vec<String>,

    /// Whether to preserve class attributes in output HTML (default: false).
    pub keep_classes: bool,

    /// Skip JSON-LD metadata (default: false).
    pub disable_json_ld: bool,

    /// Siblings scoring at least this fraction of the top candidate are merged (default: 0.2).
    pub sibling_threshold: f64,

    /// Class/id heuristics.
    pub patterns: PatternSet,

    /// Computed-visibility oracle (default: [`AlwaysVisible`]).
    pub visibility: Arc<dyn VisibilityOracle>,
}

impl Default for ReadabilityConfig {
    fn default() -> Self {
        Self {
            max_elems_to_parse: 0,
            nb_top_candidates: 5,
            char_threshold: 500,
            classes_to_preserve: vec!["page".to_string()],
            keep_classes: false,
            disable_json_ld: false,
            sibling_threshold: 0.2,
            patterns: PatternSet::default(),
            visibility: Arc::new(AlwaysVisible),
        }
    }
}

impl ReadabilityConfig {
    /// Creates a new builder for ReadabilityConfig.
    pub fn builder() -> ReadabilityConfigBuilder {
        ReadabilityConfigBuilder::new()
    }

    /// The preserved classes with `page` added when missing.
    pub fn preserved_classes(&self) -> Vec<String> {
        let mut classes = self.classes_to_preserve.clone();
        if !classes.iter().any(|c| c == "page") {
            classes.push("page".to_string());
        }
        classes
    }

    fn extract_config(&self) -> ExtractConfig {
        ExtractConfig {
            nb_top_candidates: self.nb_top_candidates,
            char_threshold: self.char_threshold,
            sibling_threshold: self.sibling_threshold,
            patterns: self.patterns.clone(),
            postprocess: PostProcessConfig {
                classes_to_preserve: self.preserved_classes(),
                keep_classes: self.keep_classes,
            },
        }
    }
}

/// Builder for ReadabilityConfig.
#[derive(Debug, Clone, Default)]
pub struct ReadabilityConfigBuilder {
    config: ReadabilityConfig,
}

impl ReadabilityConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    /// Sets the maximum elements to parse.
    pub fn max_elems_to_parse(mut self, value: usize) -> Self {
        self.config.max_elems_to_parse = value;
        self
    }

    /// Sets the number of top candidates.
    pub fn nb_top_candidates(mut self, value: usize) -> Self {
        self.config.nb_top_candidates = value;
        self
    }

    /// Sets the character threshold.
    pub fn char_threshold(mut self, value: usize) -> Self {
        self.config.char_threshold = value;
        self
    }

    pub fn classes_to_preserve(mut self, value: Vec<String>) -> Self {
        self.config.classes_to_preserve = value;
        self
    }

    /// Sets whether to preserve class attributes in output HTML.
    pub fn keep_classes(mut self, value: bool) -> Self {
        self.config.keep_classes = value;
        self
    }

    pub fn disable_json_ld(mut self, value: bool) -> Self {
        self.config.disable_json_ld = value;
        self
    }

    pub fn sibling_threshold(mut self, value: f64) -> Self {
        self.config.sibling_threshold = value;
        self
    }

    pub fn patterns(mut self, value: PatternSet) -> Self {
        self.config.patterns = value;
        self
    }

    pub fn visibility(mut self, value: Arc<dyn VisibilityOracle>) -> Self {
        self.config.visibility = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ReadabilityConfig {
        self.config
    }
}

/// Main entry point for content extraction.
///
/// A `Readability` holds only configuration; it can be shared across
/// threads and reused for any number of documents.
#[derive(Debug, Clone, Default)]
pub struct Readability {
    config: ReadabilityConfig,
}

impl Readability {
    /// Creates a new Readability instance with default settings.
    pub fn new() -> Self {
        Self { config: ReadabilityConfig::default() }
    }

    /// Creates a new Readability instance with a custom configuration.
    pub fn with_config(config: ReadabilityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReadabilityConfig {
        &self.config
    }

    /// Extracts the article from a parsed document.
    ///
    /// The document is not modified.
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::TooManyElements`] when `max_elems_to_parse`
    /// is exceeded and [`ReadmarkError::NoCandidateFound`] when no attempt
    /// yields enough text.
    pub fn extract(&self, doc: &Document) -> Result<Article> {
        let config = &self.config;

        if config.max_elems_to_parse > 0 {
            let found = doc.tree().element_count();
            if found > config.max_elems_to_parse {
                return Err(ReadmarkError::TooManyElements { found, max: config.max_elems_to_parse });
            }
        }

        let mut metadata = doc.extract_metadata(!config.disable_json_ld);
        let normalized =
            preprocess_document(doc, &PreprocessConfig::default(), &config.patterns, config.visibility.as_ref());

        let hints = ExtractHints {
            title: Some(metadata.title.as_str()).filter(|t| !t.is_empty()),
            has_byline: metadata.byline.is_some(),
        };
        let extracted = extract_content(&normalized, &hints, &config.extract_config())?;
        tracing::debug!(
            attempts = extracted.attempts,
            text_length = extracted.text_length,
            top_score = extracted.top_score,
            "article extracted"
        );

        if metadata.byline.is_none() {
            metadata.byline = extracted.byline;
        }
        metadata.dir = extracted.dir;
        metadata.length = extracted.text_length;

        if metadata.excerpt.is_none() {
            metadata.excerpt = extracted
                .tree
                .elements_by_tag(extracted.root, "p")
                .first()
                .map(|p| extracted.tree.text_content(*p).trim().to_string());
        }

        Ok(Article::new(metadata, extracted.tree, extracted.root, doc.url().map(|u| u.to_string())))
    }

    /// Parses an HTML string and extracts the article.
    pub fn parse(&self, html: &str) -> Result<Article> {
        let doc = Document::parse(html)?;
        self.extract(&doc)
    }

    /// Parses HTML with a known URL (for relative link resolution).
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::InvalidUrl`] if the URL is invalid.
    pub fn parse_with_url(&self, html: &str, url: &str) -> Result<Article> {
        let doc = Document::parse_with_url(html, url)?;
        self.extract(&doc)
    }

    /// Fetches a page and extracts its article.
    #[cfg(feature = "fetch")]
    pub async fn fetch_and_parse(&self, url: &str, fetch_config: &FetchConfig) -> Result<Article> {
        let html = fetch_url(url, fetch_config).await?;
        self.parse_with_url(&html, url)
    }

    /// Quick check whether the document has enough prose to be worth
    /// extracting, without running extraction.
    ///
    /// Visible `p` and `pre` nodes, and `div`s holding a `br`, contribute
    /// `sqrt(len - 140)` each when their text reaches 140 characters.
    pub fn is_probably_readable(&self, doc: &Document) -> bool {
        let tree = doc.tree();
        let patterns = &self.config.patterns;

        let mut nodes = doc.elements_by_tag("p");
        nodes.extend(doc.elements_by_tag("pre"));
        nodes.extend(doc.elements_by_tag("br").into_iter().filter_map(|br| tree.parent(br)).filter(|p| tree.has_tag(*p, "div")));

        let mut seen = HashSet::new();
        let mut score = 0.0;
        for node in nodes {
            if !seen.insert(node) || !is_probably_visible(tree, node, self.config.visibility.as_ref()) {
                continue;
            }
            if patterns.is_unlikely(&tree.class_and_id(node)) {
                continue;
            }
            if tree.has_tag(node, "p") && tree.ancestors(node).any(|a| tree.has_tag(a, "li")) {
                continue;
            }

            let length = tree.text_content(node).trim().chars().count();
            if length < READABLE_MIN_CONTENT_LENGTH {
                continue;
            }
            score += ((length - READABLE_MIN_CONTENT_LENGTH) as f64).sqrt();
            if score > READABLE_MIN_SCORE {
                return true;
            }
        }
        false
    }
}

/// Convenience function for one-liner extraction with defaults.
pub fn parse(html: &str) -> Result<Article> {
    Readability::new().parse(html)
}

/// Convenience function for one-liner with URL context.
///
/// # Errors
///
/// Returns [`ReadmarkError::InvalidUrl`] if the URL is invalid.
pub fn parse_with_url(html: &str, url: &str) -> Result<Article> {
    Readability::new().parse_with_url(html, url)
}

/// Convenience function for quick readability check.
///
/// Unparseable input is never readable.
pub fn is_probably_readable(html: &str) -> bool {
    Document::parse(html).is_ok_and(|doc| Readability::new().is_probably_readable(&doc))
}

/// Fetch and parse from URL with default configurations.
///
/// # Example
///
/// ```no_run
/// use readmark_core::fetch_and_parse;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let article = fetch_and_parse("https://example.com/article").await?;
///     println!("Title: {}", article.metadata.title);
///     Ok(())
/// }
/// ```
#[cfg(feature = "fetch")]
pub async fn fetch_and_parse(url: &str) -> Result<Article> {
    Readability::new().fetch_and_parse(url, &FetchConfig::default()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    const ARTICLE_HTML: &str = r##"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <title>Sourdough at Home</title>
            <meta name="author" content="Ines Alvarez">
        </head>
        <body>
            <nav class="menu"><a href="/">Home</a> <a href="/recipes">Recipes</a></nav>
            <article class="post-body">
                <h1>Sourdough at Home</h1>
                <p>Sourdough starts with a starter, a living culture of flour and water that ferments for several days before it is ready to raise a loaf, and most of the skill lies in reading how lively it has become.</p>
                <p>Feed the starter twice a day, keep it somewhere warm, and watch for bubbles, a domed top, and a sour smell; once it doubles within a few hours of feeding, it is strong enough to leaven a dough.</p>
                <p>Shaping matters more than most recipes admit, because a loose boule spreads in the oven, while a tight one holds its height, opens along the score, and bakes into a crust that crackles as it cools.</p>
            </article>
            <footer class="footer">Copyright notice</footer>
        </body>
        </html>
    "##;

    #[test]
    fn test_readability_config_default() {
        let config = ReadabilityConfig::default();
        assert_eq!(config.char_threshold, 500);
        assert_eq!(config.nb_top_candidates, 5);
        assert_eq!(config.max_elems_to_parse, 0);
        assert_eq!(config.classes_to_preserve, vec!["page".to_string()]);
        assert_eq!(config.sibling_threshold, 0.2);
        assert!(!config.keep_classes);
        assert!(!config.disable_json_ld);
    }

    #[test]
    fn test_readability_config_builder() {
        let config = ReadabilityConfig::builder()
            .char_threshold(1000)
            .nb_top_candidates(10)
            .max_elems_to_parse(500)
            .classes_to_preserve(vec!["caption".to_string()])
            .keep_classes(true)
            .disable_json_ld(true)
            .sibling_threshold(0.3)
            .build();

        assert_eq!(config.char_threshold, 1000);
        assert_eq!(config.nb_top_candidates, 10);
        assert_eq!(config.max_elems_to_parse, 500);
        assert!(config.keep_classes);
        assert!(config.disable_json_ld);
        assert_eq!(config.sibling_threshold, 0.3);
        assert_eq!(config.preserved_classes(), vec!["caption".to_string(), "page".to_string()]);
    }

    #[test]
    fn test_parse_article() {
        let article = Readability::new().parse(ARTICLE_HTML).unwrap();

        assert_eq!(article.metadata.title, "Sourdough at Home");
        assert_eq!(article.metadata.byline.as_deref(), Some("Ines Alvarez"));
        assert_eq!(article.metadata.lang.as_deref(), Some("en"));
        assert!(article.metadata.length >= 500);
        assert!(article.text_content.contains("Shaping matters"));
        assert!(!article.text_content.contains("Copyright"));
        assert!(!article.text_content.contains("Recipes"));
        assert!(article.content_html().contains(r#"id="readability-page-1""#));
        assert!(article.word_count > 50);
    }

    #[test]
    fn test_excerpt_falls_back_to_first_paragraph() {
        let article = Readability::new().parse(ARTICLE_HTML).unwrap();
        let excerpt = article.metadata.excerpt.unwrap();
        assert!(excerpt.starts_with("Sourdough starts with a starter"));
    }

    #[test]
    fn test_parse_with_url() {
        let article = parse_with_url(ARTICLE_HTML, "https://example.com/article").unwrap();
        assert_eq!(article.source_url.as_deref(), Some("https://example.com/article"));
    }

    #[test]
    fn test_parse_with_invalid_url() {
        assert!(matches!(parse_with_url(ARTICLE_HTML, "not a url"), Err(ReadmarkError::InvalidUrl(_))));
    }

    #[test]
    fn test_too_many_elements() {
        let reader = Readability::with_config(ReadabilityConfig::builder().max_elems_to_parse(5).build());
        assert!(matches!(reader.parse(ARTICLE_HTML), Err(ReadmarkError::TooManyElements { max: 5, .. })));
    }

    #[test]
    fn test_no_candidate_found() {
        let html = r#"<html><body><nav><a href="/">Home</a><a href="/shop">Shop</a></nav></body></html>"#;
        assert!(matches!(parse(html), Err(ReadmarkError::NoCandidateFound { threshold: 500, .. })));
    }

    #[test]
    fn test_extract_leaves_document_untouched() {
        let doc = Document::parse(ARTICLE_HTML).unwrap();
        let before = doc.clone();
        let _ = Readability::new().extract(&doc).unwrap();
        assert_eq!(doc, before);
    }

    #[test]
    fn test_is_probably_readable_true() {
        assert!(is_probably_readable(ARTICLE_HTML));
    }

    #[test]
    fn test_is_probably_readable_false() {
        let html = r##"
            <html>
            <body>
                <nav><a href="/">Home</a> <a href="/shop">Shop</a></nav>
                <p>Opening hours: nine to five.</p>
            </body>
            </html>
        "##;
        assert!(!is_probably_readable(html));
    }

    #[test]
    fn test_is_probably_readable_skips_hidden_and_list_paragraphs() {
        let long = "word ".repeat(80);
        let html = format!(
            r#"<body><p hidden>{long}</p><ul><li><p>{long}</p></li></ul><p class="sidebar">{long}</p></body>"#
        );
        assert!(!is_probably_readable(&html));
    }

    #[cfg(feature = "fetch")]
    #[test]
    fn test_fetch_and_parse_invalid_url() {
        let result = std::thread::spawn(move || {
            tokio::runtime::Runtime::new().unwrap().block_on(async { fetch_and_parse("not-a-url").await })
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(ReadmarkError::InvalidUrl(_))));
    }
}
