//! Article metadata from JSON-LD, `<meta>` tags and the document title.
//!
//! Sources are consulted in priority order: a schema.org article in JSON-LD,
//! then Dublin Core, Open Graph, Twitter and plain `<meta name>` values, then
//! heuristics over `<title>` and the headings.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use crate::Document;

/// Represents all extracted metadata from a document
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleMetadata {
    /// Always populated; falls back to the `<title>` element (possibly empty).
    pub title: String,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub published_time: Option<String>,
    /// Text direction of the content (`ltr`/`rtl`).
    pub dir: Option<String>,
    pub lang: Option<String>,
    /// Characters of extracted text.
    pub length: usize,
}

/// Fields read from a schema.org article object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLdMetadata {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub excerpt: Option<String>,
    pub site_name: Option<String>,
    pub date_published: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JsonLdObject {
    #[serde(rename = "@context", default)]
    context: Option<Value>,
    #[serde(rename = "@type", default)]
    kind: Option<Value>,
    #[serde(rename = "@graph", default)]
    graph: Option<Vec<Value>>,
    #[serde(default)]
    name: Option<Value>,
    #[serde(default)]
    headline: Option<Value>,
    #[serde(default)]
    author: Option<Value>,
    #[serde(default)]
    description: Option<Value>,
    #[serde(default)]
    publisher: Option<Value>,
    #[serde(rename = "datePublished", default)]
    date_published: Option<Value>,
}

static ARTICLE_TYPES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^Article|AdvertiserContentArticle|NewsArticle|AnalysisNewsArticle|AskPublicNewsArticle|BackgroundNewsArticle|OpinionNewsArticle|ReportageNewsArticle|ReviewNewsArticle|Report|SatiricalArticle|ScholarlyArticle|MedicalScholarlyArticle|SocialMediaPosting|BlogPosting|LiveBlogPosting|DiscussionForumPosting|TechArticle|APIReference$",
    )
    .expect("ARTICLE_TYPES should compile")
});

static SCHEMA_ORG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://schema\.org/?$").expect("SCHEMA_ORG should compile"));

static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*<!\[CDATA\[|\]\]>\s*$").expect("CDATA should compile"));

static META_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*(article|dc|dcterm|og|twitter)\s*:\s*(author|creator|description|published_time|title|site_name)\s*")
        .expect("META_PROPERTY should compile")
});

static META_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(?:(dc|dcterm|og|twitter|parsely|weibo:(article|webpage))\s*[-\.:]\s*)?(author|creator|pub-date|description|title|site_name)\s*$",
    )
    .expect("META_NAME should compile")
});

static TITLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" [\|\-\\/>»] ").expect("TITLE_SEPARATOR should compile"));

static HIERARCHICAL_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" [\\/>»] ").expect("HIERARCHICAL_SEPARATOR should compile"));

static LEADING_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\|\-\\/>»]*[\|\-\\/>»]").expect("LEADING_SEGMENT should compile"));

static SEPARATOR_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\|\-\\/>»]+").expect("SEPARATOR_RUN should compile"));

static NORMALIZE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").expect("NORMALIZE should compile"));

static TOKENIZE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W+").expect("TOKENIZE should compile"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)&(quot|amp|apos|lt|gt);|&#(?:x([0-9a-f]+)|([0-9]+));").expect("ENTITY should compile")
});

static WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[\w'-]+\b").expect("WORD should compile"));

/// Similarity of `b` to `a` from their word tokens, between 0 and 1.
///
/// Measures how much of `b` is made of tokens that also occur in `a`.
pub fn text_similarity(a: &str, b: &str) -> f64 {
    let tokenize = |s: &str| -> Vec<String> {
        TOKENIZE.split(&s.to_lowercase()).filter(|t| !t.is_empty()).map(str::to_string).collect()
    };
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }
    let unique_b: Vec<&str> = tokens_b.iter().filter(|t| !tokens_a.contains(t)).map(String::as_str).collect();
    let distance = unique_b.join(" ").chars().count() as f64 / tokens_b.join(" ").chars().count() as f64;
    1.0 - distance
}

/// Count words in text, handling various whitespace and punctuation patterns
pub fn count_words(text: &str) -> usize {
    WORD.find_iter(text).count()
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count().max(1)
}

/// Decodes the handful of entities that survive in JSON-LD strings.
fn unescape_html_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &regex::Captures<'_>| {
            if let Some(named) = caps.get(1) {
                return match named.as_str().to_ascii_lowercase().as_str() {
                    "quot" => "\"",
                    "amp" => "&",
                    "apos" => "'",
                    "lt" => "<",
                    _ => ">",
                }
                .to_string();
            }
            let code = match (caps.get(2), caps.get(3)) {
                (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
                (_, Some(dec)) => dec.as_str().parse::<u32>().ok(),
                _ => None,
            };
            code.and_then(char::from_u32).unwrap_or('\u{FFFD}').to_string()
        })
        .into_owned()
}

fn string_field(value: &Option<Value>) -> Option<String> {
    value.as_ref().and_then(Value::as_str).map(|s| unescape_html_entities(s.trim()))
}

fn is_article_type(kind: Option<&Value>) -> bool {
    match kind {
        Some(Value::String(s)) => ARTICLE_TYPES.is_match(s),
        Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).any(|s| ARTICLE_TYPES.is_match(s)),
        _ => false,
    }
}

fn is_schema_org(context: Option<&Value>) -> bool {
    match context {
        Some(Value::String(s)) => SCHEMA_ORG.is_match(s),
        Some(Value::Object(map)) => map.get("@vocab").and_then(Value::as_str).is_some_and(|s| SCHEMA_ORG.is_match(s)),
        _ => false,
    }
}

/// Extract author name from JSON-LD author field
/// Handles both object and array formats
fn author_from_json_ld(author: &Value) -> Option<String> {
    if let Some(name) = author.get("name").and_then(Value::as_str) {
        return Some(name.trim().to_string());
    }

    if let Some(list) = author.as_array()
        && list.first().and_then(|a| a.get("name")).and_then(Value::as_str).is_some()
    {
        let names: Vec<&str> = list.iter().filter_map(|a| a.get("name").and_then(Value::as_str)).map(str::trim).collect();
        return Some(names.join(", "));
    }

    None
}

impl Document {
    /// Reads the first schema.org article from `application/ld+json` scripts.
    ///
    /// A top-level array is searched for an article-typed entry; an untyped
    /// object with an `@graph` is searched the same way. Scripts that fail to
    /// parse are skipped.
    pub fn extract_json_ld(&self) -> Option<JsonLdMetadata> {
        for script in self.elements_by_tag("script") {
            if self.tree().attr(script, "type") != Some("application/ld+json") {
                continue;
            }
            let text = self.tree().text_content(script);
            let content = CDATA.replace_all(&text, "");

            let value: Value = match serde_json::from_str(&content) {
                Ok(value) => value,
                Err(err) => {
                    tracing::debug!(%err, "skipping unparseable JSON-LD");
                    continue;
                }
            };

            let value = match value {
                Value::Array(items) => {
                    match items.into_iter().find(|item| is_article_type(item.get("@type"))) {
                        Some(item) => item,
                        None => continue,
                    }
                }
                other => other,
            };

            let Ok(mut article) = serde_json::from_value::<JsonLdObject>(value) else {
                continue;
            };
            if !is_schema_org(article.context.as_ref()) {
                continue;
            }

            if article.kind.is_none()
                && let Some(graph) = article.graph.take()
                && let Some(found) = graph.into_iter().find(|item| is_article_type(item.get("@type")))
                && let Ok(inner) = serde_json::from_value::<JsonLdObject>(found)
            {
                article = JsonLdObject { context: article.context, ..inner };
            }
            if !is_article_type(article.kind.as_ref()) {
                continue;
            }

            return Some(self.json_ld_fields(&article));
        }
        None
    }

    fn json_ld_fields(&self, article: &JsonLdObject) -> JsonLdMetadata {
        let name = string_field(&article.name);
        let headline = string_field(&article.headline);

        let title = match (name, headline) {
            (Some(name), Some(headline)) if name != headline => {
                let title = self.article_title();
                let name_matches = text_similarity(&name, &title) > 0.75;
                let headline_matches = text_similarity(&headline, &title) > 0.75;
                if headline_matches && !name_matches { Some(headline) } else { Some(name) }
            }
            (Some(name), _) => Some(name),
            (None, headline) => headline,
        };

        JsonLdMetadata {
            title,
            byline: article.author.as_ref().and_then(author_from_json_ld).map(|s| unescape_html_entities(&s)),
            excerpt: string_field(&article.description),
            site_name: article
                .publisher
                .as_ref()
                .and_then(|p| p.get("name"))
                .and_then(Value::as_str)
                .map(|s| unescape_html_entities(s.trim())),
            date_published: string_field(&article.date_published),
        }
    }

    /// `<meta>` values keyed by normalized property or name
    /// (`og:title`, `dc:creator`, `description`, ...).
    pub fn meta_values(&self) -> HashMap<String, String> {
        let mut values = HashMap::new();
        let tree = self.tree();

        for meta in self.elements_by_tag("meta") {
            let Some(content) = tree.attr(meta, "content").map(str::trim).filter(|c| !c.is_empty()) else {
                continue;
            };

            let mut matched = false;
            if let Some(property) = tree.attr(meta, "property")
                && let Some(found) = META_PROPERTY.find(property)
            {
                matched = true;
                let key: String = found.as_str().to_lowercase().chars().filter(|c| !c.is_whitespace()).collect();
                values.insert(key, content.to_string());
            }

            if !matched
                && let Some(name) = tree.attr(meta, "name")
                && META_NAME.is_match(name)
            {
                let key: String =
                    name.to_lowercase().chars().filter(|c| !c.is_whitespace()).collect::<String>().replace('.', ":");
                values.insert(key, content.to_string());
            }
        }

        values
    }

    /// Title from `<title>`, with site names and section prefixes cut away.
    ///
    /// Splits on ` | `, ` - `, ` / `, ` > ` or ` » ` and keeps the part before
    /// the last separator; on `: ` it keeps the part after the colon unless a
    /// heading repeats the full title. Very long or short titles defer to a
    /// lone `<h1>`. Results of four words or fewer revert to the original.
    pub fn article_title(&self) -> String {
        let original = self.title().unwrap_or_default();
        let mut current = original.clone();
        let mut hierarchical = false;

        if TITLE_SEPARATOR.is_match(&current) {
            hierarchical = HIERARCHICAL_SEPARATOR.is_match(&current);
            if let Some(last) = TITLE_SEPARATOR.find_iter(&original).last() {
                current = original[..last.start()].to_string();
            }
            if word_count(&current) < 3 {
                current = LEADING_SEGMENT.replace(&original, "").into_owned();
            }
        } else if current.contains(": ") {
            let tree = self.tree();
            let trimmed = current.trim();
            let repeated = self
                .elements_by_tag("h1")
                .into_iter()
                .chain(self.elements_by_tag("h2"))
                .any(|h| tree.text_content(h).trim() == trimmed);
            if !repeated {
                let after_last = original.rfind(':').map_or(original.as_str(), |i| &original[i + 1..]);
                current = after_last.to_string();
                if word_count(&current) < 3 {
                    let after_first = original.find(':').map_or(original.as_str(), |i| &original[i + 1..]);
                    current = after_first.to_string();
                } else if original.find(':').is_some_and(|i| word_count(&original[..i]) > 5) {
                    current = original.clone();
                }
            }
        } else {
            let length = current.chars().count();
            if length > 150 || length < 15 {
                let headings = self.elements_by_tag("h1");
                if headings.len() == 1 {
                    current = self.tree().text_content(headings[0]);
                }
            }
        }

        let current = NORMALIZE.replace_all(current.trim(), " ").into_owned();
        let words = word_count(&current);
        let original_words = word_count(&SEPARATOR_RUN.replace_all(&original, ""));
        if words <= 4 && (!hierarchical || words + 1 != original_words) {
            return original;
        }
        current
    }

    /// Metadata from JSON-LD (unless disabled), `<meta>` tags and the title.
    ///
    /// `dir`, `length` and the excerpt fallback depend on the extracted
    /// content and are filled in by the caller.
    pub fn extract_metadata(&self, use_json_ld: bool) -> ArticleMetadata {
        let json_ld = if use_json_ld { self.extract_json_ld().unwrap_or_default() } else { JsonLdMetadata::default() };
        let values = self.meta_values();
        let pick = |keys: &[&str]| keys.iter().find_map(|key| values.get(*key).cloned());

        let title = json_ld
            .title
            .or_else(|| {
                pick(&[
                    "dc:title",
                    "dcterm:title",
                    "og:title",
                    "weibo:article:title",
                    "weibo:webpage:title",
                    "title",
                    "twitter:title",
                    "parsely-title",
                ])
            })
            .unwrap_or_else(|| self.article_title());

        let article_author = values.get("article:author").filter(|a| url::Url::parse(a).is_err()).cloned();
        let byline = json_ld
            .byline
            .or_else(|| pick(&["dc:creator", "dcterm:creator", "author", "parsely-author"]))
            .or(article_author);

        let excerpt = json_ld.excerpt.or_else(|| {
            pick(&[
                "dc:description",
                "dcterm:description",
                "og:description",
                "weibo:article:description",
                "weibo:webpage:description",
                "description",
                "twitter:description",
            ])
        });

        ArticleMetadata {
            title,
            byline,
            excerpt,
            site_name: json_ld.site_name.or_else(|| pick(&["og:site_name"])),
            published_time: json_ld.date_published.or_else(|| pick(&["article:published_time", "parsely-pub-date"])),
            dir: None,
            lang: self.lang(),
            length: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HTML_WITH_META: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Test Page Title</title>
            <meta name="author" content="John Doe">
            <meta name="description" content="This is a test description of the page.">
            <meta property="og:title" content="OG Title">
            <meta property="og:description" content="OG Description">
            <meta property="og:site_name" content="Example Site">
            <meta property="article:published_time" content="2024-01-15T10:30:00Z">
            <script type="application/ld+json">
            {
                "@context": "https://schema.org",
                "@type": "NewsArticle",
                "headline": "JSON-LD Headline",
                "author": {
                    "@type": "Person",
                    "name": "Jane Smith"
                },
                "datePublished": "2024-01-15T10:30:00Z",
                "description": "JSON-LD Description &amp; more",
                "publisher": {
                    "@type": "Organization",
                    "name": "JSON-LD Publisher"
                }
            }
            </script>
        </head>
        <body>
            <h1>Main Heading</h1>
            <p>This is the first paragraph of the content.</p>
        </body>
        </html>
    "#;

    const HTML_WITHOUT_META: &str = r#"
        <!DOCTYPE html>
        <html lang="en">
        <head>
            <meta charset="UTF-8">
            <title>Simple Page About Many Interesting Things</title>
        </head>
        <body>
            <h1>Heading</h1>
            <p>This is a paragraph with some text content.</p>
        </body>
        </html>
    "#;

    #[test]
    fn test_json_ld_takes_priority() {
        let doc = Document::parse(HTML_WITH_META).unwrap();
        let metadata = doc.extract_metadata(true);
        assert_eq!(metadata.title, "JSON-LD Headline");
        assert_eq!(metadata.byline.as_deref(), Some("Jane Smith"));
        assert_eq!(metadata.excerpt.as_deref(), Some("JSON-LD Description & more"));
        assert_eq!(metadata.site_name.as_deref(), Some("JSON-LD Publisher"));
        assert_eq!(metadata.published_time.as_deref(), Some("2024-01-15T10:30:00Z"));
        assert_eq!(metadata.lang.as_deref(), Some("en"));
    }

    #[test]
    fn test_meta_tags_when_json_ld_disabled() {
        let doc = Document::parse(HTML_WITH_META).unwrap();
        let metadata = doc.extract_metadata(false);
        assert_eq!(metadata.title, "OG Title");
        assert_eq!(metadata.byline.as_deref(), Some("John Doe"));
        assert_eq!(metadata.excerpt.as_deref(), Some("OG Description"));
        assert_eq!(metadata.site_name.as_deref(), Some("Example Site"));
    }

    #[test]
    fn test_title_fallback() {
        let doc = Document::parse(HTML_WITHOUT_META).unwrap();
        let metadata = doc.extract_metadata(true);
        assert_eq!(metadata.title, "Simple Page About Many Interesting Things");
        assert_eq!(metadata.byline, None);
    }

    #[test]
    fn test_json_ld_graph_and_author_list() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@context": {"@vocab": "http://schema.org/"}, "@graph": [
                {"@type": "WebSite", "name": "Site"},
                {"@type": "BlogPosting", "headline": "Post", "author": [{"name": "A"}, {"name": "B"}]}
            ]}
        </script></head><body></body></html>"#;
        let doc = Document::parse(html).unwrap();
        let json_ld = doc.extract_json_ld().unwrap();
        assert_eq!(json_ld.title.as_deref(), Some("Post"));
        assert_eq!(json_ld.byline.as_deref(), Some("A, B"));
    }

    #[test]
    fn test_json_ld_requires_schema_org_context() {
        let html = r#"<html><head><script type="application/ld+json">
            {"@context": "https://example.com", "@type": "Article", "headline": "Nope"}
        </script></head><body></body></html>"#;
        let doc = Document::parse(html).unwrap();
        assert!(doc.extract_json_ld().is_none());
    }

    #[test]
    fn test_invalid_json_ld_is_skipped() {
        let html = r#"<html><head><script type="application/ld+json">{ not json</script></head><body></body></html>"#;
        let doc = Document::parse(html).unwrap();
        assert!(doc.extract_json_ld().is_none());
    }

    #[rstest]
    #[case("Understanding Ownership and Borrowing in Rust | The Example Blog", "Understanding Ownership and Borrowing in Rust")]
    #[case("Example News: Markets rally after long weekend of talks", "Markets rally after long weekend of talks")]
    #[case("Short", "Short")]
    #[case("Tiny Post | Blog", "Tiny Post | Blog")]
    #[case("Getting started with the toolkit » Docs", "Getting started with the toolkit")]
    fn test_article_title(#[case] title: &str, #[case] expected: &str) {
        let html = format!("<html><head><title>{title}</title></head><body></body></html>");
        let doc = Document::parse(&html).unwrap();
        assert_eq!(doc.article_title(), expected);
    }

    #[test]
    fn test_article_title_uses_single_h1_for_short_titles() {
        let html = "<html><head><title>Home</title></head><body><h1>A Much Longer Descriptive Heading</h1></body></html>";
        let doc = Document::parse(html).unwrap();
        assert_eq!(doc.article_title(), "A Much Longer Descriptive Heading");
    }

    #[test]
    fn test_text_similarity() {
        assert_eq!(text_similarity("Hello World", "hello world"), 1.0);
        assert_eq!(text_similarity("", "anything"), 0.0);
        assert!(text_similarity("rust ownership guide", "a guide to rust ownership") > 0.5);
        assert!(text_similarity("rust", "python tutorial") < 0.1);
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words("Hello, world! It's a well-known test."), 6);
        assert_eq!(count_words(""), 0);
    }
}
