use crate::metadata::ArticleMetadata;

/// Optional front-matter keys, emitted in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatterExtras {
    pub byline: Option<String>,
    pub published: Option<String>,
    pub site: Option<String>,
    pub excerpt: Option<String>,
}

impl From<&ArticleMetadata> for FrontMatterExtras {
    fn from(metadata: &ArticleMetadata) -> Self {
        Self {
            byline: metadata.byline.clone(),
            published: metadata.published_time.clone(),
            site: metadata.site_name.clone(),
            excerpt: metadata.excerpt.clone(),
        }
    }
}

/// A Markdown body with its YAML front matter.
///
/// Built once per conversion; the accessors are read-only.
///
/// # Example
///
/// ```rust
/// use readmark_core::MarkdownDocument;
///
/// let doc = MarkdownDocument::new("Title", "https://example.com/post", "Body");
/// assert_eq!(doc.render(), "---\ntitle: \"Title\"\nsource: \"https://example.com/post\"\n---\n\nBody\n");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownDocument {
    title: String,
    source: String,
    body: String,
    extras: FrontMatterExtras,
    include_metadata: bool,
}

impl MarkdownDocument {
    pub fn new(title: impl Into<String>, source: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            source: source.into(),
            body: body.into(),
            extras: FrontMatterExtras::default(),
            include_metadata: false,
        }
    }

    /// Attaches the optional front-matter keys and turns them on.
    pub fn with_extras(mut self, extras: FrontMatterExtras) -> Self {
        self.extras = extras;
        self.include_metadata = true;
        self
    }

    /// Switches the optional keys on or off without dropping them.
    pub fn include_metadata(mut self, include: bool) -> Self {
        self.include_metadata = include;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn extras(&self) -> &FrontMatterExtras {
        &self.extras
    }

    /// True when the body holds no text.
    pub fn is_empty(&self) -> bool {
        self.body.trim().is_empty()
    }

    /// Front matter block including the closing `---` line.
    pub fn front_matter(&self) -> String {
        let mut out = String::from("---\n");
        push_key(&mut out, "title", &self.title);
        push_key(&mut out, "source", &self.source);

        if self.include_metadata {
            let optional = [
                ("byline", &self.extras.byline),
                ("published", &self.extras.published),
                ("site", &self.extras.site),
                ("excerpt", &self.extras.excerpt),
            ];
            for (key, value) in optional {
                if let Some(value) = value {
                    push_key(&mut out, key, value);
                }
            }
        }

        out.push_str("---\n");
        out
    }

    /// Front matter, a blank line, the body and a final newline.
    pub fn render(&self) -> String {
        format!("{}\n{}\n", self.front_matter(), self.body)
    }
}

fn push_key(out: &mut String, key: &str, value: &str) {
    out.push_str(key);
    out.push_str(": ");
    out.push_str(&quote(value));
    out.push('\n');
}

/// Double-quoted scalar on a single line.
fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"").replace(['\r', '\n'], " ");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_render_minimal_document() {
        let doc = MarkdownDocument::new("Hello", "page.html", "# Hello\n\nWorld");
        assert_eq!(doc.render(), "---\ntitle: \"Hello\"\nsource: \"page.html\"\n---\n\n# Hello\n\nWorld\n");
    }

    #[rstest]
    #[case(r#"Say "hi""#, r#""Say \"hi\"""#)]
    #[case(r"C:\docs", r#""C:\\docs""#)]
    #[case("two\nlines", r#""two lines""#)]
    #[case("plain", r#""plain""#)]
    fn test_quote(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(quote(input), expected);
    }

    #[test]
    fn test_extras_are_ordered_and_optional() {
        let metadata = ArticleMetadata {
            title: "T".to_string(),
            byline: Some("Ada".to_string()),
            excerpt: Some("Short".to_string()),
            site_name: None,
            published_time: Some("2024-01-15".to_string()),
            ..Default::default()
        };
        let doc = MarkdownDocument::new("T", "s", "b").with_extras(FrontMatterExtras::from(&metadata));
        assert_eq!(
            doc.front_matter(),
            "---\ntitle: \"T\"\nsource: \"s\"\nbyline: \"Ada\"\npublished: \"2024-01-15\"\nexcerpt: \"Short\"\n---\n"
        );
    }

    #[test]
    fn test_extras_hidden_unless_included() {
        let extras = FrontMatterExtras { byline: Some("Ada".to_string()), ..Default::default() };
        let doc = MarkdownDocument::new("T", "s", "b").with_extras(extras).include_metadata(false);
        assert!(!doc.render().contains("byline"));
        assert_eq!(doc.extras().byline.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_is_empty() {
        assert!(MarkdownDocument::new("T", "s", "  \n").is_empty());
        assert!(!MarkdownDocument::new("T", "s", "text").is_empty());
    }
}
