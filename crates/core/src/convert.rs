//! End-to-end conversion of a document to a front-matter Markdown document.
//!
//! [`Converter`] runs the readability pipeline and the serializer. When the
//! pipeline finds no candidate, or its Markdown comes out empty, the
//! fallback extractor runs on the original document instead.

use crate::article::Article;
use crate::dom_tree::DomTree;
use crate::fallback::{clean_candidate, fallback_markdown, find_best_candidate};
use crate::formatters::markdown::{FrontMatterExtras, MarkdownDocument};
use crate::parse::Document;
use crate::readability::{Readability, ReadabilityConfig};
use crate::serializer::{Filter, MarkdownOptions, MarkdownSerializer, Rule};
use crate::{ReadmarkError, Result};

/// Which path produced the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Readability,
    Fallback,
    /// Neither path found any text.
    Empty,
}

/// A finished conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    pub document: MarkdownDocument,
    pub origin: Origin,
}

impl Converted {
    pub fn is_empty(&self) -> bool {
        self.origin == Origin::Empty
    }
}

/// Serializer with the given options plus the embed rule used for pages.
///
/// Surviving `iframe`s (video players) become `[iframe: src]` lines.
pub fn page_serializer(options: MarkdownOptions) -> MarkdownSerializer {
    MarkdownSerializer::with_options(options).with_rule(iframe_rule())
}

fn iframe_rule() -> Rule {
    Rule::new("iframe", Filter::tag("iframe"), |_, tree, node, _| {
        format!("\n[iframe: {}]\n", tree.attr(node, "src").unwrap_or_default())
    })
}

/// Extraction plus serialization with a fallback.
///
/// # Example
///
/// ```rust
/// use readmark_core::{Converter, Document, Origin};
///
/// let doc = Document::parse("<html><body><div class=\"post\"><p>Short note.</p></div></body></html>").unwrap();
/// let converted = Converter::new().convert(&doc, "note.html").unwrap();
/// assert_eq!(converted.origin, Origin::Fallback);
/// assert_eq!(converted.document.body(), "Short note.");
/// ```
#[derive(Debug, Clone)]
pub struct Converter {
    readability: Readability,
    serializer: MarkdownSerializer,
    include_metadata: bool,
    fallback_only: bool,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new()
    }
}

impl Converter {
    pub fn new() -> Self {
        Self {
            readability: Readability::new(),
            serializer: page_serializer(MarkdownOptions::default()),
            include_metadata: false,
            fallback_only: false,
        }
    }

    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    pub fn serializer(&self) -> &MarkdownSerializer {
        &self.serializer
    }

    /// Converts `doc`, recording `source` in the front matter.
    ///
    /// The document is not modified.
    ///
    /// # Errors
    ///
    /// Fails only when the Markdown serializer fails or the document exceeds
    /// the configured element budget; every other extraction failure falls
    /// back.
    pub fn convert(&self, doc: &Document, source: &str) -> Result<Converted> {
        if let Some(article) = self.try_readability(doc)? {
            let document = article.to_document(&self.serializer, Some(source))?.include_metadata(self.include_metadata);
            if !document.is_empty() {
                return Ok(Converted { document, origin: Origin::Readability });
            }
            tracing::debug!("readability output is empty, running fallback");
        }

        let config = self.readability.config();
        let body = fallback_markdown(doc, config.visibility.as_ref());
        let origin = if body.trim().is_empty() { Origin::Empty } else { Origin::Fallback };

        let metadata = doc.extract_metadata(!config.disable_json_ld);
        let document = MarkdownDocument::new(&metadata.title, source, body)
            .with_extras(FrontMatterExtras::from(&metadata))
            .include_metadata(self.include_metadata);

        Ok(Converted { document, origin })
    }

    /// The content tree that [`Converter::convert`] would serialize, for
    /// HTML and plain-text output.
    ///
    /// # Errors
    ///
    /// Same as [`Converter::convert`].
    pub fn extract(&self, doc: &Document) -> Result<(Article, Origin)> {
        if let Some(article) = self.try_readability(doc)? {
            if !article.text_content.is_empty() {
                return Ok((article, Origin::Readability));
            }
            tracing::debug!("readability content is empty, running fallback");
        }

        let config = self.readability.config();
        let metadata = doc.extract_metadata(!config.disable_json_ld);
        let source_url = doc.url().map(|u| u.to_string());
        let article = match find_best_candidate(doc, config.visibility.as_ref()) {
            Some(candidate) => {
                let (content, root) = clean_candidate(doc.tree(), candidate);
                Article::new(metadata, content, root, source_url)
            }
            None => Article::new(metadata, DomTree::new(), 0, source_url),
        };
        let origin = if article.text_content.is_empty() { Origin::Empty } else { Origin::Fallback };
        Ok((article, origin))
    }

    /// The readability result, or `None` when the fallback should run.
    fn try_readability(&self, doc: &Document) -> Result<Option<Article>> {
        if self.fallback_only {
            return Ok(None);
        }
        match self.readability.extract(doc) {
            Ok(article) => Ok(Some(article)),
            Err(ReadmarkError::NoCandidateFound { text_length, threshold }) => {
                tracing::debug!(text_length, threshold, "no candidate found, running fallback");
                Ok(None)
            }
            Err(err @ ReadmarkError::TooManyElements { .. }) => Err(err),
            Err(err) => {
                tracing::warn!(%err, "extraction failed, running fallback");
                Ok(None)
            }
        }
    }
}

/// Builder for [`Converter`].
#[derive(Debug, Clone, Default)]
pub struct ConverterBuilder {
    readability: ReadabilityConfig,
    options: MarkdownOptions,
    include_metadata: bool,
    fallback_only: bool,
}

impl ConverterBuilder {
    pub fn readability(mut self, config: ReadabilityConfig) -> Self {
        self.readability = config;
        self
    }

    pub fn options(mut self, options: MarkdownOptions) -> Self {
        self.options = options;
        self
    }

    /// Emit byline, published date, site and excerpt in the front matter.
    pub fn include_metadata(mut self, value: bool) -> Self {
        self.include_metadata = value;
        self
    }

    /// Skip the readability pipeline entirely.
    pub fn fallback_only(mut self, value: bool) -> Self {
        self.fallback_only = value;
        self
    }

    pub fn build(self) -> Converter {
        Converter {
            readability: Readability::with_config(self.readability),
            serializer: page_serializer(self.options),
            include_metadata: self.include_metadata,
            fallback_only: self.fallback_only,
        }
    }
}
