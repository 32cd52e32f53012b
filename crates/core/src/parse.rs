//! HTML parsing into the owned document tree.
//!
//! [`Document`] parses markup with `scraper` (html5ever) and converts the
//! result into a [`DomTree`] arena, which every later stage works on.
//!
//! # Example
//!
//! ```rust
//! use readmark_core::Document;
//!
//! let html = r#"
//!     <html>
//!         <head><title>Title</title></head>
//!         <body><p class="content">Paragraph</p></body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! assert_eq!(doc.title(), Some("Title".to_string()));
//! assert_eq!(doc.elements_by_tag("p").len(), 1);
//! ```

use scraper::{ElementRef, Html};
use url::Url;

use crate::dom_tree::{DomTree, NodeId};
use crate::{ReadmarkError, Result};

/// A parsed HTML document.
///
/// Holds the owned tree plus the URL the document was loaded from, which
/// serves as the base for resolving relative links.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    tree: DomTree,
    url: Option<Url>,
}

impl Document {
    /// Parses a complete HTML document.
    ///
    /// html5ever recovers from any malformed input, so this only fails when
    /// the resulting tree has no root element.
    ///
    /// # Example
    ///
    /// ```rust
    /// use readmark_core::Document;
    ///
    /// let doc = Document::parse("<h1>Title</h1>").unwrap();
    /// assert!(doc.body().is_some());
    /// ```
    pub fn parse(html: &str) -> Result<Self> {
        let parsed = Html::parse_document(html);
        Self::from_tree(convert(&parsed, false), None)
    }

    /// Parses a document and records the URL it came from.
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::InvalidUrl`] if the URL cannot be parsed.
    pub fn parse_with_url(html: &str, url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| ReadmarkError::InvalidUrl(e.to_string()))?;
        let parsed = Html::parse_document(html);
        Self::from_tree(convert(&parsed, false), Some(url))
    }

    /// Wraps an existing tree.
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::NotADocument`] when the root has no element child.
    pub fn from_tree(tree: DomTree, url: Option<Url>) -> Result<Self> {
        if tree.first_element_child(tree.root()).is_none() {
            return Err(ReadmarkError::NotADocument);
        }
        Ok(Self { tree, url })
    }

    pub fn tree(&self) -> &DomTree {
        &self.tree
    }

    pub fn into_tree(self) -> DomTree {
        self.tree
    }

    /// The URL the document was loaded from, if known.
    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// The `<html>` element (or whatever the root's first element is).
    pub fn document_element(&self) -> Option<NodeId> {
        self.tree.first_element_child(self.tree.root())
    }

    /// The `<body>` element, if the document has one.
    pub fn body(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.tree.element_children(html).find(|n| self.tree.has_tag(*n, "body"))
    }

    /// The `<head>` element, if the document has one.
    pub fn head(&self) -> Option<NodeId> {
        let html = self.document_element()?;
        self.tree.element_children(html).find(|n| self.tree.has_tag(*n, "head"))
    }

    /// Gets the title of the document.
    ///
    /// Returns the trimmed content of the first `<title>` element if it is
    /// not empty.
    pub fn title(&self) -> Option<String> {
        let title = self.elements_by_tag("title").into_iter().next()?;
        let text = self.tree.text_content(title);
        let text = text.trim();
        if text.is_empty() { None } else { Some(text.to_string()) }
    }

    /// The `lang` attribute of the root element.
    pub fn lang(&self) -> Option<String> {
        self.document_element()
            .and_then(|html| self.tree.attr(html, "lang"))
            .map(str::to_string)
    }

    /// Base URL for relative references: `<base href>` resolved against the
    /// document URL, or the document URL itself.
    pub fn base_url(&self) -> Option<Url> {
        let base_href = self
            .elements_by_tag("base")
            .into_iter()
            .find_map(|base| self.tree.attr(base, "href").map(str::to_string));

        match (base_href, &self.url) {
            (Some(href), Some(url)) => url.join(&href).ok().or_else(|| Some(url.clone())),
            (Some(href), None) => Url::parse(&href).ok(),
            (None, url) => url.clone(),
        }
    }

    /// All text in the document.
    pub fn text_content(&self) -> String {
        self.tree.text_content(self.tree.root())
    }

    /// Elements with the given tag, in document order.
    pub fn elements_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.tree.elements_by_tag(self.tree.root(), tag)
    }
}

/// Parses an HTML fragment; the fragment's top-level nodes become children of
/// the returned tree's root.
pub fn parse_fragment(html: &str) -> DomTree {
    let parsed = Html::parse_fragment(html);
    convert(&parsed, true)
}

/// Copies a scraper tree into the arena, dropping comments, doctypes and
/// processing instructions.
fn convert(parsed: &Html, fragment: bool) -> DomTree {
    let mut tree = DomTree::new();
    let html = parsed.root_element();

    let container = if fragment {
        tree.root()
    } else {
        let element = html.value();
        let id = tree.create_element_with_attrs(element.name(), element.attrs());
        tree.append_child(tree.root(), id);
        id
    };

    let mut stack: Vec<(NodeId, ElementRef<'_>)> = vec![(container, html)];
    while let Some((parent, element)) = stack.pop() {
        for child in element.children() {
            match child.value() {
                scraper::Node::Text(text) => {
                    let text: &str = text;
                    let id = tree.create_text(text);
                    tree.append_child(parent, id);
                }
                scraper::Node::Element(value) => {
                    let id = tree.create_element_with_attrs(value.name(), value.attrs());
                    tree.append_child(parent, id);
                    if let Some(child_ref) = ElementRef::wrap(child) {
                        stack.push((id, child_ref));
                    }
                }
                _ => {}
            }
        }
    }

    tree
}
