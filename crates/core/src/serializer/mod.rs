//! Rule-based HTML to Markdown serialization.
//!
//! [`MarkdownSerializer`] walks a copy of the input depth-first. Text is
//! whitespace-collapsed and escaped; every element is rendered by the first
//! matching rule, in this order:
//!
//! 1. the blank rule, for elements with nothing visible inside
//! 2. rules added with [`MarkdownSerializerBuilder::add_rule`], latest first
//! 3. the built-in rules
//! 4. [`MarkdownSerializerBuilder::keep`] filters, rendered as HTML
//! 5. [`MarkdownSerializerBuilder::remove`] filters, rendered as nothing
//! 6. the default rule, which renders the children
//!
//! # Example
//!
//! ```rust
//! use readmark_core::serializer::{Filter, MarkdownInput, MarkdownSerializer};
//!
//! let serializer = MarkdownSerializer::builder()
//!     .add_rule("strikethrough", Filter::tags(["del", "s"]), |content, _, _, _| format!("~~{content}~~"))
//!     .build()
//!     .unwrap();
//!
//! let markdown = serializer.serialize(MarkdownInput::Html("<p>Hello <del>old</del> world</p>")).unwrap();
//! assert_eq!(markdown, "Hello ~~old~~ world");
//! ```

pub mod collapse;
pub mod escape;
pub mod options;
pub mod rules;

pub use escape::escape_markdown;
pub use options::{
    CodeBlockStyle, HeadingStyle, LinkReferenceStyle, LinkStyle, MarkdownOptions, MarkdownOptionsBuilder,
};
pub use rules::{BUILTIN_RULES, Builtin, Filter, Rule};

use crate::dom_tree::{DomTree, NodeId, VOID_ELEMENTS};
use crate::parse::parse_fragment;
use crate::{ReadmarkError, Result};
use collapse::collapse_whitespace;

/// Elements rendered on their own lines.
pub const BLOCK_ELEMENTS: [&str; 49] = [
    "address",
    "article",
    "aside",
    "audio",
    "blockquote",
    "body",
    "canvas",
    "center",
    "dd",
    "dir",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "frameset",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "header",
    "hgroup",
    "hr",
    "html",
    "isindex",
    "li",
    "main",
    "menu",
    "nav",
    "noframes",
    "noscript",
    "ol",
    "output",
    "p",
    "pre",
    "section",
    "table",
    "tbody",
    "td",
    "tfoot",
    "th",
    "thead",
    "tr",
    "ul",
];

/// Elements that are never blank even when they contain no text.
pub const MEANINGFUL_WHEN_BLANK: [&str; 11] =
    ["a", "table", "thead", "tbody", "tfoot", "th", "td", "iframe", "script", "audio", "video"];

pub(crate) fn is_block(tree: &DomTree, node: NodeId) -> bool {
    tree.tag_name(node).is_some_and(|tag| BLOCK_ELEMENTS.contains(&tag))
}

pub(crate) fn is_void(tree: &DomTree, node: NodeId) -> bool {
    tree.tag_name(node).is_some_and(|tag| VOID_ELEMENTS.contains(&tag))
}

fn is_meaningful_when_blank(tree: &DomTree, node: NodeId) -> bool {
    tree.tag_name(node).is_some_and(|tag| MEANINGFUL_WHEN_BLANK.contains(&tag))
}

fn has_descendant_in(tree: &DomTree, node: NodeId, tags: &[&str]) -> bool {
    tree.descendants(node).into_iter().any(|d| tree.tag_name(d).is_some_and(|tag| tags.contains(&tag)))
}

/// An element with no visible content of its own.
fn is_blank(tree: &DomTree, node: NodeId) -> bool {
    !is_void(tree, node)
        && !is_meaningful_when_blank(tree, node)
        && tree.text_content(node).trim().is_empty()
        && !has_descendant_in(tree, node, &VOID_ELEMENTS)
        && !has_descendant_in(tree, node, &MEANINGFUL_WHEN_BLANK)
}

/// Joins two rendered pieces, keeping at most one blank line between them.
pub fn join(output: &str, replacement: &str) -> String {
    let left = output.trim_end_matches('\n');
    let right = replacement.trim_start_matches('\n');
    let newlines = (output.len() - left.len()).max(replacement.len() - right.len()).min(2);
    let mut joined = String::with_capacity(left.len() + newlines + right.len());
    joined.push_str(left);
    joined.push_str(&"\n\n"[..newlines]);
    joined.push_str(right);
    joined
}

/// What the serializer can walk.
#[derive(Debug, Clone, Copy)]
pub enum MarkdownInput<'a> {
    /// Markup parsed as a fragment.
    Html(&'a str),
    /// The children of an element, or of the document root.
    Node(&'a DomTree, NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

#[derive(Debug, Default)]
struct Flanking {
    leading: String,
    trailing: String,
}

enum Dispatch<'r> {
    Blank,
    Custom(&'r Rule),
    Builtin(Builtin),
    Keep,
    Remove,
    Default,
}

/// Configured, immutable Markdown serializer.
///
/// Build once and reuse; it is `Send + Sync`, and every call works on its own
/// copy of the input.
#[derive(Debug, Clone, Default)]
pub struct MarkdownSerializer {
    options: MarkdownOptions,
    rules: Vec<Rule>,
    keep: Vec<Filter>,
    remove: Vec<Filter>,
}

impl MarkdownSerializer {
    /// A serializer with default options and only the built-in rules.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: MarkdownOptions) -> Self {
        Self { options, ..Self::default() }
    }

    pub fn builder() -> MarkdownSerializerBuilder {
        MarkdownSerializerBuilder::new()
    }

    /// Adds `rule` ahead of every existing rule. The filter is not validated.
    pub(crate) fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.insert(0, rule);
        self
    }

    pub fn options(&self) -> &MarkdownOptions {
        &self.options
    }

    /// Renders the input as Markdown.
    ///
    /// The result has no leading newlines or tabs and no trailing whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::InvalidSerializerInput`] when a node input
    /// names a text node or an id outside the tree.
    pub fn serialize(&self, input: MarkdownInput<'_>) -> Result<String> {
        let (mut tree, root) = match input {
            MarkdownInput::Html("") => return Ok(String::new()),
            MarkdownInput::Html(html) => {
                let tree = parse_fragment(html);
                let root = tree.root();
                (tree, root)
            }
            MarkdownInput::Node(source, id) => {
                if source.get_node(id).is_none() {
                    return Err(ReadmarkError::InvalidSerializerInput(format!("node {id} is not in the tree")));
                }
                if source.is_text(id) {
                    return Err(ReadmarkError::InvalidSerializerInput(format!(
                        "node {id} is a text node, not an element or document"
                    )));
                }
                let tree = source.copy_subtree(id);
                let root = if id == source.root() {
                    tree.root()
                } else {
                    tree.children(tree.root()).first().copied().unwrap_or(tree.root())
                };
                (tree, root)
            }
        };

        collapse_whitespace(&mut tree, root, self.options.preformatted_code);

        let mut walker = Walker { serializer: self, tree: &tree, references: Vec::new() };
        let mut output = walker.process(root, false);

        if !walker.references.is_empty() {
            let definitions = format!("\n\n{}\n\n", walker.references.join("\n"));
            output = join(&output, &definitions);
        }

        Ok(output.trim_start_matches(['\t', '\r', '\n']).trim_end().to_string())
    }

    fn dispatch(&self, tree: &DomTree, node: NodeId) -> Dispatch<'_> {
        if is_blank(tree, node) {
            return Dispatch::Blank;
        }
        if let Some(rule) = self.rules.iter().find(|rule| rule.filter.matches(tree, node, &self.options)) {
            return Dispatch::Custom(rule);
        }
        if let Some(builtin) = BUILTIN_RULES.iter().find(|b| b.matches(tree, node, &self.options)) {
            return Dispatch::Builtin(*builtin);
        }
        if self.keep.iter().any(|filter| filter.matches(tree, node, &self.options)) {
            return Dispatch::Keep;
        }
        if self.remove.iter().any(|filter| filter.matches(tree, node, &self.options)) {
            return Dispatch::Remove;
        }
        Dispatch::Default
    }
}

/// State of one serialization call.
struct Walker<'a> {
    serializer: &'a MarkdownSerializer,
    tree: &'a DomTree,
    /// Reference link definitions, flushed once after the walk.
    references: Vec<String>,
}

impl Walker<'_> {
    fn process(&mut self, parent: NodeId, parent_is_code: bool) -> String {
        let tree = self.tree;
        let mut output = String::new();
        for &child in tree.children(parent) {
            let replacement = if let Some(text) = tree.text(child) {
                if parent_is_code { text.to_string() } else { escape_markdown(text) }
            } else if tree.is_element(child) {
                self.replacement_for_node(child, parent_is_code)
            } else {
                String::new()
            };
            output = join(&output, &replacement);
        }
        output
    }

    fn replacement_for_node(&mut self, node: NodeId, parent_is_code: bool) -> String {
        let tree = self.tree;
        let serializer = self.serializer;
        let options = &serializer.options;
        let block = is_block(tree, node);
        let is_code = parent_is_code || tree.has_tag(node, "code");

        let dispatch = serializer.dispatch(tree, node);
        let flanking = if block || (options.preformatted_code && is_code) {
            Flanking::default()
        } else {
            flanking_whitespace(tree, node, options)
        };

        let content = match dispatch {
            Dispatch::Blank => String::new(),
            _ => self.process(node, is_code),
        };
        let content = if flanking.leading.is_empty() && flanking.trailing.is_empty() {
            content
        } else {
            content.trim().to_string()
        };

        let replacement = match dispatch {
            Dispatch::Blank if block => "\n\n".to_string(),
            Dispatch::Blank => String::new(),
            Dispatch::Custom(rule) => rule.replace(&content, tree, node, options),
            Dispatch::Builtin(builtin) => builtin.replace(&content, tree, node, options, &mut self.references),
            Dispatch::Keep if block => format!("\n\n{}\n\n", tree.outer_html(node)),
            Dispatch::Keep => tree.outer_html(node),
            Dispatch::Remove => String::new(),
            Dispatch::Default if block => format!("\n\n{content}\n\n"),
            Dispatch::Default => content,
        };

        format!("{}{replacement}{}", flanking.leading, flanking.trailing)
    }
}

fn is_ascii_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

/// Whitespace at the edges of an inline element, to be moved outside its
/// Markdown delimiters.
///
/// ASCII whitespace is dropped on a side where the neighbouring node already
/// supplies a space.
fn flanking_whitespace(tree: &DomTree, node: NodeId, options: &MarkdownOptions) -> Flanking {
    let text = tree.text_content(node);

    let after_ascii = text.trim_start_matches(is_ascii_whitespace);
    let leading_ascii = text.len() - after_ascii.len();
    let leading_non_ascii = after_ascii.len() - after_ascii.trim_start().len();
    let (leading, rest) = text.split_at(leading_ascii + leading_non_ascii);

    let before_ascii = rest.trim_end_matches(is_ascii_whitespace);
    let trailing_ascii = rest.len() - before_ascii.len();
    let trailing_non_ascii = before_ascii.len() - before_ascii.trim_end().len();
    let trailing = &rest[rest.len() - trailing_ascii - trailing_non_ascii..];

    let mut flanking = Flanking { leading: leading.to_string(), trailing: trailing.to_string() };
    if leading_ascii > 0 && is_flanked_by_whitespace(Side::Left, tree, node, options) {
        flanking.leading = leading[leading_ascii..].to_string();
    }
    if trailing_ascii > 0 && is_flanked_by_whitespace(Side::Right, tree, node, options) {
        flanking.trailing = trailing[..trailing_non_ascii].to_string();
    }
    flanking
}

fn is_flanked_by_whitespace(side: Side, tree: &DomTree, node: NodeId, options: &MarkdownOptions) -> bool {
    let sibling = match side {
        Side::Left => tree.previous_sibling(node),
        Side::Right => tree.next_sibling(node),
    };
    let Some(sibling) = sibling else {
        return false;
    };
    let has_space = |text: &str| match side {
        Side::Left => text.ends_with(' '),
        Side::Right => text.starts_with(' '),
    };

    if let Some(text) = tree.text(sibling) {
        has_space(text)
    } else if options.preformatted_code && tree.has_tag(sibling, "code") {
        false
    } else if tree.is_element(sibling) && !is_block(tree, sibling) {
        has_space(&tree.text_content(sibling))
    } else {
        false
    }
}

/// Builder for [`MarkdownSerializer`].
#[derive(Debug, Default)]
pub struct MarkdownSerializerBuilder {
    options: MarkdownOptions,
    rules: Vec<Rule>,
    keep: Vec<Filter>,
    remove: Vec<Filter>,
}

impl MarkdownSerializerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn options(mut self, options: MarkdownOptions) -> Self {
        self.options = options;
        self
    }

    /// Registers a custom rule; it takes priority over every rule added
    /// before it and over the built-in rules.
    pub fn add_rule<F>(mut self, name: impl Into<String>, filter: Filter, replacement: F) -> Self
    where
        F: Fn(&str, &DomTree, NodeId, &MarkdownOptions) -> String + Send + Sync + 'static,
    {
        self.rules.push(Rule::new(name, filter, replacement));
        self
    }

    /// Renders matching elements as HTML.
    pub fn keep(mut self, filter: Filter) -> Self {
        self.keep.push(filter);
        self
    }

    /// Drops matching elements and their content.
    pub fn remove(mut self, filter: Filter) -> Self {
        self.remove.push(filter);
        self
    }

    /// Validates every filter and freezes the rule order.
    ///
    /// # Errors
    ///
    /// Returns [`ReadmarkError::RuleFilter`] for an empty or malformed tag
    /// name, or an empty tag list.
    pub fn build(self) -> Result<MarkdownSerializer> {
        for rule in &self.rules {
            rule.filter.validate(&rule.name)?;
        }
        for filter in &self.keep {
            filter.validate("keep")?;
        }
        for filter in &self.remove {
            filter.validate("remove")?;
        }

        let Self { options, mut rules, mut keep, mut remove } = self;
        rules.reverse();
        keep.reverse();
        remove.reverse();
        Ok(MarkdownSerializer { options, rules, keep, remove })
    }
}
