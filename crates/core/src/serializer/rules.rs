//! Rule filters and the built-in conversions.
//!
//! A rule pairs a [`Filter`] that decides which elements it handles with a
//! replacement that turns the element's already-rendered children into
//! Markdown. The built-in rules cover CommonMark plus GFM tables; callers add
//! their own through [`MarkdownSerializerBuilder`](super::MarkdownSerializerBuilder).

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::options::{CodeBlockStyle, HeadingStyle, LinkReferenceStyle, LinkStyle, MarkdownOptions};
use crate::dom_tree::{DomTree, NodeId};
use crate::{ReadmarkError, Result};

/// Predicate over an element and the active options.
pub type FilterFn = dyn Fn(&DomTree, NodeId, &MarkdownOptions) -> bool + Send + Sync;

/// Replacement over the rendered children, the element and the active options.
pub type ReplacementFn = dyn Fn(&str, &DomTree, NodeId, &MarkdownOptions) -> String + Send + Sync;

static NEWLINE_RUNS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\n+\s*)+").expect("NEWLINE_RUNS should compile"));

static LANGUAGE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"language-(\S+)").expect("LANGUAGE_CLASS should compile"));

static AMBIGUOUS_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^`|^ .*?[^ ].* $|`$").expect("AMBIGUOUS_CODE should compile"));

static LINE_ENDINGS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\r?\n|\r").expect("LINE_ENDINGS should compile"));

static TABLE_GAPS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{2,}").expect("TABLE_GAPS should compile"));

/// Which elements a rule applies to.
#[derive(Clone)]
pub enum Filter {
    /// A single tag name, compared case-insensitively.
    Tag(String),
    /// Any of several tag names.
    Tags(Vec<String>),
    /// Arbitrary test over the element.
    Predicate(Arc<FilterFn>),
}

impl Filter {
    pub fn tag(name: impl Into<String>) -> Self {
        Self::Tag(name.into())
    }

    pub fn tags<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Tags(names.into_iter().map(Into::into).collect())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&DomTree, NodeId, &MarkdownOptions) -> bool + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(f))
    }

    /// True when the element at `node` is handled by this filter.
    pub fn matches(&self, tree: &DomTree, node: NodeId, options: &MarkdownOptions) -> bool {
        let Some(tag) = tree.tag_name(node) else {
            return false;
        };
        match self {
            Self::Tag(name) => name.eq_ignore_ascii_case(tag),
            Self::Tags(names) => names.iter().any(|name| name.eq_ignore_ascii_case(tag)),
            Self::Predicate(f) => f(tree, node, options),
        }
    }

    pub(crate) fn validate(&self, rule: &str) -> Result<()> {
        let check = |name: &str| -> Result<()> {
            if name.is_empty() {
                return Err(ReadmarkError::RuleFilter { rule: rule.to_string(), reason: "empty tag name".to_string() });
            }
            if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
                return Err(ReadmarkError::RuleFilter {
                    rule: rule.to_string(),
                    reason: format!("'{name}' is not a tag name"),
                });
            }
            Ok(())
        };

        match self {
            Self::Tag(name) => check(name),
            Self::Tags(names) if names.is_empty() => {
                Err(ReadmarkError::RuleFilter { rule: rule.to_string(), reason: "empty tag list".to_string() })
            }
            Self::Tags(names) => names.iter().try_for_each(|name| check(name)),
            Self::Predicate(_) => Ok(()),
        }
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tag(name) => f.debug_tuple("Tag").field(name).finish(),
            Self::Tags(names) => f.debug_tuple("Tags").field(names).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A named, user-supplied conversion.
#[derive(Clone)]
pub struct Rule {
    pub name: String,
    pub filter: Filter,
    replacement: Arc<ReplacementFn>,
}

impl Rule {
    pub fn new<F>(name: impl Into<String>, filter: Filter, replacement: F) -> Self
    where
        F: Fn(&str, &DomTree, NodeId, &MarkdownOptions) -> String + Send + Sync + 'static,
    {
        Self { name: name.into(), filter, replacement: Arc::new(replacement) }
    }

    pub fn replace(&self, content: &str, tree: &DomTree, node: NodeId, options: &MarkdownOptions) -> String {
        (self.replacement)(content, tree, node, options)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).field("filter", &self.filter).finish_non_exhaustive()
    }
}

/// The built-in conversions, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Paragraph,
    LineBreak,
    Heading,
    Blockquote,
    List,
    ListItem,
    IndentedCodeBlock,
    FencedCodeBlock,
    HorizontalRule,
    InlineLink,
    ReferenceLink,
    Emphasis,
    Strong,
    Code,
    Image,
    Table,
    TableSection,
    TableRow,
    TableCell,
}

pub const BUILTIN_RULES: [Builtin; 19] = [
    Builtin::Paragraph,
    Builtin::LineBreak,
    Builtin::Heading,
    Builtin::Blockquote,
    Builtin::List,
    Builtin::ListItem,
    Builtin::IndentedCodeBlock,
    Builtin::FencedCodeBlock,
    Builtin::HorizontalRule,
    Builtin::InlineLink,
    Builtin::ReferenceLink,
    Builtin::Emphasis,
    Builtin::Strong,
    Builtin::Code,
    Builtin::Image,
    Builtin::Table,
    Builtin::TableSection,
    Builtin::TableRow,
    Builtin::TableCell,
];

fn has_code_child(tree: &DomTree, node: NodeId) -> bool {
    tree.has_tag(node, "pre") && tree.children(node).first().is_some_and(|child| tree.has_tag(*child, "code"))
}

fn has_href(tree: &DomTree, node: NodeId) -> bool {
    tree.has_tag(node, "a") && tree.attr(node, "href").is_some_and(|href| !href.is_empty())
}

/// Attribute value with newline runs folded to a single newline.
fn clean_attribute(value: Option<&str>) -> String {
    value.map(|v| NEWLINE_RUNS.replace_all(v, "\n").into_owned()).unwrap_or_default()
}

fn title_suffix(tree: &DomTree, node: NodeId) -> String {
    let title = clean_attribute(tree.attr(node, "title"));
    if title.is_empty() { title } else { format!(" \"{title}\"") }
}

/// Fence length for a code body: one more than the longest run of the fence
/// character, never less than three.
pub fn fence_length(code: &str, fence_char: char) -> usize {
    longest_run(code, fence_char).map_or(3, |run| (run + 1).max(3))
}

fn longest_run(text: &str, target: char) -> Option<usize> {
    let mut longest = None;
    let mut current = 0;
    for c in text.chars() {
        if c == target {
            current += 1;
            longest = Some(longest.unwrap_or(0).max(current));
        } else {
            current = 0;
        }
    }
    longest
}

/// Backtick delimiter for inline code: one longer than the longest run inside.
fn code_delimiter(code: &str) -> String {
    "`".repeat(longest_run(code, '`').unwrap_or(0) + 1)
}

/// The table that owns `node`.
fn enclosing_table(tree: &DomTree, node: NodeId) -> Option<NodeId> {
    tree.ancestors(node).find(|a| tree.has_tag(*a, "table"))
}

fn is_heading_row(tree: &DomTree, row: NodeId) -> bool {
    enclosing_table(tree, row).and_then(|table| tree.elements_by_tag(table, "tr").into_iter().next()) == Some(row)
}

fn is_cell(tree: &DomTree, node: NodeId) -> bool {
    tree.has_tag(node, "th") || tree.has_tag(node, "td")
}

impl Builtin {
    pub fn matches(self, tree: &DomTree, node: NodeId, options: &MarkdownOptions) -> bool {
        let Some(tag) = tree.tag_name(node) else {
            return false;
        };
        match self {
            Self::Paragraph => tag == "p",
            Self::LineBreak => tag == "br",
            Self::Heading => matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6"),
            Self::Blockquote => tag == "blockquote",
            Self::List => matches!(tag, "ul" | "ol"),
            Self::ListItem => tag == "li",
            Self::IndentedCodeBlock => options.code_block_style == CodeBlockStyle::Indented && has_code_child(tree, node),
            Self::FencedCodeBlock => options.code_block_style == CodeBlockStyle::Fenced && has_code_child(tree, node),
            Self::HorizontalRule => tag == "hr",
            Self::InlineLink => options.link_style == LinkStyle::Inlined && has_href(tree, node),
            Self::ReferenceLink => options.link_style == LinkStyle::Referenced && has_href(tree, node),
            Self::Emphasis => matches!(tag, "em" | "i"),
            Self::Strong => matches!(tag, "strong" | "b"),
            Self::Code => {
                let sole_child_of_pre = tree.parent(node).is_some_and(|p| tree.has_tag(p, "pre"))
                    && tree.previous_sibling(node).is_none()
                    && tree.next_sibling(node).is_none();
                tag == "code" && !sole_child_of_pre
            }
            Self::Image => tag == "img",
            Self::Table => tag == "table",
            Self::TableSection => matches!(tag, "thead" | "tbody" | "tfoot"),
            Self::TableRow => tag == "tr",
            Self::TableCell => matches!(tag, "th" | "td"),
        }
    }

    /// Renders the element. Reference link definitions go to `references`.
    pub fn replace(
        self, content: &str, tree: &DomTree, node: NodeId, options: &MarkdownOptions, references: &mut Vec<String>,
    ) -> String {
        match self {
            Self::Paragraph => format!("\n\n{content}\n\n"),
            Self::LineBreak => format!("{}\n", options.line_break_marker),
            Self::Heading => {
                let level = tree
                    .tag_name(node)
                    .and_then(|tag| tag[1..].parse::<usize>().ok())
                    .unwrap_or(1);
                if options.heading_style == HeadingStyle::Setext && level < 3 {
                    let underline = if level == 1 { "=" } else { "-" };
                    format!("\n\n{content}\n{}\n\n", underline.repeat(content.chars().count()))
                } else {
                    format!("\n\n{} {content}\n\n", "#".repeat(level))
                }
            }
            Self::Blockquote => {
                let trimmed = content.trim_matches('\n');
                let quoted: Vec<String> = trimmed.split('\n').map(|line| format!("> {line}")).collect();
                format!("\n\n{}\n\n", quoted.join("\n"))
            }
            Self::List => {
                let in_item = tree.parent(node).is_some_and(|parent| {
                    tree.has_tag(parent, "li") && tree.element_children(parent).last() == Some(node)
                });
                if in_item { format!("\n{content}") } else { format!("\n\n{content}\n\n") }
            }
            Self::ListItem => {
                let trimmed = content.trim_start_matches('\n');
                let body = trimmed.trim_end_matches('\n');
                let mut body = body.to_string();
                if body.len() < trimmed.len() {
                    body.push('\n');
                }
                let body = body.replace('\n', "\n    ");

                let mut prefix = format!("{}   ", options.bullet_list_marker);
                if let Some(parent) = tree.parent(node)
                    && tree.has_tag(parent, "ol")
                {
                    let index = tree.element_children(parent).position(|child| child == node).unwrap_or(0) as i64;
                    let number = tree
                        .attr(parent, "start")
                        .and_then(|s| s.trim().parse::<i64>().ok())
                        .and_then(|start| start.checked_add(index))
                        .unwrap_or(index + 1);
                    prefix = format!("{number}.  ");
                }

                let separator = if tree.next_sibling(node).is_some() && !body.ends_with('\n') { "\n" } else { "" };
                format!("{prefix}{body}{separator}")
            }
            Self::IndentedCodeBlock => {
                let code = tree.children(node).first().map(|c| tree.text_content(*c)).unwrap_or_default();
                format!("\n\n    {}\n\n", code.replace('\n', "\n    "))
            }
            Self::FencedCodeBlock => {
                let Some(code_node) = tree.children(node).first().copied() else {
                    return String::new();
                };
                let language = tree
                    .attr(code_node, "class")
                    .and_then(|class| LANGUAGE_CLASS.captures(class))
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default();
                let code = tree.text_content(code_node);
                let fence_char = options.fence.chars().next().unwrap_or('`');
                let fence = fence_char.to_string().repeat(fence_length(&code, fence_char));
                let body = code.strip_suffix('\n').unwrap_or(&code);
                format!("\n\n{fence}{language}\n{body}\n{fence}\n\n")
            }
            Self::HorizontalRule => format!("\n\n{}\n\n", options.hr),
            Self::InlineLink => {
                let href = tree.attr(node, "href").unwrap_or_default();
                format!("[{content}]({href}{})", title_suffix(tree, node))
            }
            Self::ReferenceLink => {
                let href = tree.attr(node, "href").unwrap_or_default();
                let title = title_suffix(tree, node);
                let (link, definition) = match options.link_reference_style {
                    LinkReferenceStyle::Collapsed => (format!("[{content}][]"), format!("[{content}]: {href}{title}")),
                    LinkReferenceStyle::Shortcut => (format!("[{content}]"), format!("[{content}]: {href}{title}")),
                    LinkReferenceStyle::Full => {
                        let id = references.len() + 1;
                        (format!("[{content}][{id}]"), format!("[{id}]: {href}{title}"))
                    }
                };
                references.push(definition);
                link
            }
            Self::Emphasis => {
                if content.trim().is_empty() {
                    String::new()
                } else {
                    format!("{0}{content}{0}", options.em_delimiter)
                }
            }
            Self::Strong => {
                if content.trim().is_empty() {
                    String::new()
                } else {
                    format!("{0}{content}{0}", options.strong_delimiter)
                }
            }
            Self::Code => {
                if content.is_empty() {
                    return String::new();
                }
                let code = LINE_ENDINGS.replace_all(content, " ");
                let padding = if AMBIGUOUS_CODE.is_match(&code) { " " } else { "" };
                let delimiter = code_delimiter(&code);
                format!("{delimiter}{padding}{code}{padding}{delimiter}")
            }
            Self::Image => {
                let src = tree.attr(node, "src").unwrap_or_default();
                if src.is_empty() {
                    return String::new();
                }
                let alt = clean_attribute(tree.attr(node, "alt"));
                format!("![{alt}]({src}{})", title_suffix(tree, node))
            }
            Self::Table => format!("\n\n{}\n\n", TABLE_GAPS.replace_all(content, "\n")),
            Self::TableSection => content.to_string(),
            Self::TableRow => {
                let columns = tree.element_children(node).filter(|c| is_cell(tree, *c)).count();
                if is_heading_row(tree, node) && columns > 0 {
                    let divider = format!("|{}", " --- |".repeat(columns));
                    format!("\n{content}\n{divider}")
                } else {
                    format!("\n{content}")
                }
            }
            Self::TableCell => {
                let first = tree.parent(node).and_then(|row| tree.element_children(row).find(|c| is_cell(tree, *c)))
                    == Some(node);
                let prefix = if first { "| " } else { " " };
                let cell = content.trim().replace('\n', " ").replace('|', "\\|");
                format!("{prefix}{cell} |")
            }
        }
    }
}
