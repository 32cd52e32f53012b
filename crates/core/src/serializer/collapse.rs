//! Whitespace collapsing over a working tree before rendering.
//!
//! Mirrors how a browser lays out inline text: runs of ASCII whitespace become
//! one space, and spaces next to block boundaries or `<br>` disappear.
//! Preformatted subtrees are left alone.

use std::sync::LazyLock;

use regex::Regex;

use crate::dom_tree::{DomTree, NodeId};

use super::{is_block, is_void};

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \r\n\t]+").expect("WHITESPACE_RUN should compile"));

fn is_pre(tree: &DomTree, node: NodeId, preformatted_code: bool) -> bool {
    match tree.tag_name(node) {
        Some("pre") => true,
        Some("code") => preformatted_code,
        _ => false,
    }
}

/// Preorder nodes under `root`, not descending into preformatted elements.
fn walk_order(tree: &DomTree, root: NodeId, preformatted_code: bool) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = tree.children(root).iter().rev().copied().collect();
    while let Some(node) = stack.pop() {
        out.push(node);
        if !is_pre(tree, node, preformatted_code) {
            stack.extend(tree.children(node).iter().rev().copied());
        }
    }
    out
}

fn trim_trailing_space(tree: &mut DomTree, node: NodeId) {
    if let Some(text) = tree.text(node)
        && let Some(stripped) = text.strip_suffix(' ')
    {
        let stripped = stripped.to_string();
        tree.set_text(node, stripped);
    }
}

/// Collapses whitespace in every text node under `root`.
///
/// Text nodes left empty are removed from the tree.
pub fn collapse_whitespace(tree: &mut DomTree, root: NodeId, preformatted_code: bool) {
    if tree.children(root).is_empty() || is_pre(tree, root, preformatted_code) {
        return;
    }

    let mut prev_text: Option<NodeId> = None;
    let mut keep_leading_ws = false;

    for node in walk_order(tree, root, preformatted_code) {
        if let Some(text) = tree.text(node) {
            let mut collapsed = WHITESPACE_RUN.replace_all(text, " ").into_owned();

            let prev_ends_with_space = prev_text.and_then(|p| tree.text(p)).is_none_or(|t| t.ends_with(' '));
            if prev_ends_with_space && !keep_leading_ws && collapsed.starts_with(' ') {
                collapsed.remove(0);
            }

            if collapsed.is_empty() {
                tree.detach(node);
                continue;
            }
            tree.set_text(node, collapsed);
            prev_text = Some(node);
        } else if tree.is_element(node) {
            if is_block(tree, node) || tree.has_tag(node, "br") {
                if let Some(prev) = prev_text {
                    trim_trailing_space(tree, prev);
                }
                prev_text = None;
                keep_leading_ws = false;
            } else if is_void(tree, node) || is_pre(tree, node, preformatted_code) {
                prev_text = None;
                keep_leading_ws = true;
            } else if prev_text.is_some() {
                keep_leading_ws = false;
            }
        }
    }

    if let Some(prev) = prev_text {
        trim_trailing_space(tree, prev);
        if tree.text(prev).is_some_and(str::is_empty) {
            tree.detach(prev);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_fragment;

    fn collapsed(html: &str) -> String {
        let mut tree = parse_fragment(html);
        let root = tree.root();
        collapse_whitespace(&mut tree, root, false);
        tree.inner_html(root)
    }

    #[test]
    fn test_runs_become_single_spaces() {
        assert_eq!(collapsed("<p>  Hello \n\t world  </p>"), "<p>Hello world</p>");
    }

    #[test]
    fn test_space_between_inline_elements_survives() {
        assert_eq!(collapsed("<p><em>a</em> <strong>b</strong></p>"), "<p><em>a</em> <strong>b</strong></p>");
    }

    #[test]
    fn test_whitespace_between_blocks_is_dropped() {
        assert_eq!(collapsed("<div>\n  <p>a</p>\n  <p>b</p>\n</div>"), "<div><p>a</p><p>b</p></div>");
    }

    #[test]
    fn test_space_before_br_is_trimmed() {
        assert_eq!(collapsed("<p>one <br> two</p>"), "<p>one<br>two</p>");
    }

    #[test]
    fn test_pre_is_untouched() {
        assert_eq!(collapsed("<pre>  keep\n   this  </pre>"), "<pre>  keep\n   this  </pre>");
    }

    #[test]
    fn test_preformatted_code_option() {
        let mut tree = parse_fragment("<p>x <code>a   b</code></p>");
        let root = tree.root();
        collapse_whitespace(&mut tree, root, true);
        assert_eq!(tree.inner_html(root), "<p>x <code>a   b</code></p>");
    }
}
