//! Visibility checks without a layout engine.
//!
//! Two layers decide whether a node is visible:
//!
//! - [`is_declared_hidden`] reads what the markup itself says (the `hidden`
//!   attribute, `aria-hidden`, inline `display`/`visibility`/`opacity`). It
//!   needs no rendering and is always applied.
//! - A [`VisibilityOracle`] answers for computed visibility. Headless callers
//!   use [`AlwaysVisible`]; an embedding with access to layout information
//!   can plug in its own implementation.

use std::fmt::Debug;
use std::sync::LazyLock;

use regex::Regex;

use crate::dom_tree::{DomTree, NodeId};

/// Capability interface consulted for computed visibility.
pub trait VisibilityOracle: Debug + Send + Sync {
    /// Returns false when the element would not be rendered.
    fn is_visible(&self, tree: &DomTree, node: NodeId) -> bool;
}

/// Oracle for non-rendering contexts: every node counts as visible.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysVisible;

impl VisibilityOracle for AlwaysVisible {
    fn is_visible(&self, _tree: &DomTree, _node: NodeId) -> bool {
        true
    }
}

static HIDDEN_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)display\s*:\s*none|visibility\s*:\s*hidden|(?:^|;)\s*opacity\s*:\s*0(?:\.0*)?\s*(?:;|$|!)")
        .expect("HIDDEN_STYLE should compile")
});

/// True when the element's own markup declares it invisible.
///
/// `aria-hidden="true"` is ignored on `fallback-image` wrappers, which some
/// sites use to hide a duplicate of the visible image from screen readers.
pub fn is_declared_hidden(tree: &DomTree, node: NodeId) -> bool {
    if !tree.is_element(node) {
        return false;
    }
    if tree.has_attr(node, "hidden") {
        return true;
    }
    if tree.attr(node, "aria-hidden") == Some("true")
        && !tree.attr(node, "class").is_some_and(|c| c.contains("fallback-image"))
    {
        return true;
    }
    tree.attr(node, "style").is_some_and(|style| HIDDEN_STYLE.is_match(style))
}

/// Both layers combined.
pub fn is_probably_visible(tree: &DomTree, node: NodeId, oracle: &dyn VisibilityOracle) -> bool {
    !is_declared_hidden(tree, node) && oracle.is_visible(tree, node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn element_with(attrs: &[(&str, &str)]) -> (DomTree, NodeId) {
        let mut tree = DomTree::new();
        let div = tree.create_element_with_attrs("div", attrs.iter().copied());
        tree.append_child(tree.root(), div);
        (tree, div)
    }

    #[rstest]
    #[case(&[("hidden", "")], true)]
    #[case(&[("aria-hidden", "true")], true)]
    #[case(&[("aria-hidden", "true"), ("class", "fallback-image")], false)]
    #[case(&[("style", "display: none")], true)]
    #[case(&[("style", "color: red; visibility:hidden")], true)]
    #[case(&[("style", "opacity: 0")], true)]
    #[case(&[("style", "opacity: 0.5")], false)]
    #[case(&[("style", "display:block")], false)]
    #[case(&[], false)]
    fn test_declared_hidden(#[case] attrs: &[(&str, &str)], #[case] hidden: bool) {
        let (tree, div) = element_with(attrs);
        assert_eq!(is_declared_hidden(&tree, div), hidden);
    }

    #[derive(Debug)]
    struct NothingVisible;

    impl VisibilityOracle for NothingVisible {
        fn is_visible(&self, _tree: &DomTree, _node: NodeId) -> bool {
            false
        }
    }

    #[test]
    fn test_oracle_is_consulted() {
        let (tree, div) = element_with(&[]);
        assert!(is_probably_visible(&tree, div, &AlwaysVisible));
        assert!(!is_probably_visible(&tree, div, &NothingVisible));
    }
}
