//! Per-node text measurements gathered in one bottom-up pass.
//!
//! Scoring asks the same questions of nested containers over and over (how
//! long is the text, how much of it is link text, how many paragraphs sit
//! below). Walking each subtree per question costs time proportional to
//! depth times size. [`TextIndex`] answers all of them from a single pass.

use crate::dom_tree::{DomTree, NodeId};
use crate::scoring::is_comma;

/// Length summary of a piece of text that composes under concatenation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextStats {
    /// All characters.
    pub chars: usize,
    /// Non-whitespace characters.
    pub visible: usize,
    /// Whitespace runs with visible text on both sides.
    pub gaps: usize,
    /// Whitespace characters before the first visible one (all of them when blank).
    pub leading: usize,
    /// Whitespace characters after the last visible one (all of them when blank).
    pub trailing: usize,
    pub commas: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        text.chars().fold(Self::default(), |acc, c| acc.then(Self::char(c)))
    }

    fn char(c: char) -> Self {
        if c.is_whitespace() {
            Self { chars: 1, leading: 1, trailing: 1, ..Self::default() }
        } else {
            Self { chars: 1, visible: 1, commas: usize::from(is_comma(c)), ..Self::default() }
        }
    }

    /// Stats of `self` followed by `next`.
    pub fn then(self, next: Self) -> Self {
        let joined = self.visible > 0 && next.visible > 0 && (self.trailing > 0 || next.leading > 0);
        Self {
            chars: self.chars + next.chars,
            visible: self.visible + next.visible,
            gaps: self.gaps + next.gaps + usize::from(joined),
            leading: if self.visible == 0 { self.chars + next.leading } else { self.leading },
            trailing: if next.visible == 0 { self.trailing + next.chars } else { next.trailing },
            commas: self.commas + next.commas,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.visible == 0
    }

    /// Characters after trimming and collapsing every whitespace run to one space.
    pub fn normalized_len(&self) -> usize {
        self.visible + self.gaps
    }

    /// Characters after trimming only.
    pub fn trimmed_len(&self) -> usize {
        if self.is_blank() { 0 } else { self.chars - self.leading - self.trailing }
    }
}

/// Text stats, weighted link text, paragraph count and depth for every node
/// reachable from the tree root.
#[derive(Debug, Clone)]
pub struct TextIndex {
    stats: Vec<TextStats>,
    link_length: Vec<f64>,
    paragraphs: Vec<usize>,
    depth: Vec<usize>,
}

impl TextIndex {
    /// Builds the index.
    ///
    /// Children for which `skip` returns true add nothing to their parent's
    /// text; links and paragraphs inside them still count. Each `<a>` adds
    /// `link_length(tree, a, stats_of_a)` to every ancestor.
    pub fn build(
        tree: &DomTree, skip: impl Fn(&DomTree, NodeId) -> bool,
        link_length: impl Fn(&DomTree, NodeId, &TextStats) -> f64,
    ) -> Self {
        let size = tree.len();
        let mut index = Self {
            stats: vec![TextStats::default(); size],
            link_length: vec![0.0; size],
            paragraphs: vec![0; size],
            depth: vec![0; size],
        };

        let root = tree.root();
        let mut order = Vec::with_capacity(size);
        order.push(root);
        order.extend(tree.descendants(root));

        for &node in &order {
            if let Some(parent) = tree.parent(node) {
                index.depth[node] = index.depth[parent] + 1;
            }
        }

        for &node in order.iter().rev() {
            if let Some(text) = tree.text(node) {
                index.stats[node] = TextStats::of(text);
                continue;
            }
            let mut stats = TextStats::default();
            let mut links = 0.0;
            let mut paragraphs = 0;
            for &child in tree.children(node) {
                if !skip(tree, child) {
                    stats = stats.then(index.stats[child]);
                }
                if tree.has_tag(child, "a") {
                    links += link_length(tree, child, &index.stats[child]);
                }
                if tree.has_tag(child, "p") {
                    paragraphs += 1;
                }
                links += index.link_length[child];
                paragraphs += index.paragraphs[child];
            }
            index.stats[node] = stats;
            index.link_length[node] = links;
            index.paragraphs[node] = paragraphs;
        }

        index
    }

    pub fn stats(&self, node: NodeId) -> TextStats {
        self.stats.get(node).copied().unwrap_or_default()
    }

    /// Summed link length of every `<a>` below `node`.
    pub fn link_length(&self, node: NodeId) -> f64 {
        self.link_length.get(node).copied().unwrap_or_default()
    }

    /// Number of `<p>` elements below `node`.
    pub fn paragraphs(&self, node: NodeId) -> usize {
        self.paragraphs.get(node).copied().unwrap_or_default()
    }

    /// Number of ancestors above `node`.
    pub fn depth(&self, node: NodeId) -> usize {
        self.depth.get(node).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::Document;
    use crate::scoring::inner_text;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("word")]
    #[case("  Hello \n\n   world  ")]
    #[case("a b  c\t\td, e\u{a0}\u{a0}f")]
    fn test_stats_match_string_operations(#[case] text: &str) {
        let stats = TextStats::of(text);
        let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
        assert_eq!(stats.normalized_len(), collapsed.chars().count());
        assert_eq!(stats.trimmed_len(), text.trim().chars().count());
        assert_eq!(stats.chars, text.chars().count());
        assert_eq!(stats.is_blank(), text.trim().is_empty());
    }

    #[rstest]
    #[case("Hello ", "world")]
    #[case("Hello", " world")]
    #[case("Hello", "world")]
    #[case("  ", "  x  ")]
    #[case(" x ", "   ")]
    #[case("a, b", " , c")]
    fn test_stats_compose(#[case] left: &str, #[case] right: &str) {
        let joined = format!("{left}{right}");
        assert_eq!(TextStats::of(left).then(TextStats::of(right)), TextStats::of(&joined));
    }

    #[test]
    fn test_index_agrees_with_subtree_walks() {
        let html = r##"<html><body><div id="a">
            <p>First,   paragraph <a href="/x">with  link</a>.</p>
            <div><p>Second <a href="#note">note</a></p><a href="/y"><span>nested</span></a></div>
        </div></body></html>"##;
        let doc = Document::parse(html).unwrap();
        let tree = doc.tree();
        let index = TextIndex::build(tree, |_, _| false, |_, _, stats| stats.normalized_len() as f64);

        for node in doc.elements_by_tag("*") {
            assert_eq!(index.stats(node).normalized_len(), inner_text(tree, node).chars().count());
            assert_eq!(index.paragraphs(node), tree.elements_by_tag(node, "p").len());
            assert_eq!(index.depth(node), tree.ancestors(node).count());
            let links: usize =
                tree.elements_by_tag(node, "a").into_iter().map(|a| inner_text(tree, a).chars().count()).sum();
            assert_eq!(index.link_length(node), links as f64);
        }
    }

    #[test]
    fn test_skipped_children_add_no_text() {
        let doc = Document::parse("<div>kept<script>dropped()</script></div>").unwrap();
        let div = doc.elements_by_tag("div")[0];
        let index = TextIndex::build(doc.tree(), |tree, node| tree.has_tag(node, "script"), |_, _, _| 0.0);
        assert_eq!(index.stats(div).chars, 4);
    }
}
