//! Content scoring for candidate selection.
//!
//! Every scorable block (`p`, `pre`, `td`, `section`, `h2`..`h6`) with enough
//! text earns a base score from its length and comma count. That score flows
//! up the ancestor chain with weight `1/level`, so a container collecting many
//! good paragraphs ends up ahead of any single one. Link density then scales
//! each candidate down.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::dom_tree::{DomTree, NodeId};
use crate::patterns::PatternSet;
use crate::text_index::TextIndex;

/// Tags whose own text is scored.
pub const SCORABLE_TAGS: [&str; 9] = ["section", "h2", "h3", "h4", "h5", "h6", "p", "td", "pre"];

/// Elements that can live inside a paragraph.
pub const PHRASING_ELEMENTS: [&str; 39] = [
    "abbr", "audio", "b", "bdo", "br", "button", "cite", "code", "data", "datalist", "dfn", "em", "embed", "i", "img",
    "input", "kbd", "label", "mark", "math", "meter", "noscript", "object", "output", "progress", "q", "ruby", "samp",
    "script", "select", "small", "span", "strong", "sub", "sup", "textarea", "time", "var", "wbr",
];

/// Comma and its locale equivalents.
const COMMAS: [char; 9] = [
    '\u{002C}', '\u{060C}', '\u{FE50}', '\u{FE10}', '\u{FE11}', '\u{2E41}', '\u{2E34}', '\u{2E32}', '\u{FF0C}',
];

static NORMALIZE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s{2,}").expect("NORMALIZE should compile"));

/// Trimmed text content with internal whitespace runs collapsed to one space.
pub fn inner_text(tree: &DomTree, node: NodeId) -> String {
    let text = tree.text_content(node);
    NORMALIZE.replace_all(text.trim(), " ").into_owned()
}

/// Comma or one of its locale equivalents.
pub fn is_comma(c: char) -> bool {
    COMMAS.contains(&c)
}

/// Number of commas (any locale variant) in `text`.
pub fn comma_count(text: &str) -> usize {
    text.chars().filter(|c| is_comma(*c)).count()
}

/// True for whitespace-only text nodes and `<br>` elements.
pub fn is_whitespace_node(tree: &DomTree, node: NodeId) -> bool {
    match tree.text(node) {
        Some(text) => text.trim().is_empty(),
        None => tree.has_tag(node, "br"),
    }
}

/// First node from `node` on (following siblings) that is not whitespace-only text.
pub fn next_significant(tree: &DomTree, node: Option<NodeId>) -> Option<NodeId> {
    let mut next = node;
    while let Some(id) = next {
        if tree.is_element(id) || !tree.text(id).unwrap_or_default().trim().is_empty() {
            return Some(id);
        }
        next = tree.next_sibling(id);
    }
    None
}

/// The only element child when it has `tag` and no text sits beside it.
pub fn single_child_with_tag(tree: &DomTree, id: NodeId, tag: &str) -> Option<NodeId> {
    let mut children = tree.element_children(id);
    let child = children.next()?;
    if children.next().is_some() || !tree.has_tag(child, tag) {
        return None;
    }
    let has_text = tree.children(id).iter().any(|n| tree.text(*n).is_some_and(|t| !t.trim().is_empty()));
    if has_text { None } else { Some(child) }
}

/// No text, and no element children other than `<br>`/`<hr>`.
pub fn is_element_without_content(tree: &DomTree, id: NodeId) -> bool {
    if !tree.text_content(id).trim().is_empty() {
        return false;
    }
    let children = tree.element_children(id).count();
    let breaks = tree.elements_by_tag(id, "br").len() + tree.elements_by_tag(id, "hr").len();
    children == 0 || children == breaks
}

/// Text nodes, phrasing elements, and `a`/`del`/`ins` wrapping only phrasing content.
pub fn is_phrasing_content(tree: &DomTree, node: NodeId) -> bool {
    if tree.is_text(node) {
        return true;
    }
    match tree.tag_name(node) {
        Some(tag) if PHRASING_ELEMENTS.contains(&tag) => true,
        Some("a" | "del" | "ins") => tree.children(node).iter().all(|child| is_phrasing_content(tree, *child)),
        _ => false,
    }
}

/// True when an ancestor at most `max_depth` levels above the parent (0 =
/// unlimited) has `tag` and passes `filter`.
pub fn has_ancestor_tag(
    tree: &DomTree, node: NodeId, tag: &str, max_depth: usize, filter: impl Fn(NodeId) -> bool,
) -> bool {
    tree.ancestors(node)
        .enumerate()
        .take_while(|(depth, _)| max_depth == 0 || *depth <= max_depth)
        .any(|(_, ancestor)| tree.has_tag(ancestor, tag) && filter(ancestor))
}

/// Calculate the link density of an element
///
/// Link text characters over all text characters. Fragment links (`#...`)
/// count at 30%. Returns 0 for elements without text.
pub fn link_density(tree: &DomTree, node: NodeId) -> f64 {
    let text_length = inner_text(tree, node).chars().count();
    if text_length == 0 {
        return 0.0;
    }

    let link_length: f64 = tree
        .elements_by_tag(node, "a")
        .into_iter()
        .map(|link| inner_text(tree, link).chars().count() as f64 * link_coefficient(tree, link))
        .sum();

    link_length / text_length as f64
}

fn link_coefficient(tree: &DomTree, link: NodeId) -> f64 {
    match tree.attr(link, "href") {
        Some(href) if href.len() > 1 && href.starts_with('#') => 0.3,
        _ => 1.0,
    }
}

/// Normalized text lengths and weighted link lengths for the whole tree, as
/// [`inner_text`] and [`link_density`] measure them.
pub fn scoring_index(tree: &DomTree) -> TextIndex {
    TextIndex::build(
        tree,
        |_, _| false,
        |tree, link, stats| stats.normalized_len() as f64 * link_coefficient(tree, link),
    )
}

/// [`link_density`] read from a prebuilt [`scoring_index`].
pub fn indexed_link_density(index: &TextIndex, node: NodeId) -> f64 {
    let text_length = index.stats(node).normalized_len();
    if text_length == 0 { 0.0 } else { index.link_length(node) / text_length as f64 }
}

/// Score a scorable node contributes to its ancestors, or `None` when its
/// text is shorter than 25 characters.
pub fn base_content_score(text: &str) -> Option<f64> {
    content_score(text.chars().count(), comma_count(text))
}

fn content_score(length: usize, commas: usize) -> Option<f64> {
    if length < 25 {
        return None;
    }
    let length_points = (length / 100).min(3) as f64;
    Some(1.0 + commas as f64 + length_points)
}

/// Weight from the tag alone, applied once when a candidate is first seen.
pub fn tag_weight(tag: &str) -> f64 {
    match tag {
        "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    }
}

/// Class/id weight: ±25 each for `class` and `id` against the positive and
/// negative patterns.
pub fn class_weight(tree: &DomTree, node: NodeId, patterns: &PatternSet) -> f64 {
    let mut weight = 0.0;
    for name in ["class", "id"] {
        if let Some(value) = tree.attr(node, name).filter(|v| !v.is_empty()) {
            if patterns.negative.is_match(value) {
                weight -= 25.0;
            }
            if patterns.positive.is_match(value) {
                weight += 25.0;
            }
        }
    }
    weight
}

/// Starting score of a newly seen candidate.
pub fn initial_score(tree: &DomTree, node: NodeId, patterns: &PatternSet, weight_classes: bool) -> f64 {
    let tag = tree.tag_name(node).unwrap_or_default();
    let weight = if weight_classes { class_weight(tree, node, patterns) } else { 0.0 };
    tag_weight(tag) + weight
}

/// Scales a raw score by link density.
///
/// Positive scores shrink towards zero and negative scores grow more
/// negative, so the result never increases with link density. Negative
/// infinity stays put.
pub fn apply_link_density(score: f64, link_density: f64) -> f64 {
    if score == f64::NEG_INFINITY {
        score
    } else if score >= 0.0 {
        score * (1.0 - link_density)
    } else {
        score * (1.0 + link_density)
    }
}

/// A scored container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub node: NodeId,
    /// Final score, or negative infinity when the node has no text.
    pub score: f64,
    /// Number of ancestors above the node.
    pub depth: usize,
}

/// Raw scores of every node that received a contribution, in the order they
/// were first reached.
#[derive(Debug, Clone, Default)]
pub struct ScoreTable {
    scores: HashMap<NodeId, f64>,
    order: Vec<NodeId>,
}

impl ScoreTable {
    pub fn get(&self, node: NodeId) -> Option<f64> {
        self.scores.get(&node).copied()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.scores.contains_key(&node)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Nodes in first-seen order.
    pub fn nodes(&self) -> &[NodeId] {
        &self.order
    }

    /// Records a node with its starting score. Existing entries are kept.
    pub fn init(&mut self, node: NodeId, score: f64) {
        if !self.scores.contains_key(&node) {
            self.scores.insert(node, score);
            self.order.push(node);
        }
    }

    pub fn set(&mut self, node: NodeId, score: f64) {
        if let Some(slot) = self.scores.get_mut(&node) {
            *slot = score;
        } else {
            self.init(node, score);
        }
    }

    pub fn add(&mut self, node: NodeId, amount: f64) {
        if let Some(slot) = self.scores.get_mut(&node) {
            *slot += amount;
        }
    }
}

/// Scores `elements` and propagates their base scores to ancestors.
///
/// Ancestors are initialised on first contact with [`initial_score`]; the
/// walk stops below the `<html>` element. Elements without an element parent
/// or with less than 25 characters of text contribute nothing.
pub fn score_elements(tree: &DomTree, elements: &[NodeId], patterns: &PatternSet, weight_classes: bool) -> ScoreTable {
    let mut table = ScoreTable::default();
    let index = scoring_index(tree);

    for &element in elements {
        if tree.parent(element).is_none_or(|parent| !tree.is_element(parent)) {
            continue;
        }
        let stats = index.stats(element);
        let Some(base) = content_score(stats.normalized_len(), stats.commas) else {
            continue;
        };

        let ancestors: Vec<NodeId> = tree
            .ancestors(element)
            .take_while(|ancestor| tree.is_element(*ancestor) && !tree.has_tag(*ancestor, "html"))
            .collect();

        for (index, ancestor) in ancestors.into_iter().enumerate() {
            if tree.parent(ancestor).is_none_or(|parent| !tree.is_element(parent)) {
                continue;
            }
            table.init(ancestor, initial_score(tree, ancestor, patterns, weight_classes));
            let level = (index + 1) as f64;
            table.add(ancestor, base / level);
        }
    }

    table
}

/// Turns raw scores into link-density-adjusted candidates.
///
/// Candidates without any text score negative infinity.
pub fn finalize_candidates(tree: &DomTree, table: &mut ScoreTable) -> Vec<Candidate> {
    let index = scoring_index(tree);
    let nodes = table.nodes().to_vec();
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        let raw = table.get(node).unwrap_or_default();
        let score = if index.stats(node).is_blank() {
            f64::NEG_INFINITY
        } else {
            apply_link_density(raw, indexed_link_density(&index, node))
        };
        table.set(node, score);
        out.push(Candidate { node, score, depth: index.depth(node) });
    }
    out
}

/// Position of every node in a preorder walk from the root.
pub fn document_order(tree: &DomTree) -> HashMap<NodeId, usize> {
    tree.descendants(tree.root()).into_iter().enumerate().map(|(index, node)| (node, index)).collect()
}

/// Sorts candidates by descending score, earlier nodes first on ties, and
/// keeps the best `limit`.
pub fn rank_candidates(candidates: &mut Vec<Candidate>, order: &HashMap<NodeId, usize>, limit: usize) {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| order.get(&a.node).cmp(&order.get(&b.node)))
    });
    candidates.truncate(limit.max(1));
}
