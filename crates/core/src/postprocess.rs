//! Content cleaning after sibling merging.
//!
//! [`prep_article`] is the destructive pass over the merged container: it
//! drops presentational attributes, forms, embeds, share widgets and
//! conditionally irrelevant blocks, and tidies paragraphs and tables.
//! [`post_process_content`] runs once on the accepted result and collapses
//! wrapper chains and strips classes and ids.
//!
//! A node that can no longer be removed is skipped; cleaning never fails.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::dom_tree::{DomTree, NodeId};
use crate::extract::ExtractFlags;
use crate::patterns::PatternSet;
use crate::scoring::{
    class_weight, comma_count, has_ancestor_tag, inner_text, is_element_without_content, is_phrasing_content,
    link_density, next_significant, single_child_with_tag,
};

/// Attributes that only affect rendering.
const PRESENTATIONAL_ATTRIBUTES: [&str; 12] = [
    "align", "background", "bgcolor", "border", "cellpadding", "cellspacing", "frame", "hspace", "rules", "style",
    "valign", "vspace",
];

/// Elements whose `width`/`height` attributes are dropped as well.
const DEPRECATED_SIZE_ATTRIBUTE_ELEMS: [&str; 5] = ["table", "th", "td", "hr", "pre"];

static IMAGE_SRCSET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp)\s+\d").expect("IMAGE_SRCSET should compile"));

static IMAGE_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*\S+\.(jpg|jpeg|png|webp)\S*\s*$").expect("IMAGE_SRC should compile"));

/// Configuration for HTML post-processing cleanup
#[derive(Debug, Clone)]
pub struct PostProcessConfig {
    /// Classes kept when stripping class attributes
    pub classes_to_preserve: Vec<String>,
    /// Whether to keep class and id attributes (default: false)
    pub keep_classes: bool,
}

impl Default for PostProcessConfig {
    fn default() -> Self {
        Self { classes_to_preserve: vec!["page".to_string()], keep_classes: false }
    }
}

/// Removes `id`, logging instead of failing when it is already detached.
fn remove_node(tree: &mut DomTree, id: NodeId) {
    if let Err(err) = tree.remove(id) {
        tracing::trace!(%err, "skipping node during cleanup");
    }
}

/// Removes every element with `tag` under `root` for which `filter` holds,
/// last (deepest) first.
fn remove_tagged(tree: &mut DomTree, root: NodeId, tag: &str, mut filter: impl FnMut(&DomTree, NodeId) -> bool) {
    for node in tree.elements_by_tag(root, tag).into_iter().rev() {
        if filter(tree, node) {
            tracing::trace!(tag, node, "cleaning");
            remove_node(tree, node);
        }
    }
}

struct Cleaner<'a> {
    flags: ExtractFlags,
    patterns: &'a PatternSet,
    share_threshold: usize,
    data_tables: HashSet<NodeId>,
}

/// Cleans the merged article container in place.
///
/// `share_threshold` is the text length under which a share widget is dropped.
pub fn prep_article(
    tree: &mut DomTree, root: NodeId, flags: ExtractFlags, patterns: &PatternSet, share_threshold: usize,
) {
    let mut cleaner = Cleaner { flags, patterns, share_threshold, data_tables: HashSet::new() };

    clean_styles(tree, root);
    cleaner.mark_data_tables(tree, root);
    fix_lazy_images(tree, root);

    if flags.strip_unlikelys {
        cleaner.clean_unlikely(tree, root);
    }

    cleaner.clean_conditionally(tree, root, "form");
    cleaner.clean_conditionally(tree, root, "fieldset");
    for tag in ["object", "embed", "footer", "link", "aside"] {
        cleaner.clean(tree, root, tag);
    }

    for child in tree.element_children(root).collect::<Vec<_>>() {
        cleaner.clean_share_elements(tree, child);
    }

    for tag in ["iframe", "input", "textarea", "select", "button"] {
        cleaner.clean(tree, root, tag);
    }
    cleaner.clean_headers(tree, root);

    for tag in ["table", "ul", "div"] {
        cleaner.clean_conditionally(tree, root, tag);
    }

    for h1 in tree.elements_by_tag(root, "h1") {
        tree.set_tag(h1, "h2");
    }

    remove_tagged(tree, root, "p", |tree, p| {
        let media: usize =
            ["img", "embed", "object", "iframe"].iter().map(|tag| tree.elements_by_tag(p, tag).len()).sum();
        media == 0 && tree.text_content(p).trim().is_empty()
    });

    for br in tree.elements_by_tag(root, "br") {
        if next_significant(tree, tree.next_sibling(br)).is_some_and(|next| tree.has_tag(next, "p")) {
            remove_node(tree, br);
        }
    }

    replace_single_cell_tables(tree, root);
}

/// Strips presentational attributes, leaving `svg` subtrees alone.
fn clean_styles(tree: &mut DomTree, root: NodeId) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let Some(tag) = tree.tag_name(node).map(str::to_string) else {
            continue;
        };
        if tag == "svg" {
            continue;
        }
        let sized = DEPRECATED_SIZE_ATTRIBUTE_ELEMS.contains(&tag.as_str());
        tree.retain_attrs(node, |name, _| {
            !PRESENTATIONAL_ATTRIBUTES.contains(&name) && !(sized && (name == "width" || name == "height"))
        });
        stack.extend(tree.element_children(node));
    }
}

/// Promotes lazy-loading attributes to `src`/`srcset` on images that have
/// no real source yet.
fn fix_lazy_images(tree: &mut DomTree, root: NodeId) {
    let mut images = tree.elements_by_tag(root, "img");
    images.extend(tree.elements_by_tag(root, "picture"));

    for image in images {
        let has_src = tree.attr(image, "src").is_some_and(|src| !src.trim().is_empty() && !src.starts_with("data:"));
        let has_srcset = tree.attr(image, "srcset").is_some_and(|srcset| !srcset.is_empty() && srcset != "null");
        if has_src || has_srcset {
            continue;
        }

        if let Some(src) = tree.attr(image, "data-src").map(str::to_string) {
            tree.set_attr(image, "src", &src);
        }
        if let Some(srcset) = tree.attr(image, "data-srcset").map(str::to_string) {
            tree.set_attr(image, "srcset", &srcset);
        }

        let promoted: Vec<(&str, String)> = tree
            .attrs(image)
            .iter()
            .filter(|(name, _)| !matches!(name.as_str(), "src" | "srcset" | "alt" | "data-src" | "data-srcset"))
            .filter_map(|(_, value)| {
                if IMAGE_SRCSET.is_match(value) {
                    Some(("srcset", value.clone()))
                } else if IMAGE_SRC.is_match(value) {
                    Some(("src", value.clone()))
                } else {
                    None
                }
            })
            .collect();
        for (name, value) in promoted {
            if !tree.has_attr(image, name) {
                tree.set_attr(image, name, &value);
            }
        }
    }
}

/// Replaces `table > tbody? > tr > td` with the cell, as `p` when it only
/// holds phrasing content and as `div` otherwise.
fn replace_single_cell_tables(tree: &mut DomTree, root: NodeId) {
    for table in tree.elements_by_tag(root, "table") {
        if tree.parent(table).is_none() {
            continue;
        }
        let body = single_child_with_tag(tree, table, "tbody").unwrap_or(table);
        let Some(row) = single_child_with_tag(tree, body, "tr") else {
            continue;
        };
        let Some(cell) = single_child_with_tag(tree, row, "td") else {
            continue;
        };
        let phrasing = tree.children(cell).iter().all(|child| is_phrasing_content(tree, *child));
        tree.set_tag(cell, if phrasing { "p" } else { "div" });
        tree.replace(table, cell);
    }
}

impl Cleaner<'_> {
    /// Class weight, or zero when class weighting is switched off.
    fn weight(&self, tree: &DomTree, node: NodeId) -> f64 {
        if self.flags.weight_classes { class_weight(tree, node, self.patterns) } else { 0.0 }
    }

    fn is_video(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.attrs(node).iter().any(|(_, value)| self.patterns.videos.is_match(value))
            || (tree.has_tag(node, "object") && self.patterns.videos.is_match(&tree.inner_html(node)))
    }

    fn mark_data_tables(&mut self, tree: &DomTree, root: NodeId) {
        for table in tree.elements_by_tag(root, "table") {
            if is_data_table(tree, table) {
                self.data_tables.insert(table);
            }
        }
    }

    fn clean_unlikely(&self, tree: &mut DomTree, root: NodeId) {
        remove_tagged(tree, root, "*", |tree, node| {
            let tag = tree.tag_name(node).unwrap_or_default();
            tag != "a"
                && tag != "body"
                && self.patterns.is_unlikely(&tree.class_and_id(node))
                && !has_ancestor_tag(tree, node, "table", 3, |_| true)
                && !has_ancestor_tag(tree, node, "code", 3, |_| true)
        });
    }

    /// Removes every `tag` element, keeping embeds from known video hosts.
    fn clean(&self, tree: &mut DomTree, root: NodeId, tag: &str) {
        let is_embed = matches!(tag, "object" | "embed" | "iframe");
        remove_tagged(tree, root, tag, |tree, node| !(is_embed && self.is_video(tree, node)));
    }

    fn clean_share_elements(&self, tree: &mut DomTree, container: NodeId) {
        let end = tree.next_node(container, true);
        let mut node = tree.next_node(container, false);
        while let Some(id) = node {
            if Some(id) == end {
                break;
            }
            let is_share = self.patterns.share.is_match(&tree.class_and_id(id))
                && tree.text_content(id).chars().count() < self.share_threshold;
            if is_share {
                node = tree.next_node(id, true);
                remove_node(tree, id);
            } else {
                node = tree.next_node(id, false);
            }
        }
    }

    /// Drops `h1`/`h2` headings with a negative class weight.
    fn clean_headers(&self, tree: &mut DomTree, root: NodeId) {
        for tag in ["h1", "h2"] {
            remove_tagged(tree, root, tag, |tree, node| self.weight(tree, node) < 0.0);
        }
    }

    fn clean_conditionally(&self, tree: &mut DomTree, root: NodeId, tag: &str) {
        if !self.flags.clean_conditionally {
            return;
        }
        remove_tagged(tree, root, tag, |tree, node| self.should_remove_conditionally(tree, node, tag));
    }

    fn should_remove_conditionally(&self, tree: &DomTree, node: NodeId, tag: &str) -> bool {
        let content_length = inner_text(tree, node).chars().count();
        let mut is_list = matches!(tag, "ul" | "ol");
        if !is_list && content_length > 0 {
            let list_length: usize = ["ul", "ol"]
                .iter()
                .flat_map(|list| tree.elements_by_tag(node, list))
                .map(|list| inner_text(tree, list).chars().count())
                .sum();
            is_list = list_length as f64 / content_length as f64 > 0.9;
        }

        if tag == "table" && self.data_tables.contains(&node) {
            return false;
        }
        if has_ancestor_tag(tree, node, "table", 0, |table| self.data_tables.contains(&table)) {
            return false;
        }
        if has_ancestor_tag(tree, node, "code", 3, |_| true) {
            return false;
        }

        let weight = self.weight(tree, node);
        if weight < 0.0 {
            return true;
        }

        if comma_count(&inner_text(tree, node)) >= 10 {
            return false;
        }

        let count = |tag: &str| tree.elements_by_tag(node, tag).len();
        let paragraphs = count("p") as f64;
        let images = count("img") as f64;
        let items = count("li") as f64 - 100.0;
        let inputs = count("input") as f64;
        let heading_density = text_density(tree, node, &["h1", "h2", "h3", "h4", "h5", "h6"]);

        let mut embeds = 0;
        for tag in ["object", "embed", "iframe"] {
            for embed in tree.elements_by_tag(node, tag) {
                if self.is_video(tree, embed) {
                    return false;
                }
                embeds += 1;
            }
        }

        let density = link_density(tree, node);
        let in_figure = has_ancestor_tag(tree, node, "figure", 3, |_| true);

        let have_to_remove = (images > 1.0 && paragraphs / images < 0.5 && !in_figure)
            || (!is_list && items > paragraphs)
            || (inputs > (paragraphs / 3.0).floor())
            || (!is_list
                && heading_density < 0.9
                && content_length < 25
                && (images == 0.0 || images > 2.0)
                && !in_figure)
            || (!is_list && weight < 25.0 && density > 0.2)
            || (weight >= 25.0 && density > 0.5)
            || (embeds == 1 && content_length < 75)
            || embeds > 1;

        // Simple image lists stay.
        if is_list && have_to_remove {
            if tree.element_children(node).any(|child| tree.element_children(child).count() > 1) {
                return true;
            }
            if images as usize == count("li") {
                return false;
            }
        }

        have_to_remove
    }
}

/// Share of the node's text that sits inside elements with one of `tags`.
fn text_density(tree: &DomTree, node: NodeId, tags: &[&str]) -> f64 {
    let length = inner_text(tree, node).chars().count();
    if length == 0 {
        return 0.0;
    }
    let tagged: usize = tags
        .iter()
        .flat_map(|tag| tree.elements_by_tag(node, tag))
        .map(|child| inner_text(tree, child).chars().count())
        .sum();
    tagged as f64 / length as f64
}

/// Decides whether a table holds data rather than layout.
pub fn is_data_table(tree: &DomTree, table: NodeId) -> bool {
    if tree.attr(table, "role") == Some("presentation") || tree.attr(table, "datatable") == Some("0") {
        return false;
    }
    if tree.attr(table, "summary").is_some_and(|s| !s.is_empty()) {
        return true;
    }
    if tree.elements_by_tag(table, "caption").first().is_some_and(|caption| !tree.children(*caption).is_empty()) {
        return true;
    }
    if ["col", "colgroup", "tfoot", "thead", "th"].iter().any(|tag| !tree.elements_by_tag(table, tag).is_empty()) {
        return true;
    }
    if !tree.elements_by_tag(table, "table").is_empty() {
        return false;
    }

    let (rows, columns) = row_and_column_count(tree, table);
    rows >= 10 || columns > 4 || rows * columns > 10
}

fn span(tree: &DomTree, node: NodeId, name: &str) -> usize {
    tree.attr(node, name).and_then(|v| v.trim().parse::<usize>().ok()).filter(|n| *n > 0).unwrap_or(1)
}

fn row_and_column_count(tree: &DomTree, table: NodeId) -> (usize, usize) {
    let mut rows = 0;
    let mut columns = 0;
    for row in tree.elements_by_tag(table, "tr") {
        rows += span(tree, row, "rowspan");
        let width: usize = tree.elements_by_tag(row, "td").into_iter().map(|cell| span(tree, cell, "colspan")).sum();
        columns = columns.max(width);
    }
    (rows, columns)
}

/// Final tidy-up of an accepted article.
pub fn post_process_content(tree: &mut DomTree, root: NodeId, config: &PostProcessConfig) {
    simplify_nested_elements(tree, root);
    if !config.keep_classes {
        clean_classes(tree, root, &config.classes_to_preserve);
    }
}

fn is_page_marker(tree: &DomTree, node: NodeId) -> bool {
    tree.attr(node, "id").is_some_and(|id| id.starts_with("readability"))
}

/// Collapses `div`/`section` wrappers around a single `div`/`section` into
/// the inner element and drops empty ones.
///
/// The wrapper's attributes are carried down to the surviving child.
pub fn simplify_nested_elements(tree: &mut DomTree, root: NodeId) {
    let end = tree.next_node(root, true);
    let mut node = Some(root);

    while let Some(id) = node {
        if Some(id) == end {
            break;
        }
        let is_wrapper = matches!(tree.tag_name(id), Some("div" | "section"));
        if id != root && is_wrapper && !is_page_marker(tree, id) {
            if is_element_without_content(tree, id) {
                node = tree.next_node(id, true);
                remove_node(tree, id);
                continue;
            }
            let child = single_child_with_tag(tree, id, "div").or_else(|| single_child_with_tag(tree, id, "section"));
            if let Some(child) = child {
                for (name, value) in tree.attrs(id).to_vec() {
                    tree.set_attr(child, &name, &value);
                }
                tree.replace(id, child);
                node = Some(child);
                continue;
            }
        }
        node = tree.next_node(id, false);
    }
}

/// Strips classes outside `preserve` and ids other than page markers.
pub fn clean_classes(tree: &mut DomTree, root: NodeId, preserve: &[String]) {
    let mut nodes = vec![root];
    nodes.extend(tree.elements_by_tag(root, "*"));

    for node in nodes {
        if let Some(class) = tree.attr(node, "class") {
            let kept: Vec<&str> = class.split_whitespace().filter(|c| preserve.iter().any(|p| p == c)).collect();
            let kept = kept.join(" ");
            if kept.is_empty() {
                tree.remove_attr(node, "class");
            } else {
                tree.set_attr(node, "class", &kept);
            }
        }
        if tree.attr(node, "id").is_some_and(|id| !id.starts_with("readability-page-")) {
            tree.remove_attr(node, "id");
        }
    }
}
