//! Self-contained extractor for pages the main pipeline cannot handle.
//!
//! Scores a handful of likely content containers plus every visible `div`,
//! strips structural chrome and link farms from the winner, and renders it
//! with a small fixed tag table. There is no configuration: the point is to
//! produce something readable when the scorer found no candidate.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::Document;
use crate::dom_tree::{DomTree, NodeId};
use crate::text_index::TextIndex;
use crate::visibility::{VisibilityOracle, is_probably_visible};

/// Tried in order; the first match of each becomes a candidate.
const PREFERRED_SELECTORS: [&str; 7] = ["article", "main", "#content", ".post", ".article-body", ".entry", ".content"];

/// Removed from the chosen container before rendering.
const REMOVED_TAGS: [&str; 11] =
    ["script", "style", "noscript", "iframe", "svg", "footer", "nav", "form", "aside", "input", "button"];

/// Rendered as nothing.
const SILENT_TAGS: [&str; 8] = ["nav", "footer", "aside", "form", "script", "style", "noscript", "header"];

/// Never part of the rendered text.
const NON_TEXT_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

static POSITIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"article|post|entry|content|main|body|page").expect("POSITIVE should compile"));

static NEGATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"comment|meta|footer|foot|sidebar|nav|menu|advert|ads|social|share").expect("NEGATIVE should compile")
});

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("WHITESPACE should compile"));

static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("BLANK_LINES should compile"));

/// Text of a subtree as a reader would see it, without script or style text.
fn inner_text(tree: &DomTree, node: NodeId) -> String {
    if let Some(text) = tree.text(node) {
        return text.to_string();
    }
    let mut out = String::new();
    for child in tree.children(node) {
        if tree.tag_name(*child).is_some_and(|tag| NON_TEXT_TAGS.contains(&tag)) {
            continue;
        }
        out.push_str(&inner_text(tree, *child));
    }
    out
}

/// Text measured the way [`inner_text`] reads it; links count every character.
fn fallback_index(tree: &DomTree) -> TextIndex {
    TextIndex::build(
        tree,
        |tree, node| tree.tag_name(node).is_some_and(|tag| NON_TEXT_TAGS.contains(&tag)),
        |_, _, stats| stats.chars as f64,
    )
}

/// Link characters over trimmed text characters, or `None` without text.
fn link_ratio(index: &TextIndex, node: NodeId) -> Option<f64> {
    let text_length = index.stats(node).trimmed_len();
    (text_length > 0).then(|| index.link_length(node) / text_length as f64)
}

fn has_class(tree: &DomTree, node: NodeId, class: &str) -> bool {
    tree.attr(node, "class").is_some_and(|value| value.split_whitespace().any(|c| c == class))
}

/// First element under `root` matching a simple `tag`, `#id` or `.class` selector.
fn select_first(tree: &DomTree, root: NodeId, selector: &str) -> Option<NodeId> {
    let elements = tree.elements_by_tag(root, "*").into_iter();
    if let Some(id) = selector.strip_prefix('#') {
        elements.into_iter().find(|n| tree.attr(*n, "id") == Some(id))
    } else if let Some(class) = selector.strip_prefix('.') {
        elements.into_iter().find(|n| has_class(tree, *n, class))
    } else {
        elements.into_iter().find(|n| tree.has_tag(*n, selector))
    }
}

/// Score of a container: longer text, more paragraphs and a content-like
/// class help; links, chrome-like classes and short text hurt.
///
/// Invisible or non-element nodes score negative infinity.
pub fn score_node(tree: &DomTree, node: NodeId, oracle: &dyn VisibilityOracle) -> f64 {
    score_indexed(tree, &fallback_index(tree), node, oracle)
}

fn score_indexed(tree: &DomTree, index: &TextIndex, node: NodeId, oracle: &dyn VisibilityOracle) -> f64 {
    if !tree.is_element(node) || !is_probably_visible(tree, node, oracle) {
        return f64::NEG_INFINITY;
    }

    let text_length = index.stats(node).trimmed_len();
    let mut score = (text_length.max(1) as f64).log10() * 10.0;
    score += index.paragraphs(node) as f64 * 3.0;
    score -= link_ratio(index, node).unwrap_or_default() * 20.0;

    let class_and_id = tree.class_and_id(node).to_lowercase();
    if POSITIVE.is_match(&class_and_id) {
        score += 25.0;
    }
    if NEGATIVE.is_match(&class_and_id) {
        score -= 30.0;
    }
    if text_length < 200 {
        score -= 10.0;
    }
    if tree.has_tag(node, "article") || tree.has_tag(node, "main") {
        score += 30.0;
    }

    score
}

/// The best scoring container, starting from `body` and replacing it only
/// with a strictly higher score.
pub fn find_best_candidate(doc: &Document, oracle: &dyn VisibilityOracle) -> Option<NodeId> {
    let tree = doc.tree();
    let body = doc.body().or_else(|| doc.document_element())?;

    let mut candidates = Vec::new();
    for selector in PREFERRED_SELECTORS {
        if let Some(node) = select_first(tree, tree.root(), selector)
            && is_probably_visible(tree, node, oracle)
        {
            candidates.push(node);
        }
    }
    candidates.extend(tree.elements_by_tag(body, "div").into_iter().filter(|d| is_probably_visible(tree, *d, oracle)));

    let index = fallback_index(tree);
    let mut seen = HashSet::new();
    let mut best = body;
    let mut best_score = score_indexed(tree, &index, body, oracle);
    for candidate in candidates {
        if !seen.insert(candidate) {
            continue;
        }
        let score = score_indexed(tree, &index, candidate, oracle);
        if score > best_score {
            best_score = score;
            best = candidate;
        }
    }

    tracing::debug!(node = best, score = best_score, tag = tree.tag_name(best), "fallback candidate selected");
    Some(best)
}

/// Copies `node` and strips chrome and link-heavy elements from the copy.
///
/// Returns the copy and the id of its top element.
pub fn clean_candidate(tree: &DomTree, node: NodeId) -> (DomTree, NodeId) {
    let mut copy = tree.copy_subtree(node);
    let root = copy.children(copy.root()).first().copied().unwrap_or(copy.root());

    for tag in REMOVED_TAGS {
        for element in copy.elements_by_tag(root, tag) {
            copy.detach(element);
        }
    }

    // Detaching only touches already visited ancestors, so the index stays valid.
    let index = fallback_index(&copy);
    for element in copy.elements_by_tag(root, "*") {
        if !copy.is_attached(element) {
            continue;
        }
        if link_ratio(&index, element).is_some_and(|ratio| ratio > 0.5) {
            copy.detach(element);
        }
    }

    (copy, root)
}

fn render_children(tree: &DomTree, node: NodeId, indent: usize) -> String {
    tree.children(node).iter().map(|child| render(tree, *child, indent)).collect()
}

fn render_list(tree: &DomTree, list: NodeId, indent: usize, ordered: bool) -> String {
    let mut out = String::from("\n");
    let mut index = 0;
    for item in tree.element_children(list) {
        if !tree.has_tag(item, "li") {
            continue;
        }
        index += 1;
        let marker = if ordered { format!("{index}. ") } else { "- ".to_string() };
        let content = render_children(tree, item, indent + 1).trim().replace('\n', " ");
        out.push_str(&"  ".repeat(indent));
        out.push_str(&marker);
        out.push_str(&content);
        out.push('\n');
    }
    out.push('\n');
    out
}

fn render_table(tree: &DomTree, table: NodeId) -> String {
    let rows: Vec<Vec<String>> = tree
        .elements_by_tag(table, "tr")
        .into_iter()
        .map(|row| {
            tree.elements_by_tag(row, "*")
                .into_iter()
                .filter(|cell| tree.has_tag(*cell, "th") || tree.has_tag(*cell, "td"))
                .map(|cell| inner_text(tree, cell).trim().to_string())
                .collect()
        })
        .collect();
    let Some((header, body)) = rows.split_first() else {
        return String::new();
    };

    let line = |cells: &[String]| -> String {
        let mut out: String = cells.iter().map(|c| format!("| {c} ")).collect();
        out.push_str("|\n");
        out
    };

    let mut out = String::from("\n");
    out.push_str(&line(header));
    out.push_str(&"| --- ".repeat(header.len()));
    out.push_str("|\n");
    for row in body {
        out.push_str(&line(row));
    }
    out.push('\n');
    out
}

/// Renders one node with the fixed tag table.
fn render(tree: &DomTree, node: NodeId, indent: usize) -> String {
    if let Some(text) = tree.text(node) {
        return WHITESPACE.replace_all(text, " ").into_owned();
    }
    let Some(tag) = tree.tag_name(node) else {
        return String::new();
    };

    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag[1..].parse::<usize>().unwrap_or(1);
            format!("\n{} {}\n\n", "#".repeat(level), inner_text(tree, node).trim())
        }
        "p" => format!("\n{}\n\n", render_children(tree, node, indent).trim()),
        "br" => "  \n".to_string(),
        "img" => {
            let alt = tree.attr(node, "alt").unwrap_or_default();
            match tree.attr(node, "src") {
                Some(src) if !src.is_empty() => format!("![{alt}]({src})"),
                _ => String::new(),
            }
        }
        "a" => {
            let href = tree.attr(node, "href").unwrap_or_default();
            let text = render_children(tree, node, indent);
            let text = if text.trim().is_empty() { href } else { text.trim() };
            if href.is_empty() { text.to_string() } else { format!("[{text}]({href})") }
        }
        "pre" => {
            let text = inner_text(tree, node);
            format!("\n```\n{}\n```\n\n", text.trim_matches('\n'))
        }
        "code" => {
            let text = inner_text(tree, node);
            if tree.parent(node).is_some_and(|p| tree.has_tag(p, "pre")) { text } else { format!("`{text}`") }
        }
        "ul" => render_list(tree, node, indent, false),
        "ol" => render_list(tree, node, indent, true),
        "blockquote" => {
            let text = render_children(tree, node, indent);
            format!("\n> {}\n\n", text.trim().replace('\n', "\n> "))
        }
        "table" => render_table(tree, node),
        "strong" | "b" => format!("**{}**", render_children(tree, node, indent)),
        "em" | "i" => format!("*{}*", render_children(tree, node, indent)),
        _ if SILENT_TAGS.contains(&tag) => String::new(),
        _ => render_children(tree, node, indent),
    }
}

/// Renders an element as Markdown with the fixed tag table.
///
/// Runs of three or more newlines are squeezed to one blank line and the
/// result is trimmed.
pub fn render_markdown(tree: &DomTree, node: NodeId) -> String {
    let rendered = render(tree, node, 0);
    BLANK_LINES.replace_all(&rendered, "\n\n").trim().to_string()
}

/// Picks, cleans and renders the best container of `doc`.
///
/// Returns an empty string when the document has no content at all.
pub fn fallback_markdown(doc: &Document, oracle: &dyn VisibilityOracle) -> String {
    let Some(candidate) = find_best_candidate(doc, oracle) else {
        return String::new();
    };
    let (cleaned, root) = clean_candidate(doc.tree(), candidate);
    render_markdown(&cleaned, root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::AlwaysVisible;
    use rstest::rstest;

    fn render_html(html: &str) -> String {
        let doc = Document::parse(html).unwrap();
        let body = doc.body().unwrap();
        render_markdown(doc.tree(), body)
    }

    #[test]
    fn test_article_beats_navigation() {
        let paragraph = "<p>Readable prose with enough words to count as real content for the scorer.</p>";
        let html = format!(
            r#"<html><body>
                <div class="menu"><a href="/1">One</a> <a href="/2">Two</a> <a href="/3">Three</a></div>
                <article>{}</article>
            </body></html>"#,
            paragraph.repeat(5)
        );
        let doc = Document::parse(&html).unwrap();
        let best = find_best_candidate(&doc, &AlwaysVisible).unwrap();
        assert_eq!(doc.tree().tag_name(best), Some("article"));
    }

    #[test]
    fn test_hidden_candidates_score_negative_infinity() {
        let doc = Document::parse(r#"<body><div style="display:none"><p>secret</p></div></body>"#).unwrap();
        let div = doc.elements_by_tag("div")[0];
        assert_eq!(score_node(doc.tree(), div, &AlwaysVisible), f64::NEG_INFINITY);
    }

    #[test]
    fn test_scoring_rewards_content_classes() {
        let doc = Document::parse(
            r#"<body><div class="post-content"><p>Same text here.</p></div><div class="sidebar"><p>Same text here.</p></div></body>"#,
        )
        .unwrap();
        let divs = doc.elements_by_tag("div");
        let content = score_node(doc.tree(), divs[0], &AlwaysVisible);
        let sidebar = score_node(doc.tree(), divs[1], &AlwaysVisible);
        assert!((content - sidebar - 55.0).abs() < 1e-9);
    }

    #[test]
    fn test_body_wins_without_better_candidate() {
        let doc = Document::parse("<body><p>Only a paragraph.</p></body>").unwrap();
        assert_eq!(find_best_candidate(&doc, &AlwaysVisible), doc.body());
    }

    #[test]
    fn test_clean_removes_chrome_and_link_farms() {
        let doc = Document::parse(
            r#"<body><div id="main">
                <nav>menu</nav>
                <p>Real text that stays in place.</p>
                <p><a href="/a">Link</a> <a href="/b">farm</a></p>
                <script>var x = 1;</script>
            </div></body>"#,
        )
        .unwrap();
        let main = doc.elements_by_tag("div")[0];
        let (cleaned, root) = clean_candidate(doc.tree(), main);
        let html = cleaned.outer_html(root);
        assert!(html.contains("Real text"));
        assert!(!html.contains("menu"));
        assert!(!html.contains("farm"));
        assert!(!html.contains("var x"));
        assert_eq!(doc.tree().elements_by_tag(main, "nav").len(), 1);
    }

    #[test]
    fn test_deep_nesting_keeps_scores_and_cleaning_intact() {
        let levels = 600;
        let prose = "<p>Readable prose with enough words to count as real content for the scorer.</p>".repeat(5);
        let links = r#"<div><a href="/1">One</a> <a href="/2">Two</a> <a href="/3">Three</a></div>"#;
        let html = format!(
            r#"<html><body>{}<div class="content">{prose}</div>{links}{}</body></html>"#,
            "<div>".repeat(levels),
            "</div>".repeat(levels)
        );
        let doc = Document::parse(&html).unwrap();
        let tree = doc.tree();

        let best = find_best_candidate(&doc, &AlwaysVisible).unwrap();
        assert_eq!(tree.attr(best, "class"), Some("content"));
        let outermost = doc.elements_by_tag("div")[0];
        assert!(score_node(tree, best, &AlwaysVisible) > score_node(tree, outermost, &AlwaysVisible));

        let (cleaned, root) = clean_candidate(tree, doc.body().unwrap());
        assert!(cleaned.elements_by_tag(root, "a").is_empty());
        assert_eq!(cleaned.elements_by_tag(root, "p").len(), 5);
    }

    #[rstest]
    #[case("<h2> Title </h2><p>Body</p>", "## Title\n\nBody")]
    #[case("<p>a<br>b</p>", "a  \nb")]
    #[case(r#"<p><img src="/i.png" alt="pic"></p>"#, "![pic](/i.png)")]
    #[case(r#"<p><a href="/x"></a></p>"#, "[/x](/x)")]
    #[case("<p><a>plain</a></p>", "plain")]
    #[case("<pre><code>\nlet x = 1;\n</code></pre>", "```\nlet x = 1;\n```")]
    #[case("<p>use <code>cargo</code></p>", "use `cargo`")]
    #[case("<blockquote><p>one</p><p>two</p></blockquote>", "> one\n> \n> \n> two")]
    #[case("<p><strong>bold</strong> and <em>it</em></p>", "**bold** and *it*")]
    #[case("<header>site</header><p>kept</p>", "kept")]
    fn test_render(#[case] html: &str, #[case] expected: &str) {
        assert_eq!(render_html(html), expected);
    }

    #[test]
    fn test_render_nested_lists() {
        let output = render_html("<ul><li>one</li><li>two<ol><li>inner</li></ol></li></ul>");
        assert_eq!(output, "- one\n- two   1. inner");
    }

    #[test]
    fn test_render_table() {
        let output = render_html("<table><tr><th>H</th><th>I</th></tr><tr><td>a</td><td>b</td></tr></table>");
        assert_eq!(output, "| H | I |\n| --- | --- |\n| a | b |");
    }

    #[test]
    fn test_fallback_markdown_on_empty_body() {
        let doc = Document::parse("<html><body></body></html>").unwrap();
        assert_eq!(fallback_markdown(&doc, &AlwaysVisible), "");
    }
}
