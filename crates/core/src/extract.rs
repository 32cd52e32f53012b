//! Candidate selection and sibling merging.
//!
//! [`extract_content`] runs the main extraction loop over a normalized tree.
//! Each attempt works on a fresh clone: it prunes unlikely nodes, scores
//! paragraphs, picks the best container, merges its qualifying siblings and
//! cleans the result. When the cleaned text is too short, heuristics are
//! relaxed one at a time and the loop starts again.

use crate::dom_tree::{DomTree, NodeId};
use crate::metadata::text_similarity;
use crate::patterns::PatternSet;
use crate::postprocess::{PostProcessConfig, post_process_content, prep_article};
use crate::scoring::{
    Candidate, SCORABLE_TAGS, ScoreTable, document_order, finalize_candidates, has_ancestor_tag, initial_score,
    inner_text, is_element_without_content, is_phrasing_content, is_whitespace_node, link_density, rank_candidates,
    score_elements, single_child_with_tag,
};
use crate::{ReadmarkError, Result};

/// ARIA roles of page chrome.
const UNLIKELY_ROLES: [&str; 7] = ["menu", "menubar", "complementary", "navigation", "alert", "alertdialog", "dialog"];

/// Children that keep a `div` from being turned into a `p`.
const DIV_TO_P_ELEMS: [&str; 9] = ["blockquote", "dl", "div", "img", "ol", "p", "pre", "table", "ul"];

/// Merged siblings keep these tags; anything else becomes a `div`.
const ALTER_TO_DIV_EXCEPTIONS: [&str; 4] = ["div", "article", "section", "p"];

/// Alternative-ancestor rule: how many close runners-up must share an ancestor.
const MINIMUM_TOP_CANDIDATES: usize = 3;

/// Configuration for content extraction
#[derive(Debug, Clone)]
pub struct ExtractConfig {
    /// Maximum number of top candidates to track
    pub nb_top_candidates: usize,
    /// Minimum character count of an accepted result
    pub char_threshold: usize,
    /// Sibling score threshold (multiplier of top score)
    pub sibling_threshold: f64,
    /// Class/id heuristics
    pub patterns: PatternSet,
    /// Post-processing configuration
    pub postprocess: PostProcessConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            nb_top_candidates: 5,
            char_threshold: 500,
            sibling_threshold: 0.2,
            patterns: PatternSet::default(),
            postprocess: PostProcessConfig::default(),
        }
    }
}

/// Heuristics that are relaxed, in field order, when an attempt comes up short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractFlags {
    /// Remove nodes whose class/id look like page chrome before scoring.
    pub strip_unlikelys: bool,
    /// Add class/id weights to candidate scores.
    pub weight_classes: bool,
    /// Run the conditional cleaner over forms, tables, lists and divs.
    pub clean_conditionally: bool,
}

impl ExtractFlags {
    pub const ALL: Self = Self { strip_unlikelys: true, weight_classes: true, clean_conditionally: true };

    /// The next, more permissive flag set, or `None` once everything is off.
    pub fn relaxed(self) -> Option<Self> {
        if self.strip_unlikelys {
            Some(Self { strip_unlikelys: false, ..self })
        } else if self.weight_classes {
            Some(Self { weight_classes: false, ..self })
        } else if self.clean_conditionally {
            Some(Self { clean_conditionally: false, ..self })
        } else {
            None
        }
    }
}

impl Default for ExtractFlags {
    fn default() -> Self {
        Self::ALL
    }
}

/// What the document already told us before extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractHints<'a> {
    /// Article title, used to drop a heading that repeats it.
    pub title: Option<&'a str>,
    /// True when metadata already provided a byline.
    pub has_byline: bool,
}

/// The result of content extraction
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    /// Cleaned content; the root's only child is the page `div`
    pub tree: DomTree,
    /// The page `div` (`id="readability-page-1"`)
    pub root: NodeId,
    /// Characters of normalized text in the content
    pub text_length: usize,
    /// The top candidate score
    pub top_score: f64,
    /// Byline text found and removed during traversal
    pub byline: Option<String>,
    /// `dir` attribute of the top candidate or its nearest ancestor carrying one
    pub dir: Option<String>,
    /// How many attempts ran
    pub attempts: usize,
}

struct Attempt {
    tree: DomTree,
    page: NodeId,
    text_length: usize,
    top_score: f64,
    dir: Option<String>,
}

/// Extracts the main content from a normalized tree.
///
/// `normalized` is not modified; every attempt clones it. The first attempt
/// reaching `char_threshold` wins.
///
/// # Errors
///
/// Returns [`ReadmarkError::NoCandidateFound`] when no attempt finds a
/// candidate or the longest attempt stays below `char_threshold`.
pub fn extract_content(
    normalized: &DomTree, hints: &ExtractHints<'_>, config: &ExtractConfig,
) -> Result<ExtractedContent> {
    let mut flags = ExtractFlags::ALL;
    let mut best_length = 0;
    let mut byline: Option<String> = None;
    let mut attempt_count = 0;

    loop {
        attempt_count += 1;
        let attempt = grab_article(normalized.clone(), hints, config, flags, &mut byline);

        match attempt {
            Some(mut attempt) => {
                tracing::debug!(
                    attempt = attempt_count,
                    text_length = attempt.text_length,
                    top_score = attempt.top_score,
                    ?flags,
                    "extraction attempt finished"
                );
                if attempt.text_length >= config.char_threshold {
                    post_process_content(&mut attempt.tree, attempt.page, &config.postprocess);
                    return Ok(finish(attempt, byline, attempt_count));
                }
                best_length = best_length.max(attempt.text_length);
            }
            None => tracing::debug!(attempt = attempt_count, ?flags, "no candidates found"),
        }

        match flags.relaxed() {
            Some(next) => flags = next,
            None => break,
        }
    }

    Err(ReadmarkError::NoCandidateFound { text_length: best_length, threshold: config.char_threshold })
}

fn finish(attempt: Attempt, byline: Option<String>, attempts: usize) -> ExtractedContent {
    let content = attempt.tree.copy_subtree(attempt.page);
    let root = content.first_element_child(content.root()).unwrap_or(content.root());
    ExtractedContent {
        tree: content,
        root,
        text_length: attempt.text_length,
        top_score: attempt.top_score,
        byline,
        dir: attempt.dir,
        attempts,
    }
}

/// One attempt: prune, score, select, merge, clean.
fn grab_article(
    mut tree: DomTree, hints: &ExtractHints<'_>, config: &ExtractConfig, flags: ExtractFlags,
    byline: &mut Option<String>,
) -> Option<Attempt> {
    let patterns = &config.patterns;
    let page = tree
        .elements_by_tag(tree.root(), "body")
        .into_iter()
        .next()
        .or_else(|| tree.first_element_child(tree.root()))?;

    let elements = collect_elements_to_score(&mut tree, hints, patterns, flags, byline);

    let mut table = score_elements(&tree, &elements, patterns, flags.weight_classes);
    let mut candidates = finalize_candidates(&tree, &mut table);
    if candidates.is_empty() {
        return None;
    }
    let order = document_order(&tree);
    rank_candidates(&mut candidates, &order, config.nb_top_candidates);

    let (top, created) = select_top_candidate(&mut tree, &mut table, &candidates, page, patterns, flags);
    let top_score = table.get(top).unwrap_or_default();
    let dir = detect_dir(&tree, top);

    let article = tree.create_element("div");
    if created {
        tree.append_child(article, top);
    } else {
        merge_siblings(&mut tree, &table, top, top_score, article, config.sibling_threshold);
    }

    prep_article(&mut tree, article, flags, patterns, config.char_threshold);

    let page_div = if created {
        top
    } else {
        let div = tree.create_element("div");
        tree.move_children(article, div);
        tree.append_child(article, div);
        div
    };
    tree.set_attr(page_div, "id", "readability-page-1");
    tree.set_attr(page_div, "class", "page");

    let text_length = inner_text(&tree, article).chars().count();
    Some(Attempt { tree, page: page_div, text_length, top_score, dir })
}

/// Walks the tree in document order, pruning as it goes, and returns the
/// nodes whose text should be scored.
fn collect_elements_to_score(
    tree: &mut DomTree, hints: &ExtractHints<'_>, patterns: &PatternSet, flags: ExtractFlags,
    byline: &mut Option<String>,
) -> Vec<NodeId> {
    let mut elements = Vec::new();
    let mut remove_title_header = hints.title.is_some();
    let mut node = tree.first_element_child(tree.root());

    while let Some(id) = node {
        let Some(tag) = tree.tag_name(id).map(str::to_string) else {
            node = tree.next_node(id, false);
            continue;
        };
        let match_string = tree.class_and_id(id);

        if byline.is_none()
            && !hints.has_byline
            && let Some(text) = find_byline(tree, id, &match_string, patterns)
        {
            tracing::trace!(byline = %text, "found byline");
            *byline = Some(text);
            node = remove_and_get_next(tree, id);
            continue;
        }

        if remove_title_header
            && let Some(title) = hints.title
            && matches!(tag.as_str(), "h1" | "h2")
            && text_similarity(title, &inner_text(tree, id)) > 0.75
        {
            remove_title_header = false;
            node = remove_and_get_next(tree, id);
            continue;
        }

        if flags.strip_unlikelys {
            if patterns.is_unlikely(&match_string)
                && !has_ancestor_tag(tree, id, "table", 3, |_| true)
                && !has_ancestor_tag(tree, id, "code", 3, |_| true)
                && tag != "body"
                && tag != "a"
            {
                tracing::trace!(%tag, %match_string, "removing unlikely candidate");
                node = remove_and_get_next(tree, id);
                continue;
            }
            if tree.attr(id, "role").is_some_and(|role| UNLIKELY_ROLES.contains(&role)) {
                node = remove_and_get_next(tree, id);
                continue;
            }
        }

        if matches!(tag.as_str(), "div" | "section" | "header" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
            && is_element_without_content(tree, id)
        {
            node = remove_and_get_next(tree, id);
            continue;
        }

        if SCORABLE_TAGS.contains(&tag.as_str()) {
            elements.push(id);
        }

        let mut current = id;
        if tag == "div" {
            wrap_phrasing_runs(tree, id);

            if let Some(child) = single_child_with_tag(tree, id, "p")
                && link_density(tree, id) < 0.25
            {
                tree.replace(id, child);
                current = child;
                elements.push(child);
            } else if !has_child_block_element(tree, id) {
                tree.set_tag(id, "p");
                elements.push(id);
            }
        }

        node = tree.next_node(current, false);
    }

    elements
}

fn remove_and_get_next(tree: &mut DomTree, id: NodeId) -> Option<NodeId> {
    let next = tree.next_node(id, true);
    tree.detach(id);
    next
}

/// Byline text of a node that looks like an author line, preferring a
/// descendant marked `itemprop="name"`.
fn find_byline(tree: &DomTree, id: NodeId, match_string: &str, patterns: &PatternSet) -> Option<String> {
    let is_byline = tree.attr(id, "rel") == Some("author")
        || tree.attr(id, "itemprop").is_some_and(|v| v.contains("author"))
        || patterns.byline.is_match(match_string);
    if !is_byline {
        return None;
    }

    let text = tree.text_content(id);
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.chars().count() >= 100 {
        return None;
    }

    let name_node = tree
        .descendants(id)
        .into_iter()
        .find(|n| tree.attr(*n, "itemprop").is_some_and(|v| v.contains("name")));
    let chosen = match name_node {
        Some(n) => tree.text_content(n).trim().to_string(),
        None => trimmed.to_string(),
    };
    Some(chosen)
}

/// Groups runs of phrasing content directly under `div` into paragraphs.
fn wrap_phrasing_runs(tree: &mut DomTree, div: NodeId) {
    let mut paragraph: Option<NodeId> = None;
    for child in tree.children(div).to_vec() {
        if is_phrasing_content(tree, child) {
            if let Some(p) = paragraph {
                tree.append_child(p, child);
            } else if !is_whitespace_node(tree, child) {
                let p = tree.create_element("p");
                tree.replace(child, p);
                tree.append_child(p, child);
                paragraph = Some(p);
            }
        } else if let Some(p) = paragraph.take() {
            trim_trailing_whitespace(tree, p);
        }
    }
    if let Some(p) = paragraph {
        trim_trailing_whitespace(tree, p);
    }
}

fn trim_trailing_whitespace(tree: &mut DomTree, node: NodeId) {
    while let Some(last) = tree.last_child(node) {
        if !is_whitespace_node(tree, last) {
            break;
        }
        tree.detach(last);
    }
}

fn has_child_block_element(tree: &DomTree, id: NodeId) -> bool {
    tree.descendants(id)
        .into_iter()
        .any(|n| tree.tag_name(n).is_some_and(|tag| DIV_TO_P_ELEMS.contains(&tag)))
}

fn is_body_or_root(tree: &DomTree, id: NodeId) -> bool {
    !tree.is_element(id) || matches!(tree.tag_name(id), Some("body" | "html"))
}

/// Picks the node whose children become the article.
///
/// Returns the chosen node and whether it was created to wrap the page body.
fn select_top_candidate(
    tree: &mut DomTree, table: &mut ScoreTable, ranked: &[Candidate], page: NodeId, patterns: &PatternSet,
    flags: ExtractFlags,
) -> (NodeId, bool) {
    let mut top = ranked[0].node;

    if tree.has_tag(top, "body") {
        let div = tree.create_element("div");
        tree.move_children(page, div);
        tree.append_child(page, div);
        table.set(div, initial_score(tree, div, patterns, flags.weight_classes));
        return (div, true);
    }

    let top_score = ranked[0].score;
    let alternatives: Vec<Vec<NodeId>> = ranked[1..]
        .iter()
        .filter(|c| top_score > 0.0 && c.score / top_score >= 0.75)
        .map(|c| tree.ancestors(c.node).collect())
        .collect();

    if alternatives.len() >= MINIMUM_TOP_CANDIDATES {
        let mut parent = tree.parent(top);
        while let Some(ancestor) = parent.filter(|p| !is_body_or_root(tree, *p)) {
            let lists = alternatives.iter().filter(|list| list.contains(&ancestor)).count();
            if lists >= MINIMUM_TOP_CANDIDATES {
                top = ancestor;
                break;
            }
            parent = tree.parent(ancestor);
        }
    }

    if !table.contains(top) {
        table.set(top, initial_score(tree, top, patterns, flags.weight_classes));
    }

    // Climb while the parent keeps a reasonable share of the score.
    let mut last_score = table.get(top).unwrap_or_default();
    let threshold = last_score / 3.0;
    let mut parent = tree.parent(top);
    while let Some(ancestor) = parent.filter(|p| !is_body_or_root(tree, *p)) {
        let Some(parent_score) = table.get(ancestor) else {
            parent = tree.parent(ancestor);
            continue;
        };
        if parent_score < threshold {
            break;
        }
        if parent_score > last_score {
            top = ancestor;
            break;
        }
        last_score = parent_score;
        parent = tree.parent(ancestor);
    }

    let mut parent = tree.parent(top);
    while let Some(ancestor) = parent.filter(|p| !is_body_or_root(tree, *p)) {
        if tree.element_children(ancestor).count() != 1 {
            break;
        }
        top = ancestor;
        parent = tree.parent(ancestor);
    }

    if !table.contains(top) {
        table.set(top, initial_score(tree, top, patterns, flags.weight_classes));
    }

    (top, false)
}

/// First `dir` attribute on the top candidate's parent, the candidate, or
/// further ancestors.
fn detect_dir(tree: &DomTree, top: NodeId) -> Option<String> {
    let parent = tree.parent(top);
    parent
        .into_iter()
        .chain(std::iter::once(top))
        .chain(parent.into_iter().flat_map(|p| tree.ancestors(p)))
        .find_map(|n| tree.attr(n, "dir").map(str::to_string))
}

/// Moves the top candidate and every qualifying sibling into `article`.
fn merge_siblings(
    tree: &mut DomTree, table: &ScoreTable, top: NodeId, top_score: f64, article: NodeId, sibling_threshold: f64,
) {
    let Some(parent) = tree.parent(top) else {
        tree.append_child(article, top);
        return;
    };

    let threshold = top_score * sibling_threshold;
    let top_class = tree.attr(top, "class").unwrap_or_default().to_string();
    let siblings: Vec<NodeId> = tree.element_children(parent).collect();

    for sibling in siblings {
        let include = sibling == top || {
            let bonus = if !top_class.is_empty() && tree.attr(sibling, "class") == Some(top_class.as_str()) {
                top_score * 0.2
            } else {
                0.0
            };
            match table.get(sibling) {
                Some(score) if score + bonus >= threshold => true,
                _ => tree.has_tag(sibling, "p") && is_content_paragraph(tree, sibling),
            }
        };

        if include {
            let keep_tag = tree.tag_name(sibling).is_some_and(|tag| ALTER_TO_DIV_EXCEPTIONS.contains(&tag));
            if !keep_tag {
                tree.set_tag(sibling, "div");
            }
            tracing::trace!(node = sibling, "merging sibling into article");
            tree.append_child(article, sibling);
        }
    }
}

/// Long low-link paragraphs, or short link-free ones that end a sentence.
fn is_content_paragraph(tree: &DomTree, p: NodeId) -> bool {
    let density = link_density(tree, p);
    let content = inner_text(tree, p);
    let length = content.chars().count();
    if length > 80 {
        density < 0.25
    } else {
        length > 0 && density == 0.0 && ends_sentence(&content)
    }
}

/// A `.` followed by a space or the end of the text.
fn ends_sentence(text: &str) -> bool {
    text.match_indices('.').any(|(index, _)| matches!(text[index + 1..].chars().next(), None | Some(' ')))
}
