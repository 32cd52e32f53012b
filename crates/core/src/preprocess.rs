//! Tree normalization ahead of scoring.
//!
//! [`preprocess_document`] clones the parsed tree and strips what can never be
//! article content: scripts, styles, hidden nodes and modal dialogs. It then
//! resolves relative URIs, unwraps `<font>`-style wrappers, and turns `<br>`
//! chains into paragraphs so the scorer sees real blocks.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::dom_tree::{DomTree, NodeId};
use crate::parse::Document;
use crate::patterns::PatternSet;
use crate::scoring::{is_phrasing_content, is_whitespace_node, next_significant};
use crate::visibility::{VisibilityOracle, is_probably_visible};

/// Configuration for HTML preprocessing
#[derive(Debug, Clone)]
pub struct PreprocessConfig {
    /// Whether to remove script, noscript and template tags
    pub remove_scripts: bool,
    /// Whether to remove style tags and stylesheet links
    pub remove_styles: bool,
    /// Whether to remove canvas and svg tags
    pub remove_graphics: bool,
    /// Whether to remove object, embed and iframe tags that are not known video players
    pub remove_embeds: bool,
    /// Whether to remove hidden and invisible elements
    pub remove_hidden: bool,
    /// Whether to remove `aria-modal` dialogs
    pub remove_dialogs: bool,
    /// Whether to convert relative URLs to absolute
    pub convert_urls: bool,
    /// Whether to unwrap font, basefont and blink tags
    pub unwrap_fonts: bool,
    /// Whether to turn `<br>` chains into paragraphs
    pub replace_brs: bool,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            remove_scripts: true,
            remove_styles: true,
            remove_graphics: true,
            remove_embeds: true,
            remove_hidden: true,
            remove_dialogs: true,
            convert_urls: true,
            unwrap_fonts: true,
            replace_brs: true,
        }
    }
}

static SRCSET_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\S+)(\s+[\d.]+[xw])?(\s*(?:,|$))").expect("SRCSET_URL should compile"));

/// Returns a normalized working copy of the document's tree.
///
/// The document itself is never modified.
pub fn preprocess_document(
    doc: &Document, config: &PreprocessConfig, patterns: &PatternSet, oracle: &dyn VisibilityOracle,
) -> DomTree {
    let mut tree = doc.tree().clone();

    remove_unwanted_nodes(&mut tree, config, patterns, oracle);

    if config.unwrap_fonts {
        for tag in ["font", "basefont", "blink"] {
            for node in tree.elements_by_tag(tree.root(), tag) {
                tree.unwrap_node(node);
            }
        }
    }

    if config.convert_urls
        && let Some(base) = doc.base_url()
    {
        let root = tree.root();
        convert_relative_urls(&mut tree, root, &base, doc.url());
    }

    if config.replace_brs {
        let root = tree.root();
        replace_brs(&mut tree, root);
    }

    tree
}

/// One walk in document order; a removed node's subtree is skipped.
fn remove_unwanted_nodes(
    tree: &mut DomTree, config: &PreprocessConfig, patterns: &PatternSet, oracle: &dyn VisibilityOracle,
) {
    let mut node = tree.first_element_child(tree.root());
    while let Some(id) = node {
        if should_remove(tree, id, config, patterns, oracle) {
            tracing::trace!(tag = tree.tag_name(id).unwrap_or_default(), "removing during preprocessing");
            node = tree.next_node(id, true);
            tree.detach(id);
        } else {
            node = tree.next_node(id, false);
        }
    }
}

fn should_remove(
    tree: &DomTree, id: NodeId, config: &PreprocessConfig, patterns: &PatternSet, oracle: &dyn VisibilityOracle,
) -> bool {
    let Some(tag) = tree.tag_name(id) else {
        return false;
    };
    if matches!(tag, "html" | "head" | "body") {
        return false;
    }

    match tag {
        "script" | "noscript" | "template" if config.remove_scripts => return true,
        "style" if config.remove_styles => return true,
        "link" if config.remove_styles => {
            let rel = tree.attr(id, "rel").unwrap_or_default();
            if rel.split_whitespace().any(|r| r.eq_ignore_ascii_case("stylesheet")) {
                return true;
            }
        }
        "canvas" | "svg" if config.remove_graphics => return true,
        "object" | "embed" | "iframe" if config.remove_embeds => {
            let is_video = tree.attrs(id).iter().any(|(_, value)| patterns.videos.is_match(value));
            if !is_video {
                return true;
            }
        }
        _ => {}
    }

    if config.remove_hidden && !is_probably_visible(tree, id, oracle) {
        return true;
    }

    config.remove_dialogs && tree.attr(id, "aria-modal") == Some("true") && tree.attr(id, "role") == Some("dialog")
}

/// Rewrites relative links and media sources under `root` to absolute URIs.
///
/// Fragment-only links are kept when the base is the document URL itself.
/// `javascript:` links are replaced with their content.
pub fn convert_relative_urls(tree: &mut DomTree, root: NodeId, base: &Url, document_url: Option<&Url>) {
    let keep_fragments = document_url.is_none_or(|url| url == base);
    let to_absolute = |uri: &str| -> String {
        if keep_fragments && uri.starts_with('#') {
            return uri.to_string();
        }
        base.join(uri.trim()).map(|u| u.to_string()).unwrap_or_else(|_| uri.to_string())
    };

    for link in tree.elements_by_tag(root, "a") {
        let Some(href) = tree.attr(link, "href").map(str::to_string) else {
            continue;
        };
        if href.trim_start().to_ascii_lowercase().starts_with("javascript:") {
            let children = tree.children(link).to_vec();
            if children.len() == 1 && tree.is_text(children[0]) {
                tree.replace(link, children[0]);
            } else {
                let span = tree.create_element("span");
                tree.move_children(link, span);
                tree.replace(link, span);
            }
        } else {
            tree.set_attr(link, "href", &to_absolute(&href));
        }
    }

    for node in tree.elements_by_tag(root, "*") {
        let Some(tag) = tree.tag_name(node) else {
            continue;
        };
        let attributes: &[&str] = match tag {
            "img" | "picture" | "figure" | "video" | "audio" | "source" => &["src", "poster", "srcset"],
            "blockquote" | "q" | "del" | "ins" => &["cite"],
            _ => continue,
        };
        for attribute in attributes {
            let Some(value) = tree.attr(node, attribute).map(str::to_string) else {
                continue;
            };
            let rewritten = if *attribute == "srcset" {
                SRCSET_URL
                    .replace_all(&value, |caps: &regex::Captures<'_>| {
                        format!(
                            "{}{}{}",
                            to_absolute(&caps[1]),
                            caps.get(2).map_or("", |m| m.as_str()),
                            &caps[3]
                        )
                    })
                    .into_owned()
            } else {
                to_absolute(&value)
            };
            tree.set_attr(node, attribute, &rewritten);
        }
    }
}

/// Replaces chains of two or more `<br>` with a `<p>` gathering the phrasing
/// content that follows.
///
/// ```text
/// <div>foo<br>bar<br><br>abc</div>  =>  <div>foo<br>bar<p>abc</p></div>
/// ```
pub fn replace_brs(tree: &mut DomTree, root: NodeId) {
    for br in tree.elements_by_tag(root, "br") {
        if tree.parent(br).is_none() {
            continue;
        }

        let mut replaced = false;
        let mut next = next_significant(tree, tree.next_sibling(br));
        while let Some(candidate) = next {
            if !tree.has_tag(candidate, "br") {
                break;
            }
            replaced = true;
            let after = tree.next_sibling(candidate);
            tree.detach(candidate);
            next = next_significant(tree, after);
        }

        if !replaced {
            continue;
        }

        let p = tree.create_element("p");
        tree.replace(br, p);

        let mut next = tree.next_sibling(p);
        while let Some(sibling) = next {
            if tree.has_tag(sibling, "br")
                && let Some(following) = next_significant(tree, tree.next_sibling(sibling))
                && tree.has_tag(following, "br")
            {
                break;
            }
            if !is_phrasing_content(tree, sibling) {
                break;
            }
            next = tree.next_sibling(sibling);
            tree.append_child(p, sibling);
        }

        while let Some(last) = tree.last_child(p) {
            if !is_whitespace_node(tree, last) {
                break;
            }
            tree.detach(last);
        }

        if let Some(parent) = tree.parent(p)
            && tree.has_tag(parent, "p")
        {
            tree.set_tag(parent, "div");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visibility::AlwaysVisible;

    fn run(html: &str) -> (Document, DomTree) {
        let doc = Document::parse(html).unwrap();
        let tree = preprocess_document(&doc, &PreprocessConfig::default(), &PatternSet::default(), &AlwaysVisible);
        (doc, tree)
    }

    fn body_html(tree: &DomTree) -> String {
        let body = tree.elements_by_tag(tree.root(), "body")[0];
        tree.inner_html(body)
    }

    #[test]
    fn test_preprocess_config_default() {
        let config = PreprocessConfig::default();
        assert!(config.remove_scripts);
        assert!(config.remove_hidden);
        assert!(config.replace_brs);
    }

    #[test]
    fn test_removes_scripts_and_styles() {
        let (_, tree) = run(
            r#"<head><style>p{}</style><link rel="stylesheet" href="a.css"></head><body><script>x()</script><noscript>n</noscript><p>Keep</p></body>"#,
        );
        assert!(tree.elements_by_tag(tree.root(), "script").is_empty());
        assert!(tree.elements_by_tag(tree.root(), "style").is_empty());
        assert!(tree.elements_by_tag(tree.root(), "link").is_empty());
        assert_eq!(body_html(&tree), "<p>Keep</p>");
    }

    #[test]
    fn test_input_document_is_untouched() {
        let (doc, tree) = run("<body><script>x()</script><p>Keep</p></body>");
        assert_eq!(doc.elements_by_tag("script").len(), 1);
        assert_ne!(doc.tree(), &tree);
    }

    #[test]
    fn test_removes_hidden_and_dialogs() {
        let (_, tree) = run(
            r#"<body><p hidden>a</p><p style="display:none">b</p><div role="dialog" aria-modal="true">c</div><p>d</p></body>"#,
        );
        assert_eq!(body_html(&tree), "<p>d</p>");
    }

    #[test]
    fn test_keeps_video_iframes() {
        let (_, tree) = run(
            r#"<body><iframe src="https://www.youtube.com/embed/x"></iframe><iframe src="https://ads.example.com/x"></iframe></body>"#,
        );
        let frames = tree.elements_by_tag(tree.root(), "iframe");
        assert_eq!(frames.len(), 1);
        assert_eq!(tree.attr(frames[0], "src"), Some("https://www.youtube.com/embed/x"));
    }

    #[test]
    fn test_unwraps_font_tags() {
        let (_, tree) = run("<body><p><font color=red>red</font> text</p></body>");
        assert_eq!(body_html(&tree), "<p>red text</p>");
    }

    #[test]
    fn test_convert_relative_urls() {
        let html = r##"<body><a href="/about">About</a><a href="#top">Top</a><img src="img.png" srcset="a.png 1x, b.png 2x"></body>"##;
        let doc = Document::parse_with_url(html, "https://example.com/posts/1").unwrap();
        let tree = preprocess_document(&doc, &PreprocessConfig::default(), &PatternSet::default(), &AlwaysVisible);
        let links = tree.elements_by_tag(tree.root(), "a");
        assert_eq!(tree.attr(links[0], "href"), Some("https://example.com/about"));
        assert_eq!(tree.attr(links[1], "href"), Some("#top"));
        let img = tree.elements_by_tag(tree.root(), "img")[0];
        assert_eq!(tree.attr(img, "src"), Some("https://example.com/posts/img.png"));
        assert_eq!(
            tree.attr(img, "srcset"),
            Some("https://example.com/posts/a.png 1x, https://example.com/posts/b.png 2x")
        );
    }

    #[test]
    fn test_javascript_links_become_text() {
        let html = r#"<body><p><a href="javascript:void(0)">Click</a> here</p></body>"#;
        let doc = Document::parse_with_url(html, "https://example.com/").unwrap();
        let tree = preprocess_document(&doc, &PreprocessConfig::default(), &PatternSet::default(), &AlwaysVisible);
        assert_eq!(body_html(&tree), "<p>Click here</p>");
    }

    #[test]
    fn test_replace_brs() {
        let (_, tree) = run("<body><div>foo<br>bar<br> <br><br>abc</div></body>");
        assert_eq!(body_html(&tree), "<div>foo<br>bar<p> abc</p></div>");
    }

    #[test]
    fn test_single_br_is_kept() {
        let (_, tree) = run("<body><div>foo<br>bar</div></body>");
        assert_eq!(body_html(&tree), "<div>foo<br>bar</div>");
    }
}
