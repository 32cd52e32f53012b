use crate::dom_tree::{DomTree, NodeId};
use crate::metadata::ArticleMetadata;

const BLOCK_ELEMENTS: [&str; 19] = [
    "p",
    "div",
    "section",
    "article",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "li",
    "blockquote",
    "pre",
    "td",
    "th",
    "tr",
    "figure",
    "figcaption",
    "table",
];

/// Configuration for plain text output
#[derive(Debug, Clone, Default)]
pub struct TextConfig {
    /// Wrap lines at specified width (0 = no wrapping)
    pub line_width: usize,

    /// Include metadata header
    pub include_header: bool,
}

/// Renders the content under `root` as plain text, one paragraph per block.
pub fn convert_to_text(tree: &DomTree, root: NodeId, metadata: &ArticleMetadata, config: &TextConfig) -> String {
    let mut output = String::new();

    if config.include_header {
        output.push_str(&generate_header(metadata));
        output.push('\n');
    }

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    collect_paragraphs(tree, root, &mut paragraphs, &mut current);
    flush(&mut paragraphs, &mut current);

    let text = paragraphs.join("\n\n");
    let text = if config.line_width > 0 { wrap_text(&text, config.line_width) } else { text };
    output.push_str(&text);

    output.trim().to_string()
}

/// Title underlined with `=`, then a `By | Date | Site` line.
fn generate_header(metadata: &ArticleMetadata) -> String {
    let mut header = String::new();

    if !metadata.title.is_empty() {
        header.push_str(&metadata.title);
        header.push('\n');
        header.push_str(&"=".repeat(metadata.title.chars().count()));
        header.push('\n');
    }

    let mut meta_parts = Vec::new();
    if let Some(author) = &metadata.byline {
        meta_parts.push(format!("By: {author}"));
    }
    if let Some(date) = &metadata.published_time {
        meta_parts.push(format!("Date: {date}"));
    }
    if let Some(site) = &metadata.site_name {
        meta_parts.push(format!("Site: {site}"));
    }
    if !meta_parts.is_empty() {
        header.push_str(&meta_parts.join(" | "));
        header.push('\n');
    }

    header
}

fn flush(paragraphs: &mut Vec<String>, current: &mut String) {
    let words: Vec<&str> = current.split_whitespace().collect();
    if !words.is_empty() {
        paragraphs.push(words.join(" "));
    }
    current.clear();
}

fn collect_paragraphs(tree: &DomTree, node: NodeId, paragraphs: &mut Vec<String>, current: &mut String) {
    for child in tree.children(node) {
        if let Some(text) = tree.text(*child) {
            current.push_str(text);
            continue;
        }
        match tree.tag_name(*child) {
            Some("br") => current.push(' '),
            Some("script" | "style" | "noscript" | "template") => {}
            Some(tag) if BLOCK_ELEMENTS.contains(&tag) => {
                flush(paragraphs, current);
                collect_paragraphs(tree, *child, paragraphs, current);
                flush(paragraphs, current);
            }
            _ => collect_paragraphs(tree, *child, paragraphs, current),
        }
    }
}

/// Wraps each paragraph at `width` characters, keeping blank lines between them.
fn wrap_text(text: &str, width: usize) -> String {
    text.split("\n\n")
        .map(|paragraph| {
            let words: Vec<&str> = paragraph.split_whitespace().collect();
            wrap_words(&words, width)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn wrap_words(words: &[&str], width: usize) -> String {
    let mut lines = Vec::new();
    let mut current_line = Vec::new();
    let mut current_length = 0;

    for &word in words {
        let word_len = word.chars().count();

        if current_length == 0 {
            current_line.push(word);
            current_length = word_len;
        } else if current_length + 1 + word_len <= width {
            current_length += 1 + word_len;
            current_line.push(word);
        } else {
            lines.push(current_line.join(" "));
            current_line = vec![word];
            current_length = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(current_line.join(" "));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_fragment;

    fn text_of(html: &str, config: &TextConfig) -> String {
        let tree = parse_fragment(html);
        convert_to_text(&tree, tree.root(), &ArticleMetadata::default(), config)
    }

    #[test]
    fn test_paragraphs_are_separated() {
        let text = text_of("<h1>Title</h1><p>This is a   paragraph.</p><p>Second.</p>", &TextConfig::default());
        assert_eq!(text, "Title\n\nThis is a paragraph.\n\nSecond.");
    }

    #[test]
    fn test_inline_tags_are_stripped() {
        let text = text_of("<p>Text with <strong>bold</strong> and <em>italic</em>.</p>", &TextConfig::default());
        assert_eq!(text, "Text with bold and italic.");
    }

    #[test]
    fn test_wrap_text() {
        let config = TextConfig { line_width: 10, include_header: false };
        let text = text_of("<p>one two three four five</p>", &config);
        assert_eq!(text, "one two\nthree four\nfive");
    }

    #[test]
    fn test_header() {
        let metadata = ArticleMetadata {
            title: "Title".to_string(),
            byline: Some("Ada".to_string()),
            site_name: Some("Site".to_string()),
            ..Default::default()
        };
        let tree = parse_fragment("<p>Body</p>");
        let config = TextConfig { line_width: 0, include_header: true };
        let text = convert_to_text(&tree, tree.root(), &metadata, &config);
        assert_eq!(text, "Title\n=====\nBy: Ada | Site: Site\n\nBody");
    }
}
