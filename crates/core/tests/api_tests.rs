//! Library API integration tests
use readmark_core::scoring::{apply_link_density, finalize_candidates, link_density, score_elements};
use readmark_core::serializer::join;
use readmark_core::serializer::rules::fence_length;
use readmark_core::*;
use rstest::rstest;

fn get_fixture_path(name: &str) -> String {
    format!("../../tests/fixtures/{}", name)
}

fn fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

fn markdown(html: &str) -> String {
    MarkdownSerializer::new().serialize(MarkdownInput::Html(html)).unwrap()
}

#[test]
fn test_parse_api() {
    let article = parse(&fixture("article.html")).expect("should parse");
    assert_eq!(article.metadata.title, "Understanding Ownership and Borrowing in Rust");
    assert_eq!(article.metadata.byline.as_deref(), Some("Grace Hopper"));
    assert_eq!(article.metadata.site_name.as_deref(), Some("The Example Blog"));
    assert!(article.text_content.contains("Lifetimes tie these ideas together"));
    assert!(!article.text_content.contains("Related posts"));
    assert!(article.word_count > 100);
}

#[test]
fn test_parse_with_url() {
    let article = parse_with_url(&fixture("article.html"), "https://blog.example.com/ownership").expect("should parse");
    assert_eq!(article.source_url.as_deref(), Some("https://blog.example.com/ownership"));
    assert!(article.content_html().contains(r#"href="https://doc.rust-lang.org/book/""#));
}

#[test]
fn test_is_probably_readable() {
    assert!(is_probably_readable(&fixture("article.html")));
    assert!(!is_probably_readable(&fixture("empty.html")));
    assert!(!is_probably_readable(&fixture("short.html")));
}

#[test]
fn test_converter_on_article() {
    let doc = Document::parse(&fixture("article.html")).unwrap();
    let converted = Converter::new().convert(&doc, "article.html").unwrap();
    assert_eq!(converted.origin, Origin::Readability);

    let body = converted.document.body();
    assert!(body.contains("## A first example"));
    assert!(body.contains("```rust\nfn count_words(text: &str) -> usize {\n    text.split_whitespace().count()\n}\n```"));
    assert!(body.contains("-   Each value has exactly one owner.\n-   There can be many"));
    assert!(body.contains("> The borrow checker is strict"));
    assert!(body.contains("| Kind | Syntax | Aliasing |\n| --- | --- | --- |"));
    assert!(!body.contains("Subscribe"));
    assert!(!body.contains("Copyright"));
}

#[test]
fn test_converter_origins() {
    let converter = Converter::new();

    let short = Document::parse(&fixture("short.html")).unwrap();
    let converted = converter.convert(&short, "short.html").unwrap();
    assert_eq!(converted.origin, Origin::Fallback);
    assert!(converted.document.body().contains("## Version 1.2"));

    let empty = Document::parse(&fixture("empty.html")).unwrap();
    let converted = converter.convert(&empty, "empty.html").unwrap();
    assert!(converted.is_empty());
    assert_eq!(converted.document.render(), "---\ntitle: \"Nothing here\"\nsource: \"empty.html\"\n---\n\n\n");
}

#[test]
fn test_converter_does_not_mutate_input() {
    let doc = Document::parse(&fixture("article.html")).unwrap();
    let before = doc.tree().clone();
    let converter = Converter::new();
    let first = converter.convert(&doc, "x").unwrap();
    assert_eq!(doc.tree(), &before);

    let second = converter.convert(&doc, "x").unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_fallback_markdown_on_fixture() {
    let doc = Document::parse(&fixture("short.html")).unwrap();
    let body = fallback_markdown(&doc, &AlwaysVisible);
    assert!(body.contains("**empty**"));
    assert!(body.contains("- Faster startup"));
    assert!(!body.contains("Home"));
}

#[test]
fn test_unicode_fixture() {
    let doc = Document::parse(&fixture("unicode.html")).unwrap();
    let converted = Converter::new().convert(&doc, "unicode.html").unwrap();
    assert!(converted.document.body().contains("Café owners in Kyoto"));
}

#[test]
fn test_article_output_formats() {
    let article = parse(&fixture("article.html")).unwrap();
    let serializer = MarkdownSerializer::new();

    let html = article.to_format(OutputFormat::Html, &serializer).unwrap();
    assert!(html.starts_with(r#"<div id="readability-page-1""#));

    let md = article.to_format(OutputFormat::Markdown, &serializer).unwrap();
    assert!(md.contains("Ownership is the feature"));

    let text = article.to_format(OutputFormat::PlainText, &serializer).unwrap();
    assert!(!text.contains('<'));
    assert!(text.contains("Ownership is the feature"));
}

#[test]
fn test_scenario_heading_and_link() {
    assert_eq!(markdown(r#"<h1>Title</h1><p>Hello <a href="/x">link</a>.</p>"#), "# Title\n\nHello [link](/x).");
}

#[test]
fn test_scenario_ordered_list_start() {
    let body = markdown(r#"<ol start="3"><li>A</li><li>B</li></ol>"#);
    let document = MarkdownDocument::new("t", "s", body);
    assert!(document.render().ends_with("\n3.  A\n4.  B\n"));
}

#[test]
fn test_scenario_fence_outgrows_content() {
    assert_eq!(markdown("<pre><code>```\ninner\n```</code></pre>"), "````\n```\ninner\n```\n````");
}

#[test]
fn test_scenario_table() {
    let html = "<table><tr><th>H1</th><th>H2</th></tr><tr><td>a</td><td>b</td></tr></table>";
    let document = MarkdownDocument::new("t", "s", markdown(html));
    assert!(document.render().ends_with("\n| H1 | H2 |\n| --- | --- |\n| a | b |\n"));
}

#[test]
fn test_scenario_link_heavy_sibling_excluded() {
    let heavy = format!(r#"<div><p>{}<a href="/more">{}</a></p></div>"#, "a".repeat(400), "b".repeat(600));
    let light = format!(r#"<div><p>{}e<a href="/note">{}</a></p></div>"#, "c,".repeat(237), "d".repeat(25));
    let doc = Document::parse(&format!("<html><body><div>{heavy}{light}</div></body></html>")).unwrap();
    let tree = doc.tree();

    let divs = doc.elements_by_tag("div");
    let (heavy, light) = (divs[1], divs[2]);
    assert!((link_density(tree, heavy) - 0.6).abs() < 1e-9);
    assert!((link_density(tree, light) - 0.05).abs() < 1e-9);

    let mut table = score_elements(tree, &doc.elements_by_tag("p"), &PatternSet::default(), true);
    finalize_candidates(tree, &mut table);
    let (heavy_score, light_score) = (table.get(heavy).unwrap(), table.get(light).unwrap());
    assert!(heavy_score < light_score);
    assert!(heavy_score < light_score * 0.2);

    let config = ReadabilityConfig::builder().char_threshold(100).build();
    let article = Readability::with_config(config).extract(&doc).unwrap();
    assert!(article.text_content.contains("ddddd"));
    assert!(!article.text_content.contains("bbbbb"));
}

#[rstest]
#[case(0.0)]
#[case(0.25)]
#[case(0.6)]
#[case(1.0)]
fn test_link_density_never_raises_score(#[case] density: f64) {
    for score in [42.0, 3.5, 0.0, -7.0] {
        assert!(apply_link_density(score, density) <= apply_link_density(score, 0.0));
        assert!(apply_link_density(score, density + 0.1) <= apply_link_density(score, density));
    }
}

#[test]
fn test_link_density_bounds() {
    let doc = Document::parse(r##"<div><p>text <a href="/x">link</a> <a href="#top">top</a></p><p>no links</p></div>"##)
        .unwrap();
    for node in doc.elements_by_tag("p").into_iter().chain(doc.elements_by_tag("div")) {
        assert!(link_density(doc.tree(), node) >= 0.0);
    }
    let plain = doc.elements_by_tag("p")[1];
    assert_eq!(link_density(doc.tree(), plain), 0.0);
}

#[rstest]
#[case("plain code", 3)]
#[case("``", 3)]
#[case("```", 4)]
#[case("a ````` b ``", 6)]
fn test_fence_length(#[case] code: &str, #[case] expected: usize) {
    assert_eq!(fence_length(code, '`'), expected);
}

#[test]
fn test_dispatch_is_deterministic() {
    let html = fixture("article.html");
    let serializer = MarkdownSerializer::builder()
        .add_rule("shadowed", Filter::tag("blockquote"), |_, _, _, _| "never".to_string())
        .add_rule("quote", Filter::tag("blockquote"), |content, _, _, _| format!("\n\nQUOTE:{}\n\n", content.trim()))
        .build()
        .unwrap();
    let first = serializer.serialize(MarkdownInput::Html(&html)).unwrap();
    let second = serializer.serialize(MarkdownInput::Html(&html)).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("QUOTE:The borrow checker is strict"));
    assert!(!first.contains("never"));
}

#[test]
fn test_plain_text_is_stable() {
    let text = "Just a sentence with no markup at all";
    assert_eq!(markdown(text), text);
    assert_eq!(markdown(&markdown(text)), text);
}

#[rstest]
#[case("a\n\n\n\n", "\n\n\nb")]
#[case("a\n", "\nb")]
#[case("", "b")]
fn test_join_caps_newlines(#[case] left: &str, #[case] right: &str) {
    assert!(!join(left, right).contains("\n\n\n"));
}

#[test]
fn test_serialized_fixture_has_no_triple_newlines() {
    for name in ["article.html", "short.html", "unicode.html"] {
        let doc = Document::parse(&fixture(name)).unwrap();
        let converted = Converter::new().convert(&doc, name).unwrap();
        assert!(!converted.document.body().contains("\n\n\n"), "{name}");
    }
}

#[test]
fn test_too_many_elements() {
    let doc = Document::parse(&fixture("article.html")).unwrap();
    let config = ReadabilityConfig::builder().max_elems_to_parse(5).build();
    let result = Readability::with_config(config).extract(&doc);
    assert!(matches!(result, Err(ReadmarkError::TooManyElements { .. })));
}
