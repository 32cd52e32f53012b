use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use readmark_core::fallback::find_best_candidate;
use readmark_core::scoring::{finalize_candidates, score_elements};
use readmark_core::{
    AlwaysVisible, Converter, Document, MarkdownInput, MarkdownSerializer, PatternSet, Readability, fallback_markdown,
};

fn load(name: &str) -> String {
    std::fs::read_to_string(format!("../../tests/fixtures/{name}")).unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let short = load("short.html");
    let article = load("article.html");

    let mut group = c.benchmark_group("parse");

    group.bench_with_input(BenchmarkId::new("short", "1KB"), &short, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.bench_with_input(BenchmarkId::new("article", "4KB"), &article, |b, html| {
        b.iter(|| Document::parse(black_box(html)))
    });

    group.finish();
}

fn bench_extraction(c: &mut Criterion) {
    let doc = Document::parse(&load("article.html")).unwrap();
    let readability = Readability::new();

    c.bench_function("extraction", |b| b.iter(|| readability.extract(black_box(&doc))));
}

fn bench_serialization(c: &mut Criterion) {
    let article = Readability::new().extract(&Document::parse(&load("article.html")).unwrap()).unwrap();
    let serializer = MarkdownSerializer::new();

    c.bench_function("serialization", |b| {
        b.iter(|| serializer.serialize(MarkdownInput::Node(black_box(&article.content), article.content_root)))
    });
}

fn bench_fallback(c: &mut Criterion) {
    let doc = Document::parse(&load("article.html")).unwrap();

    c.bench_function("fallback", |b| b.iter(|| fallback_markdown(black_box(&doc), &AlwaysVisible)));
}

fn bench_deep_nesting(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_nesting");

    for levels in [250, 1000, 2000] {
        let text = "A sentence, long enough to score. ".repeat(4);
        let (open, close) = ("<div>".repeat(levels), "</div>".repeat(levels));
        let html = format!("<html><body>{open}<p>{text}</p>{close}</body></html>");
        let doc = Document::parse(&html).unwrap();
        let paragraphs = doc.elements_by_tag("p");
        let patterns = PatternSet::default();

        group.bench_with_input(BenchmarkId::new("scoring", levels), &doc, |b, doc| {
            b.iter(|| {
                let mut table = score_elements(doc.tree(), black_box(&paragraphs), &patterns, true);
                finalize_candidates(doc.tree(), &mut table)
            })
        });

        group.bench_with_input(BenchmarkId::new("fallback_candidate", levels), &doc, |b, doc| {
            b.iter(|| find_best_candidate(black_box(doc), &AlwaysVisible))
        });
    }

    group.finish();
}

fn bench_full_conversion(c: &mut Criterion) {
    let html = load("article.html");
    let converter = Converter::new();

    c.bench_function("full_conversion", |b| {
        b.iter(|| {
            let doc = Document::parse(black_box(&html)).unwrap();
            converter.convert(&doc, "article.html")
        })
    });
}

criterion_group!(
    benches,
    bench_parse,
    bench_extraction,
    bench_serialization,
    bench_fallback,
    bench_deep_nesting,
    bench_full_conversion
);
criterion_main!(benches);
