//! Performance benchmarks for the markdown engine.
//!
//! Benchmarks block parsing, inline-heavy input, end-to-end HTML
//! rendering, and scaling behavior with document size.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use ferromark::{parse, Engine, Options};

/// Benchmark block parsing with various structures.
fn bench_block_structures(c: &mut Criterion) {
    let paragraph = "This is a simple paragraph.\n";
    let heading = "# Title\n\nParagraph content.\n";
    let fenced = "```rust\nfn main() {}\n```\n";
    let nested_list = "- Item 1\n  - Nested 1\n  - Nested 2\n- Item 2\n";
    let complex_doc = r#"# Document Title

## Section One

This is the first paragraph with a [link](/somewhere "title").

```rust
fn code_example() -> u32 {
    3
}
```

## Section Two

- List item 1
- List item 2
  - Nested item

> A block quote with *emphasis* and `code`.

| a | b |
| --- | :-: |
| 1 | 2 |
"#;

    let inputs = [
        ("single_paragraph", paragraph),
        ("heading_with_paragraph", heading),
        ("fenced_code", fenced),
        ("nested_list", nested_list),
        ("complex_document", complex_doc),
    ];

    let options = Options::default().gfm(true);
    let mut group = c.benchmark_group("block_structures");

    for (name, content) in inputs {
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", name), &content, |b, c| {
            b.iter(|| parse("bench", black_box(c), &options));
        });
    }

    group.finish();
}

/// Benchmark inline parsing with various complexity levels.
fn bench_inline_complexity(c: &mut Criterion) {
    let long_100 = "word ".repeat(100);
    let long_1000 = "word ".repeat(1000);

    let inputs: Vec<(&str, &str)> = vec![
        ("plain_text", "This is plain text without any formatting."),
        ("single_strong", "This has **bold** text."),
        (
            "nested_spans",
            "This has **bold with *emphasis* inside** text.",
        ),
        (
            "deeply_nested",
            "This has **bold with *emphasis with `code` inside* inside** text.",
        ),
        (
            "links_and_images",
            "A [link](/a) and ![image](/b.png) and <https://c.example> together.",
        ),
        ("long_text_100", &long_100),
        ("long_text_1000", &long_1000),
    ];

    let options = Options::default().gfm(true);
    let mut group = c.benchmark_group("inline_complexity");

    for (name, content) in inputs {
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", name), &content, |b, c| {
            b.iter(|| parse("bench", black_box(c), &options));
        });
    }

    group.finish();
}

/// Benchmark worst-case inline patterns.
fn bench_inline_edge_cases(c: &mut Criterion) {
    let unclosed_emphasis = "*not closed ".repeat(10);
    let mixed_unclosed = "*a _b `c [d ".repeat(10);
    let many_escapes = r"\*not\* \*bold\* ".repeat(50);
    let alternating = "*a* b *c* d *e* f ".repeat(50);

    let inputs: Vec<(&str, String)> = vec![
        ("unclosed_emphasis_10x", unclosed_emphasis),
        ("mixed_unclosed_10x", mixed_unclosed),
        ("many_escapes_50x", many_escapes),
        ("alternating_spans_50x", alternating),
    ];

    let options = Options::default();
    let mut group = c.benchmark_group("inline_edge_cases");

    for (name, content) in &inputs {
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("parse", name), content.as_str(), |b, c| {
            b.iter(|| parse("bench", black_box(c), &options));
        });
    }

    group.finish();
}

/// Benchmark scaling behavior with increasing document size.
fn bench_scaling(c: &mut Criterion) {
    let base_paragraph = "This is a paragraph with **bold** and *emphasis* text.\n\n";

    let options = Options::default();
    let mut group = c.benchmark_group("scaling");

    for size in [10, 50, 100, 500] {
        let content = base_paragraph.repeat(size);
        group.throughput(Throughput::Bytes(content.len() as u64));
        group.bench_with_input(BenchmarkId::new("paragraphs", size), &content, |b, c| {
            b.iter(|| parse("bench", black_box(c), &options));
        });
    }

    group.finish();
}

/// Benchmark the full parse-and-render pipeline.
fn bench_render(c: &mut Criterion) {
    let doc = "# Title\n\nPara with *em*, **strong**, `code`, and a [link](/u).\n\n\
               - item one\n- item two\n\n> quoted\n\n```\ncode block\n```\n"
        .repeat(20);

    let engine = Engine::new();
    let mut group = c.benchmark_group("render");
    group.throughput(Throughput::Bytes(doc.len() as u64));

    group.bench_function("html", |b| {
        b.iter(|| engine.render_html("bench", black_box(&doc)));
    });
    group.bench_function("markdown", |b| {
        b.iter(|| engine.render_markdown("bench", black_box(&doc)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_block_structures,
    bench_inline_complexity,
    bench_inline_edge_cases,
    bench_scaling,
    bench_render,
);

criterion_main!(benches);
