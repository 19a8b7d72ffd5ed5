//! Integration tests that validate HTML output against a fixture corpus.
//!
//! Reads test cases from `tests/fixtures/commonmark.json` and compares the
//! engine's HTML output against the expected rendering. Each case carries
//! the section name and example id so a failure report reads like the
//! fixture file.

use ferromark::{Engine, Options};
use serde::Deserialize;

#[derive(Deserialize)]
struct Example {
    section: String,
    example: u32,
    markdown: String,
    html: String,
    #[serde(default)]
    gfm: bool,
}

fn load_examples() -> Vec<Example> {
    let raw = include_str!("fixtures/commonmark.json");
    serde_json::from_str(raw).expect("fixture corpus must parse")
}

#[test]
fn fixture_corpus() {
    let examples = load_examples();
    assert!(!examples.is_empty());

    let mut failures = Vec::new();
    for case in &examples {
        let options = if case.gfm {
            Options::default().gfm(true)
        } else {
            Options::default()
        };
        let engine = Engine::with_options(options);
        let name = format!("{}-{}", case.section, case.example);
        let got = engine
            .render_html(&name, &case.markdown)
            .expect("rendering a fixture never fails");
        if got != case.html {
            failures.push(format!(
                "[{} / example {}]\ninput:    {:?}\nexpected: {:?}\ngot:      {:?}",
                case.section, case.example, case.markdown, case.html, got
            ));
        }
    }

    assert!(
        failures.is_empty(),
        "{} of {} fixture examples failed:\n\n{}",
        failures.len(),
        examples.len(),
        failures.join("\n\n")
    );
}

#[test]
fn fixture_corpus_formats_idempotently() {
    // Formatting any corpus input twice must be a fixed point.
    let examples = load_examples();
    for case in &examples {
        let options = if case.gfm {
            Options::default().gfm(true)
        } else {
            Options::default()
        };
        let engine = Engine::with_options(options);
        let once = engine
            .render_markdown("fmt", &case.markdown)
            .expect("formatting a fixture never fails");
        let twice = engine
            .render_markdown("fmt", &once)
            .expect("formatting formatted output never fails");
        assert_eq!(
            once, twice,
            "formatting is not idempotent for {:?}",
            case.markdown
        );
    }
}
