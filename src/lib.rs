#![doc = include_str!("../README.md")]
#![deny(missing_docs, unsafe_code)]

pub mod error;
mod lexer;
pub mod node;
pub mod options;
mod parser;
pub mod render;
pub mod walk;

pub use error::RenderError;
pub use node::{Node, NodeData, NodeId, NodeKind, Tree};
pub use options::Options;

/// The top-level engine entry point: a parsed set of [`Options`] plus the
/// render operations built on them.
///
/// ```
/// use ferromark::Engine;
///
/// let engine = Engine::new();
/// let html = engine.render_html("demo", "# Hi").unwrap();
/// assert_eq!(html, "<h1>Hi</h1>\n");
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    options: Options,
}

impl Engine {
    /// Create an engine with the default feature set: all GFM extensions,
    /// soft-break-to-hard-break conversion, code syntax highlight classes,
    /// and the text-filter passes enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: Options::default()
                .gfm(true)
                .soft_break_as_hard_break(true)
                .code_syntax_highlight(true)
                .auto_space(true)
                .fix_term_typo(true),
        }
    }

    /// Create an engine from an explicit option set.
    #[must_use]
    pub fn with_options(options: Options) -> Self {
        Self { options }
    }

    /// The option set this engine parses and renders with.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Parse `markdown` and render the document tree as HTML.
    ///
    /// `name` is an opaque label used only for diagnostics.
    pub fn render_html(&self, name: &str, markdown: &str) -> Result<String, RenderError> {
        let tree = parse(name, markdown, &self.options);
        render::html::render(&tree, &self.options)
    }

    /// Parse `markdown` and render the document tree back as canonicalized
    /// markdown.
    ///
    /// `name` is an opaque label used only for diagnostics.
    pub fn render_markdown(&self, name: &str, markdown: &str) -> Result<String, RenderError> {
        let tree = parse(name, markdown, &self.options);
        render::markdown::render(&tree, &self.options)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a markdown document into its document [`Tree`].
///
/// The grammar is total: every input produces a tree, malformed constructs
/// degrade to literal text. `name` is an opaque label used only for
/// diagnostics.
#[must_use]
pub fn parse(name: &str, markdown: &str, options: &Options) -> Tree {
    parser::parse(name, markdown, options)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_roundtrip() {
        let engine = Engine::with_options(Options::default());
        let html = engine.render_html("t", "hello *world*\n").unwrap();
        assert_eq!(html, "<p>hello <em>world</em></p>\n");
    }

    #[test]
    fn default_engine_enables_gfm() {
        let engine = Engine::new();
        assert!(engine.options().gfm_table);
        assert!(engine.options().soft_break_as_hard_break);
    }
}
