//! Parse and render options.
//!
//! [`Options`] is a plain immutable value: construct it once, share it by
//! reference across as many parse/render calls as you like. There is no
//! global state.

/// A filter applied to plain-text runs at render time. Receives the raw
/// text of a `Text` node and returns the text to render in its place.
///
/// The engine applies the filter only when [`Options::auto_space`] or
/// [`Options::fix_term_typo`] is set; the heuristics themselves live
/// outside this crate.
pub type TextFilter = fn(&str) -> String;

/// A syntax highlighter for fenced/indented code block bodies. Receives the
/// language tag (first word of the info string, possibly empty) and the
/// code, and returns HTML to emit inside `<pre><code>`.
pub type Highlighter = fn(language: &str, code: &str) -> String;

/// The feature switches controlling parsing and rendering.
#[derive(Debug, Clone, Copy)]
pub struct Options {
    /// Recognize GFM tables at paragraph finalization.
    pub gfm_table: bool,
    /// Recognize GFM task list items (`[ ]` / `[x]` / `[X]`).
    pub gfm_task_list_item: bool,
    /// Recognize GFM strikethrough (`~~...~~`).
    pub gfm_strikethrough: bool,
    /// Linkify bare `http(s)://` URLs and email addresses in text runs.
    pub gfm_auto_link: bool,
    /// Render soft line breaks as `<br />`.
    pub soft_break_as_hard_break: bool,
    /// Emit `language-*` classes on code blocks (`language-fallback` when
    /// the info string is empty) and invoke the [`Highlighter`] hook.
    pub code_syntax_highlight: bool,
    /// Run the [`TextFilter`] hook over plain text (CJK/Latin auto-spacing).
    pub auto_space: bool,
    /// Run the [`TextFilter`] hook over plain text (term-typo correction).
    pub fix_term_typo: bool,
    /// Optional plain-text filter collaborator.
    pub text_filter: Option<TextFilter>,
    /// Optional code highlighter collaborator.
    pub highlighter: Option<Highlighter>,
}

impl Options {
    /// Switch every GFM extension at once.
    #[must_use]
    pub fn gfm(mut self, enabled: bool) -> Self {
        self.gfm_table = enabled;
        self.gfm_task_list_item = enabled;
        self.gfm_strikethrough = enabled;
        self.gfm_auto_link = enabled;
        self
    }

    /// Switch soft-break-to-hard-break conversion.
    #[must_use]
    pub fn soft_break_as_hard_break(mut self, enabled: bool) -> Self {
        self.soft_break_as_hard_break = enabled;
        self
    }

    /// Switch code block `language-*` classes and the highlighter hook.
    #[must_use]
    pub fn code_syntax_highlight(mut self, enabled: bool) -> Self {
        self.code_syntax_highlight = enabled;
        self
    }

    /// Switch CJK/Latin auto-spacing (requires a [`TextFilter`]).
    #[must_use]
    pub fn auto_space(mut self, enabled: bool) -> Self {
        self.auto_space = enabled;
        self
    }

    /// Switch term-typo correction (requires a [`TextFilter`]).
    #[must_use]
    pub fn fix_term_typo(mut self, enabled: bool) -> Self {
        self.fix_term_typo = enabled;
        self
    }

    /// Install a plain-text filter collaborator.
    #[must_use]
    pub fn text_filter(mut self, filter: TextFilter) -> Self {
        self.text_filter = Some(filter);
        self
    }

    /// Install a code highlighter collaborator.
    #[must_use]
    pub fn highlighter(mut self, highlighter: Highlighter) -> Self {
        self.highlighter = Some(highlighter);
        self
    }

    /// Whether the plain-text filter should run.
    #[must_use]
    pub(crate) fn wants_text_filter(&self) -> bool {
        (self.auto_space || self.fix_term_typo) && self.text_filter.is_some()
    }
}

impl Default for Options {
    /// Everything off: pure CommonMark parsing with reference HTML output.
    fn default() -> Self {
        Self {
            gfm_table: false,
            gfm_task_list_item: false,
            gfm_strikethrough: false,
            gfm_auto_link: false,
            soft_break_as_hard_break: false,
            code_syntax_highlight: false,
            auto_space: false,
            fix_term_typo: false,
            text_filter: None,
            highlighter: None,
        }
    }
}
