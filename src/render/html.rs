//! HTML rendering.

use std::fmt::Write;

use crate::error::RenderError;
use crate::node::{ListData, NodeData, NodeId, NodeKind, TableAlign, Tree};
use crate::options::Options;
use crate::walk::{walk, Visitor, WalkStatus};

/// Render a document tree as HTML.
pub fn render(tree: &Tree, options: &Options) -> Result<String, RenderError> {
    let mut renderer = HtmlRenderer {
        out: String::new(),
        options,
        disable_tags: 0,
    };
    walk(tree, tree.root(), &mut renderer)?;
    Ok(renderer.out)
}

struct HtmlRenderer<'o> {
    out: String,
    options: &'o Options,
    /// Non-zero while rendering image alt text, where only the text
    /// content of inlines is emitted.
    disable_tags: u32,
}

/// Escape text for HTML output. Double quotes are escaped as well so the
/// same helper serves attribute values.
fn esc(s: &str) -> String {
    html_escape::encode_text(s).replace('"', "&quot;")
}

impl HtmlRenderer<'_> {
    /// Ensure the output ends at a line boundary.
    fn cr(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    fn tag(&mut self, s: &str) {
        if self.disable_tags == 0 {
            self.out.push_str(s);
        }
    }

    fn text(&mut self, tree: &Tree, node: NodeId) {
        let raw = &tree[node].text;
        if self.options.wants_text_filter() {
            if let Some(filter) = self.options.text_filter {
                self.out.push_str(&esc(&filter(raw)));
                return;
            }
        }
        self.out.push_str(&esc(raw));
    }

    fn title_attr(&mut self, title: &Option<String>) {
        if let Some(title) = title {
            if !title.is_empty() {
                self.out.push_str(" title=\"");
                self.out.push_str(&esc(title));
                self.out.push('"');
            }
        }
    }

    fn code_block(&mut self, tree: &Tree, node: NodeId) -> Result<(), RenderError> {
        let NodeData::CodeBlock { ref info, .. } = tree[node].data else {
            return Ok(());
        };
        let language = info.split_whitespace().next().unwrap_or("");
        self.cr();
        self.out.push_str("<pre><code");
        if self.options.code_syntax_highlight {
            let class = if language.is_empty() {
                "fallback"
            } else {
                language
            };
            write!(self.out, " class=\"language-{}\"", esc(class))?;
        } else if !language.is_empty() {
            write!(self.out, " class=\"language-{}\"", esc(language))?;
        }
        self.out.push('>');
        let body = &tree[node].text;
        if self.options.code_syntax_highlight {
            if let Some(highlighter) = self.options.highlighter {
                self.out.push_str(&highlighter(language, body));
                self.out.push_str("</code></pre>");
                self.cr();
                return Ok(());
            }
        }
        self.out.push_str(&esc(body));
        self.out.push_str("</code></pre>");
        self.cr();
        Ok(())
    }

    /// Whether a paragraph sits directly in a tight list item and drops its
    /// `<p>` wrapper.
    fn in_tight_item(tree: &Tree, node: NodeId) -> bool {
        match tree.parent(node) {
            Some(parent) => matches!(
                tree[parent].data,
                NodeData::ListItem(ListData { tight: true, .. })
            ),
            None => false,
        }
    }
}

impl Visitor for HtmlRenderer<'_> {
    fn visit(
        &mut self,
        tree: &Tree,
        node: NodeId,
        entering: bool,
    ) -> Result<WalkStatus, RenderError> {
        match &tree[node].data {
            NodeData::Document => {}
            NodeData::Text => {
                if entering {
                    self.text(tree, node);
                }
            }
            NodeData::SoftBreak => {
                if entering {
                    if self.options.soft_break_as_hard_break {
                        self.tag("<br />");
                        self.out.push('\n');
                    } else {
                        self.out.push('\n');
                    }
                }
            }
            NodeData::HardBreak => {
                if entering {
                    self.tag("<br />");
                    self.out.push('\n');
                }
            }
            NodeData::CodeSpan => {
                if entering {
                    self.tag("<code>");
                    self.out.push_str(&esc(&tree[node].text));
                    self.tag("</code>");
                }
            }
            NodeData::Emphasis => self.tag(if entering { "<em>" } else { "</em>" }),
            NodeData::Strong => self.tag(if entering { "<strong>" } else { "</strong>" }),
            NodeData::Strikethrough => self.tag(if entering { "<del>" } else { "</del>" }),
            NodeData::InlineHtml => {
                if entering {
                    self.out.push_str(&tree[node].text);
                }
            }
            NodeData::Link { destination, title } => {
                if self.disable_tags == 0 {
                    if entering {
                        self.out.push_str("<a href=\"");
                        self.out.push_str(&esc(destination));
                        self.out.push('"');
                        self.title_attr(title);
                        self.out.push('>');
                    } else {
                        self.out.push_str("</a>");
                    }
                }
            }
            NodeData::Image { destination, title } => {
                if entering {
                    if self.disable_tags == 0 {
                        self.out.push_str("<img src=\"");
                        self.out.push_str(&esc(destination));
                        self.out.push_str("\" alt=\"");
                    }
                    self.disable_tags += 1;
                } else {
                    self.disable_tags -= 1;
                    if self.disable_tags == 0 {
                        self.out.push('"');
                        self.title_attr(title);
                        self.out.push_str(" />");
                    }
                }
            }
            NodeData::Paragraph => {
                if Self::in_tight_item(tree, node) {
                    return Ok(WalkStatus::Continue);
                }
                if entering {
                    self.cr();
                    self.tag("<p>");
                } else {
                    self.tag("</p>");
                    self.cr();
                }
            }
            NodeData::Heading { level } => {
                if entering {
                    self.cr();
                    if self.disable_tags == 0 {
                        write!(self.out, "<h{level}>")?;
                    }
                } else {
                    if self.disable_tags == 0 {
                        write!(self.out, "</h{level}>")?;
                    }
                    self.cr();
                }
            }
            NodeData::ThematicBreak => {
                if entering {
                    self.cr();
                    self.tag("<hr />");
                    self.cr();
                }
            }
            NodeData::CodeBlock { .. } => {
                if entering {
                    self.code_block(tree, node)?;
                }
            }
            NodeData::HtmlBlock { .. } => {
                if entering {
                    self.cr();
                    self.out.push_str(&tree[node].text);
                    self.cr();
                }
            }
            NodeData::BlockQuote => {
                self.cr();
                self.tag(if entering {
                    "<blockquote>"
                } else {
                    "</blockquote>"
                });
                self.cr();
            }
            NodeData::List(data) => {
                if entering {
                    self.cr();
                    match data {
                        ListData {
                            kind: crate::node::ListKind::Ordered,
                            start,
                            ..
                        } if *start != 1 => {
                            write!(self.out, "<ol start=\"{start}\">")?;
                        }
                        ListData {
                            kind: crate::node::ListKind::Ordered,
                            ..
                        } => self.tag("<ol>"),
                        _ => self.tag("<ul>"),
                    }
                    self.cr();
                } else {
                    self.cr();
                    self.tag(if data.kind == crate::node::ListKind::Ordered {
                        "</ol>"
                    } else {
                        "</ul>"
                    });
                    self.cr();
                }
            }
            NodeData::ListItem(_) => {
                if entering {
                    self.tag("<li>");
                } else {
                    self.tag("</li>");
                    self.cr();
                }
            }
            NodeData::TaskListItemMarker { checked } => {
                if entering {
                    self.tag(if *checked {
                        "<input checked=\"\" disabled=\"\" type=\"checkbox\" />"
                    } else {
                        "<input disabled=\"\" type=\"checkbox\" />"
                    });
                }
            }
            NodeData::Table { .. } => {
                self.cr();
                self.tag(if entering { "<table>" } else { "</table>" });
                self.cr();
            }
            NodeData::TableHead => {
                if entering {
                    self.tag("<thead>");
                    self.cr();
                    self.tag("<tr>");
                    self.cr();
                } else {
                    self.tag("</tr>");
                    self.cr();
                    self.tag("</thead>");
                    self.cr();
                }
            }
            NodeData::TableRow => {
                if entering {
                    if tree.prev(node).map(|p| tree.kind(p)) == Some(NodeKind::TableHead) {
                        self.tag("<tbody>");
                        self.cr();
                    }
                    self.tag("<tr>");
                    self.cr();
                } else {
                    self.tag("</tr>");
                    self.cr();
                    if tree.next(node).is_none() {
                        self.tag("</tbody>");
                        self.cr();
                    }
                }
            }
            NodeData::TableCell { align } => {
                let in_head =
                    tree.parent(node).map(|p| tree.kind(p)) == Some(NodeKind::TableHead);
                let tag_name = if in_head { "th" } else { "td" };
                if entering {
                    if self.disable_tags == 0 {
                        write!(self.out, "<{tag_name}")?;
                        match align {
                            TableAlign::None => {}
                            TableAlign::Left => self.out.push_str(" align=\"left\""),
                            TableAlign::Center => self.out.push_str(" align=\"center\""),
                            TableAlign::Right => self.out.push_str(" align=\"right\""),
                        }
                        self.out.push('>');
                    }
                } else {
                    if self.disable_tags == 0 {
                        write!(self.out, "</{tag_name}>")?;
                    }
                    self.cr();
                }
            }
        }
        Ok(WalkStatus::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::render;
    use crate::options::Options;
    use pretty_assertions::assert_eq;

    fn html(input: &str, options: &Options) -> String {
        let tree = crate::parser::parse("t", input, options);
        render(&tree, options).unwrap()
    }

    fn cm(input: &str) -> String {
        html(input, &Options::default())
    }

    fn gfm(input: &str) -> String {
        html(input, &Options::default().gfm(true))
    }

    // ── blocks ──

    #[test]
    fn heading_and_paragraph() {
        assert_eq!(cm("# Hi\n\ntext\n"), "<h1>Hi</h1>\n<p>text</p>\n");
    }

    #[test]
    fn tight_list_drops_p() {
        assert_eq!(
            cm("- a\n- b\n"),
            "<ul>\n<li>a</li>\n<li>b</li>\n</ul>\n"
        );
    }

    #[test]
    fn loose_list_keeps_p() {
        assert_eq!(
            cm("- a\n\n- b\n"),
            "<ul>\n<li>\n<p>a</p>\n</li>\n<li>\n<p>b</p>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn ordered_list_start_attr() {
        assert_eq!(
            cm("3. a\n4. b\n"),
            "<ol start=\"3\">\n<li>a</li>\n<li>b</li>\n</ol>\n"
        );
        assert_eq!(cm("1. a\n"), "<ol>\n<li>a</li>\n</ol>\n");
    }

    #[test]
    fn nested_empty_list_item() {
        assert_eq!(
            cm("- -\n"),
            "<ul>\n<li>\n<ul>\n<li></li>\n</ul>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn block_quote() {
        assert_eq!(cm("> hi\n"), "<blockquote>\n<p>hi</p>\n</blockquote>\n");
    }

    #[test]
    fn thematic_break() {
        assert_eq!(cm("---\n"), "<hr />\n");
    }

    #[test]
    fn fenced_code_language_class() {
        assert_eq!(
            cm("```rust\nfn x() {}\n```\n"),
            "<pre><code class=\"language-rust\">fn x() {}\n</code></pre>\n"
        );
    }

    #[test]
    fn code_block_escapes_content() {
        assert_eq!(
            cm("    a < b\n"),
            "<pre><code>a &lt; b\n</code></pre>\n"
        );
    }

    #[test]
    fn highlight_fallback_class_for_empty_info() {
        let opts = Options::default().code_syntax_highlight(true);
        assert_eq!(
            html("~~~\nx\n~~~\n", &opts),
            "<pre><code class=\"language-fallback\">x\n</code></pre>\n"
        );
    }

    #[test]
    fn highlighter_hook_emits_raw_body() {
        fn hl(language: &str, code: &str) -> String {
            format!("<span data-lang=\"{language}\">{}</span>", code.trim_end())
        }
        let opts = Options::default()
            .code_syntax_highlight(true)
            .highlighter(hl);
        assert_eq!(
            html("```rust\nlet x;\n```\n", &opts),
            "<pre><code class=\"language-rust\"><span data-lang=\"rust\">let x;</span></code></pre>\n"
        );
    }

    #[test]
    fn html_block_passthrough() {
        assert_eq!(cm("<div>\n*x*\n</div>\n"), "<div>\n*x*\n</div>\n");
    }

    // ── inlines ──

    #[test]
    fn text_is_escaped() {
        assert_eq!(cm("a < \"b\" & c\n"), "<p>a &lt; &quot;b&quot; &amp; c</p>\n");
    }

    #[test]
    fn link_with_title() {
        assert_eq!(
            cm("[text](/url \"hi\")\n"),
            "<p><a href=\"/url\" title=\"hi\">text</a></p>\n"
        );
    }

    #[test]
    fn image_alt_flattens_markup() {
        assert_eq!(
            cm("![alt *em*](/img.png \"t\")\n"),
            "<p><img src=\"/img.png\" alt=\"alt em\" title=\"t\" /></p>\n"
        );
    }

    #[test]
    fn strikethrough_renders_del() {
        assert_eq!(gfm("~~x~~\n"), "<p><del>x</del></p>\n");
    }

    #[test]
    fn soft_break_modes() {
        assert_eq!(cm("a\nb\n"), "<p>a\nb</p>\n");
        let hard = Options::default().soft_break_as_hard_break(true);
        assert_eq!(html("a\nb\n", &hard), "<p>a<br />\nb</p>\n");
    }

    #[test]
    fn task_list_item() {
        assert_eq!(
            gfm("- [x] done\n- [ ] todo\n"),
            "<ul>\n<li><input checked=\"\" disabled=\"\" type=\"checkbox\" /> done</li>\n\
             <li><input disabled=\"\" type=\"checkbox\" /> todo</li>\n</ul>\n"
        );
    }

    #[test]
    fn ordered_task_list_renders_as_ul() {
        assert_eq!(
            gfm("1. [x] done\n"),
            "<ul>\n<li><input checked=\"\" disabled=\"\" type=\"checkbox\" /> done</li>\n</ul>\n"
        );
    }

    #[test]
    fn table_structure() {
        assert_eq!(
            gfm("| a | b |\n| :-: | --- |\n| 1 | 2 |\n"),
            "<table>\n<thead>\n<tr>\n<th align=\"center\">a</th>\n<th>b</th>\n</tr>\n\
             </thead>\n<tbody>\n<tr>\n<td align=\"center\">1</td>\n<td>2</td>\n</tr>\n\
             </tbody>\n</table>\n"
        );
    }

    #[test]
    fn table_without_body_has_no_tbody() {
        assert_eq!(
            gfm("| a |\n| --- |\n"),
            "<table>\n<thead>\n<tr>\n<th>a</th>\n</tr>\n</thead>\n</table>\n"
        );
    }

    #[test]
    fn text_filter_applies_to_text_runs() {
        fn filter(s: &str) -> String {
            s.replace("teh", "the")
        }
        let opts = Options::default().fix_term_typo(true).text_filter(filter);
        assert_eq!(html("teh `teh` x\n", &opts), "<p>the <code>teh</code> x</p>\n");
    }
}
