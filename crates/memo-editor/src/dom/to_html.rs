// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Serialization of the block model to the markup the editable surface
//! renders and the persistence collaborator stores.

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::dom::block::{Accordion, Block, BlockNode, Media, MediaKind, Table};
use crate::dom::code_block::{CodeBlock, CodeRun};
use crate::dom::document::Document;
use crate::dom::inline::{InlineContent, InlineNode, StyleSet, TextRun};
use crate::dom::style::format_style;

pub trait ToHtml {
    fn fmt_html(&self, buf: &mut String);

    fn to_html(&self) -> String {
        let mut buf = String::new();
        self.fmt_html(&mut buf);
        buf
    }
}

impl ToHtml for Document {
    fn fmt_html(&self, buf: &mut String) {
        for block in self.blocks() {
            block.fmt_html(buf);
        }
    }
}

impl ToHtml for [Block] {
    fn fmt_html(&self, buf: &mut String) {
        for block in self {
            block.fmt_html(buf);
        }
    }
}

impl ToHtml for Block {
    fn fmt_html(&self, buf: &mut String) {
        match self.node() {
            BlockNode::Paragraph(content) => {
                text_block(buf, "p", &[], content)
            }
            BlockNode::Heading { level, content } => {
                text_block(buf, &format!("h{}", level.get()), &[], content)
            }
            BlockNode::List { list_type, items } => {
                open_tag(buf, list_type.tag(), &[]);
                items.as_slice().fmt_html(buf);
                close_tag(buf, list_type.tag());
            }
            BlockNode::ListItem(content) => text_block(buf, "li", &[], content),
            BlockNode::Quote(children) => {
                buf.push_str("<blockquote>");
                children.as_slice().fmt_html(buf);
                buf.push_str("</blockquote>");
            }
            BlockNode::Accordion(accordion) => accordion.fmt_html(buf),
            BlockNode::CodeBlock(code) => code.fmt_html(buf),
            BlockNode::Table(table) => table.fmt_html(buf),
            BlockNode::TableCell(cell) => text_block(
                buf,
                if cell.header { "th" } else { "td" },
                &cell.attrs,
                &cell.content,
            ),
            BlockNode::Media(media) => media.fmt_html(buf),
        }
    }
}

impl ToHtml for Accordion {
    fn fmt_html(&self, buf: &mut String) {
        if self.expanded {
            buf.push_str(r#"<div class="accordion-item expanded">"#);
        } else {
            buf.push_str(r#"<div class="accordion-item">"#);
        }
        buf.push_str(
            r#"<div class="accordion-header" contenteditable="false"><span class="accordion-icon">"#,
        );
        buf.push(if self.expanded { '▼' } else { '▶' });
        buf.push_str(
            r#"</span><span class="accordion-title" contenteditable="true">"#,
        );
        self.title.normalized().fmt_html(buf);
        buf.push_str("</span></div>");
        buf.push_str(if self.expanded {
            r#"<div class="accordion-content" style="display: block;">"#
        } else {
            r#"<div class="accordion-content" style="display: none;">"#
        });
        buf.push_str(r#"<div class="accordion-body" contenteditable="true">"#);
        self.body.as_slice().fmt_html(buf);
        buf.push_str("</div></div></div>");
    }
}

impl CodeBlock {
    /// Class list of the `<code>` element.
    pub(crate) fn class_list(&self) -> Vec<String> {
        let mut classes = Vec::new();
        if let Some(language) = &self.language {
            classes.push(format!("language-{language}"));
        }
        if self.no_highlight {
            classes.push("no-highlight".to_owned());
        }
        if self.highlighted {
            classes.push("hljs".to_owned());
        }
        classes
    }
}

impl ToHtml for CodeBlock {
    fn fmt_html(&self, buf: &mut String) {
        let mut attrs = Vec::new();
        let classes = self.class_list();
        if !classes.is_empty() {
            attrs.push(("class".to_owned(), classes.join(" ")));
        }
        if self.highlighted {
            attrs.push(("data-highlighted".to_owned(), "yes".to_owned()));
        }
        buf.push_str("<pre>");
        open_tag(buf, "code", &attrs);
        for run in &self.runs {
            match run {
                CodeRun::Text {
                    text,
                    classes: Some(classes),
                } => {
                    open_tag(
                        buf,
                        "span",
                        &[("class".to_owned(), classes.clone())],
                    );
                    buf.push_str(&encode_text(text));
                    buf.push_str("</span>");
                }
                CodeRun::Text { text, classes: None } => {
                    buf.push_str(&encode_text(text))
                }
                CodeRun::LineBreak => buf.push_str("<br>"),
            }
        }
        buf.push_str("</code></pre>");
    }
}

impl ToHtml for Table {
    fn fmt_html(&self, buf: &mut String) {
        buf.push_str(r#"<div class="table-wrapper" contenteditable="false">"#);
        open_tag(buf, "table", &self.attrs);
        buf.push_str("<tbody>");
        for row in &self.rows {
            open_tag(buf, "tr", &row.attrs);
            row.cells.as_slice().fmt_html(buf);
            buf.push_str("</tr>");
        }
        buf.push_str("</tbody></table></div>");
    }
}

impl ToHtml for Media {
    fn fmt_html(&self, buf: &mut String) {
        let mut attrs = vec![("src".to_owned(), self.src.clone())];
        attrs.extend(self.attrs.iter().cloned());
        open_tag(buf, self.kind.tag(), &attrs);
        if self.kind != MediaKind::Image {
            close_tag(buf, self.kind.tag());
        }
    }
}

impl ToHtml for InlineContent {
    fn fmt_html(&self, buf: &mut String) {
        for node in self.nodes() {
            match node {
                InlineNode::Text(run) => run.fmt_html(buf),
                InlineNode::LineBreak => buf.push_str("<br>"),
            }
        }
    }
}

impl ToHtml for TextRun {
    /// Wraps the text in `a > span > strong > em > u > s > code`.
    fn fmt_html(&self, buf: &mut String) {
        let style = &self.style;
        let mut closers: Vec<&str> = Vec::new();
        if let Some(href) = &style.link {
            open_tag(buf, "a", &[("href".to_owned(), href.clone())]);
            closers.push("a");
        }
        if let Some(css) = span_style(style) {
            open_tag(buf, "span", &[("style".to_owned(), css)]);
            closers.push("span");
        }
        for (on, tag) in [
            (style.bold, "strong"),
            (style.italic, "em"),
            (style.underline, "u"),
            (style.strike, "s"),
            (style.code, "code"),
        ] {
            if on {
                open_tag(buf, tag, &[]);
                closers.push(tag);
            }
        }
        buf.push_str(&encode_text(&self.text));
        for tag in closers.into_iter().rev() {
            close_tag(buf, tag);
        }
    }
}

fn span_style(style: &StyleSet) -> Option<String> {
    let mut props = Vec::new();
    if let Some(color) = &style.color {
        props.push(("color".to_owned(), color.clone()));
    }
    if let Some(bg) = &style.background {
        props.push(("background-color".to_owned(), bg.clone()));
    }
    if let Some(size) = &style.font_size {
        props.push(("font-size".to_owned(), size.clone()));
    }
    (!props.is_empty()).then(|| format_style(&props))
}

/// An empty block, or one ending in a line break, gets a trailing `<br>`
/// so the browser gives the last line a height.
fn text_block(
    buf: &mut String,
    tag: &str,
    attrs: &[(String, String)],
    content: &InlineContent,
) {
    open_tag(buf, tag, attrs);
    let content = content.normalized();
    content.fmt_html(buf);
    if content.is_empty()
        || matches!(content.nodes().last(), Some(InlineNode::LineBreak))
    {
        buf.push_str("<br>");
    }
    close_tag(buf, tag);
}

pub(crate) fn open_tag(buf: &mut String, tag: &str, attrs: &[(String, String)]) {
    buf.push('<');
    buf.push_str(tag);
    for (name, value) in attrs {
        buf.push(' ');
        buf.push_str(name);
        buf.push_str("=\"");
        buf.push_str(&encode_double_quoted_attribute(value));
        buf.push('"');
    }
    buf.push('>');
}

fn close_tag(buf: &mut String, tag: &str) {
    buf.push_str("</");
    buf.push_str(tag);
    buf.push('>');
}
