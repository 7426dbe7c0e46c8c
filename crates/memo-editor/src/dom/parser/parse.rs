// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Conversion of a parsed [`PaDom`] into the block model.
//!
//! The converter accepts the markup the serializer writes as well as what
//! browsers and office suites put on the clipboard. Unknown wrappers are
//! transparent, loose inline content at block level becomes a paragraph and
//! media found inside a paragraph splits it.

use tracing::debug;

use super::padom::{PaDom, PaDomHandle, PaDomNode, PaNodeContainer};
use super::padom_creator::PaDomCreator;
use super::HtmlParseError;
use crate::dom::block::{
    Accordion, Block, BlockNode, HeadingLevel, ListType, Media, MediaKind,
    Table, TableCell, TableRow,
};
use crate::dom::code_block::{CodeBlock, CodeRun};
use crate::dom::document::Document;
use crate::dom::inline::{InlineContent, InlineNode, StyleAttr, StyleSet};
use crate::dom::style::{parse_style, style_value};

/// Parses markup into blocks. Markup html5ever has to repair is refused.
pub fn parse_blocks(html: &str) -> Result<Vec<Block>, HtmlParseError> {
    let dom = PaDomCreator::parse(html).map_err(|e| HtmlParseError {
        parse_errors: e.parse_errors,
    })?;
    Ok(BlockParser::new(&dom).parse_fragment())
}

pub fn parse_document(html: &str) -> Result<Document, HtmlParseError> {
    Ok(Document::from_blocks(parse_blocks(html)?))
}

/// Parses foreign markup, accepting whatever html5ever recovers.
pub(crate) fn parse_blocks_lenient(html: &str) -> Vec<Block> {
    BlockParser::new(&parse_dom_lenient(html)).parse_fragment()
}

pub(crate) fn parse_dom_lenient(html: &str) -> PaDom {
    match PaDomCreator::parse(html) {
        Ok(dom) => dom,
        Err(e) => {
            debug!(
                target: "memo_editor::parser",
                errors = e.parse_errors.len(),
                "recovered from malformed markup"
            );
            e.dom
        }
    }
}

/// Inline content interleaved with media found while collecting it.
enum Segment {
    Inline(InlineContent),
    Media(Media),
}

struct BlockParser<'a> {
    dom: &'a PaDom,
}

impl<'a> BlockParser<'a> {
    fn new(dom: &'a PaDom) -> Self {
        Self { dom }
    }

    fn parse_fragment(&self) -> Vec<Block> {
        let mut out = Vec::new();
        self.convert_blocks(&self.dom.fragment_children(), &mut out);
        out
    }

    /// Converts block-level siblings, gathering loose inline content into
    /// paragraphs.
    fn convert_blocks(&self, children: &[PaDomHandle], out: &mut Vec<Block>) {
        let mut loose: Vec<Segment> = Vec::new();
        for child in children {
            match self.dom.get_node(*child) {
                PaDomNode::Text(text) => {
                    if text.content.trim().is_empty() {
                        continue;
                    }
                    push_text(&mut loose, &text.content, &StyleSet::default());
                }
                PaDomNode::Container(el) if is_block_element(el) => {
                    flush_segments(&mut loose, out, paragraph);
                    self.convert_block(el, out);
                }
                PaDomNode::Container(el) => {
                    if is_skipped(el.tag()) {
                        continue;
                    }
                    self.collect_inline(*child, &StyleSet::default(), &mut loose);
                }
                PaDomNode::Document(_) | PaDomNode::Comment => {}
            }
        }
        flush_segments(&mut loose, out, paragraph);
    }

    fn convert_block(&self, el: &PaNodeContainer, out: &mut Vec<Block>) {
        let tag = el.tag();
        match tag {
            "p" => self.convert_text_block(el, out, paragraph),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = HeadingLevel::new(tag.as_bytes()[1] - b'0');
                self.convert_text_block(el, out, move |content| {
                    BlockNode::Heading { level, content }
                });
            }
            "ul" | "ol" => {
                let list_type = if tag == "ol" {
                    ListType::Ordered
                } else {
                    ListType::Unordered
                };
                let mut items = Vec::new();
                self.convert_list_items(el, &mut items);
                out.push(Block::new(BlockNode::List { list_type, items }));
            }
            "li" => {
                let mut items = Vec::new();
                self.convert_list_item(el, &mut items);
                out.push(Block::new(BlockNode::List {
                    list_type: ListType::Unordered,
                    items,
                }));
            }
            "blockquote" => {
                let mut children = Vec::new();
                self.convert_blocks(&el.children, &mut children);
                if children.is_empty() {
                    children.push(Block::empty_paragraph());
                }
                out.push(Block::new(BlockNode::Quote(children)));
            }
            "pre" => out.push(Block::new(BlockNode::CodeBlock(
                self.convert_code_block(el),
            ))),
            "table" => out.push(Block::new(BlockNode::Table(
                self.convert_table(el),
            ))),
            "img" | "video" | "iframe" => {
                if let Some(media) = self.convert_media(el) {
                    out.push(Block::media(media));
                }
            }
            "div" if el.has_class("accordion-item") => {
                out.push(Block::new(BlockNode::Accordion(
                    self.convert_accordion(el),
                )));
            }
            "div" if !self.has_block_children(el) => {
                self.convert_text_block(el, out, paragraph)
            }
            // transparent wrappers: div, section, table-wrapper, body...
            _ => self.convert_blocks(&el.children, out),
        }
    }

    fn convert_text_block(
        &self,
        el: &PaNodeContainer,
        out: &mut Vec<Block>,
        make: impl Fn(InlineContent) -> BlockNode,
    ) {
        let mut segments = Vec::new();
        for child in &el.children {
            self.collect_inline(*child, &StyleSet::default(), &mut segments);
        }
        if segments.is_empty() {
            segments.push(Segment::Inline(InlineContent::new()));
        }
        flush_segments(&mut segments, out, make);
    }

    fn convert_list_items(&self, el: &PaNodeContainer, items: &mut Vec<Block>) {
        for child in &el.children {
            match self.dom.get_node(*child) {
                PaDomNode::Container(c) if c.tag() == "li" => {
                    self.convert_list_item(c, items)
                }
                PaDomNode::Container(c) if matches!(c.tag(), "ul" | "ol") => {
                    self.convert_list_items(c, items)
                }
                PaDomNode::Text(t) if t.content.trim().is_empty() => {}
                PaDomNode::Container(_) | PaDomNode::Text(_) => {
                    let mut content = Vec::new();
                    self.collect_inline(*child, &StyleSet::default(), &mut content);
                    items.push(list_item(flatten_segments(content)));
                }
                PaDomNode::Document(_) | PaDomNode::Comment => {}
            }
        }
    }

    /// A list item holds inline content only: nested lists follow it as
    /// sibling items and nested blocks become line breaks.
    fn convert_list_item(&self, el: &PaNodeContainer, items: &mut Vec<Block>) {
        let mut segments = Vec::new();
        let mut nested = Vec::new();
        for child in &el.children {
            match self.dom.get_node(*child) {
                PaDomNode::Container(c) if matches!(c.tag(), "ul" | "ol") => {
                    self.convert_list_items(c, &mut nested)
                }
                _ => self.collect_inline(
                    *child,
                    &StyleSet::default(),
                    &mut segments,
                ),
            }
        }
        items.push(list_item(flatten_segments(segments)));
        items.extend(nested);
    }

    fn convert_code_block(&self, pre: &PaNodeContainer) -> CodeBlock {
        let code = pre
            .children
            .iter()
            .filter_map(|c| self.dom.element(*c))
            .find(|c| c.tag() == "code");
        let source = code.unwrap_or(pre);
        let classes: Vec<&str> = source
            .get_attr("class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default();
        let language = classes.iter().find_map(|c| {
            c.strip_prefix("language-").or_else(|| c.strip_prefix("lang-"))
        });
        let no_highlight = classes
            .iter()
            .any(|c| *c == "no-highlight" || *c == "nohighlight");
        let highlighted = classes.contains(&"hljs")
            || source.get_attr("data-highlighted") == Some("yes");

        let mut block =
            CodeBlock::new(language.map(str::to_owned), no_highlight);
        let mut runs = Vec::new();
        for child in &source.children {
            self.collect_code(*child, None, &mut runs);
        }
        if highlighted {
            block.runs = runs;
            block.highlighted = true;
        } else {
            block.runs = runs;
            block.strip_markup();
        }
        block
    }

    fn collect_code(
        &self,
        handle: PaDomHandle,
        classes: Option<&str>,
        runs: &mut Vec<CodeRun>,
    ) {
        match self.dom.get_node(handle) {
            PaDomNode::Text(t) => {
                if !t.content.is_empty() {
                    runs.push(CodeRun::Text {
                        text: t.content.clone(),
                        classes: classes.map(str::to_owned),
                    });
                }
            }
            PaDomNode::Container(c) if c.tag() == "br" => {
                runs.push(CodeRun::plain("\n"))
            }
            PaDomNode::Container(c) => {
                let inner = c.get_attr("class").or(classes);
                for child in &c.children {
                    self.collect_code(*child, inner, runs);
                }
                if matches!(c.tag(), "div" | "p") {
                    runs.push(CodeRun::plain("\n"));
                }
            }
            PaDomNode::Document(_) | PaDomNode::Comment => {}
        }
    }

    fn convert_table(&self, table: &PaNodeContainer) -> Table {
        let mut rows = Vec::new();
        self.collect_rows(table, &mut rows);
        Table {
            attrs: table.attrs.clone(),
            rows,
        }
    }

    fn collect_rows(&self, el: &PaNodeContainer, rows: &mut Vec<TableRow>) {
        for child in el.children.iter().filter_map(|c| self.dom.element(*c)) {
            match child.tag() {
                "thead" | "tbody" | "tfoot" => self.collect_rows(child, rows),
                "tr" => {
                    let cells = child
                        .children
                        .iter()
                        .filter_map(|c| self.dom.element(*c))
                        .filter(|c| matches!(c.tag(), "td" | "th"))
                        .map(|cell| self.convert_cell(cell))
                        .collect();
                    rows.push(TableRow {
                        attrs: child.attrs.clone(),
                        cells,
                    });
                }
                _ => {}
            }
        }
    }

    fn convert_cell(&self, cell: &PaNodeContainer) -> Block {
        let mut segments = Vec::new();
        for child in &cell.children {
            self.collect_inline(*child, &StyleSet::default(), &mut segments);
        }
        Block::new(BlockNode::TableCell(TableCell {
            header: cell.tag() == "th",
            attrs: cell.attrs.clone(),
            content: flatten_segments(segments),
        }))
    }

    fn convert_media(&self, el: &PaNodeContainer) -> Option<Media> {
        let kind = match el.tag() {
            "img" => MediaKind::Image,
            "video" => MediaKind::Video,
            "iframe" => MediaKind::Iframe,
            _ => return None,
        };
        let src = el.get_attr("src").map(str::to_owned).or_else(|| {
            el.children
                .iter()
                .filter_map(|c| self.dom.element(*c))
                .find(|c| c.tag() == "source")
                .and_then(|s| s.get_attr("src"))
                .map(str::to_owned)
        })?;
        let mut media = Media::new(kind, src);
        media.attrs = el
            .attrs
            .iter()
            .filter(|(name, _)| name != "src")
            .cloned()
            .collect();
        Some(media)
    }

    fn convert_accordion(&self, el: &PaNodeContainer) -> Accordion {
        let mut title = InlineContent::new();
        if let Some(title_el) = self.find_by_class(el, "accordion-title") {
            let mut segments = Vec::new();
            for child in &title_el.children {
                self.collect_inline(*child, &StyleSet::default(), &mut segments);
            }
            title = flatten_segments(segments);
        }
        let mut body = Vec::new();
        let body_el = self
            .find_by_class(el, "accordion-body")
            .or_else(|| self.find_by_class(el, "accordion-content"));
        if let Some(body_el) = body_el {
            self.convert_blocks(&body_el.children, &mut body);
        }
        Accordion {
            title,
            body,
            expanded: el.has_class("expanded"),
        }
    }

    fn find_by_class(
        &self,
        el: &'a PaNodeContainer,
        class: &str,
    ) -> Option<&'a PaNodeContainer> {
        for child in el.children.iter().filter_map(|c| self.dom.element(*c)) {
            if child.has_class(class) {
                return Some(child);
            }
            if let Some(found) = self.find_by_class(child, class) {
                return Some(found);
            }
        }
        None
    }

    fn has_block_children(&self, el: &PaNodeContainer) -> bool {
        el.children
            .iter()
            .filter_map(|c| self.dom.element(*c))
            .any(is_block_element)
    }

    /// Appends the inline content of `handle` to `out`, with `style`
    /// inherited from the enclosing formatting elements.
    fn collect_inline(
        &self,
        handle: PaDomHandle,
        style: &StyleSet,
        out: &mut Vec<Segment>,
    ) {
        let el = match self.dom.get_node(handle) {
            PaDomNode::Text(t) => {
                // formatting whitespace between tags
                if t.content.contains('\n') && t.content.trim().is_empty() {
                    return;
                }
                push_text(out, &t.content.replace(['\n', '\r'], " "), style);
                return;
            }
            PaDomNode::Container(el) => el,
            PaDomNode::Document(_) | PaDomNode::Comment => return,
        };
        let tag = el.tag();
        match tag {
            "br" => {
                push_node(out, InlineNode::LineBreak);
                return;
            }
            "img" | "video" | "iframe" => {
                if let Some(media) = self.convert_media(el) {
                    out.push(Segment::Media(media));
                }
                return;
            }
            _ if is_skipped(tag) => return,
            _ => {}
        }

        let is_block = is_block_element(el);
        if is_block && !ends_with_break(out) {
            push_node(out, InlineNode::LineBreak);
        }
        let style = inline_style(el, style);
        for child in &el.children {
            self.collect_inline(*child, &style, out);
        }
        if is_block && !ends_with_break(out) {
            push_node(out, InlineNode::LineBreak);
        }
    }
}

fn paragraph(content: InlineContent) -> BlockNode {
    BlockNode::Paragraph(content)
}

fn list_item(mut content: InlineContent) -> Block {
    strip_placeholder(&mut content);
    Block::new(BlockNode::ListItem(content))
}

fn push_text(out: &mut Vec<Segment>, text: &str, style: &StyleSet) {
    if !text.is_empty() {
        push_node(out, InlineNode::text(text, style.clone()));
    }
}

fn push_node(out: &mut Vec<Segment>, node: InlineNode) {
    if let Some(Segment::Inline(content)) = out.last_mut() {
        content.push(node);
    } else {
        let mut content = InlineContent::new();
        content.push(node);
        out.push(Segment::Inline(content));
    }
}

fn ends_with_break(out: &[Segment]) -> bool {
    match out.last() {
        Some(Segment::Inline(c)) => {
            c.is_empty() || matches!(c.nodes().last(), Some(InlineNode::LineBreak))
        }
        _ => true,
    }
}

/// Drops the trailing `<br>` a browser keeps at the end of a block, which
/// also turns a lone placeholder into empty content.
fn strip_placeholder(content: &mut InlineContent) {
    if matches!(content.nodes().last(), Some(InlineNode::LineBreak)) {
        let len = content.len();
        content.delete(len - 1, len);
    }
}

/// Turns collected segments into blocks: each inline stretch becomes a
/// block built by `make`, each media element its own block.
fn flush_segments(
    segments: &mut Vec<Segment>,
    out: &mut Vec<Block>,
    make: impl Fn(InlineContent) -> BlockNode,
) {
    let only = segments.len() == 1;
    for segment in segments.drain(..) {
        match segment {
            Segment::Inline(mut content) => {
                strip_placeholder(&mut content);
                let blank = content.text().trim().is_empty()
                    && !content.nodes().contains(&InlineNode::LineBreak);
                if only || !blank {
                    content.normalize();
                    out.push(Block::new(make(content)));
                }
            }
            Segment::Media(media) => out.push(Block::media(media)),
        }
    }
}

/// Inline content with any media dropped, for places that hold text only.
fn flatten_segments(segments: Vec<Segment>) -> InlineContent {
    let mut out = InlineContent::new();
    for segment in segments {
        match segment {
            Segment::Inline(content) => out.append(content),
            Segment::Media(media) => debug!(
                target: "memo_editor::parser",
                src = %media.src,
                "dropping media nested in inline-only content"
            ),
        }
    }
    strip_placeholder(&mut out);
    out.normalize();
    out
}

fn is_skipped(tag: &str) -> bool {
    matches!(
        tag,
        "script" | "style" | "meta" | "link" | "title" | "head" | "template"
            | "hr" | "button" | "input" | "select" | "textarea" | "noscript"
    )
}

fn is_block_element(el: &PaNodeContainer) -> bool {
    matches!(
        el.tag(),
        "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "ul" | "ol"
            | "li" | "blockquote" | "pre" | "table" | "section" | "article"
            | "main" | "header" | "footer" | "aside" | "nav" | "figure"
            | "body" | "html" | "tr" | "td" | "th" | "tbody" | "thead"
            | "tfoot"
    )
}

/// Maps formatting elements and inline CSS onto the run style.
fn inline_style(el: &PaNodeContainer, inherited: &StyleSet) -> StyleSet {
    let mut style = inherited.clone();
    match el.tag() {
        "strong" | "b" => style.apply(&StyleAttr::Bold),
        "em" | "i" => style.apply(&StyleAttr::Italic),
        "u" | "ins" => style.apply(&StyleAttr::Underline),
        "s" | "strike" | "del" => style.apply(&StyleAttr::Strike),
        "code" | "kbd" | "tt" | "samp" => style.apply(&StyleAttr::Code),
        "a" => {
            if let Some(href) = el.get_attr("href").filter(|h| !h.is_empty()) {
                style.apply(&StyleAttr::Link(href.to_owned()));
            }
        }
        "font" => {
            if let Some(color) = el.get_attr("color") {
                style.apply(&StyleAttr::Color(color.to_owned()));
            }
        }
        _ => {}
    }
    let props = parse_style(el.get_attr("style").unwrap_or_default());
    if let Some(weight) = style_value(&props, "font-weight") {
        let numeric = weight.parse::<u16>().ok();
        if weight == "bold" || weight == "bolder" || numeric.is_some_and(|w| w >= 600)
        {
            style.apply(&StyleAttr::Bold);
        } else if weight == "normal" || numeric.is_some() {
            style.bold = false;
        }
    }
    if style_value(&props, "font-style") == Some("italic") {
        style.apply(&StyleAttr::Italic);
    }
    for name in ["text-decoration", "text-decoration-line"] {
        if let Some(decoration) = style_value(&props, name) {
            if decoration.contains("underline") {
                style.apply(&StyleAttr::Underline);
            }
            if decoration.contains("line-through") {
                style.apply(&StyleAttr::Strike);
            }
        }
    }
    if let Some(color) = style_value(&props, "color") {
        style.apply(&StyleAttr::Color(color.to_owned()));
    }
    if let Some(bg) = style_value(&props, "background-color")
        .or_else(|| style_value(&props, "background"))
    {
        if bg != "transparent" {
            style.apply(&StyleAttr::Background(bg.to_owned()));
        }
    }
    if let Some(size) = style_value(&props, "font-size") {
        style.apply(&StyleAttr::FontSize(size.to_owned()));
    }
    style
}
