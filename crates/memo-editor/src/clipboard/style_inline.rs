// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use crate::dom::parser::{parse_dom_lenient, PaDom, PaDomHandle, PaDomNode};
use crate::dom::style::{
    format_style, parse_px, parse_style, set_style_value, style_value,
};

/// Computed properties copied onto every element.
pub const COPY_STYLE_ALLOW_LIST: &[&str] = &[
    "color",
    "background-color",
    "background",
    "font-size",
    "font-weight",
    "font-style",
    "font-family",
    "text-decoration",
    "text-align",
    "border",
    "border-color",
    "border-width",
    "border-style",
    "padding",
    "margin",
    "vertical-align",
    "line-height",
];

/// Extra properties for table elements.
const TABLE_STYLE_ALLOW_LIST: &[&str] =
    &["width", "height", "border-collapse", "border-spacing", "table-layout"];

/// Elements that get no style treatment.
const SKIPPED: &[&str] = &["br", "hr", "wbr", "input", "meta", "link", "base"];

/// Properties an element takes from its parent unless it sets its own.
const INHERITED: &[&str] = &[
    "color",
    "font-size",
    "font-weight",
    "font-style",
    "font-family",
    "line-height",
    "text-align",
];

/// The resolved style of an element above the one being resolved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AncestorStyle {
    pub tag: String,
    pub computed: Vec<(String, String)>,
}

/// An element as a [`StyleResolver`] sees it, before `class` and `id` are
/// stripped. `ancestors` is ordered outermost first.
#[derive(Clone, Copy, Debug)]
pub struct ElementContext<'a> {
    pub tag: &'a str,
    pub attrs: &'a [(String, String)],
    pub ancestors: &'a [AncestorStyle],
}

impl ElementContext<'_> {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// The value the nearest ancestor computed for `property`.
    pub fn inherited(&self, property: &str) -> Option<&str> {
        self.ancestors
            .last()
            .and_then(|a| style_value(&a.computed, property))
    }
}

/// Supplies the computed style of elements being copied. Hosts with access
/// to a real layout engine pass its values through; otherwise the
/// [`ModelStyleResolver`] approximates the editor stylesheet.
pub trait StyleResolver {
    fn computed_style(&self, element: &ElementContext<'_>) -> Vec<(String, String)>;
}

/// The editor's default stylesheet, expressed as computed values.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelStyleResolver {
    pub color: String,
    pub font_family: String,
    pub font_size: String,
    pub line_height: String,
}

impl Default for ModelStyleResolver {
    fn default() -> Self {
        Self {
            color: "rgb(51, 51, 51)".to_owned(),
            font_family: "-apple-system, BlinkMacSystemFont, \"Segoe UI\", sans-serif"
                .to_owned(),
            font_size: "16px".to_owned(),
            line_height: "1.6".to_owned(),
        }
    }
}

impl StyleResolver for ModelStyleResolver {
    fn computed_style(&self, el: &ElementContext<'_>) -> Vec<(String, String)> {
        let mut props: Vec<(String, String)> = Vec::new();
        let mut set = |name: &str, value: &str| set_style_value(&mut props, name, value);

        for property in INHERITED.iter().copied() {
            if let Some(value) = el.inherited(property) {
                set(property, value);
            }
        }
        if el.ancestors.is_empty() {
            set("color", &self.color);
            set("font-family", &self.font_family);
            set("font-size", &self.font_size);
            set("line-height", &self.line_height);
            set("font-weight", "400");
        }

        match el.tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let size = match el.tag {
                    "h1" => "32px",
                    "h2" => "24px",
                    "h3" => "20px",
                    "h4" => "18px",
                    "h5" => "16px",
                    _ => "14px",
                };
                set("font-size", size);
                set("font-weight", "700");
                set("margin", "16px 0px 8px");
            }
            "p" => set("margin", "0px 0px 8px"),
            "strong" | "b" | "th" => set("font-weight", "700"),
            "em" | "i" => set("font-style", "italic"),
            "u" => set("text-decoration", "underline"),
            "s" | "del" | "strike" => set("text-decoration", "line-through"),
            "a" => {
                set("color", "rgb(0, 102, 204)");
                set("text-decoration", "underline");
            }
            "code" | "pre" => {
                set("font-family", "SFMono-Regular, Consolas, monospace");
                set("background-color", "rgb(246, 248, 250)");
                if el.tag == "pre" {
                    set("padding", "12px");
                }
            }
            "blockquote" => {
                set("padding", "0px 0px 0px 12px");
                set("color", "rgb(102, 102, 102)");
            }
            "table" => set("border-collapse", "collapse"),
            _ => {}
        }
        if matches!(el.tag, "td" | "th") {
            set("border", "1px solid rgb(221, 221, 221)");
            set("padding", "8px");
        }
        if el.has_class("accordion-title") {
            set("font-weight", "600");
        }
        // the element's own declarations win
        for (name, value) in parse_style(el.attr("style").unwrap_or_default()) {
            set(&name, &value);
        }
        props
    }
}

/// Values that say nothing and are left out of copied markup.
fn is_meaningful(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty()
        && !matches!(
            value,
            "none" | "rgba(0, 0, 0, 0)" | "transparent" | "normal" | "auto"
        )
        && !value.starts_with("0px")
}

/// Inlines the allow-listed computed style onto every element of `html`
/// and strips `class` and `id`. Structural attributes (media geometry,
/// `colspan`/`rowspan`, table borders) are kept as they are.
pub fn prepare_html_for_copy(html: &str, resolver: &dyn StyleResolver) -> String {
    let mut dom = parse_dom_lenient(html);
    let roots = dom.fragment_children();
    let mut ancestors = Vec::new();
    for root in &roots {
        inline_element(&mut dom, *root, resolver, &mut ancestors);
    }
    let mut out = String::new();
    for root in roots {
        dom.write_html(root, &mut out);
    }
    out
}

fn inline_element(
    dom: &mut PaDom,
    handle: PaDomHandle,
    resolver: &dyn StyleResolver,
    ancestors: &mut Vec<AncestorStyle>,
) {
    let PaDomNode::Container(el) = dom.get_node(handle) else {
        return;
    };
    let tag = el.tag().to_owned();
    if SKIPPED.contains(&tag.as_str()) {
        return;
    }
    let computed = resolver.computed_style(&ElementContext {
        tag: &tag,
        attrs: &el.attrs,
        ancestors: ancestors.as_slice(),
    });
    let children = el.children.clone();

    if let PaDomNode::Container(el) = dom.get_mut_node(handle) {
        el.attrs.retain(|(name, _)| name != "class" && name != "id");
        let own = el
            .attrs
            .iter()
            .find(|(name, _)| name == "style")
            .map(|(_, v)| parse_style(v))
            .unwrap_or_default();
        let mut style = own.clone();
        let table_props = matches!(tag.as_str(), "table" | "tr" | "td" | "th")
            .then_some(TABLE_STYLE_ALLOW_LIST)
            .unwrap_or_default();
        for property in COPY_STYLE_ALLOW_LIST.iter().chain(table_props) {
            if style_value(&own, property).is_some() {
                continue;
            }
            if let Some(value) = style_value(&computed, property) {
                if is_meaningful(value) {
                    set_style_value(&mut style, property, value);
                }
            }
        }
        if matches!(tag.as_str(), "img" | "iframe" | "video") {
            pin_geometry(&el.attrs, &mut style);
        }
        el.attrs.retain(|(name, _)| name != "style");
        if !style.is_empty() {
            el.attrs.push(("style".to_owned(), format_style(&style)));
        }
    }

    ancestors.push(AncestorStyle { tag, computed });
    for child in children {
        inline_element(dom, child, resolver, ancestors);
    }
    ancestors.pop();
}

/// Copies explicit `width`/`height` attributes into the inline style so
/// the pasted object keeps its size.
fn pin_geometry(attrs: &[(String, String)], style: &mut Vec<(String, String)>) {
    let px = |name: &str| {
        attrs
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| parse_px(v))
            .or_else(|| style_value(style, name).and_then(parse_px))
    };
    let width = px("width");
    let height = px("height");
    if let Some(width) = width {
        set_style_value(style, "max-width", "none");
        set_style_value(style, "width", &format!("{width}px"));
    }
    if let Some(height) = height {
        set_style_value(style, "height", &format!("{height}px"));
    }
}
