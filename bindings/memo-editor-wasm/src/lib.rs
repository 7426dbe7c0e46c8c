// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Browser bindings. Blocks are addressed by their index among the
//! document's leaf blocks, in the order the rendered markup shows them.
//! Collaborators (highlighter, uploads, saving) are plain JS functions that
//! answer synchronously.

use std::time::Duration;

use js_sys::{Function, Object, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;

use memo_editor::{
    BlockType, ClipboardPayload, EditError, Editor, FileUpload, HeadingLevel,
    HighlightError, Highlighted, Highlighter, InputEvent, InputOutcome, Key,
    KeyCombo, KeyOutcome, ListType, Modifiers, PageDraft, PagePersistence,
    PlatformMutation, Position, SaveResponse, Selection, StyleAttr, StyleKey,
    UploadEndpoint, UploadKind, UploadResponse, VideoSize,
};

#[wasm_bindgen]
pub struct EditorModel {
    inner: Editor,
}

#[wasm_bindgen]
pub fn new_editor_model() -> EditorModel {
    console_error_panic_hook::set_once();
    EditorModel {
        inner: Editor::new(),
    }
}

#[wasm_bindgen]
impl EditorModel {
    /// `highlight(text, language)` must return `{ html, language }`.
    pub fn set_highlighter(&mut self, highlight: Function) {
        let editor = std::mem::take(&mut self.inner);
        self.inner = editor.with_highlighter(Box::new(JsHighlighter(highlight)));
    }

    /// `callback(isEmpty)` runs after every committed change.
    pub fn on_content_changed(&mut self, callback: Function) {
        self.inner.on_content_changed(move |status| {
            let _ = callback.call1(&JsValue::NULL, &JsValue::from_bool(status.is_empty));
        });
    }

    pub fn set_content_from_html(&mut self, html: &str) -> Result<(), JsError> {
        self.inner.set_content(html).map_err(js_error)
    }

    pub fn set_content_from_markdown(&mut self, markdown: &str) -> Result<(), JsError> {
        self.inner.set_content_from_markdown(markdown).map_err(js_error)
    }

    pub fn get_content_as_html(&self) -> String {
        self.inner.get_content()
    }

    pub fn get_content_as_plain_text(&self) -> String {
        self.inner.get_text()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn select(
        &mut self,
        anchor_leaf: u32,
        anchor_offset: u32,
        focus_leaf: u32,
        focus_offset: u32,
    ) -> Result<(), JsError> {
        let anchor = self.position(anchor_leaf, anchor_offset)?;
        let focus = self.position(focus_leaf, focus_offset)?;
        self.inner
            .set_selection(Selection::new(anchor, focus))
            .map_err(js_error)
    }

    /// `[anchorLeaf, anchorOffset, focusLeaf, focusOffset]`.
    pub fn selection(&self) -> Vec<u32> {
        let selection = self.inner.selection();
        let mut out = self.ordinal(selection.anchor);
        out.extend(self.ordinal(selection.focus));
        out
    }

    pub fn blur(&mut self) {
        self.inner.blur();
    }

    /// Host time in milliseconds, e.g. `performance.now()`.
    pub fn tick(&mut self, now_ms: f64) {
        if now_ms.is_finite() && now_ms >= 0.0 {
            self.inner.tick(Duration::from_secs_f64(now_ms / 1000.0));
        }
    }

    pub fn next_tick_due(&self) -> Option<f64> {
        self.inner
            .next_tick_due()
            .map(|due| due.as_secs_f64() * 1000.0)
    }

    /// Takes a `beforeinput` event's `inputType` and `data`. Returns
    /// `handled`, `rejected` or `ignored`; only `ignored` lets the browser
    /// default run.
    pub fn handle_input(&mut self, input_type: &str, data: Option<String>) -> String {
        let Some(event) = InputEvent::from_input_type(input_type, data.as_deref()) else {
            return "ignored".to_owned();
        };
        match self.inner.handle_input(event) {
            InputOutcome::Handled => "handled",
            InputOutcome::Rejected(_) => "rejected",
            InputOutcome::Ignored => "ignored",
        }
        .to_owned()
    }

    /// Returns `handled`, `request_link` or `unhandled`.
    pub fn handle_key(
        &mut self,
        key: &str,
        ctrl: bool,
        meta: bool,
        shift: bool,
        alt: bool,
    ) -> String {
        let Some(key) = Key::from_dom(key) else {
            return "unhandled".to_owned();
        };
        let modifiers = Modifiers {
            ctrl,
            meta,
            shift,
            alt,
        };
        match self.inner.handle_key(KeyCombo::new(key, modifiers)) {
            KeyOutcome::Handled => "handled",
            KeyOutcome::RequestLink { .. } => "request_link",
            KeyOutcome::Unhandled => "unhandled",
        }
        .to_owned()
    }

    pub fn selected_text(&self) -> String {
        self.inner.selected_text()
    }

    pub fn undo(&mut self) -> bool {
        self.inner.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.inner.redo()
    }

    pub fn can_undo(&self) -> bool {
        self.inner.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.inner.can_redo()
    }

    pub fn save_state_to_history(&mut self) {
        self.inner.save_state_to_history();
    }

    /// Toggles a valueless style: `bold`, `italic`, `underline`, `strike`
    /// or `code`.
    pub fn toggle_format(&mut self, style: &str) -> Result<(), JsError> {
        let attr = style_attr(style, None)?;
        self.inner.toggle_format(attr).map_err(js_error)
    }

    /// Applies `color`, `background`, `font-size` or `link` with a value.
    pub fn apply_style(&mut self, style: &str, value: String) -> Result<(), JsError> {
        let attr = style_attr(style, Some(value))?;
        self.inner.apply_inline_style(attr).map_err(js_error)
    }

    pub fn remove_style(&mut self, style: &str) -> Result<(), JsError> {
        let key = style
            .parse::<StyleKey>()
            .map_err(|_| JsError::new(&format!("unknown style `{style}`")))?;
        self.inner.remove_inline_style(key).map_err(js_error)
    }

    pub fn is_format_active(&self, style: &str) -> bool {
        style
            .parse::<StyleKey>()
            .is_ok_and(|key| self.inner.is_format_active(key))
    }

    pub fn set_link(&mut self, url: &str) -> Result<(), JsError> {
        self.inner.set_link(url).map_err(js_error)
    }

    pub fn remove_links(&mut self) -> Result<(), JsError> {
        self.inner.remove_links().map_err(js_error)
    }

    /// `p`, `h1`…`h6`, `ul`, `ol`, `blockquote` or `accordion`.
    pub fn set_block_type(&mut self, block_type: &str) -> Result<(), JsError> {
        let block_type = parse_block_type(block_type)?;
        self.inner.set_block_type(block_type).map_err(js_error)
    }

    /// Returns the leaf index of the new block.
    pub fn insert_code_block(
        &mut self,
        language: Option<String>,
        no_highlight: bool,
    ) -> Result<u32, JsError> {
        let id = self
            .inner
            .insert_code_block(language.as_deref(), no_highlight)
            .map_err(js_error)?;
        Ok(leaf_of(&self.inner, id))
    }

    pub fn toggle_accordion(&mut self, leaf: u32) -> Result<bool, JsError> {
        let block = self.position(leaf, 0)?.block;
        self.inner.toggle_accordion(block).map_err(js_error)
    }

    pub fn insert_image(&mut self, url: &str) -> Result<(), JsError> {
        self.inner.insert_image(url).map_err(js_error)
    }

    /// `size` is `1` (small), `2` (medium) or `3` (large).
    pub fn insert_video(&mut self, url: &str, size: &str) -> Result<(), JsError> {
        self.inner
            .insert_video(url, VideoSize::from_choice(size))
            .map_err(js_error)
    }

    /// `upload(name, mimeType, bytes)` must return `{ success, url, error }`.
    pub fn upload_image(
        &mut self,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        upload: &Function,
    ) -> Result<(), JsError> {
        let file = FileUpload::new(UploadKind::Image, name, mime_type, bytes);
        self.inner
            .upload_image(&file, &JsUploads(upload))
            .map_err(js_error)
    }

    pub fn upload_video(
        &mut self,
        name: &str,
        mime_type: &str,
        bytes: Vec<u8>,
        upload: &Function,
    ) -> Result<(), JsError> {
        let file = FileUpload::new(UploadKind::Video, name, mime_type, bytes);
        self.inner
            .upload_video(&file, &JsUploads(upload))
            .map_err(js_error)
    }

    /// `{ html, text }` for the system clipboard.
    pub fn copy(&self) -> JsValue {
        payload_to_js(&self.inner.copy())
    }

    pub fn cut(&mut self) -> JsValue {
        payload_to_js(&self.inner.cut())
    }

    pub fn paste(&mut self, html: Option<String>, text: String) -> Result<(), JsError> {
        let payload = ClipboardPayload { html, text };
        self.inner.paste(&payload).map_err(js_error)
    }

    /// The browser split a code block on its own.
    pub fn platform_split(&mut self, leaf: u32, offset: u32) -> Result<(), JsError> {
        let at = self.position(leaf, offset)?;
        self.inner
            .apply_platform_mutation(PlatformMutation::SplitBlock { at })
            .map_err(js_error)
    }

    /// The browser put a `<br>` into a code block.
    pub fn platform_line_break(&mut self, leaf: u32, offset: u32) -> Result<(), JsError> {
        let at = self.position(leaf, offset)?;
        self.inner
            .apply_platform_mutation(PlatformMutation::InsertLineBreak { at })
            .map_err(js_error)
    }

    /// `save({ title, content })` must return `{ success, error }`.
    pub fn save_page(&self, title: &str, save: &Function) -> Result<(), JsError> {
        self.inner
            .save_page(title, &JsPersistence(save))
            .map_err(js_error)
    }
}

impl EditorModel {
    fn position(&self, leaf: u32, offset: u32) -> Result<Position, JsError> {
        let leaves = self.inner.document().leaves();
        let block = usize::try_from(leaf)
            .ok()
            .and_then(|i| leaves.get(i).copied())
            .ok_or_else(|| JsError::new(&format!("no leaf block at index {leaf}")))?;
        let offset = usize::try_from(offset).map_err(|e| JsError::new(&e.to_string()))?;
        Ok(Position::new(block, offset))
    }

    fn ordinal(&self, pos: Position) -> Vec<u32> {
        let leaf = leaf_of(&self.inner, pos.block);
        let offset = u32::try_from(pos.offset).unwrap_or(u32::MAX);
        vec![leaf, offset]
    }
}

fn leaf_of(editor: &Editor, block: memo_editor::BlockId) -> u32 {
    editor
        .document()
        .leaf_index(block)
        .and_then(|i| u32::try_from(i).ok())
        .unwrap_or(0)
}

fn js_error(e: EditError) -> JsError {
    JsError::new(&e.to_string())
}

fn style_attr(name: &str, value: Option<String>) -> Result<StyleAttr, JsError> {
    let key = name
        .parse::<StyleKey>()
        .map_err(|_| JsError::new(&format!("unknown style `{name}`")))?;
    Ok(match (key, value) {
        (StyleKey::Bold, _) => StyleAttr::Bold,
        (StyleKey::Italic, _) => StyleAttr::Italic,
        (StyleKey::Underline, _) => StyleAttr::Underline,
        (StyleKey::Strike, _) => StyleAttr::Strike,
        (StyleKey::Code, _) => StyleAttr::Code,
        (StyleKey::Color, Some(v)) => StyleAttr::Color(v),
        (StyleKey::Background, Some(v)) => StyleAttr::Background(v),
        (StyleKey::FontSize, Some(v)) => StyleAttr::FontSize(v),
        (StyleKey::Link, Some(v)) => StyleAttr::Link(v),
        (_, None) => return Err(JsError::new(&format!("style `{name}` needs a value"))),
    })
}

fn parse_block_type(name: &str) -> Result<BlockType, JsError> {
    Ok(match name {
        "p" => BlockType::Paragraph,
        "ul" => BlockType::ListItem(ListType::Unordered),
        "ol" => BlockType::ListItem(ListType::Ordered),
        "blockquote" => BlockType::Quote,
        "accordion" => BlockType::Accordion,
        _ => {
            let level = name
                .strip_prefix('h')
                .and_then(|l| l.parse::<u8>().ok())
                .filter(|l| (1..=6).contains(l))
                .ok_or_else(|| JsError::new(&format!("unknown block type `{name}`")))?;
            BlockType::Heading(HeadingLevel::new(level))
        }
    })
}

fn payload_to_js(payload: &ClipboardPayload) -> JsValue {
    let obj = Object::new();
    let html = payload
        .html
        .as_deref()
        .map(JsValue::from_str)
        .unwrap_or(JsValue::NULL);
    let _ = Reflect::set(&obj, &"html".into(), &html);
    let _ = Reflect::set(&obj, &"text".into(), &JsValue::from_str(&payload.text));
    obj.into()
}

fn field(obj: &JsValue, name: &str) -> JsValue {
    Reflect::get(obj, &JsValue::from_str(name)).unwrap_or(JsValue::UNDEFINED)
}

fn thrown(e: JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{e:?}"))
}

struct JsHighlighter(Function);

impl Highlighter for JsHighlighter {
    fn highlight(
        &self,
        text: &str,
        language: Option<&str>,
    ) -> Result<Highlighted, HighlightError> {
        let language_arg = language.map(JsValue::from_str).unwrap_or(JsValue::NULL);
        let result = self
            .0
            .call2(&JsValue::NULL, &JsValue::from_str(text), &language_arg)
            .map_err(|e| HighlightError::Failed(thrown(e)))?;
        let html = field(&result, "html")
            .as_string()
            .ok_or_else(|| HighlightError::Failed("highlighter returned no html".into()))?;
        Ok(Highlighted {
            html,
            language: field(&result, "language")
                .as_string()
                .or_else(|| language.map(str::to_owned)),
        })
    }
}

struct JsUploads<'a>(&'a Function);

impl UploadEndpoint for JsUploads<'_> {
    fn upload(&self, file: &FileUpload) -> UploadResponse {
        let bytes = Uint8Array::from(file.bytes.as_slice());
        let result = self.0.call3(
            &JsValue::NULL,
            &JsValue::from_str(&file.name),
            &JsValue::from_str(&file.mime_type),
            &bytes,
        );
        match result {
            Ok(response) => UploadResponse {
                success: field(&response, "success").as_bool().unwrap_or(false),
                url: field(&response, "url").as_string(),
                error: field(&response, "error").as_string(),
            },
            Err(e) => UploadResponse::failed(thrown(e)),
        }
    }
}

struct JsPersistence<'a>(&'a Function);

impl PagePersistence for JsPersistence<'_> {
    fn save(&self, draft: &PageDraft) -> SaveResponse {
        let obj = Object::new();
        let _ = Reflect::set(&obj, &"title".into(), &JsValue::from_str(&draft.title));
        let _ = Reflect::set(&obj, &"content".into(), &JsValue::from_str(&draft.content));
        match self.0.call1(&JsValue::NULL, &obj) {
            Ok(response) => SaveResponse {
                success: field(&response, "success").as_bool().unwrap_or(false),
                error: field(&response, "error").as_string(),
            },
            Err(e) => SaveResponse::failed(thrown(e)),
        }
    }
}
