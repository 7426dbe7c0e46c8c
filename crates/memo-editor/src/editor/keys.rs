// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Keyboard shortcuts.

use strum_macros::{AsRefStr, Display};

use super::Editor;
use crate::dom::inline::StyleAttr;

const RED: &str = "#ff0000";
const BLUE: &str = "#0000ff";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };

    /// Ctrl, or Cmd on macOS.
    pub fn primary(&self) -> bool {
        self.ctrl || self.meta
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Tab,
    Escape,
}

impl Key {
    /// Maps a DOM `KeyboardEvent.key` value.
    pub fn from_dom(key: &str) -> Option<Self> {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Some(Self::Char(c)),
            _ => match key {
                "Enter" => Some(Self::Enter),
                "Backspace" => Some(Self::Backspace),
                "Delete" => Some(Self::Delete),
                "Tab" => Some(Self::Tab),
                "Escape" => Some(Self::Escape),
                _ => None,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyCombo {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyCombo {
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// `c` with Ctrl held.
    pub fn primary(c: char) -> Self {
        Self::new(
            Key::Char(c),
            Modifiers {
                ctrl: true,
                ..Modifiers::NONE
            },
        )
    }

    /// `c` with Ctrl and Shift held.
    pub fn primary_shift(c: char) -> Self {
        Self::new(
            Key::Char(c),
            Modifiers {
                ctrl: true,
                shift: true,
                ..Modifiers::NONE
            },
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum Shortcut {
    Undo,
    Redo,
    Bold,
    Italic,
    Underline,
    Strike,
    InlineCode,
    Link,
    RedText,
    BlueText,
}

impl Shortcut {
    pub fn for_combo(combo: KeyCombo) -> Option<Self> {
        let mods = combo.modifiers;
        if !mods.primary() || mods.alt {
            return None;
        }
        let Key::Char(c) = combo.key else {
            return None;
        };
        Some(match (c.to_ascii_lowercase(), mods.shift) {
            ('z', false) => Self::Undo,
            ('z', true) | ('y', false) => Self::Redo,
            ('b', false) => Self::Bold,
            ('i', false) => Self::Italic,
            ('u', false) => Self::Underline,
            ('x', true) => Self::Strike,
            ('e', false) => Self::InlineCode,
            ('k', false) => Self::Link,
            // Shifted punctuation arrives either way depending on layout.
            (';' | ':', true) => Self::RedText,
            ('\'' | '"', true) => Self::BlueText,
            _ => return None,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    /// The host should ask for a URL and pass it to [`Editor::set_link`].
    RequestLink { selected_text: String },
    /// Not a shortcut; the platform default applies.
    Unhandled,
}

impl Editor {
    pub fn handle_key(&mut self, combo: KeyCombo) -> KeyOutcome {
        let Some(shortcut) = Shortcut::for_combo(combo) else {
            return KeyOutcome::Unhandled;
        };
        tracing::debug!(target: "memo_editor::command", %shortcut, "shortcut");
        let result = match shortcut {
            Shortcut::Undo => {
                self.undo();
                Ok(())
            }
            Shortcut::Redo => {
                self.redo();
                Ok(())
            }
            Shortcut::Bold => self.toggle_format(StyleAttr::Bold),
            Shortcut::Italic => self.toggle_format(StyleAttr::Italic),
            Shortcut::Underline => self.toggle_format(StyleAttr::Underline),
            Shortcut::Strike => self.toggle_format(StyleAttr::Strike),
            Shortcut::InlineCode => self.toggle_format(StyleAttr::Code),
            Shortcut::Link => {
                return KeyOutcome::RequestLink {
                    selected_text: self.selected_text(),
                }
            }
            Shortcut::RedText => self.toggle_format(StyleAttr::Color(RED.into())),
            Shortcut::BlueText => self.toggle_format(StyleAttr::Color(BLUE.into())),
        };
        if let Err(e) = result {
            tracing::debug!(
                target: "memo_editor::command",
                %shortcut,
                error = %e,
                "shortcut refused"
            );
        }
        KeyOutcome::Handled
    }
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;
    use crate::tests::testutils_editor::{editor_with, select, type_text};

    #[test]
    fn combos_map_to_shortcuts() {
        assert_eq!(Shortcut::for_combo(KeyCombo::primary('z')), Some(Shortcut::Undo));
        assert_eq!(Shortcut::for_combo(KeyCombo::primary_shift('Z')), Some(Shortcut::Redo));
        assert_eq!(Shortcut::for_combo(KeyCombo::primary('y')), Some(Shortcut::Redo));
        assert_eq!(Shortcut::for_combo(KeyCombo::primary_shift('X')), Some(Shortcut::Strike));
        assert_eq!(Shortcut::for_combo(KeyCombo::primary_shift(':')), Some(Shortcut::RedText));
        assert_eq!(Shortcut::for_combo(KeyCombo::primary_shift('"')), Some(Shortcut::BlueText));
        let cmd_b = KeyCombo::new(
            Key::Char('b'),
            Modifiers {
                meta: true,
                ..Modifiers::NONE
            },
        );
        assert_eq!(Shortcut::for_combo(cmd_b), Some(Shortcut::Bold));
    }

    #[test]
    fn plain_keys_are_not_shortcuts() {
        let b = KeyCombo::new(Key::Char('b'), Modifiers::NONE);
        assert_that!(Shortcut::for_combo(b)).is_none();
        let alt = KeyCombo::new(
            Key::Char('b'),
            Modifiers {
                ctrl: true,
                alt: true,
                ..Modifiers::NONE
            },
        );
        assert_that!(Shortcut::for_combo(alt)).is_none();
        assert_that!(Shortcut::for_combo(KeyCombo::primary_shift('b'))).is_none();
    }

    #[test]
    fn dom_keys_are_mapped() {
        assert_eq!(Key::from_dom("k"), Some(Key::Char('k')));
        assert_eq!(Key::from_dom("Enter"), Some(Key::Enter));
        assert_eq!(Key::from_dom("ArrowLeft"), None);
    }

    #[test]
    fn ctrl_b_bolds_the_selection() {
        let mut editor = editor_with("<p>abc</p>");
        select(&mut editor, 0, 0, 0, 3);
        assert_eq!(editor.handle_key(KeyCombo::primary('b')), KeyOutcome::Handled);
        assert_eq!(editor.get_content(), "<p><strong>abc</strong></p>");
    }

    #[test]
    fn colour_shortcuts_toggle() {
        let mut editor = editor_with("<p>abc</p>");
        select(&mut editor, 0, 0, 0, 3);
        editor.handle_key(KeyCombo::primary_shift(';'));
        assert_eq!(
            editor.get_content(),
            r#"<p><span style="color: #ff0000;">abc</span></p>"#
        );
        editor.handle_key(KeyCombo::primary_shift(';'));
        assert_eq!(editor.get_content(), "<p>abc</p>");
    }

    #[test]
    fn ctrl_k_asks_for_a_url() {
        let mut editor = editor_with("<p>see docs</p>");
        select(&mut editor, 0, 4, 0, 8);
        assert_eq!(
            editor.handle_key(KeyCombo::primary('k')),
            KeyOutcome::RequestLink {
                selected_text: "docs".into()
            }
        );
    }

    #[test]
    fn ctrl_z_undoes_typing() {
        let mut editor = editor_with("<p>a</p>");
        select(&mut editor, 0, 1, 0, 1);
        type_text(&mut editor, "b");
        editor.handle_key(KeyCombo::primary('z'));
        assert_eq!(editor.get_content(), "<p>a</p>");
        editor.handle_key(KeyCombo::primary_shift('z'));
        assert_eq!(editor.get_content(), "<p>ab</p>");
    }
}
