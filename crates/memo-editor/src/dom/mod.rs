// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

pub mod block;
pub mod code_block;
pub mod document;
pub mod inline;
pub mod parser;
pub mod position;
pub(crate) mod style;
pub mod to_html;
pub mod to_tree;
