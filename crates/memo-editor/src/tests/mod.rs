// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Editing scenarios that cross several modules.


mod test_clipboard;
mod test_code_blocks;
mod test_editing;
mod test_history;
