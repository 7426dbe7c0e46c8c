// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Services the editor calls out to. The engine never talks to the network
//! itself; hosts implement these traits over whatever transport they use.

use strum_macros::{AsRefStr, Display};

/// What kind of file is being uploaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum UploadKind {
    Image,
    Video,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileUpload {
    pub name: String,
    pub mime_type: String,
    pub kind: UploadKind,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(
        kind: UploadKind,
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            kind,
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// `{success, url, error}` as the upload endpoint reports it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UploadResponse {
    pub success: bool,
    pub url: Option<String>,
    pub error: Option<String>,
}

impl UploadResponse {
    pub fn ok(url: impl Into<String>) -> Self {
        Self {
            success: true,
            url: Some(url.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            url: None,
            error: Some(error.into()),
        }
    }
}

pub trait UploadEndpoint {
    fn upload(&self, file: &FileUpload) -> UploadResponse;
}

/// The page as it is sent for saving.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageDraft {
    pub title: String,
    pub content: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveResponse {
    pub success: bool,
    pub error: Option<String>,
}

impl SaveResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

pub trait PagePersistence {
    fn save(&self, draft: &PageDraft) -> SaveResponse;
}
