// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

//! Images, videos and the uploads behind them.

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::Editor;
use crate::collaborators::{FileUpload, UploadEndpoint, UploadKind};
use crate::command::{Command, Origin};
use crate::dom::block::{Media, MediaKind};
use crate::error::EditError;

const IMAGE_STYLE: &str = "max-width: 100%; height: auto;";
const IFRAME_ALLOW: &str = "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture; web-share";

static YOUTUBE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#,
    )
    .expect("valid regex")
});

static VIMEO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"vimeo\.com/(\d+)").expect("valid regex"));

/// Preset sizes offered when embedding a video.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum VideoSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl VideoSize {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Small => (420, 236),
            Self::Medium => (560, 315),
            Self::Large => (840, 472),
        }
    }

    /// The size behind a `1`/`2`/`3` choice; anything else is medium.
    pub fn from_choice(choice: &str) -> Self {
        match choice.trim() {
            "1" => Self::Small,
            "3" => Self::Large,
            _ => Self::Medium,
        }
    }
}

/// The embeddable player URL for a YouTube or Vimeo link. Other URLs are
/// returned unchanged.
pub fn video_embed_url(url: &str) -> String {
    if let Some(id) = YOUTUBE.captures(url).and_then(|c| c.get(1)) {
        let share = Url::parse(url).ok().and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "si")
                .map(|(_, v)| v.into_owned())
        });
        return match share {
            Some(si) => format!("https://www.youtube.com/embed/{}?si={si}", id.as_str()),
            None => format!("https://www.youtube.com/embed/{}", id.as_str()),
        };
    }
    if let Some(id) = VIMEO.captures(url).and_then(|c| c.get(1)) {
        return format!("https://player.vimeo.com/video/{}", id.as_str());
    }
    url.to_owned()
}

fn video_iframe(url: &str, size: VideoSize) -> Media {
    let (width, height) = size.dimensions();
    Media::new(MediaKind::Iframe, video_embed_url(url))
        .with_attr("width", width.to_string())
        .with_attr("height", height.to_string())
        .with_attr("frameborder", "0")
        .with_attr("allow", IFRAME_ALLOW)
        .with_attr("allowfullscreen", "")
        .with_attr(
            "style",
            format!("border: none; max-width: 100%; height: auto; aspect-ratio: {width} / {height};"),
        )
}

impl Editor {
    pub fn insert_image(&mut self, url: &str) -> Result<(), EditError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(EditError::invalid("image url is empty"));
        }
        self.insert_media(Media::image(url).with_attr("style", IMAGE_STYLE))
    }

    /// Embeds a YouTube, Vimeo or other video page as a player iframe.
    pub fn insert_video(&mut self, url: &str, size: VideoSize) -> Result<(), EditError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(EditError::invalid("video url is empty"));
        }
        self.insert_media(video_iframe(url, size))
    }

    pub fn upload_image(
        &mut self,
        file: &FileUpload,
        endpoint: &dyn UploadEndpoint,
    ) -> Result<(), EditError> {
        let url = self.upload(file, UploadKind::Image, endpoint)?;
        self.insert_media(Media::image(url).with_attr("style", IMAGE_STYLE))
    }

    /// Uploads a video file and embeds it as a `<video>` with controls.
    pub fn upload_video(
        &mut self,
        file: &FileUpload,
        endpoint: &dyn UploadEndpoint,
    ) -> Result<(), EditError> {
        let url = self.upload(file, UploadKind::Video, endpoint)?;
        let (width, height) = VideoSize::default().dimensions();
        let video = Media::new(MediaKind::Video, url)
            .with_attr("controls", "")
            .with_attr("width", width.to_string())
            .with_attr("height", height.to_string())
            .with_attr("style", IMAGE_STYLE);
        self.insert_media(video)
    }

    fn upload(
        &self,
        file: &FileUpload,
        kind: UploadKind,
        endpoint: &dyn UploadEndpoint,
    ) -> Result<String, EditError> {
        let limit = match kind {
            UploadKind::Image => self.config.max_image_bytes,
            UploadKind::Video => self.config.max_video_bytes,
        };
        if file.kind != kind {
            return Err(EditError::UploadFailed(format!(
                "expected a {kind} file, got a {}",
                file.kind
            )));
        }
        if file.size() > limit {
            return Err(EditError::UploadFailed(format!(
                "{} is {} bytes, over the {limit} byte {kind} limit",
                file.name,
                file.size()
            )));
        }
        let response = endpoint.upload(file);
        match response.url {
            Some(url) if response.success => {
                tracing::info!(target: "memo_editor::command", %kind, name = %file.name, "uploaded");
                Ok(url)
            }
            _ => {
                let error = response.error.unwrap_or_else(|| "unknown error".into());
                tracing::warn!(target: "memo_editor::command", %kind, %error, "upload failed");
                Err(EditError::UploadFailed(error))
            }
        }
    }

    fn insert_media(&mut self, embed: Media) -> Result<(), EditError> {
        let range = self.selection_range();
        self.save_state_to_history();
        self.transact(Origin::Programmatic, |tx| {
            let at = super::input::collapse(tx, range)?;
            tx.apply(Command::InsertEmbed { at, embed }).map(Some)
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use speculoos::prelude::*;

    use super::*;
    use crate::collaborators::UploadResponse;
    use crate::config::EditorConfig;
    use crate::tests::testutils_editor::{caret_at, editor_with};

    struct FixedEndpoint(UploadResponse);

    impl UploadEndpoint for FixedEndpoint {
        fn upload(&self, _file: &FileUpload) -> UploadResponse {
            self.0.clone()
        }
    }

    fn image_file(bytes: usize) -> FileUpload {
        FileUpload::new(UploadKind::Image, "cat.png", "image/png", vec![0; bytes])
    }

    #[test]
    fn youtube_links_become_embed_urls() {
        assert_eq!(
            video_embed_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"),
            "https://www.youtube.com/embed/dQw4w9WgXcQ"
        );
        assert_eq!(
            video_embed_url("https://youtu.be/dQw4w9WgXcQ?si=abc123"),
            "https://www.youtube.com/embed/dQw4w9WgXcQ?si=abc123"
        );
    }

    #[test]
    fn vimeo_and_other_links() {
        assert_eq!(
            video_embed_url("https://vimeo.com/76979871"),
            "https://player.vimeo.com/video/76979871"
        );
        assert_eq!(
            video_embed_url("https://example.org/clip.mp4"),
            "https://example.org/clip.mp4"
        );
    }

    #[test]
    fn size_choices() {
        assert_eq!(VideoSize::from_choice("1").dimensions(), (420, 236));
        assert_eq!(VideoSize::from_choice("3").dimensions(), (840, 472));
        assert_eq!(VideoSize::from_choice("x"), VideoSize::Medium);
    }

    #[test]
    fn images_are_inserted_at_the_caret() {
        let mut editor = editor_with("<p>abcd</p>");
        caret_at(&mut editor, 0, 2);
        editor.insert_image("x.png").unwrap();
        assert_eq!(
            editor.get_content(),
            r#"<p>ab</p><img src="x.png" style="max-width: 100%; height: auto;"><p>cd</p>"#
        );
        assert_that!(editor.can_undo()).is_true();
    }

    #[test]
    fn videos_are_embedded_as_iframes() {
        let mut editor = editor_with("<p><br></p>");
        editor
            .insert_video("https://vimeo.com/1234", VideoSize::Small)
            .unwrap();
        let html = editor.get_content();
        assert_that!(html.as_str()).contains(
            r#"<iframe src="https://player.vimeo.com/video/1234" width="420" height="236""#,
        );
        assert_that!(html.as_str()).contains("aspect-ratio: 420 / 236;");
    }

    #[test]
    fn uploads_insert_the_returned_url() {
        let mut editor = editor_with("<p><br></p>");
        let endpoint = FixedEndpoint(UploadResponse::ok("/media/cat.png"));
        editor.upload_image(&image_file(10), &endpoint).unwrap();
        assert_that!(editor.get_content().as_str()).contains(r#"<img src="/media/cat.png""#);
    }

    #[test]
    fn oversized_uploads_never_reach_the_endpoint() {
        let mut editor = editor_with("<p><br></p>");
        editor.config = EditorConfig::default().with_upload_limits(4, 4);
        let endpoint = FixedEndpoint(UploadResponse::ok("/never"));
        let result = editor.upload_image(&image_file(5), &endpoint);
        assert!(matches!(result, Err(EditError::UploadFailed(_))));
        assert_eq!(editor.get_content(), "<p><br></p>");
    }

    #[test]
    fn endpoint_failures_are_reported() {
        let mut editor = editor_with("<p><br></p>");
        let result = editor.upload_image(
            &image_file(1),
            &FixedEndpoint(UploadResponse::failed("disk full")),
        );
        assert_eq!(result, Err(EditError::UploadFailed("disk full".into())));
        let result = editor.upload_image(&image_file(1), &FixedEndpoint(UploadResponse::default()));
        assert_eq!(result, Err(EditError::UploadFailed("unknown error".into())));
    }
}
