// Copyright 2024 New Vector Ltd.
// Copyright 2022 The Matrix.org Foundation C.I.C.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE in the repository root for full details.

use std::time::Duration;

/// Timing constants, history capacity and upload limits.
///
/// None of the delays are load-bearing invariants; hosts may tune them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditorConfig {
    /// Idle time after the last keystroke in a code block before it is
    /// re-highlighted.
    pub highlight_debounce: Duration,
    /// Delay between a selection change and the code-block exit check.
    pub exit_debounce: Duration,
    /// Trailing delay of the inline markdown scan.
    pub inline_scan_delay: Duration,
    /// Trailing delay of the URL auto-linker.
    pub auto_link_delay: Duration,
    /// Delay of the full re-highlight pass scheduled by the change feed.
    pub rehighlight_delay: Duration,
    /// Time after which a held subsystem gate is force-released.
    pub gate_fallback: Duration,
    /// Time a programmatically inserted code block stays locked.
    pub code_insert_settle: Duration,
    pub history_capacity: usize,
    pub max_image_bytes: u64,
    pub max_video_bytes: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            highlight_debounce: Duration::from_millis(1200),
            exit_debounce: Duration::from_millis(100),
            inline_scan_delay: Duration::from_millis(100),
            auto_link_delay: Duration::from_millis(500),
            rehighlight_delay: Duration::from_millis(200),
            gate_fallback: Duration::from_millis(500),
            code_insert_settle: Duration::from_millis(300),
            history_capacity: 50,
            max_image_bytes: 5 * 1024 * 1024,
            max_video_bytes: 250 * 1024 * 1024,
        }
    }
}

impl EditorConfig {
    pub fn with_highlight_debounce(mut self, delay: Duration) -> Self {
        self.highlight_debounce = delay;
        self
    }

    pub fn with_exit_debounce(mut self, delay: Duration) -> Self {
        self.exit_debounce = delay;
        self
    }

    pub fn with_inline_scan_delay(mut self, delay: Duration) -> Self {
        self.inline_scan_delay = delay;
        self
    }

    pub fn with_auto_link_delay(mut self, delay: Duration) -> Self {
        self.auto_link_delay = delay;
        self
    }

    pub fn with_history_capacity(mut self, capacity: usize) -> Self {
        self.history_capacity = capacity.max(1);
        self
    }

    pub fn with_upload_limits(mut self, image: u64, video: u64) -> Self {
        self.max_image_bytes = image;
        self.max_video_bytes = video;
        self
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_match_the_documented_timings() {
        let config = EditorConfig::default();
        assert_eq!(config.highlight_debounce, Duration::from_millis(1200));
        assert_eq!(config.exit_debounce, Duration::from_millis(100));
        assert_eq!(config.history_capacity, 50);
        assert_eq!(config.max_image_bytes, 5_242_880);
    }

    #[test]
    fn history_capacity_is_never_zero() {
        let config = EditorConfig::default().with_history_capacity(0);
        assert_eq!(config.history_capacity, 1);
    }
}
