//! Media reference extraction from heterogeneous provider responses.
//!
//! Providers nest their output under different keys across versions. A
//! [`MediaExtractor`] holds an ordered list of [`ExtractionStrategy`]s; each
//! returns `Option<String>` and the first hit wins.

use serde_json::Value;

/// Kind of media a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Image,
    Audio,
}

impl MediaKind {
    /// File suffixes recognized for this kind (lowercase, with dot).
    pub fn suffixes(&self) -> &'static [&'static str] {
        match self {
            Self::Video => &[".mp4", ".webm", ".mov", ".m4v", ".gif"],
            Self::Image => &[".png", ".jpg", ".jpeg", ".webp"],
            Self::Audio => &[".wav", ".mp3", ".ogg", ".flac", ".m4a", ".aac"],
        }
    }

    /// Data URI prefix recognized for this kind.
    pub fn data_uri_prefix(&self) -> &'static str {
        match self {
            Self::Video => "data:video/",
            Self::Image => "data:image/",
            Self::Audio => "data:audio/",
        }
    }

    /// Whether `candidate` looks like a reference to this kind of media.
    ///
    /// Query strings and fragments are ignored when checking the suffix.
    pub fn matches(&self, candidate: &str) -> bool {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return false;
        }
        if candidate.starts_with(self.data_uri_prefix()) {
            return true;
        }
        let path = candidate
            .split(['?', '#'])
            .next()
            .unwrap_or(candidate)
            .to_ascii_lowercase();
        self.suffixes().iter().any(|s| path.ends_with(s))
    }
}

/// One way of locating a media reference inside a response.
#[derive(Debug, Clone)]
pub enum ExtractionStrategy {
    /// Check JSON pointers in order; the first non-empty string wins.
    KeyPaths(&'static [&'static str]),
    /// Depth-first search for any string matching the media kind.
    ///
    /// Object keys are visited in the map's iteration order (sorted, with
    /// the default `serde_json` map) and array items in index order, so the
    /// result is stable for a given response.
    SuffixSearch(MediaKind),
}

impl ExtractionStrategy {
    pub fn apply(&self, value: &Value) -> Option<String> {
        match self {
            Self::KeyPaths(paths) => paths.iter().find_map(|p| {
                value
                    .pointer(p)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            }),
            Self::SuffixSearch(kind) => deep_search(value, *kind),
        }
    }
}

fn deep_search(value: &Value, kind: MediaKind) -> Option<String> {
    match value {
        Value::String(s) if kind.matches(s) => Some(s.trim().to_string()),
        Value::Array(items) => items.iter().find_map(|v| deep_search(v, kind)),
        Value::Object(map) => map.values().find_map(|v| deep_search(v, kind)),
        _ => None,
    }
}

/// Ordered strategy list for one kind of media.
#[derive(Debug, Clone)]
pub struct MediaExtractor {
    strategies: Vec<ExtractionStrategy>,
}

/// Priority keys for rendered video, newest provider layout first.
pub const VIDEO_KEY_PATHS: &[&str] = &[
    "/video_url",
    "/video",
    "/output/video_url",
    "/output/video",
    "/data/video_url",
    "/result/video_url",
    "/url",
];

/// Priority keys for the last-frame still.
pub const LAST_FRAME_KEY_PATHS: &[&str] = &[
    "/last_frame_url",
    "/last_frame",
    "/output/last_frame_url",
    "/output/last_frame",
    "/data/last_frame_url",
];

impl MediaExtractor {
    pub fn new(strategies: Vec<ExtractionStrategy>) -> Self {
        Self { strategies }
    }

    /// Prioritized video keys, then a deep suffix search.
    pub fn video() -> Self {
        Self::new(vec![
            ExtractionStrategy::KeyPaths(VIDEO_KEY_PATHS),
            ExtractionStrategy::SuffixSearch(MediaKind::Video),
        ])
    }

    /// Last-frame keys only. A deep image search would also pick up the
    /// keyframe that some providers echo back.
    pub fn last_frame() -> Self {
        Self::new(vec![ExtractionStrategy::KeyPaths(LAST_FRAME_KEY_PATHS)])
    }

    pub fn extract(&self, value: &Value) -> Option<String> {
        self.strategies.iter().find_map(|s| s.apply(value))
    }
}
