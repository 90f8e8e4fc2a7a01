//! Audio references on the wire: URLs and inline base64 payloads.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Audio handed to a provider: either a fetchable URL or raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioInput {
    Url(String),
    Inline { bytes: Vec<u8>, mime: String },
}

impl AudioInput {
    /// String form sent to providers: the URL, or a `data:` URI.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Inline { bytes, mime } => data_uri(mime, bytes),
        }
    }
}

/// Encode bytes as a `data:<mime>;base64,...` URI.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// MIME type for an audio format name such as `"wav"` or `"mp3"`.
pub fn audio_mime(format: Option<&str>) -> &'static str {
    match format.map(|f| f.trim().to_ascii_lowercase()).as_deref() {
        Some("mp3") | Some("mpeg") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        Some("m4a") | Some("aac") => "audio/aac",
        _ => "audio/wav",
    }
}

/// Turn a provider's audio output into a playable reference.
///
/// A URL is used as-is. Inline base64 is wrapped into a data URI without
/// decoding, so no second round trip is needed. Payloads that already carry
/// a `data:` prefix are passed through.
pub fn materialize(url: Option<&str>, base64: Option<&str>, format: Option<&str>) -> Option<String> {
    if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
        return Some(url.to_string());
    }
    let encoded = base64.map(str::trim).filter(|b| !b.is_empty())?;
    if encoded.starts_with("data:") {
        return Some(encoded.to_string());
    }
    Some(format!("data:{};base64,{encoded}", audio_mime(format)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_input_is_sent_verbatim() {
        assert_eq!(AudioInput::Url("https://x/a.wav".into()).to_wire(), "https://x/a.wav");
    }

    #[test]
    fn inline_input_becomes_data_uri() {
        let input = AudioInput::Inline {
            bytes: b"RIFF".to_vec(),
            mime: "audio/wav".into(),
        };
        assert_eq!(input.to_wire(), "data:audio/wav;base64,UklGRg==");
    }

    #[test]
    fn materialize_prefers_url() {
        assert_eq!(
            materialize(Some("https://x/o.wav"), Some("AAAA"), None),
            Some("https://x/o.wav".into())
        );
    }

    #[test]
    fn materialize_wraps_inline_audio() {
        assert_eq!(
            materialize(None, Some("AAAA"), Some("mp3")),
            Some("data:audio/mpeg;base64,AAAA".into())
        );
        assert_eq!(
            materialize(Some(" "), Some("data:audio/ogg;base64,BBBB"), None),
            Some("data:audio/ogg;base64,BBBB".into())
        );
    }

    #[test]
    fn materialize_nothing_is_none() {
        assert_eq!(materialize(None, Some(""), None), None);
    }
}
