//! Speaker-to-voice resolution.
//!
//! [`resolve`] maps a dialogue line's `speaker_ref` onto exactly one
//! [`VoiceSource`]. Precedence, first match wins:
//!
//! 1. registry voice id
//! 2. character with the clone sentinel and a reference URL
//! 3. character with a concrete voice id
//! 4. fallback voice
//!
//! Resolution is total: an unknown reference degrades to the fallback voice
//! instead of blocking generation.

use serde::{Deserialize, Serialize};

/// Voice id stored on a character whose voice is a cloned reference clip.
pub const CLONE_SENTINEL: &str = "cloned";

/// Voice used when nothing else matches.
pub const DEFAULT_VOICE_ID: &str = "narrator-default";

/// A reusable character from the asset library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    /// Registry voice id, [`CLONE_SENTINEL`], or absent.
    pub voice_id: Option<String>,
    /// Reference clip used when `voice_id` is the clone sentinel.
    pub voice_ref_url: Option<String>,
}

/// A stock voice offered by the text-to-speech registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryVoice {
    pub id: String,
    pub name: String,
    /// Short sample of the voice, used as a conversion target.
    pub sample_url: Option<String>,
}

/// Characters and registry voices available to the resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceLibrary {
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub voices: Vec<RegistryVoice>,
}

/// The concrete voice a line is synthesized with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoiceSource {
    RegistryVoice { id: String },
    ClonedAudio { url: String },
    CharacterAssignedVoice { voice_id: String },
    Fallback { voice_id: String },
}

impl VoiceSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    /// Registry voice id behind this source, if it has one.
    pub fn registry_id(&self) -> Option<&str> {
        match self {
            Self::RegistryVoice { id } => Some(id),
            Self::CharacterAssignedVoice { voice_id } | Self::Fallback { voice_id } => {
                Some(voice_id)
            }
            Self::ClonedAudio { .. } => None,
        }
    }
}

/// Resolve a speaker reference against the library.
pub fn resolve(speaker_ref: &str, characters: &[Character], voices: &[RegistryVoice]) -> VoiceSource {
    if voices.iter().any(|v| v.id == speaker_ref) {
        return VoiceSource::RegistryVoice {
            id: speaker_ref.to_string(),
        };
    }

    if let Some(character) = characters.iter().find(|c| c.id == speaker_ref) {
        let voice_id = character.voice_id.as_deref().map(str::trim).unwrap_or("");
        let ref_url = character
            .voice_ref_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty());

        if voice_id == CLONE_SENTINEL {
            if let Some(url) = ref_url {
                return VoiceSource::ClonedAudio {
                    url: url.to_string(),
                };
            }
        } else if !voice_id.is_empty() {
            return VoiceSource::CharacterAssignedVoice {
                voice_id: voice_id.to_string(),
            };
        }
    }

    VoiceSource::Fallback {
        voice_id: DEFAULT_VOICE_ID.to_string(),
    }
}

impl VoiceLibrary {
    pub fn resolve(&self, speaker_ref: &str) -> VoiceSource {
        resolve(speaker_ref, &self.characters, &self.voices)
    }

    /// Reference audio to convert towards for a resolved source.
    ///
    /// Cloned voices use their reference clip; registry-backed voices use
    /// the registry sample. The fallback voice has no target.
    pub fn conversion_target(&self, source: &VoiceSource) -> Option<String> {
        match source {
            VoiceSource::ClonedAudio { url } => Some(url.clone()),
            VoiceSource::RegistryVoice { id }
            | VoiceSource::CharacterAssignedVoice { voice_id: id } => self
                .voices
                .iter()
                .find(|v| &v.id == id)
                .and_then(|v| v.sample_url.clone()),
            VoiceSource::Fallback { .. } => None,
        }
    }
}
