//! HTTP clients for the external generation services.
//!
//! Wraps the text-to-speech, voice conversion and video rendering endpoints
//! using [`reqwest`]. Request bodies are sanitized before sending; responses
//! are decoded into typed structs except for rendering, whose shape varies
//! by provider version and is returned as raw JSON.

pub mod audio;
pub mod conversion;
pub mod http;
pub mod render;
pub mod tts;

pub use http::ProviderError;
