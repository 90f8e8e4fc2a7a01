//! Domain types and pure rules for the shot studio.
//!
//! Everything in this crate is synchronous and side-effect free: the shot
//! model and its status state machine, payload sanitizing, voice
//! resolution, duration/frame arithmetic and media-reference extraction.
//! The orchestration engine lives in `storyshot-pipeline`.

pub mod clip_status;
pub mod error;
pub mod media;
pub mod sanitize;
pub mod shot;
pub mod timing;
pub mod types;
pub mod voice;
