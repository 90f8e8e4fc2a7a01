//! Duration, frame-count and prompt-length rules for rendering.

use crate::shot::Shot;

/// Frame rate every renderer is driven at.
pub const FRAME_RATE: u32 = 30;

/// Duration used for a new shot before any audio is synthesized.
pub const DEFAULT_MANUAL_DURATION_SECS: f64 = 5.0;

/// Character budget for the render prompt. The renderer enforces a token
/// budget server-side; capping here keeps what we store equal to what was
/// rendered.
pub const MAX_RENDER_PROMPT_CHARS: usize = 800;

/// Float noise tolerated before rounding a frame count up.
const FRAME_EPSILON: f64 = 1e-6;

/// Effective clip duration in seconds.
///
/// Audio-locked shots use the synthesized duration plus the start delay;
/// otherwise the manual duration applies on its own.
pub fn effective_duration_secs(shot: &Shot) -> f64 {
    match (shot.is_audio_locked(), shot.total_audio_duration_seconds) {
        (true, Some(audio)) => audio + shot.start_delay_seconds,
        _ => shot.manual_duration_seconds,
    }
}

/// Convert seconds to frames, rounding up so audio is never cut off.
///
/// Always returns at least one frame.
pub fn frames_for_duration(duration_secs: f64, fps: u32) -> u32 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return 1;
    }
    let raw = duration_secs * f64::from(fps);
    let frames = (raw - FRAME_EPSILON).ceil();
    (frames as u32).max(1)
}

/// Frame count for a shot at [`FRAME_RATE`].
pub fn frame_count(shot: &Shot) -> u32 {
    frames_for_duration(effective_duration_secs(shot), FRAME_RATE)
}

/// Truncate a prompt to at most `max_chars` characters.
///
/// Cuts on a char boundary and trims trailing whitespace left by the cut.
pub fn cap_prompt(prompt: &str, max_chars: usize) -> String {
    let trimmed = prompt.trim();
    match trimmed.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => trimmed[..byte_idx].trim_end().to_string(),
        None => trimmed.to_string(),
    }
}

/// Total duration of the dialogue audio implied by a sample count.
pub fn samples_to_secs(samples: u64, sample_rate: u32) -> Option<f64> {
    if sample_rate == 0 {
        return None;
    }
    Some(samples as f64 / f64::from(sample_rate))
}
