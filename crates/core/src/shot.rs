//! Draft shot model, dialogue blocks and the shot status state machine.
//!
//! A [`Shot`] is the locally owned draft unit. Its [`ShotStatus`] only
//! moves along the edges allowed by [`ShotStatus::can_transition_to`];
//! the one exception is [`heal_status`], which repairs statuses that cannot
//! be trusted after a restart.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{DbId, LocalId, Timestamp};

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle status of a draft shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotStatus {
    /// Idle and editable. Also the landing state after any failure.
    Draft,
    /// Dialogue audio is being synthesized.
    Generating,
    /// Video is being rendered.
    Rendering,
    /// Rendered media is available for review.
    PreviewReady,
}

impl ShotStatus {
    /// Every status value, in lifecycle order.
    pub const ALL: [ShotStatus; 4] = [
        Self::Draft,
        Self::Generating,
        Self::Rendering,
        Self::PreviewReady,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Generating => "generating",
            Self::Rendering => "rendering",
            Self::PreviewReady => "preview_ready",
        }
    }

    /// Statuses backed by an in-flight external call.
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Generating | Self::Rendering)
    }

    /// Whether `self -> next` is an edge of the state machine.
    ///
    /// Same-state transitions are never allowed, which is what rejects a
    /// second render on a shot that is already rendering.
    pub fn can_transition_to(&self, next: ShotStatus) -> bool {
        use ShotStatus::*;
        matches!(
            (self, next),
            (Draft, Generating)
                | (Draft, Rendering)
                | (Generating, Draft)
                | (Rendering, Draft)
                | (Rendering, PreviewReady)
                | (PreviewReady, Draft)
                | (PreviewReady, Generating)
        )
    }

    /// Checked transition. Returns the new status or a conflict.
    pub fn transition(self, next: ShotStatus) -> Result<ShotStatus, CoreError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::Conflict(format!(
                "Shot cannot move from {self} to {next}"
            )))
        }
    }
}

impl std::fmt::Display for ShotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Repair a status loaded from a snapshot.
///
/// No handle to the original in-flight call survives a restart, so busy
/// statuses are downgraded: to `PreviewReady` when output already exists,
/// otherwise to `Draft`. Idle statuses are returned unchanged.
pub fn heal_status(status: ShotStatus, has_output: bool) -> ShotStatus {
    match status {
        ShotStatus::Generating | ShotStatus::Rendering if has_output => ShotStatus::PreviewReady,
        ShotStatus::Generating | ShotStatus::Rendering => ShotStatus::Draft,
        idle => idle,
    }
}

// ---------------------------------------------------------------------------
// Speaker mode
// ---------------------------------------------------------------------------

/// Whether the speaker appears on screen (lip-sync) or is heard only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeakerMode {
    #[default]
    OnScreen,
    Narrator,
}

impl SpeakerMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnScreen => "on_screen",
            Self::Narrator => "narrator",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "on_screen" => Some(Self::OnScreen),
            "narrator" => Some(Self::Narrator),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Dialogue
// ---------------------------------------------------------------------------

/// One line of speech within a shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueBlock {
    pub id: uuid::Uuid,
    /// Character id or registry voice id.
    pub speaker_ref: String,
    pub text: String,
    pub audio_ref: Option<String>,
    #[serde(default)]
    pub pause_after_seconds: f64,
    #[serde(default)]
    pub is_generating: bool,
}

impl DialogueBlock {
    pub fn new(speaker_ref: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            speaker_ref: speaker_ref.into(),
            text: text.into(),
            audio_ref: None,
            pause_after_seconds: 0.0,
            is_generating: false,
        }
    }

    pub fn with_pause(mut self, seconds: f64) -> Self {
        self.pause_after_seconds = seconds;
        self
    }
}

// ---------------------------------------------------------------------------
// Shot
// ---------------------------------------------------------------------------

/// A draft shot: keyframe, dialogue and (eventually) rendered media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shot {
    pub local_id: LocalId,
    pub remote_id: Option<DbId>,
    pub scene_ref: Option<String>,
    pub name: String,
    pub dialogue_blocks: Vec<DialogueBlock>,
    pub visual_prompt: String,
    pub motion_preset: Option<String>,
    pub keyframe_ref: Option<String>,
    pub speaker_mode: SpeakerMode,
    #[serde(default)]
    pub convert_voice: bool,
    pub status: ShotStatus,
    pub stitched_audio_ref: Option<String>,
    pub rendered_media_ref: Option<String>,
    pub last_frame_ref: Option<String>,
    pub total_audio_duration_seconds: Option<f64>,
    #[serde(default)]
    pub manual_duration_seconds: f64,
    #[serde(default)]
    pub start_delay_seconds: f64,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Shot {
    /// Create a fresh draft with a new local id.
    pub fn new(name: impl Into<String>, dialogue_blocks: Vec<DialogueBlock>, now: Timestamp) -> Self {
        Self {
            local_id: uuid::Uuid::new_v4(),
            remote_id: None,
            scene_ref: None,
            name: name.into(),
            dialogue_blocks,
            visual_prompt: String::new(),
            motion_preset: None,
            keyframe_ref: None,
            speaker_mode: SpeakerMode::default(),
            convert_voice: false,
            status: ShotStatus::Draft,
            stitched_audio_ref: None,
            rendered_media_ref: None,
            last_frame_ref: None,
            total_audio_duration_seconds: None,
            manual_duration_seconds: crate::timing::DEFAULT_MANUAL_DURATION_SECS,
            start_delay_seconds: 0.0,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the shot carries any generated output worth keeping.
    pub fn has_output(&self) -> bool {
        self.rendered_media_ref.is_some() || self.stitched_audio_ref.is_some()
    }

    /// Audio lock: duration comes from the synthesized audio, not the
    /// manual value.
    pub fn is_audio_locked(&self) -> bool {
        self.stitched_audio_ref.is_some() && self.total_audio_duration_seconds.is_some()
    }

    /// Apply [`heal_status`] in place. Returns `true` if the status changed.
    pub fn heal(&mut self) -> bool {
        let healed = heal_status(self.status, self.has_output());
        let changed = healed != self.status;
        self.status = healed;
        for block in &mut self.dialogue_blocks {
            block.is_generating = false;
        }
        changed
    }

    /// Drop synthesized audio so duration falls back to the manual value.
    pub fn unlock_audio(&mut self) {
        self.stitched_audio_ref = None;
        self.total_audio_duration_seconds = None;
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// A shot must carry at least one dialogue block while active.
pub fn validate_dialogue_present(blocks: &[DialogueBlock]) -> Result<(), CoreError> {
    if blocks.is_empty() {
        return Err(CoreError::Validation(
            "Shot must have at least one dialogue block".to_string(),
        ));
    }
    Ok(())
}

/// Every block needs non-blank text before synthesis may run.
pub fn validate_dialogue_text(blocks: &[DialogueBlock]) -> Result<(), CoreError> {
    validate_dialogue_present(blocks)?;
    if let Some(index) = blocks.iter().position(|b| b.text.trim().is_empty()) {
        return Err(CoreError::Validation(format!(
            "Dialogue line {} has no text",
            index + 1
        )));
    }
    Ok(())
}

/// Durations and pauses must be finite and non-negative.
pub fn validate_timing(shot: &Shot) -> Result<(), CoreError> {
    let checks = [
        ("manual_duration_seconds", shot.manual_duration_seconds),
        ("start_delay_seconds", shot.start_delay_seconds),
    ];
    for (field, value) in checks {
        if !value.is_finite() || value < 0.0 {
            return Err(CoreError::Validation(format!(
                "{field} must be a non-negative number, got {value}"
            )));
        }
    }
    for block in &shot.dialogue_blocks {
        if !block.pause_after_seconds.is_finite() || block.pause_after_seconds < 0.0 {
            return Err(CoreError::Validation(format!(
                "pause_after_seconds must be a non-negative number, got {}",
                block.pause_after_seconds
            )));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn shot() -> Shot {
        Shot::new("Opening", vec![DialogueBlock::new("charA", "Hello")], chrono::Utc::now())
    }

    // -- State machine --

    #[test]
    fn rendering_only_reachable_from_draft() {
        for from in ShotStatus::ALL {
            let allowed = from.can_transition_to(ShotStatus::Rendering);
            assert_eq!(allowed, from == ShotStatus::Draft, "from {from}");
        }
    }

    #[test]
    fn same_state_transitions_rejected() {
        for status in ShotStatus::ALL {
            assert!(status.transition(status).is_err(), "{status}");
        }
    }

    #[test]
    fn preview_can_reopen_or_regenerate() {
        assert!(ShotStatus::PreviewReady.can_transition_to(ShotStatus::Draft));
        assert!(ShotStatus::PreviewReady.can_transition_to(ShotStatus::Generating));
    }

    #[test]
    fn generating_only_returns_to_draft() {
        assert!(ShotStatus::Generating.can_transition_to(ShotStatus::Draft));
        assert!(!ShotStatus::Generating.can_transition_to(ShotStatus::PreviewReady));
        assert!(!ShotStatus::Generating.can_transition_to(ShotStatus::Rendering));
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&ShotStatus::PreviewReady).unwrap();
        assert_eq!(json, "\"preview_ready\"");
    }

    // -- Heal --

    #[test]
    fn heal_busy_without_output_becomes_draft() {
        assert_eq!(heal_status(ShotStatus::Rendering, false), ShotStatus::Draft);
        assert_eq!(heal_status(ShotStatus::Generating, false), ShotStatus::Draft);
    }

    #[test]
    fn heal_busy_with_output_becomes_preview_ready() {
        assert_eq!(heal_status(ShotStatus::Rendering, true), ShotStatus::PreviewReady);
        assert_eq!(heal_status(ShotStatus::Generating, true), ShotStatus::PreviewReady);
    }

    #[test]
    fn heal_leaves_idle_statuses_alone() {
        for has_output in [true, false] {
            assert_eq!(heal_status(ShotStatus::Draft, has_output), ShotStatus::Draft);
            assert_eq!(
                heal_status(ShotStatus::PreviewReady, has_output),
                ShotStatus::PreviewReady
            );
        }
    }

    #[test]
    fn shot_heal_clears_block_flags() {
        let mut s = shot();
        s.status = ShotStatus::Generating;
        s.dialogue_blocks[0].is_generating = true;
        assert!(s.heal());
        assert_eq!(s.status, ShotStatus::Draft);
        assert!(!s.dialogue_blocks[0].is_generating);
    }

    // -- Audio lock --

    #[test]
    fn audio_lock_requires_ref_and_duration() {
        let mut s = shot();
        assert!(!s.is_audio_locked());
        s.stitched_audio_ref = Some("https://x/a.wav".into());
        assert!(!s.is_audio_locked());
        s.total_audio_duration_seconds = Some(2.0);
        assert!(s.is_audio_locked());
        s.unlock_audio();
        assert!(!s.is_audio_locked());
    }

    // -- Validation --

    #[test]
    fn rejects_empty_dialogue() {
        assert!(validate_dialogue_present(&[]).is_err());
    }

    #[test]
    fn rejects_blank_text() {
        let blocks = vec![
            DialogueBlock::new("charA", "Hello"),
            DialogueBlock::new("charB", "   "),
        ];
        let err = validate_dialogue_text(&blocks).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn rejects_negative_delay() {
        let mut s = shot();
        s.start_delay_seconds = -0.5;
        assert!(validate_timing(&s).is_err());
    }

    #[test]
    fn speaker_mode_round_trips_through_str() {
        for mode in [SpeakerMode::OnScreen, SpeakerMode::Narrator] {
            assert_eq!(SpeakerMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(SpeakerMode::parse("offscreen"), None);
    }
}
