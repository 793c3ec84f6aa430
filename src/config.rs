//! Playback settings for a [`DialogueRunner`](crate::DialogueRunner).

use std::time::Duration;

use crate::errors::{DialogueError, Result};
use crate::tree::AudioClip;

/// How a node's text reaches the screen.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RevealMode {
    /// One character at a time.
    CharByChar,
    /// The whole line at once.
    Instant,
}

/// What happens once a node has been revealed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ContinueMode {
    AutoAdvance,
    WaitForInput,
}

/// What a continue request does to a reveal that is still typing. Only
/// used with [`ContinueMode::WaitForInput`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FinishPolicy {
    /// Fill in the rest of the line right away.
    InstantFinish,
    /// Keep typing, but with every remaining delay at zero.
    SpeedupFinish,
}

/// Sound cues played as the panel opens and closes.
#[derive(Debug, Clone, Default)]
pub struct PanelSounds {
    pub open_animated: Option<AudioClip>,
    pub close_animated: Option<AudioClip>,
    pub open_plain: Option<AudioClip>,
    pub close_plain: Option<AudioClip>,
}

impl PanelSounds {
    pub fn open(&self, animated: bool) -> Option<&AudioClip> {
        if animated {
            self.open_animated.as_ref()
        } else {
            self.open_plain.as_ref()
        }
    }

    pub fn close(&self, animated: bool) -> Option<&AudioClip> {
        if animated {
            self.close_animated.as_ref()
        } else {
            self.close_plain.as_ref()
        }
    }
}

#[derive(Debug, Clone)]
pub struct DialogueConfig {
    pub print_text: bool,
    pub play_with_audio: bool,
    /// Voice-over volume, 0.0 to 1.0.
    pub volume: f32,
    pub char_delay: Duration,
    /// Pause after `,` `;` `.` `?` and `!`, used instead of `char_delay`.
    pub punctuation_delay: Duration,
    pub reveal_mode: RevealMode,
    pub continue_mode: ContinueMode,
    pub finish_policy: FinishPolicy,
    pub use_open_close_animation: bool,
    pub sounds: PanelSounds,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            print_text: true,
            play_with_audio: true,
            volume: 1.0,
            char_delay: Duration::from_millis(100),
            punctuation_delay: Duration::from_secs(1),
            reveal_mode: RevealMode::CharByChar,
            continue_mode: ContinueMode::AutoAdvance,
            finish_policy: FinishPolicy::InstantFinish,
            use_open_close_animation: false,
            sounds: PanelSounds::default(),
        }
    }
}

impl DialogueConfig {
    /// Text on screen, voice-over muted.
    pub fn text_only() -> Self {
        Self::default().with_print_text(true).with_volume(0.0)
    }

    /// Voice-over without any text.
    pub fn voice_only() -> Self {
        Self::default().with_print_text(false).with_volume(1.0)
    }

    pub fn voice_and_text() -> Self {
        Self::default().with_print_text(true).with_volume(1.0)
    }

    pub fn with_print_text(mut self, print_text: bool) -> Self {
        self.print_text = print_text;
        self
    }

    pub fn with_audio(mut self, play_with_audio: bool) -> Self {
        self.play_with_audio = play_with_audio;
        self
    }

    /// Set the voice-over volume (clamped to 0.0-1.0).
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume.max(0.0).min(1.0);
        self
    }

    pub fn with_char_delay(mut self, delay: Duration) -> Self {
        self.char_delay = delay;
        self
    }

    pub fn with_punctuation_delay(mut self, delay: Duration) -> Self {
        self.punctuation_delay = delay;
        self
    }

    pub fn with_reveal_mode(mut self, mode: RevealMode) -> Self {
        self.reveal_mode = mode;
        self
    }

    pub fn with_continue_mode(mut self, mode: ContinueMode) -> Self {
        self.continue_mode = mode;
        self
    }

    pub fn with_finish_policy(mut self, policy: FinishPolicy) -> Self {
        self.finish_policy = policy;
        self
    }

    pub fn with_open_close_animation(mut self, animated: bool) -> Self {
        self.use_open_close_animation = animated;
        self
    }

    pub fn with_sounds(mut self, sounds: PanelSounds) -> Self {
        self.sounds = sounds;
        self
    }

    /// Fails when there is neither text nor audio to present.
    pub fn validate(&self) -> Result<()> {
        if !self.print_text && !self.play_with_audio {
            return Err(DialogueError::Configuration);
        }
        Ok(())
    }

    /// Settings as the runner applies them: without text on screen there
    /// is nothing for the player to acknowledge, so lines always advance
    /// on their own.
    pub fn normalized(&self) -> Self {
        let mut config = self.clone();
        if !config.print_text {
            config.continue_mode = ContinueMode::AutoAdvance;
        }
        config
    }

    pub fn waits_for_input(&self) -> bool {
        self.continue_mode == ContinueMode::WaitForInput
    }
}
