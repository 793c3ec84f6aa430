use thiserror::Error;

use crate::tree::TreeId;

pub type Result<T> = std::result::Result<T, DialogueError>;

/// Errors that stop the call that produced them.
#[derive(Debug, Error)]
pub enum DialogueError {
    /// Text printing and audio playback are both turned off, so there is
    /// nothing a dialogue could present.
    #[error("cannot play dialogue: printing text and playing audio are both disabled")]
    Configuration,
    #[error("failed to read dialogue content: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode dialogue bundle: {0}")]
    Decode(#[from] prost::DecodeError),
    #[error("failed to read string table: {0}")]
    Csv(#[from] csv::Error),
    /// A bundle refers to a line id the string table doesn't have.
    #[error("no text for line {line_id}")]
    MissingLine { line_id: String },
    /// A node refers to a clip name the bundle doesn't declare.
    #[error("no audio clip named {clip}")]
    MissingClip { clip: String },
    #[error("audio clip {clip} has an unusable duration of {seconds} seconds")]
    BadClipDuration { clip: String, seconds: f32 },
    #[error("no dialogue tree named {0}")]
    UnknownTree(TreeId),
    /// Trees can't be edited while they are playing.
    #[error("dialogue tree {0} is currently playing")]
    TreeInUse(TreeId),
}

/// Problems the runner recovers from on its own. They are logged as they
/// happen and kept until the host drains them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DialogueWarning {
    /// Audio is enabled but the node has no voice-over; pacing falls back
    /// to the text timing.
    #[error("no audio clip for line spoken by {speaker} in tree {tree}")]
    MissingAudioClip { tree: TreeId, speaker: String },
    /// A branch needs at least two answers; smaller ones are skipped.
    #[error("tree {tree} has a branch with {answers} answer(s); ignoring it")]
    InvalidBranch { tree: TreeId, answers: usize },
    #[error("no dialogue tree named {0}; nothing to say")]
    UnknownTree(TreeId),
    /// Successors led back to a tree without a single line shown on the
    /// way, so playback would never get anywhere.
    #[error("dialogue tree {0} was reached again without showing any line; ending dialogue")]
    SuccessorCycle(TreeId),
}
