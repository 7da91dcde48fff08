//! Transient transcription state for one in-progress composition.

use serde::Serialize;

/// Where the voice capture of a composition currently stands.
///
/// Never persisted; it lives only as long as the composition that owns it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TranscriptionState {
    #[default]
    Idle,

    /// Audio capture is running
    Recording,

    /// Waiting on the transcription backend (0.0 to 1.0, never reaches 1.0)
    Transcribing { progress: f64 },

    /// Transcript arrived and was copied into the working text
    Ready { text: String },

    Error { message: String },
}

impl TranscriptionState {
    /// Short lowercase name of the state
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Transcribing { .. } => "transcribing",
            Self::Ready { .. } => "ready",
            Self::Error { .. } => "in error",
        }
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_transcribing(&self) -> bool {
        matches!(self, Self::Transcribing { .. })
    }

    /// Recording may start from any state except an active recording or transcription
    pub fn can_start_recording(&self) -> bool {
        matches!(self, Self::Idle | Self::Ready { .. } | Self::Error { .. })
    }

    pub fn progress(&self) -> Option<f64> {
        match self {
            Self::Transcribing { progress } => Some(*progress),
            _ => None,
        }
    }

    pub fn ready_text(&self) -> Option<&str> {
        match self {
            Self::Ready { text } => Some(text),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Error { message } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_recording_guard() {
        assert!(TranscriptionState::Idle.can_start_recording());
        assert!(TranscriptionState::Error { message: "x".into() }.can_start_recording());
        assert!(TranscriptionState::Ready { text: "x".into() }.can_start_recording());
        assert!(!TranscriptionState::Recording.can_start_recording());
        assert!(!TranscriptionState::Transcribing { progress: 0.3 }.can_start_recording());
    }

    #[test]
    fn test_accessors() {
        let state = TranscriptionState::Transcribing { progress: 0.45 };
        assert_eq!(state.progress(), Some(0.45));
        assert!(state.ready_text().is_none());

        let state = TranscriptionState::Ready { text: "fever".into() };
        assert_eq!(state.ready_text(), Some("fever"));
    }
}
