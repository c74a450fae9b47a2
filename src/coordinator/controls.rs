//! UI surfaces driven by the coordinator

use crate::autoscroll::ScrollView;
use crate::camera::Facing;

/// Recording lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingPhase {
    #[default]
    Idle,
    /// Waiting for camera access
    Starting,
    Recording,
    /// Stop requested, waiting for the device's final chunk
    Finalizing,
}

impl RecordingPhase {
    /// Label for the record toggle button
    pub fn button_label(self) -> &'static str {
        match self {
            RecordingPhase::Idle => "Start Recording",
            RecordingPhase::Starting => "Starting…",
            RecordingPhase::Recording => "Stop Recording",
            RecordingPhase::Finalizing => "Saving…",
        }
    }
}

/// Snapshot of everything the controls display
#[derive(Debug, Clone, PartialEq)]
pub struct ControlState {
    pub phase: RecordingPhase,
    pub is_scrolling: bool,
    pub facing: Facing,
    pub scroll_speed_wpm: u32,
    pub text_size_px: u32,
    pub is_text_rotated: bool,
}

impl ControlState {
    pub fn is_recording(&self) -> bool {
        self.phase == RecordingPhase::Recording
    }

    pub fn scroll_button_label(&self) -> &'static str {
        if self.is_scrolling {
            "Stop Scrolling"
        } else {
            "Start Scrolling"
        }
    }
}

/// The script text surface inside the panel
pub trait ScriptView: ScrollView {
    fn set_text(&self, text: &str);
    fn set_text_size(&self, px: u32);
    fn set_rotated(&self, rotated: bool);
}

/// Buttons, sliders and notices
pub trait ControlSurface {
    fn render(&self, state: &ControlState);
    /// Blocking, user-visible error
    fn alert(&self, message: &str);
    /// Transient, non-blocking notice
    fn banner(&self, message: &str);
    /// Background shown when no camera preview is available
    fn show_placeholder(&self, visible: bool);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_labels() {
        assert_eq!(RecordingPhase::Idle.button_label(), "Start Recording");
        assert_eq!(RecordingPhase::Recording.button_label(), "Stop Recording");
        let state = ControlState {
            phase: RecordingPhase::Recording,
            is_scrolling: true,
            facing: Facing::User,
            scroll_speed_wpm: 10,
            text_size_px: 32,
            is_text_rotated: false,
        };
        assert!(state.is_recording());
        assert_eq!(state.scroll_button_label(), "Stop Scrolling");
    }
}
