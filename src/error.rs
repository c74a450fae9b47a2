use thiserror::Error;

use crate::camera::CameraError;
use crate::preferences::PreferencesError;
use crate::recording::{RecorderError, SaveError};

/// How an application error is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Blocking alert shown to the user
    Alert,
    /// Written to the log only
    Logged,
    /// Transient, non-blocking banner
    Banner,
}

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Camera access denied or no camera available: {0}")]
    DeviceAccessDenied(#[from] CameraError),

    #[error("This browser cannot record video in any supported format")]
    UnsupportedRecordingFormat,

    #[error("Recording produced no data")]
    EmptyRecordingData,

    #[error("Stored settings are unreadable: {0}")]
    SettingsLoadCorrupt(String),

    #[error("Failed to save settings: {0}")]
    SettingsSaveFailed(#[source] PreferencesError),

    #[error("Unexpected error: {0}")]
    UnhandledRuntimeFault(String),
}

impl AppError {
    pub fn severity(&self) -> Severity {
        match self {
            AppError::DeviceAccessDenied(_)
            | AppError::UnsupportedRecordingFormat
            | AppError::EmptyRecordingData => Severity::Alert,
            AppError::SettingsLoadCorrupt(_) | AppError::SettingsSaveFailed(_) => {
                Severity::Logged
            }
            AppError::UnhandledRuntimeFault(_) => Severity::Banner,
        }
    }

    /// Text shown to the user for alert and banner errors
    pub fn user_message(&self) -> String {
        match self {
            AppError::DeviceAccessDenied(_) => {
                "Could not access the camera. Please allow camera and microphone access and try again."
                    .to_string()
            }
            AppError::UnsupportedRecordingFormat => {
                "Recording is not supported in this browser.".to_string()
            }
            AppError::EmptyRecordingData => {
                "No video data was recorded. Please try again.".to_string()
            }
            AppError::UnhandledRuntimeFault(_) => {
                "Something went wrong. Please refresh the page.".to_string()
            }
            other => other.to_string(),
        }
    }
}

impl From<RecorderError> for AppError {
    fn from(e: RecorderError) -> Self {
        match e {
            RecorderError::UnsupportedFormat => AppError::UnsupportedRecordingFormat,
            RecorderError::EmptyRecording => AppError::EmptyRecordingData,
            other => AppError::UnhandledRuntimeFault(other.to_string()),
        }
    }
}

impl From<SaveError> for AppError {
    fn from(e: SaveError) -> Self {
        AppError::UnhandledRuntimeFault(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_taxonomy() {
        assert_eq!(
            AppError::DeviceAccessDenied(CameraError::PermissionDenied("no".into())).severity(),
            Severity::Alert
        );
        assert_eq!(AppError::UnsupportedRecordingFormat.severity(), Severity::Alert);
        assert_eq!(AppError::EmptyRecordingData.severity(), Severity::Alert);
        assert_eq!(
            AppError::SettingsLoadCorrupt("bad json".into()).severity(),
            Severity::Logged
        );
        assert_eq!(
            AppError::SettingsSaveFailed(PreferencesError::Storage("quota".into())).severity(),
            Severity::Logged
        );
        assert_eq!(
            AppError::UnhandledRuntimeFault("boom".into()).severity(),
            Severity::Banner
        );
    }

    #[test]
    fn test_recorder_errors_map_to_taxonomy() {
        assert!(matches!(
            AppError::from(RecorderError::UnsupportedFormat),
            AppError::UnsupportedRecordingFormat
        ));
        assert!(matches!(
            AppError::from(RecorderError::EmptyRecording),
            AppError::EmptyRecordingData
        ));
    }

    #[test]
    fn test_fault_message_asks_for_refresh() {
        let msg = AppError::UnhandledRuntimeFault("x".into()).user_message();
        assert!(msg.contains("refresh"));
    }
}
