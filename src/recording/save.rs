//! Output assembly and file saving

use chrono::{DateTime, Utc};

use super::session::MediaChunk;

/// How the finished recording reaches the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStrategy {
    /// Synthetic anchor click on an object URL
    AnchorDownload,
    /// Open the recording in a new view with manual-save instructions
    OpenInNewView,
}

impl SaveStrategy {
    /// iOS/iPadOS WebKit blocks synthetic media downloads
    pub fn for_user_agent(user_agent: &str) -> Self {
        let ios_device = ["iPhone", "iPad", "iPod"]
            .iter()
            .any(|d| user_agent.contains(d));
        // iPadOS reports a desktop Safari UA but keeps the touch marker
        let ipad_desktop_mode = user_agent.contains("Macintosh") && user_agent.contains("Mobile/");
        if ios_device || ipad_desktop_mode {
            SaveStrategy::OpenInNewView
        } else {
            SaveStrategy::AnchorDownload
        }
    }
}

/// Shown next to a recording opened in a new view
pub const MANUAL_SAVE_INSTRUCTIONS: &str =
    "Your recording is ready. Tap the share button and choose \"Save Video\" to keep it.";

/// An assembled recording ready to save
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFile<C> {
    /// Chunks in arrival order; saved as their byte-wise concatenation
    pub chunks: Vec<C>,
    pub mime_type: String,
    pub filename: String,
}

impl RecordedFile<Vec<u8>> {
    pub fn into_bytes(self) -> Vec<u8> {
        self.chunks.concat()
    }
}

impl<C: MediaChunk> RecordedFile<C> {
    pub fn size(&self) -> u64 {
        self.chunks.iter().map(MediaChunk::byte_len).sum()
    }
}

/// Delivers a recording to the user
pub trait FileSaver<C> {
    fn save(&self, file: RecordedFile<C>, strategy: SaveStrategy) -> Result<(), SaveError>;
}

/// File extension for a recorder MIME type
pub fn extension_for(mime_type: &str) -> &'static str {
    if mime_type.starts_with("video/mp4") {
        "mp4"
    } else {
        "webm"
    }
}

/// `<prefix>-<timestamp>.<ext>`, timestamp with `:` and `.` made filename-safe
pub fn recording_filename(prefix: &str, at: DateTime<Utc>, mime_type: &str) -> String {
    let timestamp = at.format("%Y-%m-%dT%H-%M-%S-%3fZ");
    format!("{}-{}.{}", prefix, timestamp, extension_for(mime_type))
}

/// Save errors
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("Failed to create recording file: {0}")]
    Create(String),

    #[error("Failed to open recording: {0}")]
    Open(String),
}
