//! Video recording
//!
//! Wraps the platform recorder: probes for a supported MIME type, starts
//! the device with a fixed chunk interval, buffers the chunks it delivers
//! and assembles them into a single file once the device reports it has
//! stopped.
//!
//! # Lifecycle
//! - `start` creates the session and starts the device
//! - `push_chunk` is called for every data event, in emission order
//! - `stop` asks the device to flush; more chunks may still arrive
//! - `finish` runs on the device's stop event and yields the file

mod save;
mod session;

pub use save::{
    extension_for, recording_filename, FileSaver, RecordedFile, SaveError, SaveStrategy,
    MANUAL_SAVE_INSTRUCTIONS,
};
pub use session::{MediaChunk, RecordingSession};

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::config::{RecorderConfig, SaveConfig};

/// Platform recording API (`MediaRecorder` in the browser)
pub trait RecorderBackend<S> {
    fn is_type_supported(&self, mime_type: &str) -> bool;

    /// Start recording `stream`, emitting a chunk every `timeslice_ms`
    fn start(
        &self,
        stream: &S,
        mime_type: &str,
        timeslice_ms: u32,
    ) -> Result<Box<dyn RecordingHandle>, RecorderError>;
}

/// Control over a running device recording
pub trait RecordingHandle {
    /// MIME type the device settled on; may differ from the requested one
    fn mime_type(&self) -> String;

    /// Request stop; the device flushes remaining data and then fires its
    /// stop event
    fn stop(&mut self);
}

/// Recorder errors
#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("No supported recording format")]
    UnsupportedFormat,

    #[error("Recording produced no data")]
    EmptyRecording,

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("No recording in progress")]
    NotRecording,

    #[error("Recorder failed to start: {0}")]
    Start(String),
}

/// First candidate the backend supports, in preference order
pub fn pick_mime_type<S>(
    backend: &dyn RecorderBackend<S>,
    candidates: &[String],
) -> Option<String> {
    candidates
        .iter()
        .find(|mime| backend.is_type_supported(mime))
        .cloned()
}

pub struct Recorder<S, C> {
    backend: Box<dyn RecorderBackend<S>>,
    config: RecorderConfig,
    filename_prefix: String,
    session: Option<RecordingSession<C>>,
    handle: Option<Box<dyn RecordingHandle>>,
}

impl<S, C: MediaChunk> Recorder<S, C> {
    pub fn new(
        backend: Box<dyn RecorderBackend<S>>,
        config: RecorderConfig,
        save: &SaveConfig,
    ) -> Self {
        Self {
            backend,
            config,
            filename_prefix: save.filename_prefix.clone(),
            session: None,
            handle: None,
        }
    }

    /// True from `start` until `finish`
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&RecordingSession<C>> {
        self.session.as_ref()
    }

    pub fn start(&mut self, stream: &S) -> Result<(), RecorderError> {
        if self.session.is_some() {
            return Err(RecorderError::AlreadyRecording);
        }

        let requested = pick_mime_type(self.backend.as_ref(), &self.config.mime_candidates)
            .ok_or_else(|| {
                error!(
                    "None of the recording formats are supported: {:?}",
                    self.config.mime_candidates
                );
                RecorderError::UnsupportedFormat
            })?;

        let handle = self
            .backend
            .start(stream, &requested, self.config.timeslice_ms)?;

        let actual = handle.mime_type();
        let mime_type = if actual.is_empty() {
            requested.clone()
        } else {
            actual
        };
        if mime_type != requested {
            warn!(
                "Recorder requested {} but is using {}",
                requested, mime_type
            );
        }

        info!(
            "Recording started as {} ({}ms chunks)",
            mime_type, self.config.timeslice_ms
        );
        self.session = Some(RecordingSession::new(mime_type));
        self.handle = Some(handle);
        Ok(())
    }

    /// Buffer a data chunk from the device
    pub fn push_chunk(&mut self, chunk: C) {
        let Some(session) = self.session.as_mut() else {
            warn!("Dropping chunk received without a recording session");
            return;
        };
        let len = chunk.byte_len();
        if session.push(chunk) {
            debug!("Chunk #{} ({} bytes)", session.chunks.len(), len);
        }
    }

    /// Ask the device to stop and flush
    pub fn stop(&mut self) -> Result<(), RecorderError> {
        let session = self.session.as_mut().ok_or(RecorderError::NotRecording)?;
        if !session.is_active {
            return Ok(());
        }
        session.is_active = false;
        if let Some(handle) = self.handle.as_mut() {
            handle.stop();
        }
        info!("Recording stop requested");
        Ok(())
    }

    /// Assemble the file after the device's stop event
    ///
    /// The session is consumed either way.
    pub fn finish(&mut self, at: DateTime<Utc>) -> Result<RecordedFile<C>, RecorderError> {
        self.handle = None;
        let session = self.session.take().ok_or(RecorderError::NotRecording)?;

        let total = session.total_bytes();
        if total == 0 {
            warn!("Recording stopped without any data");
            return Err(RecorderError::EmptyRecording);
        }

        let filename = recording_filename(&self.filename_prefix, at, &session.mime_type);
        info!(
            "Recording assembled: {} ({} chunks, {} bytes)",
            filename,
            session.chunks.len(),
            total
        );
        Ok(RecordedFile {
            chunks: session.chunks,
            mime_type: session.mime_type,
            filename,
        })
    }
}
