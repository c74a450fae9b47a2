//! Recording session state

/// A unit of encoded media data delivered by the recording device
pub trait MediaChunk {
    fn byte_len(&self) -> u64;
}

impl MediaChunk for Vec<u8> {
    fn byte_len(&self) -> u64 {
        self.len() as u64
    }
}

/// Chunks accumulated while recording
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingSession<C> {
    /// Chunks in arrival order
    pub chunks: Vec<C>,
    /// MIME type the device actually records with
    pub mime_type: String,
    /// False once a stop was requested
    pub is_active: bool,
}

impl<C: MediaChunk> RecordingSession<C> {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            chunks: Vec::new(),
            mime_type: mime_type.into(),
            is_active: true,
        }
    }

    /// Append a chunk; empty chunks are dropped
    pub fn push(&mut self, chunk: C) -> bool {
        if chunk.byte_len() == 0 {
            return false;
        }
        self.chunks.push(chunk);
        true
    }

    pub fn total_bytes(&self) -> u64 {
        self.chunks.iter().map(MediaChunk::byte_len).sum()
    }
}
