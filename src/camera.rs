//! Camera stream management
//!
//! Owns the single capture stream: acquires it from the device, binds it to
//! the preview surface and switches between front and back cameras. A
//! previous stream always has its tracks stopped before a new one is
//! requested, so no device handle is left dangling.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use futures_util::future::LocalBoxFuture;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::CaptureConfig;

/// Which camera to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Front camera (`facingMode: "user"`)
    #[default]
    User,
    /// Back camera (`facingMode: "environment"`)
    Environment,
}

impl Facing {
    pub fn flipped(self) -> Self {
        match self {
            Facing::User => Facing::Environment,
            Facing::Environment => Facing::User,
        }
    }

    /// Value of the `facingMode` constraint
    pub fn as_constraint(self) -> &'static str {
        match self {
            Facing::User => "user",
            Facing::Environment => "environment",
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facing::User => write!(f, "front camera"),
            Facing::Environment => write!(f, "back camera"),
        }
    }
}

/// Media constraints passed to the capture device
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConstraints {
    pub width: u32,
    pub height: u32,
    pub frame_rate: u32,
    pub facing: Facing,
    pub audio: bool,
}

impl CaptureConstraints {
    pub fn from_config(config: &CaptureConfig, facing: Facing) -> Self {
        Self {
            width: config.width,
            height: config.height,
            frame_rate: config.frame_rate,
            facing,
            audio: config.audio,
        }
    }
}

/// A live capture stream
pub trait MediaStream: Clone {
    /// Stop every track, releasing the device
    fn stop_all_tracks(&self);
}

/// Source of capture streams (`getUserMedia` in the browser)
pub trait CaptureDevice<S> {
    fn acquire(&self, constraints: &CaptureConstraints) -> LocalBoxFuture<'_, Result<S, CameraError>>;
}

/// Live preview behind the script panel
pub trait PreviewSurface<S> {
    fn attach(&self, stream: &S);
    fn detach(&self);
}

/// Camera errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CameraError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("No camera found")]
    NoDevice,

    #[error("Camera acquisition already in progress")]
    Busy,

    #[error("Camera error: {0}")]
    Device(String),
}

/// Owns the capture stream and the preview binding
pub struct CameraManager<S> {
    device: Box<dyn CaptureDevice<S>>,
    preview: Box<dyn PreviewSurface<S>>,
    config: CaptureConfig,
    stream: RefCell<Option<S>>,
    facing: Cell<Facing>,
    acquiring: Cell<bool>,
    waiters: RefCell<Vec<Waker>>,
}

/// Resolves once no acquisition is in flight
struct AcquisitionSettled<'a> {
    acquiring: &'a Cell<bool>,
    waiters: &'a RefCell<Vec<Waker>>,
}

impl Future for AcquisitionSettled<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.acquiring.get() {
            self.waiters.borrow_mut().push(cx.waker().clone());
            Poll::Pending
        } else {
            Poll::Ready(())
        }
    }
}

/// Clears the in-flight flag and wakes waiters, also when the acquiring
/// future is dropped before the device answers
struct AcquireGuard<'a> {
    acquiring: &'a Cell<bool>,
    waiters: &'a RefCell<Vec<Waker>>,
}

impl Drop for AcquireGuard<'_> {
    fn drop(&mut self) {
        self.acquiring.set(false);
        for waker in self.waiters.borrow_mut().drain(..) {
            waker.wake();
        }
    }
}

impl<S: MediaStream> CameraManager<S> {
    pub fn new(
        device: Box<dyn CaptureDevice<S>>,
        preview: Box<dyn PreviewSurface<S>>,
        config: CaptureConfig,
    ) -> Self {
        let facing = config.default_facing;
        Self {
            device,
            preview,
            config,
            stream: RefCell::new(None),
            facing: Cell::new(facing),
            acquiring: Cell::new(false),
            waiters: RefCell::new(Vec::new()),
        }
    }

    pub fn facing(&self) -> Facing {
        self.facing.get()
    }

    pub fn has_stream(&self) -> bool {
        self.stream.borrow().is_some()
    }

    pub fn stream(&self) -> Option<S> {
        self.stream.borrow().clone()
    }

    /// Return the current stream, acquiring one if needed
    ///
    /// Joins an acquisition that is already in flight instead of starting
    /// a second one. If that acquisition fails, a new one is attempted.
    pub async fn ensure_stream(&self) -> Result<S, CameraError> {
        loop {
            if let Some(stream) = self.stream() {
                return Ok(stream);
            }
            if !self.acquiring.get() {
                return self.acquire(self.facing.get()).await;
            }
            info!("Waiting for camera acquisition in progress");
            AcquisitionSettled {
                acquiring: &self.acquiring,
                waiters: &self.waiters,
            }
            .await;
        }
    }

    /// Release the current stream and acquire one from the other camera
    ///
    /// On failure the facing is left unchanged and no stream is held.
    pub async fn switch_camera(&self) -> Result<Facing, CameraError> {
        if self.acquiring.get() {
            return Err(CameraError::Busy);
        }
        let next = self.facing.get().flipped();
        self.release();
        self.acquire(next).await?;
        info!("Switched to {}", next);
        Ok(next)
    }

    /// Stop all tracks of the current stream and unbind the preview
    pub fn release(&self) {
        if let Some(stream) = self.stream.borrow_mut().take() {
            stream.stop_all_tracks();
            self.preview.detach();
            info!("Camera stream released");
        }
    }

    #[tracing::instrument(skip(self))]
    async fn acquire(&self, facing: Facing) -> Result<S, CameraError> {
        if self.acquiring.replace(true) {
            warn!("Camera acquisition already in progress");
            return Err(CameraError::Busy);
        }

        let guard = AcquireGuard {
            acquiring: &self.acquiring,
            waiters: &self.waiters,
        };
        let constraints = CaptureConstraints::from_config(&self.config, facing);
        let result = self.device.acquire(&constraints).await;

        match result {
            Ok(stream) => {
                // A stream acquired concurrently would otherwise leak its tracks
                self.release();
                self.preview.attach(&stream);
                *self.stream.borrow_mut() = Some(stream.clone());
                self.facing.set(facing);
                info!("Camera stream acquired ({})", facing);
                drop(guard);
                Ok(stream)
            }
            Err(e) => {
                drop(guard);
                error!("Failed to acquire camera stream: {}", e);
                Err(e)
            }
        }
    }
}
