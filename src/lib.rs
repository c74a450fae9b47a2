#![deny(clippy::all)]

//! Teleprompter core
//!
//! A floating script panel over a live camera preview: the panel can be
//! dragged, resized and pinched, the script scrolls at a words-per-minute
//! pace, and recordings are assembled and handed to the browser's download
//! flow. Platform capabilities (camera, recorder, storage, DOM) are traits;
//! the browser implementations live in `web` and only build for wasm32.

pub mod autoscroll;
pub mod camera;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod geometry;
pub mod logging;
pub mod preferences;
pub mod recording;
pub mod storage;

#[cfg(target_arch = "wasm32")]
pub mod web;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use coordinator::{Components, Coordinator, RecordingPhase};
pub use error::{AppError, Severity};
