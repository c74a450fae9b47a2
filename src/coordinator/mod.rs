//! Application coordinator
//!
//! The single application context: owns every component, receives all user
//! and device events, keeps recording and autoscroll in lockstep and
//! persists every durable change.
//!
//! # Event flow
//! - control events (toggles, sliders, gestures) arrive through the public
//!   methods below
//! - device events arrive through [`Coordinator::on_data_available`],
//!   [`Coordinator::on_recorder_stopped`] and [`Coordinator::on_frame`]
//! - after any visible change the control surface is re-rendered
//!
//! All methods take `&self`; state lives in `Cell`/`RefCell` fields so the
//! context can be shared by the event callbacks of a single UI thread. No
//! borrow is held across an `.await`.

mod controls;

pub use controls::{ControlState, ControlSurface, RecordingPhase, ScriptView};

use std::cell::{Cell, RefCell};

use chrono::Utc;
use tracing::{error, info, warn};

use crate::autoscroll::{AutoscrollEngine, Clock, Tick, Ticker};
use crate::camera::{CameraError, CameraManager, CaptureDevice, MediaStream, PreviewSurface};
use crate::config::AppConfig;
use crate::error::{AppError, Severity};
use crate::geometry::{BoxGeometryController, Grip, Panel, Point, Rect, SizeBounds};
use crate::preferences::Preferences;
use crate::recording::{FileSaver, MediaChunk, Recorder, RecorderBackend, SaveStrategy};
use crate::storage::{KeyValueStore, SettingsStore};

/// Platform capabilities the coordinator is built from
pub struct Components<S, C> {
    pub capture: Box<dyn CaptureDevice<S>>,
    pub preview: Box<dyn PreviewSurface<S>>,
    pub recorder: Box<dyn RecorderBackend<S>>,
    pub saver: Box<dyn FileSaver<C>>,
    pub storage: Box<dyn KeyValueStore>,
    pub view: Box<dyn ScriptView>,
    pub panel: Box<dyn Panel>,
    pub ticker: Box<dyn Ticker>,
    pub clock: Box<dyn Clock>,
    pub controls: Box<dyn ControlSurface>,
    pub save_strategy: SaveStrategy,
}

pub struct Coordinator<S, C> {
    config: AppConfig,
    settings: SettingsStore,
    prefs: RefCell<Preferences>,
    camera: CameraManager<S>,
    recorder: RefCell<Recorder<S, C>>,
    autoscroll: RefCell<AutoscrollEngine>,
    geometry: RefCell<BoxGeometryController>,
    view: Box<dyn ScriptView>,
    saver: Box<dyn FileSaver<C>>,
    clock: Box<dyn Clock>,
    controls: Box<dyn ControlSurface>,
    save_strategy: SaveStrategy,
    phase: Cell<RecordingPhase>,
}

impl<S: MediaStream, C: MediaChunk> Coordinator<S, C> {
    /// Build the context, load preferences and apply them to the UI
    pub fn new(components: Components<S, C>, config: AppConfig) -> Self {
        let settings = SettingsStore::new(
            components.storage,
            &config.storage,
            config.defaults.clone(),
        );
        let prefs = settings.load();

        let coordinator = Self {
            camera: CameraManager::new(
                components.capture,
                components.preview,
                config.capture.clone(),
            ),
            recorder: RefCell::new(Recorder::new(
                components.recorder,
                config.recorder.clone(),
                &config.save,
            )),
            autoscroll: RefCell::new(AutoscrollEngine::new(
                components.ticker,
                config.autoscroll.clone(),
            )),
            geometry: RefCell::new(BoxGeometryController::new(
                components.panel,
                SizeBounds::from(&config.panel),
            )),
            view: components.view,
            saver: components.saver,
            clock: components.clock,
            controls: components.controls,
            save_strategy: components.save_strategy,
            phase: Cell::new(RecordingPhase::Idle),
            prefs: RefCell::new(prefs),
            settings,
            config,
        };
        coordinator.apply_preferences();
        coordinator
    }

    fn apply_preferences(&self) {
        let prefs = self.prefs.borrow();
        self.view.set_text(&prefs.script_text);
        self.view.set_text_size(prefs.text_size_px);
        self.view.set_rotated(prefs.is_text_rotated);
        if let Some(geometry) = prefs.box_geometry {
            let applied = self.geometry.borrow().apply(Rect::from(geometry));
            info!("Restored panel geometry {:?}", applied);
        }
        drop(prefs);
        self.render();
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn phase(&self) -> RecordingPhase {
        self.phase.get()
    }

    pub fn is_recording(&self) -> bool {
        self.phase.get() == RecordingPhase::Recording
    }

    pub fn is_scrolling(&self) -> bool {
        self.autoscroll.borrow().is_active()
    }

    pub fn preferences(&self) -> Preferences {
        self.prefs.borrow().clone()
    }

    pub fn control_state(&self) -> ControlState {
        let prefs = self.prefs.borrow();
        ControlState {
            phase: self.phase.get(),
            is_scrolling: self.is_scrolling(),
            facing: self.camera.facing(),
            scroll_speed_wpm: prefs.scroll_speed_wpm,
            text_size_px: prefs.text_size_px,
            is_text_rotated: prefs.is_text_rotated,
        }
    }

    fn render(&self) {
        self.controls.render(&self.control_state());
    }

    fn set_phase(&self, phase: RecordingPhase) {
        self.phase.set(phase);
        self.render();
    }

    /// Route an error by severity
    pub fn report(&self, err: &AppError) {
        match err.severity() {
            Severity::Alert => {
                error!("{}", err);
                self.controls.alert(&err.user_message());
            }
            Severity::Logged => warn!("{}", err),
            Severity::Banner => {
                error!("{}", err);
                self.controls.banner(&err.user_message());
            }
        }
    }

    /// Report an unexpected failure caught at the top level
    pub fn report_fault(&self, detail: impl Into<String>) {
        self.report(&AppError::UnhandledRuntimeFault(detail.into()));
    }

    fn persist(&self) {
        self.settings.save_or_log(&self.prefs.borrow());
    }

    // ---- camera -------------------------------------------------------

    /// Acquire the camera for the live preview
    pub async fn start_camera(&self) -> Result<(), AppError> {
        match self.camera.ensure_stream().await {
            Ok(_) => {
                self.controls.show_placeholder(false);
                Ok(())
            }
            Err(CameraError::Busy) => {
                info!("Camera start skipped, acquisition already in progress");
                Ok(())
            }
            Err(e) => Err(self.camera_failed(e)),
        }
    }

    /// Switch between front and back cameras
    ///
    /// Refused while a recording owns the stream.
    pub async fn switch_camera(&self) -> Result<(), AppError> {
        if self.phase.get() != RecordingPhase::Idle {
            warn!("Camera switch ignored while {:?}", self.phase.get());
            return Ok(());
        }
        match self.camera.switch_camera().await {
            Ok(_) => {
                self.controls.show_placeholder(false);
                self.render();
                Ok(())
            }
            Err(CameraError::Busy) => {
                info!("Camera switch ignored, acquisition already in progress");
                Ok(())
            }
            Err(e) => Err(self.camera_failed(e)),
        }
    }

    /// Acquisition was refused or the device failed; busy is handled by callers
    fn camera_failed(&self, e: CameraError) -> AppError {
        self.controls.show_placeholder(true);
        let err = AppError::DeviceAccessDenied(e);
        self.report(&err);
        err
    }

    // ---- recording ----------------------------------------------------

    /// Start or stop recording
    ///
    /// Ignored while a start or a stop is still in flight. Errors are
    /// reported to the control surface before being returned.
    pub async fn toggle_recording(&self) -> Result<(), AppError> {
        match self.phase.get() {
            RecordingPhase::Idle => self.start_recording().await,
            RecordingPhase::Recording => {
                self.stop_recording();
                Ok(())
            }
            phase => {
                info!("Recording toggle ignored while {:?}", phase);
                Ok(())
            }
        }
    }

    async fn start_recording(&self) -> Result<(), AppError> {
        self.set_phase(RecordingPhase::Starting);

        let stream = match self.camera.ensure_stream().await {
            Ok(stream) => stream,
            Err(CameraError::Busy) => {
                info!("Recording start skipped, camera acquisition in progress");
                self.set_phase(RecordingPhase::Idle);
                return Ok(());
            }
            Err(e) => {
                self.set_phase(RecordingPhase::Idle);
                return Err(self.camera_failed(e));
            }
        };
        self.controls.show_placeholder(false);

        if let Err(e) = self.recorder.borrow_mut().start(&stream) {
            self.set_phase(RecordingPhase::Idle);
            let err = AppError::from(e);
            self.report(&err);
            return Err(err);
        }

        self.start_autoscroll();
        self.set_phase(RecordingPhase::Recording);
        info!("Recording started");
        Ok(())
    }

    fn stop_recording(&self) {
        if let Err(e) = self.recorder.borrow_mut().stop() {
            warn!("Recorder stop failed: {}", e);
        }
        self.autoscroll.borrow_mut().cancel(self.view.as_ref());
        self.set_phase(RecordingPhase::Finalizing);
        info!("Recording stopped, waiting for final data");
    }

    /// A data chunk from the recording device
    pub fn on_data_available(&self, chunk: C) {
        self.recorder.borrow_mut().push_chunk(chunk);
    }

    /// The recording device stopped; every chunk has been delivered
    pub fn on_recorder_stopped(&self) -> Result<(), AppError> {
        if self.phase.get() == RecordingPhase::Recording {
            // Device stopped on its own (e.g. the camera track ended)
            warn!("Recorder stopped without a stop request");
            self.autoscroll.borrow_mut().cancel(self.view.as_ref());
        }

        let finished = self.recorder.borrow_mut().finish(Utc::now());
        self.set_phase(RecordingPhase::Idle);

        let result = finished
            .map_err(AppError::from)
            .and_then(|file| {
                self.saver
                    .save(file, self.save_strategy)
                    .map_err(AppError::from)
            });
        if let Err(ref err) = result {
            self.report(err);
        }
        result
    }

    // ---- autoscroll ---------------------------------------------------

    fn start_autoscroll(&self) -> bool {
        let prefs = self.prefs.borrow();
        let started = self.autoscroll.borrow_mut().start(
            self.view.as_ref(),
            &prefs.script_text,
            prefs.scroll_speed_wpm,
            self.clock.now_ms(),
        );
        if !started {
            info!("Script fits the view, not scrolling");
        }
        started
    }

    /// Start or stop scrolling without recording
    pub fn toggle_autoscroll(&self) {
        if self.is_scrolling() {
            self.autoscroll.borrow_mut().cancel(self.view.as_ref());
        } else {
            self.start_autoscroll();
        }
        self.render();
    }

    /// Animation frame callback
    pub fn on_frame(&self, now: f64) {
        let tick = self.autoscroll.borrow_mut().tick(self.view.as_ref(), now);
        if tick == Tick::Finished {
            self.render();
        }
    }

    // ---- preferences --------------------------------------------------

    pub fn set_script_text(&self, text: &str) {
        self.prefs.borrow_mut().script_text = text.to_string();
        self.view.set_text(text);
        self.persist();
    }

    /// Set the scroll speed, clamped to the configured range
    pub fn set_scroll_speed(&self, wpm: u32) {
        let d = &self.config.defaults;
        let wpm = wpm.clamp(d.min_speed_wpm, d.max_speed_wpm);
        self.prefs.borrow_mut().scroll_speed_wpm = wpm;
        self.persist();
        self.render();
    }

    /// Set the script text size, clamped to the configured range
    pub fn set_text_size(&self, px: u32) {
        let d = &self.config.defaults;
        let px = px.clamp(d.min_text_size_px, d.max_text_size_px);
        self.prefs.borrow_mut().text_size_px = px;
        self.view.set_text_size(px);
        self.persist();
        self.render();
    }

    pub fn toggle_text_rotation(&self) {
        let rotated = {
            let mut prefs = self.prefs.borrow_mut();
            prefs.is_text_rotated = !prefs.is_text_rotated;
            prefs.is_text_rotated
        };
        self.view.set_rotated(rotated);
        self.persist();
        self.render();
    }

    // ---- panel geometry -----------------------------------------------

    pub fn pointer_down(&self, grip: Grip, at: Point) -> bool {
        self.geometry.borrow_mut().pointer_down(grip, at)
    }

    pub fn pointer_move(&self, at: Point) {
        self.geometry.borrow_mut().pointer_move(at);
    }

    pub fn pointer_up(&self) {
        let finished = self.geometry.borrow_mut().pointer_up();
        if let Some(rect) = finished {
            self.store_geometry(rect);
        }
    }

    pub fn touch_start(&self, grip: Option<Grip>, touches: &[Point]) -> bool {
        self.geometry.borrow_mut().touch_start(grip, touches)
    }

    pub fn touch_move(&self, touches: &[Point]) {
        self.geometry.borrow_mut().touch_move(touches);
    }

    pub fn touch_end(&self, remaining: &[Point]) {
        let finished = self.geometry.borrow_mut().touch_end(remaining);
        if let Some(rect) = finished {
            self.store_geometry(rect);
        }
    }

    /// Keep the panel inside a resized viewport
    pub fn on_viewport_resize(&self) {
        let rect = self.geometry.borrow().refit();
        self.store_geometry(rect);
    }

    fn store_geometry(&self, rect: Rect) {
        self.prefs.borrow_mut().box_geometry = Some(rect.into());
        self.persist();
    }
}
