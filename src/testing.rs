//! In-memory fakes of the platform capabilities, shared by unit tests.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use futures_util::future::LocalBoxFuture;

use crate::autoscroll::{Clock, ScrollView, Ticker};
use crate::camera::{CameraError, CaptureConstraints, CaptureDevice, Facing, MediaStream, PreviewSurface};
use crate::coordinator::{ControlState, ControlSurface, ScriptView};
use crate::geometry::{Panel, Rect, Size};
use crate::preferences::PreferencesError;
use crate::recording::{FileSaver, RecordedFile, RecorderBackend, RecorderError, RecordingHandle, SaveError, SaveStrategy};
use crate::storage::{KeyValueStore, MemoryStore};

// ---- geometry ---------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct FakePanel {
    rect: Rc<Cell<Rect>>,
    viewport: Rc<Cell<Size>>,
}

impl FakePanel {
    pub(crate) fn new(rect: Rect, viewport: Size) -> Self {
        Self {
            rect: Rc::new(Cell::new(rect)),
            viewport: Rc::new(Cell::new(viewport)),
        }
    }

    pub(crate) fn set_viewport(&self, viewport: Size) {
        self.viewport.set(viewport);
    }
}

impl Panel for FakePanel {
    fn geometry(&self) -> Rect {
        self.rect.get()
    }

    fn set_geometry(&self, rect: Rect) {
        self.rect.set(rect);
    }

    fn viewport(&self) -> Size {
        self.viewport.get()
    }
}

// ---- script view / timing ---------------------------------------------------

#[derive(Clone)]
pub(crate) struct FakeScrollView {
    content_height: Rc<Cell<f64>>,
    viewport_height: f64,
    offset: Rc<Cell<f64>>,
    text: Rc<RefCell<String>>,
    text_size: Rc<Cell<u32>>,
    rotated: Rc<Cell<bool>>,
}

impl FakeScrollView {
    pub(crate) fn new(content_height: f64, viewport_height: f64) -> Self {
        Self {
            content_height: Rc::new(Cell::new(content_height)),
            viewport_height,
            offset: Rc::new(Cell::new(0.0)),
            text: Rc::new(RefCell::new(String::new())),
            text_size: Rc::new(Cell::new(0)),
            rotated: Rc::new(Cell::new(false)),
        }
    }

    pub(crate) fn set_content_height(&self, height: f64) {
        self.content_height.set(height);
    }

    pub(crate) fn text(&self) -> String {
        self.text.borrow().clone()
    }

    pub(crate) fn text_size(&self) -> u32 {
        self.text_size.get()
    }

    pub(crate) fn is_rotated(&self) -> bool {
        self.rotated.get()
    }
}

impl ScrollView for FakeScrollView {
    fn content_height(&self) -> f64 {
        self.content_height.get()
    }

    fn viewport_height(&self) -> f64 {
        self.viewport_height
    }

    fn scroll_offset(&self) -> f64 {
        self.offset.get()
    }

    fn set_scroll_offset(&self, offset: f64) {
        self.offset.set(offset);
    }
}

impl ScriptView for FakeScrollView {
    fn set_text(&self, text: &str) {
        *self.text.borrow_mut() = text.to_string();
    }

    fn set_text_size(&self, px: u32) {
        self.text_size.set(px);
    }

    fn set_rotated(&self, rotated: bool) {
        self.rotated.set(rotated);
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeTicker {
    running: Rc<Cell<bool>>,
    stops: Rc<Cell<usize>>,
}

impl FakeTicker {
    pub(crate) fn is_running(&self) -> bool {
        self.running.get()
    }

    pub(crate) fn stop_count(&self) -> usize {
        self.stops.get()
    }
}

impl Ticker for FakeTicker {
    fn start(&self) {
        self.running.set(true);
    }

    fn stop(&self) {
        self.running.set(false);
        self.stops.set(self.stops.get() + 1);
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeClock(Rc<Cell<f64>>);

impl FakeClock {
    pub(crate) fn set(&self, now: f64) {
        self.0.set(now);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> f64 {
        self.0.get()
    }
}

// ---- camera -----------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DeviceEvent {
    Acquire(Facing),
    Stop(u32),
}

type EventLog = Rc<RefCell<Vec<DeviceEvent>>>;

#[derive(Clone)]
pub(crate) struct FakeStream {
    id: u32,
    stopped: Rc<Cell<bool>>,
    log: Option<EventLog>,
}

impl FakeStream {
    pub(crate) fn new(id: u32) -> Self {
        Self {
            id,
            stopped: Rc::new(Cell::new(false)),
            log: None,
        }
    }

    pub(crate) fn id(&self) -> u32 {
        self.id
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped.get()
    }
}

impl MediaStream for FakeStream {
    fn stop_all_tracks(&self) {
        self.stopped.set(true);
        if let Some(log) = &self.log {
            log.borrow_mut().push(DeviceEvent::Stop(self.id));
        }
    }
}

/// Future that stays pending until the gate is opened
struct GateFuture {
    gate: Gate,
}

#[derive(Clone, Default)]
struct Gate {
    open: Rc<Cell<bool>>,
    waker: Rc<RefCell<Option<Waker>>>,
}

impl Future for GateFuture {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.gate.open.get() {
            Poll::Ready(())
        } else {
            *self.gate.waker.borrow_mut() = Some(cx.waker().clone());
            Poll::Pending
        }
    }
}

#[derive(Clone)]
pub(crate) struct FakeCaptureDevice {
    log: EventLog,
    next_id: Rc<Cell<u32>>,
    denied: Rc<Cell<bool>>,
    constraints: Rc<RefCell<Option<CaptureConstraints>>>,
    gate: Gate,
}

impl Default for FakeCaptureDevice {
    fn default() -> Self {
        let gate = Gate::default();
        gate.open.set(true);
        Self {
            log: EventLog::default(),
            next_id: Rc::new(Cell::new(1)),
            denied: Rc::new(Cell::new(false)),
            constraints: Rc::new(RefCell::new(None)),
            gate,
        }
    }
}

impl FakeCaptureDevice {
    pub(crate) fn deny(&self, denied: bool) {
        self.denied.set(denied);
    }

    /// Make acquisitions wait until `release` is called
    pub(crate) fn hold(&self) {
        self.gate.open.set(false);
    }

    pub(crate) fn release(&self) {
        self.gate.open.set(true);
        if let Some(waker) = self.gate.waker.borrow_mut().take() {
            waker.wake();
        }
    }

    pub(crate) fn events(&self) -> Vec<DeviceEvent> {
        self.log.borrow().clone()
    }

    pub(crate) fn acquire_count(&self) -> usize {
        self.log
            .borrow()
            .iter()
            .filter(|e| matches!(e, DeviceEvent::Acquire(_)))
            .count()
    }

    pub(crate) fn last_constraints(&self) -> Option<CaptureConstraints> {
        self.constraints.borrow().clone()
    }
}

impl CaptureDevice<FakeStream> for FakeCaptureDevice {
    fn acquire(
        &self,
        constraints: &CaptureConstraints,
    ) -> LocalBoxFuture<'_, Result<FakeStream, CameraError>> {
        self.log
            .borrow_mut()
            .push(DeviceEvent::Acquire(constraints.facing));
        *self.constraints.borrow_mut() = Some(constraints.clone());
        let gate = self.gate.clone();
        Box::pin(async move {
            GateFuture { gate }.await;
            if self.denied.get() {
                return Err(CameraError::PermissionDenied("NotAllowedError".into()));
            }
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            Ok(FakeStream {
                id,
                stopped: Rc::new(Cell::new(false)),
                log: Some(self.log.clone()),
            })
        })
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakePreview {
    attached: Rc<Cell<Option<u32>>>,
}

impl FakePreview {
    pub(crate) fn attached(&self) -> Option<u32> {
        self.attached.get()
    }
}

impl PreviewSurface<FakeStream> for FakePreview {
    fn attach(&self, stream: &FakeStream) {
        self.attached.set(Some(stream.id()));
    }

    fn detach(&self) {
        self.attached.set(None);
    }
}

// ---- recording --------------------------------------------------------------

#[derive(Clone, Default)]
pub(crate) struct FakeRecorderBackend {
    supported: Rc<Vec<String>>,
    reported: Option<String>,
    started: Rc<RefCell<Vec<(String, u32)>>>,
    stopped: Rc<Cell<bool>>,
}

impl FakeRecorderBackend {
    pub(crate) fn supporting(types: &[&str]) -> Self {
        Self {
            supported: Rc::new(types.iter().map(|s| s.to_string()).collect()),
            ..Self::default()
        }
    }

    /// Report a different MIME type than the one requested
    pub(crate) fn reporting(mut self, mime: &str) -> Self {
        self.reported = Some(mime.to_string());
        self
    }

    pub(crate) fn started_with(&self) -> Option<(String, u32)> {
        self.started.borrow().last().cloned()
    }

    pub(crate) fn start_count(&self) -> usize {
        self.started.borrow().len()
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stopped.get()
    }
}

struct FakeRecordingHandle {
    mime: String,
    stopped: Rc<Cell<bool>>,
}

impl RecordingHandle for FakeRecordingHandle {
    fn mime_type(&self) -> String {
        self.mime.clone()
    }

    fn stop(&mut self) {
        self.stopped.set(true);
    }
}

impl RecorderBackend<FakeStream> for FakeRecorderBackend {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        self.supported.iter().any(|s| s == mime_type)
    }

    fn start(
        &self,
        _stream: &FakeStream,
        mime_type: &str,
        timeslice_ms: u32,
    ) -> Result<Box<dyn RecordingHandle>, RecorderError> {
        self.started
            .borrow_mut()
            .push((mime_type.to_string(), timeslice_ms));
        self.stopped.set(false);
        Ok(Box::new(FakeRecordingHandle {
            mime: self.reported.clone().unwrap_or_else(|| mime_type.to_string()),
            stopped: self.stopped.clone(),
        }))
    }
}

type SavedFile = (RecordedFile<Vec<u8>>, SaveStrategy);

#[derive(Clone, Default)]
pub(crate) struct FakeSaver {
    saved: Rc<RefCell<Vec<SavedFile>>>,
}

impl FakeSaver {
    pub(crate) fn saved(&self) -> Vec<SavedFile> {
        self.saved.borrow().clone()
    }
}

impl FileSaver<Vec<u8>> for FakeSaver {
    fn save(&self, file: RecordedFile<Vec<u8>>, strategy: SaveStrategy) -> Result<(), SaveError> {
        self.saved.borrow_mut().push((file, strategy));
        Ok(())
    }
}

// ---- storage / controls -----------------------------------------------------

/// MemoryStore handle that can be inspected after being boxed
#[derive(Clone, Default)]
pub(crate) struct SharedStore(pub(crate) Rc<MemoryStore>);

impl KeyValueStore for SharedStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferencesError> {
        self.0.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferencesError> {
        self.0.set(key, value)
    }
}

/// Storage that rejects every access (privacy mode, quota exceeded)
pub(crate) struct FailingStore;

impl KeyValueStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, PreferencesError> {
        Err(PreferencesError::Storage("SecurityError".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), PreferencesError> {
        Err(PreferencesError::Storage("QuotaExceededError".into()))
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeControls {
    renders: Rc<RefCell<Vec<ControlState>>>,
    alerts: Rc<RefCell<Vec<String>>>,
    banners: Rc<RefCell<Vec<String>>>,
    placeholder: Rc<Cell<Option<bool>>>,
}

impl FakeControls {
    pub(crate) fn last_render(&self) -> Option<ControlState> {
        self.renders.borrow().last().cloned()
    }

    pub(crate) fn alerts(&self) -> Vec<String> {
        self.alerts.borrow().clone()
    }

    pub(crate) fn banners(&self) -> Vec<String> {
        self.banners.borrow().clone()
    }

    pub(crate) fn placeholder(&self) -> Option<bool> {
        self.placeholder.get()
    }
}

impl ControlSurface for FakeControls {
    fn render(&self, state: &ControlState) {
        self.renders.borrow_mut().push(state.clone());
    }

    fn alert(&self, message: &str) {
        self.alerts.borrow_mut().push(message.to_string());
    }

    fn banner(&self, message: &str) {
        self.banners.borrow_mut().push(message.to_string());
    }

    fn show_placeholder(&self, visible: bool) {
        self.placeholder.set(Some(visible));
    }
}
