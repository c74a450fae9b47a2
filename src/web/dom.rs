//! DOM-backed panel, script view, controls, storage and frame timing

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::closure::Closure;
use wasm_bindgen::{JsCast as _, JsValue};
use web_sys::{HtmlButtonElement, HtmlElement, HtmlInputElement, Storage, Window};

use tracing::warn;

use super::{error_text, CoordinatorSlot};
use crate::autoscroll::{Clock, FrameSchedule, ScrollView, Ticker};
use crate::coordinator::{ControlState, ControlSurface, RecordingPhase, ScriptView};
use crate::geometry::{Panel, Rect, Size};
use crate::preferences::PreferencesError;
use crate::storage::KeyValueStore;

const BANNER_MS: i32 = 6000;

/// `window.localStorage`
pub struct LocalStore(pub Storage);

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, PreferencesError> {
        self.0
            .get_item(key)
            .map_err(|e| PreferencesError::Storage(error_text(&e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), PreferencesError> {
        self.0
            .set_item(key, value)
            .map_err(|e| PreferencesError::Storage(error_text(&e)))
    }
}

fn set_style(el: &HtmlElement, property: &str, value: &str) {
    if let Err(e) = el.style().set_property(property, value) {
        warn!("Failed to set {}: {}", property, error_text(&e));
    }
}

fn pixels(value: Result<JsValue, JsValue>) -> f64 {
    value.ok().and_then(|v| v.as_f64()).unwrap_or(0.0)
}

/// The floating script panel, absolutely positioned in the viewport
pub struct DomPanel {
    window: Window,
    element: HtmlElement,
}

impl DomPanel {
    pub fn new(window: Window, element: HtmlElement) -> Self {
        Self { window, element }
    }
}

impl Panel for DomPanel {
    fn geometry(&self) -> Rect {
        let r = self.element.get_bounding_client_rect();
        Rect::new(r.left(), r.top(), r.width(), r.height())
    }

    fn set_geometry(&self, rect: Rect) {
        set_style(&self.element, "left", &format!("{}px", rect.left));
        set_style(&self.element, "top", &format!("{}px", rect.top));
        set_style(&self.element, "width", &format!("{}px", rect.width));
        set_style(&self.element, "height", &format!("{}px", rect.height));
    }

    fn viewport(&self) -> Size {
        Size::new(
            pixels(self.window.inner_width()),
            pixels(self.window.inner_height()),
        )
    }
}

/// Scroll container and the text element inside it
pub struct DomScriptView {
    scroller: HtmlElement,
    text: HtmlElement,
}

impl DomScriptView {
    pub fn new(scroller: HtmlElement, text: HtmlElement) -> Self {
        Self { scroller, text }
    }
}

impl ScrollView for DomScriptView {
    fn content_height(&self) -> f64 {
        f64::from(self.scroller.scroll_height())
    }

    fn viewport_height(&self) -> f64 {
        f64::from(self.scroller.client_height())
    }

    fn scroll_offset(&self) -> f64 {
        f64::from(self.scroller.scroll_top())
    }

    fn set_scroll_offset(&self, offset: f64) {
        self.scroller.scroll_to_with_x_and_y(0.0, offset);
    }
}

impl ScriptView for DomScriptView {
    fn set_text(&self, text: &str) {
        self.text.set_text_content(Some(text));
    }

    fn set_text_size(&self, px: u32) {
        set_style(&self.text, "font-size", &format!("{}px", px));
    }

    fn set_rotated(&self, rotated: bool) {
        set_style(
            &self.text,
            "transform",
            if rotated { "rotate(180deg)" } else { "none" },
        );
    }
}

type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// `requestAnimationFrame` loop feeding the coordinator while running
pub struct RafTicker {
    window: Window,
    schedule: Rc<FrameSchedule>,
    frame: FrameCallback,
}

fn request_frame(window: &Window, frame: &FrameCallback, schedule: &FrameSchedule) {
    if let Some(callback) = frame.borrow().as_ref() {
        match window.request_animation_frame(callback.as_ref().unchecked_ref()) {
            Ok(id) => schedule.requested(id),
            Err(e) => warn!("requestAnimationFrame failed: {}", error_text(&e)),
        }
    }
}

impl RafTicker {
    pub fn new(window: Window, slot: CoordinatorSlot) -> Self {
        let schedule = Rc::new(FrameSchedule::default());
        let frame: FrameCallback = Rc::new(RefCell::new(None));

        let (w, s, f) = (window.clone(), schedule.clone(), frame.clone());
        *frame.borrow_mut() = Some(Closure::wrap(Box::new(move |now: f64| {
            if !s.fired() {
                return;
            }
            if let Some(coordinator) = slot.get() {
                coordinator.on_frame(now);
            }
            // on_frame may have restarted the loop with its own request
            if s.needs_request() {
                request_frame(&w, &f, &s);
            }
        }) as Box<dyn FnMut(f64)>));

        Self {
            window,
            schedule,
            frame,
        }
    }
}

impl Ticker for RafTicker {
    fn start(&self) {
        if self.schedule.start() {
            request_frame(&self.window, &self.frame, &self.schedule);
        }
    }

    fn stop(&self) {
        if let Some(id) = self.schedule.stop() {
            if let Err(e) = self.window.cancel_animation_frame(id) {
                warn!("cancelAnimationFrame failed: {}", error_text(&e));
            }
        }
    }
}

/// `performance.now()`, the same timeline as animation frame timestamps
pub struct PerformanceClock(pub Window);

impl Clock for PerformanceClock {
    fn now_ms(&self) -> f64 {
        self.0.performance().map(|p| p.now()).unwrap_or(0.0)
    }
}

/// Buttons, sliders, the error banner and the camera placeholder
pub struct DomControls {
    pub window: Window,
    pub record_button: HtmlButtonElement,
    pub scroll_button: HtmlButtonElement,
    pub switch_button: HtmlButtonElement,
    pub rotate_button: HtmlButtonElement,
    pub speed_input: HtmlInputElement,
    pub size_input: HtmlInputElement,
    pub banner: HtmlElement,
    pub placeholder: HtmlElement,
}

impl ControlSurface for DomControls {
    fn render(&self, state: &ControlState) {
        self.record_button
            .set_text_content(Some(state.phase.button_label()));
        self.record_button.set_disabled(!matches!(
            state.phase,
            RecordingPhase::Idle | RecordingPhase::Recording
        ));
        self.scroll_button
            .set_text_content(Some(state.scroll_button_label()));
        self.switch_button
            .set_disabled(state.phase != RecordingPhase::Idle);
        self.rotate_button.set_text_content(Some(if state.is_text_rotated {
            "Unrotate Text"
        } else {
            "Rotate Text"
        }));
        self.speed_input
            .set_value(&state.scroll_speed_wpm.to_string());
        self.size_input.set_value(&state.text_size_px.to_string());
    }

    fn alert(&self, message: &str) {
        if let Err(e) = self.window.alert_with_message(message) {
            warn!("alert failed: {}", error_text(&e));
        }
    }

    fn banner(&self, message: &str) {
        self.banner.set_text_content(Some(message));
        set_style(&self.banner, "display", "block");

        let banner = self.banner.clone();
        let hide = Closure::once_into_js(move || set_style(&banner, "display", "none"));
        if let Err(e) = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(hide.unchecked_ref(), BANNER_MS)
        {
            warn!("Failed to schedule banner hide: {}", error_text(&e));
        }
    }

    fn show_placeholder(&self, visible: bool) {
        set_style(
            &self.placeholder,
            "display",
            if visible { "flex" } else { "none" },
        );
    }
}
