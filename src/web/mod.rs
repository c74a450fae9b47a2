//! Browser bootstrap
//!
//! Looks up the page elements, builds the coordinator from the DOM and
//! media implementations in this module and wires every DOM event to it.
//! Errors that escape a handler are reported as runtime faults.

mod dom;
mod media;

pub use dom::{DomControls, DomPanel, DomScriptView, LocalStore, PerformanceClock, RafTicker};
pub use media::{BlobChunk, BlobSaver, MediaRecorderBackend, UserMedia, VideoPreview, WebStream};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::{info, warn, Level};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast as _;
use wasm_bindgen_futures::spawn_local;
use web_sys::{
    Document, Element, Event, EventTarget, HtmlElement, HtmlInputElement, HtmlTextAreaElement,
    PointerEvent, TouchEvent, TouchList, Window,
};

use crate::config::AppConfig;
use crate::coordinator::{Components, Coordinator};
use crate::geometry::{Grip, Point};
use crate::recording::SaveStrategy;
use crate::storage::{KeyValueStore, MemoryStore};

pub type WebCoordinator = Coordinator<WebStream, BlobChunk>;

/// Late-bound handle for callbacks created before the coordinator exists
#[derive(Clone, Default)]
pub struct CoordinatorSlot(Rc<RefCell<Weak<WebCoordinator>>>);

impl CoordinatorSlot {
    pub fn get(&self) -> Option<Rc<WebCoordinator>> {
        self.0.borrow().upgrade()
    }

    fn bind(&self, coordinator: &Rc<WebCoordinator>) {
        *self.0.borrow_mut() = Rc::downgrade(coordinator);
    }
}

/// Best-effort text of a thrown JS value
pub(crate) fn error_text(err: &JsValue) -> String {
    if let Some(s) = err.as_string() {
        return s;
    }
    js_sys::Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", err))
}

fn by_id<T: JsCast>(document: &Document, id: &str) -> Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("missing element #{}", id)))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("element #{} has the wrong type", id)))
}

fn listen<E: JsCast + 'static>(
    target: &EventTarget,
    event: &str,
    handler: impl FnMut(E) + 'static,
) -> Result<(), JsValue> {
    let mut handler = handler;
    let callback = Closure::wrap(Box::new(move |e: Event| {
        if let Ok(e) = e.dyn_into::<E>() {
            handler(e);
        }
    }) as Box<dyn FnMut(Event)>);
    target.add_event_listener_with_callback(event, callback.as_ref().unchecked_ref())?;
    callback.forget();
    Ok(())
}

/// Grip owning an event target, from the `data-grip` attributes on its
/// ancestor chain
fn grip_of(target: Option<EventTarget>) -> Option<Grip> {
    let mut hits = Vec::new();
    let mut next = target?.dyn_into::<Element>().ok();
    while let Some(element) = next {
        let Some(hit) = element.closest("[data-grip]").ok().flatten() else {
            break;
        };
        if let Some(grip) = hit.get_attribute("data-grip").as_deref().and_then(Grip::from_attr) {
            hits.push(grip);
        }
        next = hit.parent_element();
    }
    Grip::resolve(&hits)
}

fn touch_points(list: &TouchList) -> Vec<Point> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .map(|t| Point::new(f64::from(t.client_x()), f64::from(t.client_y())))
        .collect()
}

fn input_number(input: &HtmlInputElement) -> Option<u32> {
    input.value().trim().parse().ok()
}

fn storage(window: &Window) -> Box<dyn KeyValueStore> {
    match window.local_storage() {
        Ok(Some(storage)) => Box::new(LocalStore(storage)),
        _ => {
            warn!("localStorage unavailable, settings will not persist");
            Box::new(MemoryStore::new())
        }
    }
}

/// Run an async coordinator action on the local executor
fn spawn<F>(coordinator: &Rc<WebCoordinator>, task: impl FnOnce(Rc<WebCoordinator>) -> F + 'static)
where
    F: std::future::Future<Output = Result<(), crate::AppError>> + 'static,
{
    let coordinator = coordinator.clone();
    spawn_local(async move {
        // failures are reported to the user by the coordinator itself
        if let Err(e) = task(coordinator).await {
            info!("Action failed: {}", e);
        }
    });
}

/// Log panics to the console and show the refresh banner
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        console_error_panic_hook::hook(info);
        let banner = web_sys::window()
            .and_then(|w| w.document())
            .and_then(|d| d.get_element_by_id("error-banner"))
            .and_then(|e| e.dyn_into::<HtmlElement>().ok());
        if let Some(banner) = banner {
            let message = crate::AppError::UnhandledRuntimeFault(String::new()).user_message();
            banner.set_text_content(Some(&message));
            let _ = banner.style().set_property("display", "block");
        }
    }));
}

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    install_panic_hook();
    crate::logging::init(if cfg!(debug_assertions) {
        Level::DEBUG
    } else {
        Level::INFO
    });

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;

    let config = AppConfig::embedded().clone();
    let user_agent = window.navigator().user_agent().unwrap_or_default();
    let save_strategy = SaveStrategy::for_user_agent(&user_agent);
    info!("Starting teleprompter ({:?})", save_strategy);

    let slot = CoordinatorSlot::default();
    let panel: HtmlElement = by_id(&document, "script-panel")?;
    let script_input: HtmlTextAreaElement = by_id(&document, "script-input")?;
    let controls = DomControls {
        window: window.clone(),
        record_button: by_id(&document, "record-button")?,
        scroll_button: by_id(&document, "scroll-button")?,
        switch_button: by_id(&document, "switch-camera-button")?,
        rotate_button: by_id(&document, "rotate-button")?,
        speed_input: by_id(&document, "speed-input")?,
        size_input: by_id(&document, "text-size-input")?,
        banner: by_id(&document, "error-banner")?,
        placeholder: by_id(&document, "camera-placeholder")?,
    };
    let (record_button, scroll_button, switch_button, rotate_button) = (
        controls.record_button.clone(),
        controls.scroll_button.clone(),
        controls.switch_button.clone(),
        controls.rotate_button.clone(),
    );
    let (speed_input, size_input) = (controls.speed_input.clone(), controls.size_input.clone());

    let components = Components {
        capture: Box::new(UserMedia::new(window.clone())),
        preview: Box::new(VideoPreview::new(by_id(&document, "camera-preview")?)),
        recorder: Box::new(MediaRecorderBackend::new(slot.clone())),
        saver: Box::new(BlobSaver::new(
            window.clone(),
            document.clone(),
            config.save.revoke_delay_ms,
        )),
        storage: storage(&window),
        view: Box::new(DomScriptView::new(
            by_id(&document, "script-scroll")?,
            by_id(&document, "script-text")?,
        )),
        panel: Box::new(DomPanel::new(window.clone(), panel.clone())),
        ticker: Box::new(RafTicker::new(window.clone(), slot.clone())),
        clock: Box::new(PerformanceClock(window.clone())),
        controls: Box::new(controls),
        save_strategy,
    };
    let coordinator = Rc::new(Coordinator::new(components, config));
    slot.bind(&coordinator);
    script_input.set_value(&coordinator.preferences().script_text);

    // controls
    let c = coordinator.clone();
    listen(&record_button, "click", move |_: Event| {
        spawn(&c, |c| async move { c.toggle_recording().await });
    })?;
    let c = coordinator.clone();
    listen(&switch_button, "click", move |_: Event| {
        spawn(&c, |c| async move { c.switch_camera().await });
    })?;
    let c = coordinator.clone();
    listen(&scroll_button, "click", move |_: Event| c.toggle_autoscroll())?;
    let c = coordinator.clone();
    listen(&rotate_button, "click", move |_: Event| c.toggle_text_rotation())?;
    let c = coordinator.clone();
    let input = speed_input.clone();
    listen(&speed_input, "change", move |_: Event| {
        if let Some(wpm) = input_number(&input) {
            c.set_scroll_speed(wpm);
        }
    })?;
    let c = coordinator.clone();
    let input = size_input.clone();
    listen(&size_input, "input", move |_: Event| {
        if let Some(px) = input_number(&input) {
            c.set_text_size(px);
        }
    })?;
    let c = coordinator.clone();
    let input = script_input.clone();
    listen(&script_input, "input", move |_: Event| {
        c.set_script_text(&input.value())
    })?;

    // panel gestures; moves and releases are tracked on the window so a
    // fast drag cannot outrun the panel
    let c = coordinator.clone();
    listen(&panel, "pointerdown", move |e: PointerEvent| {
        if e.pointer_type() == "touch" {
            return;
        }
        if let Some(grip) = grip_of(e.target()) {
            let at = Point::new(f64::from(e.client_x()), f64::from(e.client_y()));
            if c.pointer_down(grip, at) {
                e.prevent_default();
            }
        }
    })?;
    let c = coordinator.clone();
    listen(&window, "pointermove", move |e: PointerEvent| {
        if e.pointer_type() != "touch" {
            c.pointer_move(Point::new(f64::from(e.client_x()), f64::from(e.client_y())));
        }
    })?;
    let c = coordinator.clone();
    listen(&window, "pointerup", move |e: PointerEvent| {
        if e.pointer_type() != "touch" {
            c.pointer_up();
        }
    })?;
    let c = coordinator.clone();
    listen(&panel, "touchstart", move |e: TouchEvent| {
        let grip = grip_of(e.target());
        if c.touch_start(grip, &touch_points(&e.touches())) {
            e.prevent_default();
        }
    })?;
    let c = coordinator.clone();
    listen(&panel, "touchmove", move |e: TouchEvent| {
        c.touch_move(&touch_points(&e.touches()));
    })?;
    for event in ["touchend", "touchcancel"] {
        let c = coordinator.clone();
        listen(&panel, event, move |e: TouchEvent| {
            c.touch_end(&touch_points(&e.touches()));
        })?;
    }
    let c = coordinator.clone();
    listen(&window, "resize", move |_: Event| c.on_viewport_resize())?;

    // top-level faults
    let c = coordinator.clone();
    listen(&window, "error", move |e: web_sys::ErrorEvent| c.report_fault(e.message()))?;
    let c = coordinator.clone();
    listen(&window, "unhandledrejection", move |e: Event| {
        let reason = js_sys::Reflect::get(&e, &JsValue::from_str("reason"))
            .map(|r| error_text(&r))
            .unwrap_or_else(|_| "unhandled rejection".to_string());
        c.report_fault(reason);
    })?;

    spawn(&coordinator, |c| async move { c.start_camera().await });
    info!("Teleprompter ready");
    Ok(())
}
