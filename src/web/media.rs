//! Camera, recorder and download plumbing over the browser media APIs

use futures_util::future::LocalBoxFuture;
use js_sys::{Array, Object, Reflect};
use wasm_bindgen::closure::Closure;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast as _;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    Blob, BlobEvent, BlobPropertyBag, Document, HtmlAnchorElement, HtmlVideoElement,
    MediaRecorder, MediaRecorderOptions, MediaStreamConstraints, MediaStreamTrack, Url, Window,
};

use tracing::{debug, warn};

use super::{error_text, CoordinatorSlot};
use crate::camera::{CameraError, CaptureConstraints, CaptureDevice, MediaStream, PreviewSurface};
use crate::recording::{
    FileSaver, MediaChunk, RecordedFile, RecorderBackend, RecorderError, RecordingHandle,
    SaveError, SaveStrategy, MANUAL_SAVE_INSTRUCTIONS,
};

/// Browser capture stream; clones share the same tracks
#[derive(Clone)]
pub struct WebStream(pub web_sys::MediaStream);

impl MediaStream for WebStream {
    fn stop_all_tracks(&self) {
        for track in self.0.get_tracks().iter() {
            if let Ok(track) = track.dyn_into::<MediaStreamTrack>() {
                track.stop();
            }
        }
    }
}

/// Recorder data chunk
#[derive(Clone)]
pub struct BlobChunk(pub Blob);

impl MediaChunk for BlobChunk {
    fn byte_len(&self) -> u64 {
        self.0.size() as u64
    }
}

fn set(target: &Object, key: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), value).map(|_| ())
}

fn ideal(value: u32) -> Result<JsValue, JsValue> {
    let obj = Object::new();
    set(&obj, "ideal", &JsValue::from(value))?;
    Ok(obj.into())
}

fn constraints_js(constraints: &CaptureConstraints) -> Result<MediaStreamConstraints, JsValue> {
    let video = Object::new();
    set(&video, "width", &ideal(constraints.width)?)?;
    set(&video, "height", &ideal(constraints.height)?)?;
    set(&video, "frameRate", &ideal(constraints.frame_rate)?)?;
    set(
        &video,
        "facingMode",
        &JsValue::from_str(constraints.facing.as_constraint()),
    )?;

    let js = MediaStreamConstraints::new();
    js.set_video(&video);
    js.set_audio(&JsValue::from_bool(constraints.audio));
    Ok(js)
}

fn camera_error(err: JsValue) -> CameraError {
    let name = Reflect::get(&err, &JsValue::from_str("name"))
        .ok()
        .and_then(|n| n.as_string())
        .unwrap_or_default();
    match name.as_str() {
        "NotAllowedError" | "SecurityError" => CameraError::PermissionDenied(error_text(&err)),
        "NotFoundError" | "OverconstrainedError" => CameraError::NoDevice,
        _ => CameraError::Device(error_text(&err)),
    }
}

/// `navigator.mediaDevices.getUserMedia`
pub struct UserMedia {
    window: Window,
}

impl UserMedia {
    pub fn new(window: Window) -> Self {
        Self { window }
    }

    async fn get_user_media(&self, constraints: &CaptureConstraints) -> Result<WebStream, CameraError> {
        let devices = self
            .window
            .navigator()
            .media_devices()
            .map_err(|_| CameraError::NoDevice)?;
        let js = constraints_js(constraints).map_err(camera_error)?;
        let promise = devices
            .get_user_media_with_constraints(&js)
            .map_err(camera_error)?;
        let stream = JsFuture::from(promise).await.map_err(camera_error)?;
        stream
            .dyn_into::<web_sys::MediaStream>()
            .map(WebStream)
            .map_err(|_| CameraError::Device("getUserMedia returned no stream".into()))
    }
}

impl CaptureDevice<WebStream> for UserMedia {
    fn acquire(
        &self,
        constraints: &CaptureConstraints,
    ) -> LocalBoxFuture<'_, Result<WebStream, CameraError>> {
        let constraints = constraints.clone();
        Box::pin(async move { self.get_user_media(&constraints).await })
    }
}

/// Muted inline `<video>` behind the panel
pub struct VideoPreview {
    video: HtmlVideoElement,
}

impl VideoPreview {
    pub fn new(video: HtmlVideoElement) -> Self {
        video.set_muted(true);
        video.set_autoplay(true);
        Self { video }
    }
}

impl PreviewSurface<WebStream> for VideoPreview {
    fn attach(&self, stream: &WebStream) {
        self.video.set_src_object(Some(&stream.0));
        if let Err(e) = self.video.play() {
            warn!("Preview playback failed: {}", error_text(&e));
        }
    }

    fn detach(&self) {
        self.video.set_src_object(None);
    }
}

/// `MediaRecorder` backend; data and stop events are forwarded to the
/// coordinator through the shared slot
pub struct MediaRecorderBackend {
    slot: CoordinatorSlot,
}

impl MediaRecorderBackend {
    pub fn new(slot: CoordinatorSlot) -> Self {
        Self { slot }
    }
}

struct MediaRecorderHandle {
    recorder: MediaRecorder,
}

impl RecordingHandle for MediaRecorderHandle {
    fn mime_type(&self) -> String {
        self.recorder.mime_type()
    }

    fn stop(&mut self) {
        if let Err(e) = self.recorder.stop() {
            warn!("MediaRecorder.stop failed: {}", error_text(&e));
        }
    }
}

impl RecorderBackend<WebStream> for MediaRecorderBackend {
    fn is_type_supported(&self, mime_type: &str) -> bool {
        MediaRecorder::is_type_supported(mime_type)
    }

    fn start(
        &self,
        stream: &WebStream,
        mime_type: &str,
        timeslice_ms: u32,
    ) -> Result<Box<dyn RecordingHandle>, RecorderError> {
        let options = MediaRecorderOptions::new();
        options.set_mime_type(mime_type);
        let recorder =
            MediaRecorder::new_with_media_stream_and_media_recorder_options(&stream.0, &options)
                .map_err(|e| RecorderError::Start(error_text(&e)))?;

        let slot = self.slot.clone();
        let on_data = Closure::wrap(Box::new(move |event: BlobEvent| {
            if let (Some(blob), Some(coordinator)) = (event.data(), slot.get()) {
                coordinator.on_data_available(BlobChunk(blob));
            }
        }) as Box<dyn FnMut(BlobEvent)>);
        recorder.set_ondataavailable(Some(on_data.as_ref().unchecked_ref()));
        on_data.forget();

        let slot = self.slot.clone();
        let on_stop = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            if let Some(coordinator) = slot.get() {
                // errors are already reported to the user
                let _ = coordinator.on_recorder_stopped();
            }
        }) as Box<dyn FnMut(web_sys::Event)>);
        recorder.set_onstop(Some(on_stop.as_ref().unchecked_ref()));
        // the stop handler drops this recorder's handle, so it cannot own the closure
        on_stop.forget();

        let timeslice = i32::try_from(timeslice_ms).unwrap_or(i32::MAX);
        recorder
            .start_with_time_slice(timeslice)
            .map_err(|e| RecorderError::Start(error_text(&e)))?;

        Ok(Box::new(MediaRecorderHandle { recorder }))
    }
}

/// Delivers recordings through an object URL
pub struct BlobSaver {
    window: Window,
    document: Document,
    revoke_delay_ms: u32,
}

impl BlobSaver {
    pub fn new(window: Window, document: Document, revoke_delay_ms: u32) -> Self {
        Self {
            window,
            document,
            revoke_delay_ms,
        }
    }

    fn blob(file: &RecordedFile<BlobChunk>) -> Result<Blob, JsValue> {
        let parts: Array = file.chunks.iter().map(|c| JsValue::from(c.0.clone())).collect();
        let options = BlobPropertyBag::new();
        options.set_type(&file.mime_type);
        Blob::new_with_blob_sequence_and_options(&parts, &options)
    }

    fn download(&self, url: &str, filename: &str) -> Result<(), JsValue> {
        let anchor: HtmlAnchorElement = self.document.create_element("a")?.unchecked_into();
        anchor.set_href(url);
        anchor.set_download(filename);
        anchor.style().set_property("display", "none")?;
        if let Some(body) = self.document.body() {
            body.append_child(&anchor)?;
            anchor.click();
            body.remove_child(&anchor)?;
        } else {
            anchor.click();
        }

        let url = url.to_string();
        let revoke = Closure::once_into_js(move || {
            let _ = Url::revoke_object_url(&url);
        });
        self.window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                revoke.unchecked_ref(),
                i32::try_from(self.revoke_delay_ms).unwrap_or(i32::MAX),
            )
            .map(|_| ())
    }

    fn open(&self, url: &str, file: &RecordedFile<BlobChunk>) -> Result<(), SaveError> {
        let view = self
            .window
            .open_with_url_and_target("", "_blank")
            .map_err(|e| SaveError::Open(error_text(&e)))?
            .ok_or_else(|| SaveError::Open("popup blocked".into()))?;
        let body = view
            .document()
            .and_then(|d| d.body())
            .ok_or_else(|| SaveError::Open("new view has no document".into()))?;
        body.set_inner_html(&format!(
            "<p style=\"font-family: sans-serif; padding: 12px;\">{}</p>\
             <video src=\"{}\" controls playsinline style=\"width: 100%;\"></video>\
             <p style=\"font-family: sans-serif; padding: 12px; color: #666;\">{}</p>",
            MANUAL_SAVE_INSTRUCTIONS, url, file.filename
        ));
        Ok(())
    }
}

impl FileSaver<BlobChunk> for BlobSaver {
    fn save(&self, file: RecordedFile<BlobChunk>, strategy: SaveStrategy) -> Result<(), SaveError> {
        let blob = Self::blob(&file).map_err(|e| SaveError::Create(error_text(&e)))?;
        let url =
            Url::create_object_url_with_blob(&blob).map_err(|e| SaveError::Create(error_text(&e)))?;
        debug!("Saving {} ({} bytes) via {:?}", file.filename, file.size(), strategy);

        match strategy {
            SaveStrategy::AnchorDownload => self
                .download(&url, &file.filename)
                .map_err(|e| SaveError::Open(error_text(&e))),
            // the new view keeps using the URL, so it is not revoked
            SaveStrategy::OpenInNewView => self.open(&url, &file),
        }
    }
}
