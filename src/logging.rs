//! Logging setup
//!
//! Formats `tracing` events with `tracing_subscriber::fmt`. In the browser
//! each line goes to the developer console; natively it goes to stderr.

use std::io::{self, Write};

use tracing::Level;

/// Install the global subscriber; later calls are no-ops
pub fn init(max_level: Level) {
    let installed = tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_writer(LineWriter::default)
        .try_init()
        .is_ok();
    if installed {
        tracing::debug!("Logging initialized at {}", max_level);
    }
}

/// Buffers one formatted event and emits it as a single line on drop
#[derive(Default)]
struct LineWriter {
    buf: Vec<u8>,
}

impl LineWriter {
    fn line(&self) -> Option<String> {
        let text = String::from_utf8_lossy(&self.buf);
        let text = text.trim_end();
        (!text.is_empty()).then(|| text.to_string())
    }
}

impl Write for LineWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        if let Some(line) = self.line() {
            emit(&line);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn emit(line: &str) {
    let value = wasm_bindgen::JsValue::from_str(line);
    if line.starts_with("ERROR") {
        web_sys::console::error_1(&value);
    } else if line.starts_with(" WARN") || line.starts_with("WARN") {
        web_sys::console::warn_1(&value);
    } else {
        web_sys::console::log_1(&value);
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn emit(line: &str) {
    eprintln!("{}", line);
}
