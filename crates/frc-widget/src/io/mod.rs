//! Bridges the core to the browser.

pub mod console_log;
pub mod dom;
pub mod remote_config;
pub mod script;
pub mod sdk;

use wasm_bindgen::{JsCast, JsValue};

/// Best-effort message for a thrown JS value.
pub(crate) fn describe_js_error(value: &JsValue) -> String {
    if let Some(message) = value.as_string() {
        return message;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    match js_sys::JSON::stringify(value) {
        Ok(json) => String::from(json),
        Err(_) => "unknown error".to_string(),
    }
}
