//! Outward notifications on the host element.

use js_sys::Reflect;
use wasm_bindgen::JsValue;
use web_sys::{CustomEvent, CustomEventInit, EventTarget};

use crate::core::events::{EventDetail, WidgetEvent};

/// Property holding the latest proof-of-work response on the host element.
pub const RESPONSE_PROPERTY: &str = "captchaResponse";

/// Dispatches `event` on `target` as a `CustomEvent` carrying `detail` unchanged.
pub fn dispatch_host_event(
    target: &EventTarget,
    event: WidgetEvent,
    detail: &JsValue,
) -> Result<(), JsValue> {
    let init = CustomEventInit::new();
    init.set_detail(detail);
    let custom_event = CustomEvent::new_with_event_init_dict(event.host_name(), &init)?;
    target.dispatch_event(&custom_event)?;
    Ok(())
}

/// Mirrors the response token of a `statechange` payload onto the host element.
pub fn expose_response(target: &EventTarget, detail: &JsValue) -> Result<(), JsValue> {
    let token = detail
        .response_token()
        .map_or(JsValue::UNDEFINED, |token| JsValue::from_str(&token));
    Reflect::set(target, &JsValue::from_str(RESPONSE_PROPERTY), &token)?;
    Ok(())
}

pub fn read_response(target: &EventTarget) -> Option<String> {
    Reflect::get(target, &JsValue::from_str(RESPONSE_PROPERTY))
        .ok()?
        .as_string()
}
