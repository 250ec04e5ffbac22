//! `window.frcaptcha` binding.

use js_sys::{Function, Object, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{CustomEvent, Event, HtmlElement};

use super::describe_js_error;
use crate::core::config::WidgetConfig;
use crate::core::events::{EventDetail, WidgetEvent};
use crate::core::sdk::{CaptchaSdk, CaptchaWidget, Listener, WidgetCreateError};

#[wasm_bindgen]
extern "C" {
    /// Handle returned by `createWidget`.
    #[derive(Clone, Debug)]
    type WidgetHandle;

    #[wasm_bindgen(method)]
    fn reset(this: &WidgetHandle);

    #[wasm_bindgen(method)]
    fn destroy(this: &WidgetHandle);

    #[wasm_bindgen(method, js_name = addEventListener)]
    fn add_event_listener(this: &WidgetHandle, name: &str, listener: &Function);

    #[wasm_bindgen(method, js_name = removeEventListener)]
    fn remove_event_listener(this: &WidgetHandle, name: &str, listener: &Function);
}

impl EventDetail for JsValue {
    fn response_token(&self) -> Option<String> {
        Reflect::get(self, &JsValue::from_str("response"))
            .ok()?
            .as_string()
    }
}

/// The SDK reached through a global on `window`.
#[derive(Clone, Debug)]
pub struct BrowserSdk {
    global: String,
}

impl BrowserSdk {
    pub fn new(global: impl Into<String>) -> Self {
        Self {
            global: global.into(),
        }
    }

    fn namespace(&self) -> Result<JsValue, WidgetCreateError> {
        let window = web_sys::window().ok_or_else(|| WidgetCreateError("no window".to_string()))?;
        let namespace = Reflect::get(&window, &JsValue::from_str(&self.global))
            .map_err(|error| WidgetCreateError(describe_js_error(&error)))?;
        if namespace.is_undefined() || namespace.is_null() {
            return Err(WidgetCreateError(format!("window.{} is not defined", self.global)));
        }
        Ok(namespace)
    }
}

fn widget_options(mount: &HtmlElement, config: &WidgetConfig) -> Object {
    let options = Object::new();
    let set = |key: &str, value: &JsValue| {
        let _ = Reflect::set(&options, &JsValue::from_str(key), value);
    };
    set("element", mount);
    set("sitekey", &JsValue::from_str(config.sitekey()));
    set("apiEndpoint", &JsValue::from_str(&config.api_endpoint));
    set("startMode", &JsValue::from_str(config.start_mode.as_str()));
    set("theme", &JsValue::from_str(config.theme.as_str()));
    if let Some(language) = &config.language {
        set("language", &JsValue::from_str(language));
    }
    options
}

impl CaptchaSdk for BrowserSdk {
    type Mount = HtmlElement;
    type Widget = BrowserWidget;

    fn create_widget(
        &self,
        mount: &HtmlElement,
        config: &WidgetConfig,
    ) -> Result<BrowserWidget, WidgetCreateError> {
        let namespace = self.namespace()?;
        let create_widget: Function = Reflect::get(&namespace, &JsValue::from_str("createWidget"))
            .ok()
            .and_then(|create| create.dyn_into().ok())
            .ok_or_else(|| {
                WidgetCreateError(format!("window.{}.createWidget is not a function", self.global))
            })?;
        let handle = create_widget
            .call1(&namespace, &widget_options(mount, config))
            .map_err(|error| WidgetCreateError(describe_js_error(&error)))?;
        Ok(BrowserWidget {
            handle: handle.unchecked_into(),
        })
    }
}

pub struct BrowserWidget {
    handle: WidgetHandle,
}

impl CaptchaWidget for BrowserWidget {
    type Payload = JsValue;
    type Subscription = Closure<dyn FnMut(Event)>;

    fn subscribe(&self, event: WidgetEvent, mut listener: Listener<JsValue>) -> Self::Subscription {
        let closure = Closure::wrap(Box::new(move |dom_event: Event| {
            let detail = dom_event
                .dyn_ref::<CustomEvent>()
                .map_or(JsValue::UNDEFINED, CustomEvent::detail);
            listener(detail);
        }) as Box<dyn FnMut(Event)>);
        self.handle
            .add_event_listener(event.sdk_name(), closure.as_ref().unchecked_ref());
        closure
    }

    fn unsubscribe(&self, event: WidgetEvent, subscription: Self::Subscription) {
        self.handle
            .remove_event_listener(event.sdk_name(), subscription.as_ref().unchecked_ref());
    }

    fn reset(&self) {
        self.handle.reset();
    }

    fn destroy(&self) {
        self.handle.destroy();
    }
}
