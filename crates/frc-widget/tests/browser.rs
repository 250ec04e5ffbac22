//! Browser bindings against a scripted stand-in for the SDK global.
//!
//! Run with `wasm-pack test --headless --firefox crates/frc-widget`.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::Rc;

use frc_widget::core::config::ConfigLayer;
use frc_widget::core::events::{EventDetail, EventRelay, HostSink, WidgetEvent};
use frc_widget::core::lifecycle::{CaptchaBinding, InitOutcome, Phase, RerenderPolicy, Step};
use frc_widget::core::loader::SdkLoadError;
use frc_widget::core::readiness::ConfigDelivery;
use frc_widget::core::sdk::{CaptchaSdk, CaptchaWidget};
use frc_widget::io::dom;
use frc_widget::io::script::{self, SdkSource};
use frc_widget::io::sdk::BrowserSdk;
use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{Event, HtmlElement};
use zoon::Mutable;

wasm_bindgen_test_configure!(run_in_browser);

/// Installs `window[global]` with a `createWidget` that returns an `EventTarget`
/// recording `reset`/`destroy` calls. The last widget is kept in `window[global + "Last"]`.
fn install_fake_sdk(global: &str) {
    let source = format!(
        "window['{global}'] = {{ createWidget(options) {{ \
            const widget = new EventTarget(); \
            widget.options = options; widget.resets = 0; widget.destroyed = false; \
            widget.reset = () => {{ widget.resets += 1; }}; \
            widget.destroy = () => {{ widget.destroyed = true; }}; \
            window['{global}Last'] = widget; \
            return widget; \
        }} }};"
    );
    Function::new_no_args(&source)
        .call0(&JsValue::NULL)
        .expect("fake SDK installs");
}

fn last_widget(global: &str) -> JsValue {
    let window = web_sys::window().expect("window");
    Reflect::get(&window, &JsValue::from_str(&format!("{global}Last"))).expect("last widget")
}

fn emit(global: &str, sdk_name: &str, response: &str) {
    let source = format!(
        "window['{global}Last'].dispatchEvent(\
            new CustomEvent('{sdk_name}', {{ detail: {{ response: '{response}' }} }}));"
    );
    Function::new_no_args(&source)
        .call0(&JsValue::NULL)
        .expect("event dispatches");
}

fn get(target: &JsValue, key: &str) -> JsValue {
    Reflect::get(target, &JsValue::from_str(key)).expect("property")
}

fn div() -> HtmlElement {
    web_sys::window()
        .and_then(|window| window.document())
        .expect("document")
        .create_element("div")
        .expect("div")
        .unchecked_into()
}

fn sitekey_layer() -> ConfigLayer {
    ConfigLayer {
        sitekey: Some("FCMTEST".to_string()),
        ..ConfigLayer::default()
    }
}

#[wasm_bindgen_test]
async fn present_global_skips_the_script() {
    install_fake_sdk("frcPresent");
    assert!(script::sdk_present("frcPresent"));
    let source = SdkSource {
        url: "https://invalid.example/never-loaded.js".to_string(),
        global: "frcPresent".to_string(),
    };
    assert_eq!(script::ensure_sdk_loaded(&source).await, Ok(()));
}

#[wasm_bindgen_test]
async fn script_without_the_global_is_removed() {
    let source = SdkSource {
        url: "data:text/javascript,window.frcUnrelated%20%3D%201".to_string(),
        global: "frcNeverDefined".to_string(),
    };
    assert_eq!(
        script::ensure_sdk_loaded(&source).await,
        Err(SdkLoadError::MissingGlobal {
            name: "frcNeverDefined".to_string()
        })
    );
    let document = web_sys::window()
        .and_then(|window| window.document())
        .expect("document");
    let leftover = document
        .query_selector("script[src^='data:text/javascript,window.frcUnrelated']")
        .expect("selector");
    assert!(leftover.is_none());
}

#[wasm_bindgen_test]
fn host_event_carries_the_detail_unchanged() {
    let element = div();
    let received = Rc::new(RefCell::new(None));
    let listener = Closure::wrap(Box::new({
        let received = received.clone();
        move |event: Event| {
            let detail = event.unchecked_into::<web_sys::CustomEvent>().detail();
            received.replace(Some(detail));
        }
    }) as Box<dyn FnMut(Event)>);
    element
        .add_event_listener_with_callback("complete", listener.as_ref().unchecked_ref())
        .expect("listener");

    let detail = JsValue::from_str("payload");
    dom::dispatch_host_event(&element, WidgetEvent::Complete, &detail).expect("dispatch");

    assert_eq!(received.borrow().as_ref().and_then(JsValue::as_string).as_deref(), Some("payload"));
}

#[wasm_bindgen_test]
fn response_is_mirrored_on_the_host_element() {
    let element = div();
    let detail = js_sys::Object::new();
    Reflect::set(&detail, &JsValue::from_str("response"), &JsValue::from_str("tok-1")).expect("set");

    dom::expose_response(&element, &detail).expect("expose");
    assert_eq!(dom::read_response(&element).as_deref(), Some("tok-1"));

    dom::expose_response(&element, &JsValue::UNDEFINED).expect("expose");
    assert_eq!(dom::read_response(&element), None);
}

#[wasm_bindgen_test]
fn browser_widget_subscribes_and_unsubscribes() {
    install_fake_sdk("frcWidget");
    let element = div();
    let config = frc_widget::core::config::resolve(&sitekey_layer(), &ConfigLayer::default())
        .expect("sitekey present")
        .config;

    let widget = BrowserSdk::new("frcWidget")
        .create_widget(&element, &config)
        .expect("widget created");
    let options = get(&last_widget("frcWidget"), "options");
    assert_eq!(get(&options, "sitekey").as_string().as_deref(), Some("FCMTEST"));
    assert_eq!(get(&options, "startMode").as_string().as_deref(), Some("focus"));

    let tokens = Rc::new(RefCell::new(Vec::new()));
    let subscription = widget.subscribe(
        WidgetEvent::StateChange,
        Box::new({
            let tokens = tokens.clone();
            move |detail: JsValue| tokens.borrow_mut().push(detail.response_token())
        }),
    );
    emit("frcWidget", "frc:widget.statechange", "tok-2");
    widget.unsubscribe(WidgetEvent::StateChange, subscription);
    emit("frcWidget", "frc:widget.statechange", "tok-3");

    assert_eq!(*tokens.borrow(), vec![Some("tok-2".to_string())]);
}

#[wasm_bindgen_test]
fn binding_drives_the_browser_widget() {
    install_fake_sdk("frcBinding");
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink: HostSink<JsValue> = Rc::new({
        let seen = seen.clone();
        move |event: WidgetEvent, _detail: &JsValue| seen.borrow_mut().push(event)
    });
    let response = Mutable::new(None);
    let mut binding = CaptchaBinding::<BrowserSdk>::new(
        "frc-widget test",
        sitekey_layer(),
        RerenderPolicy::Reset,
        EventRelay::new(sink, response.clone()),
    );

    assert_eq!(binding.markup_mounted(div()), Step::Idle);
    assert_eq!(
        binding.config_arrived(ConfigDelivery::Loaded(ConfigLayer::default())),
        Step::LoadSdk
    );
    assert_eq!(binding.sdk_ready(&BrowserSdk::new("frcBinding")), InitOutcome::Created);
    assert_eq!(binding.phase(), Phase::Ready);

    emit("frcBinding", "frc:widget.statechange", "tok-4");
    emit("frcBinding", "frc:widget.complete", "tok-4");
    assert_eq!(*seen.borrow(), vec![WidgetEvent::StateChange, WidgetEvent::Complete]);
    assert_eq!(response.get_cloned().as_deref(), Some("tok-4"));

    assert_eq!(binding.markup_mounted(div()), Step::Idle);
    let widget = last_widget("frcBinding");
    assert_eq!(get(&widget, "resets").as_f64(), Some(1.0));

    binding.teardown();
    assert_eq!(get(&widget, "destroyed").as_bool(), Some(true));
    emit("frcBinding", "frc:widget.expire", "");
    assert_eq!(seen.borrow().len(), 2);
}
