//! The `FriendlyCaptcha` zoon element.
//!
//! ```ignore
//! let control = CaptchaControl::new();
//! FriendlyCaptcha::new()
//!     .config_source(ConfigSource::url("/api/captcha-config"))
//!     .theme(Theme::Auto)
//!     .control(&control)
//!     .on_complete(|detail| println!("solved: {detail:?}"))
//!     .render()
//! ```

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use futures_util::stream::{LocalBoxStream, StreamExt};
use ulid::Ulid;
use zoon::wasm_bindgen::{JsCast, JsValue};
use zoon::web_sys::HtmlElement;
use zoon::*;

use crate::core::config::{ConfigLayer, StartMode, Theme};
use crate::core::events::{EventRelay, HostSink, WidgetEvent};
use crate::core::lifecycle::{CaptchaBinding, Phase, RerenderPolicy, Step};
use crate::core::readiness::settle_config;
use crate::io::dom;
use crate::io::remote_config::ConfigSource;
use crate::io::script::{self, SdkSource};
use crate::io::sdk::BrowserSdk;

type BrowserBinding = CaptchaBinding<BrowserSdk>;
type Handler = Box<dyn FnMut(&JsValue)>;
type Host = Rc<RefCell<Option<HtmlElement>>>;

const CLASS_NAME: &str = "frc-captcha";

// --- CaptchaControl ---

/// Host-side access to a rendered captcha: response token and explicit reset.
///
/// A control follows one captcha at a time. Passing it to another
/// `FriendlyCaptcha` re-points it to the newest one and clears the response.
#[derive(Clone)]
pub struct CaptchaControl {
    binding: Rc<RefCell<Weak<RefCell<BrowserBinding>>>>,
    response: Mutable<Option<String>>,
}

impl CaptchaControl {
    pub fn new() -> Self {
        Self {
            binding: Rc::new(RefCell::new(Weak::new())),
            response: Mutable::new(None),
        }
    }

    /// Latest proof-of-work response token.
    pub fn response(&self) -> Option<String> {
        self.response.get_cloned()
    }

    pub fn response_signal(&self) -> impl Signal<Item = Option<String>> + use<> {
        self.response.signal_cloned()
    }

    /// `None` when no captcha is rendered with this control.
    pub fn phase(&self) -> Option<Phase> {
        let binding = self.binding.borrow().upgrade()?;
        let phase = binding.try_borrow().ok()?.phase();
        Some(phase)
    }

    /// Resets the live widget in place. Returns `false` when there is none yet.
    pub fn reset(&self) -> bool {
        let Some(binding) = self.binding.borrow().upgrade() else {
            return false;
        };
        let Ok(binding) = binding.try_borrow() else {
            log::warn!("[frc-widget] Reset requested while the widget is busy, ignored");
            return false;
        };
        binding.reset_if_present()
    }

    fn attach(&self, binding: &Rc<RefCell<BrowserBinding>>) {
        if matches!(self.phase(), Some(phase) if phase != Phase::TornDown) {
            log::warn!("[frc-widget] CaptchaControl moved to a new captcha while the previous one is still mounted");
        }
        self.binding.replace(Rc::downgrade(binding));
        self.response.set(None);
    }
}

impl Default for CaptchaControl {
    fn default() -> Self {
        Self::new()
    }
}

// --- FriendlyCaptcha ---

pub struct FriendlyCaptcha {
    attributes: ConfigLayer,
    config_source: ConfigSource,
    sdk_source: SdkSource,
    policy: RerenderPolicy,
    rerenders: Option<LocalBoxStream<'static, ()>>,
    handlers: Vec<(WidgetEvent, Handler)>,
    control: CaptchaControl,
}

impl FriendlyCaptcha {
    pub fn new() -> Self {
        Self {
            attributes: ConfigLayer::default(),
            config_source: ConfigSource::default(),
            sdk_source: SdkSource::default(),
            policy: RerenderPolicy::default(),
            rerenders: None,
            handlers: Vec::new(),
            control: CaptchaControl::new(),
        }
    }

    pub fn sitekey(mut self, sitekey: impl Into<String>) -> Self {
        self.attributes.sitekey = Some(sitekey.into());
        self
    }

    /// `global`, `eu` or a full endpoint URL.
    pub fn api_endpoint(mut self, api_endpoint: impl Into<String>) -> Self {
        self.attributes.api_endpoint = Some(api_endpoint.into());
        self
    }

    pub fn start_mode(mut self, start_mode: StartMode) -> Self {
        self.attributes.start_mode = Some(start_mode.as_str().to_string());
        self
    }

    pub fn theme(mut self, theme: Theme) -> Self {
        self.attributes.theme = Some(theme.as_str().to_string());
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.attributes.language = Some(language.into());
        self
    }

    /// Raw host attributes, e.g. read from `data-*` attributes of a server-rendered page.
    pub fn attributes(mut self, attributes: ConfigLayer) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn config_source(mut self, config_source: ConfigSource) -> Self {
        self.config_source = config_source;
        self
    }

    pub fn sdk_source(mut self, sdk_source: SdkSource) -> Self {
        self.sdk_source = sdk_source;
        self
    }

    /// Applied on every [`rerender_on`](Self::rerender_on) emission.
    pub fn rerender_policy(mut self, policy: RerenderPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Treats every change of `signal` after its initial value as a re-render of the host markup.
    pub fn rerender_on(mut self, signal: impl Signal + 'static) -> Self {
        self.rerenders = Some(signal.to_stream().skip(1).map(|_| ()).boxed_local());
        self
    }

    pub fn control(mut self, control: &CaptchaControl) -> Self {
        self.control = control.clone();
        self
    }

    pub fn on(mut self, event: WidgetEvent, handler: impl FnMut(&JsValue) + 'static) -> Self {
        self.handlers.push((event, Box::new(handler)));
        self
    }

    pub fn on_complete(self, handler: impl FnMut(&JsValue) + 'static) -> Self {
        self.on(WidgetEvent::Complete, handler)
    }

    pub fn on_error(self, handler: impl FnMut(&JsValue) + 'static) -> Self {
        self.on(WidgetEvent::Error, handler)
    }

    pub fn on_expire(self, handler: impl FnMut(&JsValue) + 'static) -> Self {
        self.on(WidgetEvent::Expire, handler)
    }

    pub fn on_reset(self, handler: impl FnMut(&JsValue) + 'static) -> Self {
        self.on(WidgetEvent::Reset, handler)
    }

    pub fn on_state_change(self, handler: impl FnMut(&JsValue) + 'static) -> Self {
        self.on(WidgetEvent::StateChange, handler)
    }

    pub fn render(self) -> impl Element {
        let FriendlyCaptcha {
            attributes,
            config_source,
            sdk_source,
            policy,
            rerenders,
            handlers,
            control,
        } = self;

        #[cfg(feature = "console-log")]
        crate::io::console_log::install_console_logger(log::LevelFilter::Info);

        let label = format!("frc-widget {}", Ulid::new());
        let host: Host = Rc::new(RefCell::new(None));
        let relay = EventRelay::new(host_sink(host.clone(), handlers), control.response.clone());
        let binding = Rc::new(RefCell::new(BrowserBinding::new(
            label, attributes, policy, relay,
        )));
        control.attach(&binding);
        let sdk = BrowserSdk::new(sdk_source.global.clone());

        let config_task = Task::start_droppable({
            let binding = binding.clone();
            let sdk = sdk.clone();
            let sdk_source = sdk_source.clone();
            settle_config(config_source.deliveries(), move |delivery| {
                let step = binding.borrow_mut().config_arrived(delivery);
                drive(&binding, step, &sdk, &sdk_source);
                let binding = binding.borrow();
                binding.readiness().config_ready || binding.phase() == Phase::TornDown
            })
        });
        let rerender_task = rerenders.map(|rerenders| {
            Task::start_droppable(rerender_loop(
                rerenders,
                binding.clone(),
                host.clone(),
                sdk.clone(),
                sdk_source.clone(),
            ))
        });

        El::new()
            .update_raw_el(|raw_el| raw_el.class(CLASS_NAME))
            .after_insert({
                let binding = binding.clone();
                let host = host.clone();
                move |element| {
                    let element: HtmlElement = element.unchecked_into();
                    host.replace(Some(element.clone()));
                    let step = binding.borrow_mut().markup_mounted(element);
                    drive(&binding, step, &sdk, &sdk_source);
                }
            })
            .after_remove(move |_| {
                drop(config_task);
                drop(rerender_task);
                binding.borrow_mut().teardown();
                host.take();
            })
    }
}

impl Default for FriendlyCaptcha {
    fn default() -> Self {
        Self::new()
    }
}

/// Hands the mounted element to the binding again on every re-render.
async fn rerender_loop(
    mut rerenders: LocalBoxStream<'static, ()>,
    binding: Rc<RefCell<BrowserBinding>>,
    host: Host,
    sdk: BrowserSdk,
    source: SdkSource,
) {
    while rerenders.next().await.is_some() {
        let Some(element) = host.borrow().clone() else {
            continue;
        };
        let step = binding.borrow_mut().markup_mounted(element);
        drive(&binding, step, &sdk, &source);
    }
}

/// Runs the SDK load requested by `step`, then hands the result back to the binding.
fn drive(binding: &Rc<RefCell<BrowserBinding>>, step: Step, sdk: &BrowserSdk, source: &SdkSource) {
    if step != Step::LoadSdk {
        return;
    }
    let load = script::ensure_sdk_loaded(source);
    let binding = binding.clone();
    let sdk = sdk.clone();
    Task::start(async move {
        match load.await {
            Ok(()) => {
                binding.borrow_mut().sdk_ready(&sdk);
            }
            Err(error) => binding.borrow_mut().sdk_failed(&error),
        }
    });
}

/// Outward notifications: DOM `CustomEvent` on the host element plus registered handlers.
fn host_sink(
    host: Host,
    handlers: Vec<(WidgetEvent, Handler)>,
) -> HostSink<JsValue> {
    let handlers = RefCell::new(handlers);
    Rc::new(move |event: WidgetEvent, detail: &JsValue| {
        if let Some(element) = host.borrow().as_ref() {
            if event == WidgetEvent::StateChange {
                if let Err(error) = dom::expose_response(element, detail) {
                    log::warn!("[frc-widget] Failed to expose captchaResponse: {error:?}");
                }
            }
            if let Err(error) = dom::dispatch_host_event(element, event, detail) {
                log::warn!("[frc-widget] Failed to dispatch '{}': {error:?}", event.host_name());
            }
        }
        let Ok(mut handlers) = handlers.try_borrow_mut() else {
            log::warn!("[frc-widget] Nested '{}' notification dropped", event.host_name());
            return;
        };
        for (handled, handler) in handlers.iter_mut() {
            if *handled == event {
                handler(detail);
            }
        }
    })
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use super::*;
    use crate::core::lifecycle::InitOutcome;
    use crate::core::readiness::ConfigDelivery;
    use futures_util::{FutureExt, stream};
    use wasm_bindgen_test::{wasm_bindgen_test, wasm_bindgen_test_configure};
    use zoon::js_sys::{Function, Object, Reflect};
    use zoon::wasm_bindgen::closure::Closure;
    use zoon::web_sys::Event;

    wasm_bindgen_test_configure!(run_in_browser);

    fn install_fake_sdk(global: &str) {
        let source = format!(
            "window['{global}'] = {{ createWidget() {{ \
                const widget = new EventTarget(); \
                widget.resets = 0; \
                widget.reset = () => {{ widget.resets += 1; }}; \
                widget.destroy = () => {{}}; \
                window['{global}Last'] = widget; \
                return widget; \
            }} }};"
        );
        Function::new_no_args(&source)
            .call0(&JsValue::NULL)
            .expect("fake SDK installs");
    }

    fn resets(global: &str) -> Option<f64> {
        let window = zoon::web_sys::window().expect("window");
        let widget = Reflect::get(&window, &JsValue::from_str(&format!("{global}Last"))).ok()?;
        Reflect::get(&widget, &JsValue::from_str("resets")).ok()?.as_f64()
    }

    fn div() -> HtmlElement {
        zoon::web_sys::window()
            .and_then(|window| window.document())
            .expect("document")
            .create_element("div")
            .expect("div")
            .unchecked_into()
    }

    fn response_detail(token: &str) -> JsValue {
        let detail = Object::new();
        Reflect::set(&detail, &JsValue::from_str("response"), &JsValue::from_str(token))
            .expect("set");
        detail.into()
    }

    fn binding(policy: RerenderPolicy) -> Rc<RefCell<BrowserBinding>> {
        let attributes = ConfigLayer {
            sitekey: Some("FCMTEST".to_string()),
            ..ConfigLayer::default()
        };
        let sink: HostSink<JsValue> = Rc::new(|_: WidgetEvent, _: &JsValue| {});
        let relay = EventRelay::new(sink, Mutable::new(None));
        Rc::new(RefCell::new(BrowserBinding::new(
            "frc-widget test",
            attributes,
            policy,
            relay,
        )))
    }

    /// Mounts into `element` and creates the widget through the fake SDK at `global`.
    fn ready_binding(global: &str, policy: RerenderPolicy, element: HtmlElement) -> Rc<RefCell<BrowserBinding>> {
        install_fake_sdk(global);
        let binding = binding(policy);
        {
            let mut binding = binding.borrow_mut();
            let _ = binding.markup_mounted(element);
            let step = binding.config_arrived(ConfigDelivery::Loaded(ConfigLayer::default()));
            assert_eq!(step, Step::LoadSdk);
            assert_eq!(binding.sdk_ready(&BrowserSdk::new(global)), InitOutcome::Created);
            assert_eq!(binding.phase(), Phase::Ready);
        }
        binding
    }

    #[wasm_bindgen_test]
    fn response_property_is_set_before_the_host_event() {
        let element = div();
        let seen_by_listener = Rc::new(RefCell::new(None));
        let listener = Closure::wrap(Box::new({
            let element = element.clone();
            let seen_by_listener = seen_by_listener.clone();
            move |_: Event| {
                seen_by_listener.replace(dom::read_response(&element));
            }
        }) as Box<dyn FnMut(Event)>);
        element
            .add_event_listener_with_callback("statechange", listener.as_ref().unchecked_ref())
            .expect("listener");

        let sink = host_sink(Rc::new(RefCell::new(Some(element.clone()))), Vec::new());
        sink(WidgetEvent::StateChange, &response_detail("tok-5"));

        assert_eq!(seen_by_listener.borrow().as_deref(), Some("tok-5"));
        assert_eq!(dom::read_response(&element).as_deref(), Some("tok-5"));
    }

    #[wasm_bindgen_test]
    fn handlers_only_see_their_own_event() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let handler = |name: &'static str| -> Handler {
            let calls = calls.clone();
            Box::new(move |_: &JsValue| calls.borrow_mut().push(name))
        };
        let sink = host_sink(
            Rc::new(RefCell::new(None)),
            vec![
                (WidgetEvent::Complete, handler("complete")),
                (WidgetEvent::Expire, handler("expire")),
                (WidgetEvent::Complete, handler("complete again")),
            ],
        );

        sink(WidgetEvent::Complete, &JsValue::UNDEFINED);
        sink(WidgetEvent::Error, &JsValue::UNDEFINED);
        sink(WidgetEvent::Expire, &JsValue::UNDEFINED);

        assert_eq!(*calls.borrow(), vec!["complete", "complete again", "expire"]);
    }

    #[wasm_bindgen_test]
    fn nested_notification_from_a_handler_is_dropped() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let slot: Rc<RefCell<Option<HostSink<JsValue>>>> = Rc::new(RefCell::new(None));
        let handlers: Vec<(WidgetEvent, Handler)> = vec![
            (
                WidgetEvent::Complete,
                Box::new({
                    let calls = calls.clone();
                    let slot = slot.clone();
                    move |_: &JsValue| {
                        calls.borrow_mut().push(WidgetEvent::Complete);
                        let nested = slot.borrow().clone();
                        if let Some(sink) = nested {
                            sink(WidgetEvent::Reset, &JsValue::UNDEFINED);
                        }
                    }
                }),
            ),
            (
                WidgetEvent::Reset,
                Box::new({
                    let calls = calls.clone();
                    move |_: &JsValue| calls.borrow_mut().push(WidgetEvent::Reset)
                }),
            ),
        ];
        let sink = host_sink(Rc::new(RefCell::new(None)), handlers);
        slot.replace(Some(sink.clone()));

        sink(WidgetEvent::Complete, &JsValue::UNDEFINED);
        assert_eq!(*calls.borrow(), vec![WidgetEvent::Complete]);

        sink(WidgetEvent::Reset, &JsValue::UNDEFINED);
        assert_eq!(*calls.borrow(), vec![WidgetEvent::Complete, WidgetEvent::Reset]);
        slot.take();
    }

    #[wasm_bindgen_test]
    async fn rerenders_reset_the_live_widget() {
        let element = div();
        let binding = ready_binding("frcRerender", RerenderPolicy::Reset, element.clone());
        let host: Host = Rc::new(RefCell::new(Some(element)));

        rerender_loop(
            stream::iter([(), ()]).boxed_local(),
            binding.clone(),
            host,
            BrowserSdk::new("frcRerender"),
            SdkSource::default(),
        )
        .await;

        assert_eq!(resets("frcRerender"), Some(2.0));
        assert_eq!(binding.borrow().phase(), Phase::Ready);
    }

    #[wasm_bindgen_test]
    async fn rerenders_before_insert_are_ignored() {
        let binding = binding(RerenderPolicy::Reset);
        rerender_loop(
            stream::iter([()]).boxed_local(),
            binding.clone(),
            Rc::new(RefCell::new(None)),
            BrowserSdk::new("frcUnused"),
            SdkSource::default(),
        )
        .await;
        assert!(!binding.borrow().readiness().markup_ready);
    }

    #[wasm_bindgen_test]
    fn rerender_signal_skips_its_initial_value() {
        let counter = Mutable::new(0);
        let mut rerenders = FriendlyCaptcha::new()
            .rerender_on(counter.signal())
            .rerenders
            .take()
            .expect("rerender stream");

        assert_eq!(rerenders.next().now_or_never(), None);
        counter.set(1);
        assert_eq!(rerenders.next().now_or_never(), Some(Some(())));
    }

    #[wasm_bindgen_test]
    fn control_follows_the_newest_captcha() {
        let control = CaptchaControl::new();
        let first = ready_binding("frcControlFirst", RerenderPolicy::Keep, div());
        control.attach(&first);
        control.response.set(Some("old".to_string()));

        let second = binding(RerenderPolicy::Keep);
        control.attach(&second);

        assert_eq!(control.phase(), Some(Phase::Uninitialized));
        assert_eq!(control.response(), None);
        assert!(!control.reset());
        assert_eq!(resets("frcControlFirst"), Some(0.0));

        drop(second);
        assert_eq!(control.phase(), None);
    }
}
