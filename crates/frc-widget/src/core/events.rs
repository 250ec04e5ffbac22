//! Widget notifications and their relay to the host.

use std::cell::Cell;
use std::rc::Rc;

use zoon::Mutable;

/// The five notifications emitted by the SDK widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WidgetEvent {
    Complete,
    Error,
    Expire,
    Reset,
    StateChange,
}

impl WidgetEvent {
    pub const ALL: [WidgetEvent; 5] = [
        WidgetEvent::Complete,
        WidgetEvent::Error,
        WidgetEvent::Expire,
        WidgetEvent::Reset,
        WidgetEvent::StateChange,
    ];

    /// DOM event name dispatched by the SDK on the widget handle.
    pub fn sdk_name(self) -> &'static str {
        match self {
            WidgetEvent::Complete => "frc:widget.complete",
            WidgetEvent::Error => "frc:widget.error",
            WidgetEvent::Expire => "frc:widget.expire",
            WidgetEvent::Reset => "frc:widget.reset",
            WidgetEvent::StateChange => "frc:widget.statechange",
        }
    }

    /// Name of the outward notification.
    pub fn host_name(self) -> &'static str {
        match self {
            WidgetEvent::Complete => "complete",
            WidgetEvent::Error => "error",
            WidgetEvent::Expire => "expire",
            WidgetEvent::Reset => "reset",
            WidgetEvent::StateChange => "statechange",
        }
    }

    pub fn from_host_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.host_name() == name)
    }
}

/// Event payload as delivered by the SDK.
pub trait EventDetail {
    /// The proof-of-work response token carried by `statechange`.
    fn response_token(&self) -> Option<String>;
}

impl EventDetail for serde_json::Value {
    fn response_token(&self) -> Option<String> {
        self.get("response")?.as_str().map(str::to_string)
    }
}

pub type HostSink<P> = Rc<dyn Fn(WidgetEvent, &P)>;

/// Forwards SDK notifications to the host unchanged.
///
/// `statechange` also updates the readable `captchaResponse` output.
/// Once closed, nothing is forwarded anymore.
pub struct EventRelay<P> {
    sink: HostSink<P>,
    response: Mutable<Option<String>>,
    open: Rc<Cell<bool>>,
}

impl<P> Clone for EventRelay<P> {
    fn clone(&self) -> Self {
        Self {
            sink: self.sink.clone(),
            response: self.response.clone(),
            open: self.open.clone(),
        }
    }
}

impl<P: EventDetail> EventRelay<P> {
    pub fn new(sink: HostSink<P>, response: Mutable<Option<String>>) -> Self {
        Self {
            sink,
            response,
            open: Rc::new(Cell::new(true)),
        }
    }

    pub fn forward(&self, event: WidgetEvent, detail: P) {
        if !self.open.get() {
            log::debug!("[frc-widget] Dropping '{}' after teardown", event.host_name());
            return;
        }
        if event == WidgetEvent::StateChange {
            self.response.set(detail.response_token());
        }
        (self.sink)(event, &detail);
    }

    pub fn response(&self) -> &Mutable<Option<String>> {
        &self.response
    }

    pub fn close(&self) {
        self.open.set(false);
    }

    pub fn is_open(&self) -> bool {
        self.open.get()
    }
}
