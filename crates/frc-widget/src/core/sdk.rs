//! Seams to the external captcha SDK.
//!
//! The browser implementation lives in `io::sdk`; tests use in-memory doubles.

use std::fmt;

use super::config::WidgetConfig;
use super::events::{EventDetail, WidgetEvent};

pub type Listener<P> = Box<dyn FnMut(P)>;

/// A live widget created by the SDK.
pub trait CaptchaWidget {
    type Payload: EventDetail + 'static;
    /// Registration record returned by `subscribe`, handed back to `unsubscribe`.
    type Subscription;

    fn subscribe(&self, event: WidgetEvent, listener: Listener<Self::Payload>) -> Self::Subscription;
    fn unsubscribe(&self, event: WidgetEvent, subscription: Self::Subscription);
    /// Clears solved/error state, keeps configuration and subscriptions.
    fn reset(&self);
    fn destroy(&self);
}

pub trait CaptchaSdk {
    /// Element the widget renders into.
    type Mount;
    type Widget: CaptchaWidget;

    fn create_widget(
        &self,
        mount: &Self::Mount,
        config: &WidgetConfig,
    ) -> Result<Self::Widget, WidgetCreateError>;
}

pub type PayloadOf<S> = <<S as CaptchaSdk>::Widget as CaptchaWidget>::Payload;

/// `createWidget` threw.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WidgetCreateError(pub String);

impl fmt::Display for WidgetCreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "createWidget failed: {}", self.0)
    }
}

impl std::error::Error for WidgetCreateError {}
