//! Friendly Captcha widget for MoonZoon apps.
//!
//! The widget is created once both the element is mounted and the remote
//! configuration has settled, after the SDK script has been loaded. Its
//! notifications are re-emitted on the host element and passed to the
//! registered handlers.

pub mod core;
pub mod io;
pub mod render;

pub use zoon;

pub use crate::core::config::{ConfigLayer, RemoteConfig, StartMode, Theme, WidgetConfig};
pub use crate::core::events::WidgetEvent;
pub use crate::core::lifecycle::{Phase, RerenderPolicy};
pub use crate::core::readiness::{ConfigDelivery, ConfigFetchError};
pub use crate::io::remote_config::ConfigSource;
pub use crate::io::script::SdkSource;
pub use crate::render::captcha::{CaptchaControl, FriendlyCaptcha};
