//! Captcha binding core.
//!
//! Pure state: no `web_sys`, no tasks. Everything here runs and is tested natively.
//!
//! - `config`: layered configuration resolver.
//! - `readiness`: the markup/config gate.
//! - `lifecycle`: the widget state machine.
//! - `events`: notification relay to the host.
//! - `loader`: deduplicated SDK loading.
//! - `sdk`: traits implemented by the browser SDK binding.

pub mod config;
pub mod events;
pub mod lifecycle;
pub mod loader;
pub mod readiness;
pub mod sdk;
