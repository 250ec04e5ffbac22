//! Deduplicated loading of the SDK script.
//!
//! Several component instances may ask for the SDK at the same time.
//! The first caller starts the load, later callers receive a clone of the
//! same shared future. A failed load is forgotten so the next caller retries.

use std::cell::RefCell;
use std::fmt;

use futures_util::future::{self, FutureExt, LocalBoxFuture, Shared};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SdkLoadError {
    /// The `<script>` element fired `error`.
    Script { src: String },
    /// The script loaded but did not define the expected global.
    MissingGlobal { name: String },
    /// No `window` / `document` to inject into.
    NoDocument,
    /// The load was abandoned before it settled.
    Abandoned,
}

impl fmt::Display for SdkLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SdkLoadError::Script { src } => write!(f, "failed to load SDK script '{src}'"),
            SdkLoadError::MissingGlobal { name } => {
                write!(f, "SDK script loaded but 'window.{name}' is missing")
            }
            SdkLoadError::NoDocument => write!(f, "no document available to load the SDK into"),
            SdkLoadError::Abandoned => write!(f, "SDK load was abandoned"),
        }
    }
}

impl std::error::Error for SdkLoadError {}

pub type LoadResult = Result<(), SdkLoadError>;
pub type LoadFuture = Shared<LocalBoxFuture<'static, LoadResult>>;

#[derive(Default)]
pub struct LoadCoordinator {
    in_flight: RefCell<Option<LoadFuture>>,
}

impl LoadCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves immediately when `is_present` reports the SDK global,
    /// otherwise joins the load in flight or calls `start` to begin one.
    pub fn ensure_loaded(
        &self,
        is_present: impl FnOnce() -> bool,
        start: impl FnOnce() -> LocalBoxFuture<'static, LoadResult>,
    ) -> LoadFuture {
        if is_present() {
            return future::ready(Ok(())).boxed_local().shared();
        }
        let mut in_flight = self.in_flight.borrow_mut();
        if let Some(load) = in_flight.as_ref() {
            if !matches!(load.peek(), Some(Err(_))) {
                return load.clone();
            }
            log::debug!("[frc-widget] Retrying SDK load after failure");
        }
        let load = start().shared();
        *in_flight = Some(load.clone());
        load
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight
            .borrow()
            .as_ref()
            .is_some_and(|load| load.peek().is_none())
    }
}
