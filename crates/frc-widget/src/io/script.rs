//! Injects the SDK `<script>` once per page.

use std::cell::RefCell;
use std::rc::Rc;

use futures_channel::oneshot;
use futures_util::future::FutureExt;
use js_sys::Reflect;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{HtmlScriptElement, Node};

use crate::core::loader::{LoadCoordinator, LoadFuture, LoadResult, SdkLoadError};

pub const DEFAULT_SDK_URL: &str =
    "https://cdn.jsdelivr.net/npm/@friendlycaptcha/sdk@0.1.31/site.min.js";
pub const DEFAULT_SDK_GLOBAL: &str = "frcaptcha";

/// Where the SDK comes from and which global it defines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SdkSource {
    pub url: String,
    pub global: String,
}

impl Default for SdkSource {
    fn default() -> Self {
        Self {
            url: DEFAULT_SDK_URL.to_string(),
            global: DEFAULT_SDK_GLOBAL.to_string(),
        }
    }
}

impl SdkSource {
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }
}

thread_local! {
    static SDK_LOADER: LoadCoordinator = LoadCoordinator::new();
}

/// Is `window.<global>` defined?
pub fn sdk_present(global: &str) -> bool {
    web_sys::window()
        .and_then(|window| Reflect::get(&window, &JsValue::from_str(global)).ok())
        .is_some_and(|value| !value.is_undefined() && !value.is_null())
}

/// Resolves once the SDK global exists. Concurrent callers share one script load.
pub fn ensure_sdk_loaded(source: &SdkSource) -> LoadFuture {
    SDK_LOADER.with(|loader| {
        loader.ensure_loaded(
            || sdk_present(&source.global),
            || inject_script(source.clone()).boxed_local(),
        )
    })
}

async fn inject_script(source: SdkSource) -> LoadResult {
    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or(SdkLoadError::NoDocument)?;
    let script: HtmlScriptElement = document
        .create_element("script")
        .ok()
        .and_then(|element| element.dyn_into().ok())
        .ok_or(SdkLoadError::NoDocument)?;
    let parent = document
        .head()
        .map(Node::from)
        .or_else(|| document.body().map(Node::from))
        .ok_or(SdkLoadError::NoDocument)?;

    let (sender, receiver) = oneshot::channel::<bool>();
    let sender = Rc::new(RefCell::new(Some(sender)));
    let settle = move |loaded: bool| {
        if let Some(sender) = sender.borrow_mut().take() {
            let _ = sender.send(loaded);
        }
    };
    let on_load = Closure::once({
        let settle = settle.clone();
        move || settle(true)
    });
    let on_error = Closure::once(move || settle(false));

    script.set_src(&source.url);
    script.set_async(true);
    script.set_onload(Some(on_load.as_ref().unchecked_ref()));
    script.set_onerror(Some(on_error.as_ref().unchecked_ref()));
    parent
        .append_child(&script)
        .map_err(|_| SdkLoadError::NoDocument)?;
    log::debug!("[frc-widget] Loading SDK from {}", source.url);

    let loaded = receiver.await.unwrap_or(false);
    script.set_onload(None);
    script.set_onerror(None);

    if !loaded {
        script.remove();
        return Err(SdkLoadError::Script { src: source.url });
    }
    if !sdk_present(&source.global) {
        script.remove();
        return Err(SdkLoadError::MissingGlobal {
            name: source.global,
        });
    }
    Ok(())
}
