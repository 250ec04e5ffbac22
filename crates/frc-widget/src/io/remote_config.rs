//! Remote configuration sources.

use std::future::Future;
use std::rc::Rc;

use futures_util::future::FutureExt;
use futures_util::stream::{self, LocalBoxStream, Stream, StreamExt};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;
use web_sys::Response;

use super::describe_js_error;
use crate::core::config::RemoteConfig;
use crate::core::readiness::{ConfigDelivery, ConfigFetchError};

type SubscribeConfig = Rc<dyn Fn() -> LocalBoxStream<'static, ConfigDelivery>>;

/// Subscribed once per component instance.
#[derive(Clone, Default)]
pub enum ConfigSource {
    /// No remote configuration. Local attributes and defaults only.
    #[default]
    LocalOnly,
    Static(RemoteConfig),
    /// GET a JSON document shaped like [`RemoteConfig`].
    Url(String),
    /// A subscription that may start with neutral [`ConfigDelivery::Empty`] callbacks
    /// before the real result.
    Custom(SubscribeConfig),
}

impl ConfigSource {
    pub fn url(url: impl Into<String>) -> Self {
        ConfigSource::Url(url.into())
    }

    pub fn custom<F, St>(subscribe: F) -> Self
    where
        F: Fn() -> St + 'static,
        St: Stream<Item = ConfigDelivery> + 'static,
    {
        ConfigSource::Custom(Rc::new(move || subscribe().boxed_local()))
    }

    /// A custom source answering with a single delivery.
    pub fn custom_once<F, Fut>(fetch: F) -> Self
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = ConfigDelivery> + 'static,
    {
        Self::custom(move || fetch().into_stream())
    }

    pub fn deliveries(&self) -> LocalBoxStream<'static, ConfigDelivery> {
        match self {
            ConfigSource::LocalOnly => {
                stream::once(async { ConfigDelivery::Loaded(RemoteConfig::default()) }).boxed_local()
            }
            ConfigSource::Static(config) => {
                let config = config.clone();
                stream::once(async move { ConfigDelivery::Loaded(config) }).boxed_local()
            }
            ConfigSource::Url(url) => {
                let url = url.clone();
                stream::once(async move { ConfigDelivery::from(fetch_json(&url).await) }).boxed_local()
            }
            ConfigSource::Custom(subscribe) => subscribe(),
        }
    }
}

async fn fetch_json(url: &str) -> Result<RemoteConfig, ConfigFetchError> {
    let network_error = |error: wasm_bindgen::JsValue| ConfigFetchError::Network(describe_js_error(&error));

    let window =
        web_sys::window().ok_or_else(|| ConfigFetchError::Network("no window".to_string()))?;
    let response: Response = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(network_error)?
        .dyn_into()
        .map_err(|_| ConfigFetchError::Malformed("fetch did not return a Response".to_string()))?;
    if !response.ok() {
        return Err(ConfigFetchError::Status(response.status()));
    }
    let text = JsFuture::from(response.text().map_err(network_error)?)
        .await
        .map_err(network_error)?
        .as_string()
        .ok_or_else(|| ConfigFetchError::Malformed("response body is not text".to_string()))?;
    RemoteConfig::from_json(&text).map_err(|error| ConfigFetchError::Malformed(error.to_string()))
}
