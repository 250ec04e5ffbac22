//! Readiness gate: markup mounted AND configuration arrived.
//!
//! Both flags are monotonic. The gate reports `Opened` exactly once, on the
//! mutation that makes the conjunction true.

use std::fmt;

use futures_util::stream::{Stream, StreamExt};

use super::config::RemoteConfig;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadinessState {
    pub markup_ready: bool,
    pub config_ready: bool,
}

impl ReadinessState {
    pub fn is_open(self) -> bool {
        self.markup_ready && self.config_ready
    }
}

/// Result of a single gate mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateTransition {
    /// Flag was already set, or the input was a non-event.
    Unchanged,
    /// Flag flipped, the other one is still missing.
    Waiting,
    /// Both flags are now set. Reported once per gate.
    Opened,
}

#[derive(Debug, Default)]
pub struct ReadinessGate {
    state: ReadinessState,
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ReadinessState {
        self.state
    }

    pub fn mark_markup(&mut self) -> GateTransition {
        if self.state.markup_ready {
            return GateTransition::Unchanged;
        }
        self.state.markup_ready = true;
        self.transition()
    }

    pub fn mark_config(&mut self) -> GateTransition {
        if self.state.config_ready {
            return GateTransition::Unchanged;
        }
        self.state.config_ready = true;
        self.transition()
    }

    fn transition(&self) -> GateTransition {
        if self.state.is_open() {
            GateTransition::Opened
        } else {
            GateTransition::Waiting
        }
    }
}

// --- ConfigDelivery ---

/// Why the remote configuration could not be fetched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigFetchError {
    /// Transport failure (network, CORS, rejected promise).
    Network(String),
    /// Non-success HTTP status.
    Status(u16),
    /// Payload was not a configuration object.
    Malformed(String),
    /// The source finished without delivering data or an error.
    Ended,
}

impl fmt::Display for ConfigFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFetchError::Network(message) => write!(f, "network error: {message}"),
            ConfigFetchError::Status(status) => write!(f, "unexpected HTTP status {status}"),
            ConfigFetchError::Malformed(message) => write!(f, "malformed configuration: {message}"),
            ConfigFetchError::Ended => write!(f, "configuration source ended without a result"),
        }
    }
}

impl std::error::Error for ConfigFetchError {}

/// One callback from the configuration source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigDelivery {
    /// Neither data nor error. Wired sources emit this once while binding.
    Empty,
    Loaded(RemoteConfig),
    Failed(ConfigFetchError),
}

impl ConfigDelivery {
    /// Maps the `{ data, error }` callback shape. Data wins when both are set.
    pub fn from_parts(data: Option<RemoteConfig>, error: Option<ConfigFetchError>) -> Self {
        match (data, error) {
            (Some(config), _) => ConfigDelivery::Loaded(config),
            (None, Some(error)) => ConfigDelivery::Failed(error),
            (None, None) => ConfigDelivery::Empty,
        }
    }
}

impl From<Result<RemoteConfig, ConfigFetchError>> for ConfigDelivery {
    fn from(result: Result<RemoteConfig, ConfigFetchError>) -> Self {
        match result {
            Ok(config) => ConfigDelivery::Loaded(config),
            Err(error) => ConfigDelivery::Failed(error),
        }
    }
}

/// Feeds `deliveries` to `arrived` until it reports the configuration as settled.
///
/// Neutral `Empty` callbacks keep the subscription open. A source that ends
/// before settling is reported as [`ConfigFetchError::Ended`] so the widget
/// falls back to local attributes instead of waiting forever.
pub async fn settle_config<St>(deliveries: St, mut arrived: impl FnMut(ConfigDelivery) -> bool)
where
    St: Stream<Item = ConfigDelivery>,
{
    let mut deliveries = std::pin::pin!(deliveries);
    while let Some(delivery) = deliveries.next().await {
        if arrived(delivery) {
            return;
        }
    }
    arrived(ConfigDelivery::Failed(ConfigFetchError::Ended));
}
