//! Widget lifecycle state machine.
//!
//! `CaptchaBinding` is sans-IO: it never awaits. Mutations return a [`Step`]
//! telling the driver whether it must load the SDK and then call
//! [`CaptchaBinding::sdk_ready`] or [`CaptchaBinding::sdk_failed`].
//!
//! ```text
//! Uninitialized ──gate opens──▶ Loading ──sdk_ready──▶ Ready ──teardown──▶ TornDown
//!       ▲                          │
//!       └──── load/create failed ──┘          (teardown from any state)
//! ```

use smallvec::SmallVec;
use std::mem;

use super::config::{self, ConfigLayer, WidgetConfig};
use super::events::{EventRelay, WidgetEvent};
use super::loader::SdkLoadError;
use super::readiness::{ConfigDelivery, GateTransition, ReadinessGate, ReadinessState};
use super::sdk::{CaptchaSdk, CaptchaWidget, PayloadOf};

/// What happens when the host mounts the markup again after the widget exists.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RerenderPolicy {
    /// Keep the widget as it is.
    #[default]
    Keep,
    /// Reset the widget in place. It is never recreated.
    Reset,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Loading,
    Ready,
    TornDown,
}

/// Instruction for the driver after a mutation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use]
pub enum Step {
    Idle,
    /// Make sure the SDK is loaded, then report back.
    LoadSdk,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitOutcome {
    Created,
    /// Teardown happened while the SDK was loading.
    Abandoned,
    Failed,
    /// Called outside the `Loading` phase.
    Ignored,
}

type SubscriptionSet<W> = SmallVec<[(WidgetEvent, <W as CaptchaWidget>::Subscription); 5]>;

struct LiveWidget<W: CaptchaWidget> {
    widget: W,
    subscriptions: SubscriptionSet<W>,
}

enum LifecycleState<S: CaptchaSdk> {
    Uninitialized,
    Loading { config: WidgetConfig, mount: S::Mount },
    Ready(LiveWidget<S::Widget>),
    TornDown,
}

pub struct CaptchaBinding<S: CaptchaSdk> {
    label: String,
    attributes: ConfigLayer,
    remote: ConfigLayer,
    readiness: ReadinessGate,
    mount: Option<S::Mount>,
    policy: RerenderPolicy,
    relay: EventRelay<PayloadOf<S>>,
    state: LifecycleState<S>,
}

impl<S: CaptchaSdk> CaptchaBinding<S> {
    /// `label` prefixes every diagnostic of this instance.
    pub fn new(
        label: impl Into<String>,
        attributes: ConfigLayer,
        policy: RerenderPolicy,
        relay: EventRelay<PayloadOf<S>>,
    ) -> Self {
        Self {
            label: label.into(),
            attributes,
            remote: ConfigLayer::default(),
            readiness: ReadinessGate::new(),
            mount: None,
            policy,
            relay,
            state: LifecycleState::Uninitialized,
        }
    }

    pub fn phase(&self) -> Phase {
        match self.state {
            LifecycleState::Uninitialized => Phase::Uninitialized,
            LifecycleState::Loading { .. } => Phase::Loading,
            LifecycleState::Ready(_) => Phase::Ready,
            LifecycleState::TornDown => Phase::TornDown,
        }
    }

    pub fn readiness(&self) -> ReadinessState {
        self.readiness.state()
    }

    pub fn relay(&self) -> &EventRelay<PayloadOf<S>> {
        &self.relay
    }

    /// The host rendered the element the widget lives in.
    pub fn markup_mounted(&mut self, mount: S::Mount) -> Step {
        if self.phase() == Phase::TornDown {
            return Step::Idle;
        }
        if self.readiness.state().markup_ready {
            if self.policy == RerenderPolicy::Reset {
                self.reset_if_present();
            }
            return Step::Idle;
        }
        self.mount = Some(mount);
        let transition = self.readiness.mark_markup();
        self.evaluate(transition)
    }

    /// The configuration source called back.
    pub fn config_arrived(&mut self, delivery: ConfigDelivery) -> Step {
        if self.phase() == Phase::TornDown || self.readiness.state().config_ready {
            return Step::Idle;
        }
        match delivery {
            ConfigDelivery::Empty => return Step::Idle,
            ConfigDelivery::Loaded(remote) => self.remote = remote,
            ConfigDelivery::Failed(error) => {
                log::warn!("[{}] Error fetching configuration: {error}", self.label);
            }
        }
        let transition = self.readiness.mark_config();
        self.evaluate(transition)
    }

    fn evaluate(&mut self, transition: GateTransition) -> Step {
        if transition != GateTransition::Opened {
            return Step::Idle;
        }
        if !matches!(self.state, LifecycleState::Uninitialized) {
            return Step::Idle;
        }
        let config = match config::resolve(&self.attributes, &self.remote) {
            Ok(resolved) => {
                for invalid in &resolved.ignored {
                    log::warn!("[{}] Ignoring {invalid}", self.label);
                }
                resolved.config
            }
            Err(error) => {
                log::error!("[{}] {error}", self.label);
                return Step::Idle;
            }
        };
        let Some(mount) = self.mount.take() else {
            return Step::Idle;
        };
        log::debug!("[{}] Ready to create widget for sitekey {}", self.label, config.sitekey());
        self.state = LifecycleState::Loading { config, mount };
        Step::LoadSdk
    }

    /// The SDK global is available: create and subscribe the widget.
    pub fn sdk_ready(&mut self, sdk: &S) -> InitOutcome {
        let (config, mount) = match mem::replace(&mut self.state, LifecycleState::Uninitialized) {
            LifecycleState::Loading { config, mount } => (config, mount),
            LifecycleState::TornDown => {
                self.state = LifecycleState::TornDown;
                log::debug!("[{}] Torn down while loading, skipping widget creation", self.label);
                return InitOutcome::Abandoned;
            }
            other => {
                self.state = other;
                return InitOutcome::Ignored;
            }
        };

        let widget = match sdk.create_widget(&mount, &config) {
            Ok(widget) => widget,
            Err(error) => {
                log::error!("[{}] {error}", self.label);
                return InitOutcome::Failed;
            }
        };

        let subscriptions = WidgetEvent::ALL
            .into_iter()
            .map(|event| {
                let relay = self.relay.clone();
                let subscription =
                    widget.subscribe(event, Box::new(move |detail| relay.forward(event, detail)));
                (event, subscription)
            })
            .collect();

        self.state = LifecycleState::Ready(LiveWidget {
            widget,
            subscriptions,
        });
        InitOutcome::Created
    }

    /// The SDK could not be loaded. The component stays inert until remounted.
    pub fn sdk_failed(&mut self, error: &SdkLoadError) {
        match self.state {
            LifecycleState::Loading { .. } => {
                log::error!("[{}] {error}", self.label);
                self.state = LifecycleState::Uninitialized;
            }
            LifecycleState::TornDown => {
                log::debug!("[{}] SDK load failed after teardown: {error}", self.label);
            }
            _ => {}
        }
    }

    /// Resets the live widget in place. Returns whether there was one.
    pub fn reset_if_present(&self) -> bool {
        match &self.state {
            LifecycleState::Ready(live) => {
                live.widget.reset();
                true
            }
            _ => false,
        }
    }

    /// Unsubscribes, then destroys the widget. Safe to call in any phase, and repeatedly.
    pub fn teardown(&mut self) {
        self.relay.close();
        if let LifecycleState::Ready(LiveWidget {
            widget,
            subscriptions,
        }) = mem::replace(&mut self.state, LifecycleState::TornDown)
        {
            for (event, subscription) in subscriptions {
                widget.unsubscribe(event, subscription);
            }
            widget.destroy();
            log::debug!("[{}] Widget destroyed", self.label);
        }
    }
}
