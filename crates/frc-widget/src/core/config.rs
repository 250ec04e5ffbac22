//! Widget configuration and the layered resolver.
//!
//! Three sources feed every field, first non-empty value wins:
//! local attributes set by the host, the remote configuration and the
//! hard-coded defaults below.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

pub const DEFAULT_API_ENDPOINT: &str = "global";
pub const DEFAULT_START_MODE: StartMode = StartMode::Focus;
pub const DEFAULT_THEME: Theme = Theme::Light;

/// When the widget starts solving its challenge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartMode {
    Focus,
    None,
}

impl StartMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StartMode::Focus => "focus",
            StartMode::None => "none",
        }
    }
}

impl FromStr for StartMode {
    type Err = InvalidValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "focus" => Ok(StartMode::Focus),
            "none" => Ok(StartMode::None),
            _ => Err(InvalidValue::new("startMode", value)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
    Auto,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::Auto => "auto",
        }
    }
}

impl FromStr for Theme {
    type Err = InvalidValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "auto" => Ok(Theme::Auto),
            _ => Err(InvalidValue::new("theme", value)),
        }
    }
}

/// A value that does not belong to the field's enum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidValue {
    pub field: &'static str,
    pub value: String,
}

impl InvalidValue {
    fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_string(),
        }
    }
}

impl fmt::Display for InvalidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} value {:?}", self.field, self.value)
    }
}

impl std::error::Error for InvalidValue {}

/// One configuration source with every field optional.
///
/// Used both for the host attributes and for the remote configuration
/// payload (camelCase JSON, unknown keys ignored).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigLayer {
    pub sitekey: Option<String>,
    pub api_endpoint: Option<String>,
    pub start_mode: Option<String>,
    pub theme: Option<String>,
    pub language: Option<String>,
}

/// Remote configuration uses the same shape as the local attributes.
pub type RemoteConfig = ConfigLayer;

impl ConfigLayer {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Fully resolved options passed to `createWidget`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WidgetConfig {
    sitekey: String,
    pub api_endpoint: String,
    pub start_mode: StartMode,
    pub theme: Theme,
    pub language: Option<String>,
}

impl WidgetConfig {
    /// The sitekey is guaranteed non-empty.
    pub fn sitekey(&self) -> &str {
        &self.sitekey
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResolveError {
    MissingSitekey,
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::MissingSitekey => write!(f, "Missing \"sitekey\" parameter"),
        }
    }
}

impl std::error::Error for ResolveError {}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|value| !value.is_empty())
}

fn first_text<'a>(
    layers: &[&'a ConfigLayer],
    field: fn(&ConfigLayer) -> &Option<String>,
) -> Option<&'a str> {
    layers.iter().find_map(|&layer| non_empty(field(layer)))
}

/// Output of [`resolve`]: the config plus every invalid value that was skipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    pub config: WidgetConfig,
    pub ignored: Vec<InvalidValue>,
}

/// First layer holding a valid value wins. Invalid values are collected into `ignored`
/// so a typo in one source falls through to the next one.
fn first_parsed<T: FromStr<Err = InvalidValue>>(
    layers: &[&ConfigLayer],
    field: fn(&ConfigLayer) -> &Option<String>,
    ignored: &mut Vec<InvalidValue>,
) -> Option<T> {
    layers.iter().find_map(|&layer| {
        let raw = non_empty(field(layer))?;
        raw.parse().map_err(|error| ignored.push(error)).ok()
    })
}

/// Merges local attributes over the remote configuration over the defaults.
pub fn resolve(local: &ConfigLayer, remote: &ConfigLayer) -> Result<Resolved, ResolveError> {
    let layers = [local, remote];
    let mut ignored = Vec::new();

    let sitekey = first_text(&layers, |layer| &layer.sitekey).ok_or(ResolveError::MissingSitekey)?;

    let config = WidgetConfig {
        sitekey: sitekey.to_string(),
        api_endpoint: first_text(&layers, |layer| &layer.api_endpoint)
            .unwrap_or(DEFAULT_API_ENDPOINT)
            .to_string(),
        start_mode: first_parsed(&layers, |layer| &layer.start_mode, &mut ignored)
            .unwrap_or(DEFAULT_START_MODE),
        theme: first_parsed(&layers, |layer| &layer.theme, &mut ignored).unwrap_or(DEFAULT_THEME),
        language: first_text(&layers, |layer| &layer.language).map(str::to_string),
    };
    Ok(Resolved { config, ignored })
}
