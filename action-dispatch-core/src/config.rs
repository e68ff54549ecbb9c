//! Dispatcher configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound on nested worker follow-up flows.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default bound on redirect splices within one flow queue.
pub const DEFAULT_MAX_REDIRECTS: usize = 1024;

/// Limits applied to every `fire` invocation.
///
/// Deserializes from JSON with every field optional:
///
/// ```
/// use action_dispatch_core::DispatcherConfig;
///
/// let config = DispatcherConfig::from_json(r#"{ "max_depth": 8, "timeout_ms": 250 }"#).unwrap();
/// assert_eq!(config.max_depth, 8);
/// assert_eq!(config.max_redirects, 1024);
/// assert_eq!(config.timeout, Some(std::time::Duration::from_millis(250)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// How deep worker follow-up flows may nest before the invocation fails.
    pub max_depth: usize,
    /// How many redirects one flow queue may splice before the invocation fails.
    pub max_redirects: usize,
    /// Upper bound on the duration of one top-level invocation.
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Option<Duration>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: None,
        }
    }
}

impl DispatcherConfig {
    /// Parse a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Set the follow-up nesting limit.
    #[must_use]
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the redirect limit.
    #[must_use]
    pub fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Set the per-invocation timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::ser::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => {
                let millis = u64::try_from(duration.as_millis()).map_err(|_| {
                    S::Error::custom(format!("timeout {duration:?} does not fit in u64 milliseconds"))
                })?;
                serializer.serialize_some(&millis)
            }
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
