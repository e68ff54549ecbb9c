//! Filtered action logging
//!
//! [`ActionLoggerMiddleware`] traces completed and failed actions through
//! `tracing`, optionally keeping the most recent outcomes in an
//! [`ActionLog`] ring buffer. Which actions are logged is decided by glob
//! patterns over action names.
//!
//! ```ignore
//! use action_dispatch::{ActionLogConfig, ActionLoggerConfig, ActionLoggerMiddleware};
//!
//! // Everything but `Tick`, tracing only
//! let tracing_only = ActionLoggerMiddleware::new(ActionLoggerConfig::default());
//!
//! // Only `Net*` actions, with the last 50 outcomes kept in memory
//! let filter = ActionLoggerConfig::new(Some("Net*"), None);
//! let recorder = ActionLoggerMiddleware::with_log(ActionLogConfig::new(50, filter));
//! dispatcher.register_middleware(recorder.clone());
//!
//! if let Some(log) = recorder.log() {
//!     for entry in log.recent(10) {
//!         println!("#{} {} {:?}", entry.sequence, entry.name, entry.outcome);
//!     }
//! }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::action::AnyAction;
use crate::error::{BoxError, DispatchError};
use crate::middleware::{Interception, Middleware};

/// Patterns excluded when no exclude list is given.
const DEFAULT_EXCLUDES: &[&str] = &["Tick"];

/// Default number of entries an [`ActionLog`] keeps.
pub const DEFAULT_LOG_CAPACITY: usize = 100;

/// Include/exclude glob filter over action names.
///
/// An action is logged when it matches at least one include pattern (or the
/// include list is empty) and matches no exclude pattern. Patterns use `*`
/// for any run of characters and `?` for exactly one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionLoggerConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for ActionLoggerConfig {
    fn default() -> Self {
        Self::from_patterns(Vec::new(), default_excludes())
    }
}

impl ActionLoggerConfig {
    /// Build a filter from comma-separated pattern lists.
    ///
    /// `None` for `include` means every action; `None` for `exclude` keeps
    /// the default excludes. Blank entries are ignored.
    ///
    /// ```
    /// use action_dispatch_core::ActionLoggerConfig;
    ///
    /// let config = ActionLoggerConfig::new(Some("Net*, Login"), Some("NetKeepAlive"));
    /// assert!(config.should_log("NetConnect"));
    /// assert!(config.should_log("Login"));
    /// assert!(!config.should_log("NetKeepAlive"));
    /// assert!(!config.should_log("Logout"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self::from_patterns(
            include.map(parse_list).unwrap_or_default(),
            exclude.map_or_else(default_excludes, parse_list),
        )
    }

    /// Build a filter from pattern lists as-is.
    pub fn from_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// A filter that lets every action through.
    pub fn everything() -> Self {
        Self::from_patterns(Vec::new(), Vec::new())
    }

    /// Returns true if an action with this name passes the filter.
    pub fn should_log(&self, name: &str) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|p| glob_match(p, name));
        included && !self.exclude.iter().any(|p| glob_match(p, name))
    }
}

fn default_excludes() -> Vec<String> {
    DEFAULT_EXCLUDES.iter().map(|p| (*p).to_owned()).collect()
}

fn parse_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_owned)
        .collect()
}

/// How a logged action ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// Carries the error's display text
    Failed(String),
}

/// One recorded action outcome.
#[derive(Debug, Clone)]
pub struct ActionLogEntry {
    pub name: &'static str,
    /// `Debug` rendering of the action payload
    pub summary: String,
    pub logged_at: Instant,
    /// Position in the log since it was created; never reused
    pub sequence: u64,
    pub outcome: ActionOutcome,
}

impl ActionLogEntry {
    pub fn new(name: &'static str, summary: String, sequence: u64, outcome: ActionOutcome) -> Self {
        Self {
            name,
            summary,
            logged_at: Instant::now(),
            sequence,
            outcome,
        }
    }

    /// How long ago the entry was recorded.
    pub fn age(&self) -> Duration {
        self.logged_at.elapsed()
    }

    /// Compact age for display: `850ms`, `4.2s`, `3m07s`.
    pub fn elapsed_display(&self) -> String {
        format_age(self.age())
    }
}

fn format_age(age: Duration) -> String {
    match age.as_secs() {
        0 => format!("{}ms", age.as_millis()),
        1..=59 => format!("{:.1}s", age.as_secs_f64()),
        secs => format!("{}m{:02}s", secs / 60, secs % 60),
    }
}

/// Sizing and filtering for an [`ActionLog`].
#[derive(Debug, Clone)]
pub struct ActionLogConfig {
    /// Entries kept before the oldest is dropped; zero disables storage
    pub capacity: usize,
    pub filter: ActionLoggerConfig,
}

impl Default for ActionLogConfig {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY, ActionLoggerConfig::default())
    }
}

impl ActionLogConfig {
    pub fn new(capacity: usize, filter: ActionLoggerConfig) -> Self {
        Self { capacity, filter }
    }

    /// Default filter with a different capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::new(capacity, ActionLoggerConfig::default())
    }
}

/// Bounded, oldest-first record of action outcomes.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    ring: VecDeque<ActionLogEntry>,
    config: ActionLogConfig,
    recorded: u64,
}

impl ActionLog {
    pub fn new(config: ActionLogConfig) -> Self {
        Self {
            ring: VecDeque::with_capacity(config.capacity.min(DEFAULT_LOG_CAPACITY)),
            config,
            recorded: 0,
        }
    }

    /// Record an outcome unless the filter rejects the action.
    ///
    /// Returns the stored entry.
    pub fn record(&mut self, action: &AnyAction, outcome: ActionOutcome) -> Option<&ActionLogEntry> {
        if self.config.capacity == 0 || !self.config.filter.should_log(action.name()) {
            return None;
        }

        while self.ring.len() >= self.config.capacity {
            self.ring.pop_front();
        }
        let sequence = self.recorded;
        self.recorded += 1;
        self.ring.push_back(ActionLogEntry::new(
            action.name(),
            format!("{action:?}"),
            sequence,
            outcome,
        ));
        self.ring.back()
    }

    /// Stored entries, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &ActionLogEntry> {
        self.ring.iter()
    }

    /// Up to `count` entries, newest first.
    pub fn recent(&self, count: usize) -> impl Iterator<Item = &ActionLogEntry> {
        self.ring.iter().rev().take(count)
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Drop stored entries. Sequence numbers keep counting.
    pub fn clear(&mut self) {
        self.ring.clear();
    }

    pub fn config(&self) -> &ActionLogConfig {
        &self.config
    }
}

/// Middleware that traces filtered actions and can keep an [`ActionLog`].
///
/// `pre` traces at `trace` level; completions and failures are traced at
/// `debug` and, with storage enabled, recorded. Clones share the log.
#[derive(Debug, Clone)]
pub struct ActionLoggerMiddleware {
    filter: ActionLoggerConfig,
    log: Option<Arc<Mutex<ActionLog>>>,
    active: bool,
}

impl ActionLoggerMiddleware {
    /// Tracing only, no storage.
    pub fn new(filter: ActionLoggerConfig) -> Self {
        Self {
            filter,
            log: None,
            active: true,
        }
    }

    /// Tracing plus a ring buffer; the buffer's filter applies to both.
    pub fn with_log(config: ActionLogConfig) -> Self {
        Self {
            filter: config.filter.clone(),
            log: Some(Arc::new(Mutex::new(ActionLog::new(config)))),
            active: true,
        }
    }

    pub fn with_default_log() -> Self {
        Self::with_log(ActionLogConfig::default())
    }

    /// Tracing only, with nothing filtered out.
    pub fn log_all() -> Self {
        Self::new(ActionLoggerConfig::everything())
    }

    /// Switch every hook on or off, e.g. from a CLI flag.
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Copy of the stored log, if storage is enabled.
    pub fn log(&self) -> Option<ActionLog> {
        self.log.as_deref().map(|log| lock(log).clone())
    }

    pub fn config(&self) -> &ActionLoggerConfig {
        &self.filter
    }

    fn observe(&self, action: &AnyAction, outcome: ActionOutcome) {
        if !self.active {
            return;
        }
        if self.filter.should_log(action.name()) {
            match &outcome {
                ActionOutcome::Completed => {
                    tracing::debug!(action = %action.name(), "action completed");
                }
                ActionOutcome::Failed(error) => {
                    tracing::debug!(action = %action.name(), %error, "action failed");
                }
            }
        }
        if let Some(log) = &self.log {
            lock(log).record(action, outcome);
        }
    }
}

#[async_trait]
impl Middleware for ActionLoggerMiddleware {
    async fn pre(&self, action: &AnyAction) -> Result<Interception, BoxError> {
        if self.active && self.filter.should_log(action.name()) {
            tracing::trace!(action = %action.name(), payload = ?action, "action");
        }
        Ok(Interception::Continue)
    }

    fn post(&self, action: &AnyAction) {
        self.observe(action, ActionOutcome::Completed);
    }

    fn failure(&self, action: &AnyAction, error: &DispatchError) {
        self.observe(action, ActionOutcome::Failed(error.to_string()));
    }
}

fn lock(log: &Mutex<ActionLog>) -> MutexGuard<'_, ActionLog> {
    log.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Glob match over whole strings: `*` is any run of characters, `?` exactly one.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let text: Vec<char> = text.chars().collect();
    let mut segments = pattern.split('*');

    // Text before the first `*` is anchored at the start.
    let head: Vec<char> = segments.next().unwrap_or_default().chars().collect();
    if !starts_with(&text, &head) {
        return false;
    }
    let mut rest = &text[head.len()..];

    let tail: Vec<Vec<char>> = segments.map(|s| s.chars().collect()).collect();
    let Some((last, middle)) = tail.split_last() else {
        // No `*`: the head must be the whole text.
        return rest.is_empty();
    };

    for segment in middle {
        match find(rest, segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }

    // Text after the last `*` is anchored at the end.
    rest.len() >= last.len() && starts_with(&rest[rest.len() - last.len()..], last)
}

fn starts_with(text: &[char], segment: &[char]) -> bool {
    text.len() >= segment.len()
        && segment
            .iter()
            .zip(text)
            .all(|(p, c)| *p == '?' || p == c)
}

fn find(text: &[char], segment: &[char]) -> Option<usize> {
    (0..=text.len().checked_sub(segment.len())?).find(|&at| starts_with(&text[at..], segment))
}
