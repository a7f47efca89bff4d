// src/config.rs
//
// Notifier / runtime configuration. Defaults can be overridden from the environment,
// and the delay from the C side (`shapes_set_notify_delay_ms`) until the runtime starts.

use std::time::Duration;

pub const DEFAULT_NOTIFY_DELAY: Duration = Duration::from_millis(1000);
pub const DEFAULT_WORKER_THREADS: usize = 2;

pub const ENV_NOTIFY_DELAY_MS: &str = "SHAPES_NOTIFY_DELAY_MS";
pub const ENV_WORKER_THREADS: &str = "SHAPES_WORKER_THREADS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    /// Wait before each callback invocation
    pub delay: Duration,
    pub worker_threads: usize,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_NOTIFY_DELAY,
            worker_threads: DEFAULT_WORKER_THREADS,
        }
    }
}

impl NotifierConfig {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Defaults, overridden by `SHAPES_NOTIFY_DELAY_MS` / `SHAPES_WORKER_THREADS` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading through `lookup`.
    /// Unparseable values fall back to the default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(raw) = lookup(ENV_NOTIFY_DELAY_MS) {
            match raw.trim().parse::<u64>() {
                Ok(ms) => cfg.delay = Duration::from_millis(ms),
                Err(e) => tracing::warn!("ignoring {ENV_NOTIFY_DELAY_MS}={raw:?}: {e}"),
            }
        }

        if let Some(raw) = lookup(ENV_WORKER_THREADS) {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => cfg.worker_threads = n,
                Ok(_) => tracing::warn!("ignoring {ENV_WORKER_THREADS}=0"),
                Err(e) => tracing::warn!("ignoring {ENV_WORKER_THREADS}={raw:?}: {e}"),
            }
        }

        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        assert_eq!(NotifierConfig::from_lookup(|_| None), NotifierConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let cfg = NotifierConfig::from_lookup(lookup_from(&[
            (ENV_NOTIFY_DELAY_MS, "25"),
            (ENV_WORKER_THREADS, " 4 "),
        ]));
        assert_eq!(cfg.delay, Duration::from_millis(25));
        assert_eq!(cfg.worker_threads, 4);
    }

    #[test]
    fn bad_values_keep_defaults() {
        let cfg = NotifierConfig::from_lookup(lookup_from(&[
            (ENV_NOTIFY_DELAY_MS, "soon"),
            (ENV_WORKER_THREADS, "0"),
        ]));
        assert_eq!(cfg, NotifierConfig::default());
    }
}
