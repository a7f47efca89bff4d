// src/notifier.rs
//
// Async Notifier: computes a circle area on a background task and reports it through a
// callback, once or up to MULTI_SHOT_COUNT times.
//
// Lifecycle of one repeated notification:
//   Idle ──start──▶ Running(0) ──tick──▶ Running(1) ──tick──▶ … ──▶ Done
//                       │ callback returned false / last tick        ▲
//                       └─────────────────────────────────────────────┘

use tokio::runtime::Handle;

use crate::config::NotifierConfig;
use crate::shapes::circle_area;

/// Upper bound on callback invocations for a repeated notification.
pub const MULTI_SHOT_COUNT: u32 = 3;

/// What a callback's return value says about further invocations.
pub trait Continuation {
    fn keep_going(self) -> bool;
}

impl Continuation for bool {
    fn keep_going(self) -> bool {
        self
    }
}

/// Callbacks without a return value never stop the sequence early.
impl Continuation for () {
    fn keep_going(self) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotState {
    Idle,
    Running(u32),
    Done,
}

impl ShotState {
    pub fn start(self, total: u32) -> Self {
        match self {
            ShotState::Idle if total > 0 => ShotState::Running(0),
            ShotState::Idle => ShotState::Done,
            other => other,
        }
    }

    /// Transition after the callback for the current tick returned.
    pub fn advance(self, keep_going: bool, total: u32) -> Self {
        match self {
            ShotState::Running(i) if keep_going && i + 1 < total => ShotState::Running(i + 1),
            ShotState::Running(_) => ShotState::Done,
            other => other,
        }
    }
}

/// Spawns notification tasks onto a tokio runtime.
#[derive(Debug, Clone)]
pub struct Notifier {
    handle: Handle,
    config: NotifierConfig,
}

impl Notifier {
    pub fn new(handle: Handle, config: NotifierConfig) -> Self {
        Self { handle, config }
    }

    /// Notifier on the runtime the caller is currently running in.
    ///
    /// Panics outside a tokio runtime, like [`Handle::current`].
    pub fn current(config: NotifierConfig) -> Self {
        Self::new(Handle::current(), config)
    }

    /// Returns immediately; `callback` receives π·r² once, after the configured delay.
    pub fn circle_area_once<F>(&self, radius: f64, callback: F)
    where
        F: FnOnce(f64) + Send + 'static,
    {
        let delay = self.config.delay;
        self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let area = circle_area(radius);
            tracing::debug!(radius, area, "single-shot notification");
            callback(area);
        });
    }

    /// Returns immediately; `callback` receives π·r² up to [`MULTI_SHOT_COUNT`] times,
    /// each after the configured delay, until it returns `false`.
    pub fn circle_area_repeated<F, R>(&self, radius: f64, callback: F)
    where
        F: FnMut(f64) -> R + Send + 'static,
        R: Continuation,
    {
        self.repeat(MULTI_SHOT_COUNT, move || circle_area(radius), callback);
    }

    /// Runs `compute` and hands its value to `callback` once per tick, for at most `shots` ticks.
    /// Ticks never overlap: tick i+1 starts its delay only after callback i returned.
    pub fn repeat<C, F, R>(&self, shots: u32, mut compute: C, mut callback: F)
    where
        C: FnMut() -> f64 + Send + 'static,
        F: FnMut(f64) -> R + Send + 'static,
        R: Continuation,
    {
        let delay = self.config.delay;
        self.handle.spawn(async move {
            let mut state = ShotState::Idle.start(shots);
            while let ShotState::Running(tick) = state {
                tokio::time::sleep(delay).await;
                let value = compute();
                let keep_going = callback(value).keep_going();
                tracing::debug!(tick, value, keep_going, "multi-shot notification");
                state = state.advance(keep_going, shots);
            }
            tracing::trace!("multi-shot notification done");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_full_count_when_always_continuing() {
        let mut state = ShotState::Idle.start(3);
        let mut ticks = 0;
        while let ShotState::Running(i) = state {
            assert_eq!(i, ticks);
            ticks += 1;
            state = state.advance(true, 3);
        }
        assert_eq!(ticks, 3);
        assert_eq!(state, ShotState::Done);
    }

    #[test]
    fn stops_on_false() {
        let state = ShotState::Idle.start(3);
        let state = state.advance(true, 3);
        assert_eq!(state, ShotState::Running(1));
        assert_eq!(state.advance(false, 3), ShotState::Done);
    }

    #[test]
    fn zero_shots_is_done_immediately() {
        assert_eq!(ShotState::Idle.start(0), ShotState::Done);
    }

    #[test]
    fn done_is_terminal() {
        assert_eq!(ShotState::Done.advance(true, 3), ShotState::Done);
        assert_eq!(ShotState::Done.start(3), ShotState::Done);
    }

    #[test]
    fn unit_callbacks_continue() {
        assert!(().keep_going());
        assert!(!false.keep_going());
    }
}
