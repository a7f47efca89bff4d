// src/error.rs

use std::cell::RefCell;

/// Errors surfaced across the C boundary
#[derive(Debug, thiserror::Error)]
pub enum ShapesError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Unknown generator handle: {0}")]
    UnknownHandle(i64),

    #[error("Text was not handed out by this library or was already released")]
    UnknownText,

    #[error("Runtime already initialized; configuration is frozen")]
    AlreadyInitialized,

    #[error("Blocking call made from inside an async runtime: {0}")]
    BlockingInRuntime(&'static str),

    #[error("Internal lock poisoned: {0}")]
    LockPoisoned(&'static str),
}

pub type Result<T> = std::result::Result<T, ShapesError>;

thread_local! {
    // Per calling thread, like errno.
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Logs the error and stores its message for `shapes_last_error` on the current thread.
pub fn record_error(err: &ShapesError) {
    tracing::warn!("{err}");
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(err.to_string()));
}

/// Takes the current thread's most recent error message, clearing the slot.
pub fn take_last_error() -> Option<String> {
    LAST_ERROR.with(|slot| slot.borrow_mut().take())
}
