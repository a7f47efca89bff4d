// src/ffi/mod.rs
//
// All FFI functions for C/C++ interop live here.
// The exported symbols are declared for C hosts in include/shapes_ffi.h.

mod core;
mod scaffold;

// Re-export scaffold utilities (used by the exports and by Rust hosts/tests)
pub use scaffold::{
    AsyncCallback, NativeCallback, NotifyCallback, SyncCallback, init_tracing, notifier,
    release_c_string, set_notify_delay, to_c_string,
};

// Re-export all FFI functions from core
// These are the #[no_mangle] extern "C" functions called from C
pub use self::core::*;
