//! Circle and shape areas exported through a C ABI, including callbacks invoked from
//! background tasks.
//!
//! The Rust API ([`shapes`], [`notifier`], [`generator`]) is what the `extern "C"` layer in
//! [`ffi`] is built on. C hosts use the symbols declared in `include/shapes_ffi.h`.

pub mod config;
pub mod error;
pub mod ffi;
pub mod generator;
pub mod notifier;
pub mod shapes;

pub use config::NotifierConfig;
pub use error::{Result, ShapesError};
pub use ffi::*;
pub use generator::{GeneratorTable, NumberGenerator};
pub use notifier::{Continuation, MULTI_SHOT_COUNT, Notifier, ShotState};
pub use shapes::{Circle, Shape, ShapeKind, circle_area, format_circle_info, square_area, triangle_area};
