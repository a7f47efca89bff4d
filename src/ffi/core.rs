use std::ffi::{c_char, c_double, c_void};
use std::time::Duration;

use crate::error::{ShapesError, record_error, take_last_error};
use crate::ffi::scaffold::*;
use crate::shapes::{Circle, Shape, circle_area, format_circle_info};

// ---------- FFI: lifecycle ----------

/// Starts logging and the background runtime. Optional: the async entry points start it on
/// first use. Safe to call repeatedly.
#[unsafe(no_mangle)]
pub extern "C" fn shapes_init() -> bool {
    match notifier() {
        Ok(_) => true,
        Err(e) => {
            record_error(&e);
            false
        }
    }
}

/// Sets the delay before each async callback. Fails once the runtime is running.
#[unsafe(no_mangle)]
pub extern "C" fn shapes_set_notify_delay_ms(delay_ms: u64) -> bool {
    match set_notify_delay(Duration::from_millis(delay_ms)) {
        Ok(()) => true,
        Err(e) => {
            record_error(&e);
            false
        }
    }
}

/// Most recent error message recorded on the calling thread, or null. Release with
/// `shapes_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn shapes_last_error() -> *mut c_char {
    match take_last_error() {
        Some(msg) => to_c_string(msg),
        None => std::ptr::null_mut(),
    }
}

// ---------- FFI: areas ----------

#[unsafe(no_mangle)]
pub extern "C" fn shapes_circle_area(radius: c_double) -> c_double {
    circle_area(radius)
}

#[unsafe(no_mangle)]
pub extern "C" fn shapes_circle_struct_area(circle: Circle) -> c_double {
    circle.area()
}

/// 0.0 for an unrecognized `shape_type`.
#[unsafe(no_mangle)]
pub extern "C" fn shapes_shape_area(shape: Shape) -> c_double {
    shape.area()
}

// ---------- FFI: text ----------

/// Returns "Circle with radius R has area A" (two decimals each).
/// The caller owns the result and must release it exactly once with `shapes_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn shapes_format_circle_info(radius: c_double) -> *mut c_char {
    to_c_string(format_circle_info(radius))
}

/// Releases text returned by this library. Null is ignored. A pointer that is not live
/// (already released, or never ours) is not freed; the attempt is logged and recorded.
#[unsafe(no_mangle)]
pub extern "C" fn shapes_free_string(ptr: *mut c_char) {
    if let Err(e) = release_c_string(ptr) {
        record_error(&e);
    }
}

// ---------- FFI: callbacks ----------

/// Calls `callback(value)` on the calling thread and returns its result.
/// Returns NaN and records an error if `callback` is null.
///
/// # Safety
/// `callback`, when non-null, must be a valid function of the declared signature.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn shapes_call_callback(
    value: c_double,
    callback: Option<SyncCallback>,
) -> c_double {
    let Some(cb) = callback else {
        record_error(&ShapesError::InvalidArgument("callback is null"));
        return f64::NAN;
    };
    unsafe { cb(value) }
}

/// Schedules one `callback(π·r², user_data)` after the configured delay and returns at once.
/// The callback's return value is ignored. Returns false (nothing scheduled) if `callback` is
/// null or the runtime cannot start.
///
/// # Safety
/// `callback` and `user_data` must stay valid until the callback has run. It runs on a
/// library worker thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn shapes_circle_area_async(
    radius: c_double,
    callback: Option<AsyncCallback>,
    user_data: *mut c_void,
) -> bool {
    schedule_once(radius, callback, user_data, |native, area| unsafe {
        native.invoke(area);
    })
}

/// Like [`shapes_circle_area_async`] for callbacks that return nothing.
///
/// # Safety
/// Same contract as `shapes_circle_area_async`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn shapes_circle_area_async_notify(
    radius: c_double,
    callback: Option<NotifyCallback>,
    user_data: *mut c_void,
) -> bool {
    schedule_once(radius, callback, user_data, |native, area| unsafe {
        native.invoke(area)
    })
}

/// Schedules up to three `callback(π·r², user_data)` calls, one per delay period, stopping
/// early as soon as the callback returns false. Returns at once.
///
/// # Safety
/// `callback` and `user_data` must stay valid until the last invocation has returned.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn shapes_circle_area_async_multiple(
    radius: c_double,
    callback: Option<AsyncCallback>,
    user_data: *mut c_void,
) -> bool {
    schedule_repeated(radius, callback, user_data, |native, area| unsafe {
        native.invoke(area)
    })
}

/// Like [`shapes_circle_area_async_multiple`] for callbacks that return nothing; always runs
/// all three invocations.
///
/// # Safety
/// `callback` and `user_data` must stay valid until the last invocation has returned.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn shapes_circle_area_async_multiple_notify(
    radius: c_double,
    callback: Option<NotifyCallback>,
    user_data: *mut c_void,
) -> bool {
    schedule_repeated(radius, callback, user_data, |native, area| unsafe {
        native.invoke(area)
    })
}

fn schedule_once<F>(
    radius: f64,
    callback: Option<F>,
    user_data: *mut c_void,
    invoke: impl FnOnce(&NativeCallback<F>, f64) + Send + 'static,
) -> bool
where
    F: Send + 'static,
{
    let Some(func) = callback else {
        record_error(&ShapesError::InvalidArgument("callback is null"));
        return false;
    };
    let notifier = match notifier() {
        Ok(n) => n,
        Err(e) => {
            record_error(&e);
            return false;
        }
    };
    let native = NativeCallback::new(func, user_data);
    notifier.circle_area_once(radius, move |area| invoke(&native, area));
    true
}

fn schedule_repeated<F, R>(
    radius: f64,
    callback: Option<F>,
    user_data: *mut c_void,
    mut invoke: impl FnMut(&NativeCallback<F>, f64) -> R + Send + 'static,
) -> bool
where
    F: Send + 'static,
    R: crate::notifier::Continuation,
{
    let Some(func) = callback else {
        record_error(&ShapesError::InvalidArgument("callback is null"));
        return false;
    };
    let notifier = match notifier() {
        Ok(n) => n,
        Err(e) => {
            record_error(&e);
            return false;
        }
    };
    let native = NativeCallback::new(func, user_data);
    notifier.circle_area_repeated(radius, move |area| invoke(&native, area));
    true
}

// ---------- FFI: number generators ----------

/// Starts a generator producing 0, 1, 2, … and returns its handle (> 0), or 0 on failure.
#[unsafe(no_mangle)]
pub extern "C" fn shapes_generator_create() -> i64 {
    let created = notifier().and_then(|_| {
        let rt = RUNTIME
            .get()
            .ok_or_else(|| ShapesError::RuntimeUnavailable("runtime missing".into()))?;
        GENERATORS.create(rt.handle())
    });
    match created {
        Ok(id) => id,
        Err(e) => {
            record_error(&e);
            0
        }
    }
}

/// Blocks until the generator's next number and writes it to `out`.
/// Returns false for an unknown handle, a null `out`, a stopped and drained generator, or a
/// call from a thread running async tasks (including library callbacks).
///
/// # Safety
/// `out`, when non-null, must point to writable memory for one `int32_t`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn shapes_generator_next(id: i64, out: *mut i32) -> bool {
    if out.is_null() {
        record_error(&ShapesError::InvalidArgument("out is null"));
        return false;
    }
    match GENERATORS.next_blocking(id) {
        Ok(Some(n)) => {
            unsafe { out.write(n) };
            true
        }
        Ok(None) => false,
        Err(e) => {
            record_error(&e);
            false
        }
    }
}

/// Stops the generator; values already buffered can still be read. Idempotent.
#[unsafe(no_mangle)]
pub extern "C" fn shapes_generator_stop(id: i64) -> bool {
    match GENERATORS.stop(id) {
        Ok(()) => true,
        Err(e) => {
            record_error(&e);
            false
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn shapes_generator_free(id: i64) {
    if let Err(e) = GENERATORS.free(id) {
        record_error(&e);
    }
}
