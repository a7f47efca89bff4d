use std::collections::HashSet;
use std::ffi::{CString, c_char, c_double, c_void};
use std::sync::{Mutex, Once};
use std::time::Duration;

use once_cell::sync::{Lazy, OnceCell};
use tokio::runtime::Runtime;

use crate::config::NotifierConfig;
use crate::error::{Result, ShapesError};
use crate::generator::GeneratorTable;
use crate::notifier::Notifier;

/// Host callback consulted for continuation after each invocation.
pub type AsyncCallback = unsafe extern "C" fn(c_double, *mut c_void) -> bool;
/// Host callback without a continuation flag.
pub type NotifyCallback = unsafe extern "C" fn(c_double, *mut c_void);
/// Host callback for the synchronous passthrough.
pub type SyncCallback = unsafe extern "C" fn(c_double) -> c_double;

pub(crate) static RUNTIME: OnceCell<Runtime> = OnceCell::new();
static NOTIFIER: OnceCell<Notifier> = OnceCell::new();
static DELAY_OVERRIDE: Lazy<Mutex<DelayOverride>> =
    Lazy::new(|| Mutex::new(DelayOverride::default()));
pub(crate) static GENERATORS: Lazy<GeneratorTable> = Lazy::new(GeneratorTable::new);

// Addresses of strings handed to the host that have not been released yet.
static LIVE_TEXT: Lazy<Mutex<HashSet<usize>>> = Lazy::new(|| Mutex::new(HashSet::new()));

static TRACING_INIT: Once = Once::new();

pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let stderr_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_thread_ids(true)
            .with_thread_names(true);

        // The host may already own a global subscriber.
        if tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init()
            .is_ok()
        {
            tracing::info!("tracing initialized");
        }
    });
}

/// Host-supplied delay, frozen once the notifier has read it.
#[derive(Debug, Default)]
struct DelayOverride {
    delay: Option<Duration>,
    frozen: bool,
}

impl DelayOverride {
    fn set(&mut self, delay: Duration) -> Result<()> {
        if self.frozen {
            return Err(ShapesError::AlreadyInitialized);
        }
        self.delay = Some(delay);
        Ok(())
    }

    fn freeze(&mut self) -> Option<Duration> {
        self.frozen = true;
        self.delay
    }
}

/// Overrides the notification delay. Only possible before the runtime has started.
pub fn set_notify_delay(delay: Duration) -> Result<()> {
    DELAY_OVERRIDE
        .lock()
        .map_err(|_| ShapesError::LockPoisoned("delay override"))?
        .set(delay)
}

/// The process-wide notifier, starting the runtime on first use.
pub fn notifier() -> Result<&'static Notifier> {
    NOTIFIER.get_or_try_init(|| {
        init_tracing();

        let mut config = NotifierConfig::from_env();
        if let Some(delay) = DELAY_OVERRIDE.lock().ok().and_then(|mut o| o.freeze()) {
            config.delay = delay;
        }

        let runtime = RUNTIME.get_or_try_init(|| build_runtime(config.worker_threads))?;
        tracing::info!(
            delay_ms = config.delay.as_millis() as u64,
            workers = config.worker_threads,
            "notifier runtime started"
        );
        Ok(Notifier::new(runtime.handle().clone(), config))
    })
}

// Built on its own thread so a host that is itself inside a tokio runtime can call us.
fn build_runtime(worker_threads: usize) -> Result<Runtime> {
    std::thread::spawn(move || {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(worker_threads)
            .thread_name("shapes-worker")
            .enable_all()
            .build()
            .map_err(|e| ShapesError::RuntimeUnavailable(e.to_string()))
    })
    .join()
    .unwrap_or_else(|_| {
        Err(ShapesError::RuntimeUnavailable(
            "runtime builder thread panicked".to_string(),
        ))
    })
}

/// Hands `s` to the host as a NUL-terminated heap string. Null if `s` contains a NUL byte.
pub fn to_c_string(s: String) -> *mut c_char {
    let Ok(c) = CString::new(s) else {
        return std::ptr::null_mut();
    };
    let ptr = c.into_raw();
    if let Ok(mut live) = LIVE_TEXT.lock() {
        live.insert(ptr as usize);
    }
    ptr
}

/// Reclaims a string from [`to_c_string`]. Null is a no-op; anything not currently live
/// (foreign or already released) is left untouched and reported.
pub fn release_c_string(ptr: *mut c_char) -> Result<()> {
    if ptr.is_null() {
        return Ok(());
    }
    let was_live = LIVE_TEXT
        .lock()
        .map(|mut live| live.remove(&(ptr as usize)))
        .unwrap_or(false);
    if !was_live {
        tracing::error!(?ptr, "refusing to release unknown or already released text");
        return Err(ShapesError::UnknownText);
    }
    // SAFETY: ptr came from CString::into_raw in to_c_string and was live until just now.
    unsafe {
        drop(CString::from_raw(ptr));
    }
    Ok(())
}

/// A host function pointer together with the host's opaque context.
///
/// The context is never dereferenced here; the host guarantees both stay valid until the
/// last invocation returns, which is what makes moving this to a worker thread sound.
pub struct NativeCallback<F> {
    func: F,
    ctx: *mut c_void,
}

unsafe impl<F: Send> Send for NativeCallback<F> {}

impl<F> NativeCallback<F> {
    pub fn new(func: F, ctx: *mut c_void) -> Self {
        Self { func, ctx }
    }
}

impl NativeCallback<AsyncCallback> {
    /// # Safety
    /// The function pointer and context supplied by the host must still be valid.
    pub unsafe fn invoke(&self, value: f64) -> bool {
        unsafe { (self.func)(value, self.ctx) }
    }
}

impl NativeCallback<NotifyCallback> {
    /// # Safety
    /// The function pointer and context supplied by the host must still be valid.
    pub unsafe fn invoke(&self, value: f64) {
        unsafe { (self.func)(value, self.ctx) }
    }
}
