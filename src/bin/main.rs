// src/bin/main.rs
//
// Demo host: drives the exported C symbols exactly as a C program would, with extern "C"
// trampolines bridging the async callbacks into tokio channels.
use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use std::ffi::{CStr, c_double, c_void};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

// FFI from the library crate
use shapes_ffi::{
    Circle, MULTI_SHOT_COUNT, Shape, ShapeKind, shapes_call_callback, shapes_circle_area,
    shapes_circle_area_async, shapes_circle_area_async_multiple, shapes_circle_struct_area,
    shapes_format_circle_info, shapes_free_string, shapes_generator_create,
    shapes_generator_free, shapes_generator_next, shapes_generator_stop, shapes_init,
    shapes_last_error, shapes_set_notify_delay_ms, shapes_shape_area,
};

#[derive(Parser, Debug)]
#[command(name = "shapes-cli")]
#[command(about = "Exercise the shapes_ffi C interface")]
struct Cli {
    /// Delay before each async callback, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run every demo in turn
    Demo {
        #[arg(default_value_t = 10.0)]
        radius: f64,
    },
    /// Circle area, by value and by struct
    Area { radius: f64 },
    /// Area of a tagged shape record
    Shape {
        kind: KindArg,
        dimension1: f64,
        #[arg(default_value_t = 0.0)]
        dimension2: f64,
    },
    /// Formatted circle description (library-owned string)
    Info { radius: f64 },
    /// Synchronous callback passthrough with a squaring callback
    Callback { value: f64 },
    /// Single-shot async area
    Async { radius: f64 },
    /// Multi-shot async area, optionally stopping after N callbacks
    Multi {
        radius: f64,
        #[arg(long)]
        stop_after: Option<u32>,
    },
    /// Read numbers from a library-side generator
    Generate {
        #[arg(default_value_t = 5)]
        count: u32,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum KindArg {
    Circle,
    Square,
    Triangle,
}

impl From<KindArg> for ShapeKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Circle => ShapeKind::Circle,
            KindArg::Square => ShapeKind::Square,
            KindArg::Triangle => ShapeKind::Triangle,
        }
    }
}

fn last_error() -> String {
    let ptr = shapes_last_error();
    if ptr.is_null() {
        return "unknown error".to_string();
    }
    let msg = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
    shapes_free_string(ptr);
    msg
}

extern "C" fn square_callback(val: c_double) -> c_double {
    val * val
}

/// One-shot trampoline: takes back the boxed sender and completes it.
unsafe extern "C" fn on_area(area: c_double, user_data: *mut c_void) -> bool {
    let sender = unsafe { Box::from_raw(user_data as *mut oneshot::Sender<f64>) };
    let _ = sender.send(area);
    false
}

struct MultiShot {
    tx: mpsc::UnboundedSender<f64>,
    calls: AtomicU32,
    stop_after: u32,
}

/// Multi-shot trampoline. On its final invocation it frees the context, which closes the
/// channel on the receiving side.
unsafe extern "C" fn on_area_multi(area: c_double, user_data: *mut c_void) -> bool {
    let state = unsafe { &*(user_data as *const MultiShot) };
    let n = state.calls.fetch_add(1, Ordering::SeqCst) + 1;
    let _ = state.tx.send(area);
    let keep_going = n < state.stop_after.min(MULTI_SHOT_COUNT);
    if !keep_going {
        drop(unsafe { Box::from_raw(user_data as *mut MultiShot) });
    }
    keep_going
}

fn area(radius: f64) {
    println!("Synchronous area: {}", shapes_circle_area(radius));
    let circle = Circle { radius };
    println!("Struct-based area: {}", shapes_circle_struct_area(circle));
}

fn shape(kind: ShapeKind, dimension1: f64, dimension2: f64) {
    let shape = Shape::new(kind, dimension1, dimension2);
    println!("{kind:?} area using Shape record: {}", shapes_shape_area(shape));
}

fn info(radius: f64) -> Result<()> {
    let ptr = shapes_format_circle_info(radius);
    if ptr.is_null() {
        return Err(anyhow!("format_circle_info returned null: {}", last_error()));
    }
    let text = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
    shapes_free_string(ptr);
    println!("{text}");
    Ok(())
}

fn callback(value: f64) {
    let result = unsafe { shapes_call_callback(value, Some(square_callback)) };
    println!("Callback result (square of {value}): {result}");
}

async fn single_shot(radius: f64) -> Result<()> {
    let (tx, rx) = oneshot::channel::<f64>();
    let user_data = Box::into_raw(Box::new(tx)) as *mut c_void;
    if !unsafe { shapes_circle_area_async(radius, Some(on_area), user_data) } {
        drop(unsafe { Box::from_raw(user_data as *mut oneshot::Sender<f64>) });
        return Err(anyhow!("async call rejected: {}", last_error()));
    }
    println!("Calling asynchronous one-shot calculation...");
    let area = rx.await?;
    println!("Asynchronous area for radius {radius}: {area}");
    Ok(())
}

async fn multi_shot(radius: f64, stop_after: Option<u32>, timeout: Duration) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let state = MultiShot {
        tx,
        calls: AtomicU32::new(0),
        stop_after: stop_after.unwrap_or(MULTI_SHOT_COUNT),
    };
    let user_data = Box::into_raw(Box::new(state)) as *mut c_void;
    if !unsafe { shapes_circle_area_async_multiple(radius, Some(on_area_multi), user_data) } {
        drop(unsafe { Box::from_raw(user_data as *mut MultiShot) });
        return Err(anyhow!("async call rejected: {}", last_error()));
    }

    println!("Calling asynchronous multi-shot calculation...");
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            result = rx.recv() => match result {
                Some(area) => println!("Asynchronous multi-shot area: {area}"),
                None => {
                    println!("{}", "Channel closed, all results received".green());
                    break;
                }
            },
            _ = &mut deadline => {
                println!("{}", "Timeout waiting for results".yellow());
                break;
            }
        }
    }
    Ok(())
}

fn generate(count: u32) -> Result<()> {
    let id = shapes_generator_create();
    if id == 0 {
        return Err(anyhow!("generator create failed: {}", last_error()));
    }
    for _ in 0..count {
        let mut n = 0i32;
        if !unsafe { shapes_generator_next(id, &mut n) } {
            break;
        }
        println!("Received number: {n}");
    }
    shapes_generator_stop(id);
    shapes_generator_free(id);
    println!("Number generator stopped");
    Ok(())
}

/// Generator reads block and are refused on runtime threads (blocking pool included), so
/// they run on a plain OS thread.
fn generate_off_runtime(count: u32) -> Result<()> {
    std::thread::spawn(move || generate(count))
        .join()
        .map_err(|_| anyhow!("generator thread panicked"))?
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(ms) = cli.delay_ms {
        if !shapes_set_notify_delay_ms(ms) {
            return Err(anyhow!("failed to set delay: {}", last_error()));
        }
    }
    if !shapes_init() {
        return Err(anyhow!("failed to initialize: {}", last_error()));
    }

    // Generous upper bound for the multi-shot sequence.
    let multi_timeout = Duration::from_millis(cli.delay_ms.unwrap_or(1000) * 4 + 500);

    match cli.command.unwrap_or(Commands::Demo { radius: 10.0 }) {
        Commands::Demo { radius } => {
            area(radius);
            info(radius)?;
            callback(5.0);
            single_shot(radius).await?;
            multi_shot(radius, None, multi_timeout).await?;
            shape(ShapeKind::Circle, 5.0, 0.0);
            shape(ShapeKind::Triangle, 4.0, 3.0);
            println!("\n{}", "Number generator:".cyan());
            generate_off_runtime(5)?;
        }
        Commands::Area { radius } => area(radius),
        Commands::Shape {
            kind,
            dimension1,
            dimension2,
        } => shape(kind.into(), dimension1, dimension2),
        Commands::Info { radius } => info(radius)?,
        Commands::Callback { value } => callback(value),
        Commands::Async { radius } => single_shot(radius).await?,
        Commands::Multi { radius, stop_after } => {
            multi_shot(radius, stop_after, multi_timeout).await?
        }
        Commands::Generate { count } => generate_off_runtime(count)?,
    }

    Ok(())
}
