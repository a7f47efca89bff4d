// src/generator.rs
//
// Number generators addressed by integer handles. Each generator is a background task
// feeding 0, 1, 2, … into a one-slot channel; the C side only ever sees the i64 id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

use crate::error::{Result, ShapesError};

pub struct NumberGenerator {
    rx: Mutex<mpsc::Receiver<i32>>,
    stop_tx: watch::Sender<bool>,
}

impl NumberGenerator {
    pub fn spawn(handle: &Handle) -> Self {
        let (tx, rx) = mpsc::channel::<i32>(1);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        handle.spawn(async move {
            let mut n: i32 = 0;
            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    sent = tx.send(n) => {
                        if sent.is_err() {
                            break;
                        }
                        n = n.wrapping_add(1);
                    }
                }
            }
            tracing::debug!(last = n, "number generator finished");
        });

        Self {
            rx: Mutex::new(rx),
            stop_tx,
        }
    }

    /// Blocks until the next number; `None` once stopped and drained.
    /// Refused on any thread that carries a tokio runtime context (host runtimes as well as
    /// our own workers), where blocking would panic.
    pub fn next_blocking(&self) -> Result<Option<i32>> {
        if Handle::try_current().is_ok() {
            return Err(ShapesError::BlockingInRuntime("generator next"));
        }
        let mut rx = self
            .rx
            .lock()
            .map_err(|_| ShapesError::LockPoisoned("generator receiver"))?;
        Ok(rx.blocking_recv())
    }

    pub fn stop(&self) {
        self.stop_tx.send_replace(true);
    }
}

impl Drop for NumberGenerator {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Registry mapping handles to live generators. Ids start at 1 and are never reused.
pub struct GeneratorTable {
    next_id: AtomicI64,
    entries: Mutex<HashMap<i64, Arc<NumberGenerator>>>,
}

impl Default for GeneratorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorTable {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn create(&self, handle: &Handle) -> Result<i64> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ShapesError::LockPoisoned("generator table"))?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        entries.insert(id, Arc::new(NumberGenerator::spawn(handle)));
        tracing::debug!(id, "number generator created");
        Ok(id)
    }

    fn get(&self, id: i64) -> Result<Arc<NumberGenerator>> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&id).cloned())
            .ok_or(ShapesError::UnknownHandle(id))
    }

    /// The table lock is released before blocking, so other handles stay usable.
    pub fn next_blocking(&self, id: i64) -> Result<Option<i32>> {
        let generator = self.get(id)?;
        generator.next_blocking()
    }

    pub fn stop(&self, id: i64) -> Result<()> {
        self.get(id)?.stop();
        Ok(())
    }

    pub fn free(&self, id: i64) -> Result<()> {
        let removed = self
            .entries
            .lock()
            .ok()
            .and_then(|mut entries| entries.remove(&id));
        match removed {
            Some(generator) => {
                generator.stop();
                tracing::debug!(id, "number generator freed");
                Ok(())
            }
            None => Err(ShapesError::UnknownHandle(id)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .expect("runtime")
    }

    #[test]
    fn yields_sequence() {
        let rt = runtime();
        let table = GeneratorTable::new();
        let id = table.create(rt.handle()).unwrap();
        let got: Vec<i32> = (0..5)
            .map(|_| table.next_blocking(id).unwrap().unwrap())
            .collect();
        assert_eq!(got, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn ids_are_distinct_and_independent() {
        let rt = runtime();
        let table = GeneratorTable::new();
        let a = table.create(rt.handle()).unwrap();
        let b = table.create(rt.handle()).unwrap();
        assert_ne!(a, b);
        assert_eq!(table.next_blocking(a).unwrap(), Some(0));
        assert_eq!(table.next_blocking(a).unwrap(), Some(1));
        assert_eq!(table.next_blocking(b).unwrap(), Some(0));
    }

    #[test]
    fn stopped_generator_drains_then_ends() {
        let rt = runtime();
        let table = GeneratorTable::new();
        let id = table.create(rt.handle()).unwrap();
        assert_eq!(table.next_blocking(id).unwrap(), Some(0));
        table.stop(id).unwrap();
        table.stop(id).unwrap();
        // at most one value was buffered before the stop landed
        let mut remaining = 0;
        while table.next_blocking(id).unwrap().is_some() {
            remaining += 1;
        }
        assert!(remaining <= 1, "drained {remaining} values after stop");
    }

    #[test]
    fn freed_handle_is_unknown() {
        let rt = runtime();
        let table = GeneratorTable::new();
        let id = table.create(rt.handle()).unwrap();
        table.free(id).unwrap();
        assert!(table.is_empty());
        assert!(matches!(table.next_blocking(id), Err(ShapesError::UnknownHandle(x)) if x == id));
        assert!(matches!(table.free(id), Err(ShapesError::UnknownHandle(_))));
        assert!(matches!(table.stop(99), Err(ShapesError::UnknownHandle(99))));
    }

    #[test]
    fn next_is_refused_inside_a_runtime() {
        let rt = runtime();
        let table = GeneratorTable::new();
        let id = table.create(rt.handle()).unwrap();
        let res = rt.block_on(async { table.next_blocking(id) });
        assert!(matches!(res, Err(ShapesError::BlockingInRuntime(_))));
        // still usable from a plain thread afterwards
        assert_eq!(table.next_blocking(id).unwrap(), Some(0));
    }

    #[test]
    fn poisoned_table_refuses_create() {
        let rt = runtime();
        let table = Arc::new(GeneratorTable::new());
        let poisoner = Arc::clone(&table);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.entries.lock().unwrap();
            panic!("poison the table");
        })
        .join();
        assert!(matches!(
            table.create(rt.handle()),
            Err(ShapesError::LockPoisoned(_))
        ));
    }
}
