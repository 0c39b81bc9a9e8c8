use crate::error::EngineError;
use ahash::{AHashMap, AHashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Bookkeeping for runs in flight: which graphs are executing and the cancellation
/// signal of each execution.
#[derive(Debug, Default, Clone)]
pub(crate) struct RunRegistry {
    executing: Arc<Mutex<AHashSet<String>>>,
    signals: Arc<Mutex<AHashMap<String, Arc<AtomicBool>>>>,
}

// Poisoning is ignored; every critical section is a single insert or remove.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RunRegistry {
    /// Marks the graph as executing until the returned guard is dropped.
    pub(crate) fn acquire(&self, graph_id: &str) -> Result<RunGuard, EngineError> {
        if !lock(&self.executing).insert(graph_id.to_string()) {
            return Err(EngineError::AlreadyExecuting {
                graph_id: graph_id.to_string(),
            });
        }
        Ok(RunGuard {
            executing: Arc::clone(&self.executing),
            graph_id: graph_id.to_string(),
        })
    }

    pub(crate) fn is_executing(&self, graph_id: &str) -> bool {
        lock(&self.executing).contains(graph_id)
    }

    /// Registers an execution and returns its cancellation signal. An id that is
    /// still registered by a live run is rejected.
    pub(crate) fn register(&self, execution_id: &str) -> Result<CancelSignal, EngineError> {
        let flag = Arc::new(AtomicBool::new(false));
        let mut signals = lock(&self.signals);
        if signals.contains_key(execution_id) {
            return Err(EngineError::DuplicateExecutionId {
                execution_id: execution_id.to_string(),
            });
        }
        signals.insert(execution_id.to_string(), Arc::clone(&flag));
        Ok(CancelSignal {
            flag,
            signals: Arc::clone(&self.signals),
            execution_id: execution_id.to_string(),
        })
    }

    /// Requests cancellation. Returns false if the execution is not running.
    pub(crate) fn cancel(&self, execution_id: &str) -> bool {
        match lock(&self.signals).get(execution_id) {
            Some(flag) => {
                flag.store(true, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }
}

/// Releases the per-graph execution slot on drop.
#[derive(Debug)]
pub(crate) struct RunGuard {
    executing: Arc<Mutex<AHashSet<String>>>,
    graph_id: String,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        lock(&self.executing).remove(&self.graph_id);
    }
}

/// A run's cancellation flag; unregisters the execution on drop.
#[derive(Debug)]
pub(crate) struct CancelSignal {
    flag: Arc<AtomicBool>,
    signals: Arc<Mutex<AHashMap<String, Arc<AtomicBool>>>>,
    execution_id: String,
}

impl CancelSignal {
    pub(crate) fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

impl Drop for CancelSignal {
    fn drop(&mut self) {
        lock(&self.signals).remove(&self.execution_id);
    }
}
