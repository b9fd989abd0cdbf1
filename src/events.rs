use std::sync::Arc;
use std::sync::mpsc;
use std::thread::JoinHandle;

use parking_lot::{Mutex, RwLock};

use crate::types::LogRecord;

/// Everything the engine reports to its listener.
#[derive(Clone, Debug)]
pub enum CaptureEvent {
    /// The log-source process spawned successfully.
    Started,
    /// The log-source process failed to spawn; the engine stays stopped.
    StartFailed,
    /// The reader loop has exited, for any reason.
    Stopped,
    /// One filter-passing record.
    Record(Arc<LogRecord>),
    /// A flushed background buffer, already filtered, never empty.
    Batch(Vec<Arc<LogRecord>>),
}

/// Sink for capture events. At most one listener is registered at a time.
///
/// All methods default to no-ops so a consumer only implements the events it
/// cares about. `on_pre_record` runs synchronously on the reader thread;
/// everything else is delivered on the dispatcher's delivery thread.
pub trait EventListener: Send + Sync {
    fn on_start(&self) {}
    fn on_start_failed(&self) {}
    fn on_stop(&self) {}
    /// Same-thread notification immediately after a passing record is
    /// appended, before the delivery-thread hop.
    fn on_pre_record(&self, _record: &Arc<LogRecord>) {}
    fn on_record(&self, _record: Arc<LogRecord>) {}
    fn on_batch(&self, _records: Vec<Arc<LogRecord>>) {}
}

/// Decouples event delivery from the reader thread.
///
/// Posted events cross a channel to a dedicated delivery thread, which
/// invokes the listener in posting order. A batch posted before a record is
/// therefore delivered before it.
pub struct Dispatcher {
    listener: Arc<RwLock<Option<Arc<dyn EventListener>>>>,
    tx: Mutex<Option<mpsc::Sender<CaptureEvent>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let listener: Arc<RwLock<Option<Arc<dyn EventListener>>>> = Arc::new(RwLock::new(None));
        let (tx, rx) = mpsc::channel::<CaptureEvent>();

        let worker_listener = Arc::clone(&listener);
        let worker = std::thread::spawn(move || {
            while let Ok(event) = rx.recv() {
                let Some(listener) = worker_listener.read().clone() else {
                    continue;
                };
                match event {
                    CaptureEvent::Started => listener.on_start(),
                    CaptureEvent::StartFailed => listener.on_start_failed(),
                    CaptureEvent::Stopped => listener.on_stop(),
                    CaptureEvent::Record(record) => listener.on_record(record),
                    CaptureEvent::Batch(records) => listener.on_batch(records),
                }
            }
        });

        Self {
            listener,
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Register the listener. The last registration wins; `None` unregisters.
    pub fn set_listener(&self, listener: Option<Arc<dyn EventListener>>) {
        *self.listener.write() = listener;
    }

    /// Synchronous notification on the calling (reader) thread.
    pub(crate) fn pre_record(&self, record: &Arc<LogRecord>) {
        if let Some(listener) = self.listener.read().clone() {
            listener.on_pre_record(record);
        }
    }

    /// Queue an event for the delivery thread.
    pub(crate) fn post(&self, event: CaptureEvent) {
        if let Some(tx) = self.tx.lock().as_ref() {
            let _ = tx.send(event);
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        // Disconnect the channel so the delivery thread drains and exits.
        self.tx.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}
