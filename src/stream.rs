use std::io::{BufRead, BufReader, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, trace, warn};

use crate::events::{CaptureEvent, Dispatcher, EventListener};
use crate::filter::Filter;
use crate::parser;
use crate::source::{LogSource, ProcessHandle, SourceProcess};
use crate::store::LogStore;
use crate::types::LogRecord;

/// Bound on waiting for the reader thread during `stop`.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_millis(300);

/// Bound on waiting for the stderr drain after the stdout loop exits.
const DRAIN_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

const JOIN_POLL: Duration = Duration::from_millis(10);

/// One-shot gate the reader parks on while paused.
///
/// `open` wakes a blocked reader; the waker token is consumed on wake so a
/// subsequent pause re-blocks correctly. A resume issued while nothing is
/// blocked leaves the gate open, which costs the next block one spurious
/// pass through its pause check.
#[derive(Default)]
struct PauseGate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl PauseGate {
    fn block(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
        *open = false;
    }

    fn open(&self) {
        let mut open = self.open.lock();
        *open = true;
        self.cond.notify_one();
    }
}

/// Everything the capture session threads share.
struct CaptureCtx {
    source: Arc<dyn LogSource>,
    store: Arc<LogStore>,
    dispatcher: Arc<Dispatcher>,
    paused: Arc<AtomicBool>,
    background: Arc<AtomicBool>,
    gate: Arc<PauseGate>,
    process: Arc<Mutex<Option<Box<dyn ProcessHandle>>>>,
}

/// The capture engine: spawns the log source, reassembles its long-format
/// output into records, stores them, and dispatches events to the listener.
///
/// Control methods may be called from any thread, concurrently with the
/// reader.
pub struct LogCapture {
    source: Arc<dyn LogSource>,
    store: Arc<LogStore>,
    dispatcher: Arc<Dispatcher>,
    paused: Arc<AtomicBool>,
    background: Arc<AtomicBool>,
    gate: Arc<PauseGate>,
    reader: Mutex<Option<JoinHandle<()>>>,
    process: Arc<Mutex<Option<Box<dyn ProcessHandle>>>>,
}

impl LogCapture {
    pub fn new(source: impl LogSource + 'static) -> Self {
        Self::with_source(Arc::new(source))
    }

    pub fn with_source(source: Arc<dyn LogSource>) -> Self {
        Self {
            source,
            store: Arc::new(LogStore::new()),
            dispatcher: Arc::new(Dispatcher::new()),
            paused: Arc::new(AtomicBool::new(false)),
            background: Arc::new(AtomicBool::new(false)),
            gate: Arc::new(PauseGate::default()),
            reader: Mutex::new(None),
            process: Arc::new(Mutex::new(None)),
        }
    }

    /// Launch the capture session. A no-op while a session is running.
    pub fn start(&self) {
        let mut reader = self.reader.lock();
        if reader.is_some() {
            info!("log capture is already running");
            return;
        }

        let ctx = CaptureCtx {
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
            dispatcher: Arc::clone(&self.dispatcher),
            paused: Arc::clone(&self.paused),
            background: Arc::clone(&self.background),
            gate: Arc::clone(&self.gate),
            process: Arc::clone(&self.process),
        };
        *reader = Some(thread::spawn(move || run_capture(ctx)));
    }

    /// Kill the source, wait briefly for the reader to wind down, then
    /// release the session state unconditionally. The store and filter map
    /// are emptied even if the join timed out; a straggling reader's late
    /// writes land harmlessly under the store's lock.
    pub fn stop(&self) {
        if let Some(mut handle) = self.process.lock().take() {
            handle.kill();
        }

        // Session state resets on stop; opening the gate also releases a
        // reader parked there so it can observe the closed stream.
        self.paused.store(false, Ordering::Release);
        self.background.store(false, Ordering::Release);
        self.gate.open();

        if let Some(thread) = self.reader.lock().take() {
            join_timeout(thread, STOP_JOIN_TIMEOUT);
        }

        self.store.clear();
    }

    /// Stop delivering records at the reader's next iteration boundary.
    /// An in-flight line read is not interrupted.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Wake a reader blocked by `pause`.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        self.gate.open();
    }

    /// Lifecycle signal pushed in by the owner: while `true`, records are
    /// buffered instead of dispatched, then flushed as one batch when the
    /// flag clears. Eventually consistent by design; a momentary race with
    /// the reader's branch is acceptable.
    pub fn set_background(&self, background: bool) {
        self.background.store(background, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.reader
            .lock()
            .as_ref()
            .is_some_and(|thread| !thread.is_finished())
    }

    /// Register the event listener. The last registration wins; `None`
    /// unregisters.
    pub fn set_listener(&self, listener: Option<Arc<dyn EventListener>>) {
        self.dispatcher.set_listener(listener);
    }

    pub fn add_filter(&self, name: impl Into<String>, filter: Filter) {
        self.store.add_filter(name, filter);
    }

    pub fn remove_filter(&self, name: &str) {
        self.store.remove_filter(name);
    }

    pub fn clear_filters(&self) {
        self.store.clear_filters();
    }

    pub fn read_all(&self) -> Vec<Arc<LogRecord>> {
        self.store.read_all()
    }

    pub fn read_filtered(&self) -> Vec<Arc<LogRecord>> {
        self.store.read_filtered()
    }
}

impl Drop for LogCapture {
    fn drop(&mut self) {
        self.stop();
        self.dispatcher.set_listener(None);
    }
}

/// Session body, run on the supervisor/reader thread.
fn run_capture(ctx: CaptureCtx) {
    let process = match ctx.source.spawn() {
        Ok(process) => process,
        Err(error) => {
            warn!(%error, "failed to spawn the log source");
            ctx.dispatcher.post(CaptureEvent::StartFailed);
            return;
        }
    };

    let SourceProcess {
        stdout,
        stderr,
        handle,
    } = process;
    *ctx.process.lock() = Some(handle);
    ctx.dispatcher.post(CaptureEvent::Started);

    // Drain stderr on its own thread so the source never blocks on a full
    // error pipe.
    let stderr_thread = thread::spawn(move || drain_stderr(stderr));

    read_stdout(&ctx, stdout);

    join_timeout(stderr_thread, DRAIN_JOIN_TIMEOUT);

    // Reap the child unless stop() already took it.
    if let Some(mut handle) = ctx.process.lock().take() {
        handle.kill();
    }
    ctx.dispatcher.post(CaptureEvent::Stopped);
}

/// The line-oriented parsing loop. One record is a metadata line recognized
/// by its leading bracket, one or more non-empty message lines, and an empty
/// terminator line. Lines outside that shape are interleaved noise and get
/// skipped.
fn read_stdout(ctx: &CaptureCtx, stdout: Box<dyn Read + Send>) {
    let mut reader = BufReader::new(stdout);
    let mut pending: Vec<Arc<LogRecord>> = Vec::new();
    let mut message = String::new();

    'stream: loop {
        while ctx.paused.load(Ordering::Acquire) {
            ctx.gate.block();
        }

        let Some(candidate) = next_line(&mut reader) else {
            break;
        };
        let metadata = candidate.trim();
        if !metadata.starts_with('[') {
            continue;
        }

        let Some(first) = next_line(&mut reader) else {
            break;
        };
        message.push_str(&first);
        loop {
            // End-of-stream while collecting discards the partial record
            // and ends the session.
            let Some(line) = next_line(&mut reader) else {
                break 'stream;
            };
            if line.is_empty() {
                break;
            }
            message.push('\n');
            message.push_str(&line);
        }

        match parser::parse_record(metadata, &message) {
            Ok(record) => emit(ctx, &mut pending, Arc::new(record)),
            Err(error) => debug!(%error, metadata, "discarding malformed record"),
        }
        // Cleared on success and failure alike so fragments never bleed
        // into the next record.
        message.clear();
    }
}

/// Route one parsed record: buffer it while backgrounded, otherwise flush
/// any pending batch first and then deliver the record itself.
fn emit(ctx: &CaptureCtx, pending: &mut Vec<Arc<LogRecord>>, record: Arc<LogRecord>) {
    if ctx.background.load(Ordering::Acquire) {
        pending.push(record);
        return;
    }

    if !pending.is_empty() {
        let passing = ctx.store.append_batch(std::mem::take(pending));
        if !passing.is_empty() {
            ctx.dispatcher.post(CaptureEvent::Batch(passing));
        }
    }

    if ctx.store.append(Arc::clone(&record)) {
        ctx.dispatcher.pre_record(&record);
        ctx.dispatcher.post(CaptureEvent::Record(record));
    }
}

/// Read one line without its terminator. End-of-stream and read errors both
/// report `None`; a read error is not distinguishable from a closed pipe for
/// our purposes.
fn next_line(reader: &mut impl BufRead) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => {
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            Some(line)
        }
        Err(error) => {
            debug!(%error, "stream read failed, treating as end of stream");
            None
        }
    }
}

fn drain_stderr(stderr: Box<dyn Read + Send>) {
    for line in BufReader::new(stderr).lines() {
        match line {
            Ok(line) => trace!(source_stderr = %line, "log source stderr"),
            Err(_) => break,
        }
    }
}

/// Best-effort bounded join. On timeout the thread is left running; its
/// late effects must be harmless.
fn join_timeout(handle: JoinHandle<()>, timeout: Duration) {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            debug!("thread outlived its join timeout, releasing it");
            return;
        }
        thread::sleep(JOIN_POLL);
    }
    let _ = handle.join();
}
