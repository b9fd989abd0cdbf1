//! Capture, parse, and filter a device's system log stream in real time.
//!
//! [`LogCapture`] supervises an external log-source process, reassembles its
//! long-format output into [`LogRecord`]s, keeps them in a thread-safe
//! [`LogStore`] with named filters, and delivers them to an
//! [`EventListener`]. While the owner reports itself backgrounded, records
//! are buffered and flushed as one batch on the return to foreground.
//!
//! ```no_run
//! use std::sync::Arc;
//! use logscope::{CommandSource, EventListener, LogCapture, LogRecord};
//!
//! struct Printer;
//!
//! impl EventListener for Printer {
//!     fn on_record(&self, record: Arc<LogRecord>) {
//!         println!("{record}");
//!     }
//! }
//!
//! let capture = LogCapture::new(CommandSource::default());
//! capture.set_listener(Some(Arc::new(Printer)));
//! capture.start();
//! ```

pub mod filter;

mod events;
mod parser;
mod source;
mod store;
mod stream;
mod types;

pub use events::{CaptureEvent, EventListener};
pub use parser::{ParseError, parse_record};
pub use source::{CommandSource, LogSource, ProcessHandle, SourceProcess};
pub use store::LogStore;
pub use stream::LogCapture;
pub use types::{Level, LogRecord};
