use std::sync::Arc;
use std::sync::mpsc;

use anyhow::{Context, Result, bail};
use clap::Parser;

use logscope::{CommandSource, EventListener, Level, LogCapture, LogRecord, filter};

/// Logscope - capture and view a device's system log stream
#[derive(Parser, Debug)]
#[command(name = "logscope")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log-source command to run
    #[arg(long, default_value = "logcat")]
    command: String,

    /// Argument passed to the source command (repeatable); defaults to the
    /// long-format request when omitted
    #[arg(long = "arg", value_name = "ARG")]
    args: Vec<String>,

    /// Minimum level to show (V, D, I, W, E, F, A)
    #[arg(long, value_name = "LEVEL")]
    min_level: Option<char>,

    /// Only show records whose tag matches this regex
    #[arg(long, value_name = "REGEX")]
    tag: Option<String>,
}

/// Prints passing records to stdout and signals when the session ends.
struct StdoutListener {
    done: mpsc::Sender<()>,
}

impl EventListener for StdoutListener {
    fn on_start_failed(&self) {
        eprintln!("error: failed to start the log source");
        let _ = self.done.send(());
    }

    fn on_stop(&self) {
        let _ = self.done.send(());
    }

    fn on_record(&self, record: Arc<LogRecord>) {
        println!("{record}");
    }

    fn on_batch(&self, records: Vec<Arc<LogRecord>>) {
        for record in records {
            println!("{record}");
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let source = if args.args.is_empty() && args.command == "logcat" {
        CommandSource::default()
    } else {
        CommandSource::new(args.command.clone(), args.args.clone())
    };

    let capture = LogCapture::new(source);

    if let Some(c) = args.min_level {
        let level = Level::from_char(c.to_ascii_uppercase());
        let Some(level) = level else {
            bail!("unknown level {c:?}, expected one of V, D, I, W, E, F, A");
        };
        capture.add_filter("min-level", filter::min_level(level));
    }

    if let Some(pattern) = &args.tag {
        let tag_filter = filter::tag_matches(pattern)
            .with_context(|| format!("invalid tag pattern {pattern:?}"))?;
        capture.add_filter("tag", tag_filter);
    }

    let (done_tx, done_rx) = mpsc::channel();
    capture.set_listener(Some(Arc::new(StdoutListener { done: done_tx })));
    capture.start();

    // Runs until the source exits on its own.
    let _ = done_rx.recv();
    capture.stop();
    Ok(())
}
