use std::fmt;

/// Log severity level, ordered from least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Verbose,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
    Assert,
}

impl Level {
    /// Parse the single priority character used by the long record format.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'V' => Some(Self::Verbose),
            'D' => Some(Self::Debug),
            'I' => Some(Self::Info),
            'W' => Some(Self::Warn),
            'E' => Some(Self::Error),
            'F' => Some(Self::Fatal),
            'A' => Some(Self::Assert),
            _ => None,
        }
    }

    /// The priority character this level prints as.
    pub fn as_char(&self) -> char {
        match self {
            Self::Verbose => 'V',
            Self::Debug => 'D',
            Self::Info => 'I',
            Self::Warn => 'W',
            Self::Error => 'E',
            Self::Fatal => 'F',
            Self::Assert => 'A',
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Verbose => "verbose",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Assert => "assert",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One parsed log record.
///
/// Built exclusively by [`crate::parser::parse_record`] and never mutated
/// afterwards. Shared as `Arc<LogRecord>` between the store and event
/// deliveries so cloning stays a reference-count bump.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogRecord {
    /// Source timestamp text (`MM-DD HH:MM:SS.mmm`). The long format carries
    /// no year, so the text is kept verbatim.
    pub timestamp: String,

    /// Emitting process id.
    pub pid: u32,

    /// Emitting thread id.
    pub tid: u32,

    /// Priority level.
    pub level: Level,

    /// Source tag. May contain spaces.
    pub tag: String,

    /// Message body. Multi-line messages are newline-joined.
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:>5}:{:<5} {}/{}: {}",
            self.timestamp, self.pid, self.tid, self.level, self.tag, self.message
        )
    }
}
