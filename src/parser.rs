use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::types::{Level, LogRecord};

/// A record's text could not be decomposed into the expected fields.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("metadata line does not match the long-format header: {0:?}")]
    MalformedMetadata(String),

    #[error("unrecognized priority character {0:?}")]
    UnknownLevel(char),

    #[error("invalid pid/tid in metadata line")]
    InvalidId(#[from] std::num::ParseIntError),

    #[error("record has an empty message block")]
    EmptyMessage,
}

/// Long-format record header: `[ MM-DD HH:MM:SS.mmm  pid: tid L/Tag ]`.
/// The tag is matched lazily so tags containing spaces survive; trailing
/// whitespace before the closing bracket belongs to the frame, not the tag.
static METADATA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\[\s*(\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2}\.\d+)\s+(\d+)\s*:\s*(\d+)\s+([A-Z])/(.*?)\s*\]$",
    )
    .unwrap()
});

/// Parse one metadata line plus its accumulated message block into a record.
///
/// Pure: no shared state is read or written. The reader loop is the only
/// caller, but nothing here assumes that.
pub fn parse_record(metadata: &str, message: &str) -> Result<LogRecord, ParseError> {
    let caps = METADATA
        .captures(metadata)
        .ok_or_else(|| ParseError::MalformedMetadata(metadata.to_string()))?;

    // Capture groups are guaranteed by a successful match.
    let timestamp = caps[1].to_string();
    let pid: u32 = caps[2].parse()?;
    let tid: u32 = caps[3].parse()?;
    let level_char = caps[4].chars().next().unwrap_or('?');
    let level = Level::from_char(level_char).ok_or(ParseError::UnknownLevel(level_char))?;
    let tag = caps[5].to_string();

    if message.is_empty() {
        return Err(ParseError::EmptyMessage);
    }

    Ok(LogRecord {
        timestamp,
        pid,
        tid,
        level,
        tag,
        message: message.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_record() {
        let record = parse_record(
            "[ 08-09 12:57:32.653  1319: 2754 D/WifiService ]",
            "scan requested",
        )
        .unwrap();
        assert_eq!(record.timestamp, "08-09 12:57:32.653");
        assert_eq!(record.pid, 1319);
        assert_eq!(record.tid, 2754);
        assert_eq!(record.level, Level::Debug);
        assert_eq!(record.tag, "WifiService");
        assert_eq!(record.message, "scan requested");
    }

    #[test]
    fn test_parse_multi_line_message() {
        let record = parse_record(
            "[ 01-02 03:04:05.678   100:  200 E/AndroidRuntime ]",
            "FATAL EXCEPTION: main\njava.lang.NullPointerException",
        )
        .unwrap();
        assert_eq!(record.level, Level::Error);
        assert_eq!(
            record.message,
            "FATAL EXCEPTION: main\njava.lang.NullPointerException"
        );
    }

    #[test]
    fn test_parse_tag_with_spaces() {
        let record = parse_record("[ 01-02 03:04:05.678  1: 2 I/My Tag ]", "hello").unwrap();
        assert_eq!(record.tag, "My Tag");
    }

    #[test]
    fn test_parse_pid_tid_without_padding() {
        let record = parse_record("[ 01-02 03:04:05.678 12345:12345 W/x ]", "m").unwrap();
        assert_eq!(record.pid, 12345);
        assert_eq!(record.tid, 12345);
    }

    #[test]
    fn test_parse_rejects_unbracketed_line() {
        let err = parse_record("--------- beginning of main", "m").unwrap_err();
        assert!(matches!(err, ParseError::MalformedMetadata(_)));
    }

    #[test]
    fn test_parse_rejects_truncated_header() {
        let err = parse_record("[ 08-09 12:57:32.653  1319 ]", "m").unwrap_err();
        assert!(matches!(err, ParseError::MalformedMetadata(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_level() {
        let err = parse_record("[ 08-09 12:57:32.653  1: 2 Q/Tag ]", "m").unwrap_err();
        assert!(matches!(err, ParseError::UnknownLevel('Q')));
    }

    #[test]
    fn test_parse_rejects_empty_message() {
        let err = parse_record("[ 08-09 12:57:32.653  1: 2 I/Tag ]", "").unwrap_err();
        assert!(matches!(err, ParseError::EmptyMessage));
    }

    #[test]
    fn test_fields_round_trip_exactly() {
        let cases = [
            ("[ 12-31 23:59:59.999  9999: 1 V/boot ]", "v"),
            ("[ 01-01 00:00:00.000     1: 1 A/kernel ]", "panic"),
            ("[ 06-15 08:00:01.250   512: 768 F/Watchdog ]", "bark\nbark"),
        ];
        for (metadata, message) in cases {
            let record = parse_record(metadata, message).unwrap();
            assert_eq!(record.message, message);
            assert!(metadata.contains(&record.timestamp));
            assert!(metadata.contains(&record.tag));
        }
    }
}
