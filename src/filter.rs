use regex::Regex;

use crate::types::{Level, LogRecord};

/// A named predicate over log records. Registered in the store under a
/// unique name; a record passes the filter set iff every predicate accepts
/// it.
pub type Filter = Box<dyn Fn(&LogRecord) -> bool + Send + Sync>;

/// Keep records at or above the given level.
pub fn min_level(level: Level) -> Filter {
    Box::new(move |record| record.level >= level)
}

/// Keep records whose tag matches the given pattern.
pub fn tag_matches(pattern: &str) -> Result<Filter, regex::Error> {
    let regex = Regex::new(pattern)?;
    Ok(Box::new(move |record| regex.is_match(&record.tag)))
}

/// Keep records whose message matches the given pattern.
pub fn message_matches(pattern: &str, case_insensitive: bool) -> Result<Filter, regex::Error> {
    let regex = if case_insensitive {
        Regex::new(&format!("(?i){pattern}"))?
    } else {
        Regex::new(pattern)?
    };
    Ok(Box::new(move |record| regex.is_match(&record.message)))
}

/// Keep records emitted by the given process.
pub fn from_pid(pid: u32) -> Filter {
    Box::new(move |record| record.pid == pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(level: Level, tag: &str, message: &str) -> LogRecord {
        LogRecord {
            timestamp: "01-02 03:04:05.678".to_string(),
            pid: 42,
            tid: 43,
            level,
            tag: tag.to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn test_min_level() {
        let filter = min_level(Level::Warn);
        assert!(filter(&record(Level::Error, "t", "m")));
        assert!(filter(&record(Level::Warn, "t", "m")));
        assert!(!filter(&record(Level::Info, "t", "m")));
    }

    #[test]
    fn test_tag_matches() {
        let filter = tag_matches("^Wifi").unwrap();
        assert!(filter(&record(Level::Info, "WifiService", "m")));
        assert!(!filter(&record(Level::Info, "ActivityManager", "m")));
    }

    #[test]
    fn test_message_matches_case_insensitive() {
        let filter = message_matches("timeout", true).unwrap();
        assert!(filter(&record(Level::Info, "t", "Connection TIMEOUT after 30s")));

        let strict = message_matches("timeout", false).unwrap();
        assert!(!strict(&record(Level::Info, "t", "Connection TIMEOUT after 30s")));
    }

    #[test]
    fn test_from_pid() {
        let filter = from_pid(42);
        assert!(filter(&record(Level::Info, "t", "m")));
        let mut other = record(Level::Info, "t", "m");
        other.pid = 7;
        assert!(!filter(&other));
    }
}
