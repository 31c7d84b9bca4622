use chrono::{Local, TimeZone};

use kdlogs_types::{FilterConfig, LogRecord};

use crate::timestamp::{local_hour_minute, parse_timestamp_in};

/// Filter compiled from a [`FilterConfig`]; every present constraint must hold
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledFilter {
    /// Message substring, lower-cased
    message: Option<String>,

    /// Level text, upper-cased
    level: Option<String>,

    /// Earliest `HH:mm` shown
    from: Option<String>,

    /// Latest `HH:mm` shown
    to: Option<String>,
}

impl CompiledFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            message: config.message().map(str::to_lowercase),
            level: config.level().map(str::to_uppercase),
            from: config.timestamp_from().map(str::to_string),
            to: config.timestamp_to().map(str::to_string),
        }
    }

    /// Check a record against this filter, reading times in the local zone
    pub fn matches(&self, record: &LogRecord) -> bool {
        self.matches_in(record, &Local)
    }

    /// Check a record against this filter, reading times in `tz`
    pub fn matches_in<Tz: TimeZone>(&self, record: &LogRecord, tz: &Tz) -> bool {
        self.message_matches(record) && self.level_matches(record) && self.time_matches(record, tz)
    }

    fn message_matches(&self, record: &LogRecord) -> bool {
        match &self.message {
            Some(needle) => record.message().to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }

    /// Either side may contain the other, so abbreviations match both ways
    fn level_matches(&self, record: &LogRecord) -> bool {
        let Some(wanted) = &self.level else {
            return true;
        };
        let level = record.level().unwrap_or_default().to_uppercase();
        level.contains(wanted.as_str()) || wanted.contains(level.as_str())
    }

    /// Records without a usable timestamp pass the time window
    fn time_matches<Tz: TimeZone>(&self, record: &LogRecord, tz: &Tz) -> bool {
        if self.from.is_none() && self.to.is_none() {
            return true;
        }
        let Some(ts) = record.timestamp().and_then(|raw| parse_timestamp_in(raw, tz)) else {
            return true;
        };
        let clock = local_hour_minute(&ts, tz);

        if self.from.as_deref().is_some_and(|from| clock.as_str() < from) {
            return false;
        }
        if self.to.as_deref().is_some_and(|to| clock.as_str() > to) {
            return false;
        }
        true
    }

    /// Check if filter is empty (matches everything)
    pub fn is_empty(&self) -> bool {
        self.message.is_none() && self.level.is_none() && self.from.is_none() && self.to.is_none()
    }
}

/// Check a record against filter values, reading times in the local zone
pub fn matches(record: &LogRecord, filter: &FilterConfig) -> bool {
    CompiledFilter::new(filter).matches(record)
}
