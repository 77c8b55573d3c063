//! Time-bucket clustering of events.
//!
//! Events are bucketed by their timestamp normalized to the configured
//! resolution. Five independent bucket maps exist, one per event class;
//! unknown event names fall into the `rest` class. Bucket keys are
//! RFC 3339 strings of the normalized UTC timestamp, enumerated in
//! first-seen order.

use indexmap::IndexMap;
use smol_str::SmolStr;
use time::format_description::well_known::Rfc3339;
use time::{Date, OffsetDateTime, Time, UtcOffset};

use tafel_remote::EventLog;

/// Bucket width for date clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClusterResolution {
    #[allow(missing_docs)]
    Hour,
    #[allow(missing_docs)]
    #[default]
    Day,
    #[allow(missing_docs)]
    Month,
}

impl ClusterResolution {
    #[allow(missing_docs)]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Month => "month",
        }
    }

    #[allow(missing_docs)]
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "hour" => Some(Self::Hour),
            "day" => Some(Self::Day),
            "month" => Some(Self::Month),
            _ => None,
        }
    }
}

/// Normalize a timestamp to the start of its bucket, in UTC.
#[must_use]
pub fn normalize_date(timestamp: OffsetDateTime, resolution: ClusterResolution) -> OffsetDateTime {
    let utc = timestamp.to_offset(UtcOffset::UTC);
    match resolution {
        ClusterResolution::Hour => {
            let time = Time::from_hms(utc.hour(), 0, 0).unwrap_or(Time::MIDNIGHT);
            utc.replace_time(time)
        }
        ClusterResolution::Day => utc.replace_time(Time::MIDNIGHT),
        ClusterResolution::Month => {
            let date =
                Date::from_calendar_date(utc.year(), utc.month(), 1).unwrap_or_else(|_| utc.date());
            utc.replace_date(date).replace_time(Time::MIDNIGHT)
        }
    }
}

/// Event classes tracked by the date clusters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum DateClass {
    Run,
    Failure,
    Error,
    Test,
    Rest,
}

impl DateClass {
    /// Classify an event by name; unknown names land in `Rest`.
    #[must_use]
    pub fn for_event_name(name: &str) -> Self {
        match name {
            EventLog::RUN => Self::Run,
            EventLog::FAILURE => Self::Failure,
            EventLog::ERROR => Self::Error,
            EventLog::TEST => Self::Test,
            _ => Self::Rest,
        }
    }
}

/// The five per-class bucket maps.
#[derive(Debug, Clone, Default)]
#[allow(missing_docs)]
pub struct DateClusterMaps {
    pub run: IndexMap<SmolStr, u64>,
    pub failure: IndexMap<SmolStr, u64>,
    pub error: IndexMap<SmolStr, u64>,
    pub test: IndexMap<SmolStr, u64>,
    pub rest: IndexMap<SmolStr, u64>,
}

impl DateClusterMaps {
    #[allow(missing_docs)]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The bucket map of one class.
    #[must_use]
    pub fn class(&self, class: DateClass) -> &IndexMap<SmolStr, u64> {
        match class {
            DateClass::Run => &self.run,
            DateClass::Failure => &self.failure,
            DateClass::Error => &self.error,
            DateClass::Test => &self.test,
            DateClass::Rest => &self.rest,
        }
    }

    fn class_mut(&mut self, class: DateClass) -> &mut IndexMap<SmolStr, u64> {
        match class {
            DateClass::Run => &mut self.run,
            DateClass::Failure => &mut self.failure,
            DateClass::Error => &mut self.error,
            DateClass::Test => &mut self.test,
            DateClass::Rest => &mut self.rest,
        }
    }

    /// Bucket one event. Buckets outside the exclusive `(start, end)`
    /// bounds are dropped silently.
    pub fn cluster_event(
        &mut self,
        event: &EventLog,
        resolution: ClusterResolution,
        start: Option<OffsetDateTime>,
        end: Option<OffsetDateTime>,
    ) {
        let bucket = normalize_date(event.time_stamp, resolution);
        if let Some(start) = start {
            if bucket < start {
                return;
            }
        }
        if let Some(end) = end {
            if bucket > end {
                return;
            }
        }
        let key = bucket
            .format(&Rfc3339)
            .map_or_else(|_| SmolStr::new(bucket.to_string()), SmolStr::new);
        let class = DateClass::for_event_name(&event.name);
        *self.class_mut(class).entry(key).or_insert(0) += 1;
    }

    /// Total number of bucketed events across all classes.
    #[must_use]
    pub fn total(&self) -> u64 {
        [&self.run, &self.failure, &self.error, &self.test, &self.rest]
            .iter()
            .flat_map(|map| map.values())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn normalizes_to_hour_day_and_month() {
        let timestamp = datetime!(2016-05-17 14:35:27.5 UTC);
        assert_eq!(
            normalize_date(timestamp, ClusterResolution::Hour),
            datetime!(2016-05-17 14:00 UTC)
        );
        assert_eq!(
            normalize_date(timestamp, ClusterResolution::Day),
            datetime!(2016-05-17 00:00 UTC)
        );
        assert_eq!(
            normalize_date(timestamp, ClusterResolution::Month),
            datetime!(2016-05-01 00:00 UTC)
        );
    }

    #[test]
    fn normalization_converts_to_utc_first() {
        let timestamp = datetime!(2016-05-17 01:30 +02:00);
        assert_eq!(
            normalize_date(timestamp, ClusterResolution::Day),
            datetime!(2016-05-16 00:00 UTC)
        );
    }
}
