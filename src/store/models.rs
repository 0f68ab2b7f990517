//! Monitor model types.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

use super::SampleStore;

/// A monitored host and how often to probe it.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    /// IP address or hostname.
    pub address: String,
    pub interval: Duration,
}

impl Target {
    pub fn new(address: impl Into<String>, interval: Duration) -> Self {
        Self {
            address: address.into(),
            interval: if interval.is_zero() {
                Duration::from_secs(1)
            } else {
                interval
            },
        }
    }
}

/// Classification of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Outcome {
    #[serde(rename = "indeterminate")]
    Indeterminate,
    #[serde(rename = "connect error")]
    ConnectError,
    #[serde(rename = "send error")]
    SendError,
    #[serde(rename = "read error")]
    ReadError,
    #[serde(rename = "parse error")]
    ParseError,
    #[serde(rename = "OK")]
    Ok,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Indeterminate => "indeterminate",
            Outcome::ConnectError => "connect error",
            Outcome::SendError => "send error",
            Outcome::ReadError => "read error",
            Outcome::ParseError => "parse error",
            Outcome::Ok => "OK",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Outcome::Ok)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of one probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample {
    #[serde(rename = "Time")]
    pub time: DateTime<Utc>,
    /// Elapsed wall-clock time, serialized as integer nanoseconds.
    #[serde(rename = "Duration", serialize_with = "serialize_nanos")]
    pub duration: Duration,
    #[serde(rename = "Result")]
    pub outcome: Outcome,
}

impl Sample {
    pub fn new(time: DateTime<Utc>, duration: Duration, outcome: Outcome) -> Self {
        Self {
            time,
            duration,
            outcome,
        }
    }

    pub fn millis(&self) -> f64 {
        self.duration.as_secs_f64() * 1000.0
    }
}

fn serialize_nanos<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
}

/// A target paired with its recent history.
#[derive(Debug)]
pub struct Monitor {
    pub target: Target,
    pub samples: SampleStore,
}

impl Monitor {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            samples: SampleStore::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_json_shape() {
        let time = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let sample = Sample::new(time, Duration::from_micros(1500), Outcome::ConnectError);
        let json = serde_json::to_value(sample).unwrap();
        assert_eq!(json["Time"], "2024-05-01T12:00:00Z");
        assert_eq!(json["Duration"], 1_500_000);
        assert_eq!(json["Result"], "connect error");
    }

    #[test]
    fn test_outcome_strings_match_serde() {
        for outcome in [
            Outcome::Indeterminate,
            Outcome::ConnectError,
            Outcome::SendError,
            Outcome::ReadError,
            Outcome::ParseError,
            Outcome::Ok,
        ] {
            let json = serde_json::to_value(outcome).unwrap();
            assert_eq!(json, outcome.as_str());
        }
    }

    #[test]
    fn test_target_zero_interval_defaults() {
        let target = Target::new("127.0.0.1", Duration::ZERO);
        assert_eq!(target.interval, Duration::from_secs(1));
    }
}
