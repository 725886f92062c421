//! Pass identifiers.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::PassIdError;

const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Identifier of one satellite pass: `{start}-{end}-{satellite}`.
///
/// Ordering follows the decoded `(start, end, satellite)` triple. Since both
/// timestamps are fixed-width digit strings, this is chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PassId {
    start: String,
    end: String,
    satellite: String,
}

impl PassId {
    /// Parses a pass ID from its dash-delimited form.
    ///
    /// The string is split on the first two dashes only; any further dashes
    /// belong to the satellite name.
    pub fn parse(s: &str) -> Result<Self, PassIdError> {
        if s.is_empty() {
            return Err(PassIdError::Empty);
        }

        let mut parts = s.splitn(3, '-');
        let (Some(start), Some(end), Some(satellite)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(PassIdError::MissingPart(s.to_string()));
        };

        if start.is_empty() || end.is_empty() || satellite.is_empty() {
            return Err(PassIdError::MissingPart(s.to_string()));
        }

        check_timestamp("start", start)?;
        check_timestamp("end", end)?;

        Ok(Self {
            start: start.to_string(),
            end: end.to_string(),
            satellite: satellite.to_string(),
        })
    }

    /// Start timestamp as encoded (`YYYYMMDDhhmmss`).
    pub fn start(&self) -> &str {
        &self.start
    }

    /// End timestamp as encoded (`YYYYMMDDhhmmss`).
    pub fn end(&self) -> &str {
        &self.end
    }

    /// Satellite name.
    pub fn satellite(&self) -> &str {
        &self.satellite
    }

    /// Decodes the start timestamp, if it is a valid calendar time.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&self.start, TIMESTAMP_FORMAT)
            .ok()
            .map(|t| t.and_utc())
    }

    /// Space-joined descriptor used by the pass listing: `start end satellite`.
    pub fn descriptor(&self) -> String {
        format!("{} {} {}", self.start, self.end, self.satellite)
    }
}

fn check_timestamp(field: &'static str, value: &str) -> Result<(), PassIdError> {
    if value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(PassIdError::InvalidTimestamp {
            field,
            value: value.to_string(),
        })
    }
}

impl std::fmt::Display for PassId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}-{}", self.start, self.end, self.satellite)
    }
}

impl std::str::FromStr for PassId {
    type Err = PassIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
