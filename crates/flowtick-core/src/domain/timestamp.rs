use std::fmt::{Display, Formatter};

use serde::{Serialize, Serializer};
use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Wire format of the flow request window: millisecond precision, `Z` suffix.
const WIRE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:3]Z");

/// Input that is not an RFC 3339 timestamp in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
pub struct TimestampNotUtc {
    pub value: String,
}

/// RFC 3339 timestamp guaranteed to be UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    /// Parse an upstream timestamp; offsets other than `Z`/`+00:00` are rejected.
    pub fn parse(input: &str) -> Result<Self, TimestampNotUtc> {
        let parsed = OffsetDateTime::parse(input, &Rfc3339).map_err(|_| TimestampNotUtc {
            value: input.to_owned(),
        })?;

        if parsed.offset() != UtcOffset::UTC {
            return Err(TimestampNotUtc {
                value: input.to_owned(),
            });
        }

        Ok(Self(parsed))
    }

    /// Convert any instant to UTC.
    pub fn from_offset_datetime(value: OffsetDateTime) -> Self {
        Self(value.to_offset(UtcOffset::UTC))
    }

    pub fn unix_millis(self) -> i64 {
        (self.0.unix_timestamp_nanos() / 1_000_000) as i64
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .expect("UtcDateTime must be RFC3339 formattable")
    }

    /// `YYYY-MM-DDTHH:MM:SS.mmmZ`, as the flow endpoint expects.
    pub fn format_wire(self) -> String {
        self.0
            .format(WIRE_FORMAT)
            .expect("UtcDateTime must be wire formattable")
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl Serialize for UtcDateTime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format_wire())
    }
}
