use serde::{Deserialize, Serialize};

/// A single security event as read from the archive. Fields pass through opaquely.
pub type LogRecord = serde_json::Map<String, serde_json::Value>;

/// Field holding the raw event text rendered into the domain context.
pub const PRIMARY_TEXT_FIELD: &str = "full_log";

/// Field used to derive date spans in statistics.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Number of calendar days of logs to ingest. Always within `[MIN, MAX]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DayRange(u16);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DayRangeError {
    #[error("day range must be between {min} and {max}, got {got}", min = DayRange::MIN, max = DayRange::MAX)]
    OutOfRange { got: i64 },
    #[error("day range is not a number: {0:?}")]
    NotANumber(String),
}

impl DayRange {
    pub const MIN: u16 = 1;
    pub const MAX: u16 = 365;

    pub fn new(days: i64) -> Result<Self, DayRangeError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&days) {
            Ok(Self(days as u16))
        } else {
            Err(DayRangeError::OutOfRange { got: days })
        }
    }

    /// Parse a user-supplied argument such as `"30"`.
    pub fn parse(raw: &str) -> Result<Self, DayRangeError> {
        let days: i64 = raw
            .trim()
            .parse()
            .map_err(|_| DayRangeError::NotANumber(raw.to_string()))?;
        Self::new(days)
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

impl Default for DayRange {
    fn default() -> Self {
        Self(1)
    }
}

impl TryFrom<u32> for DayRange {
    type Error = DayRangeError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<DayRange> for u32 {
    fn from(value: DayRange) -> Self {
        u32::from(value.0)
    }
}

impl std::fmt::Display for DayRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
