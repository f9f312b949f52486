pub mod bridge;
pub mod config;
pub mod errors;
pub mod history;
pub mod records;

pub use bridge::{ModelBridge, ProbeReport};
pub use config::{ConfigError, ServiceConfig};
pub use errors::{BridgeError, IngestError};
pub use history::{HistoryEntry, Role};
pub use records::{DayRange, DayRangeError, LogRecord, PRIMARY_TEXT_FIELD, TIMESTAMP_FIELD};
