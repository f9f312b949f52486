use chrono::NaiveDate;
use serde::Serialize;

use hunter_core::{LogRecord, TIMESTAMP_FIELD};

const SIZE_SAMPLE: usize = 100;
const FIELD_SAMPLE: usize = 10;

/// Summary of an ingested record set, shown by the `stat` command.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct LogStats {
    pub total: usize,
    pub earliest: Option<NaiveDate>,
    pub latest: Option<NaiveDate>,
    /// Mean serialized size in bytes of the first 100 records.
    pub mean_record_bytes: Option<usize>,
    /// First field names of the first record, in record order.
    pub sample_fields: Vec<String>,
}

impl LogStats {
    pub fn summarize(records: &[LogRecord]) -> Self {
        let mut earliest: Option<NaiveDate> = None;
        let mut latest: Option<NaiveDate> = None;
        for day in records.iter().filter_map(record_date) {
            earliest = Some(earliest.map_or(day, |e| e.min(day)));
            latest = Some(latest.map_or(day, |l| l.max(day)));
        }

        let sample = &records[..records.len().min(SIZE_SAMPLE)];
        let mean_record_bytes = if sample.is_empty() {
            None
        } else {
            let total: usize = sample
                .iter()
                .map(|r| serde_json::to_string(r).map(|s| s.len()).unwrap_or(0))
                .sum();
            Some(total / sample.len())
        };

        let sample_fields = records
            .first()
            .map(|r| r.keys().take(FIELD_SAMPLE).cloned().collect())
            .unwrap_or_default();

        Self {
            total: records.len(),
            earliest,
            latest,
            mean_record_bytes,
            sample_fields,
        }
    }
}

/// Date from the first ten characters of the record's timestamp, e.g. `2024-03-07T…`.
fn record_date(record: &LogRecord) -> Option<NaiveDate> {
    let ts = record.get(TIMESTAMP_FIELD)?.as_str()?;
    NaiveDate::parse_from_str(ts.get(..10)?, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: serde_json::Value) -> LogRecord {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn empty_set() {
        let stats = LogStats::summarize(&[]);
        assert_eq!(stats, LogStats::default());
    }

    #[test]
    fn date_span_and_fields() {
        let records = vec![
            record(json!({"timestamp": "2024-03-07T10:00:00.000+0000", "full_log": "a"})),
            record(json!({"timestamp": "2024-03-05T23:59:59.000+0000"})),
            record(json!({"timestamp": "garbage"})),
            record(json!({"full_log": "no timestamp"})),
        ];
        let stats = LogStats::summarize(&records);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.earliest, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(stats.latest, NaiveDate::from_ymd_opt(2024, 3, 7));
        assert_eq!(stats.sample_fields.len(), 2);
        assert!(stats.sample_fields.contains(&"full_log".to_string()));
    }

    #[test]
    fn mean_size_uses_serialized_length() {
        let records = vec![record(json!({"a": 1})), record(json!({"a": 100}))];
        // {"a":1} = 7 bytes, {"a":100} = 9 bytes
        assert_eq!(LogStats::summarize(&records).mean_record_bytes, Some(8));
    }

    #[test]
    fn sample_fields_keep_record_order() {
        let line = r#"{"timestamp":"2024-03-07T10:00:00.000+0000","rule":{"level":5},"agent":{"id":"001"},"full_log":"x"}"#;
        let parsed: LogRecord = serde_json::from_str(line).unwrap();
        assert_eq!(
            LogStats::summarize(&[parsed]).sample_fields,
            vec!["timestamp", "rule", "agent", "full_log"]
        );
    }

    #[test]
    fn sample_fields_capped() {
        let mut r = LogRecord::new();
        for i in 0..25 {
            r.insert(format!("f{i:02}"), json!(i));
        }
        assert_eq!(LogStats::summarize(&[r]).sample_fields.len(), 10);
    }
}
