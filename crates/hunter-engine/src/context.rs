//! Instruction texts the model answers against, and prompt composition.

use hunter_core::{LogRecord, PRIMARY_TEXT_FIELD};

use crate::classify::ContextMode;

const MAX_RENDERED_RECORDS: usize = 100;
const MAX_EXCERPT_CHARS: usize = 200;

const ANALYST_PREAMBLE: &str = "You are a security analyst performing threat hunting.
Your task is to analyze logs from Wazuh. You have access to the logs provided in the context.
The objective is to identify potential security threats or any other needs from the user.
All queries should be interpreted as asking about security events, patterns or other request from the user using the provided logs.";

const GENERAL_PREAMBLE: &str = "You are a helpful AI assistant. You can help with general questions,
programming, analysis, and various topics. Be informative, accurate, and helpful.";

/// Domain and general instruction texts, built together and swapped together.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextPair {
    pub domain: String,
    pub general: String,
    pub rendered_records: usize,
    /// The domain context carries no log evidence.
    pub degraded: bool,
}

impl ContextPair {
    pub fn build(records: &[LogRecord], language: Option<&str>) -> Self {
        let (excerpt, rendered_records) = render_records(records);
        let base = with_language(ANALYST_PREAMBLE, language);
        let domain = if rendered_records == 0 {
            base
        } else {
            format!("{base}\n\nAvailable logs:\n{excerpt}")
        };

        Self {
            domain,
            general: general_context(language),
            rendered_records,
            degraded: rendered_records == 0,
        }
    }

    pub fn select(&self, mode: ContextMode) -> &str {
        match mode {
            ContextMode::Domain => &self.domain,
            ContextMode::General => &self.general,
        }
    }
}

pub fn general_context(language: Option<&str>) -> String {
    with_language(GENERAL_PREAMBLE, language)
}

fn with_language(base: &str, language: Option<&str>) -> String {
    match language {
        Some(lang) => format!("{base} Respond in {lang}."),
        None => base.to_string(),
    }
}

/// `Log {n}: {first 200 chars}...` for each usable record among the first 100, joined by a
/// blank line. `n` is the record's 1-based position in the input.
fn render_records(records: &[LogRecord]) -> (String, usize) {
    let lines: Vec<String> = records
        .iter()
        .take(MAX_RENDERED_RECORDS)
        .enumerate()
        .filter_map(|(i, record)| {
            let text = record.get(PRIMARY_TEXT_FIELD)?.as_str()?;
            if text.is_empty() {
                return None;
            }
            let excerpt: String = text.chars().take(MAX_EXCERPT_CHARS).collect();
            Some(format!("Log {}: {excerpt}...", i + 1))
        })
        .collect();
    let count = lines.len();
    (lines.join("\n\n"), count)
}

pub fn compose_prompt(context: &str, query: &str) -> String {
    format!("{context}\n\nUser question: {query}")
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(full_log: serde_json::Value) -> LogRecord {
        let mut r = LogRecord::new();
        r.insert("full_log".into(), full_log);
        r
    }

    #[test]
    fn renders_numbered_excerpts() {
        let records = vec![record(json!("sshd: failed password")), record(json!("sudo: session opened"))];
        let pair = ContextPair::build(&records, None);
        assert!(!pair.degraded);
        assert_eq!(pair.rendered_records, 2);
        assert!(pair.domain.starts_with("You are a security analyst"));
        assert!(pair.domain.ends_with(
            "Available logs:\nLog 1: sshd: failed password...\n\nLog 2: sudo: session opened..."
        ));
    }

    #[test]
    fn skips_missing_and_empty_keeping_positions() {
        let records = vec![
            record(json!("")),
            LogRecord::new(),
            record(json!(42)),
            record(json!("kept")),
        ];
        let pair = ContextPair::build(&records, None);
        assert_eq!(pair.rendered_records, 1);
        assert!(pair.domain.contains("Log 4: kept..."));
    }

    #[test]
    fn truncates_to_200_chars() {
        let long = "é".repeat(500);
        let pair = ContextPair::build(&[record(json!(long))], None);
        let expected = format!("Log 1: {}...", "é".repeat(200));
        assert!(pair.domain.ends_with(&expected));
    }

    #[test]
    fn only_first_hundred_records_considered() {
        let records: Vec<_> = (0..150).map(|i| record(json!(format!("event {i}")))).collect();
        let pair = ContextPair::build(&records, None);
        assert_eq!(pair.rendered_records, 100);
        assert!(pair.domain.contains("Log 100: event 99..."));
        assert!(!pair.domain.contains("Log 101"));
    }

    #[test]
    fn no_usable_records_is_degraded() {
        let pair = ContextPair::build(&[], None);
        assert!(pair.degraded);
        assert!(!pair.domain.contains("Available logs"));
        assert_eq!(pair.select(ContextMode::General), pair.general);
    }

    #[test]
    fn deterministic_for_same_input() {
        let records = vec![record(json!("a")), record(json!("b"))];
        assert_eq!(ContextPair::build(&records, None), ContextPair::build(&records, None));
    }

    #[test]
    fn language_directive_applied_to_both() {
        let pair = ContextPair::build(&[], Some("Spanish"));
        assert!(pair.domain.ends_with("Respond in Spanish."));
        assert!(pair.general.ends_with("Respond in Spanish."));
    }

    #[test]
    fn prompt_layout() {
        assert_eq!(compose_prompt("CTX", "why?"), "CTX\n\nUser question: why?");
    }
}
