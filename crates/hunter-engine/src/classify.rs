use serde::Serialize;

/// Which instruction context a query is answered against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextMode {
    /// Security-analyst instructions plus rendered log evidence.
    Domain,
    General,
}

impl ContextMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::General => "general",
        }
    }
}

const SECURITY_KEYWORDS: &[&str] = &[
    "wazuh",
    "log",
    "security",
    "threat",
    "alert",
    "event",
    "attack",
    "intrusion",
    "firewall",
    "antivirus",
    "malware",
    "vulnerability",
    "breach",
    "incident",
    "monitoring",
    "detection",
    "siem",
    "ossec",
    "archives",
    "threat hunting",
];

/// Case-insensitive substring match against the security vocabulary.
pub fn classify(query: &str) -> ContextMode {
    let lowered = query.to_lowercase();
    if SECURITY_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        ContextMode::Domain
    } else {
        ContextMode::General
    }
}
