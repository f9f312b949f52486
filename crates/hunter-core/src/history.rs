use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One turn of a session's conversation history.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_tag_roles() {
        assert_eq!(HistoryEntry::system("s").role, Role::System);
        assert_eq!(HistoryEntry::user("u").role, Role::User);
        assert_eq!(HistoryEntry::assistant("a").role, Role::Assistant);
    }

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&HistoryEntry::assistant("hi")).unwrap();
        assert!(json.contains(r#""role":"assistant""#));
    }
}
