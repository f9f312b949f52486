use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::BridgeError;

/// Result of a bridge liveness probe.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeReport {
    pub available_models: Vec<String>,
    pub target_model_available: bool,
}

/// The external model collaborator: one composed prompt in, one answer out.
#[async_trait]
pub trait ModelBridge: Send + Sync {
    /// Base URL of the backend, reported in diagnostics.
    fn endpoint(&self) -> &str;
    fn model(&self) -> &str;

    async fn invoke(&self, prompt: &str) -> Result<String, BridgeError>;

    /// List the backend's models and check that the configured one is among them.
    async fn probe(&self) -> Result<ProbeReport, BridgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probe_report_serde() {
        let report = ProbeReport {
            available_models: vec!["llama3:latest".into()],
            target_model_available: true,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["target_model_available"], true);
        assert_eq!(json["available_models"][0], "llama3:latest");
    }
}
