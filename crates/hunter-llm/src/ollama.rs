//! Bridge to a local Ollama server.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use hunter_core::{BridgeError, ModelBridge, ProbeReport, ServiceConfig};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct OllamaBridge {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

impl OllamaBridge {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        temperature: f64,
        num_predict: u32,
    ) -> Result<Self, BridgeError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| BridgeError::Config(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature,
            num_predict,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, BridgeError> {
        Self::new(
            config.backend_url.clone(),
            config.model.clone(),
            config.temperature,
            config.max_output_tokens,
        )
    }
}

/// True when `available` names the same model as `target`, with or without a tag.
pub fn model_matches(available: &str, target: &str) -> bool {
    available == target || available.split(':').next() == Some(target)
}

fn network_error(e: reqwest::Error, timeout: Duration) -> BridgeError {
    if e.is_timeout() {
        BridgeError::Timeout(timeout)
    } else {
        BridgeError::Network(e.to_string())
    }
}

#[async_trait]
impl ModelBridge for OllamaBridge {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip_all, fields(model = %self.model, prompt_len = prompt.len()))]
    async fn invoke(&self, prompt: &str) -> Result<String, BridgeError> {
        let started = Instant::now();
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
                num_predict: self.num_predict,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.endpoint))
            .json(&body)
            .send()
            .await
            .map_err(|e| network_error(e, started.elapsed()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "model backend returned an error");
            return Err(BridgeError::from_status(status.as_u16(), text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::InvalidResponse(e.to_string()))?;

        debug!(
            duration_ms = started.elapsed().as_millis() as u64,
            answer_len = parsed.message.content.len(),
            "model answered"
        );
        Ok(parsed.message.content)
    }

    async fn probe(&self) -> Result<ProbeReport, BridgeError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.endpoint))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
            .map_err(|e| network_error(e, PROBE_TIMEOUT))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(BridgeError::from_status(status.as_u16(), text));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::InvalidResponse(e.to_string()))?;
        let available_models: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        let target_model_available = available_models
            .iter()
            .any(|name| model_matches(name, &self.model));

        Ok(ProbeReport {
            available_models,
            target_model_available,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use parking_lot::Mutex;
    use serde_json::{json, Value};

    use super::*;

    /// Start a fake Ollama on an ephemeral port, returning its base URL.
    async fn fake_ollama(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn tag_matching() {
        assert!(model_matches("llama3", "llama3"));
        assert!(model_matches("llama3:latest", "llama3"));
        assert!(model_matches("llama3:8b", "llama3:8b"));
        assert!(!model_matches("llama3:8b", "llama3:70b"));
        assert!(!model_matches("llama3.1:latest", "llama3"));
    }

    #[tokio::test]
    async fn invoke_posts_single_user_message() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let captured = seen.clone();
        let router = Router::new().route(
            "/api/chat",
            post(move |Json(body): Json<Value>| {
                let captured = captured.clone();
                async move {
                    *captured.lock() = Some(body);
                    Json(json!({"message": {"role": "assistant", "content": "three failed logins"}, "done": true}))
                }
            }),
        );
        let url = fake_ollama(router).await;

        let bridge = OllamaBridge::new(format!("{url}/"), "llama3", 0.1, 512).unwrap();
        assert_eq!(bridge.endpoint(), url);
        let answer = bridge.invoke("ctx\n\nUser question: what?").await.unwrap();
        assert_eq!(answer, "three failed logins");

        let body = seen.lock().clone().unwrap();
        assert_eq!(body["model"], "llama3");
        assert_eq!(body["stream"], false);
        assert_eq!(body["options"]["num_predict"], 512);
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "ctx\n\nUser question: what?");
    }

    #[tokio::test]
    async fn backend_error_surfaces_status() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async { (StatusCode::NOT_FOUND, "model \"llama3\" not found") }),
        );
        let url = fake_ollama(router).await;
        let bridge = OllamaBridge::new(url, "llama3", 0.1, 512).unwrap();

        let err = bridge.invoke("hi").await.unwrap_err();
        assert!(matches!(err, BridgeError::Backend { status: 404, .. }));
        assert!(!err.is_timeout());
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let router = Router::new().route("/api/chat", post(|| async { "not json" }));
        let url = fake_ollama(router).await;
        let bridge = OllamaBridge::new(url, "llama3", 0.1, 512).unwrap();

        let err = bridge.invoke("hi").await.unwrap_err();
        assert_eq!(err.error_kind(), "invalid_response");
    }

    #[tokio::test]
    async fn probe_reports_models() {
        let router = Router::new().route(
            "/api/tags",
            get(|| async {
                Json(json!({"models": [{"name": "mistral:7b"}, {"name": "llama3:latest"}]}))
            }),
        );
        let url = fake_ollama(router).await;

        let bridge = OllamaBridge::new(url.clone(), "llama3", 0.1, 512).unwrap();
        let report = bridge.probe().await.unwrap();
        assert_eq!(report.available_models, vec!["mistral:7b", "llama3:latest"]);
        assert!(report.target_model_available);

        let other = OllamaBridge::new(url, "phi3", 0.1, 512).unwrap();
        assert!(!other.probe().await.unwrap().target_model_available);
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let port = {
            let l = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            l.local_addr().unwrap().port()
        };
        let bridge = OllamaBridge::new(format!("http://127.0.0.1:{port}"), "llama3", 0.1, 512).unwrap();
        let err = bridge.probe().await.unwrap_err();
        assert_eq!(err.error_kind(), "network_error");
    }
}
