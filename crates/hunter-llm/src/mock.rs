use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use hunter_core::{BridgeError, ModelBridge, ProbeReport};

/// Pre-programmed replies for deterministic testing without a model server.
#[derive(Clone, Debug)]
pub enum MockReply {
    Answer(String),
    Error(BridgeError),
    /// Wait a duration, then yield the inner reply.
    Delay(Duration, Box<MockReply>),
    /// Panic inside `invoke`.
    Panic,
}

impl MockReply {
    pub fn answer(text: &str) -> Self {
        Self::Answer(text.to_string())
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock bridge that returns pre-programmed replies in sequence.
pub struct MockBridge {
    replies: Vec<MockReply>,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    probe: Result<ProbeReport, BridgeError>,
    probe_delay: Option<Duration>,
}

impl MockBridge {
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
            probe: Ok(ProbeReport {
                available_models: vec!["mock-model:latest".into()],
                target_model_available: true,
            }),
            probe_delay: None,
        }
    }

    pub fn with_probe(mut self, probe: Result<ProbeReport, BridgeError>) -> Self {
        self.probe = probe;
        self
    }

    /// Make `probe` wait before answering, e.g. to exceed a caller's deadline.
    pub fn with_probe_delay(mut self, delay: Duration) -> Self {
        self.probe_delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ModelBridge for MockBridge {
    fn endpoint(&self) -> &str {
        "mock://"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn invoke(&self, prompt: &str) -> Result<String, BridgeError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.prompts.lock().push(prompt.to_string());

        let Some(reply) = self.replies.get(idx) else {
            return Err(BridgeError::InvalidResponse(format!(
                "MockBridge: no reply configured for call {idx}"
            )));
        };

        // Unrolls nested delays iteratively to avoid recursive async.
        let mut current = reply;
        loop {
            match current {
                MockReply::Answer(text) => return Ok(text.clone()),
                MockReply::Error(e) => return Err(e.clone()),
                MockReply::Delay(duration, inner) => {
                    tokio::time::sleep(*duration).await;
                    current = inner;
                }
                MockReply::Panic => panic!("MockBridge: scripted panic on call {idx}"),
            }
        }
    }

    async fn probe(&self) -> Result<ProbeReport, BridgeError> {
        if let Some(delay) = self.probe_delay {
            tokio::time::sleep(delay).await;
        }
        self.probe.clone()
    }
}
