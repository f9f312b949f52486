pub mod mock;
pub mod ollama;

pub use mock::{MockBridge, MockReply};
pub use ollama::OllamaBridge;
