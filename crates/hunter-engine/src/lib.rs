pub mod classify;
pub mod context;
pub mod runtime;

pub use classify::{classify, ContextMode};
pub use context::{compose_prompt, ContextPair};
pub use runtime::{
    BridgeFactory, IngestSummary, RebuildMode, RuntimeError, RuntimeSnapshot, SharedRuntime,
};
