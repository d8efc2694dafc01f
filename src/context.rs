//! Per-invocation tool context.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Context handed to every tool invocation.
///
/// Carries identifiers for tracing plus an optional cooperative cancellation
/// signal. It holds no shared mutable state.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Identifier of the tool-use request issued by the agent runtime.
    pub tool_use_id: String,
    /// Conversation/session the call belongs to.
    pub session_id: String,
    /// Fired by the caller to abandon the call early.
    pub cancellation: Option<CancellationToken>,
}

impl Default for ToolContext {
    fn default() -> Self {
        Self {
            tool_use_id: Uuid::new_v4().to_string(),
            session_id: "default".to_string(),
            cancellation: None,
        }
    }
}

impl ToolContext {
    /// Create a new tool context.
    pub fn new(tool_use_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            tool_use_id: tool_use_id.into(),
            session_id: session_id.into(),
            cancellation: None,
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Resolves when the caller cancels; never resolves if no signal was provided.
    pub async fn cancelled(&self) {
        match &self.cancellation {
            Some(token) => token.cancelled().await,
            None => std::future::pending().await,
        }
    }
}
