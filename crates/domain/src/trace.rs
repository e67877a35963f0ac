use serde::Serialize;

/// Structured trace events emitted across all unified-agent crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    HistoryLoaded {
        agent_id: String,
        messages: usize,
    },
    HistoryTruncated {
        agent_id: String,
        removed: usize,
        retained: usize,
    },
    HistoryPersisted {
        agent_id: String,
        messages: usize,
    },
    BackupRotated {
        agent_id: String,
        file: String,
        pruned: usize,
    },
    FileIncluded {
        name: String,
        bytes: usize,
        outcome: String,
    },
    RequestAttempt {
        model: String,
        attempt: u32,
        max_attempts: u32,
        timeout_secs: u64,
    },
    RequestRetry {
        model: String,
        attempt: u32,
        delay_ms: u64,
        reason: String,
    },
    LlmRequest {
        model: String,
        streaming: bool,
        status: u16,
        duration_ms: u64,
    },
    TurnPhase {
        agent_id: String,
        turn_id: String,
        phase: String,
    },
    StreamCompleted {
        agent_id: String,
        turn_id: String,
        chunks: usize,
        chars: usize,
        persisted: bool,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ua_event");
    }
}
