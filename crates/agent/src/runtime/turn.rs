//! One conversation turn: user message in, reply fragments out.
//!
//! The user message is resolved and stored before anything touches the
//! network. The reply arrives as a pull-based stream of text fragments; the
//! assistant message is appended once, when the stream reaches its end.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use serde_json::{json, Map, Value};

use ua_domain::config::{AgentConfig, ConfigOverrides};
use ua_domain::message::Role;
use ua_domain::stream::{BoxStream, Completion, StreamEvent};
use ua_domain::trace::TraceEvent;
use ua_providers::openai::{parse_completion, parse_sse_data};
use ua_providers::payload::build_payload;
use ua_providers::sse::sse_event_stream;
use ua_providers::HttpReply;

use super::Agent;

/// Returned instead of a reply when the provider sent no text.
pub const NO_CONTENT: &str = "No response content received";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TurnPhase {
    #[default]
    Idle,
    Sending,
    Streaming,
    Parsing,
}

impl TurnPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnPhase::Idle => "idle",
            TurnPhase::Sending => "sending",
            TurnPhase::Streaming => "streaming",
            TurnPhase::Parsing => "parsing",
        }
    }
}

/// The agent's current phase, shared with the in-flight turn stream.
#[derive(Debug, Clone, Default)]
pub(crate) struct PhaseSlot(Arc<Mutex<TurnPhase>>);

impl PhaseSlot {
    pub(crate) fn get(&self) -> TurnPhase {
        *self.lock()
    }

    /// Store `phase`, returning the previous one.
    pub(crate) fn replace(&self, phase: TurnPhase) -> TurnPhase {
        std::mem::replace(&mut *self.lock(), phase)
    }

    fn lock(&self) -> MutexGuard<'_, TurnPhase> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Lives inside the turn stream; puts the agent back to `Idle` if the
/// stream is dropped before it finishes.
struct IdleOnDrop {
    slot: PhaseSlot,
    agent_id: String,
    turn_id: String,
}

impl Drop for IdleOnDrop {
    fn drop(&mut self) {
        if self.slot.replace(TurnPhase::Idle) != TurnPhase::Idle {
            tracing::debug!(agent_id = %self.agent_id, turn_id = %self.turn_id, "turn dropped before completion");
            emit_phase(&self.agent_id, &self.turn_id, TurnPhase::Idle);
        }
    }
}

pub(crate) fn emit_phase(agent_id: &str, turn_id: &str, phase: TurnPhase) {
    TraceEvent::TurnPhase {
        agent_id: agent_id.to_string(),
        turn_id: turn_id.to_string(),
        phase: phase.as_str().to_string(),
    }
    .emit();
}

impl Agent {
    /// Submit a user message and return the reply as text fragments.
    ///
    /// Before returning, `{file}` tokens are resolved and the resolved text
    /// is appended to history; that append happens even if the request later
    /// fails. The stream borrows the agent mutably, so only one turn can be
    /// in flight.
    ///
    /// Dropping the stream before it ends skips the assistant append; the
    /// phase still returns to `Idle`.
    pub fn submit<'a>(
        &'a mut self,
        text: &str,
        overrides: &ConfigOverrides,
    ) -> BoxStream<'a, String> {
        let turn_id = uuid::Uuid::new_v4().to_string();
        let config = self.config.merged(overrides);
        let resolved = self.inclusions.resolve(text);

        // Built from the prior history; the new turn goes in last.
        let payload = build_payload(self.history.messages(), &resolved, &config);
        self.history
            .append(Role::User, resolved, Some(turn_metadata(&turn_id)));

        let stream = async_stream::stream! {
            let _idle = IdleOnDrop {
                slot: self.phase.clone(),
                agent_id: self.id().to_string(),
                turn_id: turn_id.clone(),
            };
            self.set_phase(TurnPhase::Sending, &turn_id);
            let reply = match self.client.send(&payload).await {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!(agent_id = %self.id(), turn_id = %turn_id, error = %e, "request failed");
                    self.set_phase(TurnPhase::Idle, &turn_id);
                    yield format!("API call failed: {e}");
                    return;
                }
            };

            if config.stream {
                self.set_phase(TurnPhase::Streaming, &turn_id);
                let mut events = sse_event_stream(reply.body, parse_sse_data);
                let mut reply_text = String::new();
                let mut chunks = 0usize;
                let mut trailer: Option<String> = None;

                while let Some(event) = events.next().await {
                    match event {
                        Ok(StreamEvent::Delta { text, finished }) => {
                            if !text.is_empty() {
                                reply_text.push_str(&text);
                                chunks += 1;
                                yield text;
                            }
                            if finished {
                                break;
                            }
                        }
                        Ok(StreamEvent::Finished) => break,
                        Ok(StreamEvent::Malformed { reason }) => {
                            tracing::warn!(turn_id = %turn_id, reason = %reason, "skipping malformed stream event");
                        }
                        Ok(StreamEvent::ProviderError { code, message }) => {
                            tracing::warn!(turn_id = %turn_id, code = ?code, "provider error mid-stream: {message}");
                            trailer = Some(format!("\n[Stream error: {message}]"));
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(turn_id = %turn_id, error = %e, "stream interrupted");
                            trailer = Some(format!("\n[Stream interrupted: {e}]"));
                            break;
                        }
                    }
                }

                // Stored before the trailer is handed out, so a consumer that
                // stops at the trailer still gets the reply persisted.
                let persisted = !reply_text.is_empty();
                let chars = reply_text.chars().count();
                if persisted {
                    self.history.append(
                        Role::Assistant,
                        reply_text,
                        Some(reply_metadata(&turn_id, &config, true)),
                    );
                }
                TraceEvent::StreamCompleted {
                    agent_id: self.id().to_string(),
                    turn_id: turn_id.clone(),
                    chunks,
                    chars,
                    persisted,
                }
                .emit();
                self.set_phase(TurnPhase::Idle, &turn_id);

                if let Some(trailer) = trailer {
                    yield trailer;
                }
            } else {
                self.set_phase(TurnPhase::Parsing, &turn_id);
                let fragment = self.finish_single_shot(reply, &turn_id, &config).await;
                self.set_phase(TurnPhase::Idle, &turn_id);
                yield fragment;
            }
        };

        Box::pin(stream)
    }

    /// Read and parse a complete body; returns the single fragment to show.
    async fn finish_single_shot(
        &mut self,
        reply: HttpReply,
        turn_id: &str,
        config: &AgentConfig,
    ) -> String {
        let body = match reply.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(turn_id = %turn_id, error = %e, "reading response body failed");
                return format!("API call failed: {e}");
            }
        };

        match parse_completion(&body) {
            Completion::Success { content } => {
                self.history.append(
                    Role::Assistant,
                    content.clone(),
                    Some(reply_metadata(turn_id, config, false)),
                );
                content
            }
            Completion::Empty => {
                tracing::warn!(turn_id = %turn_id, "response had no content");
                NO_CONTENT.to_string()
            }
            Completion::Malformed { reason } => {
                tracing::error!(turn_id = %turn_id, reason = %reason, "unparseable response");
                format!("Error parsing response: {reason}")
            }
            Completion::ProviderError { code, message } => {
                tracing::error!(turn_id = %turn_id, code = ?code, "provider error: {message}");
                format!("API call failed: {message}")
            }
        }
    }
}

fn turn_metadata(turn_id: &str) -> Map<String, Value> {
    let mut meta = Map::new();
    meta.insert("turn_id".into(), json!(turn_id));
    meta
}

fn reply_metadata(turn_id: &str, config: &AgentConfig, streamed: bool) -> Map<String, Value> {
    let mut meta = turn_metadata(turn_id);
    meta.insert("model".into(), json!(config.model.as_str()));
    meta.insert("streamed".into(), json!(streamed));
    meta
}
