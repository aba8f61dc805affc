//! Conversation state machine for one chat session.
//!
//! State lives inside a `tokio::sync::watch` channel: transitions go through
//! `send_if_modified`, which makes the pending-guard check and the mutation
//! atomic, and lets any UI layer observe snapshots via `subscribe` instead of
//! owning mutable fields.

use std::sync::Arc;

use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::transport::{QueryTransport, TransportError};
use crate::types::{Message, QueryRequest};

const CANCELLED_MESSAGE: &str = "Request cancelled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    Pending,
    Error,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub status: SessionStatus,
    pub error_message: Option<String>,
}

/// Owns the conversation for one browser session. At most one submission is
/// in flight at a time; the guard is the `Pending` status itself, no extra
/// synchronization.
pub struct ChatController {
    transport: Arc<dyn QueryTransport>,
    state: watch::Sender<ConversationState>,
}

/// Handle for one in-flight submission. Dropping it leaves the request
/// running; `abort` cancels it and resolves the session to `Error`.
pub struct SubmitHandle {
    cancel: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SubmitHandle {
    pub fn abort(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    /// Wait for the submission to settle (answered, failed or aborted).
    pub async fn finished(self) {
        let _ = self.task.await;
    }
}

impl ChatController {
    pub fn new(transport: Arc<dyn QueryTransport>) -> Self {
        let (state, _) = watch::channel(ConversationState::default());
        Self { transport, state }
    }

    /// Read-only copy of the current conversation.
    pub fn snapshot(&self) -> ConversationState {
        self.state.borrow().clone()
    }

    /// Watch for state changes; each transition publishes a new snapshot.
    pub fn subscribe(&self) -> watch::Receiver<ConversationState> {
        self.state.subscribe()
    }

    /// Submit user text. Returns `None` without touching state when the text
    /// is blank or another submission is still pending. On failure the
    /// optimistic user message is rolled back so the conversation never shows
    /// an unanswered question.
    pub fn submit(&self, text: &str) -> Option<SubmitHandle> {
        if text.trim().is_empty() {
            return None;
        }

        let mut accepted = false;
        self.state.send_if_modified(|state| {
            if state.status == SessionStatus::Pending {
                return false;
            }
            state.messages.push(Message::new_user(text));
            state.error_message = None;
            state.status = SessionStatus::Pending;
            accepted = true;
            true
        });
        if !accepted {
            return None;
        }

        let request = QueryRequest {
            query: text.to_string(),
        };
        let transport = Arc::clone(&self.transport);
        let state = self.state.clone();
        let (cancel_tx, cancel_rx) = oneshot::channel();

        let task = tokio::spawn(async move {
            // A dropped handle closes the channel without sending; that must
            // not cancel the request, so only an explicit signal counts.
            let cancelled = async move {
                if cancel_rx.await.is_err() {
                    std::future::pending::<()>().await;
                }
            };

            let outcome = tokio::select! {
                result = transport.send(request) => result,
                _ = cancelled => Err(TransportError::new(CANCELLED_MESSAGE)),
            };

            state.send_modify(|state| match &outcome {
                Ok(response) => {
                    state
                        .messages
                        .push(Message::new_assistant(response.response.clone()));
                    state.status = SessionStatus::Idle;
                }
                Err(err) => {
                    // Single-flight guarantees the last entry is the
                    // optimistic user message.
                    state.messages.pop();
                    state.error_message = Some(err.message.clone());
                    state.status = SessionStatus::Error;
                }
            });
        });

        Some(SubmitHandle {
            cancel: Some(cancel_tx),
            task,
        })
    }

    /// Empty the conversation. Rejected while a submission is pending.
    pub fn clear(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.status == SessionStatus::Pending {
                return false;
            }
            state.messages.clear();
            state.error_message = None;
            state.status = SessionStatus::Idle;
            true
        })
    }
}
