// Active call slot and transition history for the call coordinator

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::payload::CallPayload;
use super::status::CallState;

/// Transitions kept for diagnostics before the oldest is dropped
pub const HISTORY_LIMIT: usize = 100;

/// The single call the coordinator is currently presenting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveCall {
    pub payload: CallPayload,
    pub state: CallState,
    /// Token identifying this activation; the ring timer compares it at fire time
    pub generation: u64,
    pub started_at: DateTime<Utc>,
}

impl ActiveCall {
    pub fn ringing(payload: CallPayload, generation: u64) -> Self {
        Self {
            payload,
            state: CallState::Ringing,
            generation,
            started_at: Utc::now(),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.payload.room_id
    }
}

/// Why the coordinator changed the active call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransitionReason {
    /// Valid inbound call message
    InboundMessage,
    /// Torn down because a newer inbound call arrived
    Superseded,
    UserAccepted,
    UserDeclined,
    RingTimeout,
    CallerCancelled,
    /// Status pushed by the remote signaling backend
    RemoteStatus,
}

/// Record of a single change to the active call slot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub room_id: String,
    pub call_id: String,
    /// `None` means the slot was empty
    pub from: Option<CallState>,
    /// `None` means the slot was cleared without an event
    pub to: Option<CallState>,
    pub reason: TransitionReason,
    pub at: DateTime<Utc>,
}

/// Bounded transition log, oldest entries dropped first
#[derive(Debug, Clone, Default)]
pub struct TransitionHistory {
    records: VecDeque<TransitionRecord>,
}

impl TransitionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        payload: &CallPayload,
        from: Option<CallState>,
        to: Option<CallState>,
        reason: TransitionReason,
    ) {
        self.records.push_back(TransitionRecord {
            room_id: payload.room_id.clone(),
            call_id: payload.call_id.clone(),
            from,
            to,
            reason,
            at: Utc::now(),
        });

        while self.records.len() > HISTORY_LIMIT {
            self.records.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn snapshot(&self) -> Vec<TransitionRecord> {
        self.records.iter().cloned().collect()
    }

    pub fn last(&self) -> Option<&TransitionRecord> {
        self.records.back()
    }
}
