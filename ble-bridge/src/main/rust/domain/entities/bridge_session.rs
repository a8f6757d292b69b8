use std::time::Instant;

use tokio::sync::mpsc::{self, error::TrySendError};
use uuid::Uuid;

use crate::domain::value_objects::OutboundEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Registered, transport not yet ready to write
    Pending,
    Open,
    Closed,
}

/// What happened to one event offered to one session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// Session not open; nothing queued
    Skipped,
    /// Session open but its outbound buffer is full
    Dropped,
}

/// One connected client transport
#[derive(Debug)]
pub struct BridgeSession {
    id: String,
    outbound: mpsc::Sender<OutboundEvent>,
    connected_at: Instant,
    state: SessionState,
}

impl BridgeSession {
    pub fn new(outbound: mpsc::Sender<OutboundEvent>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            outbound,
            connected_at: Instant::now(),
            state: SessionState::Pending,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn connected_for(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    pub fn activate(&mut self) {
        if self.state == SessionState::Pending {
            self.state = SessionState::Open;
        }
    }

    pub fn close(&mut self) {
        self.state = SessionState::Closed;
    }

    /// Open and the writer on the other end of the buffer is still alive
    pub fn is_open(&self) -> bool {
        self.state == SessionState::Open && !self.outbound.is_closed()
    }

    /// Sender for replies that must not be dropped; None unless open
    pub fn reply_channel(&self) -> Option<mpsc::Sender<OutboundEvent>> {
        self.is_open().then(|| self.outbound.clone())
    }

    /// Best-effort, at-most-once hand-off; never waits
    pub fn deliver(&self, event: OutboundEvent) -> Delivery {
        if !self.is_open() {
            return Delivery::Skipped;
        }
        match self.outbound.try_send(event) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => Delivery::Dropped,
            Err(TrySendError::Closed(_)) => Delivery::Skipped,
        }
    }
}
