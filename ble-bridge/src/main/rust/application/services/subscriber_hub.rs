use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use super::AdvertisingController;
use crate::domain::entities::{BridgeSession, Delivery};
use crate::domain::ports::MetricsReporter;
use crate::domain::value_objects::{AdvertisementRecord, InboundCommand, OutboundEvent};

/// Per-session outbound buffer; events beyond it are dropped, not queued
pub const SESSION_BUFFER: usize = 256;

/// Owns the live session set: fans events out and routes commands
pub struct SubscriberHub {
    sessions: RwLock<HashMap<String, BridgeSession>>,
    controller: Arc<AdvertisingController>,
    metrics: Arc<dyn MetricsReporter>,
}

impl SubscriberHub {
    pub fn new(controller: Arc<AdvertisingController>, metrics: Arc<dyn MetricsReporter>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            controller,
            metrics,
        }
    }

    pub fn controller(&self) -> &Arc<AdvertisingController> {
        &self.controller
    }

    /// Register a pending session backed by a fresh outbound buffer
    pub async fn connect(&self) -> (String, mpsc::Receiver<OutboundEvent>) {
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);
        let id = self.add_session(BridgeSession::new(tx)).await;
        (id, rx)
    }

    pub async fn add_session(&self, session: BridgeSession) -> String {
        let id = session.id().to_string();
        self.sessions.write().await.insert(id.clone(), session);
        self.metrics.report_session_opened();
        tracing::debug!(session_id = %id, "Session added");
        id
    }

    /// Mark a session's transport ready; returns false for unknown ids
    pub async fn open_session(&self, id: &str) -> bool {
        match self.sessions.write().await.get_mut(id) {
            Some(session) => {
                session.activate();
                true
            }
            None => false,
        }
    }

    pub async fn remove_session(&self, id: &str) -> Option<BridgeSession> {
        let mut session = self.sessions.write().await.remove(id)?;
        session.close();
        self.metrics.report_session_closed();
        tracing::debug!(
            session_id = %id,
            connected_for = ?session.connected_for(),
            "Session removed"
        );
        Some(session)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Offer `event` to every open session; returns how many accepted it
    pub async fn broadcast(&self, event: OutboundEvent) -> usize {
        let sessions = self.sessions.read().await;
        let mut delivered = 0;

        for session in sessions.values() {
            match session.deliver(event.clone()) {
                Delivery::Delivered => delivered += 1,
                Delivery::Dropped => {
                    self.metrics.report_delivery_dropped();
                    tracing::debug!(session_id = %session.id(), "Outbound buffer full, event dropped");
                }
                Delivery::Skipped => {}
            }
        }

        delivered
    }

    /// Queue `event` for one session, waiting for buffer space if needed.
    /// The session map is not held while waiting.
    pub async fn send_to(&self, id: &str, event: OutboundEvent) -> Delivery {
        let reply = match self.sessions.read().await.get(id) {
            Some(session) => session.reply_channel(),
            None => None,
        };
        let Some(reply) = reply else {
            return Delivery::Skipped;
        };

        match reply.send(event).await {
            Ok(()) => Delivery::Delivered,
            Err(_) => Delivery::Skipped,
        }
    }

    pub async fn publish_advertisement(&self, record: AdvertisementRecord) -> usize {
        let delivered = self.broadcast(OutboundEvent::Advertisement(record)).await;
        self.metrics.report_advertisement_relayed();
        delivered
    }

    /// Handle one inbound frame. Malformed frames are dropped without reply;
    /// the status of a recognized command goes to the sender only.
    pub async fn on_message(&self, id: &str, raw: &str) {
        let command = match InboundCommand::parse(raw) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(session_id = %id, error = %e, "Dropping malformed command");
                return;
            }
        };

        let status = match command {
            InboundCommand::StartAdvertising { config } => {
                self.controller
                    .start(config.unwrap_or_default().into())
                    .await
            }
            InboundCommand::StopAdvertising => self.controller.stop().await,
        };

        tracing::debug!(session_id = %id, status = status.as_str(), "Advertising request handled");
        self.send_to(id, OutboundEvent::status(status)).await;
    }
}
