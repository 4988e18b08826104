//! Push Fan-out Hub — in-process pub/sub that serializes incident upserts
//! to subscribers.
//!
//! Built on a `tokio::sync::broadcast` channel: each subscriber holds its
//! own bounded queue (spec.md default 256) and a lagging subscriber
//! surfaces `broadcast::error::RecvError::Lagged`, which this module
//! translates into the `resync_required` marker rather than silently
//! skipping messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_QUEUE_CAPACITY: usize = 256;
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum HubMessage {
    IncidentUpsert {
        incident_id: String,
        version: u64,
        summary: String,
        updated_ts: DateTime<Utc>,
        sequence: u64,
    },
    Heartbeat {
        sequence: u64,
    },
    ResyncRequired {
        sequence: u64,
    },
    Shutdown {
        sequence: u64,
    },
}

impl HubMessage {
    pub fn sequence(&self) -> u64 {
        match self {
            HubMessage::IncidentUpsert { sequence, .. }
            | HubMessage::Heartbeat { sequence }
            | HubMessage::ResyncRequired { sequence }
            | HubMessage::Shutdown { sequence } => *sequence,
        }
    }
}

pub struct FanoutHub {
    sender: broadcast::Sender<HubMessage>,
    sequence: Arc<AtomicU64>,
}

impl FanoutHub {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(DEFAULT_QUEUE_CAPACITY);
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish_incident_upsert(
        &self,
        incident_id: String,
        version: u64,
        summary: String,
        updated_ts: DateTime<Utc>,
    ) {
        let message = HubMessage::IncidentUpsert {
            incident_id,
            version,
            summary,
            updated_ts,
            sequence: self.next_sequence(),
        };
        // No subscribers is not an error: the hub fans out best-effort.
        let _ = self.sender.send(message);
    }

    pub fn publish_heartbeat(&self) {
        let _ = self.sender.send(HubMessage::Heartbeat {
            sequence: self.next_sequence(),
        });
    }

    pub fn publish_shutdown(&self) {
        let _ = self.sender.send(HubMessage::Shutdown {
            sequence: self.next_sequence(),
        });
    }

    /// Publishes a `heartbeat` every `HEARTBEAT_INTERVAL` until cancelled.
    /// Runs for the lifetime of the server so every connected subscriber
    /// sees a liveness marker even when no incidents are being published.
    pub async fn run_heartbeat(&self, cancel: tokio_util::sync::CancellationToken) {
        let mut interval = tokio::time::interval(HEARTBEAT_INTERVAL);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => self.publish_heartbeat(),
                _ = cancel.cancelled() => break,
            }
        }
    }

    pub fn subscribe(&self) -> HubSubscription {
        HubSubscription {
            receiver: self.sender.subscribe(),
            sequence: self.sequence.clone(),
        }
    }
}

impl Default for FanoutHub {
    fn default() -> Self {
        Self::new()
    }
}

/// A single subscriber's view of the hub. `next()` yields ordinary
/// messages and synthesizes a `resync_required` marker (with a fresh,
/// still-increasing sequence number) whenever the broadcast channel
/// reports that this subscriber fell behind and messages were dropped.
pub struct HubSubscription {
    receiver: broadcast::Receiver<HubMessage>,
    sequence: Arc<AtomicU64>,
}

impl HubSubscription {
    pub async fn next(&mut self) -> Option<HubMessage> {
        match self.receiver.recv().await {
            Ok(message) => Some(message),
            Err(broadcast::error::RecvError::Lagged(_)) => {
                let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
                Some(HubMessage::ResyncRequired { sequence })
            }
            Err(broadcast::error::RecvError::Closed) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_increasing_sequence() {
        let hub = FanoutHub::new();
        let mut sub = hub.subscribe();
        hub.publish_incident_upsert("i1".into(), 1, "s".into(), Utc::now());
        hub.publish_incident_upsert("i1".into(), 2, "s".into(), Utc::now());

        let first = sub.next().await.unwrap();
        let second = sub.next().await.unwrap();
        assert!(second.sequence() > first.sequence());
    }

    #[tokio::test]
    async fn lagging_subscriber_gets_resync_required() {
        let hub = FanoutHub::new();
        let mut sub = hub.subscribe();
        for i in 0..(DEFAULT_QUEUE_CAPACITY + 10) {
            hub.publish_incident_upsert(format!("i{i}"), 1, "s".into(), Utc::now());
        }
        let message = sub.next().await.unwrap();
        assert!(matches!(message, HubMessage::ResyncRequired { .. }));
    }
}
