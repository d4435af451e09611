use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{MenuOption, MessageHandle, Messenger};
use crate::common::error::DeliveryError;
use crate::modules::job::JobKind;
use crate::modules::session::OwnerId;

/// Messages a single connection may have pending before sends to it fail.
const LISTENER_CAPACITY: usize = 256;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    Menu {
        text: String,
        options: Vec<MenuOption>,
    },
    Progress {
        handle: MessageHandle,
        percent: u8,
        text: String,
    },
    Result {
        kind: JobKind,
        file_name: String,
        content_type: String,
        size: usize,
        #[serde(skip)]
        data: Bytes,
    },
    Error {
        message: String,
    },
    Notice {
        text: String,
    },
}

type Listeners = HashMap<OwnerId, Vec<(Uuid, mpsc::Sender<OutboundMessage>)>>;

/// Routes outbound messages to the chat connections of their owner.
///
/// Every connection gets its own bounded channel, so a busy owner can never
/// push another owner's messages out.
#[derive(Debug, Clone)]
pub struct ChannelMessenger {
    listeners: Arc<Mutex<Listeners>>,
}

impl Default for ChannelMessenger {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelMessenger {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Opens a feed of every message addressed to `owner`.
    pub fn subscribe(&self, owner: OwnerId) -> Subscription {
        let (tx, rx) = mpsc::channel(LISTENER_CAPACITY);
        let id = Uuid::new_v4();
        self.listeners.lock().entry(owner).or_default().push((id, tx));
        Subscription {
            owner,
            id,
            rx,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn is_connected(&self, owner: OwnerId) -> bool {
        self.listeners
            .lock()
            .get(&owner)
            .is_some_and(|senders| !senders.is_empty())
    }

    /// Hands `message` to every connection of `owner`. Succeeds when at least
    /// one of them accepted it.
    fn publish(&self, owner: OwnerId, message: OutboundMessage) -> Result<(), DeliveryError> {
        let senders: Vec<mpsc::Sender<OutboundMessage>> = match self.listeners.lock().get(&owner) {
            Some(senders) => senders.iter().map(|(_, tx)| tx.clone()).collect(),
            None => Vec::new(),
        };
        if senders.is_empty() {
            return Err(DeliveryError::Unreachable(owner));
        }

        let mut delivered = false;
        let mut backlogged = false;
        for tx in senders {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered = true,
                Err(TrySendError::Full(_)) => {
                    warn!(%owner, "Chat connection is not draining, message refused");
                    backlogged = true;
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }

        match (delivered, backlogged) {
            (true, _) => Ok(()),
            (false, true) => Err(DeliveryError::Backlogged(owner)),
            (false, false) => Err(DeliveryError::Unreachable(owner)),
        }
    }
}

#[async_trait]
impl Messenger for ChannelMessenger {
    async fn send_menu(
        &self,
        owner: OwnerId,
        text: &str,
        options: &[MenuOption],
    ) -> Result<(), DeliveryError> {
        self.publish(
            owner,
            OutboundMessage::Menu {
                text: text.to_string(),
                options: options.to_vec(),
            },
        )
    }

    async fn send_progress(
        &self,
        owner: OwnerId,
        handle: MessageHandle,
        percent: u8,
    ) -> Result<(), DeliveryError> {
        self.publish(
            owner,
            OutboundMessage::Progress {
                handle,
                percent,
                text: format!("Processing your video: {percent}%"),
            },
        )
    }

    async fn send_result(
        &self,
        owner: OwnerId,
        kind: JobKind,
        artifact: &Path,
    ) -> Result<(), DeliveryError> {
        if !self.is_connected(owner) {
            return Err(DeliveryError::Unreachable(owner));
        }

        // Read eagerly: the worker deletes the file right after delivery
        let data = tokio::fs::read(artifact)
            .await
            .map_err(|source| DeliveryError::Artifact {
                path: artifact.to_path_buf(),
                source,
            })?;
        let file_name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "result".to_string());
        let content_type = mime_guess::from_path(artifact)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        debug!(%owner, file_name, size = data.len(), "Delivering result");
        self.publish(
            owner,
            OutboundMessage::Result {
                kind,
                file_name,
                content_type,
                size: data.len(),
                data: Bytes::from(data),
            },
        )
    }

    async fn send_error(&self, owner: OwnerId, message: &str) -> Result<(), DeliveryError> {
        self.publish(
            owner,
            OutboundMessage::Error {
                message: message.to_string(),
            },
        )
    }

    async fn send_notice(&self, owner: OwnerId, text: &str) -> Result<(), DeliveryError> {
        self.publish(
            owner,
            OutboundMessage::Notice {
                text: text.to_string(),
            },
        )
    }
}

/// Receiving end of one chat connection; unregisters itself when dropped.
pub struct Subscription {
    owner: OwnerId,
    id: Uuid,
    rx: mpsc::Receiver<OutboundMessage>,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Next message for this owner, or `None` once the messenger is gone.
    pub async fn recv(&mut self) -> Option<OutboundMessage> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(listeners) = self.listeners.upgrade() else {
            return;
        };
        let mut listeners = listeners.lock();
        if let Some(senders) = listeners.get_mut(&self.owner) {
            senders.retain(|(id, _)| *id != self.id);
            if senders.is_empty() {
                listeners.remove(&self.owner);
            }
        }
    }
}
