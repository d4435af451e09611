use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::common::error::DeliveryError;
use crate::modules::job::JobKind;
use crate::modules::session::OwnerId;

pub mod hub;

pub use hub::{ChannelMessenger, OutboundMessage, Subscription};

/// One button of an inline menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MenuOption {
    pub label: String,
    /// Command sent back when the button is pressed.
    pub data: String,
}

impl MenuOption {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Identifies the message that progress updates edit in place.
pub type MessageHandle = Uuid;

/// Outbound side of the requester-facing channel.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_menu(
        &self,
        owner: OwnerId,
        text: &str,
        options: &[MenuOption],
    ) -> Result<(), DeliveryError>;

    async fn send_progress(
        &self,
        owner: OwnerId,
        handle: MessageHandle,
        percent: u8,
    ) -> Result<(), DeliveryError>;

    /// Delivers a finished artifact. The file may be deleted as soon as this
    /// returns.
    async fn send_result(
        &self,
        owner: OwnerId,
        kind: JobKind,
        artifact: &Path,
    ) -> Result<(), DeliveryError>;

    async fn send_error(&self, owner: OwnerId, message: &str) -> Result<(), DeliveryError>;

    async fn send_notice(&self, owner: OwnerId, text: &str) -> Result<(), DeliveryError>;
}
