use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title shown on every system notification and alert.
pub const NOTIFICATION_TITLE: &str = "Push Notification";

/// The single notification slot reused for every system notification.
pub const NOTIFICATION_SLOT: i32 = 1;

/// `type` value selecting the interactive alert path.
pub const RAW_MESSAGE_TYPE: &str = "raw";

/// 推送消息原始字段
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub count: Option<String>,
    #[serde(default)]
    pub sound: Option<String>,
    #[serde(default, rename = "type")]
    pub message_type: Option<String>,
}

/// 消息投递路径
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Interactive, dismissible alert.
    Raw,
    /// System notification.
    Notify,
}

impl MessageKind {
    pub fn from_type(message_type: Option<&str>) -> Self {
        match message_type {
            Some(RAW_MESSAGE_TYPE) => MessageKind::Raw,
            _ => MessageKind::Notify,
        }
    }
}

/// 收到的推送消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub kind: MessageKind,
    pub body: String,
    /// `None` when the payload carried no count or a non-numeric one.
    pub badge_count: Option<i32>,
    pub sound_requested: bool,
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    pub fn from_payload(payload: &PushPayload) -> Self {
        Self::from_payload_at(payload, Utc::now())
    }

    pub fn from_payload_at(payload: &PushPayload, received_at: DateTime<Utc>) -> Self {
        let badge_count = payload
            .count
            .as_deref()
            .and_then(|count| count.parse::<i32>().ok());
        let sound_requested = payload
            .sound
            .as_deref()
            .is_some_and(|sound| !sound.is_empty());

        Self {
            kind: MessageKind::from_type(payload.message_type.as_deref()),
            body: payload.message.clone().unwrap_or_default(),
            badge_count,
            sound_requested,
            received_at,
        }
    }
}
