use crate::message::{InboundMessage, PushPayload};
use crate::registration::{DeviceToken, TransportErrorKind};
use serde::{Deserialize, Serialize};

/// 推送通道传递给客户端的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushEvent {
    /// The transport issued a new registration token.
    Registered(DeviceToken),
    RegistrationFailed(TransportErrorKind),
    /// The transport no longer routes messages to this device.
    Unregistered,
    Message(InboundMessage),
}

/// WebSocket 推送通道上的 JSON 帧
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportFrame {
    Registration {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        registration_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unregistered: Option<String>,
    },
    Message(PushPayload),
    /// Outbound request for a fresh registration token.
    Register { sender: String },
}

impl TransportFrame {
    /// Converts an inbound frame into the event it carries.
    ///
    /// An error takes precedence over an unregistration notice, which takes
    /// precedence over a registration id. Outbound frames and registration
    /// frames without any usable field yield `None`.
    pub fn into_event(self) -> Option<PushEvent> {
        match self {
            TransportFrame::Registration {
                registration_id,
                error,
                unregistered,
            } => {
                if let Some(code) = error {
                    Some(PushEvent::RegistrationFailed(TransportErrorKind::from_code(&code)))
                } else if unregistered.is_some() {
                    Some(PushEvent::Unregistered)
                } else {
                    registration_id
                        .and_then(DeviceToken::new)
                        .map(PushEvent::Registered)
                }
            }
            TransportFrame::Message(payload) => {
                Some(PushEvent::Message(InboundMessage::from_payload(&payload)))
            }
            TransportFrame::Register { .. } => None,
        }
    }
}
