use chrono::{DateTime, Utc};
use pushsync_sdk::{InboundMessage, MessageKind, NOTIFICATION_SLOT, NOTIFICATION_TITLE};
use std::sync::Arc;
use tracing::debug;

/// 交互式提示框
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub body: String,
    pub dismiss_label: String,
}

/// 系统通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemNotification {
    /// Every notification uses the same slot, so a new one replaces the last.
    pub slot: i32,
    pub title: String,
    pub body: String,
    pub sound: bool,
    pub badge: Option<i32>,
    pub posted_at: DateTime<Utc>,
    /// Dismiss the notification when it is opened.
    pub auto_cancel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Presentation {
    Alert(Alert),
    Notification(SystemNotification),
}

/// 通知展示端（外部 UI）
pub trait NotificationPresenter: Send + Sync {
    fn present(&self, presentation: &Presentation);
}

#[derive(Clone)]
pub struct MessageDispatcher {
    presenter: Arc<dyn NotificationPresenter>,
}

impl MessageDispatcher {
    pub fn new(presenter: Arc<dyn NotificationPresenter>) -> Self {
        Self { presenter }
    }

    /// Chooses the presentation path for a message.
    pub fn classify(msg: &InboundMessage) -> Presentation {
        match msg.kind {
            MessageKind::Raw => Presentation::Alert(Alert {
                title: NOTIFICATION_TITLE.to_string(),
                body: msg.body.clone(),
                dismiss_label: "OK".to_string(),
            }),
            MessageKind::Notify => Presentation::Notification(SystemNotification {
                slot: NOTIFICATION_SLOT,
                title: NOTIFICATION_TITLE.to_string(),
                body: msg.body.clone(),
                sound: msg.sound_requested,
                badge: msg.badge_count.filter(|count| *count != 0),
                posted_at: msg.received_at,
                auto_cancel: true,
            }),
        }
    }

    pub fn dispatch(&self, msg: &InboundMessage) -> Presentation {
        let presentation = Self::classify(msg);
        match &presentation {
            Presentation::Alert(_) => debug!("dispatching raw message as alert"),
            Presentation::Notification(n) => {
                debug!(slot = n.slot, sound = n.sound, badge = ?n.badge, "dispatching system notification")
            }
        }
        self.presenter.present(&presentation);
        presentation
    }
}
