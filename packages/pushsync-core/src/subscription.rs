use serde::{Deserialize, Serialize};

/// 订阅项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub name: String,
    pub description: String,
    pub subscribed: bool,
}

/// 订阅/取消订阅操作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionAction {
    Subscribe,
    Unsubscribe,
}

impl SubscriptionAction {
    pub fn from_desired(subscribed: bool) -> Self {
        if subscribed {
            SubscriptionAction::Subscribe
        } else {
            SubscriptionAction::Unsubscribe
        }
    }

    /// Path segment used by the subscription endpoint.
    pub fn path_segment(&self) -> &'static str {
        match self {
            SubscriptionAction::Subscribe => "add",
            SubscriptionAction::Unsubscribe => "delete",
        }
    }
}
