use crate::SdkResult;
use async_trait::async_trait;
use pushsync_core::{DeviceToken, SubscriptionAction, SubscriptionRecord};

/// 推送后端的两个服务契约：设备注册与订阅管理
#[async_trait]
pub trait PushBackend: Send + Sync {
    /// Registers the device token. Safe to repeat with the same token.
    async fn register_device(&self, token: &DeviceToken) -> SdkResult<()>;

    async fn unregister_device(&self, token: &DeviceToken) -> SdkResult<()>;

    /// Fetches and parses the device's subscription list.
    async fn fetch_subscriptions(&self, token: &DeviceToken) -> SdkResult<Vec<SubscriptionRecord>>;

    async fn update_subscription(
        &self,
        name: &str,
        action: SubscriptionAction,
        token: &DeviceToken,
    ) -> SdkResult<()>;
}
