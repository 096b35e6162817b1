use crate::error::{ClientError, ClientResult};
use pushsync_sdk::{PushBackend, RegistrationState, SubscriptionAction};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// 将界面上的订阅开关转换为后端调用
///
/// Each toggle is one independent backend call, so clones may be used
/// concurrently with each other and with a running fetch. The displayed list
/// is not updated here; callers that want fresh flags re-fetch through
/// [`RegistrationMachine::refresh_subscriptions`](crate::RegistrationMachine::refresh_subscriptions).
#[derive(Clone)]
pub struct SubscriptionReconciler {
    state: watch::Receiver<RegistrationState>,
    backend: Arc<dyn PushBackend>,
}

impl SubscriptionReconciler {
    pub fn new(state: watch::Receiver<RegistrationState>, backend: Arc<dyn PushBackend>) -> Self {
        Self { state, backend }
    }

    pub async fn on_toggle(&self, name: &str, desired_subscribed: bool) -> ClientResult<()> {
        let token = {
            let state = self.state.borrow();
            state.token().cloned().ok_or_else(|| {
                ClientError::InvalidState(format!(
                    "toggling '{name}' requires a registered device (state: {})",
                    state.name()
                ))
            })?
        };
        if name.trim().is_empty() {
            return Err(ClientError::InvalidArgument(
                "subscription name must not be empty".to_string(),
            ));
        }

        let action = SubscriptionAction::from_desired(desired_subscribed);
        self.backend.update_subscription(name, action, &token).await?;
        info!(subscription = name, action = action.path_segment(), "subscription updated");
        Ok(())
    }
}
