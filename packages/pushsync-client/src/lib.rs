pub mod config;
pub mod dispatcher;
pub mod error;
pub mod event_loop;
pub mod reconciler;
pub mod registration;
pub mod store;
pub mod subscriptions;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{config_from_env, config_from_vars, resolve_store_dir};
pub use dispatcher::{Alert, MessageDispatcher, NotificationPresenter, Presentation, SystemNotification};
pub use error::{ClientError, ClientResult};
pub use event_loop::{handle_event, run_event_loop};
pub use reconciler::SubscriptionReconciler;
pub use registration::RegistrationMachine;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use subscriptions::{SubscriptionList, SubscriptionView};

use pushsync_sdk::{ClientConfig, PushBackend, PushEvent, PushTransport, RegistrationState, SubscriptionRecord};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::warn;

/// 客户端组件的组合：状态机 + 消息分发
pub struct PushClient {
    pub machine: RegistrationMachine,
    pub dispatcher: MessageDispatcher,
}

impl PushClient {
    pub fn new(
        config: &ClientConfig,
        store: Arc<dyn TokenStore>,
        backend: Arc<dyn PushBackend>,
        transport: Arc<dyn PushTransport>,
        view: Arc<dyn SubscriptionView>,
        presenter: Arc<dyn NotificationPresenter>,
    ) -> Self {
        Self {
            machine: RegistrationMachine::new(store, backend, transport, view)
                .with_reregister_on_start(config.reregister_on_start),
            dispatcher: MessageDispatcher::new(presenter),
        }
    }

    pub fn reconciler(&self) -> SubscriptionReconciler {
        self.machine.reconciler()
    }

    /// Starts the state machine and then processes transport events until the
    /// queue closes. A failing start is logged; events are still processed so
    /// a later token delivery can recover.
    pub async fn run(&mut self, events: mpsc::UnboundedReceiver<PushEvent>) -> usize {
        if let Err(e) = self.machine.start().await {
            warn!(error = %e, "registration start failed");
        }
        run_event_loop(events, &mut self.machine, &self.dispatcher).await
    }
}

/// 格式化订阅项显示
pub fn format_subscription(record: &SubscriptionRecord) -> String {
    format!(
        "[{}] {} - {}",
        if record.subscribed { "x" } else { " " },
        record.name,
        record.description
    )
}

/// 格式化注册状态显示
pub fn format_state(state: &RegistrationState) -> String {
    match state {
        RegistrationState::Unregistered => "⚪ Unregistered".to_string(),
        RegistrationState::Pending => "⏳ Waiting for a token from the push transport".to_string(),
        RegistrationState::Registered(token) => format!("✅ Registered ({})", token.redacted()),
        RegistrationState::Failed(reason) => format!("❌ Registration failed: {}", reason),
    }
}
