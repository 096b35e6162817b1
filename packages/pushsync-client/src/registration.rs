use crate::error::{ClientError, ClientResult};
use crate::reconciler::SubscriptionReconciler;
use crate::store::TokenStore;
use crate::subscriptions::{SubscriptionList, SubscriptionView};
use pushsync_sdk::{
    DeviceToken, FailureReason, PushBackend, PushTransport, RegistrationState, TransportErrorKind,
};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 设备注册状态机
///
/// Owns the [`RegistrationState`]. Every transition takes `&mut self`, so a
/// fetch started by one transition finishes before the next transition can
/// begin. Collaborators observe the state through [`watch`] receivers.
pub struct RegistrationMachine {
    state: watch::Sender<RegistrationState>,
    store: Arc<dyn TokenStore>,
    backend: Arc<dyn PushBackend>,
    transport: Arc<dyn PushTransport>,
    view: Arc<dyn SubscriptionView>,
    subscriptions: SubscriptionList,
    reregister_on_start: bool,
}

impl RegistrationMachine {
    pub fn new(
        store: Arc<dyn TokenStore>,
        backend: Arc<dyn PushBackend>,
        transport: Arc<dyn PushTransport>,
        view: Arc<dyn SubscriptionView>,
    ) -> Self {
        let (state, _) = watch::channel(RegistrationState::Unregistered);
        Self {
            state,
            store,
            backend,
            transport,
            view,
            subscriptions: SubscriptionList::new(),
            reregister_on_start: false,
        }
    }

    pub fn with_reregister_on_start(mut self, reregister: bool) -> Self {
        self.reregister_on_start = reregister;
        self
    }

    pub fn state(&self) -> RegistrationState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<RegistrationState> {
        self.state.subscribe()
    }

    /// Handle to the displayed subscription list.
    pub fn subscriptions(&self) -> SubscriptionList {
        self.subscriptions.clone()
    }

    pub fn reconciler(&self) -> SubscriptionReconciler {
        SubscriptionReconciler::new(self.watch_state(), Arc::clone(&self.backend))
    }

    /// Rebuilds the state from the token store.
    ///
    /// A stored token re-enters `Registered` directly (or re-registers first
    /// when configured to); no token, or an unreadable store, requests a fresh
    /// token from the transport.
    pub async fn start(&mut self) -> ClientResult<()> {
        match self.store.get() {
            Ok(Some(token)) => {
                info!(token = %token.redacted(), "restored device token");
                if self.reregister_on_start {
                    self.register(token).await
                } else {
                    self.enter_registered(token).await
                }
            }
            Ok(None) => {
                debug!("no stored device token");
                self.request_token()
            }
            Err(e) => {
                warn!(error = %e, "token store unavailable, treating device as unregistered");
                self.request_token()
            }
        }
    }

    /// A token delivered by the transport. Accepted in any state; the new
    /// token supersedes whatever was stored before.
    pub async fn handle_token(&mut self, token: DeviceToken) -> ClientResult<()> {
        info!(token = %token.redacted(), "transport issued device token");
        if let Err(e) = self.store.set(&token) {
            warn!(error = %e, "failed to persist device token");
            self.set_state(RegistrationState::Failed(FailureReason::Storage(e.to_string())));
            return Err(e);
        }
        self.register(token).await
    }

    /// A registration error delivered by the transport. Nothing is persisted.
    pub fn handle_transport_error(&mut self, kind: TransportErrorKind) -> ClientResult<()> {
        warn!(code = kind.code(), "transport registration failed");
        if self.state.borrow().is_registered() {
            // a late error must not knock out a working registration
            debug!("ignoring transport error while registered");
        } else {
            self.set_state(RegistrationState::Failed(FailureReason::Transport(kind.clone())));
        }
        Err(ClientError::Transport(kind))
    }

    /// The transport stopped routing messages to this device.
    pub fn handle_unregistered(&mut self) -> ClientResult<()> {
        info!("device unregistered by transport");
        self.subscriptions.clear();
        self.view.show_subscriptions(&[]);
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "failed to clear device token");
            self.set_state(RegistrationState::Failed(FailureReason::Storage(e.to_string())));
            return Err(e);
        }
        self.set_state(RegistrationState::Unregistered);
        Ok(())
    }

    /// User-initiated unregistration from the backend.
    pub async fn unregister(&mut self) -> ClientResult<()> {
        let token = self.require_registered("unregister")?;
        self.backend.unregister_device(&token).await?;
        info!(token = %token.redacted(), "device unregistered from backend");
        self.handle_unregistered()
    }

    /// Re-runs the registration flow.
    ///
    /// With a stored token the register call is repeated; without one a new
    /// token is requested. Not allowed while a token request is outstanding.
    pub async fn retry(&mut self) -> ClientResult<()> {
        let state = self.state();
        if let RegistrationState::Pending = state {
            return Err(ClientError::InvalidState(
                "a token request is already pending".to_string(),
            ));
        }
        if let RegistrationState::Registered(token) = state {
            return self.register(token).await;
        }

        match self.store.get() {
            Ok(Some(token)) => self.register(token).await,
            Ok(None) => self.request_token(),
            Err(e) => {
                warn!(error = %e, "token store unavailable, requesting a new token");
                self.request_token()
            }
        }
    }

    /// Fetches the subscription list again for the registered token.
    pub async fn refresh_subscriptions(&mut self) -> ClientResult<()> {
        let token = self.require_registered("refresh subscriptions")?;
        self.fetch_subscriptions(&token).await
    }

    fn request_token(&mut self) -> ClientResult<()> {
        match self.transport.request_token() {
            Ok(()) => {
                self.set_state(RegistrationState::Pending);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "failed to request device token");
                let kind = TransportErrorKind::ServiceNotAvailable;
                self.set_state(RegistrationState::Failed(FailureReason::Transport(kind.clone())));
                Err(ClientError::Transport(kind))
            }
        }
    }

    async fn register(&mut self, token: DeviceToken) -> ClientResult<()> {
        match self.backend.register_device(&token).await {
            Ok(()) => {
                info!(token = %token.redacted(), "device registered with backend");
                self.enter_registered(token).await
            }
            Err(e) => {
                let err = ClientError::from(e);
                warn!(error = %err, "device registration failed, token kept for retry");
                self.set_state(RegistrationState::Failed(FailureReason::Network(err.to_string())));
                Err(err)
            }
        }
    }

    async fn enter_registered(&mut self, token: DeviceToken) -> ClientResult<()> {
        self.set_state(RegistrationState::Registered(token.clone()));
        self.fetch_subscriptions(&token).await
    }

    async fn fetch_subscriptions(&mut self, token: &DeviceToken) -> ClientResult<()> {
        match self.backend.fetch_subscriptions(token).await {
            Ok(records) => {
                info!(count = records.len(), "subscription list updated");
                self.view.show_subscriptions(&records);
                self.subscriptions.replace(records);
                Ok(())
            }
            Err(e) => {
                let err = ClientError::from(e);
                warn!(error = %err, "subscription fetch failed, keeping previous list");
                Err(err)
            }
        }
    }

    fn require_registered(&self, operation: &str) -> ClientResult<DeviceToken> {
        let state = self.state.borrow();
        state.token().cloned().ok_or_else(|| {
            ClientError::InvalidState(format!(
                "{operation} requires a registered device (state: {})",
                state.name()
            ))
        })
    }

    fn set_state(&self, next: RegistrationState) {
        let to = next.name();
        let previous = self.state.send_replace(next);
        debug!(from = previous.name(), to, "registration state changed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;
    use crate::testing::*;
    use std::sync::atomic::Ordering;

    struct Harness {
        machine: RegistrationMachine,
        store: Arc<MemoryTokenStore>,
        backend: Arc<FakeBackend>,
        transport: Arc<FakeTransport>,
        view: Arc<RecordingView>,
    }

    fn harness(store: MemoryTokenStore) -> Harness {
        let store = Arc::new(store);
        let backend = Arc::new(FakeBackend::with_subscriptions(vec![
            record("Weather", true),
            record("News", false),
        ]));
        let transport = Arc::new(FakeTransport::default());
        let view = Arc::new(RecordingView::default());
        let machine = RegistrationMachine::new(
            store.clone(),
            backend.clone(),
            transport.clone(),
            view.clone(),
        );
        Harness {
            machine,
            store,
            backend,
            transport,
            view,
        }
    }

    #[tokio::test]
    async fn test_start_without_token_requests_one() {
        let mut h = harness(MemoryTokenStore::new());
        h.machine.start().await.unwrap();

        assert_eq!(h.machine.state(), RegistrationState::Pending);
        assert_eq!(h.transport.requests(), 1);
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_token_delivery_registers_and_fetches() {
        let mut h = harness(MemoryTokenStore::new());
        h.machine.start().await.unwrap();
        h.machine.handle_token(token("tok-1")).await.unwrap();

        assert_eq!(h.machine.state(), RegistrationState::Registered(token("tok-1")));
        assert_eq!(h.store.get().unwrap(), Some(token("tok-1")));
        assert_eq!(h.backend.calls(), vec!["register:tok-1", "fetch:tok-1"]);
        assert_eq!(h.machine.subscriptions().len(), 2);
        assert_eq!(h.view.shown().len(), 1);
        assert_eq!(h.view.shown()[0][0], record("Weather", true));
    }

    #[tokio::test]
    async fn test_register_failure_keeps_token() {
        let mut h = harness(MemoryTokenStore::new());
        h.backend.fail_register.store(true, Ordering::SeqCst);
        h.machine.start().await.unwrap();

        let err = h.machine.handle_token(token("tok-1")).await.unwrap_err();
        assert!(matches!(err, ClientError::Network(_)));
        assert!(matches!(
            h.machine.state(),
            RegistrationState::Failed(FailureReason::Network(_))
        ));
        assert_eq!(h.store.get().unwrap(), Some(token("tok-1")));
        assert_eq!(h.backend.calls(), vec!["register:tok-1"]);

        // retry reuses the stored token without asking the transport again
        h.backend.fail_register.store(false, Ordering::SeqCst);
        h.machine.retry().await.unwrap();
        assert_eq!(h.machine.state(), RegistrationState::Registered(token("tok-1")));
        assert_eq!(h.transport.requests(), 1);
    }

    #[tokio::test]
    async fn test_authentication_failed_while_pending() {
        let mut h = harness(MemoryTokenStore::new());
        h.machine.start().await.unwrap();

        let err = h
            .machine
            .handle_transport_error(TransportErrorKind::from_code("AUTHENTICATION_FAILED"))
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportErrorKind::AuthenticationFailed)
        ));
        assert_eq!(
            h.machine.state(),
            RegistrationState::Failed(FailureReason::Transport(
                TransportErrorKind::AuthenticationFailed
            ))
        );
        assert_eq!(h.store.get().unwrap(), None);
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_while_registered_keeps_registration() {
        let mut h = harness(MemoryTokenStore::with_token(token("tok-1")));
        h.machine.start().await.unwrap();

        let result = h
            .machine
            .handle_transport_error(TransportErrorKind::ServiceNotAvailable);
        assert!(result.is_err());
        assert_eq!(h.machine.state(), RegistrationState::Registered(token("tok-1")));
    }

    #[tokio::test]
    async fn test_restart_with_token_skips_register() {
        let mut h = harness(MemoryTokenStore::with_token(token("tok-1")));
        h.machine.start().await.unwrap();

        assert_eq!(h.machine.state(), RegistrationState::Registered(token("tok-1")));
        assert_eq!(h.backend.calls(), vec!["fetch:tok-1"]);
        assert_eq!(h.transport.requests(), 0);
    }

    #[tokio::test]
    async fn test_restart_with_reregister_on_start() {
        let h = harness(MemoryTokenStore::with_token(token("tok-1")));
        let mut machine = h.machine.with_reregister_on_start(true);
        machine.start().await.unwrap();

        assert_eq!(machine.state(), RegistrationState::Registered(token("tok-1")));
        assert_eq!(h.backend.calls(), vec!["register:tok-1", "fetch:tok-1"]);
    }

    #[tokio::test]
    async fn test_register_twice_is_idempotent() {
        let mut h = harness(MemoryTokenStore::new());
        h.machine.handle_token(token("tok-1")).await.unwrap();
        let after_once = h.backend.registered();

        h.machine.handle_token(token("tok-1")).await.unwrap();
        assert_eq!(h.backend.registered(), after_once);
        assert_eq!(h.machine.state(), RegistrationState::Registered(token("tok-1")));
    }

    #[tokio::test]
    async fn test_new_token_supersedes_old() {
        let mut h = harness(MemoryTokenStore::with_token(token("old")));
        h.machine.start().await.unwrap();
        h.machine.handle_token(token("new")).await.unwrap();

        assert_eq!(h.store.get().unwrap(), Some(token("new")));
        assert_eq!(h.machine.state().token(), Some(&token("new")));
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_list() {
        let mut h = harness(MemoryTokenStore::with_token(token("tok-1")));
        h.machine.start().await.unwrap();
        let before = h.machine.subscriptions().snapshot();

        h.backend.set_subscriptions(vec![record("Sports", true)]);
        h.backend.fail_fetch.store(true, Ordering::SeqCst);
        let err = h.machine.refresh_subscriptions().await.unwrap_err();

        assert!(matches!(err, ClientError::Network(_)));
        assert_eq!(h.machine.subscriptions().snapshot(), before);
        assert_eq!(h.view.shown().len(), 1);
        assert!(h.machine.state().is_registered());
    }

    #[tokio::test]
    async fn test_malformed_fetch_is_parse_error() {
        let mut h = harness(MemoryTokenStore::new());
        h.backend.malformed_fetch.store(true, Ordering::SeqCst);

        let err = h.machine.handle_token(token("tok-1")).await.unwrap_err();
        assert!(matches!(err, ClientError::Parse(_)));
        assert_eq!(h.machine.state(), RegistrationState::Registered(token("tok-1")));
        assert!(h.machine.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_replaces_list() {
        let mut h = harness(MemoryTokenStore::with_token(token("tok-1")));
        h.machine.start().await.unwrap();

        h.backend.set_subscriptions(vec![record("Sports", true)]);
        h.machine.refresh_subscriptions().await.unwrap();
        assert_eq!(h.machine.subscriptions().snapshot(), vec![record("Sports", true)]);
    }

    #[tokio::test]
    async fn test_refresh_requires_registration() {
        let mut h = harness(MemoryTokenStore::new());
        let err = h.machine.refresh_subscriptions().await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transport_unregistered_clears_token() {
        let mut h = harness(MemoryTokenStore::with_token(token("tok-1")));
        h.machine.start().await.unwrap();
        h.machine.handle_unregistered().unwrap();

        assert_eq!(h.machine.state(), RegistrationState::Unregistered);
        assert_eq!(h.store.get().unwrap(), None);
        assert!(h.machine.subscriptions().is_empty());
        assert_eq!(h.view.shown().last(), Some(&Vec::new()));
    }

    #[tokio::test]
    async fn test_unregister_calls_backend() {
        let mut h = harness(MemoryTokenStore::new());
        h.machine.handle_token(token("tok-1")).await.unwrap();
        h.machine.unregister().await.unwrap();

        assert!(h.backend.calls().contains(&"unregister:tok-1".to_string()));
        assert!(h.backend.registered().is_empty());
        assert_eq!(h.machine.state(), RegistrationState::Unregistered);
        assert_eq!(h.store.get().unwrap(), None);
    }

    #[tokio::test]
    async fn test_retry_while_pending_is_invalid() {
        let mut h = harness(MemoryTokenStore::new());
        h.machine.start().await.unwrap();
        let err = h.machine.retry().await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
        assert_eq!(h.transport.requests(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_transport_error_requests_new_token() {
        let mut h = harness(MemoryTokenStore::new());
        h.machine.start().await.unwrap();
        let _ = h
            .machine
            .handle_transport_error(TransportErrorKind::ServiceNotAvailable);

        h.machine.retry().await.unwrap();
        assert_eq!(h.machine.state(), RegistrationState::Pending);
        assert_eq!(h.transport.requests(), 2);
    }

    #[tokio::test]
    async fn test_transport_request_failure() {
        let mut h = harness(MemoryTokenStore::new());
        h.transport.fail.store(true, Ordering::SeqCst);

        let err = h.machine.start().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportErrorKind::ServiceNotAvailable)
        ));
        assert!(matches!(h.machine.state(), RegistrationState::Failed(_)));
    }

    #[tokio::test]
    async fn test_broken_store_on_start_requests_token() {
        let backend = Arc::new(FakeBackend::default());
        let transport = Arc::new(FakeTransport::default());
        let mut machine = RegistrationMachine::new(
            Arc::new(BrokenStore),
            backend.clone(),
            transport.clone(),
            Arc::new(RecordingView::default()),
        );

        machine.start().await.unwrap();
        assert_eq!(machine.state(), RegistrationState::Pending);
        assert_eq!(transport.requests(), 1);

        let err = machine.handle_token(token("tok-1")).await.unwrap_err();
        assert!(matches!(err, ClientError::Storage(_)));
        assert!(matches!(
            machine.state(),
            RegistrationState::Failed(FailureReason::Storage(_))
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_state_is_observable() {
        let mut h = harness(MemoryTokenStore::new());
        let mut rx = h.machine.watch_state();
        h.machine.start().await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), RegistrationState::Pending);
    }
}
