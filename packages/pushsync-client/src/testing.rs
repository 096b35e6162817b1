//! In-memory collaborators shared by the unit tests.

use crate::dispatcher::{NotificationPresenter, Presentation};
use crate::error::{ClientError, ClientResult};
use crate::store::TokenStore;
use crate::subscriptions::SubscriptionView;
use async_trait::async_trait;
use pushsync_sdk::{
    DeviceToken, ParseError, PushBackend, PushTransport, SdkError, SdkResult, SubscriptionAction,
    SubscriptionRecord,
};
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

pub(crate) fn token(value: &str) -> DeviceToken {
    DeviceToken::new(value).unwrap()
}

pub(crate) fn record(name: &str, subscribed: bool) -> SubscriptionRecord {
    SubscriptionRecord {
        name: name.to_string(),
        description: format!("{name} alerts"),
        subscribed,
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    calls: Mutex<Vec<String>>,
    registered: Mutex<BTreeSet<String>>,
    subscriptions: Mutex<Vec<SubscriptionRecord>>,
    pub(crate) fail_register: AtomicBool,
    pub(crate) fail_fetch: AtomicBool,
    pub(crate) malformed_fetch: AtomicBool,
    pub(crate) fail_update: AtomicBool,
}

impl FakeBackend {
    pub(crate) fn with_subscriptions(records: Vec<SubscriptionRecord>) -> Self {
        let backend = Self::default();
        *backend.subscriptions.lock().unwrap() = records;
        backend
    }

    pub(crate) fn set_subscriptions(&self, records: Vec<SubscriptionRecord>) {
        *self.subscriptions.lock().unwrap() = records;
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Tokens the backend currently considers registered.
    pub(crate) fn registered(&self) -> BTreeSet<String> {
        self.registered.lock().unwrap().clone()
    }

    fn record_call(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PushBackend for FakeBackend {
    async fn register_device(&self, token: &DeviceToken) -> SdkResult<()> {
        self.record_call(format!("register:{token}"));
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(SdkError::NetworkError("connection refused".to_string()));
        }
        self.registered.lock().unwrap().insert(token.to_string());
        Ok(())
    }

    async fn unregister_device(&self, token: &DeviceToken) -> SdkResult<()> {
        self.record_call(format!("unregister:{token}"));
        self.registered.lock().unwrap().remove(token.as_str());
        Ok(())
    }

    async fn fetch_subscriptions(&self, token: &DeviceToken) -> SdkResult<Vec<SubscriptionRecord>> {
        self.record_call(format!("fetch:{token}"));
        if self.fail_fetch.load(Ordering::SeqCst) {
            return Err(SdkError::NetworkError("timed out".to_string()));
        }
        if self.malformed_fetch.load(Ordering::SeqCst) {
            return Err(SdkError::ParseError(ParseError::Malformed("unexpected end".to_string())));
        }
        Ok(self.subscriptions.lock().unwrap().clone())
    }

    async fn update_subscription(
        &self,
        name: &str,
        action: SubscriptionAction,
        token: &DeviceToken,
    ) -> SdkResult<()> {
        self.record_call(format!("{}:{name}:{token}", action.path_segment()));
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(SdkError::NetworkError("connection reset".to_string()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeTransport {
    requests: AtomicUsize,
    pub(crate) fail: AtomicBool,
}

impl FakeTransport {
    pub(crate) fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl PushTransport for FakeTransport {
    fn request_token(&self) -> SdkResult<()> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(SdkError::NetworkError("transport closed".to_string()));
        }
        Ok(())
    }
}

/// Token store whose every operation fails.
pub(crate) struct BrokenStore;

impl TokenStore for BrokenStore {
    fn get(&self) -> ClientResult<Option<DeviceToken>> {
        Err(ClientError::Storage("disk unavailable".to_string()))
    }

    fn set(&self, _token: &DeviceToken) -> ClientResult<()> {
        Err(ClientError::Storage("disk unavailable".to_string()))
    }

    fn clear(&self) -> ClientResult<()> {
        Err(ClientError::Storage("disk unavailable".to_string()))
    }
}

#[derive(Default)]
pub(crate) struct RecordingView {
    shown: Mutex<Vec<Vec<SubscriptionRecord>>>,
}

impl RecordingView {
    pub(crate) fn shown(&self) -> Vec<Vec<SubscriptionRecord>> {
        self.shown.lock().unwrap().clone()
    }
}

impl SubscriptionView for RecordingView {
    fn show_subscriptions(&self, records: &[SubscriptionRecord]) {
        self.shown.lock().unwrap().push(records.to_vec());
    }
}

#[derive(Default)]
pub(crate) struct RecordingPresenter {
    presented: Mutex<Vec<Presentation>>,
}

impl RecordingPresenter {
    pub(crate) fn presented(&self) -> Vec<Presentation> {
        self.presented.lock().unwrap().clone()
    }
}

impl NotificationPresenter for RecordingPresenter {
    fn present(&self, presentation: &Presentation) {
        self.presented.lock().unwrap().push(presentation.clone());
    }
}
