use pushsync_sdk::SubscriptionRecord;
use std::sync::{Arc, PoisonError, RwLock};

/// 订阅列表的展示端（外部 UI）
pub trait SubscriptionView: Send + Sync {
    fn show_subscriptions(&self, records: &[SubscriptionRecord]);
}

/// The currently displayed subscription list.
///
/// Replaced wholesale after each successful fetch; never merged.
#[derive(Clone, Default)]
pub struct SubscriptionList {
    inner: Arc<RwLock<Vec<SubscriptionRecord>>>,
}

impl SubscriptionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<SubscriptionRecord> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn replace(&self, records: Vec<SubscriptionRecord>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = records;
    }

    pub fn clear(&self) {
        self.replace(Vec::new());
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, name: &str) -> Option<SubscriptionRecord> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|record| record.name == name)
            .cloned()
    }
}
