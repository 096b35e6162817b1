use crate::backend::PushBackend;
use crate::error::*;
use crate::parser::parse_subscriptions;
use crate::SdkResult;
use async_trait::async_trait;
use pushsync_core::*;
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Clone)]
pub struct PushServiceClient {
    client: Client,
    pub registration_url: Url,
    pub subscription_url: Url,
    pub timeout: Duration,
}

impl PushServiceClient {
    pub fn new(registration_url: &str, subscription_url: &str) -> SdkResult<Self> {
        Ok(Self {
            client: Client::new(),
            registration_url: Url::parse(registration_url.trim_end_matches('/'))?,
            subscription_url: Url::parse(subscription_url.trim_end_matches('/'))?,
            timeout: Duration::from_secs(30),
        })
    }

    pub fn from_config(config: &ClientConfig) -> SdkResult<Self> {
        Ok(Self::new(&config.registration_url, &config.subscription_url)?
            .with_timeout(config.timeout()))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Performs a single request and returns the response body.
    ///
    /// Non-2xx answers are errors. No retry is attempted.
    pub async fn call(&self, method: Method, url: Url) -> SdkResult<String> {
        debug!(%method, path = url.path(), "backend call");
        let response = self
            .client
            .request(method, url)
            .timeout(self.timeout)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SdkError::StatusError(status));
        }
        Ok(response.text().await?)
    }

    pub fn register_url(&self, token: &DeviceToken) -> SdkResult<Url> {
        endpoint(&self.registration_url, &["register", token.as_str()])
    }

    pub fn unregister_url(&self, token: &DeviceToken) -> SdkResult<Url> {
        endpoint(&self.registration_url, &["unregister", token.as_str()])
    }

    pub fn subscriptions_url(&self, token: &DeviceToken) -> SdkResult<Url> {
        endpoint(&self.subscription_url, &["subs", token.as_str()])
    }

    pub fn subscription_action_url(
        &self,
        name: &str,
        action: SubscriptionAction,
        token: &DeviceToken,
    ) -> SdkResult<Url> {
        endpoint(
            &self.subscription_url,
            &["sub", action.path_segment(), name, token.as_str()],
        )
    }
}

// 每个参数作为单独的路径段追加，特殊字符会被转义
fn endpoint(base: &Url, segments: &[&str]) -> SdkResult<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SdkError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

#[async_trait]
impl PushBackend for PushServiceClient {
    async fn register_device(&self, token: &DeviceToken) -> SdkResult<()> {
        let url = self.register_url(token)?;
        self.call(Method::POST, url).await?;
        Ok(())
    }

    async fn unregister_device(&self, token: &DeviceToken) -> SdkResult<()> {
        let url = self.unregister_url(token)?;
        self.call(Method::POST, url).await?;
        Ok(())
    }

    async fn fetch_subscriptions(&self, token: &DeviceToken) -> SdkResult<Vec<SubscriptionRecord>> {
        let url = self.subscriptions_url(token)?;
        let body = self.call(Method::GET, url).await?;
        Ok(parse_subscriptions(&body)?)
    }

    async fn update_subscription(
        &self,
        name: &str,
        action: SubscriptionAction,
        token: &DeviceToken,
    ) -> SdkResult<()> {
        let url = self.subscription_action_url(name, action, token)?;
        self.call(Method::POST, url).await?;
        Ok(())
    }
}
