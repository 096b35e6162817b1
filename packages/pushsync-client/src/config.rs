use crate::error::{ClientError, ClientResult};
use pushsync_sdk::ClientConfig;
use std::path::PathBuf;

pub const ENV_REG_URL: &str = "PUSHSYNC_REG_URL";
pub const ENV_SUB_URL: &str = "PUSHSYNC_SUB_URL";
pub const ENV_TRANSPORT_URL: &str = "PUSHSYNC_TRANSPORT_URL";
pub const ENV_SENDER: &str = "PUSHSYNC_SENDER";
pub const ENV_TIMEOUT_SECS: &str = "PUSHSYNC_TIMEOUT_SECS";
pub const ENV_STORE_DIR: &str = "PUSHSYNC_STORE_DIR";
pub const ENV_REREGISTER: &str = "PUSHSYNC_REREGISTER";

/// 从环境变量读取配置，未设置的项使用默认值
pub fn config_from_env() -> ClientResult<ClientConfig> {
    config_from_vars(|key| std::env::var(key).ok())
}

pub fn config_from_vars<F>(lookup: F) -> ClientResult<ClientConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ClientConfig::default();

    if let Some(url) = lookup(ENV_REG_URL) {
        config.registration_url = url;
    }
    if let Some(url) = lookup(ENV_SUB_URL) {
        config.subscription_url = url;
    }
    if let Some(url) = lookup(ENV_TRANSPORT_URL) {
        config.transport_url = url;
    }
    if let Some(sender) = lookup(ENV_SENDER) {
        config.sender_id = sender;
    }
    if let Some(text) = lookup(ENV_TIMEOUT_SECS) {
        config.timeout_seconds = parse_timeout(&text)?;
    }
    if let Some(dir) = lookup(ENV_STORE_DIR) {
        config.store_dir = Some(PathBuf::from(dir));
    }
    if let Some(text) = lookup(ENV_REREGISTER) {
        config.reregister_on_start = parse_flag(ENV_REREGISTER, &text)?;
    }

    Ok(config)
}

pub fn parse_timeout(text: &str) -> ClientResult<u64> {
    match text.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ClientError::Config(format!(
            "invalid {ENV_TIMEOUT_SECS}: {text} (expected a positive number of seconds)"
        ))),
        Ok(secs) => Ok(secs),
    }
}

fn parse_flag(key: &str, text: &str) -> ClientResult<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ClientError::Config(format!("invalid {key}: {text}"))),
    }
}

/// Directory of the token preferences file.
pub fn resolve_store_dir(config: &ClientConfig) -> PathBuf {
    config
        .store_dir
        .clone()
        .or_else(|| dirs::data_local_dir().map(|dir| dir.join("pushsync")))
        .unwrap_or_else(|| PathBuf::from(".pushsync"))
}
