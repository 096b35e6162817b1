use std::fmt;

/// 推送通道为本设备分配的注册令牌
///
/// 令牌只会被整体替换，不会被部分修改。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceToken(String);

impl DeviceToken {
    /// Returns `None` for an empty or whitespace-only token. Any other value
    /// is kept exactly as issued.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 日志中使用的缩短形式
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(8).collect();
        if prefix.len() < self.0.len() {
            format!("{prefix}…")
        } else {
            prefix
        }
    }
}

impl fmt::Display for DeviceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DeviceToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// 推送通道注册失败的分类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportErrorKind {
    ServiceNotAvailable,
    AccountMissing,
    AuthenticationFailed,
    /// Registration quota for this account is exhausted.
    TooManyRegistrations,
    InvalidSender,
    PhoneRegistrationError,
    /// Any code outside the known set, kept verbatim.
    Unknown(String),
}

impl TransportErrorKind {
    /// Classifies a transport error code by exact, case-sensitive match.
    pub fn from_code(code: &str) -> Self {
        match code {
            "SERVICE_NOT_AVAILABLE" => Self::ServiceNotAvailable,
            "ACCOUNT_MISSING" => Self::AccountMissing,
            "AUTHENTICATION_FAILED" => Self::AuthenticationFailed,
            "TOO_MANY_REGISTRATIONS" => Self::TooManyRegistrations,
            "INVALID_SENDER" => Self::InvalidSender,
            "PHONE_REGISTRATION_ERROR" => Self::PhoneRegistrationError,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::ServiceNotAvailable => "SERVICE_NOT_AVAILABLE",
            Self::AccountMissing => "ACCOUNT_MISSING",
            Self::AuthenticationFailed => "AUTHENTICATION_FAILED",
            Self::TooManyRegistrations => "TOO_MANY_REGISTRATIONS",
            Self::InvalidSender => "INVALID_SENDER",
            Self::PhoneRegistrationError => "PHONE_REGISTRATION_ERROR",
            Self::Unknown(code) => code,
        }
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServiceNotAvailable => write!(f, "push service not available"),
            Self::AccountMissing => write!(f, "no account configured on device"),
            Self::AuthenticationFailed => write!(f, "authentication failed"),
            Self::TooManyRegistrations => write!(f, "too many registrations"),
            Self::InvalidSender => write!(f, "invalid sender"),
            Self::PhoneRegistrationError => write!(f, "phone registration error"),
            Self::Unknown(code) => write!(f, "unknown transport error: {code}"),
        }
    }
}

/// `Failed` 状态中保存的失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    Transport(TransportErrorKind),
    Network(String),
    Storage(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Transport(kind) => write!(f, "Transport error: {}", kind),
            FailureReason::Network(message) => write!(f, "Network error: {}", message),
            FailureReason::Storage(message) => write!(f, "Storage error: {}", message),
        }
    }
}

/// 设备注册状态
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RegistrationState {
    #[default]
    Unregistered,
    /// A token was requested from the transport and has not arrived yet.
    Pending,
    Registered(DeviceToken),
    Failed(FailureReason),
}

impl RegistrationState {
    pub fn token(&self) -> Option<&DeviceToken> {
        match self {
            RegistrationState::Registered(token) => Some(token),
            _ => None,
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, RegistrationState::Registered(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            RegistrationState::Unregistered => "unregistered",
            RegistrationState::Pending => "pending",
            RegistrationState::Registered(_) => "registered",
            RegistrationState::Failed(_) => "failed",
        }
    }
}

impl fmt::Display for RegistrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationState::Registered(token) => write!(f, "registered ({})", token.redacted()),
            RegistrationState::Failed(reason) => write!(f, "failed ({})", reason),
            other => f.write_str(other.name()),
        }
    }
}
