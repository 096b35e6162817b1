pub mod backend;
pub mod client;
pub mod error;
pub mod parser;
pub mod transport;

pub use backend::PushBackend;
pub use client::PushServiceClient;
pub use error::{SdkError, SdkResult};
pub use parser::{ParseError, parse_subscriptions};
pub use pushsync_core::*;
pub use transport::{PushTransport, WebSocketTransport};
