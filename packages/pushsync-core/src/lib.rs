pub mod config;
pub mod message;
pub mod registration;
pub mod subscription;
pub mod transport;

pub use config::ClientConfig;
pub use message::*;
pub use registration::*;
pub use subscription::*;
pub use transport::*;
