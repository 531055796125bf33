pub mod bulk;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod export;
pub mod import;
pub mod login;
pub mod request;
pub mod server;
pub mod session;
pub mod transport;
pub mod types;

#[cfg(test)]
mod test_support;

pub use bulk::{BulkEvent, BulkOperation, BulkOutcome, BulkState};
pub use client::RelationClient;
pub use config::{ClientConfig, Settings};
pub use credential::CredentialBundle;
pub use error::{Error, Result};
pub use session::{Session, WreqTransport};
pub use transport::{ApiRequest, Method, RawResponse, Transport};
pub use types::{RelationAction, RelationRecord, UserInfo};
