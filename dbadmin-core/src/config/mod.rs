//! Configuration types.
//!
//! - `ServerConfig`: MySQL server connection file (TOML)
//! - `StoreConfig`: document store connection file (TOML)
//! - `SinkConfig`: per-invocation delivery options built from CLI flags
//!
//! # Security
//! Passwords read from configuration files are moved into
//! [`crate::security::Credentials`] before connecting and are never logged.

mod server;
mod sink;

pub use server::{ServerConfig, StoreConfig};
pub use sink::{FileTarget, MailSettings, SinkConfig, StoreTarget, WriteMode};
