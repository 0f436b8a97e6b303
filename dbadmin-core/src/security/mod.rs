//! Credential handling.
//!
//! Passwords are held in `Zeroizing` containers from the moment they leave
//! the configuration file or the terminal prompt, and are cleared on drop.

mod credentials;

pub use credentials::Credentials;
