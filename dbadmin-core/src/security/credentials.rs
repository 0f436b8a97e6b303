//! Login container with automatic memory zeroing.

use zeroize::{Zeroize, Zeroizing};

/// MySQL login that zeros its memory on drop.
///
/// `Debug` output never includes the password.
///
/// # Example
///
/// ```rust
/// use dbadmin_core::security::Credentials;
///
/// let creds = Credentials::new("maint".to_string(), Some("secret".to_string()));
/// assert_eq!(creds.username(), "maint");
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Wraps a login; both values are zeroized on drop.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Replaces the password, e.g. with one read from an interactive prompt.
    pub fn with_password(mut self, password: String) -> Self {
        self.password = Zeroizing::new(Some(password));
        self
    }

    /// Login name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Password for the driver's connect options. Never log this.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
