//! Port for the external identity provider.
//!
//! Each provider handle represents one client's authentication context: it
//! publishes the signed-in identity (or `None` once signed out) on a watch
//! channel that the session store follows.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{Credentials, Identity};

use super::define_port_error;

define_port_error! {
    /// Errors raised by identity provider adapters.
    ///
    /// Messages are human-readable and shown inline next to the form.
    pub enum AuthError {
        /// Email/password pair was rejected.
        InvalidCredentials as Unauthorized => "invalid email or password",
        /// An account already exists for the email.
        AccountExists { email: String } as Conflict =>
            "an account already exists for {email}",
        /// Password shorter than the provider allows.
        WeakPassword { min: usize } as InvalidRequest =>
            "password must be at least {min} characters",
        /// Provider could not be reached.
        Unavailable { message: String } as ServiceUnavailable =>
            "identity provider unavailable: {message}",
    }
}

/// Port for account creation, sign-in and sign-out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Register a new account and sign it in.
    async fn create_account(&self, credentials: &Credentials) -> Result<Identity, AuthError>;

    /// Sign an existing account in.
    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, AuthError>;

    /// Sign the current identity out.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Stream of signed-in identity changes for this client.
    fn identity_events(&self) -> watch::Receiver<Option<Identity>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn errors_render_human_readable_reasons() {
        assert_eq!(
            AuthError::account_exists("ada@example.com").to_string(),
            "an account already exists for ada@example.com"
        );
        assert_eq!(
            AuthError::weak_password(6_usize).to_string(),
            "password must be at least 6 characters"
        );
        assert_eq!(
            AuthError::invalid_credentials().to_string(),
            "invalid email or password"
        );
    }
}
