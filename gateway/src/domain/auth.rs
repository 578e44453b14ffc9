//! Authentication primitives such as sign-in credentials.
//!
//! Keep raw form input parsing outside the domain by exposing constructors
//! that validate string inputs before a caller talks to the identity
//! provider.

use zeroize::Zeroizing;

use crate::domain::identity::{Email, IdentityValidationError};

/// Minimum password length accepted when creating an account.
pub const PASSWORD_MIN: usize = 6;

/// Domain error returned when credential values are invalid.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CredentialsValidationError {
    /// Email was missing or malformed.
    #[error(transparent)]
    Email(#[from] IdentityValidationError),
    /// Password was blank.
    #[error("password must not be empty")]
    EmptyPassword,
}

/// Validated email/password credentials used by the identity provider.
///
/// ## Invariants
/// - `email` is normalised by [`Email::new`].
/// - `password` is required to be non-empty but retains caller-provided
///   whitespace to avoid surprising credential comparisons.
///
/// # Examples
/// ```
/// use gateway::domain::Credentials;
///
/// let creds = Credentials::try_from_parts("ada@example.com", "hunter22").unwrap();
/// assert_eq!(creds.email().as_ref(), "ada@example.com");
/// assert_eq!(creds.password(), "hunter22");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    email: Email,
    password: Zeroizing<String>,
}

impl Credentials {
    /// Construct credentials from raw email/password inputs.
    pub fn try_from_parts(email: &str, password: &str) -> Result<Self, CredentialsValidationError> {
        let email = Email::new(email)?;
        if password.is_empty() {
            return Err(CredentialsValidationError::EmptyPassword);
        }

        Ok(Self {
            email,
            password: Zeroizing::new(password.to_owned()),
        })
    }

    /// Normalised account email.
    pub fn email(&self) -> &Email {
        &self.email
    }

    /// Password string provided by the caller.
    pub fn password(&self) -> &str {
        self.password.as_str()
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "pw", CredentialsValidationError::Email(IdentityValidationError::EmptyEmail))]
    #[case("   ", "pw", CredentialsValidationError::Email(IdentityValidationError::EmptyEmail))]
    #[case("nobody", "pw", CredentialsValidationError::Email(IdentityValidationError::InvalidEmail))]
    #[case("ada@example.com", "", CredentialsValidationError::EmptyPassword)]
    fn invalid_credentials(
        #[case] email: &str,
        #[case] password: &str,
        #[case] expected: CredentialsValidationError,
    ) {
        let err = Credentials::try_from_parts(email, password)
            .expect_err("invalid inputs must fail");
        assert_eq!(err, expected);
    }

    #[rstest]
    #[case("  ada@example.com  ", "secret")]
    #[case("grace@example.org", "correct horse battery staple")]
    fn valid_credentials_keep_password_verbatim(#[case] email: &str, #[case] password: &str) {
        let creds = Credentials::try_from_parts(email, password)
            .expect("valid inputs should succeed");
        assert_eq!(creds.email().as_ref(), email.trim());
        assert_eq!(creds.password(), password);
    }
}
