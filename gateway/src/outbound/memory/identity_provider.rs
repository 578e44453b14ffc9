//! In-process identity provider.
//!
//! [`MemoryIdentityDirectory`] is the shared account registry; each client
//! gets its own [`MemoryIdentityProvider`] handle with an independent
//! signed-in identity, the way browser tabs share accounts but not sign-in
//! calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;
use zeroize::Zeroizing;

use crate::domain::ports::{AuthError, IdentityProvider};
use crate::domain::{Credentials, Email, Identity, PASSWORD_MIN, UserId};

#[derive(Debug)]
struct Account {
    identity: Identity,
    password: Zeroizing<String>,
}

/// Accounts shared by every client in the process.
#[derive(Debug, Default)]
pub struct MemoryIdentityDirectory {
    accounts: Mutex<HashMap<Email, Account>>,
}

impl MemoryIdentityDirectory {
    /// Empty directory.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Signed-out handle for one client.
    pub fn client(self: &Arc<Self>) -> MemoryIdentityProvider {
        MemoryIdentityProvider {
            directory: Arc::clone(self),
            current: watch::Sender::new(None),
        }
    }

    /// Number of registered accounts.
    pub fn len(&self) -> usize {
        self.accounts().len()
    }

    /// Whether no account is registered.
    pub fn is_empty(&self) -> bool {
        self.accounts().is_empty()
    }

    fn accounts(&self) -> MutexGuard<'_, HashMap<Email, Account>> {
        self.accounts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        if credentials.password().chars().count() < PASSWORD_MIN {
            return Err(AuthError::weak_password(PASSWORD_MIN));
        }
        let mut accounts = self.accounts();
        if accounts.contains_key(credentials.email()) {
            return Err(AuthError::account_exists(credentials.email().as_ref()));
        }
        let identity = Identity::new(UserId::random(), credentials.email().clone());
        accounts.insert(
            credentials.email().clone(),
            Account {
                identity: identity.clone(),
                password: Zeroizing::new(credentials.password().to_owned()),
            },
        );
        Ok(identity)
    }

    fn authenticate(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        self.accounts()
            .get(credentials.email())
            .filter(|account| account.password.as_str() == credentials.password())
            .map(|account| account.identity.clone())
            .ok_or_else(AuthError::invalid_credentials)
    }
}

/// One client's sign-in state.
#[derive(Debug)]
pub struct MemoryIdentityProvider {
    directory: Arc<MemoryIdentityDirectory>,
    current: watch::Sender<Option<Identity>>,
}

impl MemoryIdentityProvider {
    fn publish(&self, identity: Option<Identity>) {
        self.current.send_if_modified(|current| {
            if *current == identity {
                return false;
            }
            *current = identity;
            true
        });
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn create_account(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let identity = self.directory.register(credentials)?;
        debug!(user_id = %identity.id(), "account created");
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let identity = self.directory.authenticate(credentials)?;
        debug!(user_id = %identity.id(), "signed in");
        self.publish(Some(identity.clone()));
        Ok(identity)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.publish(None);
        Ok(())
    }

    fn identity_events(&self) -> watch::Receiver<Option<Identity>> {
        self.current.subscribe()
    }
}
