//! Per-client session state.
//!
//! [`SessionStore`] follows the identity provider's sign-in stream and the
//! signed-in member's profile feed, publishing one [`SessionState`] snapshot
//! per change. Route gating and the client adapter observe the snapshots; they
//! never poll.

use std::future::pending;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::ports::{AuthError, IdentityProvider, ProfileRepository};
use crate::domain::route::{Access, View, resolve_view};
use crate::domain::{Credentials, Identity, Profile};

/// Snapshot of who is signed in and what their membership looks like.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    identity: Option<Identity>,
    profile: Option<Profile>,
    resolving: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::resolving(None)
    }
}

impl SessionState {
    fn resolving(identity: Option<Identity>) -> Self {
        Self {
            identity,
            profile: None,
            resolving: true,
        }
    }

    fn signed_out() -> Self {
        Self::settled(None, None)
    }

    /// A resolved snapshot.
    pub fn settled(identity: Option<Identity>, profile: Option<Profile>) -> Self {
        Self {
            identity,
            profile,
            resolving: false,
        }
    }

    /// Signed-in identity.
    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    /// Signed-in member's profile, once loaded.
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Whether the identity or profile is still loading.
    pub fn is_resolving(&self) -> bool {
        self.resolving
    }

    /// Whether the signed-in member is active.
    pub fn is_active(&self) -> bool {
        self.profile.as_ref().is_some_and(Profile::is_active)
    }

    /// Access level; `None` while resolving.
    pub fn access(&self) -> Option<Access> {
        if self.resolving {
            return None;
        }
        Some(match (&self.identity, self.is_active()) {
            (None, _) => Access::Anonymous,
            (Some(_), false) => Access::Pending,
            (Some(_), true) => Access::Member,
        })
    }

    /// View shown for `requested`; requests pass through while resolving.
    pub fn route(&self, requested: View) -> View {
        self.access()
            .map_or(requested, |access| resolve_view(access, requested))
    }

    fn is_settled_as(&self, identity: &Identity) -> bool {
        !self.resolving && self.identity.as_ref().map(Identity::id) == Some(identity.id())
    }
}

/// Session store for one client.
///
/// Dropping the store stops following the identity and profile feeds.
pub struct SessionStore {
    identity: Arc<dyn IdentityProvider>,
    state: Arc<watch::Sender<SessionState>>,
    task: JoinHandle<()>,
}

impl SessionStore {
    /// Start following `identity` and `profiles`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(identity: Arc<dyn IdentityProvider>, profiles: Arc<dyn ProfileRepository>) -> Self {
        let state = Arc::new(watch::Sender::new(SessionState::default()));
        let task = tokio::spawn(follow(
            identity.identity_events(),
            profiles,
            Arc::clone(&state),
        ));
        Self {
            identity,
            state,
            task,
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Subscribe to snapshots.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Sign in and wait until the session reflects the identity.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let identity = self.identity.sign_in(credentials).await?;
        self.settle(|state| state.is_settled_as(&identity)).await?;
        Ok(identity)
    }

    /// Create an account and wait until the session reflects it.
    pub async fn create_account(&self, credentials: &Credentials) -> Result<Identity, AuthError> {
        let identity = self.identity.create_account(credentials).await?;
        self.settle(|state| state.is_settled_as(&identity)).await?;
        Ok(identity)
    }

    /// Sign out and wait until identity and profile are cleared.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        self.identity.sign_out().await?;
        self.settle(|state| !state.resolving && state.identity.is_none())
            .await
    }

    /// Wait for the first settled snapshot.
    pub async fn settled(&self) -> SessionState {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|state| !state.resolving).await {
            Ok(state) => state.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Mirror a profile written by this client.
    ///
    /// Ignored when the profile belongs to someone else or when the feed has
    /// already delivered an active profile.
    pub fn mirror_profile(&self, profile: Profile) {
        self.state.send_if_modified(|state| {
            let owns = state.identity.as_ref().map(Identity::id) == Some(profile.user_id());
            if !owns || state.is_active() {
                return false;
            }
            state.profile = Some(profile);
            true
        });
    }

    async fn settle(&self, ready: impl FnMut(&SessionState) -> bool) -> Result<(), AuthError> {
        let mut rx = self.state.subscribe();
        rx.wait_for(ready)
            .await
            .map(|_| ())
            .map_err(|_| AuthError::unavailable("session feed closed"))
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn follow(
    mut events: watch::Receiver<Option<Identity>>,
    profiles: Arc<dyn ProfileRepository>,
    state: Arc<watch::Sender<SessionState>>,
) {
    let initial = events.borrow_and_update().clone();
    let mut profile_feed = resolve(initial, profiles.as_ref(), &state).await;

    loop {
        tokio::select! {
            changed = events.changed() => {
                if changed.is_err() {
                    break;
                }
                let identity = events.borrow_and_update().clone();
                profile_feed = resolve(identity, profiles.as_ref(), &state).await;
            }
            update = next_profile(profile_feed.as_mut()) => match update {
                Some(Some(profile)) => apply_profile(&state, profile),
                Some(None) => {}
                None => profile_feed = None,
            },
        }
    }
}

async fn resolve(
    identity: Option<Identity>,
    profiles: &dyn ProfileRepository,
    state: &watch::Sender<SessionState>,
) -> Option<watch::Receiver<Option<Profile>>> {
    let Some(identity) = identity else {
        state.send_replace(SessionState::signed_out());
        debug!("session signed out");
        return None;
    };

    state.send_replace(SessionState::resolving(Some(identity.clone())));
    let feed = profiles.watch(identity.id());
    let profile = match profiles.find(identity.id()).await {
        Ok(profile) => profile,
        Err(err) => {
            warn!(user_id = %identity.id(), error = %err, "failed to load profile for session");
            None
        }
    };
    state.send_modify(|current| {
        current.profile = profile;
        current.resolving = false;
    });
    debug!(user_id = %identity.id(), "session resolved");
    Some(feed)
}

/// Next profile snapshot; `None` once the feed closes.
async fn next_profile(
    feed: Option<&mut watch::Receiver<Option<Profile>>>,
) -> Option<Option<Profile>> {
    let Some(feed) = feed else {
        return pending().await;
    };
    feed.changed().await.ok()?;
    Some(feed.borrow_and_update().clone())
}

fn apply_profile(state: &watch::Sender<SessionState>, profile: Profile) {
    state.send_if_modified(|current| {
        let owns = current.identity.as_ref().map(Identity::id) == Some(profile.user_id());
        if !owns || current.profile.as_ref() == Some(&profile) {
            return false;
        }
        current.profile = Some(profile);
        true
    });
}
