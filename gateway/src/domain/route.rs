//! View gating.
//!
//! [`resolve_view`] is a pure function of the visitor's [`Access`] and the
//! requested [`View`]. [`RouteGuard`] re-runs it whenever the session changes
//! so that an activation landing from another session redirects immediately.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::domain::session::SessionState;

/// Top-level views of the member client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    /// Public marketing page.
    #[default]
    Landing,
    /// Sign-in form.
    Login,
    /// Agreements and payment confirmation.
    Checkout,
    /// Members-only catalog.
    Portal,
    /// Members-only account page.
    Account,
}

impl View {
    /// Views that require an active membership.
    pub const fn is_gated(self) -> bool {
        matches!(self, Self::Portal | Self::Account)
    }

    /// Views that only make sense before activation.
    pub const fn is_pre_activation(self) -> bool {
        matches!(self, Self::Landing | Self::Login | Self::Checkout)
    }
}

/// What the current visitor is allowed to see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No identity.
    Anonymous,
    /// Identity present, membership not active.
    Pending,
    /// Identity present with an active membership.
    Member,
}

/// Resolve the view actually shown for `requested`.
///
/// # Examples
/// ```
/// use gateway::domain::{Access, View, resolve_view};
///
/// assert_eq!(resolve_view(Access::Anonymous, View::Portal), View::Landing);
/// assert_eq!(resolve_view(Access::Pending, View::Portal), View::Checkout);
/// assert_eq!(resolve_view(Access::Member, View::Landing), View::Portal);
/// ```
pub const fn resolve_view(access: Access, requested: View) -> View {
    match access {
        Access::Anonymous if requested.is_gated() => View::Landing,
        Access::Pending if requested.is_gated() => View::Checkout,
        Access::Member if requested.is_pre_activation() => View::Portal,
        _ => requested,
    }
}

/// Reactive view holder that follows session changes.
///
/// Dropping the guard stops the follower task.
#[derive(Debug)]
pub struct RouteGuard {
    session: watch::Receiver<SessionState>,
    view: Arc<watch::Sender<View>>,
    task: JoinHandle<()>,
}

impl RouteGuard {
    /// Start following `session`, beginning at `initial`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(session: watch::Receiver<SessionState>, initial: View) -> Self {
        let start = session.borrow().route(initial);
        let view = Arc::new(watch::Sender::new(start));
        let task = tokio::spawn(follow(session.clone(), Arc::clone(&view)));
        Self {
            session,
            view,
            task,
        }
    }

    /// Navigate to `requested`, returning the view actually shown.
    pub fn navigate(&self, requested: View) -> View {
        let next = self.session.borrow().route(requested);
        self.view.send_replace(next);
        next
    }

    /// View currently shown.
    pub fn current(&self) -> View {
        *self.view.borrow()
    }

    /// Subscribe to view changes.
    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.subscribe()
    }
}

impl Drop for RouteGuard {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn follow(mut session: watch::Receiver<SessionState>, view: Arc<watch::Sender<View>>) {
    while session.changed().await.is_ok() {
        let state = session.borrow_and_update().clone();
        view.send_if_modified(|current| {
            let next = state.route(*current);
            if next == *current {
                return false;
            }
            debug!(from = ?*current, to = ?next, "session change redirected view");
            *current = next;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Access::Anonymous, View::Landing, View::Landing)]
    #[case(Access::Anonymous, View::Login, View::Login)]
    #[case(Access::Anonymous, View::Checkout, View::Checkout)]
    #[case(Access::Anonymous, View::Portal, View::Landing)]
    #[case(Access::Anonymous, View::Account, View::Landing)]
    #[case(Access::Pending, View::Landing, View::Landing)]
    #[case(Access::Pending, View::Checkout, View::Checkout)]
    #[case(Access::Pending, View::Portal, View::Checkout)]
    #[case(Access::Pending, View::Account, View::Checkout)]
    #[case(Access::Member, View::Landing, View::Portal)]
    #[case(Access::Member, View::Login, View::Portal)]
    #[case(Access::Member, View::Checkout, View::Portal)]
    #[case(Access::Member, View::Portal, View::Portal)]
    #[case(Access::Member, View::Account, View::Account)]
    fn resolves_views(#[case] access: Access, #[case] requested: View, #[case] expected: View) {
        assert_eq!(resolve_view(access, requested), expected);
    }
}
