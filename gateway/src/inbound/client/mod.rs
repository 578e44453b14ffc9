//! Member client adapter.
//!
//! A [`MemberClient`] is one connected visitor. It turns [`ClientEvent`]s into
//! calls on the session, the route guard and the checkout attempt, and answers
//! with a [`ClientSnapshot`] for the presentation layer to render. Session and
//! route state are reactive: a profile activated elsewhere redirects this
//! client without any event being handled.

mod messages;
mod state;

pub use messages::{
    CatalogCard, CheckoutStatus, ClientEvent, ClientSnapshot, FitCheckStatus, MemberSummary,
};
pub use state::ClientState;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::domain::ports::IdentityProvider;
use crate::domain::{
    ActivationFailure, ActivationOrchestrator, ActivationState, AuthMode, CatalogFilter,
    CatalogMirror, CatalogSubscription, CatalogUpdate, Credentials, Disclosure, Error,
    FoundingTally, RouteGuard, SessionState, SessionStore, View,
};

/// One connected visitor.
pub struct MemberClient {
    state: ClientState,
    session: SessionStore,
    route: RouteGuard,
    checkout: ActivationOrchestrator,
    auth_mode: AuthMode,
    fit_check: FitCheckStatus,
    catalog: Option<CatalogSubscription>,
    mirror: CatalogMirror,
}

impl MemberClient {
    /// Connect a client signed in (or not) through `identity`, starting at
    /// `initial`.
    ///
    /// Waits for the session to settle so the first route decision sees the
    /// real identity. Must be called from within a Tokio runtime.
    pub async fn connect(
        state: ClientState,
        identity: Arc<dyn IdentityProvider>,
        initial: View,
    ) -> Self {
        let session = SessionStore::spawn(identity, Arc::clone(&state.profiles));
        session.settled().await;
        let route = RouteGuard::spawn(session.subscribe(), initial);
        let checkout = ActivationOrchestrator::new(Arc::clone(&state.activation));

        let mut client = Self {
            state,
            session,
            route,
            checkout,
            auth_mode: AuthMode::default(),
            fit_check: FitCheckStatus::default(),
            catalog: None,
            mirror: CatalogMirror::default(),
        };
        client.observe_session();
        client
    }

    /// Apply `event` and return the resulting snapshot.
    ///
    /// Identity form errors are returned for inline display and change
    /// nothing. Activation failures are not errors here; they show up as
    /// [`CheckoutStatus::Failed`].
    pub async fn handle(&mut self, event: ClientEvent) -> Result<ClientSnapshot, Error> {
        self.observe_session();
        match event {
            ClientEvent::Navigate { view } => {
                self.route.navigate(view);
            }
            ClientEvent::Join => self.join(),
            ClientEvent::AnswerFitCheck {
                flexible_dates,
                flexible_destination,
            } => self.answer_fit_check(flexible_dates, flexible_destination),
            ClientEvent::ChooseAuthMode { mode } => self.auth_mode = mode,
            ClientEvent::Authenticate {
                mode,
                email,
                password,
            } => self.authenticate(mode, &email, &password).await?,
            ClientEvent::Acknowledge {
                disclosure,
                acknowledged,
            } => self.checkout.set_agreement(disclosure, acknowledged),
            ClientEvent::Submit => self.submit().await,
            ClientEvent::SignOut => self.sign_out().await?,
        }
        self.observe_session();
        Ok(self.snapshot())
    }

    /// Current render state.
    pub fn snapshot(&self) -> ClientSnapshot {
        let session = self.session.snapshot();
        let agreements = self.checkout.agreements();
        let acknowledged = Disclosure::ALL
            .into_iter()
            .filter(|disclosure| agreements.is_acknowledged(*disclosure))
            .collect();

        ClientSnapshot {
            view: self.route.current(),
            signed_in_as: session
                .identity()
                .map(|identity| identity.email().as_ref().to_owned()),
            member: session.profile().map(MemberSummary::from),
            fit_check: self.fit_check,
            checkout: CheckoutStatus::from_state(
                self.checkout.state(),
                self.auth_mode,
                acknowledged,
                self.checkout.can_submit(),
            ),
        }
    }

    /// Current session snapshot.
    pub fn session(&self) -> SessionState {
        self.session.snapshot()
    }

    /// View currently shown.
    pub fn view(&self) -> View {
        self.route.current()
    }

    /// Subscribe to view changes, including redirects caused by profile
    /// changes made elsewhere.
    pub fn view_updates(&self) -> watch::Receiver<View> {
        self.route.subscribe()
    }

    /// Current founding tally.
    pub async fn tally(&self) -> Result<FoundingTally, Error> {
        self.state
            .allocator
            .tally()
            .await
            .map_err(|err| Error::from(&err))
    }

    /// Subscribe to committed counter values; render them with
    /// [`Self::tally_for`].
    pub fn tally_updates(&self) -> watch::Receiver<Option<u64>> {
        self.state.allocator.watch()
    }

    /// Tally for a value received from [`Self::tally_updates`].
    pub fn tally_for(&self, value: Option<u64>) -> FoundingTally {
        self.state.allocator.tally_for(value)
    }

    /// Wait for the next catalog update and fold it into the local mirror.
    ///
    /// Opens the subscription on first use. Returns `None` when the visitor
    /// is not an active member or the feed has stopped.
    pub async fn next_catalog_update(&mut self) -> Option<CatalogUpdate> {
        let update = self.catalog_subscription()?.next().await?;
        self.mirror.apply(update.clone());
        Some(update)
    }

    /// Catalog cards passing `filter`, newest first.
    pub fn catalog(&self, filter: &CatalogFilter) -> Vec<CatalogCard> {
        let now = self.state.clock.utc();
        filter
            .apply(self.mirror.entries())
            .into_iter()
            .map(|entry| CatalogCard::new(entry.clone(), self.state.display.badge(entry, now)))
            .collect()
    }

    /// Whether the catalog shown is waiting on a reconnect.
    pub fn catalog_is_stale(&self) -> bool {
        self.mirror.is_stale()
    }

    fn observe_session(&mut self) {
        let session = self.session.snapshot();
        self.checkout.observe_identity(session.identity().is_some());
        if !session.is_active() && self.catalog.is_some() {
            debug!("releasing catalog subscription for inactive session");
            self.catalog = None;
            self.mirror = CatalogMirror::default();
        }
        // Re-run gating against the settled session.
        self.route.navigate(self.route.current());
    }

    fn catalog_subscription(&mut self) -> Option<&mut CatalogSubscription> {
        let session = self.session.snapshot();
        if !session.is_active() {
            self.catalog = None;
            return None;
        }
        if self.catalog.is_none() {
            match self.state.catalog.subscribe(&session) {
                Ok(subscription) => self.catalog = Some(subscription),
                Err(err) => {
                    debug!(error = %err, "catalog subscription refused");
                    return None;
                }
            }
        }
        self.catalog.as_mut()
    }

    fn join(&mut self) {
        if self.session.snapshot().is_active() {
            self.route.navigate(View::Portal);
        } else {
            self.fit_check = FitCheckStatus::Open;
        }
    }

    fn answer_fit_check(&mut self, flexible_dates: bool, flexible_destination: bool) {
        let answers = self
            .state
            .qualification
            .answers(flexible_dates, flexible_destination);
        if !answers.is_qualified() {
            self.fit_check = FitCheckStatus::NotQualified;
            return;
        }

        let session = self.session.snapshot();
        if let Some(identity) = session.identity() {
            drop(self.state.qualification.record(identity.id().clone(), answers));
        }
        self.checkout.set_qualification(answers);
        self.fit_check = FitCheckStatus::Qualified;
        if session.identity().is_none() {
            self.auth_mode = AuthMode::SignUp;
        }
        self.route.navigate(View::Checkout);
    }

    async fn authenticate(
        &mut self,
        mode: AuthMode,
        email: &str,
        password: &str,
    ) -> Result<(), Error> {
        let credentials = Credentials::try_from_parts(email, password)
            .map_err(|err| Error::invalid_request(err.to_string()))?;
        self.auth_mode = mode;
        self.checkout
            .authenticate(&self.session, mode, &credentials)
            .await
            .map(|_| ())
            .map_err(|failure| Error::from(&failure))
    }

    async fn submit(&mut self) {
        let succeeded = matches!(
            self.checkout.submit(&self.session).await,
            ActivationState::Succeeded { .. }
        );
        if succeeded {
            self.route.navigate(View::Portal);
        }
    }

    async fn sign_out(&mut self) -> Result<(), Error> {
        self.session
            .sign_out()
            .await
            .map_err(|err| Error::from(&ActivationFailure::from(err)))?;
        self.catalog = None;
        self.mirror = CatalogMirror::default();
        self.checkout = ActivationOrchestrator::new(Arc::clone(&self.state.activation));
        self.auth_mode = AuthMode::default();
        self.fit_check = FitCheckStatus::default();
        self.route.navigate(View::Landing);
        Ok(())
    }
}
