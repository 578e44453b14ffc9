//! Membership activation.
//!
//! [`ActivationService`] runs the durable part of an activation: idempotency
//! check, payment confirmation, number allocation and the profile merge. It is
//! shared by every session in the process. [`ActivationOrchestrator`] is the
//! per-attempt state machine a client drives:
//!
//! `AwaitingIdentity -> AwaitingAgreements -> Submitting -> Succeeded | RecoverableFailure`

mod reconciliation;

pub use reconciliation::{PendingActivation, ReconciliationQueue, ReconciliationReport};

use std::sync::Arc;

use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::domain::founding_counter::{FoundingCounterAllocator, TransientAllocationError};
use crate::domain::ports::{
    AuthError, PaymentConfirmation, PaymentError, ProfileRepository, ProfileRepositoryError,
};
use crate::domain::session::SessionStore;
use crate::domain::{
    Agreements, Credentials, Disclosure, Error, FoundingMemberNumber, Identity, Profile,
    ProfilePatch, QualificationAnswers,
};

/// Why an activation attempt stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationFailure {
    /// Sign-up or sign-in was rejected.
    #[error(transparent)]
    Auth(#[from] AuthError),
    /// Payment was not confirmed; nothing was allocated.
    #[error(transparent)]
    PaymentDeclined(#[from] PaymentError),
    /// No number could be allocated; the profile is unchanged.
    #[error(transparent)]
    TransientAllocation(#[from] TransientAllocationError),
    /// The number was allocated but the profile merge failed.
    #[error("profile write failed after allocating {number}: {source}")]
    ProfileWrite {
        /// Allocated number, queued for reconciliation.
        number: FoundingMemberNumber,
        /// Repository failure.
        #[source]
        source: ProfileRepositoryError,
    },
    /// The existing profile could not be read.
    #[error("profile read failed: {0}")]
    ProfileRead(#[source] ProfileRepositoryError),
}

impl ActivationFailure {
    /// Short message for the retry affordance.
    pub fn user_message(&self) -> String {
        match self {
            Self::Auth(err) => err.to_string(),
            Self::PaymentDeclined(PaymentError::Declined { reason }) => {
                format!("Your payment was declined: {reason}")
            }
            Self::PaymentDeclined(PaymentError::Unavailable { .. })
            | Self::TransientAllocation(_)
            | Self::ProfileRead(_) => "Something went wrong. Please try again.".to_owned(),
            Self::ProfileWrite { .. } => {
                "Your membership is being finalised. Please try again shortly.".to_owned()
            }
        }
    }
}

impl From<&ActivationFailure> for Error {
    fn from(value: &ActivationFailure) -> Self {
        let message = value.to_string();
        match value {
            ActivationFailure::Auth(err) => Self::new(err.code(), message),
            ActivationFailure::PaymentDeclined(err) => Self::new(err.code(), message),
            ActivationFailure::ProfileWrite { number, .. } => Self::service_unavailable(message)
                .with_details(json!({ "foundingMemberNumber": number.get() })),
            ActivationFailure::TransientAllocation(_) | ActivationFailure::ProfileRead(_) => {
                Self::service_unavailable(message)
            }
        }
    }
}

/// Result of a completed activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationOutcome {
    /// Profile as committed.
    pub profile: Profile,
    /// Assigned number.
    pub number: FoundingMemberNumber,
    /// The profile was already active; nothing was allocated.
    pub replayed: bool,
}

/// Durable activation steps shared across sessions.
pub struct ActivationService {
    profiles: Arc<dyn ProfileRepository>,
    payments: Arc<dyn PaymentConfirmation>,
    allocator: Arc<FoundingCounterAllocator>,
    reconciliation: Arc<ReconciliationQueue>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl ActivationService {
    /// Create the service.
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        payments: Arc<dyn PaymentConfirmation>,
        allocator: Arc<FoundingCounterAllocator>,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            profiles,
            payments,
            allocator,
            reconciliation: Arc::new(ReconciliationQueue::default()),
            clock,
        }
    }

    /// Queue of activations awaiting their profile merge.
    pub fn reconciliation(&self) -> &ReconciliationQueue {
        &self.reconciliation
    }

    /// Activate `identity`.
    ///
    /// Safe to call repeatedly: an already active profile short-circuits with
    /// its existing number, and a queued activation is retried with the
    /// number it was already given.
    pub async fn activate(
        &self,
        identity: &Identity,
        qualification: Option<QualificationAnswers>,
    ) -> Result<ActivationOutcome, ActivationFailure> {
        let user_id = identity.id();
        let existing = self
            .profiles
            .find(user_id)
            .await
            .map_err(ActivationFailure::ProfileRead)?;

        if let Some(outcome) = existing.as_ref().and_then(replayed_outcome) {
            self.reconciliation.remove(user_id);
            info!(
                user_id = %user_id,
                founding_member_number = outcome.number.get(),
                "activation replayed for active member"
            );
            return Ok(outcome);
        }

        let pending = match self.reconciliation.get(user_id) {
            Some(pending) => {
                debug!(
                    user_id = %user_id,
                    founding_member_number = pending.number.get(),
                    "retrying queued activation"
                );
                PendingActivation {
                    qualification: qualification.or(pending.qualification),
                    ..pending
                }
            }
            None => {
                let receipt = self.payments.confirm(identity).await?;
                let number = self.allocator.allocate().await?;
                PendingActivation {
                    identity: identity.clone(),
                    number,
                    payment_reference: receipt.customer_reference,
                    qualification,
                }
            }
        };

        let needs_created_at = existing.as_ref().is_none_or(|p| p.created_at().is_none());
        self.write(&pending, needs_created_at).await
    }

    /// Re-apply every queued activation with its allocated number.
    pub async fn reconcile_pending(&self) -> ReconciliationReport {
        let mut report = ReconciliationReport::default();
        for pending in self.reconciliation.snapshot() {
            match self.write(&pending, true).await {
                Ok(_) => report.applied += 1,
                Err(ActivationFailure::ProfileWrite {
                    source: ProfileRepositoryError::Conflict { .. },
                    ..
                }) => report.discarded += 1,
                Err(_) => report.retained += 1,
            }
        }
        report
    }

    async fn write(
        &self,
        pending: &PendingActivation,
        needs_created_at: bool,
    ) -> Result<ActivationOutcome, ActivationFailure> {
        let user_id = pending.identity.id();
        let now = self.clock.utc();
        let mut patch = ProfilePatch::activation(pending.number, now)
            .with_email(pending.identity.email().clone())
            .with_payment_reference(pending.payment_reference.clone())
            .with_qualification(pending.qualification);
        if needs_created_at {
            patch = patch.with_created_at(now);
        }

        match self.profiles.merge(user_id, &patch).await {
            Ok(profile) => {
                self.reconciliation.remove(user_id);
                info!(
                    user_id = %user_id,
                    founding_member_number = pending.number.get(),
                    "membership activated"
                );
                Ok(ActivationOutcome {
                    profile,
                    number: pending.number,
                    replayed: false,
                })
            }
            Err(source @ ProfileRepositoryError::Conflict { .. }) => {
                self.reconciliation.remove(user_id);
                self.resolve_conflict(pending, source).await
            }
            Err(source) => {
                error!(
                    user_id = %user_id,
                    founding_member_number = pending.number.get(),
                    error = %source,
                    "profile write failed after allocation; queued for reconciliation"
                );
                self.reconciliation.enqueue(pending.clone());
                Err(ActivationFailure::ProfileWrite {
                    number: pending.number,
                    source,
                })
            }
        }
    }

    /// A conflicting merge means another attempt activated the member first.
    async fn resolve_conflict(
        &self,
        pending: &PendingActivation,
        source: ProfileRepositoryError,
    ) -> Result<ActivationOutcome, ActivationFailure> {
        let user_id = pending.identity.id();
        let current = self.profiles.find(user_id).await.ok().flatten();
        if let Some(outcome) = current.as_ref().and_then(replayed_outcome) {
            warn!(
                user_id = %user_id,
                founding_member_number = outcome.number.get(),
                leaked_number = pending.number.get(),
                "member was activated concurrently; allocated number left unassigned"
            );
            return Ok(outcome);
        }
        warn!(
            user_id = %user_id,
            founding_member_number = pending.number.get(),
            error = %source,
            "profile rejected activation; allocated number left unassigned"
        );
        Err(ActivationFailure::ProfileWrite {
            number: pending.number,
            source,
        })
    }
}

fn replayed_outcome(profile: &Profile) -> Option<ActivationOutcome> {
    if !profile.is_active() {
        return None;
    }
    profile
        .founding_member_number()
        .map(|number| ActivationOutcome {
            profile: profile.clone(),
            number,
            replayed: true,
        })
}

/// Which identity form the visitor used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// Create a new account.
    SignUp,
    /// Sign an existing account in.
    #[default]
    SignIn,
}

/// Per-attempt activation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationState {
    /// No identity yet; sign-up or sign-in is required.
    AwaitingIdentity,
    /// Identity known; waiting for every disclosure to be acknowledged.
    AwaitingAgreements,
    /// The activation sequence is running.
    Submitting,
    /// Activation finished.
    Succeeded {
        /// Assigned number.
        number: FoundingMemberNumber,
        /// The member was already active.
        replayed: bool,
    },
    /// The attempt failed; the visitor may submit again.
    RecoverableFailure(ActivationFailure),
}

/// Client-driven activation state machine.
pub struct ActivationOrchestrator {
    service: Arc<ActivationService>,
    agreements: Agreements,
    qualification: Option<QualificationAnswers>,
    state: ActivationState,
}

impl ActivationOrchestrator {
    /// Start a new attempt.
    pub fn new(service: Arc<ActivationService>) -> Self {
        Self {
            service,
            agreements: Agreements::default(),
            qualification: None,
            state: ActivationState::AwaitingIdentity,
        }
    }

    /// Current state.
    pub fn state(&self) -> &ActivationState {
        &self.state
    }

    /// Current acknowledgements.
    pub fn agreements(&self) -> &Agreements {
        &self.agreements
    }

    /// Attach fit-check answers to the activation patch.
    pub fn set_qualification(&mut self, answers: QualificationAnswers) {
        self.qualification = Some(answers);
    }

    /// Record an acknowledgement toggle.
    pub fn set_agreement(&mut self, disclosure: Disclosure, acknowledged: bool) {
        self.agreements.set(disclosure, acknowledged);
    }

    /// Whether `submit` would start the activation sequence.
    pub fn can_submit(&self) -> bool {
        matches!(
            self.state,
            ActivationState::AwaitingAgreements | ActivationState::RecoverableFailure(_)
        ) && self.agreements.all_acknowledged()
    }

    /// Follow identity changes from the session.
    ///
    /// A signed-in identity unlocks the agreements step; signing out returns
    /// the attempt to `AwaitingIdentity`. Finished attempts are left alone.
    pub fn observe_identity(&mut self, signed_in: bool) {
        match (&self.state, signed_in) {
            (ActivationState::AwaitingIdentity, true) => {
                self.state = ActivationState::AwaitingAgreements;
            }
            (
                ActivationState::AwaitingAgreements | ActivationState::RecoverableFailure(_),
                false,
            ) => self.state = ActivationState::AwaitingIdentity,
            _ => {}
        }
    }

    /// Sign up or sign in through the session.
    ///
    /// Failures are returned for inline display and leave the state as is.
    pub async fn authenticate(
        &mut self,
        session: &SessionStore,
        mode: AuthMode,
        credentials: &Credentials,
    ) -> Result<Identity, ActivationFailure> {
        let identity = match mode {
            AuthMode::SignUp => session.create_account(credentials).await?,
            AuthMode::SignIn => session.sign_in(credentials).await?,
        };
        self.observe_identity(true);
        Ok(identity)
    }

    /// Run the activation sequence.
    ///
    /// A no-op unless [`Self::can_submit`] holds. On success the session
    /// mirrors the merged profile.
    pub async fn submit(&mut self, session: &SessionStore) -> &ActivationState {
        if !self.can_submit() {
            debug!(state = ?self.state, "submit ignored");
            return &self.state;
        }
        let Some(identity) = session.snapshot().identity().cloned() else {
            self.state = ActivationState::AwaitingIdentity;
            return &self.state;
        };

        self.state = ActivationState::Submitting;
        self.state = match self.service.activate(&identity, self.qualification).await {
            Ok(outcome) => {
                session.mirror_profile(outcome.profile);
                ActivationState::Succeeded {
                    number: outcome.number,
                    replayed: outcome.replayed,
                }
            }
            Err(failure) => {
                warn!(user_id = %identity.id(), error = %failure, "activation attempt failed");
                ActivationState::RecoverableFailure(failure)
            }
        };
        &self.state
    }
}
