//! Membership domain: types, services and ports.
//!
//! Purpose: model the activation workflow independently of storage, identity
//! and presentation. Services depend only on the traits in [`ports`]; adapters
//! live in `outbound` and `inbound`.
//!
//! Public surface:
//! - [`Profile`], [`ProfilePatch`]: membership record and its merge writes.
//! - [`FoundingCounterAllocator`]: founding number allocation.
//! - [`ActivationService`], [`ActivationOrchestrator`]: the activation flow.
//! - [`SessionStore`], [`RouteGuard`]: per-client session and view gating.
//! - [`CatalogSyncChannel`]: live catalog for active members.

pub mod activation;
pub mod agreements;
pub mod auth;
pub mod catalog;
pub mod catalog_sync;
pub mod error;
pub mod founding_counter;
pub mod identity;
pub mod ports;
pub mod profile;
pub mod qualification;
pub mod retry;
pub mod route;
pub mod session;

pub use self::activation::{
    ActivationFailure, ActivationOrchestrator, ActivationOutcome, ActivationService,
    ActivationState, AuthMode, PendingActivation, ReconciliationQueue, ReconciliationReport,
};
pub use self::agreements::{Agreements, Disclosure};
pub use self::auth::{Credentials, CredentialsValidationError, PASSWORD_MIN};
pub use self::catalog::{
    CatalogDisplayPolicy, CatalogEntry, CatalogEntryId, CatalogFilter, DisplayBadge,
    starter_drops,
};
pub use self::catalog_sync::{
    CatalogMirror, CatalogSubscription, CatalogSyncChannel, CatalogUpdate, SyncRuntime,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::founding_counter::{
    AllocatorConfig, AllocatorRuntime, FoundingCounterAllocator, FoundingTally,
    TransientAllocationError,
};
pub use self::identity::{Email, Identity, IdentityValidationError, UserId};
pub use self::profile::{
    FoundingMemberNumber, MembershipStatus, Profile, ProfileMergeError, ProfilePatch,
    QualificationAnswers,
};
pub use self::qualification::QualificationRecorder;
pub use self::retry::{AttemptJitter, Backoff, BackoffJitter, NoJitter, Sleeper, TokioSleeper};
pub use self::route::{Access, RouteGuard, View, resolve_view};
pub use self::session::{SessionState, SessionStore};
