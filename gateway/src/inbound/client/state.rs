//! Shared member client adapter state.
//!
//! Every client in the process is built from the same [`ClientState`]; only
//! the identity provider handle is per client. The bundle depends on domain
//! services and ports so the adapter stays independent of storage choices.

use std::sync::Arc;

use mockable::Clock;

use crate::domain::ports::ProfileRepository;
use crate::domain::{
    ActivationService, CatalogDisplayPolicy, CatalogSyncChannel, FoundingCounterAllocator,
    QualificationRecorder,
};

/// Dependency bundle shared by member clients.
#[derive(Clone)]
pub struct ClientState {
    /// Profile storage, read by sessions and written by the fit check.
    pub profiles: Arc<dyn ProfileRepository>,
    /// Activation flow shared by every checkout attempt.
    pub activation: Arc<ActivationService>,
    /// Founding counter, read for the public tally.
    pub allocator: Arc<FoundingCounterAllocator>,
    /// Live catalog feed for active members.
    pub catalog: Arc<CatalogSyncChannel>,
    /// Best-effort writer for fit-check answers.
    pub qualification: QualificationRecorder,
    /// Badge and expiry rules for catalog cards.
    pub display: CatalogDisplayPolicy,
    /// Source of "now" for catalog badges.
    pub clock: Arc<dyn Clock + Send + Sync>,
}
