//! Activations whose profile write failed after a number was allocated.
//!
//! Entries keep the allocated number so a retry re-applies the same merge
//! instead of burning another number.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{FoundingMemberNumber, Identity, QualificationAnswers, UserId};

/// Activation waiting for its profile merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingActivation {
    /// Member being activated.
    pub identity: Identity,
    /// Number already allocated for this member.
    pub number: FoundingMemberNumber,
    /// Payment reference from the confirmed payment.
    pub payment_reference: String,
    /// Fit-check answers known at submission time.
    pub qualification: Option<QualificationAnswers>,
}

/// Outcome of a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Merges that now succeeded.
    pub applied: usize,
    /// Entries kept for a later pass.
    pub retained: usize,
    /// Entries dropped because the profile rejected the number.
    pub discarded: usize,
}

/// Process-wide queue of pending activations, one per member.
#[derive(Debug, Default)]
pub struct ReconciliationQueue {
    pending: Mutex<HashMap<UserId, PendingActivation>>,
}

impl ReconciliationQueue {
    fn lock(&self) -> MutexGuard<'_, HashMap<UserId, PendingActivation>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue `activation`, replacing any earlier entry for the member.
    pub fn enqueue(&self, activation: PendingActivation) {
        self.lock()
            .insert(activation.identity.id().clone(), activation);
    }

    /// Pending entry for `user_id`, if any.
    pub fn get(&self, user_id: &UserId) -> Option<PendingActivation> {
        self.lock().get(user_id).cloned()
    }

    /// Remove the entry for `user_id`.
    pub fn remove(&self, user_id: &UserId) -> Option<PendingActivation> {
        self.lock().remove(user_id)
    }

    /// Copy of every pending entry.
    pub fn snapshot(&self) -> Vec<PendingActivation> {
        self.lock().values().cloned().collect()
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
