//! Fit-check answers and their best-effort persistence.
//!
//! Answers are merged into the profile as soon as a signed-in visitor
//! finishes the questionnaire. The write runs detached and its failure is
//! only logged; activation never waits on it.

use std::sync::Arc;

use mockable::Clock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::ports::ProfileRepository;
use crate::domain::{ProfilePatch, QualificationAnswers, UserId};

/// Records fit-check answers.
#[derive(Clone)]
pub struct QualificationRecorder {
    profiles: Arc<dyn ProfileRepository>,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl QualificationRecorder {
    /// Create a recorder writing through `profiles`.
    pub fn new(profiles: Arc<dyn ProfileRepository>, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self { profiles, clock }
    }

    /// Stamp questionnaire flags with the completion time.
    pub fn answers(&self, flexible_dates: bool, flexible_destination: bool) -> QualificationAnswers {
        QualificationAnswers {
            flexible_dates,
            flexible_destination,
            completed_at: self.clock.utc(),
        }
    }

    /// Merge `answers` into the profile of `user_id` without blocking.
    ///
    /// The returned handle may be dropped; the write continues regardless.
    pub fn record(&self, user_id: UserId, answers: QualificationAnswers) -> JoinHandle<()> {
        let profiles = Arc::clone(&self.profiles);
        tokio::spawn(async move {
            match profiles
                .merge(&user_id, &ProfilePatch::qualification(answers))
                .await
            {
                Ok(_) => debug!(user_id = %user_id, "recorded qualification answers"),
                Err(err) => {
                    warn!(user_id = %user_id, error = %err, "failed to record qualification answers");
                }
            }
        })
    }
}
