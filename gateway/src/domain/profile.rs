//! Membership profile aggregate and its merge semantics.
//!
//! A [`Profile`] is the durable per-identity record. It is only ever written
//! through [`ProfilePatch`] merges: fields absent from a patch are left
//! untouched, so the activation write and the qualification write can land in
//! either order without erasing each other.

use std::fmt;
use std::num::NonZeroU64;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::identity::{Email, UserId};

/// Membership lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipStatus {
    /// Not yet activated.
    #[default]
    None,
    /// Activation completed; never reverts inside the gateway.
    Active,
}

impl MembershipStatus {
    /// Stable storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Active => "active",
        }
    }

    /// Parse the storage representation.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "none" => Some(Self::None),
            "active" => Some(Self::Active),
            _ => None,
        }
    }
}

/// Unique, strictly increasing, user-visible founding rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FoundingMemberNumber(NonZeroU64);

impl FoundingMemberNumber {
    /// Wrap a positive number; zero is rejected.
    pub fn new(value: u64) -> Option<Self> {
        NonZeroU64::new(value).map(Self)
    }

    /// Raw numeric value.
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for FoundingMemberNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Boolean flags emitted by the fit-check questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationAnswers {
    /// Visitor can travel on flexible dates.
    pub flexible_dates: bool,
    /// Visitor is open to flexible destinations.
    pub flexible_destination: bool,
    /// When the questionnaire was completed.
    pub completed_at: DateTime<Utc>,
}

impl QualificationAnswers {
    /// Only visitors flexible on both dates and destination qualify.
    pub const fn is_qualified(&self) -> bool {
        self.flexible_dates && self.flexible_destination
    }
}

/// Invariant violations rejected by [`Profile::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProfileMergeError {
    /// The patch tried to move an active profile back to `none`.
    #[error("an active membership cannot revert to none")]
    StatusRegression,
    /// The patch tried to replace an already assigned founding number.
    #[error("founding member number {existing} is already assigned; refusing {attempted}")]
    FoundingNumberImmutable {
        /// Number already on the profile.
        existing: FoundingMemberNumber,
        /// Number carried by the rejected patch.
        attempted: FoundingMemberNumber,
    },
    /// The merged profile would be active without a founding number.
    #[error("an active membership requires a founding member number")]
    MissingFoundingNumber,
}

/// Durable membership record, one per identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<Email>,
    status: MembershipStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    founding_member_number: Option<FoundingMemberNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    member_since: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    qualification: Option<QualificationAnswers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    created_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// A profile document that has never been written.
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            email: None,
            status: MembershipStatus::None,
            founding_member_number: None,
            member_since: None,
            qualification: None,
            payment_reference: None,
            created_at: None,
        }
    }

    /// Create a profile by merging `patch` into an empty document.
    pub fn from_patch(user_id: UserId, patch: &ProfilePatch) -> Result<Self, ProfileMergeError> {
        let mut profile = Self::empty(user_id);
        profile.apply(patch)?;
        Ok(profile)
    }

    /// Merge `patch` into this profile.
    ///
    /// Fields missing from the patch are untouched. `created_at` and
    /// `member_since` are write-once: later values are ignored. The founding
    /// number may be re-applied with the same value but never replaced.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use gateway::domain::{FoundingMemberNumber, Profile, ProfilePatch, UserId};
    ///
    /// let number = FoundingMemberNumber::new(143).unwrap();
    /// let mut profile = Profile::empty(UserId::random());
    /// profile.apply(&ProfilePatch::activation(number, Utc::now())).unwrap();
    /// assert!(profile.is_active());
    /// assert_eq!(profile.founding_member_number(), Some(number));
    /// ```
    pub fn apply(&mut self, patch: &ProfilePatch) -> Result<(), ProfileMergeError> {
        let status = match (self.status, patch.status) {
            (MembershipStatus::Active, Some(MembershipStatus::None)) => {
                return Err(ProfileMergeError::StatusRegression);
            }
            (_, Some(next)) => next,
            (current, None) => current,
        };

        let founding_member_number = match (self.founding_member_number, patch.founding_member_number)
        {
            (Some(existing), Some(attempted)) if existing != attempted => {
                return Err(ProfileMergeError::FoundingNumberImmutable {
                    existing,
                    attempted,
                });
            }
            (Some(existing), _) => Some(existing),
            (None, attempted) => attempted,
        };

        if status == MembershipStatus::Active && founding_member_number.is_none() {
            return Err(ProfileMergeError::MissingFoundingNumber);
        }

        self.status = status;
        self.founding_member_number = founding_member_number;
        if self.member_since.is_none() {
            self.member_since = patch.member_since;
        }
        if self.created_at.is_none() {
            self.created_at = patch.created_at;
        }
        if let Some(email) = &patch.email {
            self.email = Some(email.clone());
        }
        if let Some(answers) = patch.qualification {
            self.qualification = Some(answers);
        }
        if let Some(reference) = &patch.payment_reference {
            self.payment_reference = Some(reference.clone());
        }
        Ok(())
    }

    /// Owning identity.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Account email captured at activation.
    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }

    /// Current membership status.
    pub fn status(&self) -> MembershipStatus {
        self.status
    }

    /// Whether activation has completed.
    pub fn is_active(&self) -> bool {
        self.status == MembershipStatus::Active
    }

    /// Founding number; present exactly when the profile is active.
    pub fn founding_member_number(&self) -> Option<FoundingMemberNumber> {
        self.founding_member_number
    }

    /// Activation timestamp.
    pub fn member_since(&self) -> Option<DateTime<Utc>> {
        self.member_since
    }

    /// Fit-check answers, if any were recorded.
    pub fn qualification(&self) -> Option<&QualificationAnswers> {
        self.qualification.as_ref()
    }

    /// Payment processor reference recorded at activation.
    pub fn payment_reference(&self) -> Option<&str> {
        self.payment_reference.as_deref()
    }

    /// First-write timestamp.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }
}

/// Partial profile document applied with merge semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    /// Account email.
    pub email: Option<Email>,
    /// New status.
    pub status: Option<MembershipStatus>,
    /// Allocated founding number.
    pub founding_member_number: Option<FoundingMemberNumber>,
    /// Activation timestamp.
    pub member_since: Option<DateTime<Utc>>,
    /// Fit-check answers.
    pub qualification: Option<QualificationAnswers>,
    /// Payment processor reference.
    pub payment_reference: Option<String>,
    /// First-write timestamp; ignored when the profile already has one.
    pub created_at: Option<DateTime<Utc>>,
}

impl ProfilePatch {
    /// Patch that activates a membership with the given number.
    pub fn activation(number: FoundingMemberNumber, now: DateTime<Utc>) -> Self {
        Self {
            status: Some(MembershipStatus::Active),
            founding_member_number: Some(number),
            member_since: Some(now),
            ..Self::default()
        }
    }

    /// Patch that only records fit-check answers.
    pub fn qualification(answers: QualificationAnswers) -> Self {
        Self {
            qualification: Some(answers),
            ..Self::default()
        }
    }

    /// Attach the account email.
    #[must_use]
    pub fn with_email(mut self, email: Email) -> Self {
        self.email = Some(email);
        self
    }

    /// Attach fit-check answers when present.
    #[must_use]
    pub fn with_qualification(mut self, answers: Option<QualificationAnswers>) -> Self {
        if answers.is_some() {
            self.qualification = answers;
        }
        self
    }

    /// Attach the payment processor reference.
    #[must_use]
    pub fn with_payment_reference(mut self, reference: impl Into<String>) -> Self {
        self.payment_reference = Some(reference.into());
        self
    }

    /// Stamp `created_at`.
    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }
}
