//! Wire-level message definitions for the member client adapter.
//!
//! Presentation layers send [`ClientEvent`]s and render [`ClientSnapshot`]s;
//! domain state is converted into these payloads before it leaves the
//! adapter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    ActivationState, AuthMode, CatalogEntry, DisplayBadge, Disclosure, Error, Profile, View,
};

/// UI-level event raised by a visitor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Request a view.
    Navigate {
        /// View asked for.
        view: View,
    },
    /// Press a "join" call to action.
    Join,
    /// Finish the fit-check questionnaire.
    #[serde(rename_all = "camelCase")]
    AnswerFitCheck {
        /// Can travel on flexible dates.
        flexible_dates: bool,
        /// Open to flexible destinations.
        flexible_destination: bool,
    },
    /// Switch the checkout identity form.
    ChooseAuthMode {
        /// Form to show.
        mode: AuthMode,
    },
    /// Submit the identity form.
    Authenticate {
        /// Form used.
        mode: AuthMode,
        /// Account email.
        email: String,
        /// Account password.
        password: String,
    },
    /// Toggle a checkout disclosure.
    Acknowledge {
        /// Disclosure toggled.
        disclosure: Disclosure,
        /// New acknowledgement value.
        acknowledged: bool,
    },
    /// Confirm payment and activate.
    Submit,
    /// Sign out.
    SignOut,
}

/// Progress of the fit-check questionnaire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FitCheckStatus {
    /// Not shown.
    #[default]
    Closed,
    /// Waiting for answers.
    Open,
    /// Answers received; the visitor is not a fit.
    NotQualified,
    /// Answers received; the visitor may check out.
    Qualified,
}

/// Checkout progress as rendered by the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CheckoutStatus {
    /// The identity form is shown.
    AwaitingIdentity {
        /// Form shown.
        mode: AuthMode,
    },
    /// Disclosures are shown.
    #[serde(rename_all = "camelCase")]
    AwaitingAgreements {
        /// Disclosures acknowledged so far.
        acknowledged: Vec<Disclosure>,
        /// Whether the submit button is enabled.
        can_submit: bool,
    },
    /// The activation sequence is running.
    Submitting,
    /// Activation finished.
    #[serde(rename_all = "camelCase")]
    Succeeded {
        /// Assigned number.
        founding_member_number: u64,
    },
    /// The attempt failed; the retry affordance is shown.
    #[serde(rename_all = "camelCase")]
    Failed {
        /// Failure to render.
        error: Error,
        /// Short retry message.
        message: String,
        /// Whether the submit button is enabled.
        can_submit: bool,
    },
}

impl CheckoutStatus {
    pub(crate) fn from_state(
        state: &ActivationState,
        mode: AuthMode,
        acknowledged: Vec<Disclosure>,
        can_submit: bool,
    ) -> Self {
        match state {
            ActivationState::AwaitingIdentity => Self::AwaitingIdentity { mode },
            ActivationState::AwaitingAgreements => Self::AwaitingAgreements {
                acknowledged,
                can_submit,
            },
            ActivationState::Submitting => Self::Submitting,
            ActivationState::Succeeded { number, .. } => Self::Succeeded {
                founding_member_number: number.get(),
            },
            ActivationState::RecoverableFailure(failure) => Self::Failed {
                error: Error::from(failure),
                message: failure.user_message(),
                can_submit,
            },
        }
    }
}

/// Member details shown on the account view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberSummary {
    /// Account email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Founding number, once active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub founding_member_number: Option<u64>,
    /// Activation time, once active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_since: Option<DateTime<Utc>>,
    /// Whether the membership is active.
    pub active: bool,
}

impl From<&Profile> for MemberSummary {
    fn from(value: &Profile) -> Self {
        Self {
            email: value.email().map(|email| email.as_ref().to_owned()),
            founding_member_number: value.founding_member_number().map(|number| number.get()),
            member_since: value.member_since(),
            active: value.is_active(),
        }
    }
}

/// Everything a presentation layer needs to render the client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSnapshot {
    /// View currently shown.
    pub view: View,
    /// Signed-in email, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_in_as: Option<String>,
    /// Signed-in member's profile summary, once loaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member: Option<MemberSummary>,
    /// Fit-check progress.
    pub fit_check: FitCheckStatus,
    /// Checkout progress.
    pub checkout: CheckoutStatus,
}

/// Catalog card ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogCard {
    /// Underlying entry.
    #[serde(flatten)]
    pub entry: CatalogEntry,
    /// Curated as a new drop.
    pub is_new_badge: bool,
    /// Lapses within the expiring window.
    pub expiring: bool,
}

impl CatalogCard {
    pub(crate) fn new(entry: CatalogEntry, badge: Option<DisplayBadge>) -> Self {
        Self {
            entry,
            is_new_badge: badge == Some(DisplayBadge::New),
            expiring: badge == Some(DisplayBadge::Expiring),
        }
    }
}
