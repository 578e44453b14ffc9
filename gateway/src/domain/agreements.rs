//! Checkout disclosures a visitor must acknowledge before submitting.
//!
//! This is a client-side gate rather than a security boundary; it only
//! decides whether `Submit` is allowed to start the activation sequence.

use serde::{Deserialize, Serialize};

/// One of the fixed disclosure terms shown at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disclosure {
    /// Taxes and fees on booked trips are owed by the member.
    Taxes,
    /// Offer availability is not guaranteed.
    Availability,
    /// Membership billing is non-refundable.
    NoRefund,
}

impl Disclosure {
    /// Every disclosure that must be acknowledged.
    pub const ALL: [Self; 3] = [Self::Taxes, Self::Availability, Self::NoRefund];
}

/// Acknowledgement state for the checkout disclosures.
///
/// # Examples
/// ```
/// use gateway::domain::{Agreements, Disclosure};
///
/// let mut agreements = Agreements::default();
/// for disclosure in Disclosure::ALL {
///     agreements.set(disclosure, true);
/// }
/// assert!(agreements.all_acknowledged());
/// agreements.set(Disclosure::NoRefund, false);
/// assert!(!agreements.all_acknowledged());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agreements {
    taxes: bool,
    availability: bool,
    no_refund: bool,
}

impl Agreements {
    /// Record whether `disclosure` is acknowledged.
    pub fn set(&mut self, disclosure: Disclosure, acknowledged: bool) {
        match disclosure {
            Disclosure::Taxes => self.taxes = acknowledged,
            Disclosure::Availability => self.availability = acknowledged,
            Disclosure::NoRefund => self.no_refund = acknowledged,
        }
    }

    /// Current acknowledgement for `disclosure`.
    pub const fn is_acknowledged(&self, disclosure: Disclosure) -> bool {
        match disclosure {
            Disclosure::Taxes => self.taxes,
            Disclosure::Availability => self.availability,
            Disclosure::NoRefund => self.no_refund,
        }
    }

    /// True only when every disclosure is acknowledged.
    pub const fn all_acknowledged(&self) -> bool {
        self.taxes && self.availability && self.no_refund
    }
}
