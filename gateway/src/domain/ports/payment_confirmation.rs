//! Port for the opaque "payment confirmed" signal.
//!
//! Card capture happens elsewhere. The orchestrator only awaits confirmation
//! and gates allocation on its success.

use async_trait::async_trait;

use crate::domain::Identity;

use super::define_port_error;

define_port_error! {
    /// Errors raised by payment confirmation adapters.
    pub enum PaymentError {
        /// The processor declined.
        Declined { reason: String } as Forbidden => "payment declined: {reason}",
        /// The processor could not be reached.
        Unavailable { message: String } as ServiceUnavailable => "payment processor unavailable: {message}",
    }
}

/// Successful confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    /// Processor customer reference stored on the profile.
    pub customer_reference: String,
}

/// Port confirming a member's payment.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentConfirmation: Send + Sync {
    /// Confirm payment for `identity`.
    async fn confirm(&self, identity: &Identity) -> Result<PaymentReceipt, PaymentError>;
}

/// Confirmation that succeeds immediately with a fixed reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixturePaymentConfirmation;

/// Reference returned by [`FixturePaymentConfirmation`].
pub const FIXTURE_CUSTOMER_REFERENCE: &str = "cus_fixture";

#[async_trait]
impl PaymentConfirmation for FixturePaymentConfirmation {
    async fn confirm(&self, _identity: &Identity) -> Result<PaymentReceipt, PaymentError> {
        Ok(PaymentReceipt {
            customer_reference: FIXTURE_CUSTOMER_REFERENCE.to_owned(),
        })
    }
}
