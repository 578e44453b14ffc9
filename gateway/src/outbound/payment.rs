//! Simulated payment confirmation.
//!
//! Card capture is handled by the payment processor. This adapter stands in
//! for its "payment confirmed" signal: it waits a fixed delay and succeeds
//! with a fixed customer reference.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ports::{PaymentConfirmation, PaymentError, PaymentReceipt};
use crate::domain::Identity;

/// Customer reference returned by [`SimulatedPaymentGateway`].
pub const SIMULATED_CUSTOMER_REFERENCE: &str = "cus_simulated_123";

/// Payment gateway that always confirms after `delay`.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedPaymentGateway {
    delay: Duration,
}

impl SimulatedPaymentGateway {
    /// Confirm after `delay`.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl PaymentConfirmation for SimulatedPaymentGateway {
    async fn confirm(&self, identity: &Identity) -> Result<PaymentReceipt, PaymentError> {
        tokio::time::sleep(self.delay).await;
        debug!(user_id = %identity.id(), "simulated payment confirmed");
        Ok(PaymentReceipt {
            customer_reference: SIMULATED_CUSTOMER_REFERENCE.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Email, UserId};

    #[tokio::test]
    async fn confirms_after_the_configured_delay() {
        let gateway = SimulatedPaymentGateway::new(Duration::from_millis(20));
        let identity = Identity::new(
            UserId::random(),
            Email::new("ada@example.com").expect("valid email"),
        );
        let started = tokio::time::Instant::now();

        let receipt = gateway.confirm(&identity).await.expect("confirmed");

        assert_eq!(receipt.customer_reference, SIMULATED_CUSTOMER_REFERENCE);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
