//! Shared helpers for the gateway integration suites.

#![allow(dead_code, reason = "each suite uses a different subset")]

use gateway::domain::{AuthMode, Disclosure};
use gateway::inbound::client::{CheckoutStatus, ClientEvent, ClientSnapshot, MemberClient};
use gateway::test_support::{fast_settings, fixture_clock};
use gateway::wiring::Gateway;

/// Password accepted by the in-memory identity provider.
pub const PASSWORD: &str = "hunter22";

/// In-memory gateway with instant payment confirmation.
pub fn in_memory_gateway() -> Gateway {
    Gateway::in_memory(&fast_settings(), fixture_clock())
}

/// Submit the identity form.
pub async fn authenticate(client: &mut MemberClient, mode: AuthMode, email: &str) -> ClientSnapshot {
    client
        .handle(ClientEvent::Authenticate {
            mode,
            email: email.to_owned(),
            password: PASSWORD.to_owned(),
        })
        .await
        .expect("identity form accepted")
}

/// Drive `client` through the fit check, sign-up and every disclosure.
pub async fn ready_to_submit(client: &mut MemberClient, email: &str) -> ClientSnapshot {
    client.handle(ClientEvent::Join).await.expect("join");
    client
        .handle(ClientEvent::AnswerFitCheck {
            flexible_dates: true,
            flexible_destination: true,
        })
        .await
        .expect("fit check");
    let mut snapshot = authenticate(client, AuthMode::SignUp, email).await;
    for disclosure in Disclosure::ALL {
        snapshot = client
            .handle(ClientEvent::Acknowledge {
                disclosure,
                acknowledged: true,
            })
            .await
            .expect("acknowledge");
    }
    snapshot
}

/// Sign up and activate `email`.
pub async fn activated(client: &mut MemberClient, email: &str) -> ClientSnapshot {
    ready_to_submit(client, email).await;
    client.handle(ClientEvent::Submit).await.expect("submit")
}

/// Number shown by a succeeded checkout.
pub fn succeeded_number(snapshot: &ClientSnapshot) -> Option<u64> {
    match snapshot.checkout {
        CheckoutStatus::Succeeded {
            founding_member_number,
        } => Some(founding_member_number),
        _ => None,
    }
}
