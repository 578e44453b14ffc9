//! Run concurrent member activations and verify founding numbers are gap free.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;
use std::io;
use std::sync::Arc;

use clap::Parser;
use gateway::GatewaySettings;
use gateway::domain::{AuthMode, Disclosure, View};
use gateway::inbound::client::{CheckoutStatus, ClientEvent};
use gateway::telemetry::init_tracing;
use gateway::wiring::Gateway;
use mockable::DefaultClock;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tokio::task::JoinSet;
use tracing::{info, warn};

const LOAD_PASSWORD: &str = "load-test-password";

/// `founding-load` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "founding-load",
    about = "Activate many members concurrently and check the founding numbers",
    version
)]
struct CliArgs {
    /// Number of concurrent sign-ups.
    #[arg(long = "signups", value_name = "count", default_value_t = 20)]
    signups: u64,
    /// Database connection URL. In-memory storage is used when omitted.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

fn main() -> io::Result<()> {
    let runtime = Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|error| io::Error::other(format!("create Tokio runtime: {error}")))?;
    runtime.block_on(async_main())
}

async fn async_main() -> io::Result<()> {
    let args = CliArgs::try_parse().map_err(io::Error::other)?;
    let mut settings = GatewaySettings::load_from_iter([OsString::from("founding-load")])
        .map_err(|error| io::Error::other(format!("load settings: {error}")))?;
    if args.database_url.is_some() {
        settings.database_url = args.database_url;
    }
    init_tracing(settings.log_format());

    let gateway = Gateway::from_settings(&settings, Arc::new(DefaultClock))
        .await
        .map_err(|error| io::Error::other(format!("wire gateway: {error}")))?;
    let gateway = Arc::new(gateway);
    let before = gateway
        .state()
        .allocator
        .tally()
        .await
        .map_err(|error| io::Error::other(format!("read counter: {error}")))?;
    info!(signups = args.signups, claimed = before.claimed, "starting founding load");

    let mut tasks = JoinSet::new();
    for index in 0..args.signups {
        tasks.spawn(activate_member(Arc::clone(&gateway), index));
    }

    let mut numbers = Vec::new();
    let mut failures = 0_u64;
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(Ok(number)) => numbers.push(number),
            Ok(Err(message)) => {
                warn!(error = %message, "activation failed");
                failures += 1;
            }
            Err(error) => {
                warn!(error = %error, "activation task failed");
                failures += 1;
            }
        }
    }
    numbers.sort_unstable();

    let expected: Vec<u64> = (before.claimed + 1..=before.claimed + args.signups).collect();
    let after = gateway
        .state()
        .allocator
        .tally()
        .await
        .map_err(|error| io::Error::other(format!("read counter: {error}")))?;

    println!(
        "numbers={}",
        numbers
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",")
    );
    println!("failures={failures}");
    println!("tally={after}");

    if numbers != expected {
        println!("check=failed");
        return Err(io::Error::other(format!(
            "expected founding numbers {}..={}, got {} distinct of {} requested",
            before.claimed + 1,
            before.claimed + args.signups,
            count_distinct(&numbers),
            args.signups
        )));
    }
    println!("check=ok");
    Ok(())
}

async fn activate_member(gateway: Arc<Gateway>, index: u64) -> Result<u64, String> {
    let mut client = gateway.client(View::Landing).await;
    let events = [
        ClientEvent::Join,
        ClientEvent::AnswerFitCheck {
            flexible_dates: true,
            flexible_destination: true,
        },
        ClientEvent::Authenticate {
            mode: AuthMode::SignUp,
            email: format!("founding-load-{index}@example.com"),
            password: LOAD_PASSWORD.to_owned(),
        },
    ];
    for event in events {
        client.handle(event).await.map_err(|error| error.to_string())?;
    }
    for disclosure in Disclosure::ALL {
        client
            .handle(ClientEvent::Acknowledge {
                disclosure,
                acknowledged: true,
            })
            .await
            .map_err(|error| error.to_string())?;
    }

    let snapshot = client
        .handle(ClientEvent::Submit)
        .await
        .map_err(|error| error.to_string())?;
    match snapshot.checkout {
        CheckoutStatus::Succeeded {
            founding_member_number,
        } => Ok(founding_member_number),
        CheckoutStatus::Failed { message, .. } => Err(message),
        other => Err(format!("unexpected checkout state {other:?}")),
    }
}

fn count_distinct(numbers: &[u64]) -> usize {
    let mut distinct = numbers.to_vec();
    distinct.dedup();
    distinct.len()
}
