//! Concurrent load driver for the point service
//!
//! Usage: `point-load [users] [charges_per_user]`
//!
//! Fires `charges_per_user` concurrent one-point charges at each of `users`
//! identities, checks every balance and history length, then prints the
//! Prometheus metrics.

use point_core::{Config, PointService};
use prometheus::{Encoder, TextEncoder};
use std::error::Error;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let users: i64 = args.next().map(|a| a.parse()).transpose()?.unwrap_or(10);
    let per_user: u64 = args.next().map(|a| a.parse()).transpose()?.unwrap_or(100);

    let config = Config::from_env()?;
    let service = Arc::new(PointService::open(&config)?);
    tracing::info!(users, per_user, "Starting point load run");

    let started = std::time::Instant::now();
    let mut handles = Vec::new();
    for user in 1..=users {
        for _ in 0..per_user {
            let service = service.clone();
            handles.push(tokio::spawn(async move { service.charge_point(user, 1).await }));
        }
    }

    let mut rejected = 0u64;
    for handle in handles {
        if handle.await?.is_err() {
            rejected += 1;
        }
    }
    tracing::info!(elapsed = ?started.elapsed(), rejected, "Load run finished");

    for user in 1..=users {
        let point = service.get_point(user).await?;
        let history = service.get_history(user).await?;
        if point.point != history.len() as u64 {
            tracing::error!(
                user,
                balance = point.point,
                entries = history.len(),
                "Balance does not match history"
            );
        }
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&service.metrics().registry().gather(), &mut buffer)?;
    println!("{}", String::from_utf8(buffer)?);

    Ok(())
}
