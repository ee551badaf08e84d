//! Listener - example of subscribing to events and running a background job.
//!
//! This example demonstrates:
//! - Subscribing to events from the `Connect` handler
//! - Handling named events with `.on_event()`
//! - Running a command as a background job with `bgapi`
//! - Reconnecting automatically when the server goes away
//!
//! # Running
//!
//! ```text
//! ESL_HOST=127.0.0.1 ESL_PASSWORD=ClueCon RUST_LOG=debug \
//!     cargo run --example listen
//! ```

use eventsocket_client::{Client, ControlKey};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let host = std::env::var("ESL_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let password = std::env::var("ESL_PASSWORD").unwrap_or_else(|_| "ClueCon".to_string());

    let client = Client::builder()
        .host(host)
        .password(password)
        .on_event("CHANNEL_CREATE", |event, _| {
            println!(
                "channel created: {} ({})",
                event.get("Unique-ID").unwrap_or("?"),
                event.get("Caller-Caller-ID-Number").unwrap_or("unknown caller"),
            );
        })
        .on_event("CHANNEL_HANGUP", |event, _| {
            println!(
                "channel hung up: {} cause {}",
                event.get("Unique-ID").unwrap_or("?"),
                event.get("Hangup-Cause").unwrap_or("?"),
            );
        })
        .on(ControlKey::Disconnect, |_| println!("disconnected, retrying"))
        .build();

    // Subscriptions do not survive a reconnect, so renew them on every auth
    let subscriber = client.clone();
    client.on(ControlKey::Connect, move |_| {
        println!("authenticated");

        let result = subscriber.event("CHANNEL_CREATE CHANNEL_HANGUP BACKGROUND_JOB", |reply| {
            println!("subscribed: {}", reply.success);
        });
        if let Err(e) = result {
            eprintln!("subscribe failed: {}", e);
            return;
        }

        let _ = subscriber.bgapi("status", |reply| {
            println!("status job finished (ok = {}):", reply.success);
            println!("{}", reply.text().unwrap_or_default());
        });
    });

    client.connect();

    tokio::signal::ctrl_c().await?;
    client.shutdown();

    Ok(())
}
