//! Access-key walkthrough against the in-memory backend.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Duration;
use interalpha_access::memory::MemoryBackend;
use interalpha_access::{Client, ClientKeyService, IssueOptions};
use interalpha_config::InterAlphaConfig;
use interalpha_types::{ActorId, ClientId};

use super::evaluator;

/// Operator recorded as issuer and revoker.
const OPERATOR: &str = "cli-operator";

pub fn run(config: &InterAlphaConfig, client: &str, ttl_hours: Option<i64>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    runtime.block_on(walkthrough(config, client, ttl_hours))
}

/// First and last four characters only.
fn masked(token: &str) -> String {
    let head = token.get(..4).unwrap_or_default();
    let tail = token.get(token.len().saturating_sub(4)..).unwrap_or_default();
    format!("{head}…{tail}")
}

async fn walkthrough(
    config: &InterAlphaConfig,
    client: &str,
    ttl_hours: Option<i64>,
) -> Result<()> {
    let backend: Arc<MemoryBackend> = Arc::new(MemoryBackend::default());
    backend
        .directory
        .insert(Client::new(client, "Cliente Demonstração").with_email("cliente@example.com"));

    let settings = config.access_settings();
    let service = ClientKeyService::new(Arc::clone(&backend), settings, evaluator()?);
    let client_id = ClientId::new(client);
    let operator = ActorId::new(OPERATOR);

    let mut options = IssueOptions::default();
    if let Some(hours) = ttl_hours {
        let ttl = Duration::try_hours(hours).context("Key lifetime out of range")?;
        options = options.with_ttl(ttl);
    }

    let issued = service.issue(&client_id, &operator, options).await?;
    println!("issued    key_id={} expires_at={}", issued.key_id, issued.expires_at);
    println!("          token={}", masked(issued.token.expose()));

    let delivery = issued
        .notification
        .await
        .context("Notification task panicked")?;
    println!(
        "delivered email={} sms={} failures={}",
        delivery.email_sent,
        delivery.sms_sent,
        delivery.failures.len()
    );

    let session = service.validate(issued.token.expose()).await?;
    println!(
        "validated client={} ({}) orders={} payments={}",
        session.client_id,
        session.client_name,
        session.permissions.can_view_orders,
        session.permissions.can_view_payments
    );

    let revoked = service.revoke(issued.token.expose(), &operator).await?;
    println!("revoked   {revoked}");

    match service.validate_public(issued.token.expose()).await {
        Ok(_) => println!("rejected  no (unexpected)"),
        Err(body) => println!("rejected  {} {}: {}", body.status, body.code, body.error),
    }

    println!("audit     {} events", backend.audit.events().len());
    Ok(())
}
