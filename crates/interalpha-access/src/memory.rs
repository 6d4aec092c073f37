//! In-process collaborators.
//!
//! Used by tests and by the CLI demo. Not durable: everything lives in
//! process memory and disappears on drop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use interalpha_crypto::KeyHash;
use interalpha_types::{ClientId, KeyId};

use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::backend::Collaborators;
use crate::clock::SystemClock;
use crate::error::StoreError;
use crate::model::{Client, ClientKeyData, DeactivationReason, KeyMetadata};
use crate::notification::{self, NotificationDispatcher, NotificationError, Template, TemplateVars};
use crate::store::{ClientDirectory, KeyStore};

/// All in-memory collaborators, parameterized by clock.
pub type MemoryBackend<C = SystemClock> =
    Collaborators<MemoryKeyStore, MemoryDirectory, RecordingDispatcher, MemoryAuditSink, C>;

fn poisoned() -> StoreError {
    StoreError::Unavailable("in-memory store lock poisoned".to_string())
}

// ============================================================================
// Key store
// ============================================================================

#[derive(Debug, Default)]
struct Records {
    by_id: HashMap<KeyId, ClientKeyData>,
    by_hash: HashMap<KeyHash, KeyId>,
}

/// Key store backed by two hash maps, with fault injection.
#[derive(Debug, Default)]
pub struct MemoryKeyStore {
    records: RwLock<Records>,
    unavailable: AtomicBool,
    deactivate_failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes only `deactivate` fail with [`StoreError::Unavailable`].
    pub fn set_deactivate_failing(&self, failing: bool) {
        self.deactivate_failing.store(failing, Ordering::SeqCst);
    }

    /// Delays every call by `delay` before it touches the maps.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    pub fn len(&self) -> usize {
        self.records.read().map_or(0, |r| r.by_id.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every record, in no particular order.
    pub fn records(&self) -> Vec<ClientKeyData> {
        self.records
            .read()
            .map(|r| r.by_id.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn gate(&self) -> Result<(), StoreError> {
        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("key store offline".to_string()));
        }
        Ok(())
    }

    fn select<F>(&self, keep: F) -> Result<Vec<ClientKeyData>, StoreError>
    where
        F: Fn(&ClientKeyData) -> bool,
    {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.by_id.values().filter(|r| keep(r)).cloned().collect())
    }
}

impl KeyStore for MemoryKeyStore {
    async fn create(&self, record: ClientKeyData) -> Result<(), StoreError> {
        self.gate().await?;
        let mut records = self.records.write().map_err(|_| poisoned())?;
        if records.by_id.contains_key(&record.id) {
            return Err(StoreError::Duplicate(format!("key id {}", record.id)));
        }
        if records.by_hash.contains_key(&record.key_hash) {
            return Err(StoreError::Duplicate("key hash".to_string()));
        }
        records.by_hash.insert(record.key_hash, record.id);
        records.by_id.insert(record.id, record);
        Ok(())
    }

    async fn find_by_id(&self, id: KeyId) -> Result<Option<ClientKeyData>, StoreError> {
        self.gate().await?;
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.by_id.get(&id).cloned())
    }

    async fn find_by_hash(&self, hash: &KeyHash) -> Result<Option<ClientKeyData>, StoreError> {
        self.gate().await?;
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records
            .by_hash
            .get(hash)
            .and_then(|id| records.by_id.get(id))
            .cloned())
    }

    async fn count_active_by_client(
        &self,
        client_id: &ClientId,
        now: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        self.gate().await?;
        Ok(self
            .select(|r| &r.client_id == client_id && r.is_live_at(now))?
            .len())
    }

    async fn find_active_by_client(
        &self,
        client_id: &ClientId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ClientKeyData>, StoreError> {
        self.gate().await?;
        let mut live = self.select(|r| &r.client_id == client_id && r.is_live_at(now))?;
        live.sort_by_key(|r| r.issued_at);
        Ok(live)
    }

    async fn find_expired_by_client(
        &self,
        client_id: &ClientId,
        now: DateTime<Utc>,
    ) -> Result<Vec<ClientKeyData>, StoreError> {
        self.gate().await?;
        self.select(|r| &r.client_id == client_id && r.is_stale_at(now))
    }

    async fn find_expired(
        &self,
        now: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<ClientKeyData>, StoreError> {
        self.gate().await?;
        let mut stale = self.select(|r| r.is_stale_at(now))?;
        stale.sort_by_key(|r| r.expires_at);
        stale.truncate(limit);
        Ok(stale)
    }

    async fn find_expiring_between(
        &self,
        now: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ClientKeyData>, StoreError> {
        self.gate().await?;
        let mut expiring =
            self.select(|r| r.active && r.expires_at > now && r.expires_at <= until)?;
        expiring.sort_by_key(|r| r.expires_at);
        Ok(expiring)
    }

    async fn deactivate(
        &self,
        id: KeyId,
        reason: DeactivationReason,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.gate().await?;
        if self.deactivate_failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("deactivate rejected".to_string()));
        }
        let mut records = self.records.write().map_err(|_| poisoned())?;
        Ok(records
            .by_id
            .get_mut(&id)
            .is_some_and(|r| r.deactivate(reason, at)))
    }

    async fn record_usage(
        &self,
        id: KeyId,
        at: DateTime<Utc>,
        session: Option<KeyMetadata>,
    ) -> Result<Option<ClientKeyData>, StoreError> {
        self.gate().await?;
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let Some(record) = records.by_id.get_mut(&id).filter(|r| r.active) else {
            return Ok(None);
        };
        record.usage_count += 1;
        record.last_used_at = Some(at);
        if let Some(session) = session {
            record.metadata.merge(session);
        }
        Ok(Some(record.clone()))
    }
}

// ============================================================================
// Client directory
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryDirectory {
    clients: RwLock<HashMap<ClientId, Client>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, client: Client) {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(client.id.clone(), client);
    }

    pub fn remove(&self, id: &ClientId) -> Option<Client> {
        self.clients
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }
}

impl FromIterator<Client> for MemoryDirectory {
    fn from_iter<I: IntoIterator<Item = Client>>(iter: I) -> Self {
        let directory = Self::new();
        for client in iter {
            directory.insert(client);
        }
        directory
    }
}

impl ClientDirectory for MemoryDirectory {
    async fn find(&self, id: &ClientId) -> Result<Option<Client>, StoreError> {
        let clients = self.clients.read().map_err(|_| poisoned())?;
        Ok(clients.get(id).cloned())
    }
}

// ============================================================================
// Notifications
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Sms,
}

/// A message as the dispatcher rendered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub channel: Channel,
    pub to: String,
    pub template: Template,
    /// Email subject; `None` for SMS.
    pub subject: Option<String>,
    pub body: String,
}

/// Dispatcher that renders and keeps every message instead of sending it.
#[derive(Debug, Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<SentMessage>>,
    fail_email: AtomicBool,
    fail_sms: AtomicBool,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn fail_email(&self, fail: bool) {
        self.fail_email.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sms(&self, fail: bool) {
        self.fail_sms.store(fail, Ordering::SeqCst);
    }

    fn push(&self, message: SentMessage) {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }
}

impl NotificationDispatcher for RecordingDispatcher {
    async fn send_email(
        &self,
        to: &str,
        template: Template,
        vars: &TemplateVars,
    ) -> Result<(), NotificationError> {
        if self.fail_email.load(Ordering::SeqCst) {
            return Err(NotificationError("smtp relay refused the message".to_string()));
        }
        let content = template.content();
        self.push(SentMessage {
            channel: Channel::Email,
            to: to.to_string(),
            template,
            subject: Some(notification::render(content.subject, vars)),
            body: notification::render(content.text, vars),
        });
        Ok(())
    }

    async fn send_sms(
        &self,
        to: &str,
        template: Template,
        vars: &TemplateVars,
    ) -> Result<(), NotificationError> {
        if self.fail_sms.load(Ordering::SeqCst) {
            return Err(NotificationError("sms gateway unreachable".to_string()));
        }
        self.push(SentMessage {
            channel: Channel::Sms,
            to: to.to_string(),
            template,
            subject: None,
            body: notification::render(template.content().sms, vars),
        });
        Ok(())
    }
}

// ============================================================================
// Audit
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
    failing: AtomicBool,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Actions in the order they were logged.
    pub fn actions(&self) -> Vec<AuditAction> {
        self.events().iter().map(|e| e.action).collect()
    }

    /// Makes every write fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl AuditSink for MemoryAuditSink {
    async fn log_action(&self, event: AuditEvent) -> Result<(), StoreError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("audit log offline".to_string()));
        }
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}
