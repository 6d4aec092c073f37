//! # interalpha-access: Client access keys
//!
//! Short-lived bearer keys that let a repair-shop client open the portal
//! without an account.
//!
//! ## Lifecycle
//!
//! ```text
//!  issue ──▶ ACTIVE ──validate──▶ ACTIVE (usage_count + 1)
//!              │
//!              ├── now > expires_at ──▶ EXPIRED  (sticky)
//!              └── revoke ────────────▶ REVOKED  (idempotent)
//! ```
//!
//! Neither terminal state is ever left. A client holds at most
//! `max_active_keys` live keys; the check and the insert are serialized
//! per client.
//!
//! ## Secrets
//!
//! Only the SHA-256 digest of a key is stored. The raw token exists in the
//! [`IssuedKey`] returned by issuance and in the notification sent to the
//! client, and nowhere else. Logs and audit events carry the record id.
//!
//! ## Collaborators
//!
//! Persistence, client lookup, delivery and auditing are traits
//! ([`KeyStore`], [`ClientDirectory`], [`NotificationDispatcher`],
//! [`AuditSink`], [`Clock`]) bundled by a [`Backend`]. [`memory`] has
//! in-process versions of each.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use interalpha_access::memory::MemoryBackend;
//! use interalpha_access::{AccessSettings, Client, ClientKeyService, IssueOptions};
//! use interalpha_rbac::PermissionEvaluator;
//! use interalpha_types::{ActorId, ClientId};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let backend: Arc<MemoryBackend> = Arc::new(MemoryBackend::default());
//! backend.directory.insert(Client::new("c-1", "Maria").with_email("maria@example.com"));
//!
//! let evaluator = PermissionEvaluator::standard().unwrap();
//! let service = ClientKeyService::new(backend, AccessSettings::default(), evaluator);
//!
//! let issued = service
//!     .issue(&ClientId::new("c-1"), &ActorId::new("emp-7"), IssueOptions::default())
//!     .await
//!     .unwrap();
//!
//! let session = service.validate(issued.token.expose()).await.unwrap();
//! assert_eq!(session.client_name, "Maria");
//! # }
//! ```

pub mod audit;
pub mod backend;
pub mod cleanup;
pub mod clock;
pub mod config;
pub mod error;
pub mod issuer;
pub mod lifecycle;
mod locks;
pub mod memory;
pub mod model;
pub mod notification;
pub mod service;
pub mod store;
pub mod validator;

pub use audit::{AuditAction, AuditEvent, AuditResult, AuditSink};
pub use backend::{Backend, Collaborators};
pub use cleanup::{CleanupHandle, CleanupJob, CleanupReport};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AccessKeyConfig, AccessSettings, CleanupConfig, NotificationConfig};
pub use error::{AccessError, PublicKeyError, Result, StoreError};
pub use issuer::KeyIssuer;
pub use lifecycle::KeyLifecycleManager;
pub use model::{
    Client, ClientKeyData, ClientPermissions, Deactivation, DeactivationReason, IssueOptions,
    IssuedKey, KeyMetadata, KeySession, KeyUsageStats, NotificationPreferences,
    PermissionOverrides,
};
pub use notification::{Delivery, NotificationDispatcher, NotificationError, Template};
pub use service::ClientKeyService;
pub use store::{ClientDirectory, KeyStore};
pub use validator::KeyValidator;
