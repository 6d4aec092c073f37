//! Periodic expiry sweep and expiration warnings.
//!
//! A run deactivates up to `batch_size` expired keys across all clients,
//! then warns owners of keys that are about to expire. Each key is warned
//! at most once per window, and within a run only through the smallest
//! window it falls in.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use interalpha_types::{ActorId, ActorType, KeyId};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::audit::{self, AuditAction, AuditEvent};
use crate::backend::Backend;
use crate::clock::Clock;
use crate::config::{CleanupConfig, NotificationConfig};
use crate::model::{ClientKeyData, DeactivationReason};
use crate::notification::{self, Template, TemplateVars};
use crate::store::{ClientDirectory, KeyStore, bounded};

/// Outcome of one cleanup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub expired_processed: usize,
    pub warnings_sent: usize,
    pub errors: Vec<String>,
}

/// Warning windows in ascending order, without zeros or repeats.
fn windows(hours: &[u32]) -> Vec<u32> {
    let mut windows: Vec<u32> = hours.iter().copied().filter(|h| *h > 0).collect();
    windows.sort_unstable();
    windows.dedup();
    windows
}

pub struct CleanupJob<B: Backend> {
    backend: Arc<B>,
    config: CleanupConfig,
    notifications: NotificationConfig,
    timeout: Duration,
    /// `(key, window)` pairs already warned.
    warned: Mutex<HashSet<(KeyId, u32)>>,
}

impl<B: Backend> CleanupJob<B> {
    pub fn new(
        backend: Arc<B>,
        config: CleanupConfig,
        notifications: NotificationConfig,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            config,
            notifications,
            timeout,
            warned: Mutex::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &CleanupConfig {
        &self.config
    }

    /// Runs one sweep and one warning pass. Failures are collected in the
    /// report; a run never aborts halfway.
    pub async fn run_once(&self) -> CleanupReport {
        let now = self.backend.clock().now();
        let mut report = CleanupReport::default();

        self.expire(now, &mut report).await;
        self.warn_expiring(now, &mut report).await;

        info!(
            expired = report.expired_processed,
            warnings = report.warnings_sent,
            errors = report.errors.len(),
            "Client key cleanup finished"
        );
        report
    }

    async fn expire(&self, now: DateTime<Utc>, report: &mut CleanupReport) {
        let store = self.backend.store();
        let expired = match bounded(
            "find_expired",
            self.timeout,
            store.find_expired(now, self.config.batch_size),
        )
        .await
        {
            Ok(expired) => expired,
            Err(e) => {
                warn!(error = %e, "Could not list expired keys");
                report.errors.push(format!("find_expired: {e}"));
                return;
            }
        };

        for record in expired {
            let deactivated = bounded(
                "deactivate",
                self.timeout,
                store.deactivate(record.id, DeactivationReason::Expired, now),
            )
            .await;
            match deactivated {
                Ok(true) => {
                    report.expired_processed += 1;
                    let event = AuditEvent::new(
                        ActorId::system(),
                        ActorType::System,
                        AuditAction::KeyExpired,
                        record.client_id.clone(),
                        now,
                    )
                    .with_key(record.id)
                    .with_meta("expired_at", record.expires_at.to_rfc3339());
                    audit::record(self.backend.audit(), event).await;
                }
                Ok(false) => {}
                Err(e) => report.errors.push(format!("deactivate {}: {e}", record.id)),
            }
        }
    }

    async fn warn_expiring(&self, now: DateTime<Utc>, report: &mut CleanupReport) {
        let mut seen: HashSet<KeyId> = HashSet::new();

        for hours in windows(&self.config.warning_hours) {
            let until = ChronoDuration::try_hours(i64::from(hours))
                .and_then(|window| now.checked_add_signed(window));
            let Some(until) = until else {
                warn!(hours, "Warning window out of range");
                report.errors.push(format!("warning window {hours}h out of range"));
                continue;
            };
            let expiring = match bounded(
                "find_expiring_between",
                self.timeout,
                self.backend.store().find_expiring_between(now, until),
            )
            .await
            {
                Ok(expiring) => expiring,
                Err(e) => {
                    report.errors.push(format!("find_expiring_between {hours}h: {e}"));
                    continue;
                }
            };

            for record in expiring {
                // Covered by a smaller window earlier in this run.
                let first_seen = seen.insert(record.id);
                if !self.mark_warned(record.id, hours) || !first_seen {
                    continue;
                }
                if self.send_warning(&record, hours, report).await {
                    report.warnings_sent += 1;
                }
            }
        }

        if !self.config.warning_hours.is_empty() {
            self.lock_warned().retain(|(id, _)| seen.contains(id));
        }
    }

    /// Records `(id, hours)` as warned. Returns false if it already was.
    fn mark_warned(&self, id: KeyId, hours: u32) -> bool {
        self.lock_warned().insert((id, hours))
    }

    fn lock_warned(&self) -> std::sync::MutexGuard<'_, HashSet<(KeyId, u32)>> {
        self.warned.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn send_warning(
        &self,
        record: &ClientKeyData,
        hours: u32,
        report: &mut CleanupReport,
    ) -> bool {
        let directory = self.backend.directory();
        let lookup = bounded("find_client", self.timeout, directory.find(&record.client_id));
        let client = match lookup.await {
            Ok(Some(client)) => client,
            Ok(None) => {
                debug!(client_id = %record.client_id, "Skipping warning for unknown client");
                return false;
            }
            Err(e) => {
                report.errors.push(format!("find_client {}: {e}", record.client_id));
                return false;
            }
        };

        let vars = TemplateVars::expiration_warning(
            &client,
            record.expires_at,
            hours,
            &self.notifications,
        );
        let delivery = notification::deliver(
            self.backend.notifier(),
            &client,
            Template::ExpirationWarning,
            &vars,
            self.notifications.sms_enabled,
        )
        .await;
        report.errors.extend(
            delivery
                .failures
                .iter()
                .map(|f| format!("warning {}: {f}", record.id)),
        );
        delivery.any_sent()
    }

    /// Starts the periodic loop. The first run happens immediately.
    ///
    /// Returns an idle handle when the job is disabled. Dropping the handle
    /// stops the loop after the current run.
    pub fn spawn(self: Arc<Self>) -> CleanupHandle {
        if !self.config.enabled {
            debug!("Client key cleanup disabled");
            return CleanupHandle {
                stop: None,
                task: None,
            };
        }

        let period = self.config.interval().max(Duration::from_secs(1));
        let (stop, mut stopped) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut tick = interval(period);
            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!(period_secs = period.as_secs(), "Client key cleanup started");

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        self.run_once().await;
                    }
                    _ = &mut stopped => {
                        info!("Client key cleanup stopped");
                        break;
                    }
                }
            }
        });

        CleanupHandle {
            stop: Some(stop),
            task: Some(task),
        }
    }
}

/// Control handle for a spawned [`CleanupJob`].
#[derive(Debug)]
pub struct CleanupHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl CleanupHandle {
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signals the loop and waits for it to exit.
    pub async fn stop(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Cleanup task ended abnormally");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_are_sorted_and_deduplicated() {
        assert_eq!(windows(&[4, 1, 4, 0, 24]), vec![1, 4, 24]);
        assert!(windows(&[]).is_empty());
        assert!(windows(&[0]).is_empty());
    }
}
