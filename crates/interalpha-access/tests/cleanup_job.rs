//! Periodic cleanup: expiry sweep, warning windows, spawn/stop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use interalpha_access::memory::MemoryBackend;
use interalpha_access::{
    AccessSettings, AuditAction, CleanupConfig, CleanupJob, Client, ClientKeyService, Clock,
    DeactivationReason, IssueOptions, KeyIssuer, KeyStore, ManualClock, NotificationConfig,
    Template,
};
use interalpha_rbac::PermissionEvaluator;
use interalpha_types::{ActorId, ActorType, ClientId};

type Backend = MemoryBackend<ManualClock>;

fn backend() -> Arc<Backend> {
    let backend = Arc::new(Backend::default());
    backend
        .directory
        .insert(Client::new("c-1", "Maria Souza").with_email("maria@example.com"));
    backend
}

fn job(backend: &Arc<Backend>, config: CleanupConfig) -> CleanupJob<Backend> {
    CleanupJob::new(
        Arc::clone(backend),
        config,
        NotificationConfig::default(),
        Duration::from_secs(2),
    )
}

async fn issue(backend: &Arc<Backend>, ttl: ChronoDuration) {
    let settings = AccessSettings::default();
    let issuer = KeyIssuer::new(
        Arc::clone(backend),
        settings.access_keys,
        settings.notifications,
    );
    let issued = issuer
        .issue(
            &ClientId::new("c-1"),
            &ActorId::new("emp-1"),
            IssueOptions::default().with_ttl(ttl),
        )
        .await
        .unwrap();
    issued.notification.await.unwrap();
}

fn warnings(backend: &Backend) -> usize {
    backend
        .notifier
        .sent()
        .iter()
        .filter(|m| m.template == Template::ExpirationWarning)
        .count()
}

#[tokio::test]
async fn expired_keys_are_deactivated_and_audited() {
    let backend = backend();
    issue(&backend, ChronoDuration::hours(1)).await;
    issue(&backend, ChronoDuration::hours(1)).await;
    issue(&backend, ChronoDuration::hours(48)).await;
    backend.clock.advance(ChronoDuration::hours(2));

    let job = job(&backend, CleanupConfig::default());
    let report = job.run_once().await;
    assert_eq!(report.expired_processed, 2);
    assert!(report.errors.is_empty());

    let expired: Vec<_> = backend
        .store
        .records()
        .into_iter()
        .filter(|r| r.deactivation_reason() == Some(DeactivationReason::Expired))
        .collect();
    assert_eq!(expired.len(), 2);

    let audits: Vec<_> = backend
        .audit
        .events()
        .into_iter()
        .filter(|e| e.action == AuditAction::KeyExpired)
        .collect();
    assert_eq!(audits.len(), 2);
    assert!(audits.iter().all(|e| e.actor_type == ActorType::System));
    assert!(audits.iter().all(|e| e.actor_id.as_str() == ActorId::SYSTEM));

    // Nothing left on the second pass.
    assert_eq!(job.run_once().await.expired_processed, 0);
}

#[tokio::test]
async fn batch_size_bounds_one_run() {
    let backend = backend();
    for _ in 0..3 {
        issue(&backend, ChronoDuration::hours(1)).await;
    }
    backend.clock.advance(ChronoDuration::hours(2));

    let job = job(
        &backend,
        CleanupConfig {
            batch_size: 2,
            ..CleanupConfig::default()
        },
    );
    assert_eq!(job.run_once().await.expired_processed, 2);
    assert_eq!(job.run_once().await.expired_processed, 1);
}

#[tokio::test]
async fn each_window_warns_once() {
    let backend = backend();
    issue(&backend, ChronoDuration::hours(3)).await;
    let job = job(&backend, CleanupConfig::default());

    // 3h left: inside the 4h window only.
    assert_eq!(job.run_once().await.warnings_sent, 1);
    assert_eq!(job.run_once().await.warnings_sent, 0);

    // 30min left: the 1h window fires.
    backend.clock.advance(ChronoDuration::minutes(150));
    assert_eq!(job.run_once().await.warnings_sent, 1);
    assert_eq!(job.run_once().await.warnings_sent, 0);

    assert_eq!(warnings(&backend), 2);
    let body = backend
        .notifier
        .sent()
        .into_iter()
        .rev()
        .find(|m| m.template == Template::ExpirationWarning)
        .unwrap();
    assert_eq!(
        body.subject.as_deref(),
        Some("Sua chave de acesso expira em 1 horas")
    );
    assert!(body.body.contains("/request-access"));
}

#[tokio::test]
async fn key_inside_several_windows_gets_one_warning() {
    let backend = backend();
    issue(&backend, ChronoDuration::minutes(30)).await;
    let job = job(&backend, CleanupConfig::default());

    let report = job.run_once().await;
    assert_eq!(report.warnings_sent, 1);
    assert_eq!(job.run_once().await.warnings_sent, 0);
    assert_eq!(warnings(&backend), 1);
}

#[tokio::test]
async fn oversized_window_is_reported_and_skipped() {
    let backend = backend();
    issue(&backend, ChronoDuration::minutes(30)).await;
    let config = CleanupConfig {
        warning_hours: vec![u32::MAX, 1],
        ..CleanupConfig::default()
    };

    let report = job(&backend, config).run_once().await;
    assert_eq!(report.warnings_sent, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("out of range"));
}

#[tokio::test]
async fn revoked_keys_are_not_warned() {
    let backend = backend();
    issue(&backend, ChronoDuration::hours(2)).await;
    let id = backend.store.records()[0].id;
    let now = backend.clock.now();
    assert!(
        backend
            .store
            .deactivate(id, DeactivationReason::Revoked, now)
            .await
            .unwrap()
    );

    let report = job(&backend, CleanupConfig::default()).run_once().await;
    assert_eq!(report.warnings_sent, 0);
    assert_eq!(report.expired_processed, 0);
}

#[tokio::test]
async fn store_outage_is_reported_not_fatal() {
    let backend = backend();
    issue(&backend, ChronoDuration::hours(1)).await;
    backend.store.set_unavailable(true);

    let report = job(&backend, CleanupConfig::default()).run_once().await;
    assert_eq!(report.expired_processed, 0);
    assert_eq!(report.warnings_sent, 0);
    // One listing failure plus one per warning window.
    assert_eq!(report.errors.len(), 3);
}

#[tokio::test]
async fn disabled_job_does_not_spawn() {
    let backend = backend();
    let job = Arc::new(job(
        &backend,
        CleanupConfig {
            enabled: false,
            ..CleanupConfig::default()
        },
    ));
    let handle = job.spawn();
    assert!(!handle.is_running());
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn spawned_job_runs_until_stopped() {
    let backend = backend();
    issue(&backend, ChronoDuration::hours(1)).await;
    backend.clock.advance(ChronoDuration::hours(2));

    let job = Arc::new(job(&backend, CleanupConfig::default()));
    let handle = Arc::clone(&job).spawn();
    assert!(handle.is_running());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(backend.audit.actions().contains(&AuditAction::KeyExpired));

    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn service_runs_and_schedules_cleanup() {
    let backend = backend();
    let service = ClientKeyService::new(
        Arc::clone(&backend),
        AccessSettings::default(),
        PermissionEvaluator::standard().unwrap(),
    );
    issue(&backend, ChronoDuration::hours(1)).await;
    issue(&backend, ChronoDuration::hours(1)).await;
    backend.clock.advance(ChronoDuration::hours(2));

    let report = service.run_cleanup().await;
    assert_eq!(report.expired_processed, 2);

    issue(&backend, ChronoDuration::hours(1)).await;
    backend.clock.advance(ChronoDuration::hours(2));

    let handle = service.start_cleanup();
    assert!(handle.is_running());
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(backend.store.records().iter().all(|r| !r.active));
    handle.stop().await;
}
