//! Audit retention sweep
//!
//! Periodically deletes audit entries older than the configured retention.

use chrono::Duration;
use teambot_common::AuditConfig;
use teambot_service::{AuditService, ServiceContext};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Spawn the sweep; it runs once immediately and then every
/// `sweep_interval` until `shutdown` flips to `true` or its sender drops.
pub fn spawn_retention_sweep(
    ctx: ServiceContext,
    config: AuditConfig,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let Some(retention) = Duration::try_days(config.retention_days) else {
            warn!(retention_days = config.retention_days, "Retention out of range, sweep disabled");
            return;
        };
        let mut interval = tokio::time::interval(config.sweep_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(retention_days = config.retention_days, "Retention sweep started");
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match AuditService::new(&ctx).prune_expired(retention).await {
                        Ok(deleted) => debug!(deleted, "Retention sweep finished"),
                        Err(e) => warn!(error = %e, error_code = e.error_code(), "Retention sweep failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Retention sweep stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use chrono::Utc;
    use teambot_core::entities::{LogEntry, OperationType};
    use teambot_db::{MemoryOperationLogRepository, MemoryStore};
    use teambot_service::ServiceContextBuilder;

    fn setup() -> (ServiceContext, Arc<MemoryOperationLogRepository>) {
        let logs = Arc::new(MemoryOperationLogRepository::new());
        let ctx = ServiceContextBuilder::new()
            .memory_store(Arc::new(MemoryStore::new()))
            .memory_log(logs.clone())
            .build()
            .unwrap();
        (ctx, logs)
    }

    #[tokio::test]
    async fn test_sweep_prunes_and_stops_on_shutdown() {
        let (ctx, logs) = setup();
        let entry = LogEntry::success(OperationType::BotCommand, "/start");
        logs.record_at(&entry, Utc::now() - Duration::days(100));
        logs.record_at(&entry, Utc::now() - Duration::days(2));

        let (tx, rx) = watch::channel(false);
        let handle = spawn_retention_sweep(
            ctx,
            AuditConfig {
                retention_days: 30,
                sweep_interval_secs: 3600,
            },
            rx,
        );

        let mut pruned = false;
        for _ in 0..100 {
            if logs
                .all()
                .iter()
                .any(|l| l.operation_type == OperationType::AdminAction)
            {
                pruned = true;
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        assert!(pruned);

        let remaining = logs.all();
        assert_eq!(remaining.len(), 2);
        assert_eq!(remaining[0].message, "/start");
        assert!(remaining[1].context.is_none());

        tx.send(true).unwrap();
        tokio::time::timeout(StdDuration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweep_disabled_for_unrepresentable_retention() {
        let (ctx, logs) = setup();
        logs.record_at(
            &LogEntry::success(OperationType::BotCommand, "/start"),
            Utc::now() - Duration::days(100),
        );

        let (_tx, rx) = watch::channel(false);
        let handle = spawn_retention_sweep(
            ctx,
            AuditConfig {
                retention_days: i64::MAX,
                sweep_interval_secs: 3600,
            },
            rx,
        );
        tokio::time::timeout(StdDuration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(logs.all().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_survives_store_outage() {
        let (ctx, logs) = setup();
        logs.set_unavailable(true);

        let (tx, rx) = watch::channel(false);
        let handle = spawn_retention_sweep(ctx, AuditConfig::default(), rx);
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        assert!(!handle.is_finished());

        drop(tx);
        tokio::time::timeout(StdDuration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
