//! In-memory operation log

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

use teambot_core::entities::{LogEntry, LogFilters, LogStats, OperationLog};
use teambot_core::error::DomainError;
use teambot_core::traits::{clamp_page, OperationLogRepository, RepoResult};

use super::fault::Faults;

#[derive(Debug, Default)]
struct LogState {
    logs: Vec<OperationLog>,
    next_id: i64,
}

/// In-memory append-only audit trail
#[derive(Debug, Default)]
pub struct MemoryOperationLogRepository {
    state: RwLock<LogState>,
    faults: Faults,
}

impl MemoryOperationLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail with `StoreUnavailable`
    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.set_unavailable(unavailable);
    }

    /// Delay every subsequent call by `latency`
    pub fn set_latency(&self, latency: StdDuration) {
        self.faults.set_latency(latency);
    }

    /// Append an entry with an explicit creation time
    pub fn record_at(&self, entry: &LogEntry, created_at: DateTime<Utc>) -> OperationLog {
        let mut state = self.state.write();
        state.next_id += 1;
        let log = OperationLog::from_entry(state.next_id, entry.clone(), created_at);
        state.logs.push(log.clone());
        log
    }

    /// Every stored entry in insertion order
    pub fn all(&self) -> Vec<OperationLog> {
        self.state.read().logs.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().logs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl OperationLogRepository for MemoryOperationLogRepository {
    async fn record(&self, entry: &LogEntry) -> RepoResult<OperationLog> {
        self.faults.check().await?;
        if entry.duration_ms.is_some_and(|d| d < 0) {
            return Err(DomainError::ValidationError(
                "duration_ms must not be negative".to_string(),
            ));
        }
        Ok(self.record_at(entry, Utc::now()))
    }

    async fn query(
        &self,
        filters: &LogFilters,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<OperationLog>> {
        self.faults.check().await?;
        let (limit, offset) = clamp_page(limit, offset);

        let state = self.state.read();
        let mut matching: Vec<&OperationLog> =
            state.logs.iter().filter(|log| filters.matches(log)).collect();
        matching.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn stats(&self, filters: &LogFilters) -> RepoResult<LogStats> {
        self.faults.check().await?;
        let filters = filters.without_success();
        let state = self.state.read();
        Ok(LogStats::from_logs(
            state.logs.iter().filter(|log| filters.matches(log)),
        ))
    }

    async fn prune_older_than(&self, older_than: Duration) -> RepoResult<u64> {
        self.faults.check().await?;
        if older_than < Duration::zero() {
            return Err(DomainError::ValidationError(
                "retention period must not be negative".to_string(),
            ));
        }

        let cutoff = Utc::now().checked_sub_signed(older_than).ok_or_else(|| {
            DomainError::ValidationError("retention period is out of range".to_string())
        })?;
        let mut state = self.state.write();
        let before = state.logs.len();
        state.logs.retain(|log| log.created_at >= cutoff);
        Ok((before - state.logs.len()) as u64)
    }
}
