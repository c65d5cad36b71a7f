//! In-memory job registry.
//!
//! The registry is the only shared mutable job state. Every job lives in
//! exactly one of two partitions (active or completed) and every operation
//! runs under one lock, so readers never observe a record mid-move.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use uuid::Uuid;

use super::error::RegistryError;
use super::types::{JobErrorKind, JobRecord, JobRequest, JobStatus};

/// Default number of completed jobs kept in memory.
pub const DEFAULT_COMPLETED_RETENTION: usize = 100;

/// Which partition a job currently lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partition {
    Active,
    Completed,
}

#[derive(Default)]
struct RegistryInner {
    active: HashMap<String, JobRecord>,
    /// Most recently completed first.
    completed: VecDeque<JobRecord>,
}

/// Concurrency-safe job store with bounded completed history.
pub struct JobRegistry {
    inner: Mutex<RegistryInner>,
    retention: usize,
}

impl JobRegistry {
    /// Create a registry that keeps at most `retention` completed jobs.
    pub fn new(retention: usize) -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
            retention: retention.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a queued record with a fresh id.
    pub fn create(&self, request: JobRequest) -> JobRecord {
        let record = JobRecord::new(Uuid::new_v4().to_string(), request);
        self.lock()
            .active
            .insert(record.id.clone(), record.clone());
        record
    }

    /// Look a job up in either partition.
    pub fn get(&self, id: &str) -> Result<JobRecord, RegistryError> {
        let inner = self.lock();
        inner
            .active
            .get(id)
            .or_else(|| inner.completed.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Locate a job's partition.
    pub fn locate(&self, id: &str) -> Option<Partition> {
        let inner = self.lock();
        if inner.active.contains_key(id) {
            Some(Partition::Active)
        } else if inner.completed.iter().any(|r| r.id == id) {
            Some(Partition::Completed)
        } else {
            None
        }
    }

    /// Active jobs, oldest first.
    pub fn list_active(&self) -> Vec<JobRecord> {
        let mut jobs: Vec<JobRecord> = self.lock().active.values().cloned().collect();
        jobs.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        jobs
    }

    /// Completed jobs, most recently completed first.
    pub fn list_completed(&self, limit: usize) -> Vec<JobRecord> {
        self.lock().completed.iter().take(limit).cloned().collect()
    }

    /// Mutate an active record in place and return the updated copy.
    pub fn update<F>(&self, id: &str, f: F) -> Result<JobRecord, RegistryError>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut inner = self.lock();
        let record = inner
            .active
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        f(record);
        Ok(record.clone())
    }

    /// Apply a terminal mutation and move the record to completed in one step.
    ///
    /// The closure works on a copy; if it leaves the record non-terminal the
    /// registry is left untouched and `InvalidState` is returned.
    pub fn finalize<F>(&self, id: &str, f: F) -> Result<JobRecord, RegistryError>
    where
        F: FnOnce(&mut JobRecord),
    {
        let mut inner = self.lock();
        let mut record = inner
            .active
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        f(&mut record);
        if !record.status.is_terminal() {
            return Err(RegistryError::InvalidState {
                job_id: id.to_string(),
                current_state: record.status.to_string(),
                operation: "finalize".to_string(),
            });
        }
        inner.active.remove(id);
        Ok(self.push_completed(&mut inner, record))
    }

    /// Move an already-terminal active record to completed.
    pub fn move_to_completed(&self, id: &str) -> Result<JobRecord, RegistryError> {
        self.finalize(id, |_| {})
    }

    /// Cancel an active job.
    ///
    /// Jobs in `validating` or `publishing` cannot be cancelled.
    pub fn cancel(&self, id: &str) -> Result<JobRecord, RegistryError> {
        let mut inner = self.lock();
        let status = inner
            .active
            .get(id)
            .map(|r| r.status)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        if !status.can_cancel() {
            return Err(RegistryError::InvalidState {
                job_id: id.to_string(),
                current_state: status.to_string(),
                operation: "cancel".to_string(),
            });
        }

        let Some(mut record) = inner.active.remove(id) else {
            return Err(RegistryError::NotFound(id.to_string()));
        };
        record.status = JobStatus::Cancelled;
        record.diagnostics.error = Some(format!("Cancelled while {}", status));
        record.diagnostics.error_kind = Some(JobErrorKind::Cancelled);
        Ok(self.push_completed(&mut inner, record))
    }

    /// Number of (active, completed) jobs.
    pub fn counts(&self) -> (usize, usize) {
        let inner = self.lock();
        (inner.active.len(), inner.completed.len())
    }

    fn push_completed(&self, inner: &mut RegistryInner, mut record: JobRecord) -> JobRecord {
        record.completed_at.get_or_insert_with(Utc::now);
        inner.completed.push_front(record.clone());
        inner.completed.truncate(self.retention);
        record
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_COMPLETED_RETENTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn request(name: &str) -> JobRequest {
        JobRequest::new(
            "https://example.com/stream.mpd",
            name,
            vec!["kid:key".to_string()],
        )
    }

    #[test]
    fn test_create_and_get() {
        let registry = JobRegistry::default();
        let record = registry.create(request("clip"));

        assert_eq!(record.status, JobStatus::Queued);
        assert_eq!(registry.get(&record.id).unwrap(), record);
        assert_eq!(registry.locate(&record.id), Some(Partition::Active));
        assert_eq!(registry.counts(), (1, 0));
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = JobRegistry::default();
        let a = registry.create(request("a"));
        let b = registry.create(request("b"));
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_get_unknown() {
        let registry = JobRegistry::default();
        assert_eq!(
            registry.get("missing"),
            Err(RegistryError::NotFound("missing".to_string()))
        );
        assert_eq!(registry.locate("missing"), None);
    }

    #[test]
    fn test_update_mutates_active_record() {
        let registry = JobRegistry::default();
        let record = registry.create(request("clip"));

        let updated = registry
            .update(&record.id, |r| r.status = JobStatus::Acquiring)
            .unwrap();
        assert_eq!(updated.status, JobStatus::Acquiring);
        assert_eq!(
            registry.get(&record.id).unwrap().status,
            JobStatus::Acquiring
        );
    }

    #[test]
    fn test_finalize_moves_to_completed() {
        let registry = JobRegistry::default();
        let record = registry.create(request("clip"));

        let done = registry
            .finalize(&record.id, |r| r.status = JobStatus::Completed)
            .unwrap();

        assert!(done.completed_at.is_some());
        assert_eq!(registry.locate(&record.id), Some(Partition::Completed));
        assert_eq!(registry.counts(), (0, 1));
        assert!(registry.list_active().is_empty());
        assert_eq!(registry.list_completed(10)[0].id, record.id);
    }

    #[test]
    fn test_finalize_requires_terminal_status() {
        let registry = JobRegistry::default();
        let record = registry.create(request("clip"));

        let result = registry.finalize(&record.id, |r| r.status = JobStatus::Converting);
        assert!(matches!(result, Err(RegistryError::InvalidState { .. })));
        // Record untouched and still active
        let current = registry.get(&record.id).unwrap();
        assert_eq!(current.status, JobStatus::Queued);
        assert_eq!(registry.locate(&record.id), Some(Partition::Active));
    }

    #[test]
    fn test_update_after_completion_fails() {
        let registry = JobRegistry::default();
        let record = registry.create(request("clip"));
        registry
            .finalize(&record.id, |r| r.status = JobStatus::Completed)
            .unwrap();

        let result = registry.update(&record.id, |r| r.status = JobStatus::Error);
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
        assert_eq!(
            registry.get(&record.id).unwrap().status,
            JobStatus::Completed
        );
    }

    #[test]
    fn test_move_to_completed() {
        let registry = JobRegistry::default();
        let record = registry.create(request("clip"));
        registry
            .update(&record.id, |r| r.fail(JobErrorKind::StageFailure, "boom"))
            .unwrap();

        let moved = registry.move_to_completed(&record.id).unwrap();
        assert_eq!(moved.status, JobStatus::Error);
        assert_eq!(registry.locate(&record.id), Some(Partition::Completed));
    }

    #[test]
    fn test_cancel_queued_job() {
        let registry = JobRegistry::default();
        let record = registry.create(request("clip"));

        let cancelled = registry.cancel(&record.id).unwrap();
        assert_eq!(cancelled.status, JobStatus::Cancelled);
        assert_eq!(
            cancelled.diagnostics.error_kind,
            Some(JobErrorKind::Cancelled)
        );
        assert!(cancelled.completed_at.is_some());
        assert_eq!(registry.locate(&record.id), Some(Partition::Completed));
    }

    #[test]
    fn test_cancel_rejected_while_publishing() {
        let registry = JobRegistry::default();
        let record = registry.create(request("clip"));
        registry
            .update(&record.id, |r| r.status = JobStatus::Publishing)
            .unwrap();

        let result = registry.cancel(&record.id);
        assert_eq!(
            result,
            Err(RegistryError::InvalidState {
                job_id: record.id.clone(),
                current_state: "publishing".to_string(),
                operation: "cancel".to_string(),
            })
        );
        assert_eq!(registry.locate(&record.id), Some(Partition::Active));
    }

    #[test]
    fn test_cancel_completed_job_is_not_found() {
        let registry = JobRegistry::default();
        let record = registry.create(request("clip"));
        registry
            .finalize(&record.id, |r| r.status = JobStatus::Completed)
            .unwrap();

        assert!(matches!(
            registry.cancel(&record.id),
            Err(RegistryError::NotFound(_))
        ));
        assert_eq!(
            registry.get(&record.id).unwrap().status,
            JobStatus::Completed
        );
    }

    #[test]
    fn test_retention_evicts_oldest() {
        let registry = JobRegistry::new(2);
        let ids: Vec<String> = (0..3)
            .map(|i| {
                let record = registry.create(request(&format!("clip{}", i)));
                registry
                    .finalize(&record.id, |r| r.status = JobStatus::Completed)
                    .unwrap();
                record.id
            })
            .collect();

        let completed = registry.list_completed(10);
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].id, ids[2]);
        assert_eq!(completed[1].id, ids[1]);
        assert_eq!(registry.locate(&ids[0]), None);
    }

    #[test]
    fn test_list_completed_respects_limit() {
        let registry = JobRegistry::default();
        for i in 0..5 {
            let record = registry.create(request(&format!("clip{}", i)));
            registry
                .finalize(&record.id, |r| r.status = JobStatus::Completed)
                .unwrap();
        }
        assert_eq!(registry.list_completed(3).len(), 3);
        assert_eq!(registry.list_completed(0).len(), 0);
    }

    #[test]
    fn test_concurrent_finalize_keeps_single_partition() {
        let registry = Arc::new(JobRegistry::default());
        let record = registry.create(request("clip"));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let id = record.id.clone();
                std::thread::spawn(move || {
                    if i % 2 == 0 {
                        registry
                            .finalize(&id, |r| r.status = JobStatus::Completed)
                            .is_ok()
                    } else {
                        registry.cancel(&id).is_ok()
                    }
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 1);
        assert_eq!(registry.counts(), (0, 1));
        assert_eq!(registry.locate(&record.id), Some(Partition::Completed));
    }
}
