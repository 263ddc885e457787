use crate::dto::grading_dto::{GradeRequest, GradeResponse};
use crate::error::Result;
use crate::models::submission::PendingSubmission;
use crate::storage::{
    exam_state_key, exam_submitted_key, LocalStore, PARKED_SUBMISSIONS_KEY,
    PENDING_SUBMISSIONS_KEY,
};
use chrono::{Duration, Utc};
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct SyncPolicy {
    pub max_attempts: u32,
    pub backoff_base_secs: u64,
    pub backoff_cap_secs: u64,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            backoff_base_secs: 30,
            backoff_cap_secs: 3600,
        }
    }
}

impl SyncPolicy {
    fn backoff_secs(&self, attempts: u32) -> u64 {
        let exp = attempts.saturating_sub(1).min(16);
        (self.backoff_base_secs.saturating_mul(1u64 << exp)).min(self.backoff_cap_secs)
    }
}

/// Outcome of one sync pass. `ran` is false when another pass held the
/// in-flight guard and this call did nothing.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub ran: bool,
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    pub parked: usize,
}

impl SyncReport {
    fn skipped() -> Self {
        Self {
            ran: false,
            attempted: 0,
            synced: 0,
            failed: 0,
            parked: 0,
        }
    }
}

/// Delivers queued exam submissions to the remote grading endpoint with
/// at-least-once semantics. Submissions are processed strictly sequentially so
/// the synced/failed partition stays deterministic and the endpoint is never
/// hit with a burst.
#[derive(Clone)]
pub struct SyncService {
    store: LocalStore,
    client: Client,
    endpoint: String,
    anon_key: String,
    policy: SyncPolicy,
    in_flight: Arc<AtomicBool>,
}

impl SyncService {
    pub fn new(
        store: LocalStore,
        client: Client,
        endpoint: String,
        anon_key: String,
        policy: SyncPolicy,
    ) -> Self {
        Self {
            store,
            client,
            endpoint,
            anon_key,
            policy,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Appends a submission to the persisted queue.
    pub fn enqueue(&self, submission: PendingSubmission) -> Result<()> {
        let mut pending = self.pending()?;
        info!(
            exam_id = %submission.exam_id,
            queued = pending.len() + 1,
            "Queued submission for background sync"
        );
        pending.push(submission);
        self.store.set(PENDING_SUBMISSIONS_KEY, &pending)
    }

    pub fn pending(&self) -> Result<Vec<PendingSubmission>> {
        Ok(self
            .store
            .get::<Vec<PendingSubmission>>(PENDING_SUBMISSIONS_KEY)?
            .unwrap_or_default())
    }

    pub fn parked(&self) -> Result<Vec<PendingSubmission>> {
        Ok(self
            .store
            .get::<Vec<PendingSubmission>>(PARKED_SUBMISSIONS_KEY)?
            .unwrap_or_default())
    }

    pub fn pending_count(&self) -> Result<usize> {
        Ok(self.pending()?.len())
    }

    pub fn parked_count(&self) -> Result<usize> {
        Ok(self.parked()?.len())
    }

    /// Worker entry point: runs a sync pass when anything is queued.
    pub async fn check_pending(&self) -> Result<SyncReport> {
        if self.pending()?.is_empty() {
            return Ok(SyncReport {
                ran: true,
                attempted: 0,
                synced: 0,
                failed: 0,
                parked: 0,
            });
        }
        self.sync_all().await
    }

    /// Runs one delivery pass over the queue.
    ///
    /// Non-reentrant: a call while a pass is in flight returns immediately
    /// with `ran = false` and performs no network I/O. Triggers (interval
    /// tick, manual retry, startup) may therefore fire freely.
    pub async fn sync_all(&self) -> Result<SyncReport> {
        if self.in_flight.swap(true, Ordering::SeqCst) {
            return Ok(SyncReport::skipped());
        }
        let result = self.sync_pass().await;
        self.in_flight.store(false, Ordering::SeqCst);
        result
    }

    async fn sync_pass(&self) -> Result<SyncReport> {
        let pending = self.pending()?;
        if pending.is_empty() {
            return Ok(SyncReport {
                ran: true,
                attempted: 0,
                synced: 0,
                failed: 0,
                parked: 0,
            });
        }

        let now = Utc::now();
        let mut attempted = 0usize;
        let mut synced = 0usize;
        let mut survivors: Vec<PendingSubmission> = Vec::new();
        let mut parked: Vec<PendingSubmission> = Vec::new();

        for mut submission in pending {
            if !submission.due(now) {
                survivors.push(submission);
                continue;
            }

            attempted += 1;
            submission.attempts += 1;

            match self.deliver(&submission).await {
                Ok(()) => {
                    synced += 1;
                    // Mirror the exam-state cleanup the web client did on a
                    // direct successful submit.
                    self.store.remove(&exam_state_key(&submission.exam_id))?;
                    self.store
                        .set(&exam_submitted_key(&submission.exam_id), &true)?;
                }
                Err(e) => {
                    warn!(
                        exam_id = %submission.exam_id,
                        attempts = submission.attempts,
                        error = %e,
                        "Failed to sync submission"
                    );
                    if submission.attempts >= self.policy.max_attempts {
                        parked.push(submission);
                    } else {
                        submission.next_retry_at = Some(
                            now + Duration::seconds(
                                self.policy.backoff_secs(submission.attempts) as i64
                            ),
                        );
                        survivors.push(submission);
                    }
                }
            }
        }

        // Already-synced entries are never resent: only the survivors are
        // written back, in their original relative order.
        if survivors.is_empty() {
            self.store.remove(PENDING_SUBMISSIONS_KEY)?;
        } else {
            self.store.set(PENDING_SUBMISSIONS_KEY, &survivors)?;
        }

        let newly_parked = parked.len();
        if !parked.is_empty() {
            let mut all_parked = self.parked()?;
            all_parked.append(&mut parked);
            self.store.set(PARKED_SUBMISSIONS_KEY, &all_parked)?;
        }

        let report = SyncReport {
            ran: true,
            attempted,
            synced,
            failed: survivors.len(),
            parked: newly_parked,
        };
        info!(
            synced = report.synced,
            failed = report.failed,
            parked = report.parked,
            "Submission sync pass finished"
        );
        Ok(report)
    }

    /// One delivery attempt. Network errors, non-2xx responses, and
    /// application-level `success: false` are all treated as retryable; the
    /// grading endpoint does not distinguish permanent rejections.
    async fn deliver(&self, submission: &PendingSubmission) -> anyhow::Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.anon_key)
            .json(&GradeRequest::from_submission(submission))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("Grading endpoint returned {}", response.status());
        }

        let graded: GradeResponse = response.json().await?;
        if !graded.success {
            anyhow::bail!(
                "Grading endpoint rejected submission: {}",
                graded.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }

        info!(
            exam_id = %submission.exam_id,
            submission_id = ?graded.submission_id,
            score = ?graded.score,
            "Submission graded"
        );
        Ok(())
    }
}
