use crate::summary::PassSummary;
use crate::{CheckpointSet, JobId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobPhase {
    SkippedNotComplete,
    SkippedAlreadyDone,
    Processing,
    Done,
    /// Streamed, but the lookup update failed.
    PartialLookupFailureDone,
    DownloadFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub job_id: JobId,
    pub name: String,
    pub phase: JobPhase,
    pub lookup_failed: bool,
    pub lines: u64,
    pub rows_written: usize,
    pub interrupted: bool,
}

/// State of one pass over a single group.
///
/// `prev_done` starts as the stored checkpoint and grows with every job that
/// gets streamed; `next_done` collects every job the listing reports as
/// completed and becomes the checkpoint at pass end.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PassState {
    prev_done: CheckpointSet,
    next_done: CheckpointSet,
    jobs: Vec<JobRecord>,
    checkpoint_save_failures: usize,
    finished: bool,
}

impl PassState {
    pub fn new(prev_done: CheckpointSet) -> Self {
        Self {
            prev_done,
            ..Self::default()
        }
    }

    pub fn prev_done(&self) -> &CheckpointSet {
        &self.prev_done
    }

    pub fn next_done(&self) -> &CheckpointSet {
        &self.next_done
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn summary(&self) -> PassSummary {
        PassSummary::from_jobs(&self.jobs, self.checkpoint_save_failures)
    }

    pub(crate) fn push_job(&mut self, job_id: JobId, name: String, phase: JobPhase) {
        self.jobs.push(JobRecord {
            job_id,
            name,
            phase,
            lookup_failed: false,
            lines: 0,
            rows_written: 0,
            interrupted: false,
        });
    }

    /// The record currently in flight for `job_id`.
    pub(crate) fn processing_mut(&mut self, job_id: &str) -> Option<&mut JobRecord> {
        self.jobs
            .iter_mut()
            .rev()
            .find(|job| job.job_id == job_id && job.phase == JobPhase::Processing)
    }

    pub(crate) fn mark_completed(&mut self, job_id: &str) {
        self.next_done.insert(job_id);
    }

    /// A job whose stream never opened must stay eligible for the next pass.
    pub(crate) fn unmark_completed(&mut self, job_id: &str) {
        self.next_done.remove(job_id);
    }

    pub(crate) fn mark_downloaded(&mut self, job_id: &str) {
        self.prev_done.insert(job_id);
    }

    pub(crate) fn record_save_failure(&mut self) {
        self.checkpoint_save_failures += 1;
    }

    pub(crate) fn finish(&mut self) {
        self.finished = true;
    }
}
