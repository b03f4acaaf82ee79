use crate::{JobPhase, JobRecord};

/// Counters describing how a pass went.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PassSummary {
    pub listed: usize,
    pub skipped_not_complete: usize,
    pub skipped_already_done: usize,
    pub downloaded: usize,
    pub download_failed: usize,
    pub lookup_failures: usize,
    pub interrupted_streams: usize,
    pub lines_emitted: u64,
    pub rows_written: usize,
    pub checkpoint_save_failures: usize,
}

impl PassSummary {
    pub(crate) fn from_jobs(jobs: &[JobRecord], checkpoint_save_failures: usize) -> Self {
        let mut summary = PassSummary {
            listed: jobs.len(),
            checkpoint_save_failures,
            ..PassSummary::default()
        };
        for job in jobs {
            match job.phase {
                JobPhase::SkippedNotComplete => summary.skipped_not_complete += 1,
                JobPhase::SkippedAlreadyDone => summary.skipped_already_done += 1,
                JobPhase::Done | JobPhase::PartialLookupFailureDone => summary.downloaded += 1,
                JobPhase::DownloadFailed => summary.download_failed += 1,
                JobPhase::Processing => {}
            }
            if job.lookup_failed {
                summary.lookup_failures += 1;
            }
            if job.interrupted {
                summary.interrupted_streams += 1;
            }
            summary.lines_emitted += job.lines;
            summary.rows_written += job.rows_written;
        }
        summary
    }
}
