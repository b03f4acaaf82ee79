use crate::{Job, JobId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The next job of the listing, in listing order.
    JobListed(Job),
    /// The lookup update for a job finished.
    LookupFinished {
        job_id: JobId,
        result: LookupResultKind,
    },
    /// The result stream for a job finished or failed to open.
    StreamFinished {
        job_id: JobId,
        result: StreamResultKind,
    },
    /// A checkpoint write failed; the pass carries on.
    CheckpointSaveFailed,
    /// Every listed job has been handled.
    ListingExhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupResultKind {
    Written { rows: usize },
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamResultKind {
    Completed { lines: u64 },
    /// The stream opened but ended early on a transport error.
    Interrupted { lines: u64 },
    /// The stream never opened; the job stays eligible for the next pass.
    Failed,
}
