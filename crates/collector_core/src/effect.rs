use crate::{CheckpointSet, Job};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append lookup rows derived from the job's input.
    UpdateLookup { job: Job },
    /// Open the job's result stream and forward every line to the sink.
    StreamResults { job: Job },
    /// Replace the stored checkpoint with `ids`.
    SaveCheckpoint { ids: CheckpointSet, kind: CheckpointKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointKind {
    /// Written right after a job was streamed, so a crash keeps earlier downloads.
    Progress,
    /// Written once at pass end with exactly the jobs the listing reported as completed.
    Prune,
}
