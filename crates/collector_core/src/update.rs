use crate::{
    CheckpointKind, Effect, JobPhase, LookupResultKind, Msg, PassState, StreamResultKind,
};

/// Pure update function: applies a message to the pass state and returns the effects to run.
///
/// Effects must be executed in order; each one is answered with the matching
/// `*Finished` message before the next job is listed.
///
/// A finished pass still counts `CheckpointSaveFailed`, including the one answering the prune save.
pub fn update(mut state: PassState, msg: Msg) -> (PassState, Vec<Effect>) {
    if let Msg::CheckpointSaveFailed = msg {
        state.record_save_failure();
        return (state, Vec::new());
    }
    if state.is_finished() {
        return (state, Vec::new());
    }

    let effects = match msg {
        Msg::JobListed(job) => {
            if !job.is_completed() {
                state.push_job(job.id, job.name, JobPhase::SkippedNotComplete);
                return (state, Vec::new());
            }
            // Completion counts towards the pruned checkpoint whether or not it was downloaded before.
            state.mark_completed(&job.id);
            if state.prev_done().contains(&job.id) {
                state.push_job(job.id, job.name, JobPhase::SkippedAlreadyDone);
                return (state, Vec::new());
            }
            state.push_job(job.id.clone(), job.name.clone(), JobPhase::Processing);
            vec![
                Effect::UpdateLookup { job: job.clone() },
                Effect::StreamResults { job },
            ]
        }
        Msg::LookupFinished { job_id, result } => {
            if let Some(record) = state.processing_mut(&job_id) {
                match result {
                    LookupResultKind::Written { rows } => record.rows_written = rows,
                    LookupResultKind::Failed => record.lookup_failed = true,
                }
            }
            Vec::new()
        }
        Msg::StreamFinished { job_id, result } => {
            let Some(record) = state.processing_mut(&job_id) else {
                return (state, Vec::new());
            };
            match result {
                StreamResultKind::Failed => {
                    record.phase = JobPhase::DownloadFailed;
                    state.unmark_completed(&job_id);
                    Vec::new()
                }
                StreamResultKind::Completed { lines } | StreamResultKind::Interrupted { lines } => {
                    record.lines = lines;
                    record.interrupted = matches!(result, StreamResultKind::Interrupted { .. });
                    record.phase = if record.lookup_failed {
                        JobPhase::PartialLookupFailureDone
                    } else {
                        JobPhase::Done
                    };
                    state.mark_downloaded(&job_id);
                    vec![Effect::SaveCheckpoint {
                        ids: state.prev_done().clone(),
                        kind: CheckpointKind::Progress,
                    }]
                }
            }
        }
        Msg::CheckpointSaveFailed => Vec::new(),
        Msg::ListingExhausted => {
            state.finish();
            vec![Effect::SaveCheckpoint {
                ids: state.next_done().clone(),
                kind: CheckpointKind::Prune,
            }]
        }
    };

    (state, effects)
}
