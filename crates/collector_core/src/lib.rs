//! Collector core: domain model and the pure per-pass state machine.
mod checkpoint;
mod effect;
mod lookup;
mod model;
mod msg;
mod state;
mod summary;
mod update;

pub use checkpoint::CheckpointSet;
pub use effect::{CheckpointKind, Effect};
pub use lookup::{normalize_cidr, rows_for_job, LookupRow, LOOKUP_TYPE_TAG};
pub use model::{AuthScheme, Group, InputError, Job, JobId, JobInput, JobStatus, QueryRecord};
pub use msg::{LookupResultKind, Msg, StreamResultKind};
pub use state::{JobPhase, JobRecord, PassState};
pub use summary::PassSummary;
pub use update::update;
