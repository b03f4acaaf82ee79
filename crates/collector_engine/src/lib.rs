//! Collector engine: HTTP client, result streaming, file persistence and pass orchestration.
mod checkpoint_store;
mod client;
mod credentials;
mod engine;
mod filename;
mod lines;
mod lookup_table;
mod persist;
mod sink;
mod streamer;
mod sync;
mod types;

pub use checkpoint_store::CheckpointStore;
pub use client::{ByteStream, ClientSettings, JobApi, ReqwestJobClient};
pub use credentials::{CredentialSource, StaticCredentials};
pub use engine::Engine;
pub use filename::{checkpoint_filename, group_file_stem};
pub use lines::{DecodedLine, LineSplitter, DEFAULT_MAX_LINE_BYTES};
pub use lookup_table::{LookupError, LookupLayout, LookupTable, LookupUpdate};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use sink::{EventSink, JsonLinesSink};
pub use streamer::{JobResultStreamer, StreamReport};
pub use sync::SyncOrchestrator;
pub use types::{FailureKind, FetchError, PassOutcome, PassReport, ResultEvent};
