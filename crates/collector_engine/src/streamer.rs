use collector_core::{Group, Job};
use collector_logging::collector_warn;
use futures_util::StreamExt;

use crate::lines::{DecodedLine, LineSplitter, DEFAULT_MAX_LINE_BYTES};
use crate::{EventSink, FetchError, JobApi, ResultEvent};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamReport {
    pub lines: u64,
    /// Set when the transport failed after the stream had been opened.
    pub interrupted: Option<FetchError>,
}

/// Streams one job's result payload line by line into a sink.
#[derive(Debug, Clone)]
pub struct JobResultStreamer {
    max_line_bytes: usize,
}

impl Default for JobResultStreamer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_BYTES)
    }
}

impl JobResultStreamer {
    pub fn new(max_line_bytes: usize) -> Self {
        Self { max_line_bytes }
    }

    /// Fails only if the stream cannot be opened. Once open, every complete
    /// line is forwarded in transport order; a later transport error ends the
    /// stream early and is reported in [`StreamReport::interrupted`].
    pub async fn stream(
        &self,
        api: &dyn JobApi,
        group: &Group,
        job: &Job,
        sink: &dyn EventSink,
    ) -> Result<StreamReport, FetchError> {
        let mut chunks = api.open_results(group, &job.id).await?;
        let source = group.job_source(&job.id);
        let mut splitter = LineSplitter::new(self.max_line_bytes);
        let mut report = StreamReport::default();

        while let Some(chunk) = chunks.next().await {
            match chunk {
                Ok(bytes) => {
                    for line in splitter.push(&bytes) {
                        self.forward(group, job, &source, line, sink);
                        report.lines += 1;
                    }
                }
                Err(err) => {
                    report.interrupted = Some(err);
                    break;
                }
            }
        }

        // An unterminated tail after a transport error is most likely cut mid-record.
        if report.interrupted.is_none() {
            if let Some(line) = splitter.finish() {
                self.forward(group, job, &source, line, sink);
                report.lines += 1;
            }
        }
        Ok(report)
    }

    fn forward(
        &self,
        group: &Group,
        job: &Job,
        source: &str,
        line: DecodedLine,
        sink: &dyn EventSink,
    ) {
        if line.truncated {
            collector_warn!(
                "Truncated line longer than {} bytes in job={} group_name={}",
                self.max_line_bytes,
                job.id,
                group.name()
            );
        }
        if line.had_errors {
            collector_warn!(
                "Replaced invalid UTF-8 in job={} group_name={}",
                job.id,
                group.name()
            );
        }
        sink.emit(ResultEvent {
            index: group.name().to_string(),
            host: job.name.clone(),
            data: line.text,
            source: source.to_string(),
        });
    }
}
