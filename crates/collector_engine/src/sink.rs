use std::io::{self, Stdout, Write};
use std::sync::Mutex;

use collector_logging::collector_warn;

use crate::ResultEvent;

/// Receives every forwarded result line. Delivery is best effort.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ResultEvent);
}

/// Writes each event as one JSON object per line.
pub struct JsonLinesSink<W: Write + Send> {
    out: Mutex<W>,
}

impl JsonLinesSink<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
            .into_inner()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write_event(out: &mut W, event: &ResultEvent) -> io::Result<()> {
        serde_json::to_writer(&mut *out, event)?;
        out.write_all(b"\n")?;
        out.flush()
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&self, event: ResultEvent) {
        let mut out = self
            .out
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Err(err) = Self::write_event(&mut out, &event) {
            collector_warn!(
                "Failed to write event index={} host={} source={}: {}",
                event.index,
                event.host,
                event.source,
                err
            );
        }
    }
}
