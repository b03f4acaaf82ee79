use bytes::BytesMut;
use encoding_rs::UTF_8;

pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedLine {
    pub text: String,
    /// The line exceeded the length limit and was cut.
    pub truncated: bool,
    /// Invalid UTF-8 was replaced with U+FFFD.
    pub had_errors: bool,
}

/// Splits a chunked byte stream into lines ended by `\n`, `\r\n` or a lone `\r`.
///
/// Memory is bounded by `max_line_bytes`: bytes past the limit are dropped
/// until the next line break. A UTF-8 BOM at the very start of the stream is
/// removed.
#[derive(Debug)]
pub struct LineSplitter {
    buf: BytesMut,
    max_line_bytes: usize,
    truncated: bool,
    first_line: bool,
    /// The previous chunk ended in `\r`; a leading `\n` belongs to that break.
    after_cr: bool,
}

impl LineSplitter {
    pub fn new(max_line_bytes: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            max_line_bytes: max_line_bytes.max(1),
            truncated: false,
            first_line: true,
            after_cr: false,
        }
    }

    /// Feeds one chunk and returns every line it completed, in order.
    pub fn push(&mut self, mut chunk: &[u8]) -> Vec<DecodedLine> {
        let mut lines = Vec::new();
        if chunk.is_empty() {
            return lines;
        }
        if std::mem::take(&mut self.after_cr) && chunk[0] == b'\n' {
            chunk = &chunk[1..];
        }
        while let Some(pos) = chunk.iter().position(|&b| b == b'\n' || b == b'\r') {
            self.append(&chunk[..pos]);
            lines.push(self.take_line());
            let mut next = pos + 1;
            if chunk[pos] == b'\r' {
                match chunk.get(next).copied() {
                    Some(b'\n') => next += 1,
                    Some(_) => {}
                    None => self.after_cr = true,
                }
            }
            chunk = &chunk[next..];
        }
        self.append(chunk);
        lines
    }

    /// Returns the unterminated remainder, if any.
    pub fn finish(mut self) -> Option<DecodedLine> {
        if self.buf.is_empty() && !self.truncated {
            return None;
        }
        Some(self.take_line())
    }

    fn append(&mut self, bytes: &[u8]) {
        let room = self.max_line_bytes.saturating_sub(self.buf.len());
        if bytes.len() > room {
            self.buf.extend_from_slice(&bytes[..room]);
            self.truncated = true;
        } else {
            self.buf.extend_from_slice(bytes);
        }
    }

    fn take_line(&mut self) -> DecodedLine {
        let raw = self.buf.split();
        let (text, had_errors) = if std::mem::take(&mut self.first_line) {
            let (text, had_errors) = UTF_8.decode_with_bom_removal(&raw);
            (text.into_owned(), had_errors)
        } else {
            let (text, had_errors) = UTF_8.decode_without_bom_handling(&raw);
            (text.into_owned(), had_errors)
        };
        DecodedLine {
            text,
            truncated: std::mem::take(&mut self.truncated),
            had_errors,
        }
    }
}
