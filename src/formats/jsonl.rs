//! Streaming JSONL record reader.
//!
//! Lines are consumed with byte-exact offsets; blank and malformed lines
//! are skipped and never consume a record id.

use std::path::Path;

use serde_json::Value;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::engine::CoreError;
use crate::models::Record;

pub(crate) struct JsonlReader {
  reader: BufReader<File>,
  buf: Vec<u8>,
  /// Bytes consumed so far; the offset of the next unread line.
  offset: u64,
  /// Physical line counter, for diagnostics only.
  line_no: usize,
  next_id: usize,
  skipped: usize,
}

impl JsonlReader {
  pub(crate) async fn open(path: &Path) -> Result<Self, CoreError> {
    let file = File::open(path).await?;
    Ok(Self {
      reader: BufReader::new(file),
      buf: Vec::new(),
      offset: 0,
      line_no: 0,
      next_id: 0,
      skipped: 0,
    })
  }

  /// Next valid record, or `None` at end of file.
  pub(crate) async fn next_record(&mut self) -> Result<Option<Record>, CoreError> {
    loop {
      self.buf.clear();
      let start_offset = self.offset;
      let n = self.reader.read_until(b'\n', &mut self.buf).await?;
      if n == 0 {
        if self.skipped > 0 {
          debug!(
            emitted = self.next_id,
            skipped = self.skipped,
            "finished reading jsonl source"
          );
        }
        return Ok(None);
      }
      self.offset += n as u64;
      self.line_no += 1;

      // Trim the line terminator only; the content stays verbatim otherwise.
      if self.buf.ends_with(b"\n") {
        self.buf.pop();
        if self.buf.ends_with(b"\r") {
          self.buf.pop();
        }
      }

      let line = String::from_utf8_lossy(&self.buf);
      if line.trim().is_empty() {
        continue;
      }
      match serde_json::from_str::<Value>(&line) {
        Ok(parsed) => {
          let record = Record {
            id: self.next_id,
            content: line.into_owned(),
            parsed,
            byte_offset: start_offset,
          };
          self.next_id += 1;
          return Ok(Some(record));
        }
        Err(err) => {
          self.skipped += 1;
          warn!(line = self.line_no, %err, "skipping malformed jsonl line");
        }
      }
    }
  }
}
