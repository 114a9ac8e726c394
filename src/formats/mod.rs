//! Source formats: detection plus per-format record readers.

use std::path::Path;

use tokio::io::AsyncReadExt;

use crate::engine::CoreError;
use crate::models::{FileFormat, Record};

pub(crate) mod json_array;
pub(crate) mod jsonl;

/// Decide the source layout.
///
/// A `.jsonl` / `.ndjson` extension always means line-delimited; otherwise
/// the first non-whitespace byte decides (`[` opens a JSON-array document).
pub(crate) async fn detect_format(path: &Path) -> Result<FileFormat, CoreError> {
  let ext = path
    .extension()
    .and_then(|s| s.to_str())
    .unwrap_or("")
    .to_ascii_lowercase();
  if matches!(ext.as_str(), "jsonl" | "ndjson") {
    return Ok(FileFormat::JsonL);
  }

  let mut file = tokio::fs::File::open(path).await?;
  let mut buf = [0u8; 4096];
  let mut first_chunk = true;
  loop {
    let n = file.read(&mut buf).await?;
    if n == 0 {
      return Ok(FileFormat::JsonL);
    }
    let mut slice = &buf[..n];
    if first_chunk {
      first_chunk = false;
      if slice.starts_with(&[0xEF, 0xBB, 0xBF]) {
        slice = &slice[3..];
      }
    }
    for &b in slice {
      if b == 0 || b.is_ascii_whitespace() {
        continue;
      }
      return Ok(if b == b'[' {
        FileFormat::JsonArray
      } else {
        FileFormat::JsonL
      });
    }
  }
}

/// A record stream over either source layout.
///
/// JSONL is read line by line; a JSON-array document is materialized up
/// front (the declared memory cost of that format) and drained.
pub(crate) enum RecordSource {
  Lines(jsonl::JsonlReader),
  Array(std::vec::IntoIter<Record>),
}

impl RecordSource {
  pub(crate) async fn open(path: &Path, format: FileFormat) -> Result<Self, CoreError> {
    match format {
      FileFormat::JsonL => Ok(Self::Lines(jsonl::JsonlReader::open(path).await?)),
      FileFormat::JsonArray => Ok(Self::Array(
        json_array::read_records(path).await?.into_iter(),
      )),
    }
  }

  pub(crate) async fn next_record(&mut self) -> Result<Option<Record>, CoreError> {
    match self {
      Self::Lines(reader) => reader.next_record().await,
      Self::Array(items) => Ok(items.next()),
    }
  }
}
