//! Typed column sort.
//!
//! Keys are extracted once per item, the stable sort runs on a blocking
//! worker so the runtime stays responsive, and the reordered items are
//! streamed back in chunks.

use std::cmp::Ordering;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::channel::ChunkSink;
use crate::engine::CoreError;
use crate::formats::RecordSource;
use crate::models::{FileFormat, Record, SearchResult, SortColumn, SortDirection};
use crate::value::{get_flat, smart_format, to_sort_key, SortKey};

struct Keyed<T> {
  index: usize,
  item: T,
  key: SortKey,
  /// Display form of the extracted value, kept for the mixed-type fallback.
  display: String,
}

fn keyed_record(index: usize, record: Record, column: &str) -> Keyed<Record> {
  let flat = get_flat(&record.parsed, column);
  let key = to_sort_key(flat);
  let display = flat.map(|v| smart_format(v).text).unwrap_or_default();
  Keyed {
    index,
    item: record,
    key,
    display,
  }
}

fn keyed_result(index: usize, result: SearchResult, column: &str) -> Keyed<SearchResult> {
  // The result carries only raw context; re-parse it to reach the column.
  let parsed: Option<Value> = serde_json::from_str(&result.context).ok();
  let flat = parsed.as_ref().and_then(|v| get_flat(v, column));
  let key = to_sort_key(flat);
  let display = flat.map(|v| smart_format(v).text).unwrap_or_default();
  Keyed {
    index,
    item: result,
    key,
    display,
  }
}

fn is_heterogeneous<T>(items: &[Keyed<T>]) -> bool {
  let mut non_null = items.iter().map(|k| &k.key).filter(|k| !k.is_null());
  match non_null.next() {
    None => false,
    Some(first) => non_null.any(|k| !k.same_variant(first)),
  }
}

/// When extracted keys span more than one non-null variant the column has
/// no single natural order; every non-null key falls back to its text
/// display form.
fn homogenize<T>(items: &mut [Keyed<T>]) {
  if !is_heterogeneous(items) {
    return;
  }
  debug!("mixed key types in sort column, collating as text");
  for keyed in items.iter_mut() {
    if !keyed.key.is_null() {
      keyed.key = SortKey::text(std::mem::take(&mut keyed.display));
    }
  }
}

fn compare_keyed<T>(a: &Keyed<T>, b: &Keyed<T>, direction: SortDirection) -> Ordering {
  // Null keys form the tail in both directions.
  match (a.key.is_null(), b.key.is_null()) {
    (true, true) => return a.index.cmp(&b.index),
    (true, false) => return Ordering::Greater,
    (false, true) => return Ordering::Less,
    (false, false) => {}
  }
  let ord = a.key.cmp_non_null(&b.key);
  let ord = match direction {
    SortDirection::Asc => ord,
    SortDirection::Desc => ord.reverse(),
  };
  ord.then_with(|| a.index.cmp(&b.index))
}

async fn sort_on_worker<T: Send + 'static>(
  mut items: Vec<Keyed<T>>,
  direction: SortDirection,
) -> Result<Vec<T>, CoreError> {
  tokio::task::spawn_blocking(move || {
    homogenize(&mut items);
    items.sort_by(|a, b| compare_keyed(a, b, direction));
    items.into_iter().map(|k| k.item).collect()
  })
  .await
  .map_err(|e| CoreError::Task(format!("sort worker failed: {e}")))
}

fn stream_chunks<T>(
  items: Vec<T>,
  sink: &dyn ChunkSink<T>,
  chunk_size: usize,
) -> Result<usize, CoreError> {
  let total = items.len();
  let mut iter = items.into_iter();
  loop {
    let chunk: Vec<T> = iter.by_ref().take(chunk_size).collect();
    if chunk.is_empty() {
      break;
    }
    sink.send(chunk).map_err(|_| CoreError::Cancelled)?;
  }
  Ok(total)
}

/// Sort every record of the file by the column and stream the result.
/// The whole file is materialized for the duration of the sort.
pub(crate) async fn sort_file(
  path: &Path,
  sort_column: &SortColumn,
  format: FileFormat,
  sink: &dyn ChunkSink<Record>,
  chunk_size: usize,
) -> Result<usize, CoreError> {
  let mut source = RecordSource::open(path, format).await?;
  let mut items = Vec::new();
  while let Some(record) = source.next_record().await? {
    items.push(keyed_record(items.len(), record, &sort_column.column));
  }
  debug!(records = items.len(), column = %sort_column.column, "sorting file");
  let sorted = sort_on_worker(items, sort_column.direction).await?;
  stream_chunks(sorted, sink, chunk_size)
}

/// Sort an already-delivered result set by the column and stream it back.
pub(crate) async fn sort_results(
  results: Vec<SearchResult>,
  sort_column: &SortColumn,
  sink: &dyn ChunkSink<SearchResult>,
  chunk_size: usize,
) -> Result<usize, CoreError> {
  let items = results
    .into_iter()
    .enumerate()
    .map(|(index, result)| keyed_result(index, result, &sort_column.column))
    .collect();
  let sorted = sort_on_worker(items, sort_column.direction).await?;
  stream_chunks(sorted, sink, chunk_size)
}
