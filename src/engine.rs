//! The command endpoints the viewer shell invokes across its IPC boundary.

use std::path::Path;

use thiserror::Error;
use tracing::debug;

use crate::channel::ChunkSink;
use crate::formats;
use crate::models::{
  FileFormat, FileMetadata, Record, SearchQuery, SearchResult, SearchStats, SortColumn,
};
use crate::schema::SchemaOptions;
use crate::{export, search, sort};

#[derive(Debug, Error)]
pub enum CoreError {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("format error: {0}")]
  Format(String),
  #[error("invalid query: {0}")]
  Query(String),
  #[error("invalid argument: {0}")]
  InvalidArg(String),
  #[error("worker task error: {0}")]
  Task(String),
  #[error("cancelled: consumer closed the channel")]
  Cancelled,
}

/// Engine tuning knobs. Defaults are the documented constants; the IPC
/// surface does not expose them.
#[derive(Debug, Clone)]
pub struct CoreOptions {
  /// Records per chunk when streaming parse and file-sort output.
  pub parse_chunk: usize,
  /// Results per chunk when streaming search and result-sort output.
  pub search_chunk: usize,
  /// Records sampled when collecting export headers.
  pub header_sample: usize,
}

impl Default for CoreOptions {
  fn default() -> Self {
    Self {
      parse_chunk: 2000,
      search_chunk: 100,
      header_sample: 1000,
    }
  }
}

/// The record-processing engine. One instance serves the whole process;
/// every command owns its file handle for the duration of the call.
#[derive(Debug, Clone)]
pub struct CoreEngine {
  options: CoreOptions,
}

impl CoreEngine {
  pub fn new(options: CoreOptions) -> Self {
    Self { options }
  }

  pub fn options(&self) -> &CoreOptions {
    &self.options
  }

  /// IPC API: parse_file_streaming(path, channel) -> FileMetadata
  ///
  /// Streams records in parse order, in chunks of up to `parse_chunk`; the
  /// final short chunk is flushed before the metadata returns. Blank and
  /// malformed JSONL lines are skipped without consuming an id.
  pub async fn parse_file_streaming(
    &self,
    path: impl AsRef<Path>,
    sink: &dyn ChunkSink<Record>,
  ) -> Result<FileMetadata, CoreError> {
    let path = path.as_ref();
    check_path(path)?;

    let file_size = tokio::fs::metadata(path).await?.len();
    let format = formats::detect_format(path).await?;
    debug!(path = %path.display(), ?format, file_size, "parsing file");

    let mut source = formats::RecordSource::open(path, format).await?;
    let mut chunk: Vec<Record> = Vec::with_capacity(self.options.parse_chunk);
    let mut total_lines = 0usize;
    while let Some(record) = source.next_record().await? {
      total_lines += 1;
      chunk.push(record);
      if chunk.len() >= self.options.parse_chunk {
        let full = std::mem::replace(&mut chunk, Vec::with_capacity(self.options.parse_chunk));
        sink.send(full).map_err(|_| CoreError::Cancelled)?;
      }
    }
    if !chunk.is_empty() {
      sink.send(chunk).map_err(|_| CoreError::Cancelled)?;
    }

    if total_lines == 0 && format == FileFormat::JsonL {
      return Err(CoreError::Format("no valid records in file".into()));
    }

    Ok(FileMetadata {
      path: path.to_string_lossy().to_string(),
      total_lines,
      file_size,
      format,
    })
  }

  /// IPC API: search_in_file(path, query, file_format, channel) -> SearchStats
  ///
  /// Streams matches in record order, in chunks of up to `search_chunk`.
  /// A query with neither text nor path scans but matches nothing.
  pub async fn search_in_file(
    &self,
    path: impl AsRef<Path>,
    query: SearchQuery,
    file_format: FileFormat,
    sink: &dyn ChunkSink<SearchResult>,
  ) -> Result<SearchStats, CoreError> {
    let path = path.as_ref();
    check_path(path)?;
    search::run_search(path, &query, file_format, sink, self.options.search_chunk).await
  }

  /// IPC API: sort_file_lines(path, sort_column, file_format, channel) -> count
  pub async fn sort_file_lines(
    &self,
    path: impl AsRef<Path>,
    sort_column: SortColumn,
    file_format: FileFormat,
    sink: &dyn ChunkSink<Record>,
  ) -> Result<usize, CoreError> {
    let path = path.as_ref();
    check_path(path)?;
    check_column(&sort_column)?;
    sort::sort_file(path, &sort_column, file_format, sink, self.options.parse_chunk).await
  }

  /// IPC API: sort_search_results(results, sort_column, channel) -> count
  pub async fn sort_search_results(
    &self,
    results: Vec<SearchResult>,
    sort_column: SortColumn,
    sink: &dyn ChunkSink<SearchResult>,
  ) -> Result<usize, CoreError> {
    check_column(&sort_column)?;
    sort::sort_results(results, &sort_column, sink, self.options.search_chunk).await
  }

  /// IPC API: collect_headers(path) -> string[]
  ///
  /// Used by the exporter: the alphabetical union of flat paths over the
  /// first `header_sample` records.
  pub async fn collect_headers(&self, path: impl AsRef<Path>) -> Result<Vec<String>, CoreError> {
    let path = path.as_ref();
    check_path(path)?;
    let max_depth = SchemaOptions::default().max_depth;
    export::collect_headers(path, self.options.header_sample, max_depth).await
  }
}

impl Default for CoreEngine {
  fn default() -> Self {
    Self::new(CoreOptions::default())
  }
}

fn check_path(path: &Path) -> Result<(), CoreError> {
  if path.as_os_str().is_empty() {
    return Err(CoreError::InvalidArg("path is empty".into()));
  }
  Ok(())
}

fn check_column(sort_column: &SortColumn) -> Result<(), CoreError> {
  if sort_column.column.is_empty() {
    return Err(CoreError::InvalidArg("sort column is empty".into()));
  }
  Ok(())
}
