use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source layout of an opened file.
///
/// The serialized variant names ("JsonL" / "JsonArray") are part of the IPC
/// contract with the viewer shell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileFormat {
  JsonL,
  JsonArray,
}

/// One logical record of the source: a JSONL line or a JSON-array element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
  /// Zero-based index in the emitted record stream. Stable for the session,
  /// never persisted.
  pub id: usize,
  /// Original textual form of the record, minus the trailing line separator.
  /// For JSON-array sources this is the compact re-serialization of the
  /// element.
  pub content: String,
  pub parsed: Value,
  /// Byte position in the file where `content` begins. 0 for JSON-array
  /// elements (offsets inside the outer document are not tracked).
  pub byte_offset: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
  pub path: String,
  /// Count of records actually emitted; skipped blank/malformed lines are
  /// excluded.
  pub total_lines: usize,
  pub file_size: u64,
  pub format: FileFormat,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
  pub text: Option<String>,
  pub json_path: Option<String>,
  pub case_sensitive: bool,
  /// Accepted for wire compatibility; matching is always literal substring.
  pub regex: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
  pub line_id: usize,
  /// The string projections that satisfied the query.
  pub matches: Vec<String>,
  /// Raw record text (JSONL line or compact element re-serialization).
  pub context: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SearchStats {
  pub total_matches: usize,
  pub lines_searched: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
  Asc,
  Desc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortColumn {
  /// Flat underscore-joined path (see `value::get_flat`).
  pub column: String,
  pub direction: SortDirection,
}

/// One inferred column of the flat schema.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnInfo {
  pub path: String,
  /// True when every sampled occurrence of the column was a scalar (or the
  /// column was absent); containers make a column unsortable.
  pub is_sortable: bool,
  /// `path` with its first underscore segment stripped when there are at
  /// least two segments.
  pub display_name: String,
}
