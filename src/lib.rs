mod channel;
mod engine;
mod export;
mod formats;
mod jsonpath;
mod models;
mod schema;
mod search;
mod sort;
mod value;

pub use crate::channel::{ChunkSink, CollectSink, SinkClosed};
pub use crate::engine::{CoreEngine, CoreError, CoreOptions};
pub use crate::jsonpath::{JsonPath, PathError};
pub use crate::models::{
  ColumnInfo, FileFormat, FileMetadata, Record, SearchQuery, SearchResult, SearchStats,
  SortColumn, SortDirection,
};
pub use crate::schema::{infer_columns, SchemaOptions, PRIORITY_KEYS};
pub use crate::value::{
  get_flat, get_flat_display, smart_format, to_sort_key, Formatted, SortKey, TextKey,
};
