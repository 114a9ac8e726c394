//! Streaming search: a text predicate, a JSONPath predicate, or their
//! conjunction, applied in record order.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::channel::ChunkSink;
use crate::engine::CoreError;
use crate::formats::RecordSource;
use crate::jsonpath::JsonPath;
use crate::models::{FileFormat, Record, SearchQuery, SearchResult, SearchStats};

/// A query normalized once so the per-record test is allocation-light.
#[derive(Debug)]
pub(crate) struct PreparedQuery {
  text: Option<PreparedText>,
  path: Option<JsonPath>,
}

#[derive(Debug)]
struct PreparedText {
  /// As typed, echoed back in match lists.
  original: String,
  /// Lowercased when the query is case-insensitive.
  needle: String,
  case_sensitive: bool,
}

impl PreparedText {
  fn new(text: &str, case_sensitive: bool) -> Self {
    Self {
      original: text.to_string(),
      needle: if case_sensitive {
        text.to_string()
      } else {
        text.to_lowercase()
      },
      case_sensitive,
    }
  }

  fn matches(&self, hay: &str) -> bool {
    if self.case_sensitive {
      hay.contains(&self.needle)
    } else {
      hay.to_lowercase().contains(&self.needle)
    }
  }
}

impl PreparedQuery {
  /// `None` when the query carries neither a text nor a path term; such a
  /// search still scans (to report `lines_searched`) but can match nothing.
  ///
  /// The `regex` flag is accepted and matched as literal text.
  pub(crate) fn new(query: &SearchQuery) -> Result<Option<Self>, CoreError> {
    let text = query.text.as_deref().filter(|s| !s.is_empty());
    let path = match query.json_path.as_deref().filter(|s| !s.is_empty()) {
      Some(expr) => Some(JsonPath::parse(expr).map_err(|e| CoreError::Query(e.to_string()))?),
      None => None,
    };
    if text.is_none() && path.is_none() {
      return Ok(None);
    }
    Ok(Some(Self {
      text: text.map(|t| PreparedText::new(t, query.case_sensitive)),
      path,
    }))
  }

  /// The match projections for one record, or `None` when it does not match.
  fn match_record(&self, record: &Record) -> Option<Vec<String>> {
    match (&self.text, &self.path) {
      // Text only: substring test against the raw record content.
      (Some(text), None) => text
        .matches(&record.content)
        .then(|| vec![text.original.clone()]),
      // Path only: the record matches when the expression selects anything.
      (None, Some(path)) => {
        let hits = path.select(&record.parsed);
        if hits.is_empty() {
          None
        } else {
          Some(hits.into_iter().map(projection_text).collect())
        }
      }
      // Combined: keep the projections that contain the text.
      (Some(text), Some(path)) => {
        let kept: Vec<String> = path
          .select(&record.parsed)
          .into_iter()
          .map(projection_text)
          .filter(|p| text.matches(p))
          .collect();
        if kept.is_empty() {
          None
        } else {
          Some(kept)
        }
      }
      (None, None) => None,
    }
  }
}

/// String projection of a JSONPath hit: primitives canonical, containers
/// compact JSON.
fn projection_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    container @ (Value::Array(_) | Value::Object(_)) => {
      serde_json::to_string(container).unwrap_or_default()
    }
    primitive => primitive.to_string(),
  }
}

pub(crate) async fn run_search(
  path: &Path,
  query: &SearchQuery,
  format: FileFormat,
  sink: &dyn ChunkSink<SearchResult>,
  chunk_size: usize,
) -> Result<SearchStats, CoreError> {
  let prepared = PreparedQuery::new(query)?;
  let mut source = RecordSource::open(path, format).await?;

  let mut chunk: Vec<SearchResult> = Vec::with_capacity(chunk_size);
  let mut total_matches = 0;
  let mut lines_searched = 0;

  while let Some(record) = source.next_record().await? {
    lines_searched += 1;
    let Some(prepared) = prepared.as_ref() else {
      continue;
    };
    if let Some(matches) = prepared.match_record(&record) {
      total_matches += 1;
      chunk.push(SearchResult {
        line_id: record.id,
        matches,
        context: record.content,
      });
      if chunk.len() >= chunk_size {
        let full = std::mem::replace(&mut chunk, Vec::with_capacity(chunk_size));
        sink.send(full).map_err(|_| CoreError::Cancelled)?;
      }
    }
  }
  if !chunk.is_empty() {
    sink.send(chunk).map_err(|_| CoreError::Cancelled)?;
  }

  debug!(total_matches, lines_searched, "search finished");
  Ok(SearchStats {
    total_matches,
    lines_searched,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn record(id: usize, parsed: Value) -> Record {
    Record {
      id,
      content: parsed.to_string(),
      parsed,
      byte_offset: 0,
    }
  }

  fn query(text: Option<&str>, json_path: Option<&str>, case_sensitive: bool) -> SearchQuery {
    SearchQuery {
      text: text.map(str::to_string),
      json_path: json_path.map(str::to_string),
      case_sensitive,
      regex: false,
    }
  }

  #[test]
  fn empty_query_prepares_to_none() {
    assert!(PreparedQuery::new(&query(None, None, false)).unwrap().is_none());
    assert!(PreparedQuery::new(&query(Some(""), Some(""), false))
      .unwrap()
      .is_none());
  }

  #[test]
  fn bad_json_path_is_a_query_error() {
    let err = PreparedQuery::new(&query(None, Some("user.name"), false)).unwrap_err();
    assert!(matches!(err, CoreError::Query(_)));
  }

  #[test]
  fn text_match_honors_case_flag() {
    let r = record(0, json!({"msg": "Connection ERROR"}));

    let q = PreparedQuery::new(&query(Some("err"), None, false)).unwrap().unwrap();
    assert_eq!(q.match_record(&r), Some(vec!["err".to_string()]));

    let q = PreparedQuery::new(&query(Some("err"), None, true)).unwrap().unwrap();
    assert_eq!(q.match_record(&r), None);
  }

  #[test]
  fn combined_mode_keeps_matching_projections() {
    let q = PreparedQuery::new(&query(Some("alice"), Some("$.user.name"), false))
      .unwrap()
      .unwrap();

    let hit = record(0, json!({"user": {"name": "Alice"}}));
    assert_eq!(q.match_record(&hit), Some(vec!["Alice".to_string()]));

    let miss = record(1, json!({"user": {"name": "bob"}}));
    assert_eq!(q.match_record(&miss), None);
  }

  #[test]
  fn path_only_mode_stringifies_hits() {
    let q = PreparedQuery::new(&query(None, Some("$.tags"), false))
      .unwrap()
      .unwrap();
    let r = record(0, json!({"tags": [1, 2]}));
    assert_eq!(q.match_record(&r), Some(vec!["[1,2]".to_string()]));
  }
}
