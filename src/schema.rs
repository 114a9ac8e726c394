//! Flat-schema inference over sampled records.
//!
//! The consumer feeds the first parse chunks through [`infer_columns`] to
//! build the table header: an ordered, prioritized, bounded list of flat
//! paths with per-column sortability.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::Value;

use crate::models::{ColumnInfo, Record};
use crate::value::smart_format;

/// Sampling and output bounds for schema inference.
#[derive(Debug, Clone)]
pub struct SchemaOptions {
  /// Records examined before the schema is considered settled.
  pub sample_size: usize,
  /// Nesting levels flattened into underscore paths.
  pub max_depth: usize,
  /// Upper bound on emitted columns.
  pub max_columns: usize,
}

impl Default for SchemaOptions {
  fn default() -> Self {
    Self {
      sample_size: 50,
      max_depth: 2,
      max_columns: 100,
    }
  }
}

/// First-segment names that pull a column toward the front of the schema.
pub const PRIORITY_KEYS: &[&str] = &[
  "id", "timestamp", "time", "date", "level", "severity", "message", "msg", "name", "type",
  "status", "user", "meta",
];

#[derive(Debug)]
struct ColumnStats {
  occurrences: usize,
  scalar_only: bool,
}

/// Infer the column list from the first `sample_size` records.
///
/// Deterministic: ordering is a total order over (priority rank, occurrence
/// count, path), so the same sample always yields the same columns.
pub fn infer_columns(records: &[Record], options: &SchemaOptions) -> Vec<ColumnInfo> {
  let mut stats: HashMap<String, ColumnStats> = HashMap::new();
  for record in records.iter().take(options.sample_size) {
    walk_flat_paths(&record.parsed, options.max_depth, &mut |path, value| {
      let entry = stats.entry(path.to_string()).or_insert(ColumnStats {
        occurrences: 0,
        scalar_only: true,
      });
      entry.occurrences += 1;
      if smart_format(value).is_complex {
        entry.scalar_only = false;
      }
    });
  }

  let mut columns: Vec<(String, ColumnStats)> = stats.into_iter().collect();
  columns.sort_by(|(a, sa), (b, sb)| compare_columns(a, sa.occurrences, b, sb.occurrences));
  columns.truncate(options.max_columns);

  columns
    .into_iter()
    .map(|(path, stats)| ColumnInfo {
      display_name: display_name(&path),
      is_sortable: stats.scalar_only,
      path,
    })
    .collect()
}

/// Visit every flat path of one parsed record.
///
/// Objects recurse until `max_depth`, at which point the object itself is a
/// leaf; scalars, arrays and nulls are always leaves. Arrays are never
/// descended. Paths join ancestor keys with `_`.
pub(crate) fn walk_flat_paths<'a>(
  value: &'a Value,
  max_depth: usize,
  visit: &mut dyn FnMut(&str, &'a Value),
) {
  if let Value::Object(map) = value {
    let mut path = String::new();
    walk_level(map, 0, max_depth, &mut path, visit);
  }
}

fn walk_level<'a>(
  map: &'a serde_json::Map<String, Value>,
  depth: usize,
  max_depth: usize,
  path: &mut String,
  visit: &mut dyn FnMut(&str, &'a Value),
) {
  for (key, value) in map {
    let prev_len = path.len();
    if !path.is_empty() {
      path.push('_');
    }
    path.push_str(key);
    match value {
      Value::Object(inner) if depth < max_depth => {
        walk_level(inner, depth + 1, max_depth, path, visit);
      }
      leaf => visit(path.as_str(), leaf),
    }
    path.truncate(prev_len);
  }
}

fn priority_rank(path: &str) -> Option<usize> {
  let first = path.split('_').next().unwrap_or(path);
  PRIORITY_KEYS.iter().position(|k| *k == first)
}

fn compare_columns(a: &str, count_a: usize, b: &str, count_b: usize) -> Ordering {
  match (priority_rank(a), priority_rank(b)) {
    (Some(ra), Some(rb)) => ra.cmp(&rb).then_with(|| a.cmp(b)),
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => count_b.cmp(&count_a).then_with(|| a.cmp(b)),
  }
}

fn display_name(path: &str) -> String {
  match path.split_once('_') {
    Some((_, rest)) if !rest.is_empty() => rest.to_string(),
    _ => path.to_string(),
  }
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

  #[test]
  fn priority_then_count_then_lexicographic() {
    let records = vec![
      record(0, json!({"id": 1, "user": {"name": "a", "id": 10}})),
      record(1, json!({"id": 2, "user": {"name": "b"}})),
      record(2, json!({"id": 3, "msg": "hi"})),
    ];
    let columns = infer_columns(&records, &SchemaOptions::default());
    let paths: Vec<&str> = columns.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, vec!["id", "msg", "user_id", "user_name"]);
  }

  #[test]
  fn non_priority_columns_order_by_occurrence() {
    let records = vec![
      record(0, json!({"zeta": 1, "alpha": 1})),
      record(1, json!({"zeta": 2})),
    ];
    let columns = infer_columns(&records, &SchemaOptions::default());
    let paths: Vec<&str> = columns.iter().map(|c| c.path.as_str()).collect();
    assert_eq!(paths, vec!["zeta", "alpha"]);
  }

  #[test]
  fn containers_make_columns_unsortable() {
    let records = vec![
      record(0, json!({"tags": ["a", "b"], "n": 1})),
      record(1, json!({"tags": ["c"], "n": 2})),
    ];
    let columns = infer_columns(&records, &SchemaOptions::default());
    let tags = columns.iter().find(|c| c.path == "tags").unwrap();
    let n = columns.iter().find(|c| c.path == "n").unwrap();
    assert!(!tags.is_sortable);
    assert!(n.is_sortable);
  }

  #[test]
  fn walk_respects_depth_and_skips_arrays() {
    let v = json!({"a": {"b": {"c": {"d": 1}}}, "list": [{"x": 1}]});
    let mut paths = Vec::new();
    walk_flat_paths(&v, 2, &mut |p, _| paths.push(p.to_string()));
    // Depth stops at the third segment; the object at the limit is a leaf.
    assert_eq!(paths, vec!["a_b_c", "list"]);
  }

  #[test]
  fn display_name_strips_first_segment() {
    assert_eq!(display_name("user_name"), "name");
    assert_eq!(display_name("user_profile_id"), "profile_id");
    assert_eq!(display_name("id"), "id");
  }

  #[test]
  fn column_list_is_bounded() {
    let mut map = serde_json::Map::new();
    for i in 0..300 {
      map.insert(format!("col{i:03}"), json!(1));
    }
    let records = vec![record(0, Value::Object(map))];
    let columns = infer_columns(
      &records,
      &SchemaOptions {
        max_columns: 100,
        ..SchemaOptions::default()
      },
    );
    assert_eq!(columns.len(), 100);
  }
}
