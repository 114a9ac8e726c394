//! Typed helpers over dynamic JSON values: flat-path navigation, tabular
//! display rendering, and sort-key coercion.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;

/// Keys that identify a "representative" field when rendering containers.
const DISPLAY_KEYS: &[&str] = &[
  "name", "title", "label", "id", "slug", "email", "username", "code", "key", "status",
];

/// Navigate a value by a flat underscore-joined path.
///
/// Each segment steps through an object key; resolution fails if an
/// intermediate value is not an object or the key is missing. A literal key
/// containing an underscore (`"a_b"`) is shadowed by the nested
/// interpretation and is never tried.
pub fn get_flat<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
  let mut current = value;
  for part in path.split('_') {
    match current {
      Value::Object(map) => current = map.get(part)?,
      _ => return None,
    }
  }
  Some(current)
}

/// A value rendered for one table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
  pub text: String,
  /// True when the underlying value is a container (object or array).
  pub is_complex: bool,
}

/// Render a value for tabular display.
///
/// Containers try to show something human-readable: an array of objects is
/// projected through the first display key its lead element carries, an
/// object shows its first display-key value, and anything else falls back
/// to compact JSON.
pub fn smart_format(value: &Value) -> Formatted {
  match value {
    Value::Null => Formatted {
      text: String::new(),
      is_complex: false,
    },
    Value::Bool(b) => Formatted {
      text: b.to_string(),
      is_complex: false,
    },
    Value::Number(n) => Formatted {
      text: n.to_string(),
      is_complex: false,
    },
    Value::String(s) => Formatted {
      text: s.clone(),
      is_complex: false,
    },
    Value::Array(items) => Formatted {
      text: format_array(items),
      is_complex: true,
    },
    Value::Object(map) => Formatted {
      text: format_object(map),
      is_complex: true,
    },
  }
}

/// Render the value at `path` for a flat export cell: strings bare,
/// null/absent empty, everything else via [`smart_format`].
pub fn get_flat_display(value: &Value, path: &str) -> String {
  match get_flat(value, path) {
    None | Some(Value::Null) => String::new(),
    Some(Value::String(s)) => s.clone(),
    Some(other) => smart_format(other).text,
  }
}

fn scalar_text(value: &Value) -> String {
  match value {
    Value::String(s) => s.clone(),
    Value::Null => String::new(),
    other => other.to_string(),
  }
}

fn format_array(items: &[Value]) -> String {
  if let Some(Value::Object(first)) = items.first() {
    if let Some(key) = DISPLAY_KEYS.iter().find(|k| first.contains_key(**k)) {
      return items
        .iter()
        .map(|item| item.get(*key).map(scalar_text).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ");
    }
  }
  items.iter().map(scalar_text).collect::<Vec<_>>().join(", ")
}

fn format_object(map: &serde_json::Map<String, Value>) -> String {
  for key in DISPLAY_KEYS {
    if let Some(v) = map.get(*key) {
      return scalar_text(v);
    }
  }
  serde_json::to_string(map).unwrap_or_default()
}

/// Typed projection used for ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum SortKey {
  Null,
  Number(f64),
  /// Epoch milliseconds, UTC.
  Date(i64),
  Text(TextKey),
}

/// Case-insensitive text key: collates by the lowercased form, ties broken
/// by the original form.
#[derive(Debug, Clone, PartialEq)]
pub struct TextKey {
  lower: String,
  original: String,
}

impl TextKey {
  fn new(original: String) -> Self {
    Self {
      lower: original.to_lowercase(),
      original,
    }
  }

  pub fn original(&self) -> &str {
    &self.original
  }

  fn collate(&self, other: &Self) -> Ordering {
    self
      .lower
      .cmp(&other.lower)
      .then_with(|| self.original.cmp(&other.original))
  }
}

impl SortKey {
  pub fn is_null(&self) -> bool {
    matches!(self, SortKey::Null)
  }

  pub(crate) fn text(original: impl Into<String>) -> Self {
    SortKey::Text(TextKey::new(original.into()))
  }

  /// Natural order within a variant. Cross-variant pairs fall back to a
  /// fixed variant rank; the sort engine homogenizes keys first, so that
  /// arm is not normally reached.
  pub(crate) fn cmp_non_null(&self, other: &SortKey) -> Ordering {
    match (self, other) {
      (SortKey::Number(a), SortKey::Number(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
      (SortKey::Date(a), SortKey::Date(b)) => a.cmp(b),
      (SortKey::Text(a), SortKey::Text(b)) => a.collate(b),
      (a, b) => a.variant_rank().cmp(&b.variant_rank()),
    }
  }

  pub(crate) fn same_variant(&self, other: &SortKey) -> bool {
    self.variant_rank() == other.variant_rank()
  }

  fn variant_rank(&self) -> u8 {
    match self {
      SortKey::Number(_) => 0,
      SortKey::Date(_) => 1,
      SortKey::Text(_) => 2,
      SortKey::Null => 3,
    }
  }
}

/// Coerce a (possibly absent) JSON value to its sort key.
///
/// Strings are promoted to numbers when they parse as a finite `f64`, then
/// to dates when they parse as a supported date-time shape; booleans count
/// as 0/1; containers collate as their compact JSON text.
pub fn to_sort_key(value: Option<&Value>) -> SortKey {
  let value = match value {
    None => return SortKey::Null,
    Some(v) => v,
  };
  match value {
    Value::Null => SortKey::Null,
    Value::Bool(b) => SortKey::Number(if *b { 1.0 } else { 0.0 }),
    Value::Number(n) => match n.as_f64() {
      Some(f) => SortKey::Number(f),
      None => SortKey::text(n.to_string()),
    },
    Value::String(s) => {
      if let Ok(f) = s.trim().parse::<f64>() {
        if f.is_finite() {
          return SortKey::Number(f);
        }
      }
      if let Some(ms) = parse_date_ms(s) {
        return SortKey::Date(ms);
      }
      SortKey::text(s.clone())
    }
    container => SortKey::text(serde_json::to_string(container).unwrap_or_default()),
  }
}

/// Recognize RFC 3339 / ISO 8601 date-time strings as epoch milliseconds.
/// Timezone-less forms (with 'T' or a space) and bare dates are read as UTC.
fn parse_date_ms(s: &str) -> Option<i64> {
  let t = s.trim();
  let b = t.as_bytes();
  // All supported shapes start with a 4-digit year and a dash.
  if b.len() < 10 || !b[..4].iter().all(|c| c.is_ascii_digit()) || b[4] != b'-' {
    return None;
  }

  if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
    return Some(dt.timestamp_millis());
  }

  const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
  for fmt in NAIVE_FORMATS {
    if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
      return Some(dt.and_utc().timestamp_millis());
    }
  }

  if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
    return Some(d.and_hms_opt(0, 0, 0)?.and_utc().timestamp_millis());
  }

  None
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn get_flat_walks_nested_objects() {
    let v = json!({"user": {"profile": {"name": "ada"}}});
    assert_eq!(get_flat(&v, "user_profile_name"), Some(&json!("ada")));
    assert_eq!(get_flat(&v, "user_profile"), Some(&json!({"name": "ada"})));
    assert_eq!(get_flat(&v, "user_missing"), None);
  }

  #[test]
  fn get_flat_fails_on_non_object_intermediate() {
    let v = json!({"items": [1, 2, 3]});
    assert_eq!(get_flat(&v, "items_0"), None);
  }

  #[test]
  fn get_flat_never_tries_literal_underscore_keys() {
    let v = json!({"a_b": 1, "a": {"b": 2}});
    assert_eq!(get_flat(&v, "a_b"), Some(&json!(2)));
  }

  #[test]
  fn smart_format_primitives() {
    assert_eq!(smart_format(&json!(null)).text, "");
    assert!(!smart_format(&json!(null)).is_complex);
    assert_eq!(smart_format(&json!(true)).text, "true");
    assert_eq!(smart_format(&json!(3.5)).text, "3.5");
    assert_eq!(smart_format(&json!("hi")).text, "hi");
  }

  #[test]
  fn smart_format_projects_display_key_across_object_array() {
    let v = json!([{"name": "a", "size": 1}, {"name": "b"}, {"size": 2}]);
    let f = smart_format(&v);
    assert_eq!(f.text, "a, b, ");
    assert!(f.is_complex);
  }

  #[test]
  fn smart_format_joins_plain_arrays() {
    let f = smart_format(&json!([1, "two", null]));
    assert_eq!(f.text, "1, two, ");
    assert!(f.is_complex);
  }

  #[test]
  fn smart_format_object_prefers_display_key() {
    let f = smart_format(&json!({"status": "ok", "weight": 9}));
    assert_eq!(f.text, "ok");
    assert!(f.is_complex);

    let f = smart_format(&json!({"weight": 9}));
    assert_eq!(f.text, r#"{"weight":9}"#);
  }

  #[test]
  fn get_flat_display_renders_cells() {
    let v = json!({"a": {"b": "text"}, "n": 7, "gone": null});
    assert_eq!(get_flat_display(&v, "a_b"), "text");
    assert_eq!(get_flat_display(&v, "n"), "7");
    assert_eq!(get_flat_display(&v, "gone"), "");
    assert_eq!(get_flat_display(&v, "nope"), "");
  }

  #[test]
  fn sort_key_coercion_precedence() {
    assert_eq!(to_sort_key(None), SortKey::Null);
    assert_eq!(to_sort_key(Some(&json!(null))), SortKey::Null);
    assert_eq!(to_sort_key(Some(&json!(2))), SortKey::Number(2.0));
    assert_eq!(to_sort_key(Some(&json!("2.5"))), SortKey::Number(2.5));
    assert_eq!(to_sort_key(Some(&json!(false))), SortKey::Number(0.0));
    assert_eq!(to_sort_key(Some(&json!(true))), SortKey::Number(1.0));
    assert!(matches!(to_sort_key(Some(&json!("hello"))), SortKey::Text(_)));
    assert!(matches!(to_sort_key(Some(&json!({"a": 1}))), SortKey::Text(_)));
  }

  #[test]
  fn sort_key_recognizes_date_shapes() {
    let rfc = to_sort_key(Some(&json!("2024-01-15T10:30:00Z")));
    let spaced = to_sort_key(Some(&json!("2024-01-15 10:30:00")));
    assert_eq!(rfc, spaced);

    match to_sort_key(Some(&json!("2024-01-15"))) {
      SortKey::Date(ms) => assert_eq!(ms % 86_400_000, 0),
      other => panic!("expected date key, got {other:?}"),
    }

    // A plausible year alone is a number, not a date.
    assert_eq!(to_sort_key(Some(&json!("2024"))), SortKey::Number(2024.0));
    // Non-finite numeric strings stay text.
    assert!(matches!(to_sort_key(Some(&json!("inf"))), SortKey::Text(_)));
  }

  #[test]
  fn text_keys_collate_case_insensitively() {
    let a = to_sort_key(Some(&json!("Apple")));
    let b = to_sort_key(Some(&json!("banana")));
    assert_eq!(a.cmp_non_null(&b), Ordering::Less);

    // Equal under lowercasing ties break on the original form.
    let x = to_sort_key(Some(&json!("abc")));
    let y = to_sort_key(Some(&json!("ABC")));
    assert_ne!(x.cmp_non_null(&y), Ordering::Equal);
  }
}
