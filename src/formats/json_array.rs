//! JSON-array documents.
//!
//! The whole value is parsed in memory (the declared limitation of this
//! format) and each top-level element becomes one record.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::engine::CoreError;
use crate::models::Record;

pub(crate) async fn read_records(path: &Path) -> Result<Vec<Record>, CoreError> {
  let text = tokio::fs::read_to_string(path).await?;
  let doc: Value = serde_json::from_str(&text)
    .map_err(|e| CoreError::Format(format!("invalid JSON document: {e}")))?;
  let items = match doc {
    Value::Array(items) => items,
    other => {
      return Err(CoreError::Format(format!(
        "expected a top-level JSON array, found {}",
        value_kind(&other)
      )))
    }
  };
  debug!(
    elements = items.len(),
    path = %path.display(),
    "loaded json array document"
  );

  let records = items
    .into_iter()
    .enumerate()
    .map(|(id, parsed)| Record {
      id,
      content: serde_json::to_string(&parsed).unwrap_or_default(),
      parsed,
      // Element offsets inside the outer array are not tracked.
      byte_offset: 0,
    })
    .collect();
  Ok(records)
}

fn value_kind(v: &Value) -> &'static str {
  match v {
    Value::Null => "null",
    Value::Bool(_) => "a boolean",
    Value::Number(_) => "a number",
    Value::String(_) => "a string",
    Value::Array(_) => "an array",
    Value::Object(_) => "an object",
  }
}
