//! Export support: the flat header union downstream writers consume.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

use crate::engine::CoreError;
use crate::formats::{self, RecordSource};
use crate::schema::walk_flat_paths;

/// Union of flat paths over the first `sample` records, alphabetically
/// sorted. Writers group consecutive headers sharing a first underscore
/// segment into header groups.
pub(crate) async fn collect_headers(
  path: &Path,
  sample: usize,
  max_depth: usize,
) -> Result<Vec<String>, CoreError> {
  let format = formats::detect_format(path).await?;
  let mut source = RecordSource::open(path, format).await?;

  let mut headers: BTreeSet<String> = BTreeSet::new();
  let mut seen = 0usize;
  while seen < sample {
    let Some(record) = source.next_record().await? else {
      break;
    };
    seen += 1;
    walk_flat_paths(&record.parsed, max_depth, &mut |p, _| {
      if !headers.contains(p) {
        headers.insert(p.to_string());
      }
    });
  }

  debug!(headers = headers.len(), records = seen, "collected export headers");
  Ok(headers.into_iter().collect())
}
