use std::path::Path;

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::SinkError;

/// Writes `rows` as CSV to `path`, replacing whatever was there.
///
/// The rows go to a temporary file next to `path` that is renamed over it
/// once fully flushed, so readers see either the old file or the new one.
/// `header` is written even when there are no rows. Returns the number of
/// data rows written.
pub fn write_atomic<T: Serialize>(path: &Path, header: &[&str], rows: &[T]) -> Result<usize, SinkError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(tmp.as_file_mut());
        writer.write_record(header)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| SinkError::Io(e.error))?;
    Ok(rows.len())
}
