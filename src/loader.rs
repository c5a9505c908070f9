use std::path::PathBuf;

use log::{error, info, warn};
use serde_json::Value;

use crate::{
    config::LoadConfig,
    csv_sink,
    error::SinkError,
    record::{COLUMNS, NormalizedRecord},
    sheets::SpreadsheetClient,
};

#[derive(Debug)]
pub struct LocalWrite {
    pub path: PathBuf,
    pub rows: usize,
}

#[derive(Debug)]
pub enum RemoteOutcome {
    Uploaded { updated_cells: usize },
    Skipped(&'static str),
    Failed(SinkError),
}

/// How each sink fared. The two sinks are independent: either can fail while
/// the other succeeds.
#[derive(Debug)]
pub struct LoadReport {
    pub local: Result<LocalWrite, SinkError>,
    pub remote: RemoteOutcome,
}

pub struct Loader<'a, S> {
    config: &'a LoadConfig,
    sheets: Option<&'a S>,
}

impl<'a, S: SpreadsheetClient> Loader<'a, S> {
    pub fn new(config: &'a LoadConfig, sheets: Option<&'a S>) -> Self {
        Self { config, sheets }
    }

    /// Replaces both sinks' contents with `records`. Running it again with the
    /// same records leaves both sinks exactly as they were.
    pub async fn load(&self, records: &[NormalizedRecord]) -> LoadReport {
        let local = self.write_local(records);
        let remote = self.write_remote(records).await;
        LoadReport { local, remote }
    }

    fn write_local(&self, records: &[NormalizedRecord]) -> Result<LocalWrite, SinkError> {
        let path = &self.config.csv_path;
        match csv_sink::write_atomic(path, &COLUMNS, records) {
            Ok(rows) => {
                info!("Saved {rows} rows to {}", path.display());
                Ok(LocalWrite {
                    path: path.clone(),
                    rows,
                })
            }
            Err(e) => {
                error!("Failed to write {}: {e}", path.display());
                Err(e)
            }
        }
    }

    async fn write_remote(&self, records: &[NormalizedRecord]) -> RemoteOutcome {
        let Some(target) = &self.config.sheet else {
            info!("No spreadsheet configured, skipping upload");
            return RemoteOutcome::Skipped("no spreadsheet id configured");
        };
        let Some(client) = self.sheets else {
            warn!("Spreadsheet {} configured without credentials, skipping upload", target.spreadsheet_id);
            return RemoteOutcome::Skipped("no spreadsheet credentials configured");
        };

        match client
            .replace_values(&target.spreadsheet_id, &target.sheet_name, &sheet_rows(records))
            .await
        {
            Ok(updated_cells) => RemoteOutcome::Uploaded { updated_cells },
            Err(e) => {
                error!("Upload to spreadsheet {} failed: {e}", target.spreadsheet_id);
                RemoteOutcome::Failed(e)
            }
        }
    }
}

/// Header row followed by one row per record.
pub fn sheet_rows(records: &[NormalizedRecord]) -> Vec<Vec<Value>> {
    std::iter::once(COLUMNS.iter().map(|&c| Value::from(c)).collect())
        .chain(records.iter().map(NormalizedRecord::sheet_row))
        .collect()
}
