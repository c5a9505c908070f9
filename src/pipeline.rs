use log::{info, warn};

use crate::{
    config::EtlConfig,
    csv_sink,
    error::PipelineError,
    extractor::{ExtractSummary, Extractor},
    listing_parser::ListingParser,
    loader::{LoadReport, Loader, LocalWrite, RemoteOutcome},
    record::RAW_COLUMNS,
    requests::PageFetcher,
    sheets::SpreadsheetClient,
    transformer::{self, TransformSummary},
};

#[derive(Debug)]
pub struct RunReport {
    pub extract: ExtractSummary,
    pub transform: TransformSummary,
    pub local: LocalWrite,
    pub remote: RemoteOutcome,
}

impl RunReport {
    pub fn log(&self) {
        log_extract(&self.extract);
        log_transform(&self.transform);
        info!("CSV: {} rows written to {}", self.local.rows, self.local.path.display());
        match &self.remote {
            RemoteOutcome::Uploaded { updated_cells } => info!("Spreadsheet: {updated_cells} cells written"),
            RemoteOutcome::Skipped(reason) => info!("Spreadsheet: skipped ({reason})"),
            RemoteOutcome::Failed(e) => warn!("Spreadsheet: failed ({e})"),
        }
    }
}

fn log_extract(summary: &ExtractSummary) {
    info!(
        "Extract: {} records from {} pages ({} empty, {} failed, {} blocks skipped)",
        summary.records, summary.pages_fetched, summary.pages_empty, summary.pages_failed, summary.blocks_skipped
    );
}

fn log_transform(summary: &TransformSummary) {
    info!(
        "Transform: {} in, {} accepted, {} rejected, {} duplicates",
        summary.input, summary.accepted, summary.rejected, summary.duplicates
    );
}

/// Runs extract, transform and load once.
///
/// Per-page, per-block and per-row problems are absorbed into the summaries.
/// The run only fails when nothing was extracted, every row was rejected,
/// the rejection threshold was crossed, or the local file couldn't be
/// written. A failed upload is reported in [`RunReport::remote`]. Summaries
/// of the stages that ran are logged on every exit and carried in the error.
pub async fn run<F, P, S>(
    config: &EtlConfig,
    fetcher: &F,
    parser: &P,
    sheets: Option<&S>,
) -> Result<RunReport, PipelineError>
where
    F: PageFetcher,
    P: ListingParser,
    S: SpreadsheetClient,
{
    let (raw, extract) = Extractor::new(&config.extract, fetcher, parser).extract().await;
    if raw.is_empty() {
        log_extract(&extract);
        return Err(PipelineError::NothingExtracted(extract));
    }

    if let Some(path) = &config.extract.raw_csv_path {
        match csv_sink::write_atomic(path, &RAW_COLUMNS, &raw) {
            Ok(rows) => info!("Saved {rows} raw rows to {}", path.display()),
            Err(e) => warn!("Could not save raw rows to {}: {e}", path.display()),
        }
    }

    let transformed = match transformer::transform(raw, &config.transform) {
        Ok(transformed) => transformed,
        Err(source) => {
            log_extract(&extract);
            return Err(PipelineError::Transform { source, extract });
        }
    };
    let transform = transformed.summary;
    // The transformer has already logged its own summary by this point.
    if transformed.records.is_empty() {
        log_extract(&extract);
        return Err(PipelineError::NothingToLoad { extract, transform });
    }

    let LoadReport { local, remote } = Loader::new(&config.load, sheets)
        .load(&transformed.records)
        .await;
    let local = match local {
        Ok(local) => local,
        Err(source) => {
            log_extract(&extract);
            return Err(PipelineError::LocalSink {
                source,
                extract,
                transform,
            });
        }
    };

    Ok(RunReport {
        extract,
        transform,
        local,
        remote,
    })
}
