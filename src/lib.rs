mod csv_sink;
#[cfg(test)]
mod http_stub;
mod ratelimit;
mod text_manipulators;

pub mod config;
pub mod error;
pub mod extractor;
pub mod listing_parser;
pub mod loader;
pub mod pipeline;
pub mod record;
pub mod requests;
pub mod sheets;
pub mod transformer;

pub use config::EtlConfig;
pub use extractor::{ExtractSummary, Extractor};
pub use listing_parser::{CollectionCardParser, ListingParser};
pub use loader::{LoadReport, Loader, RemoteOutcome};
pub use pipeline::{RunReport, run};
pub use record::{NormalizedRecord, RawRecord};
pub use requests::{PageFetcher, RequestClient};
pub use sheets::{GoogleSheetsClient, SpreadsheetClient};
pub use transformer::{TransformSummary, transform};
