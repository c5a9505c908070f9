use thiserror::Error;

use crate::{extractor::ExtractSummary, transformer::TransformSummary};

/// A page could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("server answered with HTTP {0}")]
    Status(u16),
    #[error("request failed: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchError::Status(status.as_u16()),
            None => FetchError::Transport(err.to_string()),
        }
    }
}

/// A listing block didn't have the shape the parser expects.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid selector: {0}")]
    Selector(String),
    #[error("listing block has no title element")]
    MissingTitle,
}

/// A field failed coercion or a range check, so its row is dropped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("title is missing or empty")]
    EmptyTitle,
    #[error("title is a placeholder: {0}")]
    PlaceholderTitle(String),
    #[error("price is missing")]
    MissingPrice,
    #[error("price is not a number: {0}")]
    UnparsablePrice(String),
    #[error("price is negative: {0}")]
    NegativePrice(f64),
    #[error("rating has no numeric value")]
    MissingRating,
    #[error("rating {0} is outside 0..=5")]
    RatingOutOfRange(f64),
    #[error("timestamp is missing")]
    MissingTimestamp,
    #[error("timestamp is not recognised: {0}")]
    UnparsableTimestamp(String),
}

impl ValidationError {
    /// Stable label used to tally rejections by cause.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::EmptyTitle => "empty_title",
            ValidationError::PlaceholderTitle(_) => "placeholder_title",
            ValidationError::MissingPrice => "missing_price",
            ValidationError::UnparsablePrice(_) => "unparsable_price",
            ValidationError::NegativePrice(_) => "negative_price",
            ValidationError::MissingRating => "missing_rating",
            ValidationError::RatingOutOfRange(_) => "rating_out_of_range",
            ValidationError::MissingTimestamp => "missing_timestamp",
            ValidationError::UnparsableTimestamp(_) => "unparsable_timestamp",
        }
    }
}

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("rejected {rejected} of {input} rows, above the allowed rate of {max_rate}")]
    RejectionRateExceeded {
        rejected: usize,
        input: usize,
        max_rate: f64,
    },
}

/// Writing to a sink failed.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("spreadsheet service rejected the credentials (HTTP {0})")]
    Unauthorized(u16),
    #[error("could not obtain a spreadsheet access token: {0}")]
    Auth(String),
    #[error("spreadsheet quota exceeded")]
    QuotaExceeded,
    #[error("spreadsheet request failed: {0}")]
    Remote(String),
    #[error("no spreadsheet credentials configured")]
    MissingCredentials,
}

/// Failures that end the run. Each carries the summaries of the stages that
/// did complete.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(
        "extraction produced no records ({} pages fetched, {} empty, {} failed)",
        .0.pages_fetched, .0.pages_empty, .0.pages_failed
    )]
    NothingExtracted(ExtractSummary),
    #[error(
        "every extracted record was rejected ({} rejected, {} duplicates of {} extracted)",
        .transform.rejected, .transform.duplicates, .transform.input
    )]
    NothingToLoad {
        extract: ExtractSummary,
        transform: TransformSummary,
    },
    #[error("{source} ({} records extracted)", .extract.records)]
    Transform {
        source: TransformError,
        extract: ExtractSummary,
    },
    #[error("local output could not be written: {source}")]
    LocalSink {
        source: SinkError,
        extract: ExtractSummary,
        transform: TransformSummary,
    },
}
