use std::future::Future;

use anyhow::Context;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use log::{debug, info};
use reqwest::{Client, ClientBuilder, Response, StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    config::{SheetsConfig, SheetsCredentials},
    error::SinkError,
};

const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Remote spreadsheet that can have a whole sheet's contents replaced.
pub trait SpreadsheetClient {
    /// Makes `rows` the only contents of `sheet_name`, starting at its
    /// top-left cell. Returns the number of cells written.
    fn replace_values(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        rows: &[Vec<Value>],
    ) -> impl Future<Output = Result<usize, SinkError>>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Vec<Value>],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    #[serde(default)]
    updated_cells: usize,
}

#[derive(Serialize)]
struct BatchClearRequest {
    ranges: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

enum TokenSource {
    Static(String),
    /// Caches the minted token and refreshes it when it expires.
    ServiceAccount(CustomServiceAccount),
}

impl TokenSource {
    async fn bearer(&self) -> Result<String, SinkError> {
        match self {
            TokenSource::Static(token) => Ok(token.clone()),
            TokenSource::ServiceAccount(account) => account
                .token(&[SPREADSHEETS_SCOPE])
                .await
                .map(|token| token.as_str().to_string())
                .map_err(|e| SinkError::Auth(e.to_string())),
        }
    }
}

/// Google Sheets v4 values API, authenticated with either a fixed bearer
/// token or a service account key.
pub struct GoogleSheetsClient {
    client: Client,
    api_url: String,
    tokens: TokenSource,
}

impl GoogleSheetsClient {
    pub fn new(config: &SheetsConfig) -> anyhow::Result<Self> {
        let client = ClientBuilder::new().build()?;
        let tokens = match &config.credentials {
            SheetsCredentials::AccessToken(token) => TokenSource::Static(token.clone()),
            SheetsCredentials::ServiceAccountFile(path) => {
                let account = CustomServiceAccount::from_file(path)
                    .with_context(|| format!("failed to load service account key {}", path.display()))?;
                info!("Using service account key {} for the spreadsheet", path.display());
                TokenSource::ServiceAccount(account)
            }
        };
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            tokens,
        })
    }

    fn spreadsheet_url(&self, spreadsheet_id: &str, rest: &[&str]) -> Result<Url, SinkError> {
        let mut url =
            Url::parse(&self.api_url).map_err(|e| SinkError::Remote(format!("bad api url {}: {e}", self.api_url)))?;
        url.path_segments_mut()
            .map_err(|_| SinkError::Remote(format!("bad api url {}", self.api_url)))?
            .pop_if_empty()
            .extend(["v4", "spreadsheets", spreadsheet_id])
            .extend(rest);
        Ok(url)
    }

    fn values_url(&self, spreadsheet_id: &str, range: &str) -> Result<Url, SinkError> {
        self.spreadsheet_url(spreadsheet_id, &["values", range])
    }
}

impl SpreadsheetClient for GoogleSheetsClient {
    async fn replace_values(
        &self,
        spreadsheet_id: &str,
        sheet_name: &str,
        rows: &[Vec<Value>],
    ) -> Result<usize, SinkError> {
        let sheet = quote_sheet_name(sheet_name);
        let token = self.tokens.bearer().await?;

        // Write before clearing: if the write fails the old table stays whole.
        let update_range = format!("{sheet}!A1");
        let mut update_url = self.values_url(spreadsheet_id, &update_range)?;
        update_url
            .query_pairs_mut()
            .append_pair("valueInputOption", "USER_ENTERED");
        let body = ValueRange {
            range: &update_range,
            major_dimension: "ROWS",
            values: rows,
        };
        let response = self
            .client
            .put(update_url)
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let response = check_status(response).await?;
        let updated: UpdateValuesResponse = response.json().await.map_err(transport_error)?;

        let leftovers = BatchClearRequest {
            ranges: leftover_ranges(&sheet, rows),
        };
        debug!("Clearing {}", leftovers.ranges.join(", "));
        let response = self
            .client
            .post(self.spreadsheet_url(spreadsheet_id, &["values:batchClear"])?)
            .bearer_auth(&token)
            .json(&leftovers)
            .send()
            .await
            .map_err(transport_error)?;
        check_status(response).await?;

        info!("Wrote {} cells to spreadsheet {spreadsheet_id}", updated.updated_cells);
        Ok(updated.updated_cells)
    }
}

fn transport_error(err: reqwest::Error) -> SinkError {
    SinkError::Remote(err.to_string())
}

async fn check_status(response: Response) -> Result<Response, SinkError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, &body))
}

fn status_error(status: StatusCode, body: &str) -> SinkError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SinkError::Unauthorized(status.as_u16()),
        StatusCode::TOO_MANY_REQUESTS => SinkError::QuotaExceeded,
        _ => {
            let message = serde_json::from_str::<ErrorBody>(body)
                .map(|b| b.error.message)
                .unwrap_or_else(|_| body.trim().to_string());
            SinkError::Remote(format!("HTTP {}: {message}", status.as_u16()))
        }
    }
}

/// Cells an older, larger table may have left outside `rows`: everything
/// below it, and everything right of it up to column Z.
fn leftover_ranges(sheet: &str, rows: &[Vec<Value>]) -> Vec<String> {
    let height = rows.len();
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut ranges = vec![format!("{sheet}!A{}:Z", height + 1)];
    if height > 0 && width < 26 {
        let next_column = char::from(b'A' + width as u8);
        ranges.push(format!("{sheet}!{next_column}1:Z{height}"));
    }
    ranges
}

/// A1 notation needs sheet names with anything but letters, digits and
/// underscores wrapped in single quotes (with inner quotes doubled).
fn quote_sheet_name(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("'{}'", name.replace('\'', "''"))
    }
}
