use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, de::DeserializeOwned};

/// The env vars the pipeline reads. Every one of them has a default except
/// the optional ones, so an empty environment still produces a usable config.
#[derive(Debug, Deserialize)]
pub struct EtlEnv {
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default = "default_max_pages")]
    max_pages: u32,
    #[serde(default = "default_max_products")]
    max_products: Option<usize>,
    #[serde(default = "default_true")]
    stop_on_empty_page: bool,
    #[serde(default)]
    stop_on_fetch_error: bool,
    #[serde(default = "default_request_delay_ms")]
    request_delay_ms: u64,
    #[serde(default = "default_request_timeout_secs")]
    request_timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    user_agent: String,

    #[serde(default = "default_exchange_rate")]
    exchange_rate: f64,
    #[serde(default = "default_source_currency_marker")]
    source_currency_marker: String,
    #[serde(default)]
    rating_required: bool,
    #[serde(default = "default_true")]
    dedupe_titles: bool,
    max_rejection_rate: Option<f64>,

    #[serde(default = "default_csv_path")]
    csv_path: PathBuf,
    raw_csv_path: Option<PathBuf>,
    spreadsheet_id: Option<String>,
    #[serde(default = "default_sheet_name")]
    sheet_name: String,
    /// Ready-made OAuth token; wins over the service account file.
    sheets_access_token: Option<String>,
    /// Path to a service account key (JSON), as used by Google's own tooling.
    google_application_credentials: Option<PathBuf>,
    #[serde(default = "default_sheets_api_url")]
    sheets_api_url: String,
}

fn default_base_url() -> String {
    "https://fashion-studio.dicoding.dev".to_string()
}

fn default_max_pages() -> u32 {
    50
}

fn default_max_products() -> Option<usize> {
    Some(1000)
}

fn default_true() -> bool {
    true
}

fn default_request_delay_ms() -> u64 {
    1000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_exchange_rate() -> f64 {
    16000.0
}

fn default_source_currency_marker() -> String {
    "$".to_string()
}

fn default_csv_path() -> PathBuf {
    PathBuf::from("products.csv")
}

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

fn default_sheets_api_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

/// What to do with a page that yields no listing blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyPagePolicy {
    /// Treat it as the end of the catalog.
    Stop,
    /// Move on to the next page.
    Skip,
}

/// What to do when a page can't be fetched at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorPolicy {
    /// Keep what was gathered so far and stop paginating.
    Stop,
    /// Move on to the next page.
    Skip,
}

#[derive(Debug, Clone)]
pub struct ExtractConfig {
    pub base_url: String,
    pub max_pages: u32,
    pub max_products: Option<usize>,
    pub on_empty_page: EmptyPagePolicy,
    pub on_fetch_error: FetchErrorPolicy,
    pub request_delay: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub raw_csv_path: Option<PathBuf>,
}

impl ExtractConfig {
    /// Page 1 lives at the base URL, later pages at `{base}/page{n}`.
    pub fn page_url(&self, page: u32) -> String {
        let base = self.base_url.trim_end_matches('/');
        if page <= 1 {
            base.to_string()
        } else {
            format!("{base}/page{page}")
        }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_pages: default_max_pages(),
            max_products: default_max_products(),
            on_empty_page: EmptyPagePolicy::Stop,
            on_fetch_error: FetchErrorPolicy::Skip,
            request_delay: Duration::from_millis(default_request_delay_ms()),
            request_timeout: Duration::from_secs(default_request_timeout_secs()),
            user_agent: default_user_agent(),
            raw_csv_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Multiplier applied to prices quoted in the source currency.
    pub exchange_rate: f64,
    /// Text that marks a price as quoted in the source currency.
    pub source_currency_marker: String,
    pub rating_required: bool,
    pub dedupe_titles: bool,
    /// Fraction of rejected rows (0.0..=1.0) above which the run fails.
    pub max_rejection_rate: Option<f64>,
    pub placeholder_titles: Vec<String>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            exchange_rate: default_exchange_rate(),
            source_currency_marker: default_source_currency_marker(),
            rating_required: false,
            dedupe_titles: true,
            max_rejection_rate: None,
            placeholder_titles: vec!["Unknown Product".to_string()],
        }
    }
}

/// Where the remote copy of the table goes.
#[derive(Debug, Clone)]
pub struct SheetTarget {
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub csv_path: PathBuf,
    pub sheet: Option<SheetTarget>,
}

/// How the spreadsheet client gets its bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetsCredentials {
    /// Used as is for every request.
    AccessToken(String),
    /// Service account key file; tokens are minted and refreshed from it.
    ServiceAccountFile(PathBuf),
}

/// Credentials and endpoint for the spreadsheet service.
#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub api_url: String,
    pub credentials: SheetsCredentials,
}

#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub extract: ExtractConfig,
    pub transform: TransformConfig,
    pub load: LoadConfig,
    pub sheets: Option<SheetsConfig>,
}

impl EtlConfig {
    pub fn new() -> anyhow::Result<Self> {
        let env = EtlEnv::load_from_env()?;
        Self::from_env(env)
    }

    pub fn from_env(env: EtlEnv) -> anyhow::Result<Self> {
        if env.max_pages == 0 {
            anyhow::bail!("MAX_PAGES must be at least 1");
        }
        if !(env.exchange_rate.is_finite() && env.exchange_rate > 0.0) {
            anyhow::bail!("EXCHANGE_RATE must be a positive number, got {}", env.exchange_rate);
        }
        if let Some(rate) = env.max_rejection_rate {
            if !(0.0..=1.0).contains(&rate) {
                anyhow::bail!("MAX_REJECTION_RATE must be within 0.0..=1.0, got {rate}");
            }
        }

        let extract = ExtractConfig {
            base_url: env.base_url,
            max_pages: env.max_pages,
            max_products: env.max_products.filter(|&n| n > 0),
            on_empty_page: if env.stop_on_empty_page {
                EmptyPagePolicy::Stop
            } else {
                EmptyPagePolicy::Skip
            },
            on_fetch_error: if env.stop_on_fetch_error {
                FetchErrorPolicy::Stop
            } else {
                FetchErrorPolicy::Skip
            },
            request_delay: Duration::from_millis(env.request_delay_ms),
            request_timeout: Duration::from_secs(env.request_timeout_secs),
            user_agent: env.user_agent,
            raw_csv_path: env.raw_csv_path,
        };

        let transform = TransformConfig {
            exchange_rate: env.exchange_rate,
            source_currency_marker: env.source_currency_marker,
            rating_required: env.rating_required,
            dedupe_titles: env.dedupe_titles,
            max_rejection_rate: env.max_rejection_rate,
            ..TransformConfig::default()
        };

        let load = LoadConfig {
            csv_path: env.csv_path,
            sheet: env
                .spreadsheet_id
                .filter(|id| !id.trim().is_empty())
                .map(|spreadsheet_id| SheetTarget {
                    spreadsheet_id,
                    sheet_name: env.sheet_name,
                }),
        };

        let token = env
            .sheets_access_token
            .filter(|token| !token.trim().is_empty())
            .map(SheetsCredentials::AccessToken);
        let key_file = env
            .google_application_credentials
            .filter(|path| !path.as_os_str().is_empty())
            .map(SheetsCredentials::ServiceAccountFile);
        let sheets = token.or(key_file).map(|credentials| SheetsConfig {
            api_url: env.sheets_api_url,
            credentials,
        });

        Ok(Self {
            extract,
            transform,
            load,
            sheets,
        })
    }
}

// Extension trait.
pub trait LoadFromEnv: DeserializeOwned {
    fn load_from_env() -> anyhow::Result<Self> {
        // Don't throw an error if .env file doesn't exist.
        let _ = dotenv::dotenv();
        let config =
            envy::from_env::<Self>().context("failed to load env variables into config struct")?;
        Ok(config)
    }
}

impl<T: DeserializeOwned> LoadFromEnv for T {}
