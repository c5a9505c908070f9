use std::process::ExitCode;

use anyhow::Context;
use catalog_etl::{CollectionCardParser, EtlConfig, GoogleSheetsClient, RequestClient};
use dotenv::dotenv;
use log::{LevelFilter, error, info};

async fn run_job() -> anyhow::Result<()> {
    let config = EtlConfig::new()?;
    let fetcher = RequestClient::new(&config.extract).context("failed to build HTTP client")?;
    let parser = CollectionCardParser::new()?;
    let sheets = config
        .sheets
        .as_ref()
        .map(GoogleSheetsClient::new)
        .transpose()
        .context("failed to build spreadsheet client")?;

    let report = catalog_etl::run(&config, &fetcher, &parser, sheets.as_ref()).await?;
    report.log();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    match run_job().await {
        Ok(()) => {
            info!("ETL run finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("ETL run failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
