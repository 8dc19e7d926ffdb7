use anyhow::Result;
use clap::Parser;
use gscsync::{
    config::{Config, RunDate},
    fetch,
    load::Loader,
    process,
    stage::Stager,
};
use reqwest::Client;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Pull one day of Search Console data into BigQuery via GCS.
#[derive(Parser, Debug)]
#[command(name = "gscsync")]
struct Args {
    /// End date of the query window; yyyy-mm-dd
    date: RunDate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let args = Args::parse();
    let run_date = args.date;
    let config = Config::default();

    // GCS and BigQuery clients authenticate through ADC; point it at
    // the fixed service-account key. The Search Console credential is
    // loaded separately by the extractor.
    std::env::set_var(
        "GOOGLE_APPLICATION_CREDENTIALS",
        &config.gcp_credentials_path,
    );

    // ─── 2) fetch & normalize ────────────────────────────────────────
    info!(file = %run_date.file_name(), "start creating csv file");
    let http = Client::new();
    let raw = fetch::fetch_rows(&http, &config, run_date).await?;
    info!(rows = raw.len(), "fetched analytics rows");
    let rows = process::normalize(raw)?;

    // ─── 3) stage to gcs ─────────────────────────────────────────────
    let stager = Stager::new(config.clone()).await?;
    let object = stager.stage(run_date, &rows).await?;

    // ─── 4) load into bigquery ───────────────────────────────────────
    info!(table = %run_date.table_name(), "start creating table");
    let loader = Loader::new(config.clone()).await?;
    let report = loader.run_load(run_date).await?;

    info!(
        table = %report.table_id,
        object = %object,
        rows = rows.len(),
        "run complete"
    );
    Ok(())
}
