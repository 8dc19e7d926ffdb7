use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::{Error, Result};

/// Prefix shared by staged CSV objects and warehouse tables.
const NAME_PREFIX: &str = "gsc_";

/// Everything the pipeline needs to know about the outside world.
///
/// Immutable after construction; each stage borrows the same instance
/// instead of reading process-wide globals.
#[derive(Debug, Clone)]
pub struct Config {
    /// Search Console property, e.g. "https://parallux.net/".
    pub site_url: String,
    /// First day of the query window. The end day comes from the CLI.
    pub start_date: NaiveDate,
    /// GCS bucket holding staged CSVs.
    pub bucket: String,
    /// Object prefix inside the bucket, with trailing slash.
    pub object_prefix: String,
    /// BigQuery dataset the per-day tables live in.
    pub dataset_id: String,
    /// Service-account key for the Search Console API.
    pub client_secret_path: String,
    /// Service-account key for GCS and BigQuery.
    pub gcp_credentials_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_url: "https://parallux.net/".to_string(),
            start_date: NaiveDate::from_ymd_opt(2020, 7, 10).expect("valid constant date"),
            bucket: "gsc_storage_estyle".to_string(),
            object_prefix: "gsc_data/".to_string(),
            dataset_id: "gsc_dataset".to_string(),
            client_secret_path: "./client_secret.json".to_string(),
            gcp_credentials_path: "./credentials.json".to_string(),
        }
    }
}

impl Config {
    /// Fully qualified `gs://` URI for a staged object.
    pub fn staged_uri(&self, run_date: RunDate) -> String {
        format!(
            "gs://{}/{}{}",
            self.bucket,
            self.object_prefix,
            run_date.file_name()
        )
    }

    /// Object key (bucket-relative) for a staged CSV.
    pub fn object_name(&self, run_date: RunDate) -> String {
        format!("{}{}", self.object_prefix, run_date.file_name())
    }
}

/// The single date this invocation runs for. All derived names (staged
/// object, warehouse table) come from here so they cannot drift apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunDate(pub NaiveDate);

impl RunDate {
    /// The date as the API expects it: `yyyy-mm-dd`.
    pub fn as_iso(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// Compact `YYYYMMDD` form used in object and table names.
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    /// Staged CSV file name, e.g. `gsc_20210315.csv`.
    pub fn file_name(&self) -> String {
        format!("{}{}.csv", NAME_PREFIX, self.compact())
    }

    /// Warehouse table name, e.g. `gsc_20210315`.
    pub fn table_name(&self) -> String {
        format!("{}{}", NAME_PREFIX, self.compact())
    }
}

impl FromStr for RunDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| Error::InvalidDate(format!("{s:?}: {e}")))?;
        Ok(RunDate(date))
    }
}

impl fmt::Display for RunDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_iso())
    }
}
