use std::io::Write;

use google_cloud_storage::client::{Client, ClientConfig};
use google_cloud_storage::http::objects::upload::{Media, UploadObjectRequest, UploadType};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::{Config, RunDate};
use crate::error::{Error, Result};
use crate::process::NormalizedRow;

/// Serializes normalized rows to CSV and uploads them to the staging
/// bucket. The intermediate CSV lives in a named temp file whose
/// lifetime is scoped to the call, so it is removed whether or not the
/// upload succeeds.
pub struct Stager {
    config: Config,
    client: Client,
}

impl Stager {
    pub async fn new(config: Config) -> Result<Self> {
        let client_config = ClientConfig::default()
            .with_auth()
            .await
            .map_err(|e| Error::Auth(format!("authenticating to GCS: {e}")))?;
        Ok(Self {
            config,
            client: Client::new(client_config),
        })
    }

    /// Write `rows` as CSV and upload to
    /// `gs://<bucket>/<prefix>gsc_YYYYMMDD.csv`. Returns the object name
    /// inside the bucket.
    pub async fn stage(&self, run_date: RunDate, rows: &[NormalizedRow]) -> Result<String> {
        let object_name = self.config.object_name(run_date);

        // Temp file is deleted on drop, on every exit path.
        let mut temp = NamedTempFile::new()?;
        write_csv(rows, temp.as_file_mut())?;
        temp.as_file_mut().flush()?;
        debug!(path = %temp.path().display(), rows = rows.len(), "wrote staging csv");

        let bytes = std::fs::read(temp.path())?;
        let upload_type = UploadType::Simple(Media::new(object_name.clone()));
        let request = UploadObjectRequest {
            bucket: self.config.bucket.clone(),
            ..Default::default()
        };

        self.client
            .upload_object(&request, bytes, &upload_type)
            .await
            .map_err(|e| {
                Error::Storage(format!(
                    "uploading {} to bucket {}: {e}",
                    object_name, self.config.bucket
                ))
            })?;

        info!(object = %object_name, bucket = %self.config.bucket, "staged csv in gcs");
        Ok(object_name)
    }
}

/// CSV column order: metric columns first, then the dimensions. Must
/// match [`NormalizedRow`] field order, which serde emits from.
pub const CSV_HEADER: [&str; 9] = [
    "clicks",
    "impressions",
    "ctr",
    "position",
    "query",
    "date",
    "country",
    "device",
    "page",
];

/// Serialize rows as comma-delimited UTF-8 CSV with a header row and no
/// index column. An empty row set still gets the header so the staged
/// object is a valid, zero-row CSV.
pub fn write_csv<W: Write>(rows: &[NormalizedRow], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        wtr.write_record(CSV_HEADER)?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
