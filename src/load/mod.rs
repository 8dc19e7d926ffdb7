use std::time::Duration;

use google_cloud_bigquery::client::{Client, ClientConfig};
use google_cloud_bigquery::http::error::Error as BqError;
use google_cloud_bigquery::http::job::get::GetJobRequest;
use google_cloud_bigquery::http::job::{
    Job, JobConfiguration, JobConfigurationLoad, JobReference, JobState, JobType,
};
use google_cloud_bigquery::http::table::{SourceFormat, TableReference};
use tokio::time::sleep;
use tracing::{debug, info};

use crate::config::{Config, RunDate};
use crate::error::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Outcome of a finished load job: the terminal state plus whatever
/// error detail the service attached. Returned to the caller instead of
/// asserting on the job state.
#[derive(Debug)]
pub struct LoadReport {
    pub table_id: String,
    pub job_id: String,
}

/// Replaces the per-day warehouse table from the staged CSV: delete the
/// old table if present, submit a load job with schema autodetection,
/// and block until the job reaches a terminal state.
pub struct Loader {
    config: Config,
    client: Client,
    project_id: String,
}

impl Loader {
    pub async fn new(config: Config) -> Result<Self> {
        let (client_config, project_id) = ClientConfig::new_with_auth()
            .await
            .map_err(|e| Error::Auth(format!("authenticating to BigQuery: {e}")))?;
        let project_id = project_id
            .ok_or_else(|| Error::Auth("credentials carry no project id".to_string()))?;
        let client = Client::new(client_config)
            .await
            .map_err(|e| Error::Auth(format!("building BigQuery client: {e}")))?;
        Ok(Self {
            config,
            client,
            project_id,
        })
    }

    /// Delete-then-load for the run date's table. Idempotent across
    /// reruns: the delete clears any previous run's table first.
    pub async fn run_load(&self, run_date: RunDate) -> Result<LoadReport> {
        let table_id = run_date.table_name();
        self.delete_table_if_exists(&table_id).await?;

        let job_id = format!(
            "gscsync_load_{}_{}",
            table_id,
            chrono::Utc::now().timestamp_millis()
        );
        let uri = self.config.staged_uri(run_date);
        info!(table = %table_id, job = %job_id, source = %uri, "submitting load job");

        let job = self.build_load_job(&table_id, &job_id, uri);
        let submitted = self
            .client
            .job()
            .create(&job)
            .await
            .map_err(|e| Error::LoadJob(format!("submitting job {job_id}: {e}")))?;

        let finished = self.wait_for_job(submitted).await?;
        check_terminal_state(&finished)?;

        info!(table = %table_id, job = %job_id, "load job done");
        Ok(LoadReport { table_id, job_id })
    }

    fn build_load_job(&self, table_id: &str, job_id: &str, uri: String) -> Job {
        Job {
            job_reference: JobReference {
                project_id: self.project_id.clone(),
                job_id: job_id.to_string(),
                location: None,
            },
            configuration: JobConfiguration {
                job: JobType::Load(JobConfigurationLoad {
                    source_uris: vec![uri],
                    destination_table: TableReference {
                        project_id: self.project_id.clone(),
                        dataset_id: self.config.dataset_id.clone(),
                        table_id: table_id.to_string(),
                    },
                    source_format: Some(SourceFormat::Csv),
                    skip_leading_rows: Some(1),
                    autodetect: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Not-found is success (the table simply was not there); any other
    /// delete error propagates so permission or connectivity faults are
    /// not hidden.
    async fn delete_table_if_exists(&self, table_id: &str) -> Result<()> {
        match self
            .client
            .table()
            .delete(&self.project_id, &self.config.dataset_id, table_id)
            .await
        {
            Ok(()) => {
                info!(table = %table_id, "deleted existing table");
                Ok(())
            }
            Err(e) if is_not_found(&e) => {
                debug!(table = %table_id, "no existing table to delete");
                Ok(())
            }
            Err(e) => Err(Error::LoadJob(format!("deleting table {table_id}: {e}"))),
        }
    }

    async fn wait_for_job(&self, mut job: Job) -> Result<Job> {
        let job_id = job.job_reference.job_id.clone();
        loop {
            if job.status.state == JobState::Done {
                return Ok(job);
            }
            debug!(job = %job_id, state = ?job.status.state, "load job still running");
            sleep(POLL_INTERVAL).await;
            job = self
                .client
                .job()
                .get(&self.project_id, &job_id, &GetJobRequest::default())
                .await
                .map_err(|e| Error::LoadJob(format!("polling job {job_id}: {e}")))?;
        }
    }
}

fn is_not_found(err: &BqError) -> bool {
    match err {
        BqError::Response(resp) => resp.code == 404,
        _ => false,
    }
}

/// A job can reach `Done` and still have failed; the attached error
/// result is authoritative.
fn check_terminal_state(job: &Job) -> Result<()> {
    if let Some(err) = &job.status.error_result {
        return Err(Error::LoadJob(format!(
            "job {} finished with error: {} ({})",
            job.job_reference.job_id,
            err.message.as_deref().unwrap_or("unknown"),
            err.reason.as_deref().unwrap_or("no reason"),
        )));
    }
    Ok(())
}
