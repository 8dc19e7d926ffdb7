use std::sync::Arc;

use google_cloud_auth::credentials::CredentialsFile;
use google_cloud_auth::project::Config as AuthConfig;
use google_cloud_auth::token::DefaultTokenSourceProvider;
use google_cloud_token::{TokenSource, TokenSourceProvider};

use crate::error::{Error, Result};

/// Read-only Search Console scope; the pipeline never writes to GSC.
pub const SCOPES: [&str; 1] = ["https://www.googleapis.com/auth/webmasters.readonly"];

/// Build a token source from the service-account key file used for the
/// Search Console API. GCS and BigQuery authenticate separately through
/// `GOOGLE_APPLICATION_CREDENTIALS`.
pub async fn token_source(client_secret_path: &str) -> Result<Arc<dyn TokenSource>> {
    let credentials = CredentialsFile::new_from_file(client_secret_path.to_string())
        .await
        .map_err(|e| Error::Auth(format!("loading {client_secret_path}: {e}")))?;

    let provider = DefaultTokenSourceProvider::new_with_credentials(
        AuthConfig::default().with_scopes(&SCOPES),
        Box::new(credentials),
    )
    .await
    .map_err(|e| Error::Auth(e.to_string()))?;

    Ok(provider.token_source())
}
