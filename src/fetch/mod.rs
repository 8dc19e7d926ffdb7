pub mod auth;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{Config, RunDate};
use crate::error::{Error, Result};

/// Dimensions requested from the API, in order. Row key tuples come
/// back in this same order; `process::normalize` depends on it.
pub const DIMENSIONS: [&str; 5] = ["query", "date", "country", "device", "page"];

/// Hard cap on returned rows. The API silently truncates beyond this;
/// there is no pagination loop.
pub const ROW_LIMIT: u32 = 5000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub start_date: String,
    pub end_date: String,
    pub dimensions: Vec<String>,
    pub row_limit: u32,
}

impl QueryRequest {
    pub fn for_window(config: &Config, run_date: RunDate) -> Self {
        Self {
            start_date: config.start_date.format("%Y-%m-%d").to_string(),
            end_date: run_date.as_iso(),
            dimensions: DIMENSIONS.iter().map(|d| d.to_string()).collect(),
            row_limit: ROW_LIMIT,
        }
    }
}

/// One result tuple from the search-analytics endpoint. `keys` holds
/// the dimension values positionally, aligned to [`DIMENSIONS`].
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsRow {
    #[serde(default)]
    pub keys: Vec<String>,
    pub clicks: f64,
    pub impressions: f64,
    pub ctr: f64,
    pub position: f64,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    // absent entirely when the window has no data
    #[serde(default)]
    rows: Vec<AnalyticsRow>,
}

fn query_endpoint(site_url: &str) -> String {
    let encoded = utf8_percent_encode(site_url, NON_ALPHANUMERIC);
    format!("https://www.googleapis.com/webmasters/v3/sites/{encoded}/searchAnalytics/query")
}

/// Run the single search-analytics query for the configured window.
/// Returns rows in response order, possibly empty.
pub async fn fetch_rows(
    http: &Client,
    config: &Config,
    run_date: RunDate,
) -> Result<Vec<AnalyticsRow>> {
    let token_source = auth::token_source(&config.client_secret_path).await?;
    let token = token_source
        .token()
        .await
        .map_err(|e| Error::Auth(format!("minting token: {e}")))?;

    let body = QueryRequest::for_window(config, run_date);
    info!(
        site = %config.site_url,
        start = %body.start_date,
        end = %body.end_date,
        "querying search analytics"
    );

    let resp = http
        .post(query_endpoint(&config.site_url))
        .header(AUTHORIZATION, token)
        .json(&body)
        .send()
        .await
        .map_err(|e| Error::RemoteService(e.to_string()))?;

    let status = resp.status();
    if !status.is_success() {
        let detail = resp.text().await.unwrap_or_default();
        return Err(Error::RemoteService(format!("HTTP {status}: {detail}")));
    }

    let parsed: QueryResponse = resp
        .json()
        .await
        .map_err(|e| Error::RemoteService(format!("decoding response: {e}")))?;

    if parsed.rows.len() as u32 == ROW_LIMIT {
        warn!(
            rows = parsed.rows.len(),
            "row count hit the API limit; results are probably truncated"
        );
    }
    debug!(rows = parsed.rows.len(), "search analytics response");

    Ok(parsed.rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn request_body_matches_api_contract() {
        let cfg = Config {
            start_date: NaiveDate::from_ymd_opt(2020, 7, 10).unwrap(),
            ..Config::default()
        };
        let run_date: RunDate = "2021-03-15".parse().unwrap();
        let body = QueryRequest::for_window(&cfg, run_date);

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["startDate"], "2020-07-10");
        assert_eq!(json["endDate"], "2021-03-15");
        assert_eq!(json["rowLimit"], 5000);
        assert_eq!(
            json["dimensions"],
            serde_json::json!(["query", "date", "country", "device", "page"])
        );
    }

    #[test]
    fn site_url_is_escaped_into_the_path() {
        let url = query_endpoint("https://parallux.net/");
        assert!(url.starts_with("https://www.googleapis.com/webmasters/v3/sites/"));
        assert!(url.ends_with("/searchAnalytics/query"));
        // the property URL must not introduce extra path segments
        assert!(!url.contains("sites/https://"));
    }

    #[test]
    fn empty_response_decodes_to_no_rows() {
        let parsed: QueryResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.rows.is_empty());
    }

    #[test]
    fn response_rows_decode_metrics_and_keys() {
        let raw = r#"{
            "rows": [
                {
                    "keys": ["shoe", "2021-03-15", "us", "DESKTOP", "https://x/p%20age"],
                    "clicks": 3.0,
                    "impressions": 120.0,
                    "ctr": 0.025,
                    "position": 7.4
                }
            ]
        }"#;
        let parsed: QueryResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.rows.len(), 1);
        let row = &parsed.rows[0];
        assert_eq!(row.keys.len(), DIMENSIONS.len());
        assert_eq!(row.clicks, 3.0);
        assert_eq!(row.keys[4], "https://x/p%20age");
    }
}
