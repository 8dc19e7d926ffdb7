use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error taxonomy. Every variant aborts the run; there are no
/// retries. The one tolerated condition, table-delete not-found, is
/// handled inside the loader and never surfaces here.
#[derive(Error, Debug)]
pub enum Error {
    /// Credential file could not be loaded or a token could not be minted.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The search-analytics API call failed (HTTP error, quota, bad body).
    #[error("search analytics request failed: {0}")]
    RemoteService(String),

    /// Upload of the staged CSV to object storage failed.
    #[error("staging upload failed: {0}")]
    Storage(String),

    /// The warehouse load job did not reach the success state, or the
    /// preceding table delete failed with something other than not-found.
    #[error("load job failed: {0}")]
    LoadJob(String),

    /// A response row's key tuple did not line up with the dimension list.
    #[error("dimension decode failed: expected {expected} keys, got {actual}")]
    Decode { expected: usize, actual: usize },

    /// CLI date argument was not a valid `yyyy-mm-dd` date.
    #[error("invalid run date {0}")]
    InvalidDate(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
