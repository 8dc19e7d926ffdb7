//! Daily Search Console → GCS → BigQuery pipeline.
//!
//! One invocation handles one end date: fetch dimensioned search
//! analytics rows, flatten them into named columns, stage them as a
//! CSV object, then load that object into a date-named table.

pub mod config;
pub mod error;
pub mod fetch;
pub mod load;
pub mod process;
pub mod stage;
