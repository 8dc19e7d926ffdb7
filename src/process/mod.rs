use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::fetch::{AnalyticsRow, DIMENSIONS};

/// An [`AnalyticsRow`] with the positional `keys` tuple expanded into
/// named dimension columns and `page` percent-decoded.
///
/// Field order here is the CSV column order:
/// `clicks,impressions,ctr,position,query,date,country,device,page`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub clicks: f64,
    pub impressions: f64,
    pub ctr: f64,
    pub position: f64,
    pub query: String,
    pub date: String,
    pub country: String,
    pub device: String,
    pub page: String,
}

/// Expand every row's key tuple into named columns, preserving
/// response order. A tuple whose length does not match [`DIMENSIONS`]
/// fails the whole batch rather than silently mis-assigning values.
pub fn normalize(rows: Vec<AnalyticsRow>) -> Result<Vec<NormalizedRow>> {
    let out: Vec<NormalizedRow> = rows
        .into_iter()
        .map(normalize_row)
        .collect::<Result<_>>()?;
    debug!(rows = out.len(), "normalized analytics rows");
    Ok(out)
}

fn normalize_row(row: AnalyticsRow) -> Result<NormalizedRow> {
    // Destructure positionally in DIMENSIONS order; the API echoes the
    // requested dimension order back in each key tuple.
    let [query, date, country, device, page]: [String; DIMENSIONS.len()] =
        row.keys.try_into().map_err(|keys: Vec<String>| Error::Decode {
            expected: DIMENSIONS.len(),
            actual: keys.len(),
        })?;

    Ok(NormalizedRow {
        clicks: row.clicks,
        impressions: row.impressions,
        ctr: row.ctr,
        position: row.position,
        query,
        date,
        country,
        device,
        page: decode_page(&page),
    })
}

/// Undo percent-escaping in a page URL. Decoding an already-decoded
/// value is a no-op; invalid UTF-8 sequences are replaced rather than
/// failing the run.
pub fn decode_page(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(keys: &[&str]) -> AnalyticsRow {
        AnalyticsRow {
            keys: keys.iter().map(|k| k.to_string()).collect(),
            clicks: 3.0,
            impressions: 120.0,
            ctr: 0.025,
            position: 7.4,
        }
    }

    #[test]
    fn expands_keys_into_named_columns() {
        let rows = vec![row(&[
            "shoe",
            "2021-03-15",
            "us",
            "DESKTOP",
            "https://x/p%20age",
        ])];
        let normalized = normalize(rows).unwrap();

        assert_eq!(normalized.len(), 1);
        let n = &normalized[0];
        assert_eq!(n.query, "shoe");
        assert_eq!(n.date, "2021-03-15");
        assert_eq!(n.country, "us");
        assert_eq!(n.device, "DESKTOP");
        assert_eq!(n.page, "https://x/p age");
        assert_eq!(n.clicks, 3.0);
        assert_eq!(n.impressions, 120.0);
    }

    #[test]
    fn preserves_response_order() {
        let rows = vec![
            row(&["b", "2021-03-15", "jp", "MOBILE", "https://x/q"]),
            row(&["a", "2021-03-15", "us", "DESKTOP", "https://x/p"]),
        ];
        let normalized = normalize(rows).unwrap();
        assert_eq!(normalized[0].query, "b");
        assert_eq!(normalized[1].query, "a");
    }

    #[test]
    fn short_key_tuple_fails_loudly() {
        let rows = vec![row(&["shoe", "2021-03-15", "us"])];
        match normalize(rows) {
            Err(Error::Decode { expected, actual }) => {
                assert_eq!(expected, 5);
                assert_eq!(actual, 3);
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn long_key_tuple_fails_loudly() {
        let rows = vec![row(&["q", "d", "c", "dev", "p", "extra"])];
        assert!(matches!(
            normalize(rows),
            Err(Error::Decode {
                expected: 5,
                actual: 6
            })
        ));
    }

    #[test]
    fn page_decoding_is_idempotent() {
        let once = decode_page("https://x/p%20age%2Fsub");
        assert_eq!(once, "https://x/p age/sub");
        assert_eq!(decode_page(&once), once);
    }

    #[test]
    fn only_page_is_decoded() {
        let rows = vec![row(&[
            "sh%20oe",
            "2021-03-15",
            "us",
            "DESKTOP",
            "https://x/q",
        ])];
        let normalized = normalize(rows).unwrap();
        // escapes in non-page dimensions pass through untouched
        assert_eq!(normalized[0].query, "sh%20oe");
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(normalize(Vec::new()).unwrap().is_empty());
    }
}
