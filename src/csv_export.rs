//! CSV export (spec §4.7/§6): snake_case headers, RFC3339 timestamps, fields containing
//! commas quoted — delegated to the `csv` crate's writer, which already quotes per RFC 4180.

use crate::error::Result;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub fn build_csv_bytes<T: Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    Ok(writer.into_inner().expect("in-memory writer never fails to flush"))
}

/// Builds a `text/csv` response with the `Content-Disposition` filename the spec mandates:
/// `{endpoint}-{date}.csv`.
pub fn csv_response<T: Serialize>(endpoint: &str, rows: &[T]) -> Result<Response> {
    let body = build_csv_bytes(rows)?;

    let date = chrono::Utc::now().format("%Y-%m-%d");
    let filename = format!("{endpoint}-{date}.csv");

    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, "text/csv; charset=utf-8".parse().unwrap());
    headers.insert(
        CONTENT_DISPOSITION,
        format!("attachment; filename=\"{filename}\"").parse().unwrap(),
    );

    Ok((headers, body).into_response())
}

/// True when the request asks for CSV: path ends in `.csv`, or `$format=text/csv`.
pub fn wants_csv(path: &str, format_param: Option<&str>) -> bool {
    path.ends_with(".csv") || format_param == Some("text/csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        commit_hash: String,
        message: String,
    }

    #[test]
    fn quotes_fields_containing_commas() {
        let rows = vec![Row {
            commit_hash: "abc123".into(),
            message: "fix, then refactor".into(),
        }];
        let bytes = build_csv_bytes(&rows).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"fix, then refactor\""));

        let mut reader = csv::Reader::from_reader(text.as_bytes());
        let record = reader.records().next().unwrap().unwrap();
        assert_eq!(record.get(1), Some("fix, then refactor"));
    }

    #[test]
    fn detects_csv_by_suffix_or_format_param() {
        assert!(wants_csv("/analytics/ai-code/commits.csv", None));
        assert!(wants_csv("/analytics/ai-code/commits", Some("text/csv")));
        assert!(!wants_csv("/analytics/ai-code/commits", None));
    }
}
