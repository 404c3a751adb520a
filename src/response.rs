//! Raw API responses and their mapping into models.

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

const TOTAL_COUNT_HEADER: &str = "x-pagination-total-count";
const PAGE_COUNT_HEADER: &str = "x-pagination-page-count";
const CURRENT_PAGE_HEADER: &str = "x-pagination-current-page";
const PER_PAGE_HEADER: &str = "x-pagination-per-page";

/// The response of a single API call.
///
/// Status codes are not interpreted: a 404 is still an `Ok` response. Use
/// [`is_success`](Self::is_success) or [`error_for_status`](Self::error_for_status)
/// to decide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers, names lowercased.
    pub headers: BTreeMap<String, String>,
    /// Raw response body.
    pub body: String,
}

/// Pagination information sent by list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Number of records across all pages.
    pub total_count: u64,
    /// Number of pages.
    pub page_count: u64,
    /// The page this response holds, starting at 1.
    pub current_page: u64,
    /// Records per page.
    pub per_page: u64,
}

impl EndpointResponse {
    /// Whether the status code is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Turn a non-success response into [`Error::Api`].
    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(Error::Api {
                status: self.status,
                body: self.body,
            })
        }
    }

    /// Decode the body as JSON.
    pub fn parsed(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Decode the body into a single model.
    pub fn model<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| {
            warn!(status = self.status, error = %e, "failed to decode response body");
            Error::Json(e)
        })
    }

    /// Decode the body into a list of models.
    pub fn models<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.model()
    }

    /// Pagination headers, if the endpoint sent them.
    pub fn pagination(&self) -> Option<Pagination> {
        let read = |name: &str| self.header(name)?.trim().parse::<u64>().ok();

        Some(Pagination {
            total_count: read(TOTAL_COUNT_HEADER)?,
            page_count: read(PAGE_COUNT_HEADER)?,
            current_page: read(CURRENT_PAGE_HEADER)?,
            per_page: read(PER_PAGE_HEADER)?,
        })
    }

    /// Whether this is the last page of a paginated list.
    ///
    /// Responses without pagination headers are a single page.
    pub fn is_last_page(&self) -> bool {
        self.pagination()
            .map_or(true, |p| p.current_page >= p.page_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str, headers: &[(&str, &str)]) -> EndpointResponse {
        EndpointResponse {
            status,
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            body: body.to_string(),
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: u32,
        #[serde(default)]
        name: Option<String>,
    }

    #[test]
    fn test_success_range() {
        assert!(response(200, "", &[]).is_success());
        assert!(response(204, "", &[]).is_success());
        assert!(!response(302, "", &[]).is_success());
        assert!(!response(422, "", &[]).is_success());
    }

    #[test]
    fn test_error_for_status() {
        let err = response(404, "missing", &[]).error_for_status().unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, ref body } if body == "missing"));

        assert!(response(200, "{}", &[]).error_for_status().is_ok());
    }

    #[test]
    fn test_model_ignores_unknown_keys() {
        let r = response(200, r#"{"id": 3, "unknown": true}"#, &[]);
        assert_eq!(r.model::<Item>().unwrap(), Item { id: 3, name: None });
        assert_eq!(r.parsed().unwrap(), json!({"id": 3, "unknown": true}));
    }

    #[test]
    fn test_models() {
        let r = response(200, r#"[{"id": 1}, {"id": 2, "name": "b"}]"#, &[]);
        let items: Vec<Item> = r.models().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].name.as_deref(), Some("b"));
    }

    #[test]
    fn test_model_decode_error() {
        let r = response(200, "not json", &[]);
        assert!(matches!(r.model::<Item>(), Err(Error::Json(_))));
    }

    #[test]
    fn test_pagination() {
        let r = response(
            200,
            "[]",
            &[
                ("x-pagination-total-count", "45"),
                ("x-pagination-page-count", "3"),
                ("x-pagination-current-page", "2"),
                ("x-pagination-per-page", "20"),
            ],
        );

        assert_eq!(
            r.pagination(),
            Some(Pagination {
                total_count: 45,
                page_count: 3,
                current_page: 2,
                per_page: 20,
            })
        );
        assert!(!r.is_last_page());
        assert_eq!(r.header("X-Pagination-Per-Page"), Some("20"));
    }

    #[test]
    fn test_without_pagination_headers() {
        let r = response(200, "[]", &[]);
        assert!(r.pagination().is_none());
        assert!(r.is_last_page());
    }
}
