use axum::extract::{FromRequest, FromRequestParts};
use serde::Deserialize;

use crate::error::ApiError;

// Wrappers over the axum extractors so malformed input is reported in the
// same envelope as every other error.

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

pub const DEFAULT_LIMIT: i64 = 100;
pub const MAX_LIMIT: i64 = 1000;
pub const DEFAULT_SEARCH_LIMIT: i64 = 10;
pub const MAX_SEARCH_LIMIT: i64 = 100;

pub(crate) fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

fn default_search_limit() -> i64 {
    DEFAULT_SEARCH_LIMIT
}

/// Validated offset pagination window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub skip: i64,
    pub limit: i64,
}

impl Page {
    pub fn new(skip: i64, limit: i64) -> Result<Self, ApiError> {
        if skip < 0 {
            return Err(ApiError::BadRequest("skip must be greater than or equal to 0".into()));
        }
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(ApiError::BadRequest(format!("limit must be between 1 and {MAX_LIMIT}")));
        }
        Ok(Self { skip, limit })
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl PageQuery {
    pub fn page(&self) -> Result<Page, ApiError> {
        Page::new(self.skip, self.limit)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

impl SearchQuery {
    /// Returns the search term and limit once both are in range.
    pub fn validate(&self) -> Result<(&str, i64), ApiError> {
        let q = self.q.as_deref().unwrap_or_default();
        if q.is_empty() {
            return Err(ApiError::BadRequest("q must be at least 1 character".into()));
        }
        if !(1..=MAX_SEARCH_LIMIT).contains(&self.limit) {
            return Err(ApiError::BadRequest(format!(
                "limit must be between 1 and {MAX_SEARCH_LIMIT}"
            )));
        }
        Ok((q, self.limit))
    }
}
