use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Envelope wrapped around every successful response.
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn with_data(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

impl SuccessResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub type ApiResult<T> = Result<Json<SuccessResponse<T>>, crate::error::ApiError>;
pub type Created<T> = Result<(StatusCode, Json<SuccessResponse<T>>), crate::error::ApiError>;

pub fn ok<T: Serialize>(message: &str, data: T) -> ApiResult<T> {
    Ok(Json(SuccessResponse::with_data(message, data)))
}

pub fn created<T: Serialize>(message: &str, data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(SuccessResponse::with_data(message, data))))
}

pub fn done(message: &str) -> ApiResult<()> {
    Ok(Json(SuccessResponse::message(message)))
}
