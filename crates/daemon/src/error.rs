use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use studionavi_common::api::{
    ApiEnvelope, AVAILABILITY_FETCH_ERROR, INVALID_PARAMETER, STUDIO_NOT_CONFIGURED, STUDIO_NOT_FOUND,
};
use studionavi_common::StudioId;
use thiserror::Error;
use tracing::error;

use crate::checker::CheckerError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("必須パラメータが不足しています")]
    MissingParameter,

    #[error("パラメータが不正です: {0}")]
    InvalidParameter(String),

    #[error("スタジオが見つかりません (id={0})")]
    StudioNotFound(StudioId),

    #[error("このスタジオは空き状況確認に対応していません")]
    NotConfigured,

    #[error("空き状況の取得に失敗しました")]
    Storage(#[from] rusqlite::Error),
}

impl From<CheckerError> for ApiError {
    fn from(err: CheckerError) -> Self {
        ApiError::InvalidParameter(err.to_string())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter | ApiError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
            ApiError::StudioNotFound(_) | ApiError::NotConfigured => StatusCode::NOT_FOUND,
            ApiError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingParameter | ApiError::InvalidParameter(_) => INVALID_PARAMETER,
            ApiError::StudioNotFound(_) => STUDIO_NOT_FOUND,
            ApiError::NotConfigured => STUDIO_NOT_CONFIGURED,
            ApiError::Storage(_) => AVAILABILITY_FETCH_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(ref e) = self {
            error!(error = %e, "database query failed");
        }
        let body: ApiEnvelope<()> = ApiEnvelope::error(self.code(), self.to_string());
        (self.status(), Json(body)).into_response()
    }
}
