// Mapping of service errors onto HTTP responses
use crate::application::service_error::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ServiceError::Core(_) => StatusCode::BAD_REQUEST,
            ServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            ServiceError::Core(err) => json!({ "error": err.kind(), "message": err.to_string() }),
            ServiceError::Repository(err) => {
                tracing::error!("Error querying readings: {:#}", err);
                json!({ "error": "Internal", "message": "failed to query readings" })
            }
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::CoreError;

    #[test]
    fn test_status_mapping() {
        let bad = ApiError::from(ServiceError::from(CoreError::InvalidPeriod("2w".to_string())));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
        assert_eq!(bad.into_response().status(), StatusCode::BAD_REQUEST);

        let down = ApiError::from(ServiceError::from(anyhow::anyhow!("connection refused")));
        assert_eq!(down.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
