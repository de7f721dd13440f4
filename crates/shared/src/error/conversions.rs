//! Error conversions - transport integration for [`AppError`]
//!
//! The HTTP response shape is `{"error": <message>, "request_id": <uuid>}`,
//! with `request_id` omitted when none was attached.

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for super::app_error::AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::Json;
        use axum::http::StatusCode;

        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = match self.request_id() {
            Some(request_id) => serde_json::json!({
                "error": self.message(),
                "request_id": request_id,
            }),
            None => serde_json::json!({
                "error": self.message(),
            }),
        };

        (status, Json(body)).into_response()
    }
}
