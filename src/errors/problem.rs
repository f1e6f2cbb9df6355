use std::fmt::{Display, Formatter};

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use diesel::result::DatabaseErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

const CONTENT_TYPE: &str = "application/problem+json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Problem {
        BadRequest(String),
        Conflict(String),
        Forbidden(String),
        InternalServerError(String),
        NotFound(String),
        Unauthorized(String),
}

impl Problem {
        pub fn status(&self) -> StatusCode {
                match self {
                        Problem::BadRequest(_) => StatusCode::BAD_REQUEST,
                        Problem::Conflict(_) => StatusCode::CONFLICT,
                        Problem::Forbidden(_) => StatusCode::FORBIDDEN,
                        Problem::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                        Problem::NotFound(_) => StatusCode::NOT_FOUND,
                        Problem::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                }
        }

        pub fn title(&self) -> &'static str {
                match self {
                        Problem::BadRequest(_) => "Bad Request",
                        Problem::Conflict(_) => "Conflict",
                        Problem::Forbidden(_) => "Forbidden",
                        Problem::InternalServerError(_) => "Internal Server Error",
                        Problem::NotFound(_) => "Not Found",
                        Problem::Unauthorized(_) => "Unauthorized",
                }
        }

        pub fn detail(&self) -> &str {
                match self {
                        Problem::BadRequest(detail)
                        | Problem::Conflict(detail)
                        | Problem::Forbidden(detail)
                        | Problem::InternalServerError(detail)
                        | Problem::NotFound(detail)
                        | Problem::Unauthorized(detail) => detail,
                }
        }

        pub fn capacity_exceeded(room_name: &str, available: i64, requested: i64) -> Self {
                Problem::Conflict(format!(
                        "Not enough capacity in {room_name}: {available} spot(s) available, {requested} requested (short by {})",
                        requested - available
                ))
        }
}

impl Display for Problem {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}: {}", self.title(), self.detail())
        }
}

impl std::error::Error for Problem {}

impl IntoResponse for Problem {
        fn into_response(self) -> Response {
                let status = self.status();
                let body = json!({
                    "success": false,
                    "status": status.as_u16(),
                    "title": self.title(),
                    "message": self.detail(),
                });

                (status, [(header::CONTENT_TYPE, CONTENT_TYPE)], body.to_string()).into_response()
        }
}

impl From<diesel::result::Error> for Problem {
        fn from(err: diesel::result::Error) -> Self {
                match err {
                        diesel::result::Error::NotFound => Problem::NotFound("Record not found".to_string()),
                        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                                Problem::Conflict(info.message().to_string())
                        }
                        diesel::result::Error::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info) => {
                                Problem::BadRequest(info.message().to_string())
                        }
                        diesel::result::Error::DatabaseError(DatabaseErrorKind::CheckViolation, info) => {
                                Problem::BadRequest(info.message().to_string())
                        }
                        err => {
                                error!("database error: {err}");
                                Problem::InternalServerError(format!("Database error: {err}"))
                        }
                }
        }
}

impl From<JsonRejection> for Problem {
        fn from(rejection: JsonRejection) -> Self {
                Problem::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
        }
}

impl From<MultipartRejection> for Problem {
        fn from(rejection: MultipartRejection) -> Self {
                Problem::BadRequest(rejection.body_text())
        }
}

impl From<MultipartError> for Problem {
        fn from(err: MultipartError) -> Self {
                Problem::BadRequest(format!("Invalid upload: {}", err.body_text()))
        }
}

impl From<diesel::r2d2::PoolError> for Problem {
        fn from(err: diesel::r2d2::PoolError) -> Self {
                error!("failed to pool connection: {err}");
                Problem::InternalServerError("failed to pool connection".to_string())
        }
}

#[cfg(test)]
mod tests {
        use super::*;
        use axum::body::to_bytes;

        #[tokio::test]
        async fn conflict_renders_problem_body() {
                let response = Problem::Conflict("Room is full".to_string()).into_response();

                assert_eq!(response.status(), StatusCode::CONFLICT);
                assert_eq!(response.headers().get(header::CONTENT_TYPE).unwrap(), CONTENT_TYPE);

                let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
                let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
                assert_eq!(body["success"], false);
                assert_eq!(body["status"], 409);
                assert_eq!(body["message"], "Room is full");
        }

        #[test]
        fn maps_statuses() {
                assert_eq!(Problem::BadRequest(String::new()).status(), StatusCode::BAD_REQUEST);
                assert_eq!(Problem::NotFound(String::new()).status(), StatusCode::NOT_FOUND);
                assert_eq!(Problem::Unauthorized(String::new()).status(), StatusCode::UNAUTHORIZED);
                assert_eq!(
                        Problem::InternalServerError(String::new()).status(),
                        StatusCode::INTERNAL_SERVER_ERROR
                );
        }

        #[test]
        fn diesel_not_found_is_404() {
                let problem = Problem::from(diesel::result::Error::NotFound);
                assert_eq!(problem.status(), StatusCode::NOT_FOUND);
        }

        #[test]
        fn capacity_exceeded_names_shortfall() {
                let problem = Problem::capacity_exceeded("Room A", 2, 5);
                assert_eq!(problem.status(), StatusCode::CONFLICT);
                assert!(problem.detail().contains("short by 3"));
                assert!(problem.detail().contains("Room A"));
        }
}
