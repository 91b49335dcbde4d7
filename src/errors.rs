use actix_web::HttpResponse;
use thiserror::Error;

use crate::domain::errors::DomainError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::NotFound(entity) => AppError::NotFound(entity),
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Conflict(msg) | DomainError::InvalidState(msg) => AppError::Conflict(msg),
            DomainError::InsufficientStock { .. } => AppError::Conflict(e.to_string()),
            DomainError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<actix_web::error::BlockingError> for AppError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl actix_web::ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let body = |msg: &str| serde_json::json!({ "ok": false, "msg": msg });
        match self {
            AppError::NotFound(_) => HttpResponse::NotFound().json(body(&self.to_string())),
            AppError::Validation(_) => HttpResponse::BadRequest().json(body(&self.to_string())),
            AppError::Conflict(_) => HttpResponse::Conflict().json(body(&self.to_string())),
            AppError::Internal(msg) => {
                log::error!("internal error: {}", msg);
                HttpResponse::InternalServerError().json(body("Internal server error"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::ResponseError;

    #[test]
    fn not_found_returns_404() {
        let resp = AppError::NotFound("Order").error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn validation_returns_400() {
        let resp = AppError::Validation("missing name".into()).error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn conflict_returns_409() {
        let resp = AppError::Conflict("category in use".into()).error_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_returns_500() {
        let resp = AppError::Internal("boom".into()).error_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn insufficient_stock_maps_to_conflict_naming_the_available_quantity() {
        let app: AppError = DomainError::InsufficientStock { available: 3 }.into();
        match &app {
            AppError::Conflict(msg) => assert!(msg.contains('3'), "got: {}", msg),
            other => panic!("expected Conflict, got {:?}", other),
        }
    }

    #[test]
    fn invalid_state_maps_to_conflict() {
        let app: AppError = DomainError::InvalidState("already accepted".into()).into();
        assert!(matches!(app, AppError::Conflict(_)));
    }

    #[test]
    fn domain_not_found_keeps_the_entity_name() {
        let app: AppError = DomainError::NotFound("Product").into();
        assert_eq!(app.to_string(), "Product not found");
    }
}
