use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use derive_more::Display;
use serde_json::json;
use strum_macros::Display as StrumDisplay;

use crate::store::StoreError;

pub const MANAGER_MISMATCH: &str = "the manager must be the direct manager of the employee";
pub const MANAGER_REQUIRED: &str = "a manager is required";
pub const PENDING_REQUEST_EXISTS: &str = "you already have a pending profile change request";

/// Writes that are only allowed while a request is `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, StrumDisplay)]
pub enum Action {
    #[strum(serialize = "approved")]
    Approve,
    #[strum(serialize = "rejected")]
    Reject,
    #[strum(serialize = "reassigned")]
    Reassign,
}

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum WorkflowError {
    /// The request has already left `Pending`.
    #[display(fmt = "only pending requests can be {}", _0)]
    InvalidState(Action),
    /// `requested_changes` is not valid JSON.
    #[display(fmt = "invalid changes format: {}", _0)]
    MalformedPayload(String),
    /// The parsed changes could not be applied to the employee.
    #[display(fmt = "failed to apply changes: {}", _0)]
    Application(String),
    #[display(fmt = "{}", _0)]
    Validation(String),
    #[display(fmt = "{} #{} not found", entity, id)]
    NotFound { entity: &'static str, id: u64 },
    #[display(fmt = "storage error: {}", _0)]
    Store(StoreError),
}

impl std::error::Error for WorkflowError {}

impl WorkflowError {
    pub fn manager_mismatch() -> Self {
        WorkflowError::Validation(MANAGER_MISMATCH.to_string())
    }

    pub fn employee_not_found(id: u64) -> Self {
        WorkflowError::NotFound {
            entity: "employee",
            id,
        }
    }

    pub fn request_not_found(id: u64) -> Self {
        WorkflowError::NotFound {
            entity: "profile change request",
            id,
        }
    }
}

impl ResponseError for WorkflowError {
    fn status_code(&self) -> StatusCode {
        match self {
            WorkflowError::InvalidState(_) => StatusCode::CONFLICT,
            WorkflowError::MalformedPayload(_)
            | WorkflowError::Application(_)
            | WorkflowError::Validation(_) => StatusCode::BAD_REQUEST,
            WorkflowError::NotFound { .. } => StatusCode::NOT_FOUND,
            WorkflowError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            // storage details stay in the logs
            WorkflowError::Store(_) => "Internal Server Error".to_string(),
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({ "message": message }))
    }
}
