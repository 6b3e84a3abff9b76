use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString, IntoStaticStr};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RequestState {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl RequestState {
    pub fn is_pending(self) -> bool {
        self == RequestState::Pending
    }
}

/// A proposed change to an employee's own profile, decided by their direct
/// manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequest {
    pub id: u64,
    pub employee_id: u64,
    pub manager_id: u64,
    /// Serialized field-name to value mapping, only interpreted on approval.
    pub requested_changes: String,
    pub comment: Option<String>,
    pub state: RequestState,
    pub request_date: DateTime<Utc>,
    pub approved_date: Option<DateTime<Utc>>,
    pub approved_by: Option<u64>,
    pub rejected_date: Option<DateTime<Utc>>,
    pub rejected_by: Option<u64>,
    // Neither is written by approve/reject.
    pub approval_comment: Option<String>,
    pub rejection_comment: Option<String>,
}

impl ChangeRequest {
    pub fn label(&self, employee_name: &str) -> String {
        format!("Profile Change Request #{} - {}", self.id, employee_name)
    }

    /// True when `employee_id` is either side of the request.
    pub fn involves(&self, employee_id: u64) -> bool {
        self.employee_id == employee_id || self.manager_id == employee_id
    }
}

#[derive(Debug, Clone)]
pub struct NewChangeRequest {
    pub employee_id: u64,
    pub manager_id: u64,
    pub requested_changes: String,
    pub comment: Option<String>,
    pub request_date: DateTime<Utc>,
}

impl NewChangeRequest {
    pub fn into_request(self, id: u64) -> ChangeRequest {
        ChangeRequest {
            id,
            employee_id: self.employee_id,
            manager_id: self.manager_id,
            requested_changes: self.requested_changes,
            comment: self.comment,
            state: RequestState::Pending,
            request_date: self.request_date,
            approved_date: None,
            approved_by: None,
            rejected_date: None,
            rejected_by: None,
            approval_comment: None,
            rejection_comment: None,
        }
    }
}
