//! Pure state transitions for a change request. Nothing here touches
//! storage; callers persist the returned values.

use chrono::{DateTime, Utc};

use crate::model::employee::Employee;
use crate::model::profile_change_request::{ChangeRequest, RequestState};
use crate::workflow::changes::ChangeSet;
use crate::workflow::error::{Action, WorkflowError};

/// Everything an approval needs to persist, computed up front.
#[derive(Debug, Clone)]
pub struct Approval {
    pub request: ChangeRequest,
    pub employee: Employee,
    pub changes: ChangeSet,
}

/// The manager on a request must be the employee's direct manager. Passes
/// when either side is not known yet.
pub fn check_manager_linkage(
    employee: Option<&Employee>,
    manager_id: Option<u64>,
) -> Result<(), WorkflowError> {
    match (employee, manager_id) {
        (Some(employee), Some(manager_id)) if employee.manager_id != Some(manager_id) => {
            Err(WorkflowError::manager_mismatch())
        }
        _ => Ok(()),
    }
}

pub fn approve(
    request: &ChangeRequest,
    employee: &Employee,
    acting_employee: u64,
    now: DateTime<Utc>,
) -> Result<Approval, WorkflowError> {
    ensure_pending(request, Action::Approve)?;

    if employee.id != request.employee_id {
        return Err(WorkflowError::Application(format!(
            "request #{} belongs to employee #{}, not #{}",
            request.id, request.employee_id, employee.id
        )));
    }

    let changes = ChangeSet::parse(&request.requested_changes)?;
    let updated = changes.apply_to(employee)?;

    let mut approved = request.clone();
    approved.state = RequestState::Approved;
    approved.approved_date = Some(now);
    approved.approved_by = Some(acting_employee);

    Ok(Approval {
        request: approved,
        employee: updated,
        changes,
    })
}

pub fn reject(
    request: &ChangeRequest,
    acting_employee: u64,
    now: DateTime<Utc>,
) -> Result<ChangeRequest, WorkflowError> {
    ensure_pending(request, Action::Reject)?;

    let mut rejected = request.clone();
    rejected.state = RequestState::Rejected;
    rejected.rejected_date = Some(now);
    rejected.rejected_by = Some(acting_employee);
    Ok(rejected)
}

pub fn ensure_pending(request: &ChangeRequest, action: Action) -> Result<(), WorkflowError> {
    if request.state.is_pending() {
        Ok(())
    } else {
        Err(WorkflowError::InvalidState(action))
    }
}
