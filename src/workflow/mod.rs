//! Profile change request workflow.
//!
//! An employee submits a change to their own profile, their direct manager
//! approves or rejects it, and approval writes the change onto the employee.
//! Decisions are one-way: `Pending` moves to `Approved` or `Rejected` and
//! stays there.

pub mod changes;
pub mod clock;
pub mod error;
pub mod transition;

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::model::employee::Employee;
use crate::model::profile_change_request::{ChangeRequest, NewChangeRequest};
use crate::store::{ChangeRequestStore, RequestFilter, RequestPage, StoreError};
use clock::Clock;
use error::{Action, MANAGER_REQUIRED, PENDING_REQUEST_EXISTS, WorkflowError};
use transition::{check_manager_linkage, ensure_pending};

/// What an employee hands in; `employee_id` is the submitter's own record.
#[derive(Debug, Clone)]
pub struct Submission {
    pub employee_id: u64,
    /// Defaults to the employee's direct manager.
    pub manager_id: Option<u64>,
    pub requested_changes: String,
    pub comment: Option<String>,
}

/// Per-request result of a batch decision.
#[derive(Debug)]
pub struct BatchOutcome {
    pub id: u64,
    pub result: Result<ChangeRequest, WorkflowError>,
}

pub struct ChangeRequestWorkflow {
    store: Arc<dyn ChangeRequestStore>,
    clock: Arc<dyn Clock>,
    revalidate_manager_on_approval: bool,
}

impl ChangeRequestWorkflow {
    pub fn new(store: Arc<dyn ChangeRequestStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            revalidate_manager_on_approval: false,
        }
    }

    /// When enabled, an approval first re-checks that the request's manager
    /// is still the employee's direct manager.
    pub fn with_manager_revalidation(mut self, enabled: bool) -> Self {
        self.revalidate_manager_on_approval = enabled;
        self
    }

    pub async fn employee(&self, id: u64) -> Result<Employee, WorkflowError> {
        self.store
            .fetch_employee(id)
            .await
            .map_err(WorkflowError::Store)?
            .ok_or_else(|| WorkflowError::employee_not_found(id))
    }

    /// Deletes the employee together with their change requests.
    #[instrument(skip(self))]
    pub async fn delete_employee(&self, id: u64) -> Result<(), WorkflowError> {
        if self
            .store
            .delete_employee(id)
            .await
            .map_err(WorkflowError::Store)?
        {
            info!("Employee deleted");
            Ok(())
        } else {
            Err(WorkflowError::employee_not_found(id))
        }
    }

    pub async fn get(&self, id: u64) -> Result<ChangeRequest, WorkflowError> {
        self.store
            .fetch_request(id)
            .await
            .map_err(WorkflowError::Store)?
            .ok_or_else(|| WorkflowError::request_not_found(id))
    }

    /// Display label, e.g. `Profile Change Request #7 - Jane Roe`.
    pub async fn label(&self, request: &ChangeRequest) -> Result<String, WorkflowError> {
        let employee = self.employee(request.employee_id).await?;
        Ok(request.label(&employee.full_name()))
    }

    pub async fn list(&self, filter: &RequestFilter) -> Result<RequestPage, WorkflowError> {
        self.store
            .list_requests(filter)
            .await
            .map_err(WorkflowError::Store)
    }

    /// An employee has at most one pending request at a time.
    #[instrument(skip(self, submission), fields(employee_id = submission.employee_id))]
    pub async fn submit(&self, submission: Submission) -> Result<ChangeRequest, WorkflowError> {
        if submission.requested_changes.trim().is_empty() {
            return Err(WorkflowError::Validation(
                "requested changes are required".to_string(),
            ));
        }

        let employee = self.employee(submission.employee_id).await?;
        let manager_id = submission
            .manager_id
            .or(employee.manager_id)
            .ok_or_else(|| WorkflowError::Validation(MANAGER_REQUIRED.to_string()))?;
        check_manager_linkage(Some(&employee), Some(manager_id))?;

        let new = NewChangeRequest {
            employee_id: employee.id,
            manager_id,
            requested_changes: submission.requested_changes,
            comment: submission.comment.filter(|c| !c.trim().is_empty()),
            request_date: self.clock.now(),
        };

        let request = self.store.insert_request(new).await.map_err(|e| match e {
            StoreError::Conflict => WorkflowError::Validation(PENDING_REQUEST_EXISTS.to_string()),
            StoreError::Constraint(msg) => WorkflowError::Validation(msg),
            other => WorkflowError::Store(other),
        })?;

        info!(request_id = request.id, manager_id, "Profile change request submitted");
        Ok(request)
    }

    /// Points a pending request at a different manager. The new manager must
    /// be the employee's direct manager.
    #[instrument(skip(self))]
    pub async fn reassign_manager(
        &self,
        id: u64,
        manager_id: u64,
    ) -> Result<ChangeRequest, WorkflowError> {
        let mut request = self.get(id).await?;
        ensure_pending(&request, Action::Reassign)?;

        let employee = self.employee(request.employee_id).await?;
        check_manager_linkage(Some(&employee), Some(manager_id))?;

        self.store
            .update_manager(id, manager_id)
            .await
            .map_err(|e| decision_store_error(e, id, Action::Reassign))?;

        request.manager_id = manager_id;
        info!("Profile change request reassigned");
        Ok(request)
    }

    /// Applies the requested changes to the employee and marks the request
    /// approved. On any failure the employee and the request are left as
    /// they were.
    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        id: u64,
        acting_employee: u64,
    ) -> Result<ChangeRequest, WorkflowError> {
        let request = self.get(id).await?;
        ensure_pending(&request, Action::Approve)?;

        let employee = self.employee(request.employee_id).await?;
        if self.revalidate_manager_on_approval {
            check_manager_linkage(Some(&employee), Some(request.manager_id))?;
        }

        let approval = transition::approve(&request, &employee, acting_employee, self.clock.now())
            .inspect_err(|e| warn!(error = %e, "Approval refused"))?;

        self.store
            .commit_approval(&approval.request, &approval.changes)
            .await
            .map_err(|e| decision_store_error(e, id, Action::Approve))
            .inspect_err(|e| warn!(error = %e, "Approval not committed"))?;

        info!(
            employee_id = approval.employee.id,
            fields = approval.changes.len(),
            "Profile change request approved"
        );
        Ok(approval.request)
    }

    #[instrument(skip(self))]
    pub async fn reject(
        &self,
        id: u64,
        acting_employee: u64,
    ) -> Result<ChangeRequest, WorkflowError> {
        let request = self.get(id).await?;
        let rejected = transition::reject(&request, acting_employee, self.clock.now())?;

        self.store
            .commit_rejection(&rejected)
            .await
            .map_err(|e| decision_store_error(e, id, Action::Reject))?;

        info!("Profile change request rejected");
        Ok(rejected)
    }

    /// Approves each request in turn. Every request is its own unit of work,
    /// so a failure leaves earlier approvals committed.
    pub async fn approve_batch(&self, ids: &[u64], acting_employee: u64) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for &id in ids {
            outcomes.push(BatchOutcome {
                id,
                result: self.approve(id, acting_employee).await,
            });
        }
        outcomes
    }

    pub async fn reject_batch(&self, ids: &[u64], acting_employee: u64) -> Vec<BatchOutcome> {
        let mut outcomes = Vec::with_capacity(ids.len());
        for &id in ids {
            outcomes.push(BatchOutcome {
                id,
                result: self.reject(id, acting_employee).await,
            });
        }
        outcomes
    }
}

fn decision_store_error(err: StoreError, id: u64, action: Action) -> WorkflowError {
    match err {
        // lost a race with another decision
        StoreError::Conflict => WorkflowError::InvalidState(action),
        StoreError::NotFound => WorkflowError::request_not_found(id),
        StoreError::Constraint(msg) if action == Action::Approve => WorkflowError::Application(msg),
        StoreError::Constraint(msg) => WorkflowError::Validation(msg),
        other => WorkflowError::Store(other),
    }
}
