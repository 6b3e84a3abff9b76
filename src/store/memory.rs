use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{ChangeRequestStore, ListedRequest, RequestFilter, RequestPage, StoreError};
use crate::model::employee::Employee;
use crate::model::profile_change_request::{ChangeRequest, NewChangeRequest};
use crate::workflow::changes::ChangeSet;
use crate::workflow::error::WorkflowError;

#[derive(Default)]
struct State {
    employees: BTreeMap<u64, Employee>,
    requests: BTreeMap<u64, ChangeRequest>,
    last_request_id: u64,
}

impl State {
    fn pending_request(&self, id: u64) -> Result<&ChangeRequest, StoreError> {
        let stored = self.requests.get(&id).ok_or(StoreError::NotFound)?;
        if stored.state.is_pending() {
            Ok(stored)
        } else {
            Err(StoreError::Conflict)
        }
    }

    fn ensure_employee(&self, id: u64, what: &str) -> Result<(), StoreError> {
        if self.employees.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::Constraint(format!(
                "{what} references unknown employee #{id}"
            )))
        }
    }

    /// Mirrors the table constraints on `employees`.
    fn check_employee(&self, employee: &Employee) -> Result<(), StoreError> {
        for other in self.employees.values().filter(|e| e.id != employee.id) {
            if other.email == employee.email {
                return Err(StoreError::Constraint(format!(
                    "duplicate entry '{}' for key 'employees.email'",
                    employee.email
                )));
            }
            if other.employee_code == employee.employee_code {
                return Err(StoreError::Constraint(format!(
                    "duplicate entry '{}' for key 'employees.employee_code'",
                    employee.employee_code
                )));
            }
        }
        if let Some(manager_id) = employee.manager_id {
            self.ensure_employee(manager_id, "manager_id")?;
        }
        Ok(())
    }

    fn has_pending(&self, employee_id: u64) -> bool {
        self.requests
            .values()
            .any(|r| r.employee_id == employee_id && r.state.is_pending())
    }

    fn listed(&self, request: &ChangeRequest) -> ListedRequest {
        ListedRequest {
            request: request.clone(),
            employee_name: self
                .employees
                .get(&request.employee_id)
                .map(Employee::full_name)
                .unwrap_or_default(),
        }
    }
}

fn matches_filter(filter: &RequestFilter, request: &ChangeRequest) -> bool {
    filter.employee_id.is_none_or(|id| request.employee_id == id)
        && filter.manager_id.is_none_or(|id| request.manager_id == id)
        && filter.party.is_none_or(|id| request.involves(id))
        && filter.state.is_none_or(|state| request.state == state)
}

/// Process-local store with the same guarantees as the MySQL one: unique
/// email and employee code, existing references, cascade delete and
/// pending-guarded decisions.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    pub fn insert_employee(&self, employee: Employee) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.check_employee(&employee)?;
        state.employees.insert(employee.id, employee);
        Ok(())
    }
}

#[async_trait]
impl ChangeRequestStore for MemoryStore {
    async fn fetch_employee(&self, id: u64) -> Result<Option<Employee>, StoreError> {
        Ok(self.lock()?.employees.get(&id).cloned())
    }

    async fn delete_employee(&self, id: u64) -> Result<bool, StoreError> {
        let mut state = self.lock()?;
        if state.employees.remove(&id).is_none() {
            return Ok(false);
        }

        state.requests.retain(|_, r| r.employee_id != id && r.manager_id != id);
        for employee in state.employees.values_mut() {
            if employee.manager_id == Some(id) {
                employee.manager_id = None;
            }
        }
        for request in state.requests.values_mut() {
            if request.approved_by == Some(id) {
                request.approved_by = None;
            }
            if request.rejected_by == Some(id) {
                request.rejected_by = None;
            }
        }
        Ok(true)
    }

    async fn fetch_request(&self, id: u64) -> Result<Option<ChangeRequest>, StoreError> {
        Ok(self.lock()?.requests.get(&id).cloned())
    }

    async fn list_requests(&self, filter: &RequestFilter) -> Result<RequestPage, StoreError> {
        let state = self.lock()?;
        let (page, per_page, offset) = filter.pagination();

        let mut matching: Vec<&ChangeRequest> = state
            .requests
            .values()
            .filter(|r| matches_filter(filter, r))
            .collect();
        matching.sort_by(|a, b| {
            b.request_date
                .cmp(&a.request_date)
                .then_with(|| b.id.cmp(&a.id))
        });

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(offset as usize)
            .take(per_page as usize)
            .map(|r| state.listed(r))
            .collect();

        Ok(RequestPage {
            items,
            page,
            per_page,
            total,
        })
    }

    async fn insert_request(&self, new: NewChangeRequest) -> Result<ChangeRequest, StoreError> {
        let mut state = self.lock()?;
        state.ensure_employee(new.employee_id, "employee_id")?;
        state.ensure_employee(new.manager_id, "manager_id")?;
        if state.has_pending(new.employee_id) {
            return Err(StoreError::Conflict);
        }

        state.last_request_id += 1;
        let request = new.into_request(state.last_request_id);
        state.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn update_manager(&self, id: u64, manager_id: u64) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.pending_request(id)?;
        state.ensure_employee(manager_id, "manager_id")?;

        if let Some(request) = state.requests.get_mut(&id) {
            request.manager_id = manager_id;
        }
        Ok(())
    }

    async fn commit_approval(
        &self,
        request: &ChangeRequest,
        changes: &ChangeSet,
    ) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.pending_request(request.id)?;

        let current = state
            .employees
            .get(&request.employee_id)
            .ok_or(StoreError::NotFound)?;
        // Re-applied against the stored row so nothing computed from a stale
        // read is written back.
        let updated = changes.apply_to(current).map_err(|e| match e {
            WorkflowError::Application(msg) => StoreError::Constraint(msg),
            other => StoreError::Constraint(other.to_string()),
        })?;
        state.check_employee(&updated)?;

        // Both writes happen under the same lock, after every check passed.
        state.employees.insert(updated.id, updated);
        state.requests.insert(request.id, request.clone());
        Ok(())
    }

    async fn commit_rejection(&self, request: &ChangeRequest) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.pending_request(request.id)?;
        state.requests.insert(request.id, request.clone());
        Ok(())
    }
}

pub(crate) mod fixtures {
    use super::*;
    use chrono::NaiveDate;

    pub fn employee(id: u64, first_name: &str, manager_id: Option<u64>) -> Employee {
        Employee {
            id,
            employee_code: format!("EMP-{id:03}"),
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            email: format!("{}@company.com", first_name.to_lowercase()),
            phone: None,
            department_id: 1,
            job_title: Some("Engineer".to_string()),
            manager_id,
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            status: "active".to_string(),
        }
    }

    /// Director #1 manages #2, who manages #3 and #4.
    pub fn org_chart() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_employee(employee(1, "Dana", None)).unwrap();
        store.insert_employee(employee(2, "Morgan", Some(1))).unwrap();
        store.insert_employee(employee(3, "Alex", Some(2))).unwrap();
        store.insert_employee(employee(4, "Sam", Some(2))).unwrap();
        store
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::model::profile_change_request::RequestState;
    use chrono::{Duration, TimeZone, Utc};

    fn new_request(employee_id: u64, manager_id: u64, minutes: i64) -> NewChangeRequest {
        NewChangeRequest {
            employee_id,
            manager_id,
            requested_changes: r#"{"job_title": "Lead"}"#.to_string(),
            comment: None,
            request_date: Utc.with_ymd_and_hms(2026, 1, 1, 8, 0, 0).unwrap()
                + Duration::minutes(minutes),
        }
    }

    #[actix_web::test]
    async fn rejects_duplicate_emails_and_unknown_managers() {
        let store = org_chart();

        let mut twin = employee(5, "Alex", Some(2));
        twin.employee_code = "EMP-900".to_string();
        assert!(matches!(
            store.insert_employee(twin),
            Err(StoreError::Constraint(_))
        ));

        assert!(matches!(
            store.insert_employee(employee(6, "Robin", Some(42))),
            Err(StoreError::Constraint(_))
        ));
    }

    #[actix_web::test]
    async fn lists_newest_first_with_filters() {
        let store = org_chart();
        let first = store.insert_request(new_request(3, 2, 0)).await.unwrap();
        let second = store.insert_request(new_request(4, 2, 5)).await.unwrap();
        let third = store.insert_request(new_request(2, 1, 10)).await.unwrap();

        let all = store.list_requests(&RequestFilter::default()).await.unwrap();
        let ids: Vec<u64> = all.items.iter().map(|l| l.request.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
        assert_eq!(all.total, 3);
        assert_eq!(all.items[0].employee_name, "Morgan Tester");

        let managed_by_2 = store
            .list_requests(&RequestFilter {
                manager_id: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(managed_by_2.total, 2);

        let involving_2 = store
            .list_requests(&RequestFilter {
                party: Some(2),
                per_page: Some(2),
                page: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(involving_2.total, 3);
        assert_eq!(involving_2.items.len(), 1);
        assert_eq!(involving_2.items[0].request.id, first.id);
    }

    #[actix_web::test]
    async fn one_pending_request_per_employee() {
        let store = org_chart();
        let first = store.insert_request(new_request(3, 2, 0)).await.unwrap();

        assert_eq!(
            store.insert_request(new_request(3, 2, 1)).await,
            Err(StoreError::Conflict)
        );

        let mut rejected = first.clone();
        rejected.state = RequestState::Rejected;
        store.commit_rejection(&rejected).await.unwrap();
        assert!(store.insert_request(new_request(3, 2, 2)).await.is_ok());
    }

    #[actix_web::test]
    async fn apply_failures_keep_their_own_message() {
        let store = org_chart();
        let request = store.insert_request(new_request(3, 2, 0)).await.unwrap();
        let changes = ChangeSet::parse(r#"{"manager_id": 3}"#).unwrap();

        let mut approved = request.clone();
        approved.state = RequestState::Approved;

        assert_eq!(
            store.commit_approval(&approved, &changes).await,
            Err(StoreError::Constraint(
                "an employee cannot be their own manager".to_string()
            ))
        );
        assert!(
            store
                .fetch_request(request.id)
                .await
                .unwrap()
                .unwrap()
                .state
                .is_pending()
        );
    }

    #[actix_web::test]
    async fn deleting_an_employee_cascades_to_their_requests() {
        let store = org_chart();
        let own = store.insert_request(new_request(3, 2, 0)).await.unwrap();
        let other = store.insert_request(new_request(4, 2, 1)).await.unwrap();

        assert!(store.delete_employee(3).await.unwrap());
        assert!(!store.delete_employee(3).await.unwrap());

        assert_eq!(store.fetch_request(own.id).await.unwrap(), None);
        assert!(store.fetch_request(other.id).await.unwrap().is_some());
    }

    #[actix_web::test]
    async fn decisions_are_guarded_on_pending() {
        let store = org_chart();
        let request = store.insert_request(new_request(3, 2, 0)).await.unwrap();

        let mut rejected = request.clone();
        rejected.state = RequestState::Rejected;
        store.commit_rejection(&rejected).await.unwrap();

        let mut approved = request.clone();
        approved.state = RequestState::Approved;
        let changes = ChangeSet::parse(&request.requested_changes).unwrap();
        assert_eq!(
            store.commit_approval(&approved, &changes).await,
            Err(StoreError::Conflict)
        );
        assert_eq!(
            store.update_manager(request.id, 1).await,
            Err(StoreError::Conflict)
        );

        let employee = store.fetch_employee(3).await.unwrap().unwrap();
        assert_eq!(employee.job_title.as_deref(), Some("Engineer"));
    }
}
