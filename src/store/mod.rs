#[cfg(test)]
pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use derive_more::Display;

use crate::model::employee::Employee;
use crate::model::profile_change_request::{ChangeRequest, NewChangeRequest, RequestState};
use crate::workflow::changes::ChangeSet;

#[cfg(test)]
pub use memory::MemoryStore;
pub use mysql::MySqlStore;

#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum StoreError {
    #[display(fmt = "record not found")]
    NotFound,
    /// A guarded write found the request no longer pending.
    #[display(fmt = "record was modified concurrently")]
    Conflict,
    /// The database refused the write (unique key, foreign key, column size).
    #[display(fmt = "{}", _0)]
    Constraint(String),
    #[display(fmt = "stored value could not be decoded: {}", _0)]
    Decode(String),
    #[display(fmt = "store unavailable: {}", _0)]
    Unavailable(String),
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) => {
                // SQLSTATE class 22 = data exception, 23 = integrity violation
                let constraint = db_err
                    .code()
                    .is_some_and(|code| code.starts_with("22") || code.starts_with("23"));
                if constraint {
                    StoreError::Constraint(db_err.message().to_string())
                } else {
                    StoreError::Unavailable(db_err.message().to_string())
                }
            }
            sqlx::Error::ColumnDecode { index, source } => {
                StoreError::Decode(format!("column {index}: {source}"))
            }
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub employee_id: Option<u64>,
    pub manager_id: Option<u64>,
    /// Either the employee or the manager of the request.
    pub party: Option<u64>,
    pub state: Option<RequestState>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl RequestFilter {
    /// (page, per_page, offset) with page starting at 1 and at most 100 rows.
    pub fn pagination(&self) -> (u64, u64, u64) {
        let per_page = self.per_page.unwrap_or(10).clamp(1, 100);
        let page = self.page.unwrap_or(1).max(1);
        (page, per_page, (page - 1) * per_page)
    }
}

/// A request together with its employee's display name.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedRequest {
    pub request: ChangeRequest,
    pub employee_name: String,
}

#[derive(Debug, Clone)]
pub struct RequestPage {
    pub items: Vec<ListedRequest>,
    pub page: u64,
    pub per_page: u64,
    pub total: i64,
}

/// Persistence for employees and their change requests.
///
/// `commit_approval` and `commit_rejection` are guarded on the stored request
/// still being pending and return [`StoreError::Conflict`] otherwise, so two
/// concurrent decisions cannot both land. `commit_approval` writes the
/// employee and the request in one unit: either both change or neither does.
#[async_trait]
pub trait ChangeRequestStore: Send + Sync {
    async fn fetch_employee(&self, id: u64) -> Result<Option<Employee>, StoreError>;

    /// Removes the employee and, by cascade, their change requests.
    async fn delete_employee(&self, id: u64) -> Result<bool, StoreError>;

    async fn fetch_request(&self, id: u64) -> Result<Option<ChangeRequest>, StoreError>;

    async fn list_requests(&self, filter: &RequestFilter) -> Result<RequestPage, StoreError>;

    /// Returns [`StoreError::Conflict`] when the employee already has a
    /// pending request.
    async fn insert_request(&self, new: NewChangeRequest) -> Result<ChangeRequest, StoreError>;

    async fn update_manager(&self, id: u64, manager_id: u64) -> Result<(), StoreError>;

    async fn commit_approval(
        &self,
        request: &ChangeRequest,
        changes: &ChangeSet,
    ) -> Result<(), StoreError>;

    async fn commit_rejection(&self, request: &ChangeRequest) -> Result<(), StoreError>;
}
