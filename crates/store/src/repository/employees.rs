//! Employee collection contract.

use async_trait::async_trait;

use crate::{
    StoreError,
    models::{Employee, EmployeeFilter, EmployeeUpdate, NewEmployee},
};

#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// Return every employee, optionally narrowed by `filter`.
    async fn list(&self, filter: Option<&EmployeeFilter>) -> Result<Vec<Employee>, StoreError>;

    /// Fetch one employee. `StoreError::NotFound` if the id is absent.
    async fn get(&self, id: &str) -> Result<Employee, StoreError>;

    /// Insert a new employee; the store assigns the id.
    async fn create(&self, input: &NewEmployee) -> Result<Employee, StoreError>;

    /// Replace every field of an existing employee.
    ///
    /// Returns `StoreError::NotFound` if no document has this id.
    async fn update(&self, id: &str, update: &EmployeeUpdate) -> Result<Employee, StoreError>;

    /// Remove an employee. Removing a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Remove several employees in one call.
    async fn delete_many(&self, ids: &[String]) -> Result<(), StoreError>;
}
