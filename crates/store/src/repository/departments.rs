//! Department collection contract.

use async_trait::async_trait;

use crate::{
    StoreError,
    models::{Department, DepartmentPatch, NewDepartment},
};

#[async_trait]
pub trait DepartmentRepository: Send + Sync {
    /// Return every department.
    async fn list(&self) -> Result<Vec<Department>, StoreError>;

    /// Fetch one department. `StoreError::NotFound` if the id is absent.
    async fn get(&self, id: &str) -> Result<Department, StoreError>;

    /// Insert a new department; the store assigns the id.
    async fn create(&self, input: &NewDepartment) -> Result<Department, StoreError>;

    /// Apply the present fields of `patch` and return the stored result.
    ///
    /// Returns `StoreError::NotFound` if no document has this id.
    async fn update(&self, id: &str, patch: &DepartmentPatch) -> Result<Department, StoreError>;

    /// Remove a department. Removing a missing id is not an error.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
