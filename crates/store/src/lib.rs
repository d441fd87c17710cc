//! `store` crate: pure persistence layer.
//!
//! Defines the repository contract for the `employees` and `departments`
//! collections, the document types stored in them, and an in-memory
//! implementation used by tests and the CLI. No business logic lives here.

pub mod error;
pub mod memory;
pub mod models;
pub mod repository;
pub mod timeout;

pub use error::StoreError;
pub use memory::{Call, Fault, InMemoryStore, Op};
pub use models::{
    Collection, Department, DepartmentPatch, Employee, EmployeeFilter, EmployeeStatus,
    EmployeeUpdate, HierarchyLevel, NewDepartment, NewEmployee, Snapshot,
};
pub use repository::{DepartmentRepository, EmployeeRepository};
pub use timeout::{with_timeout, StoreTimeouts};
