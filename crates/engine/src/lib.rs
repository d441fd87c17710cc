//! `engine` crate: domain rules and the referential sync engine.

pub mod audit;
pub mod compensation;
pub mod error;
pub mod mutators;
pub mod sync;
pub mod validation;

pub use audit::{audit, Inconsistency};
pub use error::SyncError;
pub use mutators::{DepartmentMutator, EmployeeMutator};
pub use sync::{deletion_check, DeletionCheck, SyncEngine};
pub use validation::{validate_employee, FieldErrors};
