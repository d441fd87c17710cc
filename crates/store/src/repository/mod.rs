//! Repository contracts, one trait per collection.
//!
//! Every method is a single, independently atomic call against the document
//! store. Nothing here spans both collections; cross-collection consistency
//! is the `engine` crate's job.

pub mod departments;
pub mod employees;

pub use departments::DepartmentRepository;
pub use employees::EmployeeRepository;
