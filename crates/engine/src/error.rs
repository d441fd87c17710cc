//! Engine-level error types.

use store::StoreError;
use thiserror::Error;

use crate::validation::FieldErrors;

/// Errors produced by the sync engine.
///
/// Everything except [`SyncError::Store`] is raised before the first write,
/// so those failures never leave partial state behind.
#[derive(Debug, Error)]
pub enum SyncError {
    // ------ Pre-write checks ------

    /// The named target department does not exist.
    #[error("department \"{department}\" not found; select an existing department")]
    ReferenceNotFound { department: String },

    /// A structural rule would be violated, e.g. an employee left without
    /// a department.
    #[error("{0}")]
    Validation(String),

    /// Employee fields failed the form rules.
    #[error("invalid employee: {0}")]
    InvalidEmployee(FieldErrors),

    /// Deletion was refused because the roster is not empty.
    #[error("department \"{name}\" still has {} member(s); move them before deleting", members.len())]
    DepartmentNotEmpty { name: String, members: Vec<String> },

    // ------ Write errors ------

    /// A repository call failed. Any writes already applied by the current
    /// operation have been compensated before this is returned.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Message for the end user. Repository failures get `hint` appended,
    /// typically a pointer at the store configuration.
    pub fn user_message(&self, hint: Option<&str>) -> String {
        match (self, hint) {
            (Self::Store(_), Some(hint)) => format!("{self} {hint}"),
            _ => self.to_string(),
        }
    }
}
