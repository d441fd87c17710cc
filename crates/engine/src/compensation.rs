//! Compensation journal.
//!
//! A sync operation records one [`Undo`] per write it wants reversible.
//! When a later write fails, the journal is unwound newest-first. Undo
//! writes are attempted once; a failing undo is logged and skipped so the
//! caller still sees the error that started the rollback.

use store::{DepartmentPatch, EmployeeUpdate};
use tracing::{debug, warn};

use crate::mutators::{DepartmentMutator, EmployeeMutator};

/// A write that puts one document back the way it was.
#[derive(Debug, Clone, PartialEq)]
pub enum Undo {
    /// Restore a department's roster.
    Roster {
        department_id: String,
        member_ids: Vec<String>,
    },
    /// Rewrite an employee's full record.
    Employee {
        employee_id: String,
        record: EmployeeUpdate,
    },
    /// Re-apply a department patch (name, manager, roster).
    Department {
        department_id: String,
        patch: DepartmentPatch,
    },
    /// Remove a department created by the failed operation.
    DeleteDepartment { department_id: String },
}

/// Outcome of an unwind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Unwound {
    pub applied: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct Compensation {
    steps: Vec<Undo>,
}

impl Compensation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, undo: Undo) {
        self.steps.push(undo);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Issue every recorded undo, newest first.
    pub async fn unwind(self, employees: &EmployeeMutator, departments: &DepartmentMutator) -> Unwound {
        let mut outcome = Unwound::default();

        for undo in self.steps.into_iter().rev() {
            let result = match &undo {
                Undo::Roster { department_id, member_ids } => departments
                    .set_roster(department_id, member_ids.clone())
                    .await
                    .map(drop),
                Undo::Employee { employee_id, record } => {
                    employees.update(employee_id, record).await.map(drop)
                }
                Undo::Department { department_id, patch } => {
                    departments.update(department_id, patch).await.map(drop)
                }
                Undo::DeleteDepartment { department_id } => departments.delete(department_id).await,
            };

            match result {
                Ok(()) => {
                    debug!("compensated: {:?}", undo);
                    outcome.applied += 1;
                }
                Err(err) => {
                    warn!("compensating write failed, continuing rollback: {:?}: {}", undo, err);
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use store::{Collection, Department, Fault, InMemoryStore, Op, StoreTimeouts};

    fn mutators(store: &InMemoryStore) -> (EmployeeMutator, DepartmentMutator) {
        (
            EmployeeMutator::new(Arc::new(store.clone()), StoreTimeouts::default()),
            DepartmentMutator::new(Arc::new(store.clone()), StoreTimeouts::default()),
        )
    }

    fn department(id: &str, members: &[&str]) -> Department {
        Department {
            id: id.into(),
            name: id.into(),
            responsible_manager_id: String::new(),
            member_ids: members.iter().map(|s| s.to_string()).collect(),
            description: None,
            acronym: None,
        }
    }

    fn roster(id: &str, members: &[&str]) -> Undo {
        Undo::Roster {
            department_id: id.into(),
            member_ids: members.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn unwinds_newest_first() {
        let store = InMemoryStore::new();
        store.seed_department(department("a", &["x"]));
        store.seed_department(department("b", &["x"]));
        let (employees, departments) = mutators(&store);

        let mut journal = Compensation::new();
        assert!(journal.is_empty());
        journal.record(roster("a", &[]));
        journal.record(roster("b", &["y"]));
        assert_eq!(journal.len(), 2);
        let outcome = journal.unwind(&employees, &departments).await;

        assert_eq!(outcome, Unwound { applied: 2, failed: 0 });
        let order: Vec<_> = store.writes().into_iter().filter_map(|c| c.id).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn failing_undo_does_not_stop_the_rest() {
        let store = InMemoryStore::new();
        store.seed_department(department("a", &["x"]));
        store.seed_department(department("b", &["x"]));
        store.inject(Fault::fail(Collection::Departments, Op::Update, "down").on_id("b"));
        let (employees, departments) = mutators(&store);

        let mut journal = Compensation::new();
        journal.record(roster("a", &[]));
        journal.record(roster("b", &[]));
        let outcome = journal.unwind(&employees, &departments).await;

        assert_eq!(outcome, Unwound { applied: 1, failed: 1 });
        assert!(store.department("a").unwrap().member_ids.is_empty());
        assert_eq!(store.department("b").unwrap().member_ids, vec!["x"]);
    }
}
