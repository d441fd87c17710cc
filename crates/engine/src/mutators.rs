//! Single-document writers.
//!
//! Each method is exactly one repository call wrapped in the configured
//! deadline. The mutators never touch more than one document; ordering and
//! compensation across documents belong to [`crate::SyncEngine`].

use std::collections::HashSet;
use std::sync::Arc;

use store::{
    Department, DepartmentPatch, DepartmentRepository, Employee, EmployeeFilter,
    EmployeeRepository, EmployeeUpdate, NewDepartment, NewEmployee, StoreError, StoreTimeouts,
    with_timeout,
};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Employees
// ---------------------------------------------------------------------------

pub struct EmployeeMutator {
    repo: Arc<dyn EmployeeRepository>,
    timeouts: StoreTimeouts,
}

impl EmployeeMutator {
    pub fn new(repo: Arc<dyn EmployeeRepository>, timeouts: StoreTimeouts) -> Self {
        Self { repo, timeouts }
    }

    pub async fn list(&self, filter: Option<&EmployeeFilter>) -> Result<Vec<Employee>, StoreError> {
        with_timeout("employees.list", self.timeouts.list, self.repo.list(filter)).await
    }

    pub async fn get(&self, id: &str) -> Result<Employee, StoreError> {
        with_timeout("employees.get", self.timeouts.list, self.repo.get(id)).await
    }

    pub async fn create(&self, input: &NewEmployee) -> Result<Employee, StoreError> {
        with_timeout("employees.create", self.timeouts.create, self.repo.create(input)).await
    }

    /// Replace the whole employee record.
    pub async fn update(&self, id: &str, update: &EmployeeUpdate) -> Result<Employee, StoreError> {
        debug!("writing employee '{}' (department '{}')", id, update.department);
        with_timeout("employees.update", self.timeouts.mutation, self.repo.update(id, update)).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        with_timeout("employees.delete", self.timeouts.mutation, self.repo.delete(id)).await
    }

    pub async fn delete_many(&self, ids: &[String]) -> Result<(), StoreError> {
        with_timeout("employees.delete_many", self.timeouts.mutation, self.repo.delete_many(ids)).await
    }
}

// ---------------------------------------------------------------------------
// Departments
// ---------------------------------------------------------------------------

pub struct DepartmentMutator {
    repo: Arc<dyn DepartmentRepository>,
    timeouts: StoreTimeouts,
}

impl DepartmentMutator {
    pub fn new(repo: Arc<dyn DepartmentRepository>, timeouts: StoreTimeouts) -> Self {
        Self { repo, timeouts }
    }

    pub async fn list(&self) -> Result<Vec<Department>, StoreError> {
        with_timeout("departments.list", self.timeouts.list, self.repo.list()).await
    }

    pub async fn get(&self, id: &str) -> Result<Department, StoreError> {
        with_timeout("departments.get", self.timeouts.list, self.repo.get(id)).await
    }

    pub async fn create(&self, input: &NewDepartment) -> Result<Department, StoreError> {
        let input = NewDepartment {
            member_ids: unique_roster(&input.name, &input.member_ids),
            ..input.clone()
        };
        with_timeout("departments.create", self.timeouts.create, self.repo.create(&input)).await
    }

    /// Apply a full or partial update. A roster in the patch is deduplicated.
    pub async fn update(&self, id: &str, patch: &DepartmentPatch) -> Result<Department, StoreError> {
        let patch = DepartmentPatch {
            member_ids: patch.member_ids.as_ref().map(|ids| unique_roster(id, ids)),
            ..patch.clone()
        };
        debug!("writing department '{}' ({:?})", id, patch);
        with_timeout("departments.update", self.timeouts.mutation, self.repo.update(id, &patch)).await
    }

    /// Replace only the roster.
    pub async fn set_roster(&self, id: &str, member_ids: Vec<String>) -> Result<Department, StoreError> {
        self.update(id, &DepartmentPatch::roster(member_ids)).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        with_timeout("departments.delete", self.timeouts.mutation, self.repo.delete(id)).await
    }
}

/// Drop repeated ids, keeping the first occurrence of each.
pub(crate) fn dedupe(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().filter(|id| seen.insert(id.as_str())).cloned().collect()
}

fn unique_roster(label: &str, ids: &[String]) -> Vec<String> {
    let unique = dedupe(ids);
    if unique.len() != ids.len() {
        warn!(
            "roster for '{}' had {} duplicate id(s); keeping first occurrences",
            label,
            ids.len() - unique.len()
        );
    }
    unique
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use store::{Collection, Fault, InMemoryStore, Op};

    fn department(id: &str, members: &[&str]) -> Department {
        Department {
            id: id.into(),
            name: id.to_uppercase(),
            responsible_manager_id: "m1".into(),
            member_ids: members.iter().map(|s| s.to_string()).collect(),
            description: None,
            acronym: None,
        }
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dedupe_keeps_first_occurrence_order() {
        assert_eq!(dedupe(&ids(&["c2", "c1", "c2", "c3", "c1"])), ids(&["c2", "c1", "c3"]));
    }

    #[tokio::test]
    async fn set_roster_never_stores_duplicates() {
        let store = InMemoryStore::new();
        store.seed_department(department("d1", &[]));
        let mutator = DepartmentMutator::new(Arc::new(store.clone()), StoreTimeouts::default());

        let updated = mutator.set_roster("d1", ids(&["c1", "c1", "c2"])).await.unwrap();
        assert_eq!(updated.member_ids, ids(&["c1", "c2"]));
        assert_eq!(store.department("d1").unwrap().member_ids, ids(&["c1", "c2"]));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_write_surfaces_as_timeout() {
        let store = InMemoryStore::new();
        store.seed_department(department("d1", &[]));
        store.inject(Fault::delay(Collection::Departments, Op::Update, Duration::from_secs(60)));
        let mutator = DepartmentMutator::new(
            Arc::new(store.clone()),
            StoreTimeouts::uniform(Duration::from_secs(1)),
        );

        let err = mutator.set_roster("d1", ids(&["c1"])).await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout { operation: "departments.update", .. }));
        // The deadline does not abort the write itself.
        assert_eq!(store.department("d1").unwrap().member_ids, ids(&["c1"]));
    }

    #[tokio::test]
    async fn delete_many_removes_every_listed_employee() {
        let store = InMemoryStore::new();
        let mutator = EmployeeMutator::new(Arc::new(store.clone()), StoreTimeouts::default());
        let input = NewEmployee {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            department: "TI".into(),
            status: store::EmployeeStatus::Active,
            title: "Analyst".into(),
            hire_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            hierarchy_level: store::HierarchyLevel::Junior,
            manager_id: Some("m1".into()),
            base_salary: 2500.0,
        };
        let a = mutator.create(&input).await.unwrap();
        let b = mutator.create(&input).await.unwrap();
        let c = mutator.create(&input).await.unwrap();

        mutator.delete_many(&[a.id.clone(), c.id.clone()]).await.unwrap();

        let left = mutator.list(None).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id, b.id);
    }
}
