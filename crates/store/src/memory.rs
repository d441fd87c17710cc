//! `InMemoryStore`: an in-process document store.
//!
//! Implements both repository traits over plain vectors. Every call is
//! recorded in a journal, and faults can be scripted per collection,
//! operation and document id so tests can fail any single step of a sync.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    Collection, StoreError,
    models::{
        Department, DepartmentPatch, Employee, EmployeeFilter, EmployeeUpdate, NewDepartment,
        NewEmployee, Snapshot,
    },
    repository::{DepartmentRepository, EmployeeRepository},
};

// ---------------------------------------------------------------------------
// Call journal
// ---------------------------------------------------------------------------

/// Repository operation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    List,
    Get,
    Create,
    Update,
    Delete,
}

/// One recorded repository call, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub collection: Collection,
    pub op: Op,
    pub id: Option<String>,
}

impl Call {
    pub fn is_write(&self) -> bool {
        matches!(self.op, Op::Create | Op::Update | Op::Delete)
    }
}

// ---------------------------------------------------------------------------
// Fault injection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum FaultEffect {
    Fail(StoreError),
    /// Apply the call, then hold the response back for this long.
    Delay(Duration),
}

/// A scripted misbehaviour for matching calls.
///
/// By default a fault fires once, on the first matching call.
#[derive(Debug, Clone)]
pub struct Fault {
    collection: Collection,
    op: Op,
    id: Option<String>,
    skip: usize,
    remaining: Option<usize>,
    effect: FaultEffect,
}

impl Fault {
    /// Fail matching calls with `StoreError::Backend(message)`.
    pub fn fail(collection: Collection, op: Op, message: impl Into<String>) -> Self {
        Self::with_error(collection, op, StoreError::Backend(message.into()))
    }

    /// Fail matching calls with a specific error.
    pub fn with_error(collection: Collection, op: Op, error: StoreError) -> Self {
        Self {
            collection,
            op,
            id: None,
            skip: 0,
            remaining: Some(1),
            effect: FaultEffect::Fail(error),
        }
    }

    /// Apply matching calls but respond only after `delay`.
    pub fn delay(collection: Collection, op: Op, delay: Duration) -> Self {
        Self {
            collection,
            op,
            id: None,
            skip: 0,
            remaining: Some(1),
            effect: FaultEffect::Delay(delay),
        }
    }

    /// Only match calls addressing this document id.
    pub fn on_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Let the first `n` matching calls through untouched.
    pub fn after(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    /// Fire on every matching call instead of once.
    pub fn always(mut self) -> Self {
        self.remaining = None;
        self
    }

    fn matches(&self, collection: Collection, op: Op, id: Option<&str>) -> bool {
        self.collection == collection
            && self.op == op
            && self.id.as_deref().map_or(true, |want| id == Some(want))
    }
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Inner {
    employees: Vec<Employee>,
    departments: Vec<Department>,
    calls: Vec<Call>,
    faults: Vec<Fault>,
}

/// Shared in-memory store. Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load both collections from a snapshot.
    ///
    /// # Errors
    /// [`StoreError::InvalidDocument`] if an id is empty or repeated.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, StoreError> {
        check_ids(Collection::Employees, snapshot.employees.iter().map(|e| e.id.as_str()))?;
        check_ids(Collection::Departments, snapshot.departments.iter().map(|d| d.id.as_str()))?;

        let store = Self::new();
        {
            let mut inner = store.lock();
            inner.employees = snapshot.employees;
            inner.departments = snapshot.departments;
        }
        Ok(store)
    }

    /// Copy of both collections as they are now.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.lock();
        Snapshot {
            employees: inner.employees.clone(),
            departments: inner.departments.clone(),
        }
    }

    /// Insert or replace an employee without recording a call.
    pub fn seed_employee(&self, employee: Employee) {
        let mut inner = self.lock();
        inner.employees.retain(|e| e.id != employee.id);
        inner.employees.push(employee);
    }

    /// Insert or replace a department without recording a call.
    pub fn seed_department(&self, department: Department) {
        let mut inner = self.lock();
        inner.departments.retain(|d| d.id != department.id);
        inner.departments.push(department);
    }

    /// Current state of one employee, bypassing the journal.
    pub fn employee(&self, id: &str) -> Option<Employee> {
        self.lock().employees.iter().find(|e| e.id == id).cloned()
    }

    /// Current state of one department, bypassing the journal.
    pub fn department(&self, id: &str) -> Option<Department> {
        self.lock().departments.iter().find(|d| d.id == id).cloned()
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Only the create/update/delete calls.
    pub fn writes(&self) -> Vec<Call> {
        self.lock().calls.iter().filter(|c| c.is_write()).cloned().collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn inject(&self, fault: Fault) {
        self.lock().faults.push(fault);
    }

    pub fn clear_faults(&self) {
        self.lock().faults.clear();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record the call and consult the fault script.
    ///
    /// Returns the delay to apply after the call, if any.
    fn enter(&self, collection: Collection, op: Op, id: Option<&str>) -> Result<Option<Duration>, StoreError> {
        let mut inner = self.lock();
        inner.calls.push(Call {
            collection,
            op,
            id: id.map(str::to_owned),
        });

        for fault in inner.faults.iter_mut() {
            if !fault.matches(collection, op, id) || fault.remaining == Some(0) {
                continue;
            }
            if fault.skip > 0 {
                fault.skip -= 1;
                continue;
            }
            if let Some(n) = fault.remaining.as_mut() {
                *n -= 1;
            }
            return match &fault.effect {
                FaultEffect::Fail(err) => Err(err.clone()),
                FaultEffect::Delay(d) => Ok(Some(*d)),
            };
        }
        Ok(None)
    }
}

async fn settle(delay: Option<Duration>) {
    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }
}

fn check_ids<'a>(collection: Collection, ids: impl Iterator<Item = &'a str>) -> Result<(), StoreError> {
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        if id.trim().is_empty() {
            return Err(StoreError::InvalidDocument {
                collection,
                id: id.to_owned(),
                reason: "empty id".into(),
            });
        }
        if !seen.insert(id) {
            return Err(StoreError::InvalidDocument {
                collection,
                id: id.to_owned(),
                reason: "duplicate id".into(),
            });
        }
    }
    Ok(())
}

fn not_found(collection: Collection, id: &str) -> StoreError {
    StoreError::NotFound {
        collection,
        id: id.to_owned(),
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryStore {
    async fn list(&self, filter: Option<&EmployeeFilter>) -> Result<Vec<Employee>, StoreError> {
        let delay = self.enter(Collection::Employees, Op::List, None)?;
        let rows: Vec<Employee> = self
            .lock()
            .employees
            .iter()
            .filter(|e| filter.map_or(true, |f| f.matches(e)))
            .cloned()
            .collect();
        settle(delay).await;
        Ok(rows)
    }

    async fn get(&self, id: &str) -> Result<Employee, StoreError> {
        let delay = self.enter(Collection::Employees, Op::Get, Some(id))?;
        let row = self.employee(id).ok_or_else(|| not_found(Collection::Employees, id));
        settle(delay).await;
        row
    }

    async fn create(&self, input: &NewEmployee) -> Result<Employee, StoreError> {
        let delay = self.enter(Collection::Employees, Op::Create, None)?;
        let row = Employee {
            id: Uuid::new_v4().to_string(),
            name: input.name.clone(),
            email: input.email.clone(),
            department: input.department.clone(),
            status: input.status,
            title: input.title.clone(),
            hire_date: input.hire_date,
            hierarchy_level: input.hierarchy_level,
            manager_id: input.manager_id.clone(),
            base_salary: input.base_salary,
        };
        self.lock().employees.push(row.clone());
        settle(delay).await;
        Ok(row)
    }

    async fn update(&self, id: &str, update: &EmployeeUpdate) -> Result<Employee, StoreError> {
        let delay = self.enter(Collection::Employees, Op::Update, Some(id))?;
        let row = {
            let mut inner = self.lock();
            match inner.employees.iter_mut().find(|e| e.id == id) {
                Some(employee) => {
                    employee.apply(update);
                    Ok(employee.clone())
                }
                None => Err(not_found(Collection::Employees, id)),
            }
        };
        settle(delay).await;
        row
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let delay = self.enter(Collection::Employees, Op::Delete, Some(id))?;
        self.lock().employees.retain(|e| e.id != id);
        settle(delay).await;
        Ok(())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<(), StoreError> {
        let delay = self.enter(Collection::Employees, Op::Delete, None)?;
        self.lock().employees.retain(|e| !ids.contains(&e.id));
        settle(delay).await;
        Ok(())
    }
}

#[async_trait]
impl DepartmentRepository for InMemoryStore {
    async fn list(&self) -> Result<Vec<Department>, StoreError> {
        let delay = self.enter(Collection::Departments, Op::List, None)?;
        let rows = self.lock().departments.clone();
        settle(delay).await;
        Ok(rows)
    }

    async fn get(&self, id: &str) -> Result<Department, StoreError> {
        let delay = self.enter(Collection::Departments, Op::Get, Some(id))?;
        let row = self.department(id).ok_or_else(|| not_found(Collection::Departments, id));
        settle(delay).await;
        row
    }

    async fn create(&self, input: &NewDepartment) -> Result<Department, StoreError> {
        let delay = self.enter(Collection::Departments, Op::Create, None)?;
        let row = Department {
            id: Uuid::new_v4().to_string(),
            name: input.name.clone(),
            responsible_manager_id: input.responsible_manager_id.clone(),
            member_ids: input.member_ids.clone(),
            description: input
                .description
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            acronym: input
                .acronym
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
        };
        self.lock().departments.push(row.clone());
        settle(delay).await;
        Ok(row)
    }

    async fn update(&self, id: &str, patch: &DepartmentPatch) -> Result<Department, StoreError> {
        let delay = self.enter(Collection::Departments, Op::Update, Some(id))?;
        let row = {
            let mut inner = self.lock();
            match inner.departments.iter_mut().find(|d| d.id == id) {
                Some(department) => {
                    department.apply(patch);
                    Ok(department.clone())
                }
                None => Err(not_found(Collection::Departments, id)),
            }
        };
        settle(delay).await;
        row
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let delay = self.enter(Collection::Departments, Op::Delete, Some(id))?;
        self.lock().departments.retain(|d| d.id != id);
        settle(delay).await;
        Ok(())
    }
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EmployeeStatus, HierarchyLevel};
    use chrono::NaiveDate;

    fn department(id: &str, name: &str, members: &[&str]) -> Department {
        Department {
            id: id.into(),
            name: name.into(),
            responsible_manager_id: "m1".into(),
            member_ids: members.iter().map(|s| s.to_string()).collect(),
            description: None,
            acronym: None,
        }
    }

    fn new_employee(department: &str) -> NewEmployee {
        NewEmployee {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            department: department.into(),
            status: EmployeeStatus::Active,
            title: "Analyst".into(),
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            hierarchy_level: HierarchyLevel::Mid,
            manager_id: Some("m1".into()),
            base_salary: 3000.0,
        }
    }

    #[tokio::test]
    async fn create_assigns_id_and_update_replaces_fields() {
        let store = InMemoryStore::new();
        let created = EmployeeRepository::create(&store, &new_employee("TI")).await.unwrap();
        assert!(!created.id.is_empty());

        let moved = new_employee("Sales");
        let updated = EmployeeRepository::update(&store, &created.id, &moved).await.unwrap();
        assert_eq!(updated.department, "Sales");
        assert_eq!(store.employee(&created.id).unwrap().department, "Sales");
    }

    #[tokio::test]
    async fn update_of_missing_document_is_not_found() {
        let store = InMemoryStore::new();
        let err = DepartmentRepository::update(&store, "nope", &DepartmentPatch::roster(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { collection: Collection::Departments, .. }));
    }

    #[tokio::test]
    async fn patch_leaves_absent_fields_untouched() {
        let store = InMemoryStore::new();
        store.seed_department(department("d1", "TI", &["c1"]));

        let patch = DepartmentPatch {
            description: Some("  platform  ".into()),
            ..DepartmentPatch::default()
        };
        let updated = DepartmentRepository::update(&store, "d1", &patch).await.unwrap();
        assert_eq!(updated.name, "TI");
        assert_eq!(updated.member_ids, vec!["c1"]);
        assert_eq!(updated.description.as_deref(), Some("platform"));
    }

    #[tokio::test]
    async fn fault_fires_once_on_matching_id_after_skip() {
        let store = InMemoryStore::new();
        store.seed_department(department("d1", "TI", &[]));
        store.seed_department(department("d2", "Sales", &[]));
        store.inject(Fault::fail(Collection::Departments, Op::Update, "boom").on_id("d1").after(1));

        let patch = DepartmentPatch::roster(vec!["c1".into()]);
        assert!(DepartmentRepository::update(&store, "d2", &patch).await.is_ok());
        assert!(DepartmentRepository::update(&store, "d1", &patch).await.is_ok());
        assert_eq!(
            DepartmentRepository::update(&store, "d1", &patch).await,
            Err(StoreError::Backend("boom".into()))
        );
        assert!(DepartmentRepository::update(&store, "d1", &patch).await.is_ok());
        assert_eq!(store.writes().len(), 4);
    }

    #[tokio::test]
    async fn always_fault_keeps_firing_until_cleared() {
        let store = InMemoryStore::new();
        store.seed_department(department("d1", "TI", &[]));
        store.inject(Fault::fail(Collection::Departments, Op::Get, "down").always());

        for _ in 0..3 {
            assert!(DepartmentRepository::get(&store, "d1").await.is_err());
        }
        assert_eq!(store.calls().len(), 3);

        store.clear_faults();
        store.clear_calls();
        assert_eq!(DepartmentRepository::get(&store, "d1").await.unwrap().name, "TI");
        assert_eq!(store.calls().len(), 1);
        assert!(store.writes().is_empty());
    }

    #[tokio::test]
    async fn list_applies_employee_filter() {
        let store = InMemoryStore::new();
        EmployeeRepository::create(&store, &new_employee("TI")).await.unwrap();
        EmployeeRepository::create(&store, &new_employee("Sales")).await.unwrap();

        let filter = EmployeeFilter {
            name: Some("an".into()),
            department: Some("Sales".into()),
            ..EmployeeFilter::default()
        };
        let rows = EmployeeRepository::list(&store, Some(&filter)).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].department, "Sales");
    }

    #[test]
    fn snapshot_with_duplicate_ids_is_rejected() {
        let snapshot = Snapshot {
            employees: vec![],
            departments: vec![department("d1", "TI", &[]), department("d1", "Sales", &[])],
        };
        let err = InMemoryStore::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, StoreError::InvalidDocument { ref reason, .. } if reason == "duplicate id"));
    }
}
