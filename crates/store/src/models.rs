//! Document structs that map 1-to-1 onto the two store collections.
//!
//! These are *persistence* models: they carry no domain rules. Validation
//! and the cross-collection invariants live in the `engine` crate.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

/// The two logical collections of the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Employees,
    Departments,
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Employees => write!(f, "employees"),
            Self::Departments => write!(f, "departments"),
        }
    }
}

// ---------------------------------------------------------------------------
// employees
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HierarchyLevel {
    Junior,
    Mid,
    Senior,
    Manager,
}

impl std::fmt::Display for HierarchyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Junior  => write!(f, "junior"),
            Self::Mid     => write!(f, "mid"),
            Self::Senior  => write!(f, "senior"),
            Self::Manager => write!(f, "manager"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmployeeStatus {
    Active,
    Inactive,
}

/// A persisted employee document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Department *name*. This field, not roster membership, decides which
    /// department an employee belongs to.
    pub department: String,
    pub status: EmployeeStatus,
    pub title: String,
    pub hire_date: NaiveDate,
    pub hierarchy_level: HierarchyLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
    pub base_salary: f64,
}

impl Employee {
    /// Full-record update payload carrying this employee's current values.
    pub fn to_update(&self) -> EmployeeUpdate {
        EmployeeUpdate {
            name: self.name.clone(),
            email: self.email.clone(),
            department: self.department.clone(),
            status: self.status,
            title: self.title.clone(),
            hire_date: self.hire_date,
            hierarchy_level: self.hierarchy_level,
            manager_id: self.manager_id.clone(),
            base_salary: self.base_salary,
        }
    }

    /// Overwrite every field except `id` with the update's values.
    pub fn apply(&mut self, update: &EmployeeUpdate) {
        self.name = update.name.clone();
        self.email = update.email.clone();
        self.department = update.department.clone();
        self.status = update.status;
        self.title = update.title.clone();
        self.hire_date = update.hire_date;
        self.hierarchy_level = update.hierarchy_level;
        self.manager_id = update.manager_id.clone();
        self.base_salary = update.base_salary;
    }
}

/// Full employee record without an id. Used for both create and update:
/// employee writes always replace the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeUpdate {
    pub name: String,
    pub email: String,
    pub department: String,
    pub status: EmployeeStatus,
    pub title: String,
    pub hire_date: NaiveDate,
    pub hierarchy_level: HierarchyLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manager_id: Option<String>,
    pub base_salary: f64,
}

pub type NewEmployee = EmployeeUpdate;

impl EmployeeUpdate {
    /// Same record, pointed at another department.
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }
}

/// Optional narrowing for `EmployeeRepository::list`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmployeeFilter {
    /// Case-insensitive substring of the name.
    pub name: Option<String>,
    /// Case-insensitive substring of the email.
    pub email: Option<String>,
    /// Exact department name.
    pub department: Option<String>,
}

impl EmployeeFilter {
    pub fn matches(&self, employee: &Employee) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            match needle.as_deref().map(str::trim) {
                None | Some("") => true,
                Some(n) => haystack.to_lowercase().contains(&n.to_lowercase()),
            }
        }

        contains(&employee.name, &self.name)
            && contains(&employee.email, &self.email)
            && self
                .department
                .as_deref()
                .map_or(true, |d| employee.department == d)
    }
}

// ---------------------------------------------------------------------------
// departments
// ---------------------------------------------------------------------------

/// A persisted department document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: String,
    /// Unique by business rule; the join key from `Employee::department`.
    pub name: String,
    pub responsible_manager_id: String,
    /// The roster: ordered employee ids, no duplicates.
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acronym: Option<String>,
}

impl Department {
    /// Apply the present fields of a patch. Free-text fields are trimmed.
    pub fn apply(&mut self, patch: &DepartmentPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(manager) = &patch.responsible_manager_id {
            self.responsible_manager_id = manager.clone();
        }
        if let Some(ids) = &patch.member_ids {
            self.member_ids = ids.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.trim().to_owned());
        }
        if let Some(acronym) = &patch.acronym {
            self.acronym = Some(acronym.trim().to_owned());
        }
    }

    /// Patch that puts this department's name, manager and roster back.
    pub fn restore_patch(&self) -> DepartmentPatch {
        DepartmentPatch {
            name: Some(self.name.clone()),
            responsible_manager_id: Some(self.responsible_manager_id.clone()),
            member_ids: Some(self.member_ids.clone()),
            ..DepartmentPatch::default()
        }
    }
}

/// Payload for creating a department.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDepartment {
    pub name: String,
    pub responsible_manager_id: String,
    #[serde(default)]
    pub member_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acronym: Option<String>,
}

/// Partial department update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_manager_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub member_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acronym: Option<String>,
}

impl DepartmentPatch {
    /// Patch touching only the roster.
    pub fn roster(member_ids: Vec<String>) -> Self {
        Self {
            member_ids: Some(member_ids),
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// snapshots
// ---------------------------------------------------------------------------

/// Both collections at a point in time, as stored on disk by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub departments: Vec<Department>,
}
