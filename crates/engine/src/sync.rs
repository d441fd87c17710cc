//! Referential sync engine.
//!
//! `SyncEngine` keeps `Employee::department` and `Department::member_ids`
//! consistent across the two collections. The store has no multi-document
//! commit, so every operation runs the same pipeline:
//!
//! 1. Validate: cheap checks that fail before any write.
//! 2. Snapshot: record the prior value of everything about to change.
//! 3. Write: one document at a time, strictly in order.
//! 4. On a failed write, unwind the journal newest-first, then return the
//!    error that started the rollback.
//!
//! Writes are awaited one by one and never fanned out: the undo order is the
//! reverse of the write order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use store::{
    Department, DepartmentPatch, DepartmentRepository, Employee, EmployeeRepository,
    EmployeeUpdate, NewDepartment, StoreError, StoreTimeouts,
};
use tracing::{debug, error, info, instrument};

use crate::SyncError;
use crate::compensation::{Compensation, Undo};
use crate::mutators::{DepartmentMutator, EmployeeMutator, dedupe};
use crate::validation::validate_employee;

// ---------------------------------------------------------------------------
// Deletion guard
// ---------------------------------------------------------------------------

/// Whether a department may be deleted right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionCheck {
    Deletable,
    /// The roster still lists these employees.
    Blocked { members: Vec<String> },
}

impl DeletionCheck {
    pub fn is_deletable(&self) -> bool {
        matches!(self, Self::Deletable)
    }
}

/// A department with a non-empty roster cannot be deleted.
pub fn deletion_check(department: &Department) -> DeletionCheck {
    if department.member_ids.is_empty() {
        DeletionCheck::Deletable
    } else {
        DeletionCheck::Blocked {
            members: department.member_ids.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// SyncEngine
// ---------------------------------------------------------------------------

/// Orchestrates cross-collection writes with compensating rollback.
///
/// Holds no state between calls; share one instance behind an `Arc`.
pub struct SyncEngine {
    employees: EmployeeMutator,
    departments: DepartmentMutator,
}

impl SyncEngine {
    pub fn new(
        employees: Arc<dyn EmployeeRepository>,
        departments: Arc<dyn DepartmentRepository>,
        timeouts: StoreTimeouts,
    ) -> Self {
        Self {
            employees: EmployeeMutator::new(employees, timeouts.clone()),
            departments: DepartmentMutator::new(departments, timeouts),
        }
    }

    pub fn employees(&self) -> &EmployeeMutator {
        &self.employees
    }

    pub fn departments(&self) -> &DepartmentMutator {
        &self.departments
    }

    // -----------------------------------------------------------------------
    // Employee side
    // -----------------------------------------------------------------------

    /// Save an employee whose department may have changed.
    ///
    /// When the department is unchanged this is a single employee write and
    /// nothing else is read or written. Otherwise the employee id moves from
    /// the old roster to the new one before the employee itself is written.
    ///
    /// A missing *previous* department is tolerated (it may have been renamed
    /// or deleted); a missing *target* department is not.
    ///
    /// # Errors
    /// - [`SyncError::InvalidEmployee`] if `updated_fields` fails validation.
    /// - [`SyncError::ReferenceNotFound`] if no department is named
    ///   `updated_fields.department`. Nothing is written.
    /// - [`SyncError::Store`] if a write fails, after both rosters were
    ///   restored.
    #[instrument(skip(self, updated_fields), fields(target = %updated_fields.department))]
    pub async fn sync_employee_department_change(
        &self,
        employee_id: &str,
        updated_fields: &EmployeeUpdate,
        previous_department_name: &str,
    ) -> Result<Employee, SyncError> {
        validate_employee(updated_fields).map_err(SyncError::InvalidEmployee)?;

        let target_name = updated_fields.department.trim();
        let previous_name = previous_department_name.trim();
        if target_name == previous_name {
            return Ok(self.employees.update(employee_id, updated_fields).await?);
        }

        let all = self.departments.list().await?;
        let old_dept = all.iter().find(|d| d.name == previous_name);
        let new_dept = all
            .iter()
            .find(|d| d.name == target_name)
            .ok_or_else(|| SyncError::ReferenceNotFound {
                department: target_name.to_owned(),
            })?;
        if old_dept.is_none() {
            debug!("previous department '{}' not found; skipping roster removal", previous_name);
        }
        let old_dept = old_dept.filter(|d| d.id != new_dept.id);

        // Both rosters are restored on failure, newest write first.
        let mut journal = Compensation::new();
        if let Some(old) = old_dept {
            journal.record(Undo::Roster {
                department_id: old.id.clone(),
                member_ids: old.member_ids.clone(),
            });
        }
        journal.record(Undo::Roster {
            department_id: new_dept.id.clone(),
            member_ids: new_dept.member_ids.clone(),
        });

        let fields = updated_fields.clone().with_department(new_dept.name.clone());
        match self.move_employee(employee_id, &fields, old_dept, new_dept).await {
            Ok(employee) => {
                info!(
                    "employee '{}' moved from '{}' to '{}'",
                    employee_id, previous_name, new_dept.name
                );
                Ok(employee)
            }
            Err(err) => {
                error!("moving employee '{}' failed, rolling back: {}", employee_id, err);
                self.rollback(journal).await;
                Err(err.into())
            }
        }
    }

    async fn move_employee(
        &self,
        employee_id: &str,
        fields: &EmployeeUpdate,
        old_dept: Option<&Department>,
        new_dept: &Department,
    ) -> Result<Employee, StoreError> {
        if let Some(old) = old_dept {
            let remaining = without(&old.member_ids, employee_id);
            self.departments.set_roster(&old.id, remaining).await?;
        }

        self.departments
            .set_roster(&new_dept.id, with(&new_dept.member_ids, employee_id))
            .await?;

        self.employees.update(employee_id, fields).await
    }

    // -----------------------------------------------------------------------
    // Department side
    // -----------------------------------------------------------------------

    /// Save a department whose roster may have changed.
    ///
    /// The department record is written first. Added employees are then
    /// pointed at this department and dropped from the roster of the
    /// department they came from; removed employees are pointed at
    /// `reassignment_target_name` and appended to its roster. When the patch
    /// renames the department, employees who stay on the roster follow the
    /// new name.
    ///
    /// `employees_by_id` and `all_departments` are the caller's view of the
    /// store when the edit began. Added or removed ids missing from
    /// `employees_by_id` are skipped.
    ///
    /// # Errors
    /// - [`SyncError::Validation`] if the new name is blank or taken by
    ///   another department, or if employees are removed without a
    ///   reassignment target, or the target is this department.
    /// - [`SyncError::ReferenceNotFound`] if the target does not exist.
    /// - [`SyncError::Store`] if a write fails. Employee and roster writes are
    ///   unwound and the department record is restored to `current`.
    #[instrument(skip_all, fields(department_id = %department_id))]
    pub async fn sync_department_roster_change(
        &self,
        department_id: &str,
        updated_fields: &DepartmentPatch,
        current: &Department,
        employees_by_id: &HashMap<String, Employee>,
        reassignment_target_name: &str,
        all_departments: &[Department],
    ) -> Result<Department, SyncError> {
        let new_roster = dedupe(updated_fields.member_ids.as_deref().unwrap_or(&current.member_ids));
        let old_set: HashSet<&str> = current.member_ids.iter().map(String::as_str).collect();
        let new_set: HashSet<&str> = new_roster.iter().map(String::as_str).collect();

        let added: Vec<&String> = new_roster.iter().filter(|id| !old_set.contains(id.as_str())).collect();
        let removed: Vec<&String> = current
            .member_ids
            .iter()
            .filter(|id| !new_set.contains(id.as_str()))
            .collect();

        let retained: Vec<&String> = new_roster.iter().filter(|id| old_set.contains(id.as_str())).collect();

        let new_name = match updated_fields.name.as_deref().map(str::trim) {
            None => None,
            Some("") => return Err(SyncError::Validation("enter the department name".into())),
            Some(name) if all_departments.iter().any(|d| d.id != department_id && d.name == name) => {
                return Err(SyncError::Validation(format!(
                    "a department named \"{name}\" already exists"
                )));
            }
            Some(name) => Some(name.to_owned()),
        };

        let target = if removed.is_empty() {
            None
        } else {
            Some(reassignment_target(department_id, reassignment_target_name, all_departments)?)
        };

        let fields = DepartmentPatch {
            name: new_name,
            member_ids: Some(new_roster.clone()),
            ..updated_fields.clone()
        };
        let updated = self.departments.update(department_id, &fields).await?;

        let mut journal = Compensation::new();
        journal.record(Undo::Department {
            department_id: department_id.to_owned(),
            patch: current.restore_patch(),
        });

        let plan = RosterPlan {
            department: &updated,
            previous_name: &current.name,
            added: &added,
            retained: &retained,
            removed: &removed,
            target,
            employees_by_id,
            all_departments,
        };
        match self.apply_roster_plan(&plan, &mut journal).await {
            Ok(()) => {
                info!(
                    "department '{}' roster saved: {} added, {} removed",
                    updated.name,
                    added.len(),
                    removed.len()
                );
                Ok(updated)
            }
            Err(err) => {
                error!("roster change for '{}' failed, rolling back: {}", department_id, err);
                self.rollback(journal).await;
                Err(err.into())
            }
        }
    }

    async fn apply_roster_plan(&self, plan: &RosterPlan<'_>, journal: &mut Compensation) -> Result<(), StoreError> {
        let this_id = plan.department.id.as_str();

        // Retained members follow a rename.
        if plan.department.name != plan.previous_name {
            for id in plan.retained {
                let Some(employee) = plan.employees_by_id.get(id.as_str()) else { continue };
                if employee.department == plan.department.name {
                    continue;
                }
                let renamed = employee.to_update().with_department(plan.department.name.clone());
                self.employees.update(id, &renamed).await?;
                journal.record(Undo::Employee {
                    employee_id: id.to_string(),
                    record: employee.to_update(),
                });
            }
        }

        // Working copies so several writes to one roster compose.
        let mut rosters: HashMap<&str, Vec<String>> = plan
            .all_departments
            .iter()
            .filter(|d| d.id != this_id)
            .map(|d| (d.id.as_str(), d.member_ids.clone()))
            .collect();

        for id in plan.added {
            let Some(employee) = plan.employees_by_id.get(id.as_str()) else {
                debug!("added id '{}' has no employee record; skipping", id);
                continue;
            };

            let moved = employee.to_update().with_department(plan.department.name.clone());
            self.employees.update(id, &moved).await?;
            journal.record(Undo::Employee {
                employee_id: id.to_string(),
                record: employee.to_update(),
            });

            // Stale membership left behind under the previous name.
            for other in plan
                .all_departments
                .iter()
                .filter(|d| d.id != this_id && d.name == employee.department)
            {
                let Some(roster) = rosters.get_mut(other.id.as_str()) else { continue };
                if !roster.contains(id) {
                    continue;
                }
                let remaining = without(roster, id);
                self.departments.set_roster(&other.id, remaining.clone()).await?;
                journal.record(Undo::Roster {
                    department_id: other.id.clone(),
                    member_ids: std::mem::replace(roster, remaining),
                });
            }
        }

        let Some(target) = plan.target else {
            return Ok(());
        };

        let mut reassigned = Vec::new();
        for id in plan.removed {
            let Some(employee) = plan.employees_by_id.get(id.as_str()) else {
                debug!("removed id '{}' has no employee record; skipping", id);
                continue;
            };

            let moved = employee.to_update().with_department(target.name.clone());
            self.employees.update(id, &moved).await?;
            journal.record(Undo::Employee {
                employee_id: id.to_string(),
                record: employee.to_update().with_department(plan.previous_name),
            });
            reassigned.push(id.as_str());
        }

        if let Some(roster) = rosters.get_mut(target.id.as_str()) {
            let joined = reassigned.iter().fold(roster.clone(), |acc, id| with(&acc, id));
            if joined != *roster {
                self.departments.set_roster(&target.id, joined.clone()).await?;
                journal.record(Undo::Roster {
                    department_id: target.id.clone(),
                    member_ids: std::mem::replace(roster, joined),
                });
            }
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Creation and deletion
    // -----------------------------------------------------------------------

    /// Create a department and move the selected employees into it.
    ///
    /// Each selected employee listed in `input.member_ids` is pointed at the
    /// new department and dropped from the roster of the department it came
    /// from. On failure the moves are undone and the new department is
    /// deleted.
    ///
    /// # Errors
    /// - [`SyncError::Validation`] if the name is blank or already taken.
    /// - [`SyncError::Store`] if a write fails, after rollback.
    #[instrument(skip_all, fields(name = %input.name))]
    pub async fn create_department_with_members(
        &self,
        input: &NewDepartment,
        selected: &[Employee],
    ) -> Result<Department, SyncError> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(SyncError::Validation("enter the department name".into()));
        }

        let existing = self.departments.list().await?;
        if existing.iter().any(|d| d.name == name) {
            return Err(SyncError::Validation(format!(
                "a department named \"{name}\" already exists"
            )));
        }

        let input = NewDepartment {
            name: name.to_owned(),
            ..input.clone()
        };
        let created = self.departments.create(&input).await?;

        let mut journal = Compensation::new();
        journal.record(Undo::DeleteDepartment {
            department_id: created.id.clone(),
        });

        let roster: HashSet<&str> = created.member_ids.iter().map(String::as_str).collect();
        let moving: Vec<&Employee> = selected.iter().filter(|e| roster.contains(e.id.as_str())).collect();
        if moving.is_empty() {
            info!("department '{}' created with no members to move", created.name);
            return Ok(created);
        }

        match self.populate(&created, &moving, &existing, &mut journal).await {
            Ok(()) => {
                info!("department '{}' created with {} member(s)", created.name, moving.len());
                Ok(created)
            }
            Err(err) => {
                error!("populating department '{}' failed, rolling back: {}", created.name, err);
                self.rollback(journal).await;
                Err(err.into())
            }
        }
    }

    async fn populate(
        &self,
        created: &Department,
        moving: &[&Employee],
        existing: &[Department],
        journal: &mut Compensation,
    ) -> Result<(), StoreError> {
        for employee in moving {
            let moved = employee.to_update().with_department(created.name.clone());
            self.employees.update(&employee.id, &moved).await?;
            journal.record(Undo::Employee {
                employee_id: employee.id.clone(),
                record: employee.to_update(),
            });
        }

        let moved_ids: HashSet<&str> = moving.iter().map(|e| e.id.as_str()).collect();
        for prev in existing {
            let came_from_here = moving.iter().any(|e| e.department == prev.name);
            if !came_from_here {
                continue;
            }
            let remaining: Vec<String> = prev
                .member_ids
                .iter()
                .filter(|id| !moved_ids.contains(id.as_str()))
                .cloned()
                .collect();
            if remaining.len() == prev.member_ids.len() {
                continue;
            }
            self.departments.set_roster(&prev.id, remaining).await?;
            journal.record(Undo::Roster {
                department_id: prev.id.clone(),
                member_ids: prev.member_ids.clone(),
            });
        }

        Ok(())
    }

    /// Delete a department whose roster is empty.
    ///
    /// # Errors
    /// - [`SyncError::DepartmentNotEmpty`] if the roster still lists anyone.
    /// - [`SyncError::Store`] if the read or the delete fails.
    #[instrument(skip(self))]
    pub async fn delete_department(&self, department_id: &str) -> Result<(), SyncError> {
        let department = self.departments.get(department_id).await?;
        if let DeletionCheck::Blocked { members } = deletion_check(&department) {
            return Err(SyncError::DepartmentNotEmpty {
                name: department.name,
                members,
            });
        }
        self.departments.delete(department_id).await?;
        info!("department '{}' deleted", department.name);
        Ok(())
    }

    async fn rollback(&self, journal: Compensation) {
        if journal.is_empty() {
            return;
        }
        let steps = journal.len();
        let outcome = journal.unwind(&self.employees, &self.departments).await;
        if outcome.failed > 0 {
            error!(
                "rollback incomplete: {} of {} compensating write(s) failed",
                outcome.failed, steps
            );
        } else {
            info!("rolled back {} write(s)", outcome.applied);
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Everything the department-side write phase needs.
struct RosterPlan<'a> {
    department: &'a Department,
    previous_name: &'a str,
    added: &'a [&'a String],
    retained: &'a [&'a String],
    removed: &'a [&'a String],
    target: Option<&'a Department>,
    employees_by_id: &'a HashMap<String, Employee>,
    all_departments: &'a [Department],
}

/// Resolve where removed employees go. Runs before any write.
fn reassignment_target<'a>(
    department_id: &str,
    name: &str,
    all_departments: &'a [Department],
) -> Result<&'a Department, SyncError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SyncError::Validation(
            "select a destination department for removed employees; \
             an employee cannot be left without a department"
                .into(),
        ));
    }
    let target = all_departments
        .iter()
        .find(|d| d.name == name)
        .ok_or_else(|| SyncError::ReferenceNotFound {
            department: name.to_owned(),
        })?;
    if target.id == department_id {
        return Err(SyncError::Validation(
            "removed employees cannot be reassigned to the department they are leaving".into(),
        ));
    }
    Ok(target)
}

/// `ids` with `id` appended unless already present.
fn with(ids: &[String], id: &str) -> Vec<String> {
    let mut out = ids.to_vec();
    if !out.iter().any(|m| m == id) {
        out.push(id.to_owned());
    }
    out
}

/// `ids` without `id`.
fn without(ids: &[String], id: &str) -> Vec<String> {
    ids.iter().filter(|m| *m != id).cloned().collect()
}
