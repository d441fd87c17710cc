//! Consistency audit: check the employee ↔ roster invariant over a
//! snapshot of both collections.
//!
//! Rules checked:
//! 1. Department names are unique.
//! 2. Every employee's `department` names an existing department.
//! 3. Every employee appears in that department's roster.
//! 4. Every roster entry is a known employee whose `department` matches.
//! 5. No roster lists the same id twice.
//!
//! An empty result means the snapshot is consistent.

use std::collections::{HashMap, HashSet};
use std::fmt;

use store::{Department, Employee};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inconsistency {
    DuplicateDepartmentName {
        name: String,
        department_ids: Vec<String>,
    },
    UnknownDepartment {
        employee_id: String,
        department: String,
    },
    MissingFromRoster {
        employee_id: String,
        department_id: String,
    },
    UnknownRosterMember {
        department_id: String,
        employee_id: String,
    },
    ForeignRosterMember {
        department_id: String,
        employee_id: String,
        employee_department: String,
    },
    DuplicateRosterEntry {
        department_id: String,
        employee_id: String,
    },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateDepartmentName { name, department_ids } => {
                write!(f, "department name '{name}' is used by {}", department_ids.join(", "))
            }
            Self::UnknownDepartment { employee_id, department } => {
                write!(f, "employee '{employee_id}' references unknown department '{department}'")
            }
            Self::MissingFromRoster { employee_id, department_id } => {
                write!(f, "employee '{employee_id}' is missing from the roster of '{department_id}'")
            }
            Self::UnknownRosterMember { department_id, employee_id } => {
                write!(f, "roster of '{department_id}' lists unknown employee '{employee_id}'")
            }
            Self::ForeignRosterMember { department_id, employee_id, employee_department } => write!(
                f,
                "roster of '{department_id}' lists '{employee_id}', who belongs to '{employee_department}'"
            ),
            Self::DuplicateRosterEntry { department_id, employee_id } => {
                write!(f, "roster of '{department_id}' lists '{employee_id}' more than once")
            }
        }
    }
}

/// Check both collections against each other.
///
/// Findings come out in a stable order: department-level rules first, then
/// employees in input order, then rosters in input order.
pub fn audit(employees: &[Employee], departments: &[Department]) -> Vec<Inconsistency> {
    let mut findings = Vec::new();

    // -----------------------------------------------------------------------
    // 1. Department names are unique
    // -----------------------------------------------------------------------
    let mut by_name: HashMap<&str, Vec<&Department>> = HashMap::new();
    for dept in departments {
        by_name.entry(dept.name.as_str()).or_default().push(dept);
    }
    for dept in departments {
        let same = &by_name[dept.name.as_str()];
        if same.len() > 1 && same[0].id == dept.id {
            findings.push(Inconsistency::DuplicateDepartmentName {
                name: dept.name.clone(),
                department_ids: same.iter().map(|d| d.id.clone()).collect(),
            });
        }
    }

    // -----------------------------------------------------------------------
    // 2–3. Employee side
    // -----------------------------------------------------------------------
    for employee in employees {
        match by_name.get(employee.department.as_str()) {
            None => findings.push(Inconsistency::UnknownDepartment {
                employee_id: employee.id.clone(),
                department: employee.department.clone(),
            }),
            Some(candidates) => {
                if !candidates.iter().any(|d| d.member_ids.contains(&employee.id)) {
                    findings.push(Inconsistency::MissingFromRoster {
                        employee_id: employee.id.clone(),
                        department_id: candidates[0].id.clone(),
                    });
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // 4–5. Roster side
    // -----------------------------------------------------------------------
    let by_id: HashMap<&str, &Employee> = employees.iter().map(|e| (e.id.as_str(), e)).collect();
    for dept in departments {
        let mut seen: HashSet<&str> = HashSet::new();
        for member in &dept.member_ids {
            if !seen.insert(member.as_str()) {
                findings.push(Inconsistency::DuplicateRosterEntry {
                    department_id: dept.id.clone(),
                    employee_id: member.clone(),
                });
                continue;
            }
            match by_id.get(member.as_str()) {
                None => findings.push(Inconsistency::UnknownRosterMember {
                    department_id: dept.id.clone(),
                    employee_id: member.clone(),
                }),
                Some(employee) if employee.department != dept.name => {
                    findings.push(Inconsistency::ForeignRosterMember {
                        department_id: dept.id.clone(),
                        employee_id: member.clone(),
                        employee_department: employee.department.clone(),
                    })
                }
                Some(_) => {}
            }
        }
    }

    findings
}
