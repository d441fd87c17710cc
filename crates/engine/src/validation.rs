//! Field rules for employee records.

use std::collections::BTreeMap;
use std::fmt;

use store::{EmployeeUpdate, HierarchyLevel};

/// Field name → first error message for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }

    fn add(&mut self, field: &'static str, message: &str) {
        self.0.entry(field).or_insert_with(|| message.to_owned());
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Check an employee record against the form rules.
///
/// # Errors
/// Every failing field, keyed by its camelCase document name.
pub fn validate_employee(input: &EmployeeUpdate) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    if input.name.trim().is_empty() {
        errors.add("name", "enter the name");
    }

    let email = input.email.trim();
    if email.is_empty() {
        errors.add("email", "enter the email");
    } else if !is_email(email) {
        errors.add("email", "enter a valid email");
    }

    if input.department.trim().is_empty() {
        errors.add("department", "select the department");
    }
    if input.title.trim().is_empty() {
        errors.add("title", "enter the job title");
    }
    if !(input.base_salary.is_finite() && input.base_salary > 0.0) {
        errors.add("baseSalary", "base salary must be greater than zero");
    }

    // Everyone below manager level reports to someone.
    if input.hierarchy_level != HierarchyLevel::Manager
        && input.manager_id.as_deref().map_or(true, |m| m.trim().is_empty())
    {
        errors.add("managerId", "select the manager; required below manager level");
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// `local@domain.tld` with no whitespace and a single `@`.
fn is_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain
            .char_indices()
            .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

// ============================================================
// Unit tests
// ============================================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use store::EmployeeStatus;

    fn valid() -> EmployeeUpdate {
        EmployeeUpdate {
            name: "João".into(),
            email: "joao@company.com".into(),
            department: "Sales".into(),
            status: EmployeeStatus::Active,
            title: "Analyst".into(),
            hire_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            hierarchy_level: HierarchyLevel::Mid,
            manager_id: Some("g1".into()),
            base_salary: 3000.0,
        }
    }

    #[test]
    fn valid_record_passes() {
        assert!(validate_employee(&valid()).is_ok());
    }

    #[test]
    fn blank_fields_are_reported_together() {
        let input = EmployeeUpdate {
            name: "   ".into(),
            email: String::new(),
            title: String::new(),
            base_salary: 0.0,
            ..valid()
        };
        let errors = validate_employee(&input).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get("name"), Some("enter the name"));
        assert_eq!(errors.get("email"), Some("enter the email"));
        assert_eq!(errors.get("baseSalary"), Some("base salary must be greater than zero"));
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for email in ["joao", "joao@", "@company.com", "joao@company", "jo ao@company.com", "a@b@c.com", "joao@.com"] {
            let input = EmployeeUpdate { email: email.into(), ..valid() };
            let errors = validate_employee(&input).unwrap_err();
            assert_eq!(errors.get("email"), Some("enter a valid email"), "{email}");
        }
    }

    #[test]
    fn manager_id_required_below_manager_level() {
        let input = EmployeeUpdate { manager_id: Some("  ".into()), ..valid() };
        assert!(validate_employee(&input).unwrap_err().get("managerId").is_some());

        let manager = EmployeeUpdate {
            hierarchy_level: HierarchyLevel::Manager,
            manager_id: None,
            ..valid()
        };
        assert!(validate_employee(&manager).is_ok());
    }
}
