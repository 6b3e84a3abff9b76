//! Typed view of a request's `requested_changes` payload.
//!
//! The payload is stored as opaque JSON text. At approval time it is parsed
//! into a [`ChangeSet`], every entry is checked against the employee schema,
//! and the whole set is applied to a copy of the employee. Nothing reaches
//! storage unless every entry applies.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use serde_json::Value;
use strum_macros::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

use crate::model::employee::Employee;
use crate::workflow::error::WorkflowError;

/// Writable employee columns. `id` is deliberately absent.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    EnumString,
    AsRefStr,
    IntoStaticStr,
    EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum EmployeeField {
    EmployeeCode,
    FirstName,
    LastName,
    Email,
    Phone,
    DepartmentId,
    JobTitle,
    ManagerId,
    HireDate,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    OptionalText,
    Reference,
    OptionalReference,
    Date,
}

impl EmployeeField {
    pub fn kind(self) -> FieldKind {
        match self {
            EmployeeField::EmployeeCode
            | EmployeeField::FirstName
            | EmployeeField::LastName
            | EmployeeField::Email
            | EmployeeField::Status => FieldKind::Text,
            EmployeeField::Phone | EmployeeField::JobTitle => FieldKind::OptionalText,
            EmployeeField::DepartmentId => FieldKind::Reference,
            EmployeeField::ManagerId => FieldKind::OptionalReference,
            EmployeeField::HireDate => FieldKind::Date,
        }
    }

    /// Column name in the `employees` table.
    pub fn column(self) -> &'static str {
        self.into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    OptionalText(Option<String>),
    Reference(u64),
    OptionalReference(Option<u64>),
    Date(NaiveDate),
}

impl FieldValue {
    /// Converts a raw JSON value into the shape `field` expects.
    pub fn coerce(field: EmployeeField, raw: &Value) -> Result<Self, String> {
        let name = field.as_ref();
        match (field.kind(), raw) {
            (FieldKind::Text, Value::String(s)) if s.trim().is_empty() => {
                Err(format!("{name} cannot be empty"))
            }
            (FieldKind::Text, Value::String(s)) => Ok(FieldValue::Text(s.clone())),
            (FieldKind::OptionalText, Value::String(s)) => {
                Ok(FieldValue::OptionalText(Some(s.clone())))
            }
            (FieldKind::OptionalText, Value::Null) => Ok(FieldValue::OptionalText(None)),
            (FieldKind::Reference, Value::Number(n)) => n
                .as_u64()
                .map(FieldValue::Reference)
                .ok_or_else(|| format!("{name} expects a positive record id")),
            (FieldKind::OptionalReference, Value::Number(n)) => n
                .as_u64()
                .map(|id| FieldValue::OptionalReference(Some(id)))
                .ok_or_else(|| format!("{name} expects a positive record id")),
            (FieldKind::OptionalReference, Value::Null) => {
                Ok(FieldValue::OptionalReference(None))
            }
            (FieldKind::Date, Value::String(s)) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(FieldValue::Date)
                .map_err(|_| format!("{name} expects a date formatted as YYYY-MM-DD")),
            (FieldKind::Text | FieldKind::Reference | FieldKind::Date, Value::Null) => {
                Err(format!("{name} is required"))
            }
            (kind, other) => Err(format!(
                "{name} expects {}, got {}",
                kind.describe(),
                json_type(other)
            )),
        }
    }

    fn text(&self, field: EmployeeField) -> Result<String, WorkflowError> {
        match self {
            FieldValue::Text(s) => Ok(s.clone()),
            _ => Err(mismatch(field)),
        }
    }

    fn optional_text(&self, field: EmployeeField) -> Result<Option<String>, WorkflowError> {
        match self {
            FieldValue::OptionalText(s) => Ok(s.clone()),
            _ => Err(mismatch(field)),
        }
    }

    fn reference(&self, field: EmployeeField) -> Result<u64, WorkflowError> {
        match self {
            FieldValue::Reference(id) => Ok(*id),
            _ => Err(mismatch(field)),
        }
    }

    fn optional_reference(&self, field: EmployeeField) -> Result<Option<u64>, WorkflowError> {
        match self {
            FieldValue::OptionalReference(id) => Ok(*id),
            _ => Err(mismatch(field)),
        }
    }

    fn date(&self, field: EmployeeField) -> Result<NaiveDate, WorkflowError> {
        match self {
            FieldValue::Date(d) => Ok(*d),
            _ => Err(mismatch(field)),
        }
    }
}

impl FieldKind {
    fn describe(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::OptionalText => "text or null",
            FieldKind::Reference => "a record id",
            FieldKind::OptionalReference => "a record id or null",
            FieldKind::Date => "a date",
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn mismatch(field: EmployeeField) -> WorkflowError {
    WorkflowError::Application(format!(
        "{} expects {}",
        field.as_ref(),
        field.kind().describe()
    ))
}

/// Field-by-field update for one employee, keyed by column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    entries: BTreeMap<EmployeeField, FieldValue>,
}

impl ChangeSet {
    /// Parses a stored payload. Syntax errors are `MalformedPayload`; a
    /// well-formed payload that does not fit the employee schema is an
    /// `Application` error.
    pub fn parse(raw: &str) -> Result<Self, WorkflowError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| WorkflowError::MalformedPayload(e.to_string()))?;

        let object = match value {
            Value::Object(map) => map,
            other => {
                return Err(WorkflowError::Application(format!(
                    "changes must be a JSON object, got {}",
                    json_type(&other)
                )));
            }
        };

        let mut entries = BTreeMap::new();
        for (key, raw_value) in &object {
            let field = EmployeeField::from_str(key).map_err(|_| {
                WorkflowError::Application(format!("unknown employee field '{key}'"))
            })?;
            let value = FieldValue::coerce(field, raw_value).map_err(WorkflowError::Application)?;
            entries.insert(field, value);
        }

        Ok(Self { entries })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EmployeeField, &FieldValue)> {
        self.entries.iter().map(|(field, value)| (*field, value))
    }

    /// Returns the employee as it would look with every change applied.
    /// `employee` itself is never touched.
    pub fn apply_to(&self, employee: &Employee) -> Result<Employee, WorkflowError> {
        let mut updated = employee.clone();

        for (field, value) in self.iter() {
            match field {
                EmployeeField::EmployeeCode => updated.employee_code = value.text(field)?,
                EmployeeField::FirstName => updated.first_name = value.text(field)?,
                EmployeeField::LastName => updated.last_name = value.text(field)?,
                EmployeeField::Email => updated.email = value.text(field)?,
                EmployeeField::Phone => updated.phone = value.optional_text(field)?,
                EmployeeField::DepartmentId => updated.department_id = value.reference(field)?,
                EmployeeField::JobTitle => updated.job_title = value.optional_text(field)?,
                EmployeeField::ManagerId => {
                    let manager_id = value.optional_reference(field)?;
                    if manager_id == Some(employee.id) {
                        return Err(WorkflowError::Application(
                            "an employee cannot be their own manager".to_string(),
                        ));
                    }
                    updated.manager_id = manager_id;
                }
                EmployeeField::HireDate => updated.hire_date = value.date(field)?,
                EmployeeField::Status => updated.status = value.text(field)?,
            }
        }

        Ok(updated)
    }
}

impl FromIterator<(EmployeeField, FieldValue)> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = (EmployeeField, FieldValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
