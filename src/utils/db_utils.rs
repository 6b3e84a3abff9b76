use chrono::NaiveDate;
use sqlx::{Executor, MySql};

use crate::workflow::changes::{ChangeSet, FieldValue};

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    U64(u64),
    Date(NaiveDate),
    Null,
}

impl From<&FieldValue> for SqlValue {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Text(s) | FieldValue::OptionalText(Some(s)) => SqlValue::String(s.clone()),
            FieldValue::Reference(id) | FieldValue::OptionalReference(Some(id)) => {
                SqlValue::U64(*id)
            }
            FieldValue::Date(d) => SqlValue::Date(*d),
            FieldValue::OptionalText(None) | FieldValue::OptionalReference(None) => SqlValue::Null,
        }
    }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
/// Column names come from the closed field enum, never from user input.
/// Returns `None` for an empty change set.
pub fn build_update_sql(
    table: &str,
    changes: &ChangeSet,
    id_column: &str,
    id_value: u64,
) -> Option<SqlUpdate> {
    if changes.is_empty() {
        return None;
    }

    let set_clause = changes
        .iter()
        .map(|(field, _)| format!("{} = ?", field.column()))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!("UPDATE {} SET {} WHERE {} = ?", table, set_clause, id_column);

    let mut values: Vec<SqlValue> = changes.iter().map(|(_, value)| value.into()).collect();

    // WHERE id = ?
    values.push(SqlValue::U64(id_value));

    Some(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update<'e, E>(executor: E, update: SqlUpdate) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::U64(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(executor).await?;
    Ok(result.rows_affected())
}
