//! Runtime column values shared between the database layer and the
//! GraphQL resolvers (grounded in the teacher's `orm::builder::SqlValue`).

use std::collections::BTreeMap;

use async_graphql::Value as GqlValue;
use chrono::{DateTime, Utc};
use sqlx::{Row, sqlite::SqliteRow};

use crate::model::{ColumnKind, EntityModel};

/// A single column value, already converted out of the driver's native
/// representation and ready either to bind into a parameterized query or
/// to be handed to a GraphQL scalar.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Boolean(bool),
    DateTime(DateTime<Utc>),
}

impl SqlValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SqlValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_string(&self) -> Option<String> {
        match self {
            SqlValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SqlValue::Real(f) => Some(*f),
            SqlValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            SqlValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Convert a GraphQL input literal (from `FilterInput.value`, an
    /// `AnyScalar`) into a bindable value for the given column kind.
    pub fn from_gql(value: &GqlValue, kind: ColumnKind) -> SqlValue {
        match value {
            GqlValue::Null => SqlValue::Null,
            GqlValue::String(s) => match kind {
                ColumnKind::DateTime => crate::scalar::parse_datetime(s)
                    .map(SqlValue::DateTime)
                    .unwrap_or(SqlValue::Null),
                _ => SqlValue::Text(s.clone()),
            },
            GqlValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    SqlValue::Real(f)
                } else {
                    SqlValue::Null
                }
            }
            GqlValue::Boolean(b) => SqlValue::Boolean(*b),
            _ => SqlValue::Null,
        }
    }
}

/// A fetched row, keyed by snake_case column name. Generic over every
/// entity so the filter/sort compiler and the introspector (§4.2) can
/// operate against any model without per-entity typed structs.
#[derive(Debug, Clone, Default)]
pub struct EntityRow(BTreeMap<String, SqlValue>);

impl EntityRow {
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.0.get(column)
    }

    pub fn id(&self) -> String {
        match self.get("id") {
            Some(SqlValue::Text(s)) => s.clone(),
            Some(SqlValue::Integer(i)) => i.to_string(),
            _ => String::new(),
        }
    }

    /// Build a row from a raw SQLite row using the model's column list to
    /// know each column's expected kind.
    pub fn from_sqlite_row(row: &SqliteRow, model: &EntityModel) -> sqlx::Result<Self> {
        let mut map = BTreeMap::new();
        for col in model.columns {
            let value = match col.kind {
                ColumnKind::Text => row
                    .try_get::<Option<String>, _>(col.name)?
                    .map(SqlValue::Text)
                    .unwrap_or(SqlValue::Null),
                ColumnKind::Integer => row
                    .try_get::<Option<i64>, _>(col.name)?
                    .map(SqlValue::Integer)
                    .unwrap_or(SqlValue::Null),
                ColumnKind::Real => row
                    .try_get::<Option<f64>, _>(col.name)?
                    .map(SqlValue::Real)
                    .unwrap_or(SqlValue::Null),
                ColumnKind::Boolean => row
                    .try_get::<Option<i64>, _>(col.name)?
                    .map(crate::db::sqlite_helpers::int_to_bool)
                    .map(SqlValue::Boolean)
                    .unwrap_or(SqlValue::Null),
                ColumnKind::DateTime => row
                    .try_get::<Option<String>, _>(col.name)?
                    .and_then(|s| crate::scalar::parse_datetime(&s))
                    .map(SqlValue::DateTime)
                    .unwrap_or(SqlValue::Null),
            };
            map.insert(col.name.to_string(), value);
        }
        Ok(EntityRow(map))
    }
}
