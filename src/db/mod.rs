//! The database session external collaborator (§6): "constructs queries
//! from a model and applies filters, ordering, counting, first-or-null,
//! limit/offset slicing; supports an option that rejects implicit
//! relationship loads." Only explicitly requested relationships are ever
//! materialized — there is no eager-load path here at all.

pub mod sqlite_helpers;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

use crate::error::CoreError;
use crate::filter::Predicate;
use crate::model::EntityModel;
use crate::sort::{SortEntry, render_order_by};
use crate::value::{EntityRow, SqlValue};

#[async_trait]
pub trait DbSession: Send + Sync {
    async fn fetch_rows(
        &self,
        model: &'static EntityModel,
        predicate: Option<&Predicate>,
        order_by: &[SortEntry],
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<EntityRow>, CoreError>;

    async fn count_rows(
        &self,
        model: &'static EntityModel,
        predicate: Option<&Predicate>,
    ) -> Result<i64, CoreError>;

    /// Single-row lookup by an exact-match equality list (the `Database`
    /// root's per-entity `id`/`name` lookup kwargs, §4.7).
    async fn fetch_one_by_columns(
        &self,
        model: &'static EntityModel,
        equals: &[(&str, SqlValue)],
    ) -> Result<Option<EntityRow>, CoreError>;
}

/// Connects to the campaign database and exposes it through `DbSession`.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self, CoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(CoreError::from)?;
        Ok(Self { pool })
    }

    pub fn session(&self) -> SqlxDbSession {
        SqlxDbSession {
            pool: self.pool.clone(),
        }
    }

    /// Access the raw pool, e.g. for a lifecycle health check.
    pub fn sqlx_pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(Clone)]
pub struct SqlxDbSession {
    pool: SqlitePool,
}

impl SqlxDbSession {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn bind_predicate<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    params: &'q [SqlValue],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    for value in params {
        query = match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Text(s) => query.bind(s),
            SqlValue::Integer(i) => query.bind(i),
            SqlValue::Real(f) => query.bind(f),
            SqlValue::Boolean(b) => query.bind(sqlite_helpers::bool_to_int(*b)),
            SqlValue::DateTime(dt) => query.bind(crate::scalar::format_datetime(dt)),
        };
    }
    query
}

#[async_trait]
impl DbSession for SqlxDbSession {
    async fn fetch_rows(
        &self,
        model: &'static EntityModel,
        predicate: Option<&Predicate>,
        order_by: &[SortEntry],
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<EntityRow>, CoreError> {
        let mut sql = format!("SELECT * FROM {}", model.table);
        if let Some(p) = predicate {
            sql.push_str(" WHERE ");
            sql.push_str(&p.sql);
        }
        if !order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&render_order_by(order_by));
        }
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}"));
        }
        let empty = Vec::new();
        let params = predicate.map(|p| &p.params).unwrap_or(&empty);
        let query = bind_predicate(sqlx::query(&sql), params);
        let rows = query.fetch_all(&self.pool).await.map_err(CoreError::from)?;
        rows.iter()
            .map(|r| EntityRow::from_sqlite_row(r, model).map_err(CoreError::from))
            .collect()
    }

    async fn count_rows(
        &self,
        model: &'static EntityModel,
        predicate: Option<&Predicate>,
    ) -> Result<i64, CoreError> {
        let mut sql = format!("SELECT COUNT(*) AS n FROM {}", model.table);
        if let Some(p) = predicate {
            sql.push_str(" WHERE ");
            sql.push_str(&p.sql);
        }
        let empty = Vec::new();
        let params = predicate.map(|p| &p.params).unwrap_or(&empty);
        let query = bind_predicate(sqlx::query(&sql), params);
        let row = query.fetch_one(&self.pool).await.map_err(CoreError::from)?;
        row.try_get::<i64, _>("n").map_err(CoreError::from)
    }

    async fn fetch_one_by_columns(
        &self,
        model: &'static EntityModel,
        equals: &[(&str, SqlValue)],
    ) -> Result<Option<EntityRow>, CoreError> {
        let clauses: Vec<String> = equals.iter().map(|(c, _)| format!("{c} = ?")).collect();
        let mut sql = format!("SELECT * FROM {}", model.table);
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" LIMIT 1");
        let params: Vec<SqlValue> = equals.iter().map(|(_, v)| v.clone()).collect();
        let query = bind_predicate(sqlx::query(&sql), &params);
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(CoreError::from)?;
        row.as_ref()
            .map(|r| EntityRow::from_sqlite_row(r, model).map_err(CoreError::from))
            .transpose()
    }
}
