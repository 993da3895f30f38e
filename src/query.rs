//! Connection field resolution (C6, §4.6) and relationship resolution
//! (the `resolve_relationship` half of C2, §4.2).
//!
//! Models the "resolver returns either a lazy query or a materialized
//! list" contract (§9) as the tagged `Iterable` variant: C6 dispatches on
//! the tag to decide whether filter/sort apply and how to compute length.

use crate::db::DbSession;
use crate::error::CoreError;
use crate::filter::{FilterInput, Predicate, compile_filter};
use crate::model::{EntityModel, RelationKind, model_by_name};
use crate::pagination::{Connection, resolve_window};
use crate::session::Session;
use crate::sort::{SortInput, compile_sort};
use crate::value::{EntityRow, SqlValue};

/// A not-yet-executed query against a model: a base predicate (e.g. a
/// relationship's foreign-key equality) plus whatever default ordering
/// the caller configured.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub model: &'static EntityModel,
    pub predicate: Option<Predicate>,
}

impl QuerySpec {
    pub fn default_query(model: &'static EntityModel) -> Self {
        QuerySpec {
            model,
            predicate: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Iterable {
    LazyQuery(QuerySpec),
    Materialized(Vec<EntityRow>),
}

/// Resolve a named relationship on `instance` (§4.2). Collection
/// relationships become a lazy query filtered by the foreign model's key
/// column; single-reference relationships are resolved eagerly since a
/// connection wrapper would be meaningless for them.
pub fn relationship_query(model: &EntityModel, instance: &EntityRow, relation_name: &str) -> Option<QuerySpec> {
    let relation = model.relation(relation_name)?;
    if relation.kind != RelationKind::Collection {
        return None;
    }
    let target = model_by_name(relation.target)?;
    Some(QuerySpec {
        model: target,
        predicate: Some(Predicate {
            sql: format!("{} = ?", relation.key_column),
            params: vec![SqlValue::Text(instance.id())],
        }),
    })
}

pub async fn resolve_single_relationship(
    db: &dyn DbSession,
    model: &EntityModel,
    instance: &EntityRow,
    relation_name: &str,
) -> Result<Option<EntityRow>, CoreError> {
    let Some(relation) = model.relation(relation_name) else {
        return Ok(None);
    };
    if relation.kind != RelationKind::Single {
        return Ok(None);
    }
    let Some(target) = model_by_name(relation.target) else {
        return Ok(None);
    };
    let Some(foreign_id) = instance.get(relation.key_column) else {
        return Ok(None);
    };
    if foreign_id.is_null() {
        return Ok(None);
    }
    db.fetch_one_by_columns(target, &[("id", foreign_id.clone())])
        .await
}

fn and_together(base: Option<Predicate>, extra: Option<Predicate>) -> Option<Predicate> {
    match (base, extra) {
        (None, x) => x,
        (x, None) => x,
        (Some(a), Some(b)) => Some(Predicate {
            sql: format!("({}) AND ({})", a.sql, b.sql),
            params: a.params.into_iter().chain(b.params).collect(),
        }),
    }
}

/// Connection field resolution algorithm (§4.6 steps 2-6). The caller has
/// already produced `iterable` (the inner resolver's result, or the
/// model's default query when it returned null).
pub async fn resolve_connection(
    db: &dyn DbSession,
    iterable: Iterable,
    filter: Option<FilterInput>,
    sort: Option<Vec<SortInput>>,
    session: Option<&dyn Session>,
    first: Option<i32>,
    after: Option<String>,
    last: Option<i32>,
    before: Option<String>,
) -> Result<Connection<EntityRow>, CoreError> {
    match iterable {
        Iterable::LazyQuery(spec) => {
            let filter_predicate = match filter {
                Some(f) => compile_filter(&f, spec.model, session)?,
                None => None,
            };
            let predicate = and_together(spec.predicate, filter_predicate);
            let order_by = match sort {
                Some(entries) => compile_sort(&entries, spec.model, session)?,
                None => Vec::new(),
            };
            let total = db.count_rows(spec.model, predicate.as_ref()).await?;
            let window = resolve_window(total, first, after, last, before)?;
            let rows = db
                .fetch_rows(spec.model, predicate.as_ref(), &order_by, Some(window.limit), window.offset)
                .await?;
            Ok(Connection::from_slice(rows, window.offset, total))
        }
        Iterable::Materialized(items) => {
            // filter/sort are not applicable to an already-materialized sequence (§4.6.4)
            let total = items.len() as i64;
            let window = resolve_window(total, first, after, last, before)?;
            let slice = items[window.offset as usize..(window.offset + window.limit) as usize].to_vec();
            Ok(Connection::from_slice(slice, window.offset, total))
        }
    }
}
