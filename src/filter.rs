//! The filter half of the filter/sort compiler (C5, §4.5).
//!
//! `FilterInput` is the single generic filter shape shared by every
//! entity's connection field — there is no per-entity `WhereInput`. A node
//! carries exactly one of `and`/`or`/`field`; compiling anything else is a
//! `MalformedInput` error. Authorization denials never error: a denied
//! leaf simply contributes no predicate, and an all-denied `and`/`or`
//! list collapses to the identity predicate for that connective.

use async_graphql::InputObject;

use crate::error::CoreError;
use crate::model::{EntityModel, camel_to_snake};
use crate::scalar::{AnyValue, FilterOperator};
use crate::session::Session;
use crate::value::SqlValue;

#[derive(InputObject, Debug, Clone, Default)]
pub struct FilterInput {
    #[graphql(name = "and")]
    pub and: Option<Vec<FilterInput>>,
    #[graphql(name = "or")]
    pub or: Option<Vec<FilterInput>>,
    pub field: Option<String>,
    pub value: Option<AnyValue>,
    pub operator: Option<FilterOperator>,
}

/// A compiled SQL boolean expression plus its positional bind values, in
/// the same left-to-right order as the `?` placeholders in `sql`.
#[derive(Debug, Clone)]
pub struct Predicate {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Predicate {
    fn identity_true() -> Self {
        Predicate {
            sql: "1=1".to_string(),
            params: Vec::new(),
        }
    }

    fn identity_false() -> Self {
        Predicate {
            sql: "0=1".to_string(),
            params: Vec::new(),
        }
    }

    fn combine(parts: Vec<Predicate>, joiner: &str, empty: Predicate) -> Predicate {
        if parts.is_empty() {
            return empty;
        }
        let sql = parts
            .iter()
            .map(|p| p.sql.as_str())
            .collect::<Vec<_>>()
            .join(joiner);
        let params = parts.into_iter().flat_map(|p| p.params).collect();
        Predicate {
            sql: format!("({sql})"),
            params,
        }
    }
}

/// Translate and validate a client-supplied camelCase field name against a
/// model's columns. Shared by the filter and sort compilers (§4.5: "same
/// field translation and validation as filters").
pub fn validate_field_name(gql_field: &str, model: &EntityModel) -> Result<String, CoreError> {
    let sql_field = camel_to_snake(gql_field);
    if gql_field.contains('_') || !model.has_column(&sql_field) {
        return Err(CoreError::malformed(format!(
            "invalid field: {gql_field}"
        )));
    }
    Ok(sql_field)
}

fn class_may_read(session: Option<&dyn Session>, model: &EntityModel, field: &str) -> bool {
    session.map_or(true, |s| s.may_read(model.name, field, None))
}

/// Compile one filter node. Returns `Ok(None)` when the node contributes
/// no predicate (either it was empty, or every leaf underneath it was
/// authorization-denied).
pub fn compile_filter(
    filter: &FilterInput,
    model: &EntityModel,
    session: Option<&dyn Session>,
) -> Result<Option<Predicate>, CoreError> {
    let mut result: Option<Predicate> = None;

    if let Some(and) = filter.and.as_ref().filter(|v| !v.is_empty()) {
        let children = compile_list(and, model, session)?;
        result = Some(Predicate::combine(children, " AND ", Predicate::identity_true()));
    }

    if let Some(or) = filter.or.as_ref().filter(|v| !v.is_empty()) {
        if result.is_some() {
            return Err(CoreError::malformed(
                "the 'and', 'or', and 'field' filter operators are mutually exclusive",
            ));
        }
        let children = compile_list(or, model, session)?;
        result = Some(Predicate::combine(children, " OR ", Predicate::identity_false()));
    }

    if let Some(field) = filter.field.as_ref().filter(|f| !f.is_empty()) {
        if result.is_some() {
            return Err(CoreError::malformed(
                "the 'and', 'or', and 'field' filter operators are mutually exclusive",
            ));
        }
        let operator = filter.operator.unwrap_or_default();
        let sql_field = validate_field_name(field, model)?;
        if class_may_read(session, model, &sql_field) {
            let col = model.column(&sql_field).expect("validated above");
            let value = filter
                .value
                .as_ref()
                .map(|v| SqlValue::from_gql(&v.0, col.kind))
                .unwrap_or(SqlValue::Null);
            result = Some(Predicate {
                sql: format!("{sql_field} {} ?", operator_sql(operator)),
                params: vec![value],
            });
        }
    }

    Ok(result)
}

fn operator_sql(operator: FilterOperator) -> &'static str {
    operator.sql_op()
}

fn compile_list(
    filters: &[FilterInput],
    model: &EntityModel,
    session: Option<&dyn Session>,
) -> Result<Vec<Predicate>, CoreError> {
    filters
        .iter()
        .map(|f| compile_filter(f, model, session))
        .collect::<Result<Vec<_>, _>>()
        .map(|opts| opts.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CAMPAIGN;
    use crate::session::Session as _;
    use crate::value::EntityRow;

    struct DenyColumn(&'static str);
    impl Session for DenyColumn {
        fn may_read(&self, _model: &str, field_name: &str, _instance: Option<&EntityRow>) -> bool {
            field_name != self.0
        }
    }

    fn leaf(field: &str, op: FilterOperator, value: AnyValue) -> FilterInput {
        FilterInput {
            field: Some(field.to_string()),
            operator: Some(op),
            value: Some(value),
            ..Default::default()
        }
    }

    #[test]
    fn test_simple_eq_filter() {
        let f = leaf(
            "name",
            FilterOperator::Eq,
            AnyValue(async_graphql::Value::String("x".into())),
        );
        let p = compile_filter(&f, &CAMPAIGN, None).unwrap().unwrap();
        assert_eq!(p.sql, "name = ?");
    }

    #[test]
    fn test_underscore_field_is_malformed() {
        let f = leaf(
            "created_at",
            FilterOperator::Eq,
            AnyValue(async_graphql::Value::Number(0.into())),
        );
        assert!(compile_filter(&f, &CAMPAIGN, None).is_err());
    }

    #[test]
    fn test_and_or_mutually_exclusive() {
        let f = FilterInput {
            and: Some(vec![leaf(
                "name",
                FilterOperator::Eq,
                AnyValue(async_graphql::Value::String("a".into())),
            )]),
            or: Some(vec![leaf(
                "name",
                FilterOperator::Eq,
                AnyValue(async_graphql::Value::String("b".into())),
            )]),
            ..Default::default()
        };
        assert!(compile_filter(&f, &CAMPAIGN, None).is_err());
    }

    #[test]
    fn test_nested_and_or_precedence() {
        let inner_or = FilterInput {
            or: Some(vec![
                leaf("id", FilterOperator::Gt, AnyValue(async_graphql::Value::Number(5.into()))),
                leaf("id", FilterOperator::Lt, AnyValue(async_graphql::Value::Number(2.into()))),
            ]),
            ..Default::default()
        };
        let top = FilterInput {
            and: Some(vec![
                leaf("name", FilterOperator::Ne, AnyValue(async_graphql::Value::String("a".into()))),
                inner_or,
            ]),
            ..Default::default()
        };
        let p = compile_filter(&top, &CAMPAIGN, None).unwrap().unwrap();
        assert_eq!(p.sql, "(name <> ? AND (id > ? OR id < ?))");
        assert_eq!(p.params.len(), 3);
    }

    #[test]
    fn test_denied_field_drops_predicate_not_error() {
        let f = leaf(
            "name",
            FilterOperator::Eq,
            AnyValue(async_graphql::Value::String("x".into())),
        );
        let session = DenyColumn("name");
        let result = compile_filter(&f, &CAMPAIGN, Some(&session)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_and_with_all_children_denied_collapses_to_identity() {
        let f = FilterInput {
            and: Some(vec![leaf(
                "name",
                FilterOperator::Eq,
                AnyValue(async_graphql::Value::String("x".into())),
            )]),
            ..Default::default()
        };
        let session = DenyColumn("name");
        let p = compile_filter(&f, &CAMPAIGN, Some(&session)).unwrap().unwrap();
        assert_eq!(p.sql, "1=1");
    }
}
