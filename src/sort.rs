//! The sort half of the filter/sort compiler (C5, §4.5).

use async_graphql::InputObject;

use crate::error::CoreError;
use crate::filter::validate_field_name;
use crate::model::EntityModel;
use crate::scalar::SortDirection;
use crate::session::Session;

#[derive(InputObject, Debug, Clone)]
pub struct SortInput {
    pub field: String,
    pub direction: Option<SortDirection>,
}

/// One compiled `ORDER BY` entry.
#[derive(Debug, Clone)]
pub struct SortEntry {
    pub column: String,
    pub direction: SortDirection,
}

/// Compile a sort list, silently skipping entries the session denies
/// class-level read access to (§4.5: "Unauthorized columns are silently
/// skipped"), in listed order.
pub fn compile_sort(
    sorts: &[SortInput],
    model: &EntityModel,
    session: Option<&dyn Session>,
) -> Result<Vec<SortEntry>, CoreError> {
    let mut entries = Vec::with_capacity(sorts.len());
    for sort in sorts {
        let sql_field = validate_field_name(&sort.field, model)?;
        let allowed = session.map_or(true, |s| s.may_read(model.name, &sql_field, None));
        if !allowed {
            continue;
        }
        entries.push(SortEntry {
            column: sql_field,
            direction: sort.direction.unwrap_or_default(),
        });
    }
    Ok(entries)
}

pub fn render_order_by(entries: &[SortEntry]) -> String {
    entries
        .iter()
        .map(|e| format!("{} {}", e.column, e.direction.sql_suffix()))
        .collect::<Vec<_>>()
        .join(", ")
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

    #[test]
    fn test_sort_default_direction_is_aesc() {
        let sorts = vec![SortInput {
            field: "name".to_string(),
            direction: None,
        }];
        let compiled = compile_sort(&sorts, &CAMPAIGN, None).unwrap();
        assert_eq!(compiled[0].direction, SortDirection::Aesc);
    }

    #[test]
    fn test_sort_malformed_field() {
        let sorts = vec![SortInput {
            field: "created_at".to_string(),
            direction: None,
        }];
        assert!(compile_sort(&sorts, &CAMPAIGN, None).is_err());
    }

    #[test]
    fn test_denied_sort_column_is_skipped_not_errored() {
        let sorts = vec![
            SortInput {
                field: "name".to_string(),
                direction: Some(SortDirection::Desc),
            },
            SortInput {
                field: "id".to_string(),
                direction: None,
            },
        ];
        let session = DenyColumn("name");
        let compiled = compile_sort(&sorts, &CAMPAIGN, Some(&session)).unwrap();
        assert_eq!(compiled.len(), 1);
        assert_eq!(compiled[0].column, "id");
    }

    #[test]
    fn test_render_order_by() {
        let entries = vec![SortEntry {
            column: "created".to_string(),
            direction: SortDirection::Desc,
        }];
        assert_eq!(render_order_by(&entries), "created DESC");
    }
}
