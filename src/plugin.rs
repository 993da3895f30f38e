//! Plugin auxiliary object (C8, §4.8) and the plugin manager external
//! collaborator (§6): an iterable of `(identifier, plugin)` pairs.

use async_graphql::SimpleObject;

use crate::pagination::PageInfo;

#[derive(SimpleObject, Debug, Clone)]
pub struct Plugin {
    pub authors: Vec<String>,
    pub title: String,
    pub description: String,
    pub homepage: Option<String>,
    pub name: String,
    pub version: String,
}

/// One entry in the process-wide plugin registry, prior to projection
/// into the GraphQL `Plugin` type.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    pub identifier: String,
    pub authors: Vec<String>,
    pub title: String,
    pub description: String,
    pub homepage: Option<String>,
    pub name: String,
    pub version: String,
}

impl From<&PluginRecord> for Plugin {
    fn from(p: &PluginRecord) -> Self {
        Plugin {
            authors: p.authors.clone(),
            title: p.title.clone(),
            description: p.description.clone(),
            homepage: p.homepage.clone(),
            name: p.name.clone(),
            version: p.version.clone(),
        }
    }
}

/// One edge of a [PluginConnection], mirroring `Edge<T>` in
/// `pagination.rs`.
#[derive(SimpleObject, Debug, Clone)]
pub struct PluginEdge {
    pub node: Plugin,
    pub cursor: String,
}

/// The `plugins` root field's relay connection (§4.7, §4.8). No
/// pagination arguments are exposed on this field — the registry is
/// small and unpaged — but `total` is still the registry's full size per
/// §4.8's `PluginConnection.total`, matching `Connection<T>` in
/// `pagination.rs`.
#[derive(SimpleObject, Debug, Clone)]
pub struct PluginConnection {
    pub edges: Vec<PluginEdge>,
    pub page_info: PageInfo,
    pub total: i64,
}

/// Build the `plugins` connection from the registry, sorted by
/// identifier (§4.7).
pub fn build_connection(manager: &dyn PluginManager) -> PluginConnection {
    let records = sorted_records(manager);
    let edges: Vec<PluginEdge> = records
        .iter()
        .enumerate()
        .map(|(i, record)| PluginEdge {
            node: Plugin::from(record),
            cursor: crate::pagination::encode_cursor(i as i64),
        })
        .collect();
    let page_info = PageInfo {
        has_next_page: false,
        has_previous_page: false,
        start_cursor: edges.first().map(|e| e.cursor.clone()),
        end_cursor: edges.last().map(|e| e.cursor.clone()),
    };
    PluginConnection {
        edges,
        page_info,
        total: manager.len() as i64,
    }
}

pub trait PluginManager: Send + Sync {
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    fn iter(&self) -> Vec<PluginRecord>;
}

/// An empty registry; used as the default when no host process wires a
/// real plugin manager into context.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyPluginManager;

impl PluginManager for EmptyPluginManager {
    fn len(&self) -> usize {
        0
    }
    fn iter(&self) -> Vec<PluginRecord> {
        Vec::new()
    }
}

/// `resolve_plugins`: sorted by plugin identifier (§4.7).
pub fn sorted_records(manager: &dyn PluginManager) -> Vec<PluginRecord> {
    let mut records = manager.iter();
    records.sort_by(|a, b| a.identifier.cmp(&b.identifier));
    records
}

/// `resolve_plugin`: first record whose `name` matches. The original
/// schema references a bare, unqualified `Plugin` symbol here in one of
/// its two variants, which would not resolve if the type lived outside
/// that module's namespace — fixed here by routing through this module's
/// own `Plugin` type directly rather than reproducing the ambiguity (see
/// DESIGN.md).
pub fn find_by_name(manager: &dyn PluginManager, name: &str) -> Option<Plugin> {
    manager
        .iter()
        .into_iter()
        .find(|p| p.name == name)
        .as_ref()
        .map(Plugin::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<PluginRecord> {
        vec![
            PluginRecord {
                identifier: "zeta".into(),
                authors: vec!["a".into()],
                title: "Zeta".into(),
                description: "".into(),
                homepage: None,
                name: "zeta-plugin".into(),
                version: "1.0".into(),
            },
            PluginRecord {
                identifier: "alpha".into(),
                authors: vec!["b".into()],
                title: "Alpha".into(),
                description: "".into(),
                homepage: None,
                name: "alpha-plugin".into(),
                version: "2.0".into(),
            },
        ]
    }

    struct FixedManager(Vec<PluginRecord>);
    impl PluginManager for FixedManager {
        fn len(&self) -> usize {
            self.0.len()
        }
        fn iter(&self) -> Vec<PluginRecord> {
            self.0.clone()
        }
    }

    #[test]
    fn test_sorted_by_identifier() {
        let manager = FixedManager(sample());
        let sorted = sorted_records(&manager);
        assert_eq!(sorted[0].identifier, "alpha");
        assert_eq!(sorted[1].identifier, "zeta");
    }

    #[test]
    fn test_find_by_name() {
        let manager = FixedManager(sample());
        let found = find_by_name(&manager, "alpha-plugin").unwrap();
        assert_eq!(found.title, "Alpha");
    }

    #[test]
    fn test_find_by_name_missing() {
        let manager = FixedManager(sample());
        assert!(find_by_name(&manager, "nope").is_none());
    }

    #[test]
    fn test_build_connection_total_and_order() {
        let manager = FixedManager(sample());
        let conn = build_connection(&manager);
        assert_eq!(conn.total, 2);
        assert_eq!(conn.edges.len(), 2);
        assert_eq!(conn.edges[0].node.name, "alpha-plugin");
        assert_eq!(conn.edges[1].node.name, "zeta-plugin");
    }

    #[test]
    fn test_build_connection_empty_registry() {
        let manager = EmptyPluginManager;
        let conn = build_connection(&manager);
        assert_eq!(conn.total, 0);
        assert!(conn.edges.is_empty());
    }
}
