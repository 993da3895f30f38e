//! The relational introspector (C2, §4.2).
//!
//! A static registry describing every entity's columns and relationships.
//! This is deliberately the *only* place that lists an entity's shape: the
//! entity type builder (`entities.rs`), the filter/sort compiler
//! (`filter.rs`, `sort.rs`) and the database layer (`db.rs`) all read it
//! rather than hard-coding column lists of their own.

use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Integer,
    Real,
    Boolean,
    DateTime,
}

#[derive(Debug, Clone, Copy)]
pub struct ColumnDef {
    pub name: &'static str,
    pub kind: ColumnKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// One-to-many; resolves to a connection.
    Collection,
    /// Many-to-one; resolves to a single object.
    Single,
}

#[derive(Debug, Clone, Copy)]
pub struct RelationDef {
    pub name: &'static str,
    pub target: &'static str,
    pub kind: RelationKind,
    /// For a collection relation: the foreign model's column that holds
    /// this instance's id. For a single relation: this instance's column
    /// that holds the foreign row's id.
    pub key_column: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct EntityModel {
    /// GraphQL/Rust type name, e.g. `"Campaign"`.
    pub name: &'static str,
    /// Backing table name, e.g. `"campaigns"`.
    pub table: &'static str,
    pub columns: &'static [ColumnDef],
    pub relations: &'static [RelationDef],
    /// Columns exposed as singular lookup kwargs on the `Database` root
    /// field for this entity (§4.7). Every entity gets `id`; a handful
    /// (campaign, company, user) also get `name`, matching the original
    /// schema's `Database` root object.
    pub lookup_columns: &'static [&'static str],
}

impl EntityModel {
    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationDef> {
        self.relations.iter().find(|r| r.name == name)
    }
}

macro_rules! cols {
    ($(($name:literal, $kind:ident)),* $(,)?) => {
        &[$(ColumnDef { name: $name, kind: ColumnKind::$kind }),*]
    };
}

macro_rules! rels {
    () => { &[] };
    ($(($name:literal, $target:literal, $kind:ident, $key:literal)),* $(,)?) => {
        &[$(RelationDef { name: $name, target: $target, kind: RelationKind::$kind, key_column: $key }),*]
    };
}

pub static ALERT_SUBSCRIPTION: EntityModel = EntityModel {
    name: "AlertSubscription",
    table: "alert_subscriptions",
    columns: cols![
        ("id", Text),
        ("user_id", Text),
        ("campaign_id", Text),
        ("mute_timestamp", DateTime),
        ("expiration", DateTime),
    ],
    relations: rels![
        ("user", "User", Single, "user_id"),
        ("campaign", "Campaign", Single, "campaign_id"),
    ],
    lookup_columns: &["id"],
};

pub static CAMPAIGN_TYPE: EntityModel = EntityModel {
    name: "CampaignType",
    table: "campaign_types",
    columns: cols![("id", Text), ("name", Text)],
    relations: rels![("campaigns", "Campaign", Collection, "campaign_type_id")],
    lookup_columns: &["id"],
};

pub static COMPANY: EntityModel = EntityModel {
    name: "Company",
    table: "companies",
    columns: cols![
        ("id", Text),
        ("name", Text),
        ("description", Text),
        ("industry_id", Text),
        ("url_main", Text),
        ("url_email", Text),
        ("url_remote_access", Text),
    ],
    relations: rels![
        ("industry", "Industry", Single, "industry_id"),
        ("campaigns", "Campaign", Collection, "company_id"),
    ],
    lookup_columns: &["id", "name"],
};

pub static COMPANY_DEPARTMENT: EntityModel = EntityModel {
    name: "CompanyDepartment",
    table: "company_departments",
    columns: cols![("id", Text), ("name", Text)],
    relations: rels![("messages", "Message", Collection, "company_department_id")],
    lookup_columns: &["id"],
};

pub static INDUSTRY: EntityModel = EntityModel {
    name: "Industry",
    table: "industries",
    columns: cols![("id", Text), ("name", Text)],
    relations: rels![("companies", "Company", Collection, "industry_id")],
    lookup_columns: &["id"],
};

pub static USER: EntityModel = EntityModel {
    name: "User",
    table: "users",
    columns: cols![
        ("id", Text),
        ("name", Text),
        ("phone_number", Text),
        ("email_address", Text),
        ("last_login", DateTime),
        ("expiration", DateTime),
    ],
    relations: rels![
        ("alert_subscriptions", "AlertSubscription", Collection, "user_id"),
        ("campaigns", "Campaign", Collection, "user_id"),
    ],
    lookup_columns: &["id", "name"],
};

pub static CAMPAIGN: EntityModel = EntityModel {
    name: "Campaign",
    table: "campaigns",
    columns: cols![
        ("id", Text),
        ("name", Text),
        ("description", Text),
        ("user_id", Text),
        ("campaign_type_id", Text),
        ("company_id", Text),
        ("created", DateTime),
        ("reject_after_credentials", Boolean),
        ("expiration", DateTime),
    ],
    relations: rels![
        ("user", "User", Single, "user_id"),
        ("campaign_type", "CampaignType", Single, "campaign_type_id"),
        ("company", "Company", Single, "company_id"),
        ("alert_subscriptions", "AlertSubscription", Collection, "campaign_id"),
        ("credentials", "Credential", Collection, "campaign_id"),
        ("deaddrop_connections", "DeaddropConnection", Collection, "campaign_id"),
        ("deaddrop_deployments", "DeaddropDeployment", Collection, "campaign_id"),
        ("landing_pages", "LandingPage", Collection, "campaign_id"),
        ("messages", "Message", Collection, "campaign_id"),
        ("visits", "Visit", Collection, "campaign_id"),
    ],
    lookup_columns: &["id", "name"],
};

pub static LANDING_PAGE: EntityModel = EntityModel {
    name: "LandingPage",
    table: "landing_pages",
    columns: cols![
        ("id", Text),
        ("campaign_id", Text),
        ("hostname", Text),
        ("page", Text),
    ],
    relations: rels![
        ("campaign", "Campaign", Single, "campaign_id"),
        ("first_visits", "Visit", Collection, "landing_page_id"),
    ],
    lookup_columns: &["id"],
};

pub static MESSAGE: EntityModel = EntityModel {
    name: "Message",
    table: "messages",
    columns: cols![
        ("id", Text),
        ("campaign_id", Text),
        ("company_department_id", Text),
        ("target_email", Text),
        ("first_name", Text),
        ("last_name", Text),
        ("opened", DateTime),
        ("opener_ip", Text),
        ("sent", DateTime),
        ("trained", Boolean),
        ("reported", DateTime),
    ],
    relations: rels![
        ("campaign", "Campaign", Single, "campaign_id"),
        ("company_department", "CompanyDepartment", Single, "company_department_id"),
        ("credentials", "Credential", Collection, "message_id"),
        ("visits", "Visit", Collection, "message_id"),
    ],
    lookup_columns: &["id"],
};

pub static VISIT: EntityModel = EntityModel {
    name: "Visit",
    table: "visits",
    columns: cols![
        ("id", Text),
        ("message_id", Text),
        ("campaign_id", Text),
        ("landing_page_id", Text),
        ("ip", Text),
        ("first_seen", DateTime),
        ("last_seen", DateTime),
        ("user_agent", Text),
        ("visit_count", Integer),
    ],
    relations: rels![
        ("message", "Message", Single, "message_id"),
        ("campaign", "Campaign", Single, "campaign_id"),
        ("landing_page", "LandingPage", Single, "landing_page_id"),
        ("credentials", "Credential", Collection, "visit_id"),
    ],
    lookup_columns: &["id"],
};

pub static CREDENTIAL: EntityModel = EntityModel {
    name: "Credential",
    table: "credentials",
    columns: cols![
        ("id", Text),
        ("visit_id", Text),
        ("message_id", Text),
        ("campaign_id", Text),
        ("username", Text),
        ("password", Text),
        ("submitted", DateTime),
    ],
    relations: rels![
        ("visit", "Visit", Single, "visit_id"),
        ("message", "Message", Single, "message_id"),
        ("campaign", "Campaign", Single, "campaign_id"),
    ],
    lookup_columns: &["id"],
};

pub static DEADDROP_DEPLOYMENT: EntityModel = EntityModel {
    name: "DeaddropDeployment",
    table: "deaddrop_deployments",
    columns: cols![
        ("id", Text),
        ("campaign_id", Text),
        ("destination", Text),
    ],
    relations: rels![
        ("campaign", "Campaign", Single, "campaign_id"),
        ("deaddrop_connections", "DeaddropConnection", Collection, "deployment_id"),
    ],
    lookup_columns: &["id"],
};

pub static DEADDROP_CONNECTION: EntityModel = EntityModel {
    name: "DeaddropConnection",
    table: "deaddrop_connections",
    columns: cols![
        ("id", Text),
        ("deployment_id", Text),
        ("campaign_id", Text),
        ("visit_count", Integer),
        ("visitor_id", Text),
        ("ip", Text),
        ("local_username", Text),
        ("local_hostname", Text),
        ("first_seen", DateTime),
        ("last_seen", DateTime),
    ],
    relations: rels![
        ("deployment", "DeaddropDeployment", Single, "deployment_id"),
        ("campaign", "Campaign", Single, "campaign_id"),
    ],
    lookup_columns: &["id"],
};

pub static ALL_MODELS: &[&EntityModel] = &[
    &ALERT_SUBSCRIPTION,
    &CAMPAIGN_TYPE,
    &COMPANY,
    &COMPANY_DEPARTMENT,
    &INDUSTRY,
    &USER,
    &CAMPAIGN,
    &LANDING_PAGE,
    &MESSAGE,
    &VISIT,
    &CREDENTIAL,
    &DEADDROP_DEPLOYMENT,
    &DEADDROP_CONNECTION,
];

pub static REGISTRY: Lazy<HashMap<&'static str, &'static EntityModel>> =
    Lazy::new(|| ALL_MODELS.iter().map(|m| (m.name, *m)).collect());

pub fn model_by_name(name: &str) -> Option<&'static EntityModel> {
    REGISTRY.get(name).copied()
}

/// camelCase -> snake_case, as used for every client-supplied field name
/// (filter/sort leaves, and implicitly by async-graphql's own auto
/// camelCase renaming of entity object fields).
pub fn camel_to_snake(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, ch) in s.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i != 0 {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// snake_case -> camelCase, the inverse used to derive each entity's
/// GraphQL field names from its column/relationship names.
pub fn snake_to_camel(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper_next = false;
    for ch in s.chars() {
        if ch == '_' {
            upper_next = true;
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_snake_roundtrip_for_every_registered_column() {
        for model in ALL_MODELS {
            for col in model.columns {
                let camel = snake_to_camel(col.name);
                let back = camel_to_snake(&camel);
                assert_eq!(back, col.name, "roundtrip failed for {}.{}", model.name, col.name);
            }
            for rel in model.relations {
                let camel = snake_to_camel(rel.name);
                let back = camel_to_snake(&camel);
                assert_eq!(back, rel.name, "roundtrip failed for {}.{}", model.name, rel.name);
            }
        }
    }

    #[test]
    fn test_underscore_in_camel_is_detectable() {
        // `created_at` has no uppercase so camel_to_snake is a no-op, but
        // the compiler rejects it for containing an underscore at the
        // GraphQL layer (§3 invariant) before it ever reaches here.
        assert_eq!(camel_to_snake("createdAt"), "created_at");
        assert!("created_at".contains('_'));
    }

    #[test]
    fn test_registry_contains_all_thirteen_entities() {
        assert_eq!(ALL_MODELS.len(), 13);
        for model in ALL_MODELS {
            assert!(model_by_name(model.name).is_some());
        }
    }
}
