//! End-to-end scenarios over a real (in-memory) SQLite database, combining
//! filtering, sorting, pagination, and authorization together (§8).

use std::sync::Arc;

use king_phisher_graphql::db::{DbSession, SqlxDbSession};
use king_phisher_graphql::geoip::NullGeoIpLookup;
use king_phisher_graphql::plugin::{EmptyPluginManager, PluginManager, PluginRecord};
use king_phisher_graphql::schema::{self, AppSchema};
use king_phisher_graphql::session::Session;
use king_phisher_graphql::value::EntityRow;
use sqlx::SqlitePool;

struct ThreePluginManager;

impl PluginManager for ThreePluginManager {
    fn len(&self) -> usize {
        3
    }

    fn iter(&self) -> Vec<PluginRecord> {
        vec![
            PluginRecord {
                identifier: "zeta".into(),
                authors: vec!["zed".into()],
                title: "Zeta".into(),
                description: String::new(),
                homepage: None,
                name: "zeta-plugin".into(),
                version: "1.0".into(),
            },
            PluginRecord {
                identifier: "alpha".into(),
                authors: vec!["ay".into()],
                title: "Alpha".into(),
                description: String::new(),
                homepage: None,
                name: "alpha-plugin".into(),
                version: "2.0".into(),
            },
            PluginRecord {
                identifier: "mu".into(),
                authors: vec!["em".into()],
                title: "Mu".into(),
                description: String::new(),
                homepage: None,
                name: "mu-plugin".into(),
                version: "3.0".into(),
            },
        ]
    }
}

async fn seeded_schema() -> AppSchema {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    sqlx::query(
        "CREATE TABLE campaigns (
            id TEXT PRIMARY KEY,
            name TEXT,
            description TEXT,
            user_id TEXT,
            campaign_type_id TEXT,
            company_id TEXT,
            created TEXT,
            reject_after_credentials INTEGER,
            expiration TEXT
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    for (id, name, created) in [
        ("1", "spring", "2026-01-01T00:00:00.000000"),
        ("2", "autumn", "2026-02-01T00:00:00.000000"),
        ("3", "winter", "2026-03-01T00:00:00.000000"),
    ] {
        sqlx::query(
            "INSERT INTO campaigns (id, name, description, user_id, campaign_type_id, company_id, created, reject_after_credentials, expiration)
             VALUES (?, ?, NULL, NULL, NULL, NULL, ?, 0, NULL)",
        )
        .bind(id)
        .bind(name)
        .bind(created)
        .execute(&pool)
        .await
        .unwrap();
    }

    let db: Arc<dyn DbSession> = Arc::new(SqlxDbSession::new(pool));
    schema::build_schema(db, Arc::new(NullGeoIpLookup), Arc::new(EmptyPluginManager))
}

#[tokio::test]
async fn lookup_by_name_finds_matching_campaign() {
    let schema = seeded_schema().await;
    let response = schema::execute(
        &schema,
        r#"{ db { campaign(name: "spring") { id name } } }"#,
        None,
    )
    .await;
    assert!(response.errors.is_empty());
    let json = response.data.into_json().unwrap();
    assert_eq!(json["db"]["campaign"]["id"], "1");
    assert_eq!(json["db"]["campaign"]["name"], "spring");
}

#[tokio::test]
async fn lookup_by_missing_name_is_null_not_an_error() {
    let schema = seeded_schema().await;
    let response = schema::execute(
        &schema,
        r#"{ db { campaign(name: "nonexistent") { id } } }"#,
        None,
    )
    .await;
    assert!(response.errors.is_empty());
    let json = response.data.into_json().unwrap();
    assert!(json["db"]["campaign"].is_null());
}

#[tokio::test]
async fn connection_reports_total_independent_of_slice() {
    let schema = seeded_schema().await;
    let response = schema::execute(
        &schema,
        r#"{ db { campaigns(first: 1, sort: [{field: "name", direction: AESC}]) { total edges { node { name } } } } }"#,
        None,
    )
    .await;
    assert!(response.errors.is_empty());
    let json = response.data.into_json().unwrap();
    assert_eq!(json["db"]["campaigns"]["total"], 3);
    assert_eq!(json["db"]["campaigns"]["edges"].as_array().unwrap().len(), 1);
    assert_eq!(json["db"]["campaigns"]["edges"][0]["node"]["name"], "autumn");
}

#[tokio::test]
async fn filter_and_sort_compile_to_expected_result() {
    let schema = seeded_schema().await;
    let response = schema::execute(
        &schema,
        r#"{ db { campaigns(filter: {field: "name", operator: EQ, value: "winter"}) { total edges { node { id } } } } }"#,
        None,
    )
    .await;
    assert!(response.errors.is_empty());
    let json = response.data.into_json().unwrap();
    assert_eq!(json["db"]["campaigns"]["total"], 1);
    assert_eq!(json["db"]["campaigns"]["edges"][0]["node"]["id"], "3");
}

#[tokio::test]
async fn underscore_field_name_is_a_malformed_input_error() {
    let schema = seeded_schema().await;
    let response = schema::execute(
        &schema,
        r#"{ db { campaigns(filter: {field: "created_at", value: "x"}) { total } } }"#,
        None,
    )
    .await;
    assert!(!response.errors.is_empty());
}

struct DenyDescriptionSession;

impl Session for DenyDescriptionSession {
    fn may_read(&self, _model: &str, field_name: &str, _instance: Option<&EntityRow>) -> bool {
        field_name != "description"
    }
}

#[tokio::test]
async fn denied_field_resolves_to_null_without_an_error() {
    let schema = seeded_schema().await;
    let session: Arc<dyn Session> = Arc::new(DenyDescriptionSession);
    let response = schema::execute(
        &schema,
        r#"{ db { campaign(name: "spring") { id description } } }"#,
        Some(session),
    )
    .await;
    assert!(response.errors.is_empty());
    let json = response.data.into_json().unwrap();
    assert_eq!(json["db"]["campaign"]["id"], "1");
    assert!(json["db"]["campaign"]["description"].is_null());
}

#[tokio::test]
async fn plugins_connection_reports_total_and_sorted_edges() {
    let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
    let db: Arc<dyn DbSession> = Arc::new(SqlxDbSession::new(pool));
    let schema = schema::build_schema(db, Arc::new(NullGeoIpLookup), Arc::new(ThreePluginManager));

    let response = schema::execute(
        &schema,
        "{ plugins { total edges { node { name version } } } }",
        None,
    )
    .await;
    assert!(response.errors.is_empty());
    let json = response.data.into_json().unwrap();
    assert_eq!(json["plugins"]["total"], 3);
    let edges = json["plugins"]["edges"].as_array().unwrap();
    assert_eq!(edges.len(), 3);
    assert_eq!(edges[0]["node"]["name"], "alpha-plugin");
    assert_eq!(edges[1]["node"]["name"], "mu-plugin");
    assert_eq!(edges[2]["node"]["name"], "zeta-plugin");
}
