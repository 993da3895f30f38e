//! The root schema (C7, §4.7): the top-level `Query` type (`db`, `geoloc`,
//! `plugin`, `plugins`, `version`) plus schema construction and the
//! `execute`/`execute_file` convenience entry points (§6).

use std::sync::Arc;

use async_graphql::{Context, EmptyMutation, EmptySubscription, Object, Request, Response, Schema};

use crate::db::DbSession;
use crate::entities::Database as DatabaseRoot;
use crate::geoip::{GeoIpLookup, GeoLocation, from_ip_address};
use crate::plugin::{self, Plugin, PluginConnection, PluginManager};
use crate::session::Session;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct Query;

#[Object]
impl Query {
    /// The stateless entity projection root (§4.7); carries no data of its
    /// own, every field on it resolves against the database.
    async fn db(&self) -> DatabaseRoot {
        DatabaseRoot
    }

    async fn geoloc(&self, ctx: &Context<'_>, ip: String) -> async_graphql::Result<Option<GeoLocation>> {
        let lookup = ctx.data::<Arc<dyn GeoIpLookup>>()?;
        Ok(from_ip_address(lookup.as_ref(), &ip).await)
    }

    async fn plugin(&self, ctx: &Context<'_>, name: String) -> async_graphql::Result<Option<Plugin>> {
        let manager = ctx.data::<Arc<dyn PluginManager>>()?;
        Ok(plugin::find_by_name(manager.as_ref(), &name))
    }

    async fn plugins(&self, ctx: &Context<'_>) -> async_graphql::Result<PluginConnection> {
        let manager = ctx.data::<Arc<dyn PluginManager>>()?;
        Ok(plugin::build_connection(manager.as_ref()))
    }

    async fn version(&self) -> &str {
        VERSION
    }
}

pub type AppSchema = Schema<Query, EmptyMutation, EmptySubscription>;

/// Build the schema (§4.7). The database session, GeoIP lookup and plugin
/// manager are process-lifetime collaborators wired in once as context
/// data; the caller session is per-request and supplied to `execute`
/// instead, mirroring the original's `context_value` being assembled
/// fresh for every call.
pub fn build_schema(
    db: Arc<dyn DbSession>,
    geoip: Arc<dyn GeoIpLookup>,
    plugins: Arc<dyn PluginManager>,
) -> AppSchema {
    Schema::build(Query, EmptyMutation, EmptySubscription)
        .data(db)
        .data(geoip)
        .data(plugins)
        .finish()
}

/// Run a query string against the schema. A `None` session disables
/// authorization entirely (§4.4.3); `Some` attaches it as request-scoped
/// context data so every field resolver's `ctx.data_opt::<Arc<dyn
/// Session>>()` sees it.
pub async fn execute(schema: &AppSchema, query: &str, session: Option<Arc<dyn Session>>) -> Response {
    let mut request = Request::new(query);
    if let Some(session) = session {
        request = request.data(session);
    }
    schema.execute(request).await
}

/// `execute_file`: read a query from a file path and run it (§6).
pub async fn execute_file(
    schema: &AppSchema,
    path: &std::path::Path,
    session: Option<Arc<dyn Session>>,
) -> std::io::Result<Response> {
    let query = tokio::fs::read_to_string(path).await?;
    Ok(execute(schema, &query, session).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqlxDbSession;
    use crate::geoip::NullGeoIpLookup;
    use crate::plugin::EmptyPluginManager;

    async fn test_schema() -> AppSchema {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        let db: Arc<dyn DbSession> = Arc::new(SqlxDbSession::new(pool));
        let geoip: Arc<dyn GeoIpLookup> = Arc::new(NullGeoIpLookup);
        let plugins: Arc<dyn PluginManager> = Arc::new(EmptyPluginManager);
        build_schema(db, geoip, plugins)
    }

    #[tokio::test]
    async fn test_version_field() {
        let schema = test_schema().await;
        let response = execute(&schema, "{ version }", None).await;
        assert!(response.errors.is_empty());
    }

    #[tokio::test]
    async fn test_plugins_empty_by_default() {
        let schema = test_schema().await;
        let response = execute(&schema, "{ plugins { total edges { node { name version } } } }", None).await;
        assert!(response.errors.is_empty());
        let json = response.data.into_json().unwrap();
        assert_eq!(json["plugins"]["total"], 0);
        assert!(json["plugins"]["edges"].as_array().unwrap().is_empty());
    }
}
