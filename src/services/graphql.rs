//! GraphQL service: owns the built schema and its data sources, started
//! and stopped alongside the rest of the services (`dependencies:
//! ["database"]`).

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::db::DbSession;
use crate::geoip::GeoIpLookup;
use crate::plugin::PluginManager;
use crate::schema::{self, AppSchema};
use crate::services::manager::{Service, ServiceHealth};

/// Data sources the schema closes over (§6 External Collaborators).
#[derive(Clone)]
pub struct GraphqlServiceConfig {
    pub db: Arc<dyn DbSession>,
    pub geoip: Arc<dyn GeoIpLookup>,
    pub plugins: Arc<dyn PluginManager>,
}

/// Service that builds and owns the `async-graphql` schema.
pub struct GraphqlService {
    config: GraphqlServiceConfig,
    schema: RwLock<Option<AppSchema>>,
}

impl GraphqlService {
    pub fn new(config: GraphqlServiceConfig) -> Self {
        Self {
            config,
            schema: RwLock::new(None),
        }
    }

    /// The built schema, if the service has been started.
    pub async fn schema(&self) -> Option<AppSchema> {
        self.schema.read().await.clone()
    }
}

#[async_trait]
impl Service for GraphqlService {
    fn name(&self) -> &str {
        "graphql"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["database".to_string()]
    }

    async fn start(&self) -> Result<()> {
        let built = schema::build_schema(
            self.config.db.clone(),
            self.config.geoip.clone(),
            self.config.plugins.clone(),
        );
        *self.schema.write().await = Some(built);
        info!(service = "graphql", "GraphQL schema built");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        *self.schema.write().await = None;
        info!(service = "graphql", "GraphQL schema torn down");
        Ok(())
    }

    async fn health(&self) -> Result<ServiceHealth> {
        if self.schema.read().await.is_some() {
            Ok(ServiceHealth::healthy())
        } else {
            Ok(ServiceHealth::unhealthy("schema not built"))
        }
    }
}
