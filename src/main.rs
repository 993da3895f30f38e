//! Authorized GraphQL query layer over the campaign database.
//!
//! All operations are exposed via GraphQL at `/graphql`.

use std::sync::Arc;

use anyhow::Result;
use king_phisher_graphql::config::Config;
use king_phisher_graphql::db::{Database, DbSession};
use king_phisher_graphql::geoip::NullGeoIpLookup;
use king_phisher_graphql::plugin::EmptyPluginManager;
use king_phisher_graphql::services::manager::Service;
use king_phisher_graphql::services::{
    self, DatabaseService, GraphqlServiceConfig, HttpServerConfig, ServicesManagerBuilder,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    services::init_tracing();

    let config = Arc::new(Config::from_env()?);
    info!(host = %config.host, port = config.port, "starting king-phisher-graphql");

    let pool = Database::connect(&config.database_url).await?;
    let db: Arc<dyn DbSession> = Arc::new(pool.session());
    let database_service: Arc<dyn Service> = Arc::new(DatabaseService::new(pool));

    let manager = ServicesManagerBuilder::new()
        .add_service(database_service)
        .add_service(GraphqlServiceConfig {
            db,
            geoip: Arc::new(NullGeoIpLookup),
            plugins: Arc::new(EmptyPluginManager),
        })
        .add_service(HttpServerConfig {
            config: config.clone(),
        })
        .start()
        .await?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    manager.stop_all().await?;
    Ok(())
}
