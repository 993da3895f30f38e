//! Long-running services and their lifecycle manager.

pub mod database;
pub mod graphql;
pub mod http_server;
pub mod logging;
pub mod manager;

pub use database::{DatabaseService, DatabaseServiceConfig};
pub use graphql::{GraphqlService, GraphqlServiceConfig};
pub use http_server::{HttpServerConfig, HttpServerService};
pub use logging::init_tracing;
pub use manager::{Service, ServiceHealth, ServicesManager, ServicesManagerBuilder};
