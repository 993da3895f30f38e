//! Error kinds surfaced to the GraphQL layer (§7).
//!
//! `AuthorizationDenied` deliberately has no variant here: per §4.4/§7 a
//! denial is never an error, it is elided to `null` or a dropped predicate
//! by the caller before an error could ever be constructed.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Bad filter shape, unknown operator, malformed sort direction, a
    /// field name containing an underscore, or an unknown field name.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// Database or GeoIP lookup failure.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),
}

impl CoreError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        CoreError::MalformedInput(detail.into())
    }

    pub fn upstream(detail: impl Into<String>) -> Self {
        CoreError::UpstreamFailure(detail.into())
    }
}

impl From<sqlx::Error> for CoreError {
    fn from(e: sqlx::Error) -> Self {
        CoreError::UpstreamFailure(e.to_string())
    }
}

impl From<CoreError> for async_graphql::Error {
    fn from(e: CoreError) -> Self {
        async_graphql::Error::new(e.to_string())
    }
}
