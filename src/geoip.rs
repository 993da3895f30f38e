//! GeoLocation auxiliary object (C8, §4.8) and the GeoIP lookup external
//! collaborator (§6).

use async_graphql::SimpleObject;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

#[derive(SimpleObject, Debug, Clone)]
pub struct GeoLocation {
    pub city: Option<String>,
    pub continent: Option<String>,
    pub coordinates: Option<Vec<f64>>,
    pub country: Option<String>,
    pub postal_code: Option<String>,
    pub time_zone: Option<String>,
}

/// `lookup(ip) -> {city, continent, coordinates, country, postal_code,
/// time_zone} | null` (§6).
#[async_trait]
pub trait GeoIpLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Option<GeoLocation>;
}

/// Returns `None` unconditionally; wired in by default so the schema
/// builds without a live GeoIP database. A real deployment supplies its
/// own `GeoIpLookup` (e.g. backed by MaxMind's GeoLite2) through context.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullGeoIpLookup;

#[async_trait]
impl GeoIpLookup for NullGeoIpLookup {
    async fn lookup(&self, _ip: &str) -> Option<GeoLocation> {
        None
    }
}

/// A `GeoIpLookup` backed by ip-api.com's free JSON endpoint, for
/// deployments with no local MaxMind database on hand. Modeled on the
/// teacher's other thin JSON API clients (e.g. `services::tvmaze`): a
/// `reqwest::Client`, a fixed base URL, `anyhow::Context` on the fallible
/// steps.
pub struct HttpGeoIpLookup {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGeoIpLookup {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "http://ip-api.com/json".to_string(),
        }
    }
}

impl Default for HttpGeoIpLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: String,
    city: Option<String>,
    continent: Option<String>,
    country: Option<String>,
    #[serde(rename = "zip")]
    postal_code: Option<String>,
    timezone: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

#[async_trait]
impl GeoIpLookup for HttpGeoIpLookup {
    async fn lookup(&self, ip: &str) -> Option<GeoLocation> {
        let url = format!("{}/{}", self.base_url, ip);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(error) => {
                debug!(%ip, %error, "geoip lookup request failed");
                return None;
            }
        };
        let body: IpApiResponse = match response.json().await {
            Ok(body) => body,
            Err(error) => {
                debug!(%ip, %error, "geoip lookup response was not valid JSON");
                return None;
            }
        };
        if body.status != "success" {
            return None;
        }
        Some(GeoLocation {
            city: body.city,
            continent: body.continent,
            coordinates: match (body.lat, body.lon) {
                (Some(lat), Some(lon)) => Some(vec![lat, lon]),
                _ => None,
            },
            country: body.country,
            postal_code: body.postal_code,
            time_zone: body.timezone,
        })
    }
}

/// `GeoLocation.from_ip_address`: private addresses never reach the
/// lookup at all (§4.8).
pub async fn from_ip_address(lookup: &dyn GeoIpLookup, ip_address: &str) -> Option<GeoLocation> {
    let parsed: std::net::IpAddr = ip_address.parse().ok()?;
    if is_private(&parsed) {
        return None;
    }
    lookup.lookup(ip_address).await
}

fn is_private(ip: &std::net::IpAddr) -> bool {
    match ip {
        std::net::IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        std::net::IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_private_ip_never_reaches_lookup() {
        let result = from_ip_address(&NullGeoIpLookup, "10.0.0.1").await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_malformed_ip_yields_none() {
        let result = from_ip_address(&NullGeoIpLookup, "not-an-ip").await;
        assert!(result.is_none());
    }
}
