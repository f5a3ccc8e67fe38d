//! Resolver backed by the ip-api.com JSON API
//!
//! The free endpoint is rate limited by the provider (45 requests per
//! minute at the time of writing). The limit is not enforced here; a
//! throttled request comes back as a failed lookup.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::net::IpAddr;
use std::time::Duration;

use super::{check_coordinates, GeoError, LocationResolver};
use crate::models::Location;

/// Body returned by ip-api for `fields=status,message,country,city,lat,lon`
#[derive(Debug, Deserialize)]
pub struct IpApiResponse {
    pub status: String,
    pub message: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl IpApiResponse {
    pub fn into_location(self) -> Result<Location, GeoError> {
        if self.status != "success" {
            return Err(GeoError::LookupFailed(
                self.message.unwrap_or_else(|| format!("status {}", self.status)),
            ));
        }

        let latitude = self.lat.ok_or(GeoError::NoLocation)?;
        let longitude = self.lon.ok_or(GeoError::NoLocation)?;
        check_coordinates(latitude, longitude)?;

        Ok(Location {
            country: self.country.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            latitude,
            longitude,
        })
    }
}

pub struct IpApiResolver {
    client: Client,
    url_template: String,
}

impl IpApiResolver {
    /// `url_template` must contain `{ip}`
    pub fn new(url_template: &str, timeout: Duration) -> Result<Self, GeoError> {
        if !url_template.contains("{ip}") {
            return Err(GeoError::Malformed(format!(
                "api url has no {{ip}} placeholder: {}",
                url_template
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(IpApiResolver {
            client,
            url_template: url_template.to_string(),
        })
    }

    fn url_for(&self, ip: IpAddr) -> String {
        self.url_template.replace("{ip}", &ip.to_string())
    }
}

#[async_trait]
impl LocationResolver for IpApiResolver {
    async fn resolve(&self, ip: IpAddr) -> Result<Location, GeoError> {
        let response = self.client.get(self.url_for(ip)).send().await.map_err(|e| {
            if e.is_timeout() {
                GeoError::Timeout
            } else {
                GeoError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeoError::Status(status.as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                GeoError::Timeout
            } else {
                GeoError::Http(e)
            }
        })?;
        let parsed: IpApiResponse =
            serde_json::from_str(&body).map_err(|e| GeoError::Malformed(e.to_string()))?;

        parsed.into_location()
    }

    fn name(&self) -> &'static str {
        "ip-api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use std::str::FromStr;

    /// Serve `router` on an ephemeral port and return a URL template for it
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/json/{{ip}}", addr)
    }

    fn ip() -> IpAddr {
        IpAddr::from_str("8.8.8.8").unwrap()
    }

    #[test]
    fn test_response_success() {
        let response: IpApiResponse = serde_json::from_str(
            r#"{"status":"success","country":"Canada","city":"Toronto","lat":43.6532,"lon":-79.3832}"#,
        )
        .unwrap();
        let location = response.into_location().unwrap();
        assert_eq!(location, Location::new("Canada", "Toronto", 43.6532, -79.3832));
    }

    #[test]
    fn test_response_fail_status() {
        let response: IpApiResponse =
            serde_json::from_str(r#"{"status":"fail","message":"private range"}"#).unwrap();
        match response.into_location() {
            Err(GeoError::LookupFailed(message)) => assert_eq!(message, "private range"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_response_missing_coordinates_is_not_defaulted() {
        let response: IpApiResponse =
            serde_json::from_str(r#"{"status":"success","country":"Canada","city":"Toronto"}"#).unwrap();
        assert!(matches!(response.into_location(), Err(GeoError::NoLocation)));
    }

    #[test]
    fn test_missing_country_stays_empty() {
        let response: IpApiResponse =
            serde_json::from_str(r#"{"status":"success","lat":1.5,"lon":2.5}"#).unwrap();
        let location = response.into_location().unwrap();
        assert_eq!(location.country, "");
        assert!(location.known_country().is_none());
    }

    #[test]
    fn test_template_requires_placeholder() {
        assert!(IpApiResolver::new("http://ip-api.com/json/", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_resolve_over_http() {
        let router = Router::new().route(
            "/json/{ip}",
            get(|| async {
                r#"{"status":"success","country":"United States","city":"Mountain View","lat":37.386,"lon":-122.0838}"#
            }),
        );
        let resolver = IpApiResolver::new(&serve(router).await, Duration::from_secs(5)).unwrap();
        let location = resolver.resolve(ip()).await.unwrap();
        assert_eq!(location.country, "United States");
        assert_eq!(location.city, "Mountain View");
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let router = Router::new().route(
            "/json/{ip}",
            get(|| async { (StatusCode::TOO_MANY_REQUESTS, "slow down") }),
        );
        let resolver = IpApiResolver::new(&serve(router).await, Duration::from_secs(5)).unwrap();
        assert!(matches!(resolver.resolve(ip()).await, Err(GeoError::Status(429))));
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let router = Router::new().route("/json/{ip}", get(|| async { "<html>oops</html>" }));
        let resolver = IpApiResolver::new(&serve(router).await, Duration::from_secs(5)).unwrap();
        assert!(matches!(resolver.resolve(ip()).await, Err(GeoError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_timeout() {
        let router = Router::new().route(
            "/json/{ip}",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "{}"
            }),
        );
        let resolver = IpApiResolver::new(&serve(router).await, Duration::from_millis(100)).unwrap();
        assert!(matches!(resolver.resolve(ip()).await, Err(GeoError::Timeout)));
    }
}
