//! Uber rideshare adapter.
//!
//! Talks to the Uber Riders API (`/v1`). Credentials and base endpoint are
//! instance-scoped, so a sandbox and a production adapter can coexist in one
//! process.

use crate::constants::providers::UBER;
use crate::error::ProviderError;
use crate::providers::RideProvider;
use crate::state::{
    Driver, Estimate, EstimateEntry, EstimateKind, LatLong, PriceEstimate, Product, ProductList,
    ProviderId, ProviderTripHandle, RideRequest, RideStatus, TripDetails, TripId, Vehicle,
};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sandbox endpoint.
pub const UBER_SANDBOX_URL: &str = "https://sandbox-api.uber.com/v1";

/// Uber adapter configuration.
#[derive(Clone)]
pub struct UberConfig {
    /// API base URL, without trailing slash.
    ///
    /// Default: [`UBER_SANDBOX_URL`]
    pub base_url: String,

    /// OAuth bearer token.
    pub access_token: String,
}

impl UberConfig {
    /// Sandbox configuration with the given token.
    #[must_use]
    pub fn new(access_token: String) -> Self {
        Self {
            base_url: UBER_SANDBOX_URL.to_string(),
            access_token,
        }
    }

    /// Point the adapter at another endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

impl fmt::Debug for UberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UberConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Uber implementation of [`RideProvider`].
#[derive(Clone, Debug)]
pub struct UberRideProvider {
    id: ProviderId,
    config: UberConfig,
    http_client: Client,
}

impl UberRideProvider {
    /// Create an adapter.
    #[must_use]
    pub fn new(config: UberConfig) -> Self {
        Self::with_client(config, Client::new())
    }

    /// Create an adapter sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(config: UberConfig, http_client: Client) -> Self {
        Self {
            id: ProviderId::new(UBER),
            config,
            http_client,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// `/requests/{trip_id}` with the id percent-encoded as one path segment.
    fn trip_url(&self, trip_id: &TripId) -> Result<Url, ProviderError> {
        if matches!(trip_id.as_str(), "" | "." | "..") {
            return Err(ProviderError::RequestFailed(format!("Invalid trip id: {trip_id}")));
        }
        let mut url = Url::parse(&self.url("/requests"))
            .map_err(|e| ProviderError::RequestFailed(format!("Invalid Uber base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ProviderError::RequestFailed("Uber base URL cannot carry a path".into()))?
            .push(trip_id.as_str());
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => Err(ProviderError::RateLimited),
            StatusCode::UNAUTHORIZED => Err(ProviderError::Unauthorized),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::Api {
                    status: status.as_u16(),
                    message: error_message(body),
                })
            }
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ProviderError> {
        self.send(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ProviderError::ResponseParseFailed(e.to_string()))
    }

    async fn fetch_trip(&self, trip_id: &TripId) -> Result<UberTrip, ProviderError> {
        let url = self.trip_url(trip_id)?;
        self.send_json(self.http_client.get(url)).await
    }
}

#[async_trait]
impl RideProvider for UberRideProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    async fn request_trip(
        &self,
        request: &RideRequest,
    ) -> Result<ProviderTripHandle, ProviderError> {
        let body = UberTripRequest {
            start_latitude: decimal(&request.start.latitude)?,
            start_longitude: decimal(&request.start.longitude)?,
            end_latitude: decimal(&request.end.latitude)?,
            end_longitude: decimal(&request.end.longitude)?,
            product_id: &request.product_id,
            fare_id: request.fare_id.as_deref(),
        };

        let trip: UberTrip = self
            .send_json(self.http_client.post(self.url("/requests")).json(&body))
            .await?;

        tracing::info!(
            provider = %self.id,
            trip_id = %trip.request_id,
            uber_status = %trip.status,
            "Uber accepted trip request"
        );

        Ok(ProviderTripHandle {
            trip_id: TripId::new(trip.request_id),
            status: map_status(&trip.status),
        })
    }

    async fn cancel_trip(&self, trip_id: &TripId) -> Result<(), ProviderError> {
        let url = self.trip_url(trip_id)?;
        self.send(self.http_client.delete(url)).await?;
        Ok(())
    }

    async fn get_trip_status(&self, trip_id: &TripId) -> Result<RideStatus, ProviderError> {
        let trip = self.fetch_trip(trip_id).await?;
        Ok(map_status(&trip.status))
    }

    async fn get_trip_details(&self, trip_id: &TripId) -> Result<TripDetails, ProviderError> {
        let trip = self.fetch_trip(trip_id).await?;
        Ok(TripDetails {
            trip_id: TripId::new(trip.request_id),
            status: map_status(&trip.status),
            driver: trip.driver.map(|d| Driver {
                name: d.name,
                phone_number: d.phone_number,
                rating: d.rating,
            }),
            vehicle: trip.vehicle.map(|v| Vehicle {
                make: v.make,
                model: v.model,
                license_plate: v.license_plate,
            }),
            pickup_eta_minutes: trip.eta,
        })
    }

    async fn get_time_estimate(&self, start: &LatLong) -> Result<Estimate, ProviderError> {
        let request = self.http_client.get(self.url("/estimates/time")).query(&[
            ("start_latitude", start.latitude.as_str()),
            ("start_longitude", start.longitude.as_str()),
        ]);
        let response: UberTimeEstimates = self.send_json(request).await?;

        Ok(Estimate {
            kind: EstimateKind::Time,
            entries: response
                .times
                .into_iter()
                .map(|t| EstimateEntry {
                    product_id: t.product_id,
                    display_name: t.display_name,
                    duration_seconds: Some(t.estimate),
                    price: None,
                })
                .collect(),
        })
    }

    async fn get_price_estimate(
        &self,
        start: &LatLong,
        end: &LatLong,
    ) -> Result<Estimate, ProviderError> {
        let request = self.http_client.get(self.url("/estimates/price")).query(&[
            ("start_latitude", start.latitude.as_str()),
            ("start_longitude", start.longitude.as_str()),
            ("end_latitude", end.latitude.as_str()),
            ("end_longitude", end.longitude.as_str()),
        ]);
        let response: UberPriceEstimates = self.send_json(request).await?;

        Ok(Estimate {
            kind: EstimateKind::Price,
            entries: response
                .prices
                .into_iter()
                .map(|p| EstimateEntry {
                    product_id: p.product_id,
                    display_name: p.display_name,
                    duration_seconds: p.duration,
                    price: Some(PriceEstimate {
                        estimate: p.estimate,
                        low_estimate: p.low_estimate,
                        high_estimate: p.high_estimate,
                        currency_code: p.currency_code,
                    }),
                })
                .collect(),
        })
    }

    async fn list_products(&self, start: &LatLong) -> Result<ProductList, ProviderError> {
        let request = self.http_client.get(self.url("/products")).query(&[
            ("latitude", start.latitude.as_str()),
            ("longitude", start.longitude.as_str()),
        ]);
        let response: UberProducts = self.send_json(request).await?;

        Ok(ProductList {
            products: response
                .products
                .into_iter()
                .map(|p| Product {
                    product_id: p.product_id,
                    display_name: p.display_name,
                    description: p.description,
                    capacity: p.capacity,
                })
                .collect(),
        })
    }
}

/// Map an Uber request status onto [`RideStatus`]. Unknown values are errors.
#[must_use]
pub fn map_status(status: &str) -> RideStatus {
    match status {
        "processing" => RideStatus::Pending,
        "accepted" | "arriving" => RideStatus::PickingUp,
        "in_progress" => RideStatus::InTransit,
        "driver_canceled" | "rider_canceled" => RideStatus::Canceled,
        "completed" => RideStatus::Completed,
        _ => RideStatus::Error,
    }
}

fn decimal(raw: &str) -> Result<f64, ProviderError> {
    raw.trim().parse().map_err(|_| ProviderError::Api {
        status: 400,
        message: format!("invalid coordinate: {raw}"),
    })
}

/// Prefer the `message` field of an Uber error body, falling back to the raw text.
fn error_message(body: String) -> String {
    serde_json::from_str::<UberErrorBody>(&body)
        .ok()
        .and_then(|parsed| parsed.message)
        .unwrap_or(body)
}

// ═══════════════════════════════════════════════════════════════════════
// Wire types
// ═══════════════════════════════════════════════════════════════════════

#[derive(Serialize)]
struct UberTripRequest<'a> {
    start_latitude: f64,
    start_longitude: f64,
    end_latitude: f64,
    end_longitude: f64,
    product_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    fare_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct UberTrip {
    request_id: String,
    status: String,
    #[serde(default)]
    eta: Option<u32>,
    #[serde(default)]
    driver: Option<UberDriver>,
    #[serde(default)]
    vehicle: Option<UberVehicle>,
}

#[derive(Deserialize)]
struct UberDriver {
    name: String,
    #[serde(default)]
    phone_number: Option<String>,
    #[serde(default)]
    rating: Option<f64>,
}

#[derive(Deserialize)]
struct UberVehicle {
    make: String,
    model: String,
    license_plate: String,
}

#[derive(Deserialize)]
struct UberTimeEstimates {
    times: Vec<UberTimeEstimate>,
}

#[derive(Deserialize)]
struct UberTimeEstimate {
    product_id: String,
    display_name: String,
    estimate: u32,
}

#[derive(Deserialize)]
struct UberPriceEstimates {
    prices: Vec<UberPriceEstimate>,
}

#[derive(Deserialize)]
struct UberPriceEstimate {
    product_id: String,
    display_name: String,
    estimate: String,
    #[serde(default)]
    low_estimate: Option<f64>,
    #[serde(default)]
    high_estimate: Option<f64>,
    #[serde(default)]
    currency_code: Option<String>,
    #[serde(default)]
    duration: Option<u32>,
}

#[derive(Deserialize)]
struct UberProducts {
    products: Vec<UberProduct>,
}

#[derive(Deserialize)]
struct UberProduct {
    product_id: String,
    display_name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    capacity: u32,
}

#[derive(Deserialize)]
struct UberErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::state::RidePriority;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn adapter(server: &MockServer) -> UberRideProvider {
        UberRideProvider::new(UberConfig::new("test-token".to_string()).with_base_url(server.uri()))
    }

    fn ride_request() -> RideRequest {
        RideRequest {
            priority: RidePriority::Emergency,
            provider: ProviderId::new(UBER),
            start: LatLong { latitude: "1.0".into(), longitude: "1.5".into() },
            end: LatLong { latitude: "2.0".into(), longitude: "2.5".into() },
            product_id: "abc".into(),
            fare_id: Some("fare-1".into()),
            upfront_fare_enabled: true,
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(map_status("processing"), RideStatus::Pending);
        assert_eq!(map_status("arriving"), RideStatus::PickingUp);
        assert_eq!(map_status("in_progress"), RideStatus::InTransit);
        assert_eq!(map_status("rider_canceled"), RideStatus::Canceled);
        assert_eq!(map_status("completed"), RideStatus::Completed);
        assert_eq!(map_status("no_drivers_available"), RideStatus::Error);
        assert_eq!(map_status("something_new"), RideStatus::Error);
    }

    #[test]
    fn test_debug_redacts_token() {
        let debug = format!("{:?}", UberConfig::new("secret".to_string()));
        assert!(!debug.contains("secret"));
    }

    #[tokio::test]
    async fn test_request_trip_sends_coordinates_and_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/requests"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(json!({
                "start_latitude": 1.0,
                "end_longitude": 2.5,
                "product_id": "abc",
                "fare_id": "fare-1"
            })))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "request_id": "T123",
                "status": "processing"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let handle = adapter(&server).request_trip(&ride_request()).await.unwrap();

        assert_eq!(handle.trip_id, TripId::new("T123"));
        assert_eq!(handle.status, RideStatus::Pending);
    }

    #[tokio::test]
    async fn test_error_status_carries_provider_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/requests/T404"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Request not found",
                "code": "not_found"
            })))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .get_trip_status(&TripId::new("T404"))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ProviderError::Api { status: 404, message: "Request not found".to_string() }
        );
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limit_and_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/requests/T1"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/requests/T1"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let uber = adapter(&server);
        let trip = TripId::new("T1");
        assert_eq!(uber.get_trip_status(&trip).await, Err(ProviderError::RateLimited));
        assert_eq!(uber.cancel_trip(&trip).await, Err(ProviderError::Unauthorized));
    }

    #[tokio::test]
    async fn test_cancel_accepts_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/requests/T123"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        assert!(adapter(&server).cancel_trip(&TripId::new("T123")).await.is_ok());
    }

    #[tokio::test]
    async fn test_trip_id_stays_inside_requests_path() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/products"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/requests/..%2Fproducts"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not found" })))
            .expect(1)
            .mount(&server)
            .await;

        let uber = adapter(&server);
        let result = uber.cancel_trip(&TripId::new("../products")).await;
        assert!(matches!(result, Err(ProviderError::Api { status: 404, .. })));

        let dot = uber.cancel_trip(&TripId::new("..")).await;
        assert!(matches!(dot, Err(ProviderError::RequestFailed(_))));
    }

    #[tokio::test]
    async fn test_trip_details_mapping() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/requests/T123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "request_id": "T123",
                "status": "accepted",
                "eta": 4,
                "driver": { "name": "Bob", "phone_number": "+15555550100", "rating": 4.9 },
                "vehicle": { "make": "Toyota", "model": "Prius", "license_plate": "UBER-PLATE" }
            })))
            .mount(&server)
            .await;

        let details = adapter(&server)
            .get_trip_details(&TripId::new("T123"))
            .await
            .unwrap();

        assert_eq!(details.status, RideStatus::PickingUp);
        assert_eq!(details.pickup_eta_minutes, Some(4));
        assert_eq!(details.driver.unwrap().name, "Bob");
        assert_eq!(details.vehicle.unwrap().model, "Prius");
    }

    #[tokio::test]
    async fn test_estimates_and_products_use_query_coordinates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/estimates/time"))
            .and(query_param("start_latitude", "1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "times": [{ "product_id": "abc", "display_name": "UberX", "estimate": 180 }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/estimates/price"))
            .and(query_param("end_longitude", "2.5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "prices": [{
                    "product_id": "abc",
                    "display_name": "UberX",
                    "estimate": "$15-20",
                    "low_estimate": 15.0,
                    "high_estimate": 20.0,
                    "currency_code": "USD"
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .and(query_param("latitude", "1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "products": [{
                    "product_id": "abc",
                    "display_name": "UberX",
                    "description": "Affordable rides",
                    "capacity": 4
                }]
            })))
            .mount(&server)
            .await;

        let uber = adapter(&server);
        let request = ride_request();

        let time = uber.get_time_estimate(&request.start).await.unwrap();
        assert_eq!(time.kind, EstimateKind::Time);
        assert_eq!(time.entries[0].duration_seconds, Some(180));

        let price = uber.get_price_estimate(&request.start, &request.end).await.unwrap();
        assert_eq!(price.entries[0].price.as_ref().unwrap().estimate, "$15-20");

        let products = uber.list_products(&request.start).await.unwrap();
        assert_eq!(products.products[0].capacity, 4);
    }

    #[tokio::test]
    async fn test_malformed_body_is_parse_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/requests/T1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = adapter(&server)
            .get_trip_status(&TripId::new("T1"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ResponseParseFailed(_)));
    }
}
