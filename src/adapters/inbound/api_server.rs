//! Region API Server
//!
//! HTTP API exposing region resolution at `/v1/country`. Parses and
//! validates the request, derives the client IP and maps the resolution to
//! the JSON wire format.

use crate::application::RegionService;
use crate::domain::entities::{CellId, MacAddr, Observation, Radio, ResolutionResult};
use crate::domain::services::CountryNames;
use crate::domain::value_objects::{CountryCode, Fallback};
use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// How long browsers may cache the CORS answer. Sent on every response,
/// not only on preflights.
const CORS_MAX_AGE: Duration = Duration::from_secs(30 * 86_400);

const MAX_CELL_ID: u64 = 268_435_455;

/// Reads a field of the wrong type or out of range as absent, so one bad
/// entry never rejects the whole request.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Keeps the list entries that decode, skipping the rest.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let values: Option<Vec<serde_json::Value>> = lenient(deserializer)?;
    Ok(values
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| serde_json::from_value(value).ok())
        .collect())
}

/// A Bluetooth beacon or Wi-Fi access point entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StationEntry {
    #[serde(default, deserialize_with = "lenient")]
    pub mac_address: Option<String>,
}

/// A cell tower entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellTowerEntry {
    #[serde(default, deserialize_with = "lenient")]
    pub radio_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub mobile_country_code: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub mobile_network_code: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub location_area_code: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub cell_id: Option<u64>,
}

/// Region request body. Every list is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryRequest {
    /// Request-wide radio type, used when a tower omits its own
    #[serde(default, deserialize_with = "lenient")]
    pub radio_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub bluetooth_beacons: Vec<StationEntry>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub wifi_access_points: Vec<StationEntry>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub cell_towers: Vec<CellTowerEntry>,
}

impl CountryRequest {
    /// Validated observations. Invalid entries are dropped.
    pub fn observations(&self) -> Vec<Observation> {
        let bluetooth = self
            .bluetooth_beacons
            .iter()
            .filter_map(station_mac)
            .map(Observation::bluetooth);
        let wifi = self
            .wifi_access_points
            .iter()
            .filter_map(station_mac)
            .map(Observation::wifi);
        let cells = self
            .cell_towers
            .iter()
            .filter_map(|tower| self.cell_id(tower))
            .map(Observation::cell);

        bluetooth.chain(wifi).chain(cells).collect()
    }

    pub fn entry_count(&self) -> usize {
        self.bluetooth_beacons.len() + self.wifi_access_points.len() + self.cell_towers.len()
    }

    fn cell_id(&self, tower: &CellTowerEntry) -> Option<CellId> {
        let radio = match tower.radio_type.as_deref().or(self.radio_type.as_deref()) {
            Some(name) => Radio::parse(name)?,
            None => Radio::Gsm,
        };
        let mcc = tower.mobile_country_code.filter(|m| (1..=999).contains(m))?;
        let mnc = tower.mobile_network_code.filter(|m| *m <= 999)?;
        let lac = tower.location_area_code.filter(|l| (1..=65_535).contains(l))?;
        let cid = tower.cell_id.filter(|c| (1..=MAX_CELL_ID).contains(c))?;

        Some(CellId::new(radio, mcc as u16, mnc as u16, lac, cid))
    }
}

fn station_mac(entry: &StationEntry) -> Option<MacAddr> {
    entry
        .mac_address
        .as_deref()
        .and_then(MacAddr::parse)
        .filter(MacAddr::is_valid_station)
}

/// Successful region response.
#[derive(Debug, Serialize)]
pub struct CountryResponse {
    pub country_code: CountryCode,
    pub country_name: String,
    #[serde(skip_serializing_if = "Fallback::is_none")]
    pub fallback: Fallback,
}

/// Health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub mcc_entries: usize,
    pub geoip: bool,
}

/// API Server state.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<RegionService>,
    pub names: Arc<CountryNames>,
    /// Take the client IP from `X-Forwarded-For` when present
    pub trust_forwarded: bool,
}

impl ApiState {
    pub fn new(
        service: Arc<RegionService>,
        names: Arc<CountryNames>,
        trust_forwarded: bool,
    ) -> Self {
        Self {
            service,
            names,
            trust_forwarded,
        }
    }

    /// Client IP: first valid `X-Forwarded-For` hop if trusted, else the peer.
    pub fn client_ip(&self, headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<IpAddr> {
        let forwarded = if self.trust_forwarded {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|v| v.trim().parse().ok())
        } else {
            None
        };

        forwarded.or_else(|| peer.map(|addr| addr.ip()))
    }
}

/// Region API server.
pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
}

impl ApiServer {
    pub fn new(listen_addr: String, state: ApiState) -> Self {
        Self { listen_addr, state }
    }

    /// Build the router with all routes and layers.
    pub fn router(state: ApiState) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .max_age(CORS_MAX_AGE);
        let max_age = SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_MAX_AGE,
            HeaderValue::from(CORS_MAX_AGE.as_secs()),
        );

        Router::new()
            .route("/health", get(health_handler))
            .route(
                "/v1/country",
                get(country_get_handler).post(country_post_handler),
            )
            .layer(cors)
            .layer(max_age)
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Run the API server until shutdown is signalled.
    #[cfg_attr(coverage_nightly, coverage(off))]
    pub async fn run<F>(&self, shutdown: F) -> anyhow::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = Self::router(self.state.clone());

        let listener = TcpListener::bind(&self.listen_addr).await?;
        tracing::info!("region API listening on {}", self.listen_addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        tracing::info!("region API stopped");
        Ok(())
    }
}

// Handler functions

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        mcc_entries: state.service.region_table().len(),
        geoip: state.service.has_geo_resolver(),
    };
    Json(response)
}

async fn country_get_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
) -> Response {
    let client_ip = state.client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    let result = state.service.resolve(&[], client_ip).await;
    region_response(&state.names, result)
}

async fn country_post_handler(
    State(state): State<ApiState>,
    headers: HeaderMap,
    peer: Option<ConnectInfo<SocketAddr>>,
    body: Bytes,
) -> Response {
    let request: CountryRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CountryRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                tracing::debug!("rejecting malformed region request: {}", e);
                return parse_error_response();
            }
        }
    };

    let observations = request.observations();
    let dropped = request.entry_count() - observations.len();
    if dropped > 0 {
        tracing::debug!("dropped {} invalid request entries", dropped);
    }

    let client_ip = state.client_ip(&headers, peer.map(|ConnectInfo(addr)| addr));
    let result = state.service.resolve(&observations, client_ip).await;
    region_response(&state.names, result)
}

fn region_response(names: &CountryNames, result: ResolutionResult) -> Response {
    match result.region {
        Some(country_code) => (
            StatusCode::OK,
            Json(CountryResponse {
                country_name: names.display_name(&country_code).to_string(),
                country_code,
                fallback: result.fallback,
            }),
        )
            .into_response(),
        None => error_response(StatusCode::NOT_FOUND, "notFound", "Not found"),
    }
}

fn parse_error_response() -> Response {
    error_response(StatusCode::BAD_REQUEST, "parseError", "Parse Error")
}

fn error_response(status: StatusCode, reason: &str, message: &str) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": {
                "errors": [{
                    "domain": "geolocation",
                    "reason": reason,
                    "message": message,
                }],
                "code": status.as_u16(),
                "message": message,
            }
        })),
    )
        .into_response()
}
