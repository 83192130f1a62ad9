//! HTTP client for the temple-management backend REST API
//!
//! All endpoints live under /api/v1. The client is built once with the
//! configured request timeout and reused for connection pooling. Alert
//! transition endpoints map 404 to NotFound and 409 to InvalidTransition so
//! callers see the same taxonomy the local feed uses.

use crate::domain::alert::{AlertStatus, EmergencyAlert};
use crate::domain::types::{AlertId, LocationId, OccupancySample};
use crate::infra::config::Config;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Wire shape of GET /api/v1/live_data
#[derive(Debug, Clone, Deserialize)]
pub struct LiveDataResponse {
    pub current_count: u32,
    pub timestamp: DateTime<Utc>,
    pub location_id: String,
}

impl From<LiveDataResponse> for OccupancySample {
    fn from(wire: LiveDataResponse) -> Self {
        OccupancySample {
            count: wire.current_count,
            observed_at: wire.timestamp,
            location_id: LocationId(wire.location_id),
        }
    }
}

/// Wire shape of one GET /api/v1/crowd_data/history entry
#[derive(Debug, Clone, Deserialize)]
pub struct CrowdHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub person_count: u32,
    #[serde(default)]
    pub location_id: Option<String>,
}

/// Wire shape of GET /api/v1/prediction_data
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionResponse {
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub timestamp: String,
    pub predicted_count: u32,
    /// Model confidence in [0, 1]
    pub confidence: f64,
}

/// Wire shape of POST /api/v1/sos
#[derive(Debug, Clone, Serialize)]
pub struct SosCreateRequest {
    pub location_lat: f64,
    pub location_lon: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Wire shape of an SOS alert as returned by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct SosAlertWire {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub location_lat: f64,
    pub location_lon: f64,
    pub status: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub user_id: Option<i64>,
}

impl SosAlertWire {
    /// Convert to the domain alert. Returns None (with a warning) if the
    /// backend reports a status this client does not know.
    pub fn into_domain(self) -> Option<EmergencyAlert> {
        match self.status.parse::<AlertStatus>() {
            Ok(status) => Some(EmergencyAlert {
                id: AlertId(self.id),
                created_at: self.timestamp,
                lat: self.location_lat,
                lon: self.location_lon,
                status,
                description: self.description,
            }),
            Err(e) => {
                warn!(alert_id = %self.id, error = %e, "sos_alert_unknown_status");
                None
            }
        }
    }
}

/// Errors from the temple backend API
#[derive(Debug)]
pub enum ApiError {
    /// Request did not complete (connect failure, timeout, bad body)
    Transport(reqwest::Error),
    /// The referenced alert does not exist on the backend (404)
    NotFound,
    /// The backend rejected the status transition (409)
    InvalidTransition,
    /// Any other non-success status
    Status(StatusCode),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Transport(e) => write!(f, "transport failure: {}", e),
            ApiError::NotFound => write!(f, "alert not found"),
            ApiError::InvalidTransition => write!(f, "invalid alert transition"),
            ApiError::Status(code) => write!(f, "unexpected status {}", code),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        ApiError::Transport(e)
    }
}

/// Client for the temple-management backend
#[derive(Clone)]
pub struct TempleApi {
    client: reqwest::Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl TempleApi {
    pub fn new(config: &Config) -> Self {
        // Built once for connection pooling; the per-request timeout keeps a
        // stalled poll from outliving the next scheduled tick.
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: config.api_base_url().trim_end_matches('/').to_string(),
            bearer_token: config.api_bearer_token().map(str::to_string),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    fn with_bearer(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    /// Fetch the latest occupancy reading
    pub async fn live_data(&self) -> Result<OccupancySample, ApiError> {
        let response = self.client.get(self.url("/live_data")).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        let wire: LiveDataResponse = response.json().await?;
        Ok(wire.into())
    }

    /// Fetch recent crowd history, newest first (analytics view)
    pub async fn crowd_history(&self, limit: usize) -> Result<Vec<CrowdHistoryEntry>, ApiError> {
        let response = self
            .with_bearer(self.client.get(self.url("/crowd_data/history")))
            .query(&[("limit", limit)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Fetch forecast output (analytics view; the model itself is external)
    pub async fn prediction_data(&self) -> Result<PredictionResponse, ApiError> {
        let response = self.client.get(self.url("/prediction_data")).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        Ok(response.json().await?)
    }

    /// Raise an SOS alert; the backend creates it with status `new`
    pub async fn create_sos(&self, request: &SosCreateRequest) -> Result<EmergencyAlert, ApiError> {
        let response =
            self.with_bearer(self.client.post(self.url("/sos"))).json(request).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        let wire: SosAlertWire = response.json().await?;
        wire.into_domain().ok_or(ApiError::NotFound)
    }

    /// Fetch active SOS alerts, newest first
    pub async fn sos_alerts(&self) -> Result<Vec<EmergencyAlert>, ApiError> {
        let response = self.with_bearer(self.client.get(self.url("/sos_alerts"))).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::Status(response.status()));
        }
        let wires: Vec<SosAlertWire> = response.json().await?;
        Ok(wires.into_iter().filter_map(SosAlertWire::into_domain).collect())
    }

    /// Acknowledge an alert on the backend
    pub async fn acknowledge_alert(&self, id: AlertId) -> Result<EmergencyAlert, ApiError> {
        self.transition(id, "acknowledge").await
    }

    /// Resolve an alert on the backend (must already be acknowledged)
    pub async fn resolve_alert(&self, id: AlertId) -> Result<EmergencyAlert, ApiError> {
        self.transition(id, "resolve").await
    }

    async fn transition(&self, id: AlertId, action: &str) -> Result<EmergencyAlert, ApiError> {
        let path = format!("/sos_alerts/{}/{}", id, action);
        let response = self.with_bearer(self.client.post(self.url(&path))).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Err(ApiError::NotFound),
            StatusCode::CONFLICT => Err(ApiError::InvalidTransition),
            status if !status.is_success() => Err(ApiError::Status(status)),
            _ => {
                let wire: SosAlertWire = response.json().await?;
                wire.into_domain().ok_or(ApiError::NotFound)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_data_into_sample() {
        let wire = LiveDataResponse {
            current_count: 275,
            timestamp: "2025-11-02T06:30:00Z".parse().unwrap(),
            location_id: "main_entrance".to_string(),
        };
        let sample: OccupancySample = wire.into();
        assert_eq!(sample.count, 275);
        assert_eq!(sample.location_id.as_str(), "main_entrance");
    }

    #[test]
    fn test_sos_wire_into_domain() {
        let wire = SosAlertWire {
            id: 7,
            timestamp: Utc::now(),
            location_lat: 20.888,
            location_lon: 70.4013,
            status: "acknowledged".to_string(),
            description: Some("Medical assistance needed".to_string()),
            user_id: Some(3),
        };
        let alert = wire.into_domain().unwrap();
        assert_eq!(alert.id, AlertId(7));
        assert_eq!(alert.status, AlertStatus::Acknowledged);
    }

    #[test]
    fn test_sos_wire_unknown_status_dropped() {
        let wire = SosAlertWire {
            id: 8,
            timestamp: Utc::now(),
            location_lat: 0.0,
            location_lon: 0.0,
            status: "escalated".to_string(),
            description: None,
            user_id: None,
        };
        assert!(wire.into_domain().is_none());
    }

    #[test]
    fn test_sos_request_serializes_without_null_description() {
        let req = SosCreateRequest { location_lat: 1.0, location_lon: 2.0, description: None };
        let json = serde_json::to_string(&req).unwrap();
        assert!(!json.contains("description"));
    }

    #[test]
    fn test_url_building() {
        let api = TempleApi::new(&Config::default());
        assert_eq!(api.url("/live_data"), "http://localhost:8000/api/v1/live_data");
        assert_eq!(api.url("/sos_alerts/4/resolve"), "http://localhost:8000/api/v1/sos_alerts/4/resolve");
    }
}
