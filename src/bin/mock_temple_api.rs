//! Mock Temple Backend
//!
//! Simulates the temple-management REST API for local testing.
//!
//! Endpoints (all under /api/v1):
//! - GET  /live_data                     - latest occupancy sample
//! - GET  /crowd_data/history?limit=N    - recent samples, newest first
//! - GET  /prediction_data               - naive hourly forecast
//! - POST /sos                           - create an SOS alert
//! - GET  /sos_alerts                    - all alerts
//! - POST /sos_alerts/{id}/acknowledge   - new -> acknowledged (409 otherwise)
//! - POST /sos_alerts/{id}/resolve       - acknowledged -> resolved (409 otherwise)
//!
//! A background task feeds the sample history with time-of-day crowd levels,
//! so the dashboard shows a realistic daily cycle.
//!
//! Usage:
//!   cargo run --bin mock-temple-api -- --port 8000 --interval-secs 5

use bytes::Bytes;
use chrono::{DateTime, Timelike, Utc};
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

const MAX_HISTORY: usize = 500;

#[derive(Parser, Debug)]
#[command(name = "mock-temple-api")]
#[command(about = "Mock temple-management backend for local simulation")]
struct Args {
    /// TCP port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Seconds between simulated crowd samples
    #[arg(long, default_value = "5")]
    interval_secs: u64,
}

#[derive(Debug, Clone, Serialize)]
struct SampleWire {
    current_count: u32,
    timestamp: DateTime<Utc>,
    location_id: String,
}

#[derive(Debug, Clone, Serialize)]
struct HistoryWire {
    timestamp: DateTime<Utc>,
    person_count: u32,
    location_id: String,
}

#[derive(Debug, Serialize)]
struct PredictionWire {
    timestamp: String,
    predicted_count: u32,
    confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
struct AlertWire {
    id: i64,
    timestamp: DateTime<Utc>,
    location_lat: f64,
    location_lon: f64,
    status: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SosBody {
    location_lat: f64,
    location_lon: f64,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Default)]
struct MockState {
    history: VecDeque<SampleWire>,
    alerts: Vec<AlertWire>,
    next_alert_id: i64,
}

impl MockState {
    fn latest(&self) -> Option<&SampleWire> {
        self.history.front()
    }

    fn push_sample(&mut self, sample: SampleWire) {
        self.history.push_front(sample);
        self.history.truncate(MAX_HISTORY);
    }

    fn alert_mut(&mut self, id: i64) -> Option<&mut AlertWire> {
        self.alerts.iter_mut().find(|a| a.id == id)
    }
}

type SharedState = Arc<Mutex<MockState>>;

/// Crowd level by time of day, matching typical temple footfall
fn simulate_count() -> u32 {
    let mut rng = rand::thread_rng();
    let hour = Utc::now().hour();

    let base: i64 = match hour {
        6..=10 => rng.gen_range(80..=200),   // morning rush
        11..=14 => rng.gen_range(120..=280), // midday
        15..=18 => rng.gen_range(100..=250), // afternoon
        19..=22 => rng.gen_range(60..=180),  // evening
        _ => rng.gen_range(10..=50),         // night
    };

    let variation: i64 = rng.gen_range(-30..=30);
    (base + variation).max(0) as u32
}

async fn run_simulator(state: SharedState, interval_secs: u64) {
    let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_secs));

    // Samples are attributed to the same facility points the dashboard
    // draws, so the "Live Data" marker cycles through all of them.
    let locations: Vec<String> = temple_watch::infra::Config::default_facilities()
        .into_iter()
        .map(|f| f.id.as_str().to_string())
        .collect();

    loop {
        ticker.tick().await;

        let location = {
            let mut rng = rand::thread_rng();
            locations[rng.gen_range(0..locations.len())].clone()
        };
        let sample = SampleWire {
            current_count: simulate_count(),
            timestamp: Utc::now(),
            location_id: location,
        };

        info!(count = %sample.current_count, location = %sample.location_id, "sample_generated");
        state.lock().await.push_sample(sample);
    }
}

fn json_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body)))
        .expect("static response should not fail")
}

fn error_response(status: StatusCode, detail: &str) -> Response<Full<Bytes>> {
    json_response(status, format!(r#"{{"detail":"{}"}}"#, detail))
}

fn parse_limit(query: Option<&str>) -> usize {
    query
        .and_then(|q| {
            q.split('&')
                .find_map(|pair| pair.strip_prefix("limit="))
                .and_then(|v| v.parse().ok())
        })
        .unwrap_or(50)
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    state: SharedState,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    match (&method, path.as_str()) {
        (&Method::GET, "/api/v1/live_data") => {
            let state = state.lock().await;
            match state.latest() {
                Some(sample) => Ok(json_response(
                    StatusCode::OK,
                    serde_json::to_string(sample).unwrap_or_default(),
                )),
                None => Ok(error_response(StatusCode::NOT_FOUND, "no crowd data yet")),
            }
        }
        (&Method::GET, "/api/v1/crowd_data/history") => {
            let limit = parse_limit(query.as_deref());
            let state = state.lock().await;
            let entries: Vec<HistoryWire> = state
                .history
                .iter()
                .take(limit)
                .map(|s| HistoryWire {
                    timestamp: s.timestamp,
                    person_count: s.current_count,
                    location_id: s.location_id.clone(),
                })
                .collect();
            Ok(json_response(
                StatusCode::OK,
                serde_json::to_string(&entries).unwrap_or_default(),
            ))
        }
        (&Method::GET, "/api/v1/prediction_data") => {
            let current = state.lock().await.latest().map(|s| s.current_count).unwrap_or(100);
            let mut rng = rand::thread_rng();
            let predictions: Vec<PredictionWire> = (1..=6)
                .map(|h| {
                    let drift: i64 = rng.gen_range(-40..=40);
                    PredictionWire {
                        timestamp: (Utc::now() + chrono::Duration::hours(h)).to_rfc3339(),
                        predicted_count: (current as i64 + drift).max(0) as u32,
                        confidence: rng.gen_range(0.6..0.95),
                    }
                })
                .collect();
            let body = serde_json::json!({ "predictions": predictions });
            Ok(json_response(StatusCode::OK, body.to_string()))
        }
        (&Method::POST, "/api/v1/sos") => {
            let bytes = match req.into_body().collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(_) => return Ok(error_response(StatusCode::BAD_REQUEST, "unreadable body")),
            };
            let body: SosBody = match serde_json::from_slice(&bytes) {
                Ok(body) => body,
                Err(_) => return Ok(error_response(StatusCode::UNPROCESSABLE_ENTITY, "invalid SOS payload")),
            };

            let mut state = state.lock().await;
            state.next_alert_id += 1;
            let alert = AlertWire {
                id: state.next_alert_id,
                timestamp: Utc::now(),
                location_lat: body.location_lat,
                location_lon: body.location_lon,
                status: "new".to_string(),
                description: body.description,
            };
            state.alerts.push(alert.clone());
            info!(alert_id = %alert.id, "sos_created");
            Ok(json_response(StatusCode::OK, serde_json::to_string(&alert).unwrap_or_default()))
        }
        (&Method::GET, "/api/v1/sos_alerts") => {
            let state = state.lock().await;
            Ok(json_response(
                StatusCode::OK,
                serde_json::to_string(&state.alerts).unwrap_or_default(),
            ))
        }
        (&Method::POST, _) if path.starts_with("/api/v1/sos_alerts/") => {
            handle_transition(&path, state).await
        }
        (&Method::GET, "/health") => Ok(json_response(StatusCode::OK, r#"{"ok":true}"#.to_string())),
        _ => Ok(error_response(StatusCode::NOT_FOUND, "unknown endpoint")),
    }
}

/// POST /api/v1/sos_alerts/{id}/acknowledge|resolve
///
/// Transitions are forward-only and idempotent: repeating the current status
/// returns 200 without change, anything else out of order returns 409.
async fn handle_transition(
    path: &str,
    state: SharedState,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let rest = &path["/api/v1/sos_alerts/".len()..];
    let (id, action) = match rest.split_once('/') {
        Some((id_str, action)) => match id_str.parse::<i64>() {
            Ok(id) => (id, action),
            Err(_) => return Ok(error_response(StatusCode::NOT_FOUND, "invalid alert id")),
        },
        None => return Ok(error_response(StatusCode::NOT_FOUND, "missing action")),
    };

    let target = match action {
        "acknowledge" => "acknowledged",
        "resolve" => "resolved",
        _ => return Ok(error_response(StatusCode::NOT_FOUND, "unknown action")),
    };

    let mut state = state.lock().await;
    let Some(alert) = state.alert_mut(id) else {
        return Ok(error_response(StatusCode::NOT_FOUND, "SOS alert not found"));
    };

    let legal = matches!(
        (alert.status.as_str(), target),
        ("new", "acknowledged") | ("acknowledged", "resolved")
    );

    if alert.status == target {
        // Idempotent repeat
        return Ok(json_response(StatusCode::OK, serde_json::to_string(alert).unwrap_or_default()));
    }
    if !legal {
        return Ok(error_response(
            StatusCode::CONFLICT,
            &format!("cannot move alert from {} to {}", alert.status, target),
        ));
    }

    alert.status = target.to_string();
    info!(alert_id = %id, status = %target, "alert_transitioned");
    Ok(json_response(StatusCode::OK, serde_json::to_string(alert).unwrap_or_default()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    let state: SharedState = Arc::new(Mutex::new(MockState::default()));

    let sim_state = state.clone();
    tokio::spawn(async move {
        run_simulator(sim_state, args.interval_secs).await;
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr).await?;
    info!(port = %args.port, "mock_temple_api_started");

    loop {
        match listener.accept().await {
            Ok((stream, _addr)) => {
                let io = TokioIo::new(stream);
                let state = state.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req| {
                        let state = state.clone();
                        async move { handle_request(req, state).await }
                    });

                    if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                        error!(error = %e, "mock_http_error");
                    }
                });
            }
            Err(e) => {
                error!(error = %e, "mock_accept_error");
            }
        }
    }
}
