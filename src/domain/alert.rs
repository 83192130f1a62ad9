//! Emergency (SOS) alert model and status lifecycle
//!
//! Alerts are created by pilgrims via the SOS endpoint and move strictly
//! forward: new -> acknowledged -> resolved. They are never deleted on the
//! client side; resolved alerts simply drop out of the active set.

use crate::domain::types::AlertId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of an SOS alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    New,
    Acknowledged,
    Resolved,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::New => "new",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
        }
    }

    /// Alert marker color for this status
    pub fn color(&self) -> &'static str {
        match self {
            AlertStatus::New => "red",
            AlertStatus::Acknowledged => "orange",
            AlertStatus::Resolved => "green",
        }
    }
}

impl std::str::FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(AlertStatus::New),
            "acknowledged" => Ok(AlertStatus::Acknowledged),
            "resolved" => Ok(AlertStatus::Resolved),
            other => Err(format!("unknown alert status: {}", other)),
        }
    }
}

/// A pilgrim-initiated emergency alert carrying geolocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub id: AlertId,
    pub created_at: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
    pub status: AlertStatus,
    pub description: Option<String>,
}

impl EmergencyAlert {
    pub fn new(id: AlertId, lat: f64, lon: f64, description: Option<String>) -> Self {
        Self { id, created_at: Utc::now(), lat, lon, status: AlertStatus::New, description }
    }

    pub fn is_active(&self) -> bool {
        self.status != AlertStatus::Resolved
    }
}

/// Rejected alert status transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    /// No alert with the given id exists
    NotFound(AlertId),
    /// The requested transition would skip or reverse the lifecycle
    InvalidTransition { id: AlertId, from: AlertStatus, to: AlertStatus },
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionError::NotFound(id) => write!(f, "SOS alert {} not found", id),
            TransitionError::InvalidTransition { id, from, to } => write!(
                f,
                "SOS alert {}: cannot move from {} to {}",
                id,
                from.as_str(),
                to.as_str()
            ),
        }
    }
}

impl std::error::Error for TransitionError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_str() {
        assert_eq!("new".parse::<AlertStatus>().unwrap(), AlertStatus::New);
        assert_eq!("acknowledged".parse::<AlertStatus>().unwrap(), AlertStatus::Acknowledged);
        assert_eq!("resolved".parse::<AlertStatus>().unwrap(), AlertStatus::Resolved);
        assert!("escalated".parse::<AlertStatus>().is_err());
    }

    #[test]
    fn test_status_ordering_is_forward() {
        assert!(AlertStatus::New < AlertStatus::Acknowledged);
        assert!(AlertStatus::Acknowledged < AlertStatus::Resolved);
    }

    #[test]
    fn test_status_colors() {
        assert_eq!(AlertStatus::New.color(), "red");
        assert_eq!(AlertStatus::Acknowledged.color(), "orange");
        assert_eq!(AlertStatus::Resolved.color(), "green");
    }

    #[test]
    fn test_new_alert_is_active() {
        let alert = EmergencyAlert::new(AlertId(1), 20.888, 70.4013, None);
        assert_eq!(alert.status, AlertStatus::New);
        assert!(alert.is_active());
    }
}
