//! Crowd threshold classifier
//!
//! The single source of truth for the occupancy ladder. Summary cards, map
//! colors, prescriptive text and the TUI gauge all classify through here;
//! a second copy of these thresholds anywhere else is a correctness bug.
//!
//! The ladder (inclusive upper bounds):
//! - ≤50   VeryPeaceful / Normal   / score 100 / "5-10 minutes"
//! - ≤150  Peaceful     / Moderate / score 75  / "15-20 minutes"
//! - ≤300  Moderate     / High     / score 50  / "30-45 minutes"
//! - ≤500  Busy         / Critical / score 25  / "1-2 hours"
//! - >500  VeryBusy     / Extreme  / score 10  / "2+ hours"

use serde::Serialize;

// Band upper bounds, inclusive
const LOW_THRESHOLD: u32 = 50;
const MEDIUM_THRESHOLD: u32 = 150;
const HIGH_THRESHOLD: u32 = 300;
const CRITICAL_THRESHOLD: u32 = 500;

/// Qualitative crowd-comfort level shown to pilgrims
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComfortLevel {
    VeryPeaceful,
    Peaceful,
    Moderate,
    Busy,
    VeryBusy,
}

impl ComfortLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComfortLevel::VeryPeaceful => "Very Peaceful",
            ComfortLevel::Peaceful => "Peaceful",
            ComfortLevel::Moderate => "Moderate",
            ComfortLevel::Busy => "Busy",
            ComfortLevel::VeryBusy => "Very Busy",
        }
    }
}

/// Operational alert severity for staff-facing consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Normal,
    Moderate,
    High,
    Critical,
    Extreme,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Normal => "normal",
            Severity::Moderate => "moderate",
            Severity::High => "high",
            Severity::Critical => "critical",
            Severity::Extreme => "extreme",
        }
    }

    /// Intensity marker color for this severity band.
    ///
    /// Normal is green, Moderate orange, High and Critical red, Extreme
    /// purple - the same palette the staff heatmap has always used.
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Normal => "#4CAF50",
            Severity::Moderate => "#FF9800",
            Severity::High | Severity::Critical => "#F44336",
            Severity::Extreme => "#9C27B0",
        }
    }
}

/// Derived classification of one occupancy count.
///
/// Pure value, recomputed on every render; never cached between polls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Classification {
    pub comfort: ComfortLevel,
    /// Peace-of-mind score, 100 (empty) down to 10 (overcrowded)
    pub score: u8,
    pub severity: Severity,
    pub wait_estimate: &'static str,
}

/// Classify an occupancy count against the fixed threshold ladder.
///
/// Deterministic and total over all of `u32`; negative counts are
/// unrepresentable by construction.
pub fn classify(count: u32) -> Classification {
    if count <= LOW_THRESHOLD {
        Classification {
            comfort: ComfortLevel::VeryPeaceful,
            score: 100,
            severity: Severity::Normal,
            wait_estimate: "5-10 minutes",
        }
    } else if count <= MEDIUM_THRESHOLD {
        Classification {
            comfort: ComfortLevel::Peaceful,
            score: 75,
            severity: Severity::Moderate,
            wait_estimate: "15-20 minutes",
        }
    } else if count <= HIGH_THRESHOLD {
        Classification {
            comfort: ComfortLevel::Moderate,
            score: 50,
            severity: Severity::High,
            wait_estimate: "30-45 minutes",
        }
    } else if count <= CRITICAL_THRESHOLD {
        Classification {
            comfort: ComfortLevel::Busy,
            score: 25,
            severity: Severity::Critical,
            wait_estimate: "1-2 hours",
        }
    } else {
        Classification {
            comfort: ComfortLevel::VeryBusy,
            score: 10,
            severity: Severity::Extreme,
            wait_estimate: "2+ hours",
        }
    }
}

/// Staff-facing prescriptive alert for one occupancy band
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prescription {
    pub severity: Severity,
    pub message: &'static str,
    pub suggestion: &'static str,
}

/// Prescriptive alert text for the staff dashboard.
///
/// Same band boundaries as [`classify`]; only the wording differs.
pub fn prescriptive(count: u32) -> Prescription {
    match classify(count).severity {
        Severity::Normal => Prescription {
            severity: Severity::Normal,
            message: "All systems operating smoothly",
            suggestion: "Maintain current security deployment",
        },
        Severity::Moderate => Prescription {
            severity: Severity::Moderate,
            message: "Moderate crowd detected",
            suggestion: "Deploy 1 additional security unit to main entrance",
        },
        Severity::High => Prescription {
            severity: Severity::High,
            message: "High crowd density detected",
            suggestion: "Deploy 2 additional security units to East Corridor",
        },
        Severity::Critical => Prescription {
            severity: Severity::Critical,
            message: "CRITICAL crowd levels detected",
            suggestion: "Deploy 3 additional security units to all corridors",
        },
        Severity::Extreme => Prescription {
            severity: Severity::Extreme,
            message: "EXTREME crowd levels - Emergency protocols activated",
            suggestion: "Deploy ALL available security units immediately",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries_inclusive() {
        assert_eq!(classify(0).score, 100);
        assert_eq!(classify(50).score, 100);
        assert_eq!(classify(51).score, 75);
        assert_eq!(classify(150).score, 75);
        assert_eq!(classify(151).score, 50);
        assert_eq!(classify(300).score, 50);
        assert_eq!(classify(301).score, 25);
        assert_eq!(classify(500).score, 25);
        assert_eq!(classify(501).score, 10);
        assert_eq!(classify(u32::MAX).score, 10);
    }

    #[test]
    fn test_score_non_increasing() {
        let mut last = 100;
        for count in 0..=600 {
            let score = classify(count).score;
            assert!(score <= last, "score regressed upward at count {}", count);
            last = score;
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(classify(275), classify(275));
    }

    #[test]
    fn test_moderate_band_full_classification() {
        let c = classify(275);
        assert_eq!(c.comfort, ComfortLevel::Moderate);
        assert_eq!(c.severity, Severity::High);
        assert_eq!(c.wait_estimate, "30-45 minutes");
        assert_eq!(c.severity.color(), "#F44336");
    }

    #[test]
    fn test_severity_colors() {
        assert_eq!(Severity::Normal.color(), "#4CAF50");
        assert_eq!(Severity::Moderate.color(), "#FF9800");
        assert_eq!(Severity::High.color(), "#F44336");
        assert_eq!(Severity::Critical.color(), "#F44336");
        assert_eq!(Severity::Extreme.color(), "#9C27B0");
    }

    #[test]
    fn test_prescriptive_follows_bands() {
        assert_eq!(prescriptive(40).severity, Severity::Normal);
        assert_eq!(prescriptive(275).severity, Severity::High);
        assert_eq!(
            prescriptive(275).suggestion,
            "Deploy 2 additional security units to East Corridor"
        );
        assert_eq!(prescriptive(501).severity, Severity::Extreme);
    }
}
