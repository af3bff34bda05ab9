// Risk tiers
// Maps a combined score onto an ordinal tier. Thresholds are fixed.

use crate::models::RiskLevel;

#[derive(Debug, Copy, Clone)]
pub struct RiskThresholds {
    pub extremely_high: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

pub const RISK_THRESHOLDS: RiskThresholds = RiskThresholds {
    extremely_high: 80.0,
    high: 60.0,
    medium: 40.0,
    low: 20.0,
};

pub fn risk_level_for(score: f64) -> RiskLevel {
    let t = RISK_THRESHOLDS;
    if score >= t.extremely_high {
        RiskLevel::ExtremelyHigh
    } else if score >= t.high {
        RiskLevel::High
    } else if score >= t.medium {
        RiskLevel::Medium
    } else if score >= t.low {
        RiskLevel::Low
    } else {
        RiskLevel::Minimal
    }
}

/// Tiers the orchestrator accepts without another attempt
pub fn is_acceptable(risk: RiskLevel) -> bool {
    matches!(risk, RiskLevel::Minimal | RiskLevel::Low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(risk_level_for(0.0), RiskLevel::Minimal);
        assert_eq!(risk_level_for(19.99), RiskLevel::Minimal);
        assert_eq!(risk_level_for(20.0), RiskLevel::Low);
        assert_eq!(risk_level_for(40.0), RiskLevel::Medium);
        assert_eq!(risk_level_for(59.99), RiskLevel::Medium);
        assert_eq!(risk_level_for(60.0), RiskLevel::High);
        assert_eq!(risk_level_for(80.0), RiskLevel::ExtremelyHigh);
        assert_eq!(risk_level_for(100.0), RiskLevel::ExtremelyHigh);
    }

    #[test]
    fn test_acceptable_tiers() {
        assert!(is_acceptable(RiskLevel::Minimal));
        assert!(is_acceptable(RiskLevel::Low));
        assert!(!is_acceptable(RiskLevel::Medium));
        assert!(!is_acceptable(RiskLevel::ExtremelyHigh));
    }
}
