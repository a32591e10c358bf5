use serde::{Deserialize, Serialize};

use crate::statistics::PortfolioStats;
use crate::types::WeightVector;

/// Annual volatility above which a portfolio is High risk.
pub const HIGH_RISK_VOLATILITY: f64 = 0.25;
/// Annual volatility above which a portfolio is Medium risk.
pub const MEDIUM_RISK_VOLATILITY: f64 = 0.15;

/// Volatility bucket of a portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_volatility(volatility: f64) -> Self {
        if volatility > HIGH_RISK_VOLATILITY {
            RiskLevel::High
        } else if volatility > MEDIUM_RISK_VOLATILITY {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        };
        f.write_str(s)
    }
}

/// Flat, display-ready view of the current portfolio against the optimum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub risk_level: RiskLevel,
    /// Optimal Sharpe minus current Sharpe.
    pub distance_from_optimal: f64,
    /// Euclidean distance between current and optimal weights.
    pub weight_distance: f64,
    pub expected_annual_return: String,
    pub annual_volatility: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_annual_return: Option<String>,
    pub time_period: String,
}

pub fn summarize(
    current: &PortfolioStats,
    optimal: &PortfolioStats,
    current_weights: &WeightVector,
    optimal_weights: &WeightVector,
    time_period: u32,
) -> AnalysisSummary {
    AnalysisSummary {
        risk_level: RiskLevel::from_volatility(current.volatility),
        distance_from_optimal: optimal.sharpe_ratio - current.sharpe_ratio,
        weight_distance: weight_distance(current_weights, optimal_weights),
        expected_annual_return: format_percent(current.expected_return),
        annual_volatility: format_percent(current.volatility),
        real_annual_return: current.real_return.map(format_percent),
        time_period: format_years(time_period),
    }
}

pub fn weight_distance(a: &WeightVector, b: &WeightVector) -> f64 {
    a.as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// 0.1234 -> "12.34%"
pub fn format_percent(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

pub fn format_years(years: u32) -> String {
    if years == 1 {
        "1 year".to_string()
    } else {
        format!("{} years", years)
    }
}
