use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::error::FrontierError;
use crate::FrontierResult;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// Ticker -> weight mapping, ordered by ticker for stable output.
pub type Allocation = BTreeMap<String, f64>;

/// Tolerance for "weights sum to one".
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// Ordered, duplicate-free list of tickers. The order defines the index of
/// every weight vector, return vector and covariance row built over it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct AssetUniverse(Vec<String>);

impl AssetUniverse {
    pub fn new(tickers: Vec<String>) -> FrontierResult<Self> {
        if tickers.is_empty() {
            return Err(FrontierError::validation(
                "tickers",
                "At least one ticker required",
            ));
        }
        let mut seen = HashSet::with_capacity(tickers.len());
        for t in &tickers {
            if t.trim().is_empty() {
                return Err(FrontierError::validation("tickers", "Empty ticker symbol"));
            }
            if !seen.insert(t.as_str()) {
                return Err(FrontierError::validation(
                    "tickers",
                    format!("Duplicate ticker '{}'", t),
                ));
            }
        }
        Ok(AssetUniverse(tickers))
    }

    pub fn from_strs(tickers: &[&str]) -> FrontierResult<Self> {
        Self::new(tickers.iter().map(|t| t.to_string()).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tickers(&self) -> &[String] {
        &self.0
    }

    pub fn index_of(&self, ticker: &str) -> Option<usize> {
        self.0.iter().position(|t| t == ticker)
    }

    pub fn contains(&self, ticker: &str) -> bool {
        self.index_of(ticker).is_some()
    }

    /// This universe followed by every ticker of `other` not already present.
    pub fn union(&self, other: &AssetUniverse) -> AssetUniverse {
        let mut tickers = self.0.clone();
        for t in &other.0 {
            if !tickers.contains(t) {
                tickers.push(t.clone());
            }
        }
        AssetUniverse(tickers)
    }
}

impl TryFrom<Vec<String>> for AssetUniverse {
    type Error = FrontierError;

    fn try_from(tickers: Vec<String>) -> Result<Self, Self::Error> {
        AssetUniverse::new(tickers)
    }
}

impl From<AssetUniverse> for Vec<String> {
    fn from(u: AssetUniverse) -> Self {
        u.0
    }
}

/// Non-negative weights summing to one, index-aligned with an [`AssetUniverse`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    /// Validate caller-supplied weights.
    pub fn new(weights: Vec<f64>) -> FrontierResult<Self> {
        Self::with_tolerance(weights, WEIGHT_TOLERANCE)
    }

    pub fn with_tolerance(weights: Vec<f64>, tolerance: f64) -> FrontierResult<Self> {
        if weights.is_empty() {
            return Err(FrontierError::validation("weights", "No weights supplied"));
        }
        for (i, w) in weights.iter().enumerate() {
            if !w.is_finite() {
                return Err(FrontierError::validation(
                    "weights",
                    format!("Weight {} is not finite", i),
                ));
            }
            if *w < -tolerance {
                return Err(FrontierError::validation(
                    "weights",
                    format!("Weight {} is negative ({})", i, w),
                ));
            }
        }
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > tolerance {
            return Err(FrontierError::validation(
                "weights",
                format!("Weights sum to {:.8}, expected 1", total),
            ));
        }
        Ok(WeightVector(weights))
    }

    /// Wrap solver output that has already been projected onto the feasible set.
    pub(crate) fn from_raw(weights: Vec<f64>) -> Self {
        WeightVector(weights)
    }

    pub fn equal(n: usize) -> Self {
        WeightVector(vec![1.0 / n as f64; n])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Ticker -> weight mapping over `universe`.
    pub fn to_allocation(&self, universe: &AssetUniverse) -> FrontierResult<Allocation> {
        ensure_aligned(self.len(), universe)?;
        Ok(universe
            .tickers()
            .iter()
            .cloned()
            .zip(self.0.iter().copied())
            .collect())
    }

    /// Rebuild an index-aligned vector from a mapping. Every ticker of the
    /// universe must be present and no others.
    pub fn from_allocation(
        universe: &AssetUniverse,
        allocation: &Allocation,
    ) -> FrontierResult<Self> {
        if allocation.len() != universe.len() {
            return Err(FrontierError::validation(
                "allocation",
                format!(
                    "Expected {} tickers but got {}",
                    universe.len(),
                    allocation.len()
                ),
            ));
        }
        let weights = universe
            .tickers()
            .iter()
            .map(|t| {
                allocation.get(t).copied().ok_or_else(|| {
                    FrontierError::validation("allocation", format!("Missing ticker '{}'", t))
                })
            })
            .collect::<FrontierResult<Vec<f64>>>()?;
        Self::new(weights)
    }

    /// Re-express over a superset universe, zero-filling tickers not held.
    pub fn expand_to(&self, from: &AssetUniverse, to: &AssetUniverse) -> FrontierResult<Self> {
        ensure_aligned(self.len(), from)?;
        let mut expanded = vec![0.0; to.len()];
        for (ticker, w) in from.tickers().iter().zip(self.0.iter()) {
            let idx = to.index_of(ticker).ok_or_else(|| {
                FrontierError::validation(
                    "universe",
                    format!("Ticker '{}' missing from target universe", ticker),
                )
            })?;
            expanded[idx] = *w;
        }
        Ok(WeightVector(expanded))
    }
}

pub(crate) fn ensure_aligned(len: usize, universe: &AssetUniverse) -> FrontierResult<()> {
    if len != universe.len() {
        return Err(FrontierError::validation(
            "weights",
            format!(
                "Number of weights ({}) must match number of tickers ({})",
                len,
                universe.len()
            ),
        ));
    }
    Ok(())
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "f64".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_universe_rejects_duplicates() {
        let err = AssetUniverse::from_strs(&["AAPL", "MSFT", "AAPL"]).unwrap_err();
        assert!(err.to_string().contains("Duplicate"));
    }

    #[test]
    fn test_universe_rejects_empty() {
        assert!(AssetUniverse::new(vec![]).is_err());
    }

    #[test]
    fn test_union_preserves_order() {
        let a = AssetUniverse::from_strs(&["AAPL", "MSFT"]).unwrap();
        let b = AssetUniverse::from_strs(&["MSFT", "XLV"]).unwrap();
        assert_eq!(a.union(&b).tickers(), &["AAPL", "MSFT", "XLV"]);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        assert!(WeightVector::new(vec![0.5, 0.4]).is_err());
        assert!(WeightVector::new(vec![0.5, 0.5]).is_ok());
        assert!(WeightVector::new(vec![0.5, 0.5 + 5e-7]).is_ok());
    }

    #[test]
    fn test_weights_reject_negative_and_nan() {
        assert!(WeightVector::new(vec![1.2, -0.2]).is_err());
        assert!(WeightVector::new(vec![f64::NAN, 1.0]).is_err());
    }

    #[test]
    fn test_allocation_round_trip() {
        let universe = AssetUniverse::from_strs(&["MSFT", "AAPL", "GLD"]).unwrap();
        let w = WeightVector::new(vec![0.2, 0.5, 0.3]).unwrap();
        let alloc = w.to_allocation(&universe).unwrap();

        // Mapping is ordered by ticker, vector stays universe-aligned
        let keys: Vec<&String> = alloc.keys().collect();
        assert_eq!(keys, vec!["AAPL", "GLD", "MSFT"]);
        assert_eq!(alloc["MSFT"], 0.2);

        let back = WeightVector::from_allocation(&universe, &alloc).unwrap();
        assert_eq!(back, w);
        assert_eq!(back.to_allocation(&universe).unwrap(), alloc);
    }

    #[test]
    fn test_from_allocation_missing_ticker() {
        let universe = AssetUniverse::from_strs(&["AAPL", "MSFT"]).unwrap();
        let mut alloc = Allocation::new();
        alloc.insert("AAPL".into(), 0.5);
        alloc.insert("GOOG".into(), 0.5);
        assert!(WeightVector::from_allocation(&universe, &alloc).is_err());
    }

    #[test]
    fn test_expand_to_zero_fills() {
        let from = AssetUniverse::from_strs(&["AAPL", "MSFT"]).unwrap();
        let to = AssetUniverse::from_strs(&["AAPL", "MSFT", "XLV"]).unwrap();
        let w = WeightVector::new(vec![0.6, 0.4]).unwrap();
        let expanded = w.expand_to(&from, &to).unwrap();
        assert_eq!(expanded.as_slice(), &[0.6, 0.4, 0.0]);
    }
}
