pub mod orchestrator;
pub mod summary;
#[cfg(feature = "black_litterman")]
pub mod views;

pub use orchestrator::{
    analyze, compare_portfolios, efficient_frontier, market_statistics, optimize_portfolio,
    recommend_diversifiers, AnalysisRequest, ComparisonRequest, FrontierRequest, MarketStatistics,
    NamedPortfolio, OptimizationRequest, OptimizationResult, PortfolioAllocation,
    PortfolioAnalysis, PortfolioComparison, RecommendationRequest, RecommendationResult,
};
pub use summary::{AnalysisSummary, RiskLevel};
#[cfg(feature = "black_litterman")]
pub use views::{analyze_black_litterman, BlackLittermanAnalysis, BlackLittermanRequest};
