pub mod portfolio;
pub mod returns;

pub use portfolio::{portfolio_stats, PortfolioStats};
pub use returns::{compute_statistics, ReturnStatistics};
