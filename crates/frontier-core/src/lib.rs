pub mod config;
pub mod error;
pub mod types;

pub mod analysis;
pub mod frontier;
pub mod market_data;
pub mod optimizer;
pub mod recommend;
pub mod simulation;
pub mod statistics;

#[cfg(feature = "black_litterman")]
pub mod black_litterman;

pub use config::{default_candidates, AnalysisConfig, Candidate, MinExposure};
pub use error::FrontierError;
pub use types::*;

/// Standard result type for all frontier computations
pub type FrontierResult<T> = Result<T, FrontierError>;
