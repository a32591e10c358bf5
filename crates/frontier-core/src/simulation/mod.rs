pub mod random;

pub use random::{random_portfolios, RandomPortfolio};
