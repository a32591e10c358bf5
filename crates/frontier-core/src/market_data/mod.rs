pub mod history;
pub mod source;

pub use history::{DateRange, PriceHistory, ReturnFrequency};
pub use source::{InMemoryPriceSource, PriceSource};
