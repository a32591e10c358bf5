pub mod engine;

pub use engine::{recommend, sort_recommendations, Recommendation, DEFAULT_BLEND_WEIGHT};
