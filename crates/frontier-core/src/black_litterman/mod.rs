pub mod model;

pub use model::{
    black_litterman, BlackLittermanParams, BlackLittermanPosterior, View, ViewType,
    DEFAULT_VIEW_CONFIDENCE,
};
