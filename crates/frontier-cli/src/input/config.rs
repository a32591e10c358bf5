use frontier_core::AnalysisConfig;

use super::file;

/// Load the analysis configuration, falling back to defaults when no file is
/// given. A `--risk-free-rate` flag overrides the file value.
pub fn load_config(
    path: Option<&str>,
    risk_free_rate: Option<f64>,
) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let mut config: AnalysisConfig = match path {
        Some(p) => file::read_structured(p)?,
        None => AnalysisConfig::default(),
    };
    if let Some(rf) = risk_free_rate {
        config.risk_free_rate = rf;
    }
    config.validate()?;
    tracing::debug!(
        risk_free_rate = config.risk_free_rate,
        candidates = config.candidates.len(),
        "loaded analysis config"
    );
    Ok(config)
}
