use chrono::NaiveDate;
use frontier_core::market_data::InMemoryPriceSource;

use super::file;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Load a wide price table into an in-memory price source.
///
/// The first column holds ISO dates and every further column the closing
/// prices of the ticker named in its header. Blank cells mark a missing
/// observation for that ticker only.
pub fn load_prices(path: &str) -> Result<InMemoryPriceSource, Box<dyn std::error::Error>> {
    let canonical = file::resolve_path(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(format!(
            "'{}' needs a date column followed by at least one ticker column",
            canonical.display()
        )
        .into());
    }
    let tickers: Vec<String> = headers.iter().skip(1).map(|h| h.to_uppercase()).collect();
    let mut columns: Vec<Vec<(NaiveDate, f64)>> = vec![Vec::new(); tickers.len()];

    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT)
            .map_err(|e| format!("Row {}: bad date '{}': {}", line + 2, raw_date, e))?;
        for (col, cell) in record.iter().skip(1).enumerate().take(tickers.len()) {
            if cell.is_empty() {
                continue;
            }
            let price: f64 = cell.parse().map_err(|_| {
                format!(
                    "Row {}: price '{}' for {} is not a number",
                    line + 2,
                    cell,
                    tickers[col]
                )
            })?;
            columns[col].push((date, price));
        }
    }

    let mut source = InMemoryPriceSource::new();
    for (ticker, observations) in tickers.iter().zip(columns) {
        tracing::debug!(%ticker, observations = observations.len(), "loaded price column");
        source.insert(ticker, observations);
    }
    Ok(source)
}
