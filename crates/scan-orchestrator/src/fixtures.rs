use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use value_core::{DataError, MetricsSource, RawMetrics};

use crate::OrchestratorError;

/// Offline [`MetricsSource`] backed by a ticker → metrics map.
///
/// The JSON file is an object keyed by ticker; each value is a `RawMetrics`
/// whose `ticker` field may be omitted.
#[derive(Debug, Clone, Default)]
pub struct FixtureSource {
    records: HashMap<String, RawMetrics>,
}

impl FixtureSource {
    pub fn new(records: HashMap<String, RawMetrics>) -> Self {
        Self { records }
    }

    pub fn from_json(json: &str) -> Result<Self, OrchestratorError> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(json)?;
        let mut records = HashMap::with_capacity(raw.len());
        for (ticker, mut value) in raw {
            if let Some(obj) = value.as_object_mut() {
                obj.entry("ticker")
                    .or_insert_with(|| serde_json::Value::String(ticker.clone()));
            }
            records.insert(ticker, serde_json::from_value(value)?);
        }
        Ok(Self { records })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, OrchestratorError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl MetricsSource for FixtureSource {
    async fn fetch_metrics(&self, ticker: &str) -> Result<RawMetrics, DataError> {
        self.records
            .get(ticker)
            .cloned()
            .ok_or_else(|| DataError::Unavailable(ticker.to_string()))
    }

    fn name(&self) -> &str {
        "fixtures"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "KO": {"name": "Coca-Cola", "currency": "USD", "price": 61.2, "market_cap": 2.6e11, "pe": 24.1},
        "XOM": {"ticker": "XOM", "price": 110.0, "market_cap": 4.4e11, "dividend_yield": 0.034}
    }"#;

    #[tokio::test]
    async fn test_fixture_lookup() {
        let source = FixtureSource::from_json(FIXTURE).unwrap();
        assert_eq!(source.len(), 2);

        let ko = source.fetch_metrics("KO").await.unwrap();
        assert_eq!(ko.ticker, "KO");
        assert_eq!(ko.pe, Some(24.1));
        assert_eq!(ko.pb, None);

        let xom = source.fetch_metrics("XOM").await.unwrap();
        assert_eq!(xom.dividend_yield, Some(0.034));
    }

    #[tokio::test]
    async fn test_missing_ticker_is_unavailable() {
        let source = FixtureSource::from_json(FIXTURE).unwrap();
        assert!(matches!(
            source.fetch_metrics("AAPL").await,
            Err(DataError::Unavailable(_))
        ));
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(matches!(
            FixtureSource::from_json("[1, 2]"),
            Err(OrchestratorError::Json(_))
        ));
    }
}
