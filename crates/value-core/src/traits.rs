use async_trait::async_trait;
use crate::{DataError, RawMetrics};

/// External data collaborator: one metrics record per ticker, or an error
/// meaning the ticker is unavailable for this scan.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn fetch_metrics(&self, ticker: &str) -> Result<RawMetrics, DataError>;

    fn name(&self) -> &str;
}
