use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use value_core::{ConfidenceTier, MetricsSource, RawMetrics, ResultRecord, ScoreTier, Universe};
use value_scoring::sanitizer::{debt_to_equity_ratio, percentify, round_to, value_or};
use value_scoring::{Evaluation, FactorScorer};

use crate::digest::show;

/// Quotes above this are treated as provider artifacts.
pub const MAX_PLAUSIBLE_PRICE: f64 = 10_000.0;
/// Companies below this market cap are too small to be tracked reliably.
pub const MIN_MARKET_CAP: f64 = 500_000_000.0;

const NAME_MAX_CHARS: usize = 45;
const WHY_LIMIT: usize = 3;
const NO_VALUE: &str = "—";

/// Minimum score and confidence a ticker needs to appear in the output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanFilters {
    pub min_score: f64,
    pub min_confidence: f64,
}

impl Default for ScanFilters {
    fn default() -> Self {
        Self {
            min_score: 35.0,
            min_confidence: 50.0,
        }
    }
}

/// Ranked results of one scan plus what happened to the rest of the universe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanReport {
    pub results: Vec<ResultRecord>,
    pub requested: usize,
    pub unavailable: usize,
    pub filtered_out: usize,
    pub qualified: usize,
    pub timestamp: DateTime<Utc>,
}

impl ScanReport {
    pub fn summary(&self) -> ScanSummary {
        ScanSummary::from_results(&self.results)
    }
}

/// Headline numbers for a result list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub count: usize,
    pub mean_score: Option<f64>,
    pub best_score: Option<f64>,
}

impl ScanSummary {
    pub fn from_results(results: &[ResultRecord]) -> Self {
        let count = results.len();
        if count == 0 {
            return Self {
                count,
                mean_score: None,
                best_score: None,
            };
        }
        let sum: f64 = results.iter().map(|r| r.score).sum();
        let best = results.iter().map(|r| r.score).fold(f64::MIN, f64::max);
        Self {
            count,
            mean_score: Some(round_to(sum / count as f64, 1)),
            best_score: Some(best),
        }
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Opportunités: {} | Score moyen: {}/100 | Meilleur: {}/100",
            self.count,
            show(self.mean_score),
            show(self.best_score)
        )
    }
}

/// A record is scorable only with a sane price and a trackable market cap.
pub fn is_available(m: &RawMetrics) -> bool {
    m.price > 0.0 && m.price <= MAX_PLAUSIBLE_PRICE && m.market_cap >= MIN_MARKET_CAP
}

/// Drives one sequential pass over a universe.
pub struct Scanner {
    source: Arc<dyn MetricsSource>,
    scorer: FactorScorer,
}

impl Scanner {
    pub fn new(source: Arc<dyn MetricsSource>, scorer: FactorScorer) -> Self {
        Self { source, scorer }
    }

    pub fn scorer(&self) -> &FactorScorer {
        &self.scorer
    }

    /// Qualifying records, best score first. Ties keep universe order.
    pub async fn scan(
        &self,
        universe: &Universe,
        min_score: f64,
        min_confidence: f64,
    ) -> Vec<ResultRecord> {
        self.scan_report(
            universe,
            ScanFilters {
                min_score,
                min_confidence,
            },
        )
        .await
        .results
    }

    pub async fn scan_report(&self, universe: &Universe, filters: ScanFilters) -> ScanReport {
        let pairs = universe.pairs();
        let requested = pairs.len();
        let mut unavailable = 0;
        let mut filtered_out = 0;
        let mut results = Vec::new();

        tracing::info!(
            "📊 Scanning {} tickers via {} (min score {}, min confidence {})",
            requested,
            self.source.name(),
            filters.min_score,
            filters.min_confidence
        );

        for (sector, ticker) in pairs {
            let raw = match self.source.fetch_metrics(ticker).await {
                Ok(m) if is_available(&m) => m,
                Ok(m) => {
                    tracing::debug!(
                        "Skipping {}: price {} / market cap {} out of range",
                        ticker,
                        m.price,
                        m.market_cap
                    );
                    unavailable += 1;
                    continue;
                }
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", ticker, e);
                    unavailable += 1;
                    continue;
                }
            };

            let evaluation = self.scorer.evaluate(&raw);
            let score = evaluation.card.breakdown.total;
            let confidence = evaluation.confidence.confidence;

            // NaN on either side fails the gate
            if !(confidence >= filters.min_confidence && score >= filters.min_score) {
                tracing::debug!(
                    "Filtered {}: score {} confidence {}",
                    ticker,
                    score,
                    confidence
                );
                filtered_out += 1;
                continue;
            }

            results.push(build_record(sector, &raw, evaluation));
        }

        // Stable sort keeps universe order on equal scores
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let qualified = results.len();
        tracing::info!(
            "✅ Scan complete: {}/{} qualified ({} unavailable, {} filtered out)",
            qualified,
            requested,
            unavailable,
            filtered_out
        );

        ScanReport {
            results,
            requested,
            unavailable,
            filtered_out,
            qualified,
            timestamp: Utc::now(),
        }
    }
}

fn truncate_name(name: &str) -> String {
    if name.chars().count() > NAME_MAX_CHARS {
        let head: String = name.chars().take(NAME_MAX_CHARS).collect();
        format!("{head}...")
    } else {
        name.to_string()
    }
}

/// Present and non-zero, else `None`.
fn reported(x: Option<f64>) -> Option<f64> {
    let v = value_or(x, 0.0);
    (v != 0.0).then_some(v)
}

fn format_dividend(pct: f64) -> String {
    if pct <= 0.0 {
        NO_VALUE.to_string()
    } else {
        format!("{pct:.2}")
    }
}

fn build_record(sector: &str, raw: &RawMetrics, evaluation: Evaluation) -> ResultRecord {
    let Evaluation {
        metrics,
        card,
        confidence,
    } = evaluation;
    let score = card.breakdown.total;
    let confidence = confidence.confidence;
    let why = card.top_reasons(WHY_LIMIT);
    let tags_display = card
        .tags
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    ResultRecord {
        ticker: raw.ticker.clone(),
        name: truncate_name(raw.display_name()),
        sector: sector.to_string(),
        price: round_to(raw.price, 2),
        currency: raw
            .currency
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| NO_VALUE.to_string()),

        pe: reported(raw.pe).map(|v| round_to(v, 2)),
        pb: reported(raw.pb).map(|v| round_to(v, 2)),
        ev_ebitda: reported(raw.ev_ebitda).map(|v| round_to(v, 2)),
        roe_pct: reported(raw.roe).map(|v| round_to(percentify(v), 1)),
        margin_pct: reported(raw.margin).map(|v| round_to(v * 100.0, 1)),
        debt_to_equity: reported(raw.debt_to_equity).map(|v| round_to(debt_to_equity_ratio(v), 2)),
        dividend_pct: metrics.dividend_pct,
        dividend_display: format_dividend(metrics.dividend_pct),
        revenue_growth_pct: reported(raw.revenue_growth).map(|v| round_to(v * 100.0, 1)),

        score,
        confidence,
        score_tier: ScoreTier::from_score(score),
        confidence_tier: ConfidenceTier::from_confidence(confidence),
        breakdown: card.breakdown,

        tags: card.tags,
        tags_display,
        summary: card.summary,
        why,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use value_core::{DataError, Tag};

    struct MockSource {
        data: HashMap<String, RawMetrics>,
    }

    impl MockSource {
        fn new(records: Vec<RawMetrics>) -> Arc<Self> {
            Arc::new(Self {
                data: records.into_iter().map(|m| (m.ticker.clone(), m)).collect(),
            })
        }
    }

    #[async_trait]
    impl MetricsSource for MockSource {
        async fn fetch_metrics(&self, ticker: &str) -> Result<RawMetrics, DataError> {
            self.data
                .get(ticker)
                .cloned()
                .ok_or_else(|| DataError::Unavailable(ticker.to_string()))
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn strong(ticker: &str) -> RawMetrics {
        RawMetrics {
            name: Some(format!("{ticker} Corp")),
            currency: Some("USD".to_string()),
            price: 50.0,
            market_cap: 2e9,
            pe: Some(10.0),
            pb: Some(1.5),
            roe: Some(0.22),
            margin: Some(0.18),
            debt_to_equity: Some(0.25),
            revenue_growth: Some(0.12),
            dividend_yield: Some(0.03),
            ..RawMetrics::new(ticker)
        }
    }

    fn sparse(ticker: &str) -> RawMetrics {
        RawMetrics {
            currency: Some("USD".to_string()),
            price: 50.0,
            market_cap: 2e9,
            ..RawMetrics::new(ticker)
        }
    }

    fn weak(ticker: &str) -> RawMetrics {
        RawMetrics {
            currency: Some("USD".to_string()),
            price: 80.0,
            market_cap: 5e9,
            pe: Some(60.0),
            pb: Some(8.0),
            ev_ebitda: Some(40.0),
            roe: Some(0.02),
            margin: Some(0.01),
            debt_to_equity: Some(2.0),
            revenue_growth: Some(-0.05),
            ..RawMetrics::new(ticker)
        }
    }

    fn scanner(records: Vec<RawMetrics>) -> Scanner {
        Scanner::new(MockSource::new(records), FactorScorer::default())
    }

    #[tokio::test]
    async fn test_only_ticker_passing_both_gates_is_returned() {
        let s = scanner(vec![strong("GOOD"), sparse("THIN"), weak("POOR")]);
        let universe = Universe::from_pairs([("Mixed", vec!["GOOD", "THIN", "POOR"])]);

        let report = s
            .scan_report(
                &universe,
                ScanFilters {
                    min_score: 40.0,
                    min_confidence: 70.0,
                },
            )
            .await;

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].ticker, "GOOD");
        assert_eq!(report.requested, 3);
        assert_eq!(report.filtered_out, 2);
        assert_eq!(report.unavailable, 0);
        assert_eq!(report.qualified, 1);
    }

    #[tokio::test]
    async fn test_unavailable_tickers_are_skipped() {
        let penny = RawMetrics {
            price: 0.0,
            ..strong("ZERO")
        };
        let pricey = RawMetrics {
            price: 12_000.0,
            ..strong("BIG")
        };
        let tiny = RawMetrics {
            market_cap: 1e8,
            ..strong("TINY")
        };
        let s = scanner(vec![penny, pricey, tiny, strong("OK")]);
        let universe = Universe::from_pairs([("X", vec!["ZERO", "BIG", "TINY", "MISSING", "OK"])]);

        let report = s.scan_report(&universe, ScanFilters::default()).await;
        assert_eq!(report.unavailable, 4);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].ticker, "OK");
    }

    #[tokio::test]
    async fn test_empty_record_with_zero_price_is_excluded() {
        let blank = RawMetrics {
            market_cap: 2e9,
            ..RawMetrics::new("BLANK")
        };
        assert!(!is_available(&blank));

        let s = scanner(vec![blank, strong("OK")]);
        let universe = Universe::from_pairs([("S", vec!["BLANK", "OK"])]);
        let report = s.scan_report(&universe, ScanFilters::default()).await;
        assert_eq!(report.unavailable, 1);
        assert_eq!(report.filtered_out, 0);
        let tickers: Vec<&str> = report.results.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["OK"]);

        // Even with both gates open it never reaches scoring
        let results = s.scan(&Universe::from_pairs([("S", vec!["BLANK"])]), 0.0, 0.0).await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_nan_filters_let_nothing_through() {
        let s = scanner(vec![strong("A"), weak("B")]);
        let universe = Universe::from_pairs([("S", vec!["A", "B"])]);

        assert!(s.scan(&universe, f64::NAN, 0.0).await.is_empty());
        let report = s
            .scan_report(
                &universe,
                ScanFilters {
                    min_score: 0.0,
                    min_confidence: f64::NAN,
                },
            )
            .await;
        assert!(report.results.is_empty());
        assert_eq!(report.filtered_out, 2);
    }

    #[tokio::test]
    async fn test_ties_keep_universe_order() {
        let s = scanner(vec![strong("B"), strong("A"), strong("C")]);
        let universe = Universe::from_pairs([("S1", vec!["B"]), ("S2", vec!["A", "C"])]);

        let results = s.scan(&universe, 0.0, 0.0).await;
        let order: Vec<&str> = results.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(order, vec!["B", "A", "C"]);
    }

    #[tokio::test]
    async fn test_results_sorted_by_score_descending() {
        let mid = RawMetrics {
            pe: Some(20.0),
            dividend_yield: None,
            ..strong("MID")
        };
        let s = scanner(vec![mid, strong("TOP")]);
        let universe = Universe::from_pairs([("S", vec!["MID", "TOP"])]);

        let results = s.scan(&universe, 0.0, 0.0).await;
        assert_eq!(results[0].ticker, "TOP");
        assert!(results[0].score > results[1].score);
    }

    #[tokio::test]
    async fn test_empty_universe_is_empty_result() {
        let s = scanner(vec![strong("A")]);
        let report = s.scan_report(&Universe::new(), ScanFilters::default()).await;
        assert!(report.results.is_empty());
        assert_eq!(report.requested, 0);
        assert_eq!(report.summary().count, 0);
    }

    #[tokio::test]
    async fn test_record_fields() {
        let long_name = "A".repeat(50);
        let m = RawMetrics {
            name: Some(long_name),
            price: 50.456,
            debt_to_equity: Some(25.0),
            ..strong("REC")
        };
        let s = scanner(vec![m]);
        let universe = Universe::from_pairs([("Tech", vec!["REC"])]);
        let r = s.scan(&universe, 0.0, 0.0).await.remove(0);

        assert_eq!(r.name, format!("{}...", "A".repeat(45)));
        assert_eq!(r.sector, "Tech");
        assert_eq!(r.price, 50.46);
        assert_eq!(r.pe, Some(10.0));
        assert_eq!(r.ev_ebitda, None);
        assert_eq!(r.roe_pct, Some(22.0));
        assert_eq!(r.margin_pct, Some(18.0));
        assert_eq!(r.debt_to_equity, Some(0.25));
        assert_eq!(r.revenue_growth_pct, Some(12.0));
        assert_eq!(r.dividend_display, "3.00");
        assert!(r.why.len() <= WHY_LIMIT);
        assert_eq!(r.tags.first(), Some(&Tag::Value));
        assert!(r.tags_display.starts_with("VALUE, ASSET"));
        assert_eq!(r.score_tier, ScoreTier::from_score(r.score));
        // ev_ebitda missing: completeness 87.5
        assert_eq!(r.confidence, 90.0);
    }

    #[tokio::test]
    async fn test_no_dividend_displays_dash() {
        let m = RawMetrics {
            dividend_yield: None,
            ..strong("NODIV")
        };
        let s = scanner(vec![m]);
        let universe = Universe::from_pairs([("S", vec!["NODIV"])]);
        let r = s.scan(&universe, 0.0, 0.0).await.remove(0);
        assert_eq!(r.dividend_pct, 0.0);
        assert_eq!(r.dividend_display, "—");
    }

    #[tokio::test]
    async fn test_scan_is_deterministic() {
        let s = scanner(vec![strong("A"), weak("B")]);
        let universe = Universe::from_pairs([("S", vec!["A", "B"])]);
        let first = s.scan(&universe, 0.0, 0.0).await;
        let second = s.scan(&universe, 0.0, 0.0).await;
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_display() {
        let empty = ScanSummary::from_results(&[]);
        assert_eq!(
            empty.to_string(),
            "Opportunités: 0 | Score moyen: —/100 | Meilleur: —/100"
        );

        let summary = ScanSummary {
            count: 2,
            mean_score: Some(61.5),
            best_score: Some(70.0),
        };
        assert_eq!(
            summary.to_string(),
            "Opportunités: 2 | Score moyen: 61.5/100 | Meilleur: 70.0/100"
        );
    }

    #[test]
    fn test_is_available_bounds() {
        let mut m = strong("X");
        assert!(is_available(&m));
        m.price = MAX_PLAUSIBLE_PRICE;
        assert!(is_available(&m));
        m.price = f64::NAN;
        assert!(!is_available(&m));
        m.price = 10.0;
        m.market_cap = MIN_MARKET_CAP - 1.0;
        assert!(!is_available(&m));
    }
}
