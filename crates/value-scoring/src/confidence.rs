//! Data-quality confidence, independent of how favorable the metrics are.
//!
//! Blend of completeness (40%), plausibility (40%) and a freshness proxy (20%),
//! minus a flat haircut for the provider being a free aggregator, clamped to
//! [35, 92].

use serde::{Deserialize, Serialize};
use value_core::RawMetrics;

use crate::sanitizer::{
    debt_to_equity_ratio, normalize_dividend_yield, percentify, round_to, value_or,
};

pub const CONFIDENCE_FLOOR: f64 = 35.0;
pub const CONFIDENCE_CAP: f64 = 92.0;
const AGGREGATOR_HAIRCUT: f64 = 5.0;

const COMPLETENESS_WEIGHT: f64 = 0.40;
const PLAUSIBILITY_WEIGHT: f64 = 0.40;
const FRESHNESS_WEIGHT: f64 = 0.20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub completeness: f64,
    pub plausibility: f64,
    pub freshness: f64,
    /// Final value, one decimal, always within [35, 92]
    pub confidence: f64,
}

fn optional_fields(m: &RawMetrics) -> [Option<f64>; 8] {
    [
        m.pe,
        m.pb,
        m.ev_ebitda,
        m.roe,
        m.margin,
        m.debt_to_equity,
        m.revenue_growth,
        m.dividend_yield,
    ]
}

/// Share of the eight optional fields that are present and non-zero (0-100).
pub fn completeness(m: &RawMetrics) -> f64 {
    let fields = optional_fields(m);
    let present = fields
        .iter()
        .filter(|f| value_or(**f, 0.0) != 0.0)
        .count();
    present as f64 / fields.len() as f64 * 100.0
}

/// 100 minus a fixed penalty per field outside its empirical range (0-100).
/// Zero-valued fields are not checked; they already cost completeness.
pub fn plausibility(m: &RawMetrics) -> f64 {
    let pe = value_or(m.pe, 0.0);
    let pb = value_or(m.pb, 0.0);
    let ev = value_or(m.ev_ebitda, 0.0);
    let roe_pct = percentify(value_or(m.roe, 0.0));
    let margin_pct = value_or(m.margin, 0.0) * 100.0;
    let dte = debt_to_equity_ratio(value_or(m.debt_to_equity, 0.0));
    let dy_pct = normalize_dividend_yield(m.dividend_yield);
    let growth_pct = value_or(m.revenue_growth, 0.0) * 100.0;

    let outside = |v: f64, lo: f64, hi: f64| v != 0.0 && (v < lo || v > hi);

    let checks = [
        (outside(pe, 1.0, 120.0), 12.0),
        (outside(pb, 0.1, 50.0), 8.0),
        (outside(ev, 1.5, 80.0), 10.0),
        (outside(roe_pct, -50.0, 80.0), 10.0),
        (outside(margin_pct, -30.0, 60.0), 10.0),
        (dte != 0.0 && dte > 5.0, 10.0),
        (dy_pct != 0.0 && dy_pct > 12.0, 12.0),
        (outside(growth_pct, -50.0, 80.0), 8.0),
    ];

    let penalties: f64 = checks
        .iter()
        .filter(|(failed, _)| *failed)
        .map(|(_, penalty)| penalty)
        .sum();

    (100.0 - penalties).clamp(0.0, 100.0)
}

/// Recency proxy from price, market cap and currency presence (0-100).
pub fn freshness(m: &RawMetrics) -> f64 {
    let mut score: f64 = 100.0;
    if !(m.price > 0.0) {
        score -= 35.0;
    }
    if !(m.market_cap > 0.0) {
        score -= 25.0;
    }
    if m.currency.as_deref().map_or(true, |c| c.trim().is_empty()) {
        score -= 10.0;
    }
    score.clamp(0.0, 100.0)
}

pub fn estimate_confidence(m: &RawMetrics) -> ConfidenceReport {
    let completeness = completeness(m);
    let plausibility = plausibility(m);
    let freshness = freshness(m);

    let blended = COMPLETENESS_WEIGHT * completeness
        + PLAUSIBILITY_WEIGHT * plausibility
        + FRESHNESS_WEIGHT * freshness
        - AGGREGATOR_HAIRCUT;

    ConfidenceReport {
        completeness,
        plausibility,
        freshness,
        confidence: round_to(blended.clamp(CONFIDENCE_FLOOR, CONFIDENCE_CAP), 1),
    }
}
