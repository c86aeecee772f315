//! Normalization of unit-ambiguous provider fields into bounded values.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use value_core::RawMetrics;

/// Sane (low, high) bounds for valuation multiples. Anything outside is
/// treated as a provider artifact.
pub const PE_BOUNDS: (f64, f64) = (1.0, 120.0);
pub const PB_BOUNDS: (f64, f64) = (0.1, 50.0);
pub const EV_EBITDA_BOUNDS: (f64, f64) = (1.5, 80.0);

/// Yields above this percentage are glitches, not dividends.
const MAX_PLAUSIBLE_YIELD_PCT: f64 = 20.0;

/// Debt/equity above this is assumed to be quoted in percent.
const DEBT_TO_EQUITY_PERCENT_CUTOFF: f64 = 10.0;

/// Parse a numeric string, accepting either `.` or `,` as decimal separator.
pub fn parse_numeric(s: &str) -> Option<f64> {
    s.trim()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Lenient number extraction from a JSON value. Numbers and numeric strings
/// parse; everything else (null, bool, NaN, garbage) yields `default`.
pub fn to_float(value: Option<&Value>, default: f64) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(default),
        Some(Value::String(s)) => parse_numeric(s).unwrap_or(default),
        _ => default,
    }
}

/// Unwrap an optional field, mapping absent or non-finite values to `default`.
pub fn value_or(x: Option<f64>, default: f64) -> f64 {
    x.filter(|v| v.is_finite()).unwrap_or(default)
}

/// Fraction-or-percent heuristic: magnitudes up to 1.0 are fractions.
pub fn percentify(x: f64) -> f64 {
    if x <= 1.0 {
        x * 100.0
    } else {
        x
    }
}

/// Dividend yield as a percentage rounded to 2 decimals. Returns 0.0 for
/// "no dividend", including glitched yields above 20%.
pub fn normalize_dividend_yield(raw: Option<f64>) -> f64 {
    let dy = value_or(raw, 0.0);
    if dy <= 0.0 {
        return 0.0;
    }
    let pct = if dy > 1.0 { dy } else { dy * 100.0 };
    if pct > MAX_PLAUSIBLE_YIELD_PCT {
        return 0.0;
    }
    round_to(pct, 2)
}

/// Keep a multiple only if positive and within `[low, high]`; 0.0 otherwise.
pub fn bounded_multiple(raw: Option<f64>, low: f64, high: f64) -> f64 {
    let x = value_or(raw, 0.0);
    if x <= 0.0 || x < low || x > high {
        return 0.0;
    }
    x
}

pub fn debt_to_equity_ratio(raw: f64) -> f64 {
    if raw > DEBT_TO_EQUITY_PERCENT_CUTOFF {
        raw / 100.0
    } else {
        raw
    }
}

pub fn round_to(x: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (x * factor).round() / factor
}

pub fn clamp_score(x: f64) -> f64 {
    x.clamp(0.0, 100.0)
}

/// Scoring-ready view of a [`RawMetrics`] record. Zero means "unavailable".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SanitizedMetrics {
    pub pe: f64,
    pub pb: f64,
    pub ev_ebitda: f64,
    pub roe_pct: f64,
    /// Fraction
    pub margin: f64,
    pub debt_to_equity: f64,
    pub revenue: f64,
    pub operating_cash_flow: f64,
    /// Fraction
    pub revenue_growth: f64,
    pub dividend_pct: f64,
}

impl SanitizedMetrics {
    pub fn from_raw(m: &RawMetrics) -> Self {
        Self {
            pe: bounded_multiple(m.pe, PE_BOUNDS.0, PE_BOUNDS.1),
            pb: bounded_multiple(m.pb, PB_BOUNDS.0, PB_BOUNDS.1),
            ev_ebitda: bounded_multiple(m.ev_ebitda, EV_EBITDA_BOUNDS.0, EV_EBITDA_BOUNDS.1),
            roe_pct: percentify(value_or(m.roe, 0.0)),
            margin: value_or(m.margin, 0.0),
            debt_to_equity: debt_to_equity_ratio(value_or(m.debt_to_equity, 0.0)),
            revenue: value_or(m.revenue, 0.0),
            operating_cash_flow: value_or(m.operating_cash_flow, 0.0),
            revenue_growth: value_or(m.revenue_growth, 0.0),
            dividend_pct: normalize_dividend_yield(m.dividend_yield),
        }
    }

    pub fn margin_pct(&self) -> f64 {
        self.margin * 100.0
    }

    pub fn revenue_growth_pct(&self) -> f64 {
        self.revenue_growth * 100.0
    }
}
