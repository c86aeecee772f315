use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Per-ticker financial fields as reported by the data source.
///
/// `None` means the provider did not report the field. `Some(0.0)` is kept
/// distinct: it was reported, but carries no usable information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    pub ticker: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub market_cap: f64,
    #[serde(default)]
    pub pe: Option<f64>,
    #[serde(default)]
    pub pb: Option<f64>,
    #[serde(default)]
    pub ev_ebitda: Option<f64>,
    /// Return on equity, fraction or percent depending on the provider
    #[serde(default)]
    pub roe: Option<f64>,
    /// Net profit margin, always a fraction (0.18 = 18%)
    #[serde(default)]
    pub margin: Option<f64>,
    /// Ratio or percent; values above 10 are read as percent
    #[serde(default)]
    pub debt_to_equity: Option<f64>,
    #[serde(default)]
    pub revenue: Option<f64>,
    #[serde(default)]
    pub operating_cash_flow: Option<f64>,
    /// Year-over-year revenue growth as a fraction
    #[serde(default)]
    pub revenue_growth: Option<f64>,
    #[serde(default)]
    pub dividend_yield: Option<f64>,
}

impl RawMetrics {
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            ..Default::default()
        }
    }

    /// Display name, falling back to the ticker symbol.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(&self.ticker)
    }
}

/// Cutoffs gating factor credit and normalizing sub-scores.
///
/// Only the three multiple caps and `margin_min` feed the scorer. The other
/// floors are carried with the configuration only; the ROE, leverage, growth
/// and dividend ladders use fixed cutoffs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub pe_max: f64,
    pub pb_max: f64,
    pub ev_ebitda_max: f64,
    /// Fraction (0.08 = 8%)
    pub roe_min: f64,
    /// Fraction (0.05 = 5%)
    pub margin_min: f64,
    /// Ratio (0.8 = 80%)
    pub debt_to_equity_max: f64,
    /// Fraction (0.03 = 3%)
    pub rev_growth_min: f64,
    /// Fraction (0.01 = 1%)
    pub dividend_min: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            pe_max: 25.0,
            pb_max: 3.5,
            ev_ebitda_max: 18.0,
            roe_min: 0.08,
            margin_min: 0.05,
            debt_to_equity_max: 0.8,
            rev_growth_min: 0.03,
            dividend_min: 0.01,
        }
    }
}

impl Thresholds {
    /// Every field must be finite. The three multiple caps divide sub-score
    /// terms, so they must also be positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("pe_max", self.pe_max),
            ("pb_max", self.pb_max),
            ("ev_ebitda_max", self.ev_ebitda_max),
            ("roe_min", self.roe_min),
            ("margin_min", self.margin_min),
            ("debt_to_equity_max", self.debt_to_equity_max),
            ("rev_growth_min", self.rev_growth_min),
            ("dividend_min", self.dividend_min),
        ];
        if let Some(&(name, _)) = named.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite(name));
        }

        for &(name, cap) in &named[..3] {
            if cap <= 0.0 {
                return Err(ConfigError::InvalidThreshold(name));
            }
        }
        Ok(())
    }
}

/// Relative importance of the five factor blocks. Must sum to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub valuation: f64,
    pub profitability: f64,
    pub financial_health: f64,
    pub growth: f64,
    pub dividend: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            valuation: 0.30,
            profitability: 0.30,
            financial_health: 0.20,
            growth: 0.15,
            dividend: 0.05,
        }
    }
}

impl Weights {
    const SUM_TOLERANCE: f64 = 1e-6;

    pub fn sum(&self) -> f64 {
        self.valuation + self.profitability + self.financial_health + self.growth + self.dividend
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("valuation", self.valuation),
            ("profitability", self.profitability),
            ("financial_health", self.financial_health),
            ("growth", self.growth),
            ("dividend", self.dividend),
        ];
        for (name, w) in named {
            if !w.is_finite() {
                return Err(ConfigError::NonFinite(name));
            }
            if w < 0.0 {
                return Err(ConfigError::NegativeWeight(name));
            }
        }

        let sum = self.sum();
        if (sum - 1.0).abs() > Self::SUM_TOLERANCE {
            return Err(ConfigError::WeightsSum(sum));
        }
        Ok(())
    }
}

/// Factor blocks, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Block {
    Valuation,
    Profitability,
    FinancialHealth,
    Growth,
    Dividend,
}

/// Five sub-scores (0-100) and their weighted total (0-100).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub valuation: f64,
    pub profitability: f64,
    pub financial_health: f64,
    pub growth: f64,
    pub dividend: f64,
    pub total: f64,
}

/// A short metric-specific explanation produced while scoring a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    pub block: Block,
    pub phrase: String,
}

/// Qualitative profile tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tag {
    Value,
    Asset,
    Quality,
    Safe,
    Growth,
    Dividend,
}

impl Tag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tag::Value => "VALUE",
            Tag::Asset => "ASSET",
            Tag::Quality => "QUALITY",
            Tag::Safe => "SAFE",
            Tag::Growth => "GROWTH",
            Tag::Dividend => "DIVIDEND",
        }
    }

    /// Rationale fragment contributed by this tag, if any.
    pub fn summary_phrase(&self) -> Option<&'static str> {
        match self {
            Tag::Value => Some("valorisation attractive"),
            Tag::Quality => Some("business rentable"),
            Tag::Safe => Some("bilan sain"),
            Tag::Growth => Some("croissance correcte"),
            Tag::Dividend => Some("dividende intéressant"),
            Tag::Asset => None,
        }
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Score tier shown next to a ticker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreTier {
    Hot,
    Good,
    Watch,
    Cold,
}

impl ScoreTier {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 70.0 => ScoreTier::Hot,
            s if s >= 55.0 => ScoreTier::Good,
            s if s >= 40.0 => ScoreTier::Watch,
            _ => ScoreTier::Cold,
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            ScoreTier::Hot => "🔥",
            ScoreTier::Good => "✅",
            ScoreTier::Watch => "⚠️",
            ScoreTier::Cold => "🧊",
        }
    }
}

/// Confidence tier shown next to the confidence percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
}

impl ConfidenceTier {
    pub fn from_confidence(confidence: f64) -> Self {
        match confidence {
            c if c >= 80.0 => ConfidenceTier::High,
            c if c >= 60.0 => ConfidenceTier::Medium,
            _ => ConfidenceTier::Low,
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            ConfidenceTier::High => "🟢",
            ConfidenceTier::Medium => "🟡",
            ConfidenceTier::Low => "🔴",
        }
    }
}

/// Public output unit for a ticker that passed both scan gates.
///
/// Display metrics are `None` when the provider had nothing usable, so a
/// rendering layer never shows a false zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub ticker: String,
    pub name: String,
    pub sector: String,
    pub price: f64,
    pub currency: String,

    pub pe: Option<f64>,
    pub pb: Option<f64>,
    pub ev_ebitda: Option<f64>,
    pub roe_pct: Option<f64>,
    pub margin_pct: Option<f64>,
    pub debt_to_equity: Option<f64>,
    pub dividend_pct: f64,
    pub dividend_display: String,
    pub revenue_growth_pct: Option<f64>,

    pub score: f64,
    pub confidence: f64,
    pub score_tier: ScoreTier,
    pub confidence_tier: ConfidenceTier,
    pub breakdown: ScoreBreakdown,

    pub tags: Vec<Tag>,
    pub tags_display: String,
    pub summary: String,
    /// At most three entries
    pub why: Vec<String>,
}

impl ResultRecord {
    pub fn why_display(&self) -> String {
        self.why.join(" | ")
    }
}
