//! Five-block factor scoring, tags and rationale.

use serde::{Deserialize, Serialize};
use value_core::{Block, RawMetrics, Reason, ScoreBreakdown, Tag, Thresholds, Weights};

use crate::confidence::{estimate_confidence, ConfidenceReport};
use crate::sanitizer::{clamp_score, round_to, SanitizedMetrics};

const NEUTRAL_SUMMARY: &str = "profil équilibré";
const SUMMARY_PARTS: usize = 2;

/// Output of [`FactorScorer::score`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub breakdown: ScoreBreakdown,
    /// Every reason produced, in block evaluation order
    pub reasons: Vec<Reason>,
    pub tags: Vec<Tag>,
    pub summary: String,
}

impl ScoreCard {
    /// First `n` reason phrases in evaluation order.
    pub fn top_reasons(&self, n: usize) -> Vec<String> {
        self.reasons.iter().take(n).map(|r| r.phrase.clone()).collect()
    }
}

/// Score plus confidence for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub metrics: SanitizedMetrics,
    pub card: ScoreCard,
    pub confidence: ConfidenceReport,
}

/// Per-block result before aggregation.
struct BlockScore {
    score: f64,
    reasons: Vec<Reason>,
}

impl BlockScore {
    fn new() -> Self {
        Self {
            score: 0.0,
            reasons: Vec::new(),
        }
    }

    fn add(&mut self, points: f64) {
        self.score += points;
    }

    fn reason(&mut self, block: Block, phrase: String) {
        self.reasons.push(Reason { block, phrase });
    }
}

pub struct FactorScorer {
    thresholds: Thresholds,
    weights: Weights,
}

impl FactorScorer {
    pub fn new(thresholds: Thresholds, weights: Weights) -> Self {
        Self {
            thresholds,
            weights,
        }
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn weights(&self) -> &Weights {
        &self.weights
    }

    /// Sanitize, estimate confidence and score a raw record.
    pub fn evaluate(&self, raw: &RawMetrics) -> Evaluation {
        let metrics = SanitizedMetrics::from_raw(raw);
        let card = self.score(&metrics);
        Evaluation {
            metrics,
            card,
            confidence: estimate_confidence(raw),
        }
    }

    pub fn score(&self, m: &SanitizedMetrics) -> ScoreCard {
        let blocks = [
            (Block::Valuation, self.valuation(m)),
            (Block::Profitability, self.profitability(m)),
            (Block::FinancialHealth, self.financial_health(m)),
            (Block::Growth, self.growth(m)),
            (Block::Dividend, self.dividend(m)),
        ];

        let mut breakdown = ScoreBreakdown::default();
        let mut reasons = Vec::new();
        for (block, result) in blocks {
            let sub = round_to(clamp_score(result.score), 1);
            match block {
                Block::Valuation => breakdown.valuation = sub,
                Block::Profitability => breakdown.profitability = sub,
                Block::FinancialHealth => breakdown.financial_health = sub,
                Block::Growth => breakdown.growth = sub,
                Block::Dividend => breakdown.dividend = sub,
            }
            reasons.extend(result.reasons);
        }

        let w = &self.weights;
        let total = breakdown.valuation * w.valuation
            + breakdown.profitability * w.profitability
            + breakdown.financial_health * w.financial_health
            + breakdown.growth * w.growth
            + breakdown.dividend * w.dividend;
        breakdown.total = round_to(clamp_score(total), 1);

        let tags = derive_tags(m);
        let summary = summarize(&tags);

        ScoreCard {
            breakdown,
            reasons,
            tags,
            summary,
        }
    }

    fn valuation(&self, m: &SanitizedMetrics) -> BlockScore {
        let th = &self.thresholds;
        let mut b = BlockScore::new();

        if m.pe > 0.0 && m.pe < th.pe_max {
            let pe_norm = if m.pe < 12.0 {
                b.reason(Block::Valuation, format!("PER bas ({:.1})", m.pe));
                100.0
            } else if m.pe < 18.0 {
                b.reason(Block::Valuation, format!("PER raisonnable ({:.1})", m.pe));
                80.0
            } else {
                60.0
            };
            b.add(pe_norm * 0.50);
        }

        if m.pb > 0.0 && m.pb < th.pb_max {
            let pb_norm = 100.0 * (th.pb_max - m.pb) / th.pb_max;
            b.add(clamp_score(pb_norm) * 0.30);
            if m.pb < 2.0 {
                b.reason(Block::Valuation, format!("P/B cool ({:.2})", m.pb));
            }
        }

        if m.ev_ebitda > 0.0 && m.ev_ebitda < th.ev_ebitda_max {
            let ev_norm = 100.0 * (th.ev_ebitda_max - m.ev_ebitda) / th.ev_ebitda_max;
            b.add(clamp_score(ev_norm) * 0.20);
            if m.ev_ebitda < 12.0 {
                b.reason(Block::Valuation, format!("EV/EBITDA clean ({:.1})", m.ev_ebitda));
            }
        }

        b
    }

    fn profitability(&self, m: &SanitizedMetrics) -> BlockScore {
        let th = &self.thresholds;
        let mut b = BlockScore::new();
        let roe = m.roe_pct;

        if roe > 0.0 {
            let roe_norm = if roe > 20.0 {
                b.reason(Block::Profitability, format!("ROE très solide ({:.1}%)", roe));
                100.0
            } else if roe > 15.0 {
                b.reason(Block::Profitability, format!("ROE solide ({:.1}%)", roe));
                80.0
            } else if roe > 10.0 {
                60.0
            } else if roe > 8.0 {
                40.0
            } else {
                0.0
            };
            b.add(roe_norm * 0.50);
        }

        if m.margin > th.margin_min {
            // 5% -> 0, 30% -> 100 with the default cutoff
            let margin_norm = (m.margin - th.margin_min) * 400.0;
            b.add(clamp_score(margin_norm) * 0.50);
            if m.margin > 0.12 {
                b.reason(Block::Profitability, format!("Marges ok ({:.1}%)", m.margin_pct()));
            }
        }

        b
    }

    fn financial_health(&self, m: &SanitizedMetrics) -> BlockScore {
        let mut b = BlockScore::new();
        let dte = m.debt_to_equity;

        if dte > 0.0 {
            let dte_norm = if dte < 0.30 {
                b.reason(Block::FinancialHealth, "Dette faible".to_string());
                100.0
            } else if dte < 0.60 {
                70.0
            } else if dte < 0.80 {
                40.0
            } else {
                0.0
            };
            b.add(dte_norm * 0.60);
        }

        if m.revenue > 0.0 && m.operating_cash_flow > 0.0 {
            let cf_margin = m.operating_cash_flow / m.revenue;
            let cf_norm = if cf_margin > 0.15 {
                b.reason(Block::FinancialHealth, "Cashflow solide".to_string());
                100.0
            } else if cf_margin > 0.10 {
                70.0
            } else if cf_margin > 0.05 {
                40.0
            } else {
                0.0
            };
            b.add(cf_norm * 0.40);
        }

        b
    }

    fn growth(&self, m: &SanitizedMetrics) -> BlockScore {
        let mut b = BlockScore::new();
        let rg = m.revenue_growth;

        if rg > 0.0 {
            let score = if rg > 0.15 {
                b.reason(Block::Growth, format!("Croissance forte ({:.1}%)", m.revenue_growth_pct()));
                100.0
            } else if rg > 0.10 {
                80.0
            } else if rg > 0.05 {
                60.0
            } else if rg > 0.03 {
                b.reason(Block::Growth, format!("Croissance OK ({:.1}%)", m.revenue_growth_pct()));
                40.0
            } else {
                20.0
            };
            b.add(score);
        }

        b
    }

    fn dividend(&self, m: &SanitizedMetrics) -> BlockScore {
        let mut b = BlockScore::new();
        let dy = m.dividend_pct;

        if dy > 0.0 {
            let score = if dy > 5.0 {
                b.reason(Block::Dividend, format!("Dividende élevé ({:.1}%)", dy));
                100.0
            } else if dy > 4.0 {
                80.0
            } else if dy > 3.0 {
                b.reason(Block::Dividend, format!("Dividende sympa ({:.1}%)", dy));
                60.0
            } else if dy > 2.0 {
                40.0
            } else if dy > 1.0 {
                20.0
            } else {
                0.0
            };
            b.add(score);
        }

        b
    }
}

impl Default for FactorScorer {
    fn default() -> Self {
        Self::new(Thresholds::default(), Weights::default())
    }
}

/// Tags fire independently of thresholds and of each other.
pub fn derive_tags(m: &SanitizedMetrics) -> Vec<Tag> {
    let mut tags = Vec::new();
    if m.pe > 0.0 && m.pe < 15.0 {
        tags.push(Tag::Value);
    }
    if m.pb > 0.0 && m.pb < 2.0 {
        tags.push(Tag::Asset);
    }
    if m.roe_pct > 20.0 && m.margin > 0.10 {
        tags.push(Tag::Quality);
    }
    if m.debt_to_equity > 0.0 && m.debt_to_equity < 0.60 {
        tags.push(Tag::Safe);
    }
    if m.revenue_growth_pct() > 8.0 {
        tags.push(Tag::Growth);
    }
    if m.dividend_pct >= 2.0 {
        tags.push(Tag::Dividend);
    }
    tags
}

/// Up to two tag phrases joined with ", ", or a neutral phrase.
pub fn summarize(tags: &[Tag]) -> String {
    let parts: Vec<&str> = tags
        .iter()
        .filter_map(Tag::summary_phrase)
        .take(SUMMARY_PARTS)
        .collect();
    if parts.is_empty() {
        NEUTRAL_SUMMARY.to_string()
    } else {
        parts.join(", ")
    }
}
