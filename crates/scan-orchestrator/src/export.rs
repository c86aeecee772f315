use serde::Serialize;
use value_core::ResultRecord;

use crate::OrchestratorError;

/// One line of the comparison table. Missing metrics are empty cells.
#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Score")]
    score: f64,
    #[serde(rename = "Confiance %")]
    confidence: f64,
    #[serde(rename = "Ticker")]
    ticker: &'a str,
    #[serde(rename = "Société")]
    name: &'a str,
    #[serde(rename = "Secteur")]
    sector: &'a str,
    #[serde(rename = "Prix")]
    price: f64,
    #[serde(rename = "Devise")]
    currency: &'a str,
    #[serde(rename = "PER")]
    pe: Option<f64>,
    #[serde(rename = "P/B")]
    pb: Option<f64>,
    #[serde(rename = "EV/EBITDA")]
    ev_ebitda: Option<f64>,
    #[serde(rename = "ROE %")]
    roe_pct: Option<f64>,
    #[serde(rename = "Marge %")]
    margin_pct: Option<f64>,
    #[serde(rename = "Dette/Equity")]
    debt_to_equity: Option<f64>,
    #[serde(rename = "Div %")]
    dividend_pct: f64,
    #[serde(rename = "Croissance CA %")]
    revenue_growth_pct: Option<f64>,
    #[serde(rename = "Tags")]
    tags: &'a str,
    #[serde(rename = "Résumé")]
    summary: &'a str,
    #[serde(rename = "Pourquoi")]
    why: String,
}

impl<'a> From<&'a ResultRecord> for CsvRow<'a> {
    fn from(r: &'a ResultRecord) -> Self {
        Self {
            score: r.score,
            confidence: r.confidence,
            ticker: &r.ticker,
            name: &r.name,
            sector: &r.sector,
            price: r.price,
            currency: &r.currency,
            pe: r.pe,
            pb: r.pb,
            ev_ebitda: r.ev_ebitda,
            roe_pct: r.roe_pct,
            margin_pct: r.margin_pct,
            debt_to_equity: r.debt_to_equity,
            dividend_pct: r.dividend_pct,
            revenue_growth_pct: r.revenue_growth_pct,
            tags: &r.tags_display,
            summary: &r.summary,
            why: r.why_display(),
        }
    }
}

pub fn to_csv(results: &[ResultRecord]) -> Result<String, OrchestratorError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for r in results {
        writer.serialize(CsvRow::from(r))?;
    }
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

pub fn to_json(results: &[ResultRecord]) -> Result<String, OrchestratorError> {
    Ok(serde_json::to_string_pretty(results)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use value_core::{ConfidenceTier, ScoreBreakdown, ScoreTier, Tag};

    fn record() -> ResultRecord {
        ResultRecord {
            ticker: "KO".to_string(),
            name: "Coca-Cola".to_string(),
            sector: "Conso".to_string(),
            price: 61.25,
            currency: "USD".to_string(),
            pe: Some(24.3),
            pb: None,
            ev_ebitda: None,
            roe_pct: Some(41.0),
            margin_pct: Some(23.0),
            debt_to_equity: Some(1.62),
            dividend_pct: 3.17,
            dividend_display: "3.17".to_string(),
            revenue_growth_pct: Some(2.9),
            score: 48.3,
            confidence: 88.0,
            score_tier: ScoreTier::Watch,
            confidence_tier: ConfidenceTier::High,
            breakdown: ScoreBreakdown::default(),
            tags: vec![Tag::Dividend],
            tags_display: "DIVIDEND".to_string(),
            summary: "dividende intéressant".to_string(),
            why: vec!["ROE très solide (41.0%)".to_string(), "Dividende sympa (3.2%)".to_string()],
        }
    }

    #[test]
    fn test_csv_header_and_row() {
        let csv = to_csv(&[record()]).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("Score,Confiance %,Ticker,Société,Secteur,Prix,Devise,PER,P/B,EV/EBITDA,ROE %,Marge %,Dette/Equity,Div %,Croissance CA %,Tags,Résumé,Pourquoi")
        );
        let row = lines.next().unwrap();
        assert!(row.starts_with("48.3,88.0,KO,Coca-Cola,Conso,61.25,USD,24.3,,,41.0,"));
        assert!(row.ends_with("ROE très solide (41.0%) | Dividende sympa (3.2%)"));
    }

    #[test]
    fn test_empty_csv_has_no_rows() {
        assert!(to_csv(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_json_export() {
        let json = to_json(&[record()]).unwrap();
        let back: Vec<ResultRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(back[0].ticker, "KO");
        assert_eq!(back[0].pb, None);
    }
}
