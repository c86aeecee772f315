use anyhow::{bail, Context, Result};
use scan_orchestrator::ScanFilters;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use value_core::{Thresholds, Weights};
use yahoo_client::{
    YahooClientConfig, DEFAULT_BASE_URL, DEFAULT_CACHE_TTL_SECS, DEFAULT_COOKIE_URL,
};

use crate::args::CliArgs;

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub min_score: f64,                 // 35
    pub min_confidence: f64,            // 50
    pub top_n: usize,                   // 5
    pub sectors: Option<Vec<String>>,   // None = whole universe

    // Data source
    pub yahoo: YahooClientConfig,
    pub cache_ttl_secs: i64,            // 0 disables the cache

    // Scoring
    pub thresholds: Thresholds,
    pub weights: Weights,
}

/// Parse `key` from `lookup`, falling back to `default` when unset or blank.
fn read<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

/// Like [`read`], but NaN and infinities are errors: they slip through every
/// comparison downstream.
fn read_f64<F>(lookup: &F, key: &str, default: f64) -> Result<f64>
where
    F: Fn(&str) -> Option<String>,
{
    let value = read(lookup, key, default)?;
    if !value.is_finite() {
        bail!("{key} must be a finite number (got {value})");
    }
    Ok(value)
}

pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl ScannerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let th = Thresholds::default();
        let thresholds = Thresholds {
            pe_max: read_f64(&lookup, "PE_MAX", th.pe_max)?,
            pb_max: read_f64(&lookup, "PB_MAX", th.pb_max)?,
            ev_ebitda_max: read_f64(&lookup, "EV_EBITDA_MAX", th.ev_ebitda_max)?,
            roe_min: read_f64(&lookup, "ROE_MIN", th.roe_min)?,
            margin_min: read_f64(&lookup, "MARGIN_MIN", th.margin_min)?,
            debt_to_equity_max: read_f64(&lookup, "DEBT_TO_EQUITY_MAX", th.debt_to_equity_max)?,
            rev_growth_min: read_f64(&lookup, "REV_GROWTH_MIN", th.rev_growth_min)?,
            dividend_min: read_f64(&lookup, "DIVIDEND_MIN", th.dividend_min)?,
        };
        thresholds.validate().context("Invalid scoring thresholds")?;

        let w = Weights::default();
        let weights = Weights {
            valuation: read_f64(&lookup, "WEIGHT_VALUATION", w.valuation)?,
            profitability: read_f64(&lookup, "WEIGHT_PROFITABILITY", w.profitability)?,
            financial_health: read_f64(&lookup, "WEIGHT_FINANCIAL_HEALTH", w.financial_health)?,
            growth: read_f64(&lookup, "WEIGHT_GROWTH", w.growth)?,
            dividend: read_f64(&lookup, "WEIGHT_DIVIDEND", w.dividend)?,
        };
        weights.validate().context("Invalid factor weights")?;

        let defaults = YahooClientConfig::default();
        let yahoo = YahooClientConfig {
            base_url: lookup("YAHOO_BASE_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            cookie_url: lookup("YAHOO_COOKIE_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_COOKIE_URL.to_string()),
            rate_limit: read(&lookup, "YAHOO_RATE_LIMIT", defaults.rate_limit)?,
            retries: read(&lookup, "YAHOO_FETCH_RETRIES", defaults.retries)?,
            timeout: Duration::from_secs(read(
                &lookup,
                "YAHOO_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )?),
            ..defaults
        };

        Ok(Self {
            min_score: read_f64(&lookup, "MIN_SCORE", 35.0)?,
            min_confidence: read_f64(&lookup, "MIN_CONFIDENCE", 50.0)?,
            top_n: read(&lookup, "TOP_N", 5)?,
            sectors: lookup("SECTORS")
                .map(|raw| split_list(&raw))
                .filter(|list| !list.is_empty()),
            yahoo,
            cache_ttl_secs: read(&lookup, "CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS)?,
            thresholds,
            weights,
        })
    }

    /// Command-line flags win over the environment.
    pub fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(v) = args.min_score {
            self.min_score = v;
        }
        if let Some(v) = args.min_confidence {
            self.min_confidence = v;
        }
        if let Some(v) = args.top {
            self.top_n = v;
        }
        if let Some(sectors) = &args.sectors {
            self.sectors = Some(sectors.clone());
        }
    }

    pub fn filters(&self) -> ScanFilters {
        ScanFilters {
            min_score: self.min_score,
            min_confidence: self.min_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ScannerConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.min_score, 35.0);
        assert_eq!(config.min_confidence, 50.0);
        assert_eq!(config.top_n, 5);
        assert!(config.sectors.is_none());
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.yahoo.retries, 3);
        assert_eq!(config.yahoo.rate_limit, 60);
        assert_eq!(config.yahoo.cookie_url, DEFAULT_COOKIE_URL);
        assert_eq!(config.thresholds, Thresholds::default());
        assert_eq!(config.weights, Weights::default());
    }

    #[test]
    fn test_overrides() {
        let config = ScannerConfig::from_lookup(lookup_from(&[
            ("MIN_SCORE", "50"),
            ("SECTORS", "Tech, Utilities,"),
            ("PE_MAX", "30"),
            ("WEIGHT_VALUATION", "0.25"),
            ("WEIGHT_DIVIDEND", "0.10"),
            ("CACHE_TTL_SECS", "0"),
        ]))
        .unwrap();
        assert_eq!(config.min_score, 50.0);
        assert_eq!(
            config.sectors,
            Some(vec!["Tech".to_string(), "Utilities".to_string()])
        );
        assert_eq!(config.thresholds.pe_max, 30.0);
        assert_eq!(config.weights.dividend, 0.10);
        assert_eq!(config.cache_ttl_secs, 0);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let err = ScannerConfig::from_lookup(lookup_from(&[("WEIGHT_GROWTH", "0.5")])).unwrap_err();
        assert!(err.to_string().contains("weights"));
    }

    #[test]
    fn test_unparsable_value_is_an_error() {
        assert!(ScannerConfig::from_lookup(lookup_from(&[("TOP_N", "five")])).is_err());
    }

    #[test]
    fn test_nan_values_are_rejected() {
        let err = ScannerConfig::from_lookup(lookup_from(&[("MIN_SCORE", "NaN")])).unwrap_err();
        assert!(err.to_string().contains("MIN_SCORE"));
        assert!(ScannerConfig::from_lookup(lookup_from(&[("MIN_CONFIDENCE", "nan")])).is_err());
        assert!(ScannerConfig::from_lookup(lookup_from(&[("WEIGHT_VALUATION", "NaN")])).is_err());
        assert!(ScannerConfig::from_lookup(lookup_from(&[("PE_MAX", "inf")])).is_err());
        assert!(ScannerConfig::from_lookup(lookup_from(&[("ROE_MIN", "-inf")])).is_err());
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = ScannerConfig::from_lookup(lookup_from(&[("TOP_N", "3")])).unwrap();
        let args = CliArgs {
            top: Some(10),
            min_confidence: Some(70.0),
            ..CliArgs::default()
        };
        config.apply_cli(&args);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.min_confidence, 70.0);
        assert_eq!(config.min_score, 35.0);
    }
}
