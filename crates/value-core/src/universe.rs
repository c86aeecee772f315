//! Sector → ticker universe, kept in caller order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorTickers {
    pub sector: String,
    pub tickers: Vec<String>,
}

/// Ordered mapping from sector label to ticker symbols.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Universe {
    sectors: Vec<SectorTickers>,
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from (sector, tickers) pairs. A repeated sector label appends to
    /// the first occurrence.
    pub fn from_pairs<S, T, I>(pairs: impl IntoIterator<Item = (S, I)>) -> Self
    where
        S: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = T>,
    {
        let mut universe = Self::new();
        for (sector, tickers) in pairs {
            universe.add_sector(sector, tickers);
        }
        universe
    }

    pub fn add_sector<S, T, I>(&mut self, sector: S, tickers: I)
    where
        S: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = T>,
    {
        let sector = sector.into();
        let tickers = tickers.into_iter().map(Into::into);
        match self.sectors.iter_mut().find(|s| s.sector == sector) {
            Some(existing) => existing.tickers.extend(tickers),
            None => self.sectors.push(SectorTickers {
                sector,
                tickers: tickers.collect(),
            }),
        }
    }

    /// Built-in large-cap universe.
    pub fn default_universe() -> Self {
        Self::from_pairs([
            ("Tech", vec!["AAPL", "MSFT", "GOOGL", "NVDA", "TSM", "ASML", "ADBE", "CRM", "ORCL", "INTC"]),
            ("Finance", vec!["JPM", "BAC", "WFC", "HSBC", "GS", "AXP", "PYPL", "V", "MA"]),
            ("Santé", vec!["JNJ", "PFE", "UNH", "ABBV", "TMO", "DHR", "LLY", "MRK", "ABT", "BMY"]),
            ("Energie", vec!["XOM", "CVX", "SHEL", "BP", "TTE", "COP", "EOG"]),
            ("Conso", vec!["PG", "KO", "PEP", "WMT", "COST", "MCD", "NKE", "SBUX", "HD", "LOW"]),
            ("Industriels", vec!["CAT", "BA", "HON", "GE", "MMM", "UNP", "UPS", "FDX", "DE", "ETN"]),
            ("Utilities", vec!["NEE", "DUK", "SO", "D", "AEP", "EXC", "XEL"]),
        ])
    }

    /// Restrict to the named sectors, keeping this universe's order.
    /// Unknown names are ignored; an empty selection gives an empty universe.
    pub fn select<S: AsRef<str>>(&self, sectors: &[S]) -> Self {
        Self {
            sectors: self
                .sectors
                .iter()
                .filter(|s| sectors.iter().any(|name| name.as_ref() == s.sector))
                .cloned()
                .collect(),
        }
    }

    pub fn sector_names(&self) -> Vec<&str> {
        self.sectors.iter().map(|s| s.sector.as_str()).collect()
    }

    pub fn sectors(&self) -> &[SectorTickers] {
        &self.sectors
    }

    /// Flattened (sector, ticker) pairs in sector order, then ticker order.
    pub fn pairs(&self) -> Vec<(&str, &str)> {
        self.sectors
            .iter()
            .flat_map(|s| s.tickers.iter().map(move |t| (s.sector.as_str(), t.as_str())))
            .collect()
    }

    pub fn ticker_count(&self) -> usize {
        self.sectors.iter().map(|s| s.tickers.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ticker_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairs_preserve_order() {
        let u = Universe::from_pairs([("B", vec!["B1", "B2"]), ("A", vec!["A1"])]);
        assert_eq!(u.pairs(), vec![("B", "B1"), ("B", "B2"), ("A", "A1")]);
    }

    #[test]
    fn test_repeated_sector_appends() {
        let u = Universe::from_pairs([("Tech", vec!["AAPL"]), ("Tech", vec!["MSFT"])]);
        assert_eq!(u.sectors().len(), 1);
        assert_eq!(u.ticker_count(), 2);
    }

    #[test]
    fn test_select_keeps_universe_order() {
        let u = Universe::default_universe();
        let picked = u.select(&["Utilities", "Tech"]);
        assert_eq!(picked.sector_names(), vec!["Tech", "Utilities"]);
        assert_eq!(picked.ticker_count(), 17);
    }

    #[test]
    fn test_empty_selection() {
        let picked = Universe::default_universe().select::<&str>(&[]);
        assert!(picked.is_empty());
        assert!(picked.pairs().is_empty());
    }

    #[test]
    fn test_serde_round_trip_keeps_order() {
        let u = Universe::from_pairs([("Z", vec!["Z1"]), ("A", vec!["A1"])]);
        let json = serde_json::to_string(&u).unwrap();
        let back: Universe = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sector_names(), vec!["Z", "A"]);
    }
}
