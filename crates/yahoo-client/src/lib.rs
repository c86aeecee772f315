mod cache;
#[cfg(test)]
mod mock_server;

pub use cache::{ResponseCache, DEFAULT_CACHE_TTL_SECS};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use value_core::{DataError, MetricsSource, RawMetrics};
use value_scoring::sanitizer::to_float;

pub const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
/// Visited once per session to obtain the cookie the crumb is bound to.
pub const DEFAULT_COOKIE_URL: &str = "https://fc.yahoo.com";
const CRUMB_PATH: &str = "/v1/test/getcrumb";
const MODULES: &str = "price,summaryDetail,financialData,defaultKeyStatistics";

/// Responses with this many populated fields or fewer are treated as empty.
const MIN_POPULATED_FIELDS: usize = 5;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).saturating_duration_since(now)
                    + Duration::from_millis(50),
                None => Duration::from_millis(50),
            };
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Yahoo slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[derive(Debug, Clone)]
pub struct YahooClientConfig {
    pub base_url: String,
    pub cookie_url: String,
    /// Requests per minute
    pub rate_limit: usize,
    /// Attempts per ticker before giving up
    pub retries: u32,
    /// Backoff unit; attempt `n` sleeps `n * retry_delay`
    pub retry_delay: Duration,
    pub timeout: Duration,
}

impl Default for YahooClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cookie_url: DEFAULT_COOKIE_URL.to_string(),
            rate_limit: 60,
            retries: 3,
            retry_delay: Duration::from_millis(700),
            timeout: Duration::from_secs(20),
        }
    }
}

/// Yahoo Finance quoteSummary client implementing [`MetricsSource`].
///
/// quoteSummary rejects requests without a session cookie and the matching
/// crumb. Both are obtained lazily on first use, shared across clones, and
/// refreshed when Yahoo answers 401.
#[derive(Clone)]
pub struct YahooClient {
    client: Client,
    config: YahooClientConfig,
    rate_limiter: RateLimiter,
    crumb: Arc<RwLock<Option<String>>>,
    cache: Option<Arc<ResponseCache>>,
}

impl YahooClient {
    pub fn new(config: YahooClientConfig) -> Self {
        let client = Client::builder()
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .timeout(config.timeout)
            .cookie_store(true)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::new(config.rate_limit, Duration::from_secs(60)),
            config,
            crumb: Arc::new(RwLock::new(None)),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn base_url(&self) -> &str {
        self.config.base_url.trim_end_matches('/')
    }

    /// Session crumb, running the cookie + getcrumb handshake when none is held.
    async fn crumb(&self) -> Result<String, DataError> {
        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(crumb.clone());
        }

        let mut slot = self.crumb.write().await;
        if let Some(crumb) = slot.as_ref() {
            return Ok(crumb.clone());
        }

        // The cookie endpoint answers 404 but still sets the session cookie
        self.client
            .get(&self.config.cookie_url)
            .send()
            .await
            .map_err(|e| DataError::Http(format!("Session cookie request failed: {e}")))?;

        let response = self
            .client
            .get(format!("{}{}", self.base_url(), CRUMB_PATH))
            .send()
            .await
            .map_err(|e| DataError::Http(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(DataError::RateLimited("crumb".to_string()));
        }
        if !status.is_success() {
            return Err(DataError::Http(format!("HTTP {} fetching crumb", status)));
        }

        let crumb = response
            .text()
            .await
            .map_err(|e| DataError::Parse(e.to_string()))?
            .trim()
            .to_string();
        if crumb.is_empty() || crumb.contains(|c: char| c.is_whitespace() || c == '<') {
            return Err(DataError::Parse("Invalid crumb in response".to_string()));
        }

        tracing::debug!("Obtained Yahoo crumb");
        *slot = Some(crumb.clone());
        Ok(crumb)
    }

    async fn invalidate_crumb(&self) {
        *self.crumb.write().await = None;
    }

    async fn fetch_once(&self, ticker: &str) -> Result<Value, DataError> {
        let crumb = self.crumb().await?;
        let url = format!("{}/v10/finance/quoteSummary/{}", self.base_url(), ticker);

        self.rate_limiter.acquire().await;
        let response = self
            .client
            .get(&url)
            .query(&[("modules", MODULES), ("crumb", crumb.as_str())])
            .send()
            .await
            .map_err(|e| DataError::Http(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 {
            tracing::debug!("Crumb rejected for {}, refreshing session", ticker);
            self.invalidate_crumb().await;
            return Err(DataError::Http(format!("HTTP {} for {}", status, ticker)));
        }
        if status.as_u16() == 429 {
            return Err(DataError::RateLimited(ticker.to_string()));
        }
        if !status.is_success() {
            return Err(DataError::Http(format!("HTTP {} for {}", status, ticker)));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| DataError::Parse(e.to_string()))
    }

    /// Fetch with linear backoff. Empty payloads count as failed attempts.
    pub async fn fetch_with_retry(&self, ticker: &str) -> Result<RawMetrics, DataError> {
        let attempts = self.config.retries.max(1);
        let mut last_error = DataError::Unavailable(ticker.to_string());

        for attempt in 1..=attempts {
            match self.fetch_once(ticker).await.and_then(|body| parse_quote_summary(ticker, &body)) {
                Ok(metrics) => return Ok(metrics),
                Err(e) => {
                    tracing::debug!("Yahoo fetch {} attempt {}/{} failed: {}", ticker, attempt, attempts, e);
                    last_error = e;
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_delay * attempt).await;
            }
        }

        tracing::warn!("Giving up on {} after {} attempts: {}", ticker, attempts, last_error);
        Err(last_error)
    }
}

impl Default for YahooClient {
    fn default() -> Self {
        Self::new(YahooClientConfig::default())
    }
}

#[async_trait]
impl MetricsSource for YahooClient {
    async fn fetch_metrics(&self, ticker: &str) -> Result<RawMetrics, DataError> {
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(ticker) {
                tracing::debug!("Cache hit for {}", ticker);
                return Ok(hit);
            }
        }

        let metrics = self.fetch_with_retry(ticker).await?;

        if let Some(cache) = &self.cache {
            cache.insert(ticker, metrics.clone());
        }
        Ok(metrics)
    }

    fn name(&self) -> &str {
        "yahoo"
    }
}

/// Merge the quoteSummary modules into one flat field map. Yahoo wraps numbers
/// as `{"raw": x, "fmt": "..."}`; those are unwrapped, empty objects dropped.
/// The first module to report a field wins.
fn flatten_modules(result: &Value) -> Map<String, Value> {
    let mut fields = Map::new();
    for module in MODULES.split(',') {
        let Some(Value::Object(entries)) = result.get(module) else {
            continue;
        };
        for (key, value) in entries {
            let unwrapped = match value {
                Value::Object(obj) => match obj.get("raw") {
                    Some(raw) => raw.clone(),
                    None => continue,
                },
                Value::Null => continue,
                other => other.clone(),
            };
            fields.entry(key.clone()).or_insert(unwrapped);
        }
    }
    fields
}

fn number(fields: &Map<String, Value>, key: &str) -> Option<f64> {
    let v = to_float(fields.get(key), f64::NAN);
    v.is_finite().then_some(v)
}

/// First of `keys` carrying a non-zero number.
fn first_number(fields: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| number(fields, k))
        .find(|v| *v != 0.0)
        .or_else(|| keys.iter().find_map(|k| number(fields, k)))
}

fn text(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Map a quoteSummary payload to [`RawMetrics`].
pub fn parse_quote_summary(ticker: &str, body: &Value) -> Result<RawMetrics, DataError> {
    let result = body
        .get("quoteSummary")
        .and_then(|v| v.get("result"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| DataError::Unavailable(ticker.to_string()))?;

    let fields = flatten_modules(result);
    if fields.len() <= MIN_POPULATED_FIELDS {
        return Err(DataError::Unavailable(ticker.to_string()));
    }

    Ok(RawMetrics {
        ticker: ticker.to_string(),
        name: text(&fields, "longName").or_else(|| text(&fields, "shortName")),
        currency: text(&fields, "currency"),
        price: first_number(&fields, &["regularMarketPrice", "currentPrice"]).unwrap_or(0.0),
        market_cap: number(&fields, "marketCap").unwrap_or(0.0),
        pe: first_number(&fields, &["trailingPE", "forwardPE"]),
        pb: number(&fields, "priceToBook"),
        ev_ebitda: number(&fields, "enterpriseToEbitda"),
        roe: number(&fields, "returnOnEquity"),
        margin: number(&fields, "profitMargins"),
        debt_to_equity: number(&fields, "debtToEquity"),
        revenue: number(&fields, "totalRevenue"),
        operating_cash_flow: number(&fields, "operatingCashflow"),
        revenue_growth: number(&fields, "revenueGrowth"),
        dividend_yield: number(&fields, "dividendYield"),
    })
}
