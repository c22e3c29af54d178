use std::time::Duration;

use chrono::NaiveDate;

use crate::dates::parse_input_date;
use crate::error::{AppError, Result};
use crate::types::Combination;

pub const HOME_URL: &str = "https://www.bseindia.com/";
pub const ANNOUNCEMENTS_PAGE_URL: &str = "https://www.bseindia.com/corporates/ann.html";
pub const PORTAL_ORIGIN: &str = "https://www.bseindia.com";

/// Announcement listing endpoints, tried in this order.
pub const ENDPOINTS: &[&str] = &[
    "https://api.bseindia.com/BseIndiaAPI/api/AnnSubCategoryGetData/w",
    "https://api.bseindia.com/BseIndiaAPI/api/AnnGetData/w",
];

/// Headers sent with every portal request. Referer is added from the home URL.
pub const BASE_HEADERS: &[(&str, &str)] = &[
    ("User-Agent", "Mozilla/5.0"),
    ("Accept", "application/json, text/plain, */*"),
    ("Accept-Language", "en-US,en;q=0.9"),
    ("Origin", PORTAL_ORIGIN),
    ("X-Requested-With", "XMLHttpRequest"),
    ("Cache-Control", "no-cache"),
    ("Pragma", "no-cache"),
];

/// Per-call timeout for listing endpoint requests (seconds).
pub const CALL_TIMEOUT_SECS: u64 = 30;

/// Timeout for the warmup that opens a fetch (seconds).
pub const WARMUP_TIMEOUT_SECS: u64 = 15;

/// Timeout for the warmup issued after a soft block (seconds).
pub const RETRY_WARMUP_TIMEOUT_SECS: u64 = 10;

/// Upper bound on pages fetched for one combination. Upstream that keeps
/// returning rows without a usable total would otherwise never terminate.
pub const MAX_PAGES_PER_COMBINATION: u32 = 1000;

/// Columns every announcement table carries, in display order.
pub const BASE_COLUMNS: &[&str] = &[
    "SCRIP_CD",
    "SLONGNAME",
    "HEADLINE",
    "NEWSSUB",
    "NEWS_DT",
    "ATTACHMENTNAME",
    "NSURL",
    "NEWSID",
];

/// Columns that identify an announcement for deduplication.
pub const DEDUP_KEY_COLUMNS: &[&str] = &["NSURL", "NEWSID", "ATTACHMENTNAME", "HEADLINE"];

/// Column holding the announcement timestamp.
pub const DATE_COLUMN: &str = "NEWS_DT";

/// Default start of the date range when the caller supplies none.
pub const DEFAULT_START_DATE: &str = "20250101";

/// Upstream parameter names and values that do not vary by combination.
pub mod params {
    pub const CATEGORY_KEY: &str = "strCat";
    pub const CATEGORY_ALL: &str = "-1";
    pub const FROM_DATE_KEY: &str = "strPrevDate";
    pub const TO_DATE_KEY: &str = "strToDate";
    pub const SEARCH_KEY: &str = "strSearch";
    pub const SEGMENT_KEY: &str = "strType";
    pub const SUBCATEGORY_KEY: &str = "subcategory";
}

// ---------------------------------------------------------------------------
// Portal
// ---------------------------------------------------------------------------

/// URLs and timeouts for one portal. Injected into the session and fetcher.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub home_url: String,
    pub announcements_page_url: String,
    pub endpoints: Vec<String>,
    pub call_timeout: Duration,
    pub warmup_timeout: Duration,
    pub retry_warmup_timeout: Duration,
    pub max_pages: u32,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            home_url: HOME_URL.to_string(),
            announcements_page_url: ANNOUNCEMENTS_PAGE_URL.to_string(),
            endpoints: ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            call_timeout: Duration::from_secs(CALL_TIMEOUT_SECS),
            warmup_timeout: Duration::from_secs(WARMUP_TIMEOUT_SECS),
            retry_warmup_timeout: Duration::from_secs(RETRY_WARMUP_TIMEOUT_SECS),
            max_pages: MAX_PAGES_PER_COMBINATION,
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter search space
// ---------------------------------------------------------------------------

/// The values tried for each varying parameter. Expanded against the
/// endpoint list into an ordered list of combinations.
#[derive(Debug, Clone)]
pub struct ParamSpace {
    pub segment_types: Vec<String>,
    pub search_modes: Vec<String>,
    pub subcategories: Vec<String>,
    pub page_keys: Vec<String>,
    pub scrip_keys: Vec<String>,
}

impl Default for ParamSpace {
    fn default() -> Self {
        fn owned(v: &[&str]) -> Vec<String> {
            v.iter().map(|s| s.to_string()).collect()
        }
        Self {
            segment_types: owned(&["C", "E"]),
            search_modes: owned(&["", "P"]),
            subcategories: owned(&["", "-1"]),
            page_keys: owned(&["pageno", "Pageno"]),
            scrip_keys: owned(&["strScrip", "strscrip"]),
        }
    }
}

impl ParamSpace {
    /// Every combination in search order: endpoint outermost, scrip key innermost.
    pub fn combinations(&self, endpoints: &[String]) -> Vec<Combination> {
        let mut out = Vec::with_capacity(
            endpoints.len()
                * self.segment_types.len()
                * self.search_modes.len()
                * self.subcategories.len()
                * self.page_keys.len()
                * self.scrip_keys.len(),
        );
        for endpoint in endpoints {
            for segment_type in &self.segment_types {
                for search_mode in &self.search_modes {
                    for subcategory in &self.subcategories {
                        for page_key in &self.page_keys {
                            for scrip_key in &self.scrip_keys {
                                out.push(Combination {
                                    endpoint: endpoint.clone(),
                                    segment_type: segment_type.clone(),
                                    search_mode: search_mode.clone(),
                                    subcategory: subcategory.clone(),
                                    page_key: page_key.clone(),
                                    scrip_key: scrip_key.clone(),
                                });
                            }
                        }
                    }
                }
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Process configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub api_port: u16,
    pub portal: PortalConfig,
    /// Start date used when a request omits one (START_DATE)
    pub default_start_date: NaiveDate,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let mut portal = PortalConfig::default();
        if let Ok(url) = std::env::var("BSE_HOME_URL") {
            portal.home_url = url;
        }
        if let Ok(url) = std::env::var("BSE_ANNOUNCEMENTS_URL") {
            portal.announcements_page_url = url;
        }
        if let Ok(list) = std::env::var("BSE_API_ENDPOINTS") {
            let endpoints: Vec<String> = list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if endpoints.is_empty() {
                return Err(AppError::Config(
                    "BSE_API_ENDPOINTS must list at least one URL".to_string(),
                ));
            }
            portal.endpoints = endpoints;
        }

        let start_raw =
            std::env::var("START_DATE").unwrap_or_else(|_| DEFAULT_START_DATE.to_string());
        let default_start_date = parse_input_date(&start_raw)
            .map_err(|_| AppError::Config(format!("START_DATE is not a valid date: {start_raw}")))?;

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            portal,
            default_start_date,
        })
    }
}
