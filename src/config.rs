//! Runtime configuration: credentials, endpoints and search parameters.
//!
//! Values come from a TOML file, then `G2B_SERVICE_KEY` for an unset service
//! key, then command-line overrides applied by the binary.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, ToolError};
use crate::io::http::Query;

/// Environment variable consulted when the config file has no service key.
pub const SERVICE_KEY_ENV: &str = "G2B_SERVICE_KEY";
/// Config file picked up from the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "g2b.toml";

const BID_NOTICE_URL: &str =
    "http://apis.data.go.kr/1230000/ad/BidPublicInfoService/getBidPblancListInfoThngPPSSrch";
const ORDER_PLAN_BASE_URL: &str = "http://apis.data.go.kr/1230000/ao/OrderPlanSttusService";
const ORDER_PLAN_OPERATIONS: [&str; 4] = [
    "getOrderPlanSttusListThngPPSSrch",
    "getOrderPlanSttusListCnstwkPPSSrch",
    "getOrderPlanSttusListServcPPSSrch",
    "getOrderPlanSttusListFrgcptPPSSrch",
];

/// Query parameters that change from page to page.
///
/// The fetcher owns `pageNo` and the credential; implementors supply the rest.
pub trait PageQuery {
    /// Rows requested per page (`numOfRows`).
    fn page_size(&self) -> u32;

    /// Search parameters other than `ServiceKey`, `numOfRows` and `pageNo`.
    fn search_query(&self) -> Query;
}

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub bid_notices: BidNoticeConfig,

    #[serde(default)]
    pub order_plans: OrderPlanConfig,
}

/// Credentials and transport settings shared by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Service key issued by data.go.kr.
    #[serde(default)]
    pub service_key: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            service_key: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Returns the service key, failing when none is configured.
    pub fn require_service_key(&self) -> Result<&str> {
        if self.service_key.trim().is_empty() {
            return Err(ToolError::InvalidConfig(format!(
                "service key is not set; add api.service_key or export {SERVICE_KEY_ENV}"
            )));
        }
        Ok(&self.service_key)
    }
}

/// Bid-notice endpoint and its search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BidNoticeConfig {
    #[serde(default = "default_bid_notice_url")]
    pub url: String,

    #[serde(flatten)]
    pub search: BidSearchParams,
}

impl Default for BidNoticeConfig {
    fn default() -> Self {
        Self {
            url: default_bid_notice_url(),
            search: BidSearchParams::default(),
        }
    }
}

/// Basis for the inquiry date range (`inqryDiv`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum InquiryBasis {
    /// Notice posting time.
    #[default]
    #[serde(rename = "1")]
    NoticePosted,
    /// Bid opening time.
    #[serde(rename = "2")]
    BidOpening,
}

impl InquiryBasis {
    pub fn code(self) -> &'static str {
        match self {
            InquiryBasis::NoticePosted => "1",
            InquiryBasis::BidOpening => "2",
        }
    }
}

/// Search parameters for bid notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidSearchParams {
    #[serde(default = "default_num_of_rows")]
    pub num_of_rows: u32,

    #[serde(default)]
    pub inqry_div: InquiryBasis,

    /// Range start, `YYYYMMDDHHMM`.
    #[serde(default)]
    pub inqry_bgn_dt: String,

    /// Range end, `YYYYMMDDHHMM`.
    #[serde(default)]
    pub inqry_end_dt: String,

    /// Optional notice-name substring filter.
    #[serde(default)]
    pub bid_ntce_nm: Option<String>,
}

impl Default for BidSearchParams {
    fn default() -> Self {
        Self {
            num_of_rows: default_num_of_rows(),
            inqry_div: InquiryBasis::default(),
            inqry_bgn_dt: String::new(),
            inqry_end_dt: String::new(),
            bid_ntce_nm: None,
        }
    }
}

impl BidSearchParams {
    pub fn validate(&self) -> Result<()> {
        validate_page_size(self.num_of_rows)?;
        validate_range("inqry", &self.inqry_bgn_dt, &self.inqry_end_dt, 12)
    }
}

impl PageQuery for BidSearchParams {
    fn page_size(&self) -> u32 {
        self.num_of_rows
    }

    fn search_query(&self) -> Query {
        let mut query = vec![
            ("inqryDiv".to_string(), self.inqry_div.code().to_string()),
            ("inqryBgnDt".to_string(), self.inqry_bgn_dt.clone()),
            ("inqryEndDt".to_string(), self.inqry_end_dt.clone()),
        ];
        if let Some(name) = self.bid_ntce_nm.as_deref().filter(|name| !name.is_empty()) {
            query.push(("bidNtceNm".to_string(), name.to_string()));
        }
        query
    }
}

/// Order-plan service and the operations queried under it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderPlanConfig {
    #[serde(default = "default_order_plan_base_url")]
    pub base_url: String,

    #[serde(default = "default_order_plan_operations")]
    pub operations: Vec<String>,

    #[serde(flatten)]
    pub search: OrderPlanSearchParams,
}

impl Default for OrderPlanConfig {
    fn default() -> Self {
        Self {
            base_url: default_order_plan_base_url(),
            operations: default_order_plan_operations(),
            search: OrderPlanSearchParams::default(),
        }
    }
}

/// Search parameters for order plans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPlanSearchParams {
    #[serde(default = "default_num_of_rows")]
    pub num_of_rows: u32,

    /// Business-name filter; an empty value matches everything.
    #[serde(default)]
    pub biz_nm: String,

    /// Order month range start, `YYYYMM`.
    #[serde(default)]
    pub order_bgn_ym: String,

    /// Order month range end, `YYYYMM`.
    #[serde(default)]
    pub order_end_ym: String,

    #[serde(default)]
    pub inqry_bgn_dt: String,

    #[serde(default)]
    pub inqry_end_dt: String,
}

impl Default for OrderPlanSearchParams {
    fn default() -> Self {
        Self {
            num_of_rows: default_num_of_rows(),
            biz_nm: String::new(),
            order_bgn_ym: String::new(),
            order_end_ym: String::new(),
            inqry_bgn_dt: String::new(),
            inqry_end_dt: String::new(),
        }
    }
}

impl OrderPlanSearchParams {
    pub fn validate(&self) -> Result<()> {
        validate_page_size(self.num_of_rows)?;
        validate_range("order", &self.order_bgn_ym, &self.order_end_ym, 6)?;
        validate_range("inqry", &self.inqry_bgn_dt, &self.inqry_end_dt, 12)
    }
}

impl PageQuery for OrderPlanSearchParams {
    fn page_size(&self) -> u32 {
        self.num_of_rows
    }

    fn search_query(&self) -> Query {
        vec![
            ("type".to_string(), "json".to_string()),
            ("bizNm".to_string(), self.biz_nm.clone()),
            ("orderBgnYm".to_string(), self.order_bgn_ym.clone()),
            ("orderEndYm".to_string(), self.order_end_ym.clone()),
            ("inqryBgnDt".to_string(), self.inqry_bgn_dt.clone()),
            ("inqryEndDt".to_string(), self.inqry_end_dt.clone()),
        ]
    }
}

impl AppConfig {
    /// Loads configuration from `path`, or from [`DEFAULT_CONFIG_FILE`] when it
    /// exists, or falls back to defaults. Fills the service key from the
    /// environment when the file leaves it empty.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) if !path.exists() => {
                return Err(ToolError::MissingInput(path.to_path_buf()));
            }
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        if config.api.service_key.is_empty() {
            if let Ok(key) = std::env::var(SERVICE_KEY_ENV) {
                config.api.service_key = key;
            }
        }
        Ok(config)
    }

    /// Parses a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading configuration");
        let source = fs::read_to_string(path)?;
        Self::from_toml(&source)
    }

    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }
}

fn validate_page_size(num_of_rows: u32) -> Result<()> {
    if num_of_rows == 0 {
        return Err(ToolError::InvalidConfig(
            "num_of_rows must be a positive integer".into(),
        ));
    }
    Ok(())
}

/// Checks a fixed-width digit range. Equal widths make lexicographic order
/// chronological.
fn validate_range(prefix: &str, begin: &str, end: &str, width: usize) -> Result<()> {
    for (suffix, value) in [("bgn", begin), ("end", end)] {
        if value.len() != width || !value.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(ToolError::InvalidConfig(format!(
                "{prefix}_{suffix} must be {width} digits, got '{value}'"
            )));
        }
    }
    if begin > end {
        return Err(ToolError::InvalidConfig(format!(
            "{prefix} range starts after it ends ({begin} > {end})"
        )));
    }
    Ok(())
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_num_of_rows() -> u32 {
    100
}

fn default_bid_notice_url() -> String {
    BID_NOTICE_URL.to_string()
}

fn default_order_plan_base_url() -> String {
    ORDER_PLAN_BASE_URL.to_string()
}

fn default_order_plan_operations() -> Vec<String> {
    ORDER_PLAN_OPERATIONS.iter().map(|op| op.to_string()).collect()
}
