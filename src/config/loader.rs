use crate::error::{Result, SimError};
use log::{info, warn};
use rand::Rng;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::time::Duration;

/// Inclusive range of milliseconds a generator sleeps between requests.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl DelayRange {
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    pub const fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn is_valid(&self) -> bool {
        self.min_ms <= self.max_ms
    }

    /// Draw a uniform delay from the range.
    pub fn sample(&self) -> Duration {
        if self.min_ms >= self.max_ms {
            return Duration::from_millis(self.min_ms);
        }
        Duration::from_millis(rand::thread_rng().gen_range(self.min_ms..=self.max_ms))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BotTiming {
    pub timeout_secs: u64,
    pub delay: DelayRange,
}

impl BotTiming {
    const fn new(timeout_secs: u64, min_ms: u64, max_ms: u64) -> Self {
        Self {
            timeout_secs,
            delay: DelayRange::new(min_ms, max_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct BotsConfig {
    #[serde(default = "default_simple")]
    pub simple: BotTiming,
    #[serde(default = "default_browser")]
    pub browser: BotTiming,
    #[serde(default = "default_rotating")]
    pub rotating: BotTiming,
    #[serde(default = "default_scraper")]
    pub scraper: BotTiming,
    #[serde(default = "default_flood_bot")]
    pub flood: BotTiming,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HumanConfig {
    #[serde(default = "default_human_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_view_pause")]
    pub view_pause: DelayRange,
    #[serde(default = "default_review_pause")]
    pub review_pause: DelayRange,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FloodDefaults {
    #[serde(default = "default_flood_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_flood_user_agent")]
    pub user_agent: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct InjectionDefaults {
    #[serde(default = "default_injection_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct TableConfig {
    #[serde(default = "default_table_name")]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SimConfig {
    #[serde(default)]
    pub unprotected_url: Option<String>,
    #[serde(default)]
    pub protected_url: Option<String>,
    #[serde(default = "default_user_agents")]
    pub user_agents: Vec<String>,
    #[serde(default)]
    pub bots: BotsConfig,
    #[serde(default)]
    pub human: HumanConfig,
    #[serde(default)]
    pub flood: FloodDefaults,
    #[serde(default)]
    pub injection: InjectionDefaults,
    #[serde(default)]
    pub table: TableConfig,
}

// Default value functions
fn default_simple() -> BotTiming {
    BotTiming::new(5, 50, 200)
}

fn default_browser() -> BotTiming {
    BotTiming::new(10, 500, 2000)
}

fn default_rotating() -> BotTiming {
    BotTiming::new(5, 200, 1000)
}

fn default_scraper() -> BotTiming {
    BotTiming::new(5, 100, 500)
}

fn default_flood_bot() -> BotTiming {
    BotTiming::new(3, 10, 50)
}

fn default_human_timeout() -> u64 {
    10
}

fn default_view_pause() -> DelayRange {
    DelayRange::new(2_000, 8_000)
}

fn default_review_pause() -> DelayRange {
    DelayRange::new(5_000, 15_000)
}

fn default_flood_timeout() -> u64 {
    5
}

fn default_flood_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_injection_timeout() -> u64 {
    10
}

fn default_table_name() -> String {
    "waf-demo-product-reviews-demo".to_string()
}

fn default_user_agents() -> Vec<String> {
    crate::traffic::user_agents::FALLBACK_USER_AGENTS
        .iter()
        .map(|ua| ua.to_string())
        .collect()
}

impl Default for BotsConfig {
    fn default() -> Self {
        Self {
            simple: default_simple(),
            browser: default_browser(),
            rotating: default_rotating(),
            scraper: default_scraper(),
            flood: default_flood_bot(),
        }
    }
}

impl Default for HumanConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_human_timeout(),
            view_pause: default_view_pause(),
            review_pause: default_review_pause(),
        }
    }
}

impl Default for FloodDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: default_flood_timeout(),
            user_agent: default_flood_user_agent(),
        }
    }
}

impl Default for InjectionDefaults {
    fn default() -> Self {
        Self {
            timeout_secs: default_injection_timeout(),
        }
    }
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            name: default_table_name(),
        }
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            unprotected_url: None,
            protected_url: None,
            user_agents: default_user_agents(),
            bots: BotsConfig::default(),
            human: HumanConfig::default(),
            flood: FloodDefaults::default(),
            injection: InjectionDefaults::default(),
            table: TableConfig::default(),
        }
    }
}

impl SimConfig {
    pub fn from_file(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| SimError::ConfigIo {
            path: path.to_string(),
            source,
        })?;
        let config: SimConfig =
            serde_yaml::from_str(&content).map_err(|source| SimError::ConfigParse {
                path: path.to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`, falling back to built-in defaults when the file does not exist.
    /// A file that exists but fails to parse is still an error.
    pub fn load_or_default(path: &str) -> Result<Self> {
        match Self::from_file(path) {
            Ok(config) => {
                info!("Configuration loaded from {}", path);
                Ok(config)
            }
            Err(SimError::ConfigIo { source, .. }) if source.kind() == ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path);
                Ok(Self::default())
            }
            Err(e) => Err(e),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.user_agents.is_empty() {
            return Err(SimError::InvalidConfig(
                "user_agents must not be empty".to_string(),
            ));
        }
        for user_agent in &self.user_agents {
            check_header_value("user_agents", user_agent)?;
        }
        check_header_value("flood.user_agent", &self.flood.user_agent)?;

        let timings = [
            ("bots.simple", &self.bots.simple),
            ("bots.browser", &self.bots.browser),
            ("bots.rotating", &self.bots.rotating),
            ("bots.scraper", &self.bots.scraper),
            ("bots.flood", &self.bots.flood),
        ];
        for (name, timing) in timings {
            check_timeout(name, timing.timeout_secs)?;
            check_range(name, &timing.delay)?;
        }

        check_timeout("human", self.human.timeout_secs)?;
        check_range("human.view_pause", &self.human.view_pause)?;
        check_range("human.review_pause", &self.human.review_pause)?;
        check_timeout("flood", self.flood.timeout_secs)?;
        check_timeout("injection", self.injection.timeout_secs)?;

        if self.table.name.trim().is_empty() {
            return Err(SimError::InvalidConfig(
                "table.name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the target for the bot simulator. An explicit URL always wins.
    pub fn target_url(&self, explicit: Option<&str>, protected: bool) -> Result<String> {
        if let Some(url) = explicit {
            return Ok(url.to_string());
        }
        let (configured, key) = if protected {
            (&self.protected_url, "protected_url")
        } else {
            (&self.unprotected_url, "unprotected_url")
        };
        configured.clone().ok_or(SimError::MissingTarget(key))
    }
}

fn check_timeout(name: &str, timeout_secs: u64) -> Result<()> {
    if timeout_secs == 0 {
        return Err(SimError::InvalidConfig(format!(
            "{}.timeout_secs must be greater than zero",
            name
        )));
    }
    Ok(())
}

fn check_header_value(name: &str, value: &str) -> Result<()> {
    HeaderValue::from_str(value).map_err(|e| {
        SimError::InvalidConfig(format!("{}: {:?} is not a valid header value: {}", name, value, e))
    })?;
    Ok(())
}

fn check_range(name: &str, range: &DelayRange) -> Result<()> {
    if !range.is_valid() {
        return Err(SimError::InvalidConfig(format!(
            "{}: min_ms {} is greater than max_ms {}",
            name, range.min_ms, range.max_ms
        )));
    }
    Ok(())
}
