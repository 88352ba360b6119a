use super::client::{build_client, header_map};
use super::payload::ReviewPayload;
use super::user_agents::{abbreviate, scraper_user_agent, UserAgentPool, SIMPLE_BOT_USER_AGENT};
use crate::config::{BotTiming, BotsConfig, SimConfig};
use crate::error::{Result, SimError};
use crate::metrics::{Counters, MetricsCollector, RunSummary};
use log::{error, info, warn};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::blocking::Client;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

/// Query strings appended to the target URL by bots that browse at random.
pub const API_PATHS: &[&str] = &[
    "",
    "?product_id=prod1234",
    "?product_id=test",
    "?product_id=xyz123",
];

/// Request-pattern profile of a simulated bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BotType {
    /// Fixed library User-Agent, rapid mixed requests
    Simple,
    /// Browser-like headers and slower pacing
    Browser,
    /// Fresh User-Agent on every request
    Rotating,
    /// Sequential product walk, read-heavy
    Scraper,
    /// POST-only with minimal delay
    Flood,
}

impl BotType {
    pub const ALL: [BotType; 5] = [
        BotType::Simple,
        BotType::Browser,
        BotType::Rotating,
        BotType::Scraper,
        BotType::Flood,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BotType::Simple => "simple",
            BotType::Browser => "browser",
            BotType::Rotating => "rotating",
            BotType::Scraper => "scraper",
            BotType::Flood => "flood",
        }
    }

    /// Prefix of every progress line the bot prints.
    pub fn label(&self) -> &'static str {
        match self {
            BotType::Simple => "Simple Bot",
            BotType::Browser => "Browser Bot",
            BotType::Rotating => "Rotating UA Bot",
            BotType::Scraper => "Scraper Bot",
            BotType::Flood => "Flood Bot",
        }
    }

    /// Name used in the line announcing a bot's run.
    pub fn description(&self) -> &'static str {
        match self {
            BotType::Simple => "simple bot",
            BotType::Browser => "browser-like bot",
            BotType::Rotating => "rotating user agent bot",
            BotType::Scraper => "scraper bot",
            BotType::Flood => "flood bot",
        }
    }

    /// Probability that a request is a GET rather than a POST.
    pub fn get_ratio(&self) -> f64 {
        match self {
            BotType::Simple | BotType::Browser | BotType::Rotating => 0.5,
            BotType::Scraper => 0.8,
            BotType::Flood => 0.0,
        }
    }

    pub fn timing<'a>(&self, config: &'a BotsConfig) -> &'a BotTiming {
        match self {
            BotType::Simple => &config.simple,
            BotType::Browser => &config.browser,
            BotType::Rotating => &config.rotating,
            BotType::Scraper => &config.scraper,
            BotType::Flood => &config.flood,
        }
    }
}

impl fmt::Display for BotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BotType {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        BotType::ALL
            .iter()
            .copied()
            .find(|bot| bot.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| SimError::UnknownBotType(s.to_string()))
    }
}

/// Parse bot type names, reporting and skipping the ones that are not recognised.
pub fn parse_bot_types<S: AsRef<str>>(names: &[S]) -> Vec<BotType> {
    names
        .iter()
        .filter_map(|name| match name.as_ref().parse::<BotType>() {
            Ok(bot) => Some(bot),
            Err(e) => {
                println!("Unknown bot type: {}", name.as_ref());
                warn!("{}", e);
                None
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannedRequest {
    Get { url: String },
    Post { url: String, payload: ReviewPayload },
}

impl PlannedRequest {
    pub fn method(&self) -> &'static str {
        match self {
            PlannedRequest::Get { .. } => "GET",
            PlannedRequest::Post { .. } => "POST",
        }
    }

    pub fn url(&self) -> &str {
        match self {
            PlannedRequest::Get { url } | PlannedRequest::Post { url, .. } => url,
        }
    }
}

/// Runs the bot behaviors against one target and tallies their requests.
pub struct BotSimulator {
    target_url: String,
    user_agents: UserAgentPool,
    bots: BotsConfig,
    counters: Arc<Counters>,
}

impl BotSimulator {
    pub fn new(target_url: &str, config: &SimConfig, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            target_url: target_url.to_string(),
            user_agents: UserAgentPool::new(config.user_agents.clone()),
            bots: config.bots.clone(),
            counters: Arc::new(Counters::new(metrics)),
        }
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    /// Default headers of the session a bot keeps for its whole run. The
    /// rotating bot sends its headers per request instead.
    pub fn session_headers(&self, bot: BotType) -> Vec<(&'static str, String)> {
        match bot {
            BotType::Simple | BotType::Flood => vec![
                ("User-Agent", SIMPLE_BOT_USER_AGENT.to_string()),
                ("Accept", "*/*".to_string()),
            ],
            BotType::Browser => vec![
                ("User-Agent", self.user_agents.random().to_string()),
                (
                    "Accept",
                    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                        .to_string(),
                ),
                ("Accept-Language", "en-US,en;q=0.5".to_string()),
                ("Accept-Encoding", "gzip, deflate, br".to_string()),
                ("Connection", "keep-alive".to_string()),
            ],
            BotType::Scraper => vec![
                ("User-Agent", scraper_user_agent()),
                ("Accept", "application/json, text/plain, */*".to_string()),
                ("Accept-Encoding", "gzip, deflate".to_string()),
            ],
            BotType::Rotating => Vec::new(),
        }
    }

    fn rotating_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("User-Agent", self.user_agents.random().to_string()),
            ("Accept", "application/json, text/plain, */*".to_string()),
            ("Content-Type", "application/json".to_string()),
        ]
    }

    /// Decide the method, URL and body of request `index` for `bot`.
    /// `visited` carries the browser bot's history between calls.
    pub fn plan_request<R: Rng>(
        &self,
        bot: BotType,
        index: usize,
        visited: &mut Vec<String>,
        rng: &mut R,
    ) -> PlannedRequest {
        let path = match bot {
            BotType::Browser => {
                if !visited.is_empty() && rng.gen_bool(0.3) {
                    visited.choose(rng).cloned().unwrap_or_default()
                } else {
                    let path = random_api_path(rng);
                    visited.push(path.clone());
                    path
                }
            }
            BotType::Scraper => format!("?product_id=prod{:04}", index % 100),
            _ => random_api_path(rng),
        };

        if rng.gen_bool(bot.get_ratio()) {
            PlannedRequest::Get {
                url: format!("{}{}", self.target_url, path),
            }
        } else {
            PlannedRequest::Post {
                url: self.target_url.clone(),
                payload: ReviewPayload::bot(index),
            }
        }
    }

    fn build_session(&self, bot: BotType) -> Result<Client> {
        let timing = bot.timing(&self.bots);
        let headers = header_map(&self.session_headers(bot))?;
        build_client(timing.timeout(), headers)
    }

    /// Run `num_requests` requests with the behavior of `bot`.
    pub fn run_bot(&self, bot: BotType, num_requests: usize) -> Result<()> {
        let session = self.build_session(bot)?;
        let timing = bot.timing(&self.bots);
        let mut visited = Vec::new();
        let mut rng = rand::thread_rng();

        println!(
            "Starting {} simulation with {} requests",
            bot.description(),
            num_requests
        );

        for i in 0..num_requests {
            let planned = self.plan_request(bot, i, &mut visited, &mut rng);
            let rotating = if bot == BotType::Rotating {
                Some(header_map(&self.rotating_headers())?)
            } else {
                None
            };

            let mut request = match &planned {
                PlannedRequest::Get { url } => session.get(url),
                PlannedRequest::Post { url, payload } => session.post(url).json(payload),
            };
            if let Some(headers) = &rotating {
                request = request.headers(headers.clone());
            }

            match request.send() {
                Ok(resp) => {
                    println!(
                        "{} {} {}/{}: {} - Status: {}",
                        bot.label(),
                        planned.method(),
                        i + 1,
                        num_requests,
                        planned.url(),
                        resp.status().as_u16()
                    );
                    if let Some(ua) = rotating
                        .as_ref()
                        .and_then(|h| h.get("user-agent"))
                        .and_then(|v| v.to_str().ok())
                    {
                        println!("  User-Agent: {}...", abbreviate(ua));
                    }
                    self.counters.record_success(bot.name());
                }
                Err(e) => {
                    println!(
                        "{} {} {}/{}: {} - Error: {}",
                        bot.label(),
                        planned.method(),
                        i + 1,
                        num_requests,
                        planned.url(),
                        e
                    );
                    self.counters.record_failure(bot.name());
                }
            }

            thread::sleep(timing.delay.sample());
        }

        Ok(())
    }

    /// Run every bot type on its own thread and wait for all of them.
    pub fn simulate_botnet(self: &Arc<Self>, bot_types: &[BotType], requests_per_bot: usize) -> RunSummary {
        self.counters.reset();

        println!("Starting botnet simulation with {} bot types", bot_types.len());
        let start = Instant::now();

        let handles: Vec<_> = bot_types
            .iter()
            .copied()
            .map(|bot| {
                let simulator = Arc::clone(self);
                println!("Starting {} bot thread", bot);
                let handle = thread::spawn(move || simulator.run_bot(bot, requests_per_bot));
                (bot, handle)
            })
            .collect();

        for (bot, handle) in handles {
            match handle.join() {
                Ok(Ok(())) => info!("{} bot finished", bot),
                Ok(Err(e)) => error!("{} bot aborted: {}", bot, e),
                Err(_) => error!("{} bot thread panicked", bot),
            }
        }

        let summary = RunSummary::new(start.elapsed(), self.counters.snapshot());
        summary.print("Botnet simulation complete");
        summary
    }
}

fn random_api_path<R: Rng>(rng: &mut R) -> String {
    API_PATHS.choose(rng).copied().unwrap_or_default().to_string()
}
