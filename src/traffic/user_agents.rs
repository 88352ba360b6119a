use rand::seq::SliceRandom;

/// Desktop browser User-Agents used when the config does not supply its own.
pub const FALLBACK_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36 Edg/91.0.864.59",
];

pub const SIMPLE_BOT_USER_AGENT: &str = "Python-urllib/3.8";

const SCRAPER_PYTHON_VERSIONS: &[&str] = &["3.6", "3.7", "3.8", "3.9"];

#[derive(Debug, Clone)]
pub struct UserAgentPool {
    agents: Vec<String>,
}

impl UserAgentPool {
    pub fn new(agents: Vec<String>) -> Self {
        Self { agents }
    }

    pub fn random(&self) -> &str {
        self.agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or(FALLBACK_USER_AGENTS[0])
    }

}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self::new(FALLBACK_USER_AGENTS.iter().map(|ua| ua.to_string()).collect())
    }
}

pub fn scraper_user_agent() -> String {
    let version = SCRAPER_PYTHON_VERSIONS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("3.8");
    format!("WebScraper/1.0 (Custom Scraper; Python/{})", version)
}

/// First 50 characters of a User-Agent, for per-request log lines.
pub fn abbreviate(user_agent: &str) -> String {
    user_agent.chars().take(50).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pool_draws_known_agents() {
        let pool = UserAgentPool::default();
        for _ in 0..20 {
            assert!(FALLBACK_USER_AGENTS.contains(&pool.random()));
        }
    }

    #[test]
    fn test_empty_pool_still_yields_agent() {
        let pool = UserAgentPool::new(Vec::new());
        assert_eq!(pool.random(), FALLBACK_USER_AGENTS[0]);
    }

    #[test]
    fn test_scraper_user_agent_format() {
        let ua = scraper_user_agent();
        assert!(ua.starts_with("WebScraper/1.0 (Custom Scraper; Python/3."));
        assert!(ua.ends_with(')'));
    }

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate(FALLBACK_USER_AGENTS[0]).chars().count(), 50);
        assert_eq!(abbreviate("short"), "short");
    }
}
