use super::client::{build_client, header_map};
use super::payload::{random_product_id, ReviewPayload};
use super::user_agents::UserAgentPool;
use crate::config::{HumanConfig, SimConfig};
use crate::error::Result;
use crate::metrics::{Counters, MetricsCollector, RunSummary};
use log::error;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Number of product-page views a session makes before it starts writing reviews.
pub const VIEWS_PER_SESSION: usize = 5;

const PRODUCTS_OF_INTEREST: usize = 3;

/// Simulates people browsing products and occasionally leaving a review.
pub struct HumanSimulator {
    target_url: String,
    user_agents: UserAgentPool,
    config: HumanConfig,
    counters: Arc<Counters>,
}

impl HumanSimulator {
    pub fn new(target_url: &str, config: &SimConfig, metrics: Arc<MetricsCollector>) -> Self {
        Self {
            target_url: target_url.to_string(),
            user_agents: UserAgentPool::new(config.user_agents.clone()),
            config: config.human.clone(),
            counters: Arc::new(Counters::new(metrics)),
        }
    }

    pub fn counters(&self) -> &Arc<Counters> {
        &self.counters
    }

    /// One user's visit: a few GETs of products, then reviews with whatever
    /// request budget is left.
    pub fn run_session(&self, user_id: usize, requests_per_user: usize) -> Result<()> {
        let headers = header_map(&[
            ("User-Agent", self.user_agents.random()),
            ("Accept", "application/json, text/plain, */*"),
            ("Accept-Language", "en-US,en;q=0.5"),
            ("Content-Type", "application/json"),
        ])?;
        let session = build_client(Duration::from_secs(self.config.timeout_secs), headers)?;

        let product_ids: Vec<String> = (0..PRODUCTS_OF_INTEREST).map(|_| random_product_id()).collect();
        let mut rng = rand::thread_rng();

        for i in 0..requests_per_user.min(VIEWS_PER_SESSION) {
            let product_id = product_ids.choose(&mut rng).cloned().unwrap_or_default();
            let url = format!("{}?product_id={}", self.target_url, product_id);

            match session.get(&url).send() {
                Ok(resp) => {
                    println!(
                        "Human {} - GET {}/{}: product_id={} - Status: {}",
                        user_id,
                        i + 1,
                        requests_per_user,
                        product_id,
                        resp.status().as_u16()
                    );
                    self.counters.record_success("human");
                }
                Err(e) => {
                    println!(
                        "Human {} - GET {}/{}: product_id={} - Error: {}",
                        user_id,
                        i + 1,
                        requests_per_user,
                        product_id,
                        e
                    );
                    self.counters.record_failure("human");
                }
            }

            thread::sleep(self.config.view_pause.sample());
        }

        for i in VIEWS_PER_SESSION..requests_per_user {
            let product_id = product_ids.choose(&mut rng).cloned().unwrap_or_default();
            let review = ReviewPayload::human(user_id, &product_id);

            match session.post(&self.target_url).json(&review).send() {
                Ok(resp) => {
                    println!(
                        "Human {} - POST {}/{}: product_id={} - Status: {}",
                        user_id,
                        i + 1,
                        requests_per_user,
                        product_id,
                        resp.status().as_u16()
                    );
                    self.counters.record_success("human");
                }
                Err(e) => {
                    println!(
                        "Human {} - POST {}/{}: product_id={} - Error: {}",
                        user_id,
                        i + 1,
                        requests_per_user,
                        product_id,
                        e
                    );
                    self.counters.record_failure("human");
                }
            }

            thread::sleep(self.config.review_pause.sample());
        }

        println!("Human {} session complete", user_id);
        Ok(())
    }

    /// Run `num_users` sessions in parallel, one worker per user.
    pub fn simulate(self: &Arc<Self>, num_users: usize, requests_per_user: usize) -> RunSummary {
        self.counters.reset();

        println!(
            "Starting human traffic simulation with {} users making {} requests each",
            num_users, requests_per_user
        );
        let start = Instant::now();

        let handles: Vec<_> = (1..=num_users)
            .map(|user_id| {
                let simulator = Arc::clone(self);
                let handle = thread::spawn(move || simulator.run_session(user_id, requests_per_user));
                (user_id, handle)
            })
            .collect();

        for (user_id, handle) in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Human {} session aborted: {}", user_id, e),
                Err(_) => error!("Human {} session panicked", user_id),
            }
        }

        let summary = RunSummary::new(start.elapsed(), self.counters.snapshot());
        summary.print("Human traffic simulation complete");
        summary
    }
}
