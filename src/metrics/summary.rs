use super::Tally;
use std::time::Duration;

/// Outcome of one simulation run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunSummary {
    pub elapsed: Duration,
    pub tally: Tally,
}

impl RunSummary {
    pub fn new(elapsed: Duration, tally: Tally) -> Self {
        Self { elapsed, tally }
    }

    pub fn total(&self) -> u64 {
        self.tally.total()
    }

    /// Percentage of requests that completed, 0 when nothing was sent.
    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        self.tally.success as f64 / self.total() as f64 * 100.0
    }

    pub fn requests_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.total() as f64 / secs
    }

    /// Combine two runs that executed side by side.
    pub fn merge(&self, other: &RunSummary) -> RunSummary {
        RunSummary {
            elapsed: self.elapsed.max(other.elapsed),
            tally: Tally {
                success: self.tally.success + other.tally.success,
                failure: self.tally.failure + other.tally.failure,
            },
        }
    }

    pub fn print(&self, title: &str) {
        println!("\n{}", title);
        println!("Total time: {:.2} seconds", self.elapsed.as_secs_f64());
        println!("Total requests: {}", self.total());
        println!("Successful requests: {}", self.tally.success);
        println!("Failed requests: {}", self.tally.failure);
        println!("Success rate: {:.2}%", self.success_rate());
        println!("Requests per second: {:.2}", self.requests_per_second());
    }
}
