use super::bot::{BotSimulator, BotType};
use super::human::HumanSimulator;
use crate::config::SimConfig;
use crate::error::SimError;
use crate::metrics::{MetricsCollector, RunSummary};
use log::{error, info};
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Botnet,
    Human,
    Mixed,
    Flood,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Botnet => "botnet",
            Mode::Human => "human",
            Mode::Mixed => "mixed",
            Mode::Flood => "flood",
        };
        f.write_str(name)
    }
}

impl FromStr for Mode {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "botnet" => Ok(Mode::Botnet),
            "human" => Ok(Mode::Human),
            "mixed" => Ok(Mode::Mixed),
            "flood" => Ok(Mode::Flood),
            _ => Err(SimError::UnknownMode(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulationPlan {
    pub mode: Mode,
    pub bot_types: Vec<BotType>,
    pub requests_per_bot: usize,
    pub humans: usize,
    pub requests_per_human: usize,
}

impl SimulationPlan {
    /// Bot types to launch. Flood mode always includes the flood bot.
    pub fn effective_bot_types(&self) -> Vec<BotType> {
        let mut bots = self.bot_types.clone();
        if self.mode == Mode::Flood && !bots.contains(&BotType::Flood) {
            bots.push(BotType::Flood);
        }
        bots
    }
}

/// Summaries of the simulations a mode ran.
#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    pub bots: Option<RunSummary>,
    pub humans: Option<RunSummary>,
}

impl SimulationReport {
    pub fn combined(&self) -> RunSummary {
        match (&self.bots, &self.humans) {
            (Some(b), Some(h)) => b.merge(h),
            (Some(b), None) => *b,
            (None, Some(h)) => *h,
            (None, None) => RunSummary::default(),
        }
    }
}

/// Launches the bot and human simulators for a mode against one target.
pub struct Orchestrator {
    target_url: String,
    config: SimConfig,
    metrics: Arc<MetricsCollector>,
}

impl Orchestrator {
    pub fn new(target_url: &str, config: SimConfig) -> Self {
        Self {
            target_url: target_url.to_string(),
            config,
            metrics: Arc::new(MetricsCollector::new()),
        }
    }

    pub fn metrics(&self) -> &Arc<MetricsCollector> {
        &self.metrics
    }

    fn bot_simulator(&self) -> Arc<BotSimulator> {
        Arc::new(BotSimulator::new(
            &self.target_url,
            &self.config,
            Arc::clone(&self.metrics),
        ))
    }

    fn human_simulator(&self) -> Arc<HumanSimulator> {
        Arc::new(HumanSimulator::new(
            &self.target_url,
            &self.config,
            Arc::clone(&self.metrics),
        ))
    }

    pub fn run(&self, plan: &SimulationPlan) -> SimulationReport {
        match plan.mode {
            Mode::Botnet | Mode::Flood => {
                let bots = self.bot_simulator();
                let summary = bots.simulate_botnet(&plan.effective_bot_types(), plan.requests_per_bot);
                SimulationReport {
                    bots: Some(summary),
                    humans: None,
                }
            }
            Mode::Human => {
                let humans = self.human_simulator();
                let summary = humans.simulate(plan.humans, plan.requests_per_human);
                SimulationReport {
                    bots: None,
                    humans: Some(summary),
                }
            }
            Mode::Mixed => {
                let humans = self.human_simulator();
                let (users, per_user) = (plan.humans, plan.requests_per_human);
                let human_thread = thread::spawn(move || humans.simulate(users, per_user));

                let bots = self.bot_simulator();
                let bot_summary = bots.simulate_botnet(&plan.effective_bot_types(), plan.requests_per_bot);

                let human_summary = match human_thread.join() {
                    Ok(summary) => Some(summary),
                    Err(_) => {
                        error!("Human traffic thread panicked");
                        None
                    }
                };

                let report = SimulationReport {
                    bots: Some(bot_summary),
                    humans: human_summary,
                };
                report.combined().print("Mixed simulation complete");
                report
            }
        }
    }
}

/// Wall-clock cutoff for a run. Fires `on_expire` on a background thread
/// unless cancelled (or dropped) first.
pub struct Deadline {
    cancel: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Deadline {
    pub fn arm<F>(after: Duration, on_expire: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            if let Err(mpsc::RecvTimeoutError::Timeout) = rx.recv_timeout(after) {
                on_expire();
            }
        });
        Self {
            cancel: Some(tx),
            handle: Some(handle),
        }
    }

    /// Deadline that ends the process, abandoning in-flight requests.
    pub fn exit_process_after(duration_secs: u64) -> Self {
        info!("Maximum run time set to {}s", duration_secs);
        Self::arm(Duration::from_secs(duration_secs), move || {
            println!("\nMaximum duration of {}s reached. Exiting...", duration_secs);
            std::process::exit(0);
        })
    }

    pub fn cancel(mut self) {
        self.disarm();
    }

    fn disarm(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.disarm();
    }
}
