use clap::{Parser, Subcommand};
use log::{error, info};
use std::time::Duration;
use waf_traffic_sim::*;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/sim.yaml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Bot network simulation (botnet, human, mixed or flood mode)
    Bots {
        /// Target URL (falls back to the configured endpoints)
        #[arg(long)]
        url: Option<String>,

        /// Simulation mode: botnet, human, mixed or flood
        #[arg(long)]
        mode: Mode,

        /// Use the protected endpoint instead of the unprotected one
        #[arg(long)]
        protected: bool,

        /// Types of bots to simulate
        #[arg(long = "bot-types", num_args = 1.., default_values = ["simple", "browser", "rotating", "scraper"])]
        bot_types: Vec<String>,

        /// Requests per bot
        #[arg(long, default_value_t = 20)]
        bot_requests: usize,

        /// Number of human users to simulate
        #[arg(long, default_value_t = 3)]
        humans: usize,

        /// Requests per human user
        #[arg(long, default_value_t = 10)]
        human_requests: usize,

        /// Maximum duration in seconds
        #[arg(long, default_value_t = 60)]
        duration: u64,

        /// Print Prometheus request counters when the run ends
        #[arg(long)]
        metrics_dump: bool,
    },

    /// HTTP flood of form-encoded reviews, sent in bursts
    Flood {
        /// Target URL
        #[arg(long)]
        url: String,

        /// Total number of requests to send
        #[arg(long, default_value_t = 1000)]
        requests: usize,

        /// Number of concurrent requests within a burst
        #[arg(long, default_value_t = 25)]
        concurrent: usize,

        /// Number of requests per burst
        #[arg(long = "burst-size", default_value_t = 100)]
        burst_size: usize,

        /// Delay in seconds between bursts
        #[arg(long = "burst-delay", default_value_t = 1)]
        burst_delay: u64,

        /// User-Agent string (defaults to the configured one)
        #[arg(long = "user-agent")]
        user_agent: Option<String>,

        /// Print Prometheus request counters when the run ends
        #[arg(long)]
        metrics_dump: bool,
    },

    /// Code injection payloads posted as form data and JSON
    Inject {
        /// Target URL
        #[arg(long)]
        url: String,

        /// Type of injection attack: sql, nosql or cmd
        #[arg(long = "type")]
        kind: InjectionKind,

        /// Number of attack attempts
        #[arg(long, default_value_t = 7)]
        attempts: usize,

        /// Delay between attempts in seconds
        #[arg(long, default_value_t = 1.0)]
        delay: f64,
    },

    /// Inject one shell command and decode the output the handler echoes back
    Exfil {
        /// Target URL
        #[arg(long)]
        url: String,

        /// Command to inject
        #[arg(long, default_value = DEFAULT_EXFIL_COMMAND)]
        command: String,
    },

    /// Delete every item from the review table
    ClearTable {
        /// Table name (defaults to the configured one)
        #[arg(long)]
        table: Option<String>,
    },
}

fn run_bots(
    config: SimConfig,
    url: Option<String>,
    protected: bool,
    plan: SimulationPlan,
    duration: u64,
    metrics_dump: bool,
) -> Result<()> {
    let target_url = config.target_url(url.as_deref(), protected)?;

    println!("Starting API simulation against {}", target_url);
    println!("Mode: {}", plan.mode);
    println!(
        "API Type: {}",
        if protected { "Protected" } else { "Unprotected" }
    );
    println!("Press Ctrl+C to abort\n");

    let deadline = Deadline::exit_process_after(duration);
    let orchestrator = Orchestrator::new(&target_url, config);
    orchestrator.run(&plan);
    deadline.cancel();

    if metrics_dump {
        print!("\n{}", orchestrator.metrics().render());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_flood(
    config: &SimConfig,
    url: &str,
    requests: usize,
    concurrent: usize,
    burst_size: usize,
    burst_delay: u64,
    user_agent: Option<String>,
    metrics_dump: bool,
) -> Result<()> {
    let plan = FloodPlan::new(
        requests,
        concurrent,
        burst_size,
        Duration::from_secs(burst_delay),
    )?;
    let user_agent = user_agent.unwrap_or_else(|| config.flood.user_agent.clone());
    let client = flood_client(&user_agent, Duration::from_secs(config.flood.timeout_secs))?;

    println!("Starting HTTP flood simulation against {}", url);
    println!(
        "Total requests: {}, Concurrent per burst: {}",
        requests, concurrent
    );
    println!(
        "Requests per burst: {}, Delay between bursts: {}s",
        burst_size, burst_delay
    );
    println!("Press Ctrl+C to abort\n");

    let metrics = std::sync::Arc::new(MetricsCollector::new());
    let counters = std::sync::Arc::new(Counters::new(metrics.clone()));
    http_flood(url, &plan, client, counters);

    if metrics_dump {
        print!("\n{}", metrics.render());
    }
    Ok(())
}

fn run_inject(
    config: &SimConfig,
    url: &str,
    kind: InjectionKind,
    attempts: usize,
    delay: f64,
) -> Result<()> {
    let delay = Duration::try_from_secs_f64(delay)
        .map_err(|e| SimError::InvalidConfig(format!("invalid delay {}: {}", delay, e)))?;
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.injection.timeout_secs))
        .build()?;

    println!("Starting code injection attack simulation against {}", url);
    println!("Attack type: {}", kind);
    println!("Attack attempts: {}", attempts);
    println!("Press Ctrl+C to abort\n");

    let report = code_injection_attack(&client, url, kind, attempts, delay);
    report.print(url);
    Ok(())
}

fn run_exfil(config: &SimConfig, url: &str, command: &str) -> Result<()> {
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(config.injection.timeout_secs))
        .build()?;
    let report = command_injection_exfil(&client, url, command);
    info!("Command injection against {} finished: {:?}", url, report.outcome);
    Ok(())
}

fn run_clear_table(config: &SimConfig, table: Option<String>) -> Result<()> {
    let name = table.unwrap_or_else(|| config.table.name.clone());
    println!("Starting to clear table {}", name);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let table = DynamoReviewTable::from_env(&name).await;
        clear_table(&table, &name).await
    })?;

    println!("Done!");
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = SimConfig::load_or_default(&args.config)?;

    match args.command {
        Command::Bots {
            url,
            mode,
            protected,
            bot_types,
            bot_requests,
            humans,
            human_requests,
            duration,
            metrics_dump,
        } => {
            let plan = SimulationPlan {
                mode,
                bot_types: parse_bot_types(&bot_types),
                requests_per_bot: bot_requests,
                humans,
                requests_per_human: human_requests,
            };
            run_bots(config, url, protected, plan, duration, metrics_dump)
        }
        Command::Flood {
            url,
            requests,
            concurrent,
            burst_size,
            burst_delay,
            user_agent,
            metrics_dump,
        } => run_flood(
            &config,
            &url,
            requests,
            concurrent,
            burst_size,
            burst_delay,
            user_agent,
            metrics_dump,
        ),
        Command::Inject {
            url,
            kind,
            attempts,
            delay,
        } => run_inject(&config, &url, kind, attempts, delay),
        Command::Exfil { url, command } => run_exfil(&config, &url, &command),
        Command::ClearTable { table } => run_clear_table(&config, table),
    }
}

fn main() {
    env_logger::init();

    let args = Args::parse();
    info!("Loading configuration from: {}", args.config);

    if let Err(e) = run(args) {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bots_defaults() {
        let args = Args::try_parse_from(["waf-traffic-sim", "bots", "--mode", "botnet"]).unwrap();
        assert_eq!(args.config, "config/sim.yaml");
        match args.command {
            Command::Bots {
                mode,
                bot_types,
                bot_requests,
                humans,
                human_requests,
                duration,
                protected,
                ..
            } => {
                assert_eq!(mode, Mode::Botnet);
                assert_eq!(bot_types, vec!["simple", "browser", "rotating", "scraper"]);
                assert_eq!(bot_requests, 20);
                assert_eq!(humans, 3);
                assert_eq!(human_requests, 10);
                assert_eq!(duration, 60);
                assert!(!protected);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_bots_requires_mode() {
        assert!(Args::try_parse_from(["waf-traffic-sim", "bots"]).is_err());
        assert!(Args::try_parse_from(["waf-traffic-sim", "bots", "--mode", "storm"]).is_err());
    }

    #[test]
    fn test_bot_types_list() {
        let args = Args::try_parse_from([
            "waf-traffic-sim",
            "bots",
            "--mode",
            "flood",
            "--bot-types",
            "simple",
            "bogus",
        ])
        .unwrap();
        let Command::Bots { bot_types, .. } = args.command else {
            panic!("expected bots command");
        };
        assert_eq!(parse_bot_types(&bot_types), vec![BotType::Simple]);
    }

    #[test]
    fn test_flood_defaults() {
        let args =
            Args::try_parse_from(["waf-traffic-sim", "flood", "--url", "http://t/reviews"]).unwrap();
        match args.command {
            Command::Flood {
                requests,
                concurrent,
                burst_size,
                burst_delay,
                user_agent,
                ..
            } => {
                assert_eq!(requests, 1000);
                assert_eq!(concurrent, 25);
                assert_eq!(burst_size, 100);
                assert_eq!(burst_delay, 1);
                assert!(user_agent.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_flood_requires_url() {
        assert!(Args::try_parse_from(["waf-traffic-sim", "flood"]).is_err());
    }

    #[test]
    fn test_inject_parses_kind() {
        let args = Args::try_parse_from([
            "waf-traffic-sim",
            "inject",
            "--url",
            "http://t/reviews",
            "--type",
            "nosql",
            "--delay",
            "0.5",
        ])
        .unwrap();
        match args.command {
            Command::Inject {
                kind,
                attempts,
                delay,
                ..
            } => {
                assert_eq!(kind, InjectionKind::NoSql);
                assert_eq!(attempts, 7);
                assert_eq!(delay, 0.5);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Args::try_parse_from([
            "waf-traffic-sim",
            "inject",
            "--url",
            "http://t",
            "--type",
            "xss"
        ])
        .is_err());
    }

    #[test]
    fn test_exfil_default_command() {
        let args =
            Args::try_parse_from(["waf-traffic-sim", "exfil", "--url", "http://t/reviews"]).unwrap();
        match args.command {
            Command::Exfil { url, command } => {
                assert_eq!(url, "http://t/reviews");
                assert_eq!(command, DEFAULT_EXFIL_COMMAND);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = Args::try_parse_from([
            "waf-traffic-sim",
            "exfil",
            "--url",
            "http://t/reviews",
            "--command",
            "id",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Exfil { command, .. } if command == "id"));
    }

    #[test]
    fn test_clear_table() {
        let args = Args::try_parse_from(["waf-traffic-sim", "-c", "other.yaml", "clear-table"]).unwrap();
        assert_eq!(args.config, "other.yaml");
        assert!(matches!(args.command, Command::ClearTable { table: None }));
    }
}
