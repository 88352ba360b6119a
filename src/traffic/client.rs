use crate::error::{Result, SimError};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

/// Build a header map from name/value pairs, rejecting values that are not
/// valid HTTP header text.
pub fn header_map<N, V>(pairs: &[(N, V)]) -> Result<HeaderMap>
where
    N: AsRef<str>,
    V: AsRef<str>,
{
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        let name_ref = name.as_ref();
        let header_name =
            HeaderName::from_bytes(name_ref.as_bytes()).map_err(|e| SimError::InvalidHeader {
                name: name_ref.to_string(),
                reason: e.to_string(),
            })?;
        let header_value =
            HeaderValue::from_str(value.as_ref()).map_err(|e| SimError::InvalidHeader {
                name: name_ref.to_string(),
                reason: e.to_string(),
            })?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

/// Pooled blocking client with a fixed timeout and default headers.
pub fn build_client(timeout: Duration, headers: HeaderMap) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_map_accepts_valid_pairs() {
        let headers = header_map(&[("User-Agent", "Python-urllib/3.8"), ("Accept", "*/*")]).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["user-agent"], "Python-urllib/3.8");
    }

    #[test]
    fn test_header_map_rejects_bad_value() {
        let result = header_map(&[("User-Agent", "bad\nvalue")]);
        assert!(matches!(result, Err(SimError::InvalidHeader { .. })));
    }

    #[test]
    fn test_header_map_rejects_bad_name() {
        let result = header_map(&[("Bad Header", "x")]);
        assert!(result.is_err());
    }
}
