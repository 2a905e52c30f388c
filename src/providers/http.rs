use crate::config::IngestConfig;
use crate::error::FetchFailure;
use anyhow::Result;
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

/// Longest slice of a response body kept in diagnostics.
const MAX_DIAGNOSTIC_LEN: usize = 256;

/// Largest success body accepted from a ticker endpoint.
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Builds the HTTP client shared by every adapter of the pipeline.
pub fn build_client(config: &IngestConfig) -> Result<Client> {
    if config.accept_invalid_certs {
        warn!("TLS certificate verification is disabled for exchange requests");
    }
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.request_timeout())
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()?;
    Ok(client)
}

/// Issues `GET {endpoint}?symbol={symbol}` and returns the parsed JSON body of a 200 response.
pub async fn get_ticker(client: &Client, endpoint: &str, symbol: &str) -> Result<Value, FetchFailure> {
    let url = Url::parse_with_params(endpoint, &[("symbol", symbol)]).map_err(|e| {
        FetchFailure::InvalidEndpoint {
            url: endpoint.to_string(),
            reason: e.to_string(),
        }
    })?;
    debug!("Requesting price data from {}", url);

    let response = client.get(url).send().await?;
    let status = response.status();

    if status != StatusCode::OK {
        // The body only feeds diagnostics; failing to read it keeps the status classification.
        let body = read_capped(response, MAX_DIAGNOSTIC_LEN * 4)
            .await
            .ok()
            .and_then(|(bytes, _)| diagnostic_body(&String::from_utf8_lossy(&bytes)));
        return Err(FetchFailure::UnexpectedStatus {
            code: status.as_u16(),
            body,
        });
    }

    let (bytes, truncated) = read_capped(response, MAX_BODY_BYTES).await?;
    if truncated {
        return Err(FetchFailure::malformed(format!(
            "body exceeds {MAX_BODY_BYTES} bytes"
        )));
    }

    serde_json::from_slice(&bytes).map_err(|e| {
        FetchFailure::malformed(format!(
            "body is not JSON ({e}): {}",
            truncate(&String::from_utf8_lossy(&bytes), MAX_DIAGNOSTIC_LEN)
        ))
    })
}

/// Reads at most `limit` bytes of the body. The flag is set when more was available.
async fn read_capped(mut response: Response, limit: usize) -> Result<(Vec<u8>, bool), reqwest::Error> {
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let room = limit - body.len();
        if chunk.len() > room {
            body.extend_from_slice(&chunk[..room]);
            return Ok((body, true));
        }
        body.extend_from_slice(&chunk);
    }
    Ok((body, false))
}

/// Short description of a JSON value's shape for malformed-payload reasons.
pub fn describe_shape(value: &Value) -> String {
    truncate(&value.to_string(), MAX_DIAGNOSTIC_LEN)
}

fn diagnostic_body(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    // Prefer the compact JSON form when the exchange sent a structured error.
    let body = serde_json::from_str::<Value>(text)
        .map(|value| value.to_string())
        .unwrap_or_else(|_| text.to_string());
    Some(truncate(&body, MAX_DIAGNOSTIC_LEN))
}

fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => format!("{}...", &text[..index]),
        None => text.to_string(),
    }
}
