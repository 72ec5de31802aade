//! C8 auth bootstrap: loads an `AuthCapture` from a saved HAR export,
//! falling back to a cURL command file when the HAR is missing or
//! unusable (spec §4.8).

use midas_models::{AuthCapture, MidasError};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct Har {
    log: HarLog,
}

#[derive(Debug, Deserialize)]
struct HarLog {
    entries: Vec<HarEntry>,
}

#[derive(Debug, Deserialize)]
struct HarEntry {
    request: HarRequest,
}

#[derive(Debug, Deserialize)]
struct HarRequest {
    method: String,
    url: String,
    headers: Vec<HarHeader>,
}

#[derive(Debug, Deserialize)]
struct HarHeader {
    name: String,
    value: String,
}

/// The outcome of a (re)load, surfaced at `POST /api/xiaohongshu/capture/refresh`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CaptureRefreshReport {
    pub request_url_host: String,
    pub request_method: String,
    pub headers_count: usize,
    pub empty_keys: Vec<String>,
}

const STANDARD_HEADERS: &[&str] = &["cookie", "user-agent", "origin", "referer"];

fn capture_from_headers(method: String, url: &str, headers: Vec<(String, String)>) -> (AuthCapture, CaptureRefreshReport) {
    let mut capture = AuthCapture::default();
    let mut empty_keys = Vec::new();

    for (name, value) in &headers {
        if value.trim().is_empty() {
            empty_keys.push(name.clone());
        }
        let lower = name.to_lowercase();
        match lower.as_str() {
            "cookie" => capture.cookie = value.clone(),
            "user-agent" => capture.user_agent = value.clone(),
            "origin" => capture.origin = value.clone(),
            "referer" => capture.referer = value.clone(),
            other if !STANDARD_HEADERS.contains(&other) => {
                capture.extra_headers.insert(name.clone(), value.clone());
            }
            _ => {}
        }
    }

    let host = url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default();

    let report = CaptureRefreshReport {
        request_url_host: host,
        request_method: method,
        headers_count: headers.len(),
        empty_keys,
    };
    (capture, report)
}

fn select_har_entry<'a>(har: &'a Har, allowed_hosts: &[String]) -> Option<&'a HarEntry> {
    har.log
        .entries
        .iter()
        .find(|e| {
            url::Url::parse(&e.request.url)
                .ok()
                .and_then(|u| u.host_str().map(str::to_string))
                .map(|h| allowed_hosts.iter().any(|a| a == &h))
                .unwrap_or(false)
        })
        .or_else(|| har.log.entries.first())
}

fn parse_har(raw: &str, allowed_hosts: &[String]) -> Option<(AuthCapture, CaptureRefreshReport)> {
    let har: Har = serde_json::from_str(raw).ok()?;
    let entry = select_har_entry(&har, allowed_hosts)?;
    let headers = entry
        .request
        .headers
        .iter()
        .map(|h| (h.name.clone(), h.value.clone()))
        .collect();
    Some(capture_from_headers(entry.request.method.clone(), &entry.request.url, headers))
}

/// Splits on whitespace while respecting single/double-quoted segments,
/// enough for the command text a browser's "copy as cURL" produces.
fn shell_words(raw: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in raw.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn parse_curl(raw: &str) -> Option<(AuthCapture, CaptureRefreshReport)> {
    let tokens = shell_words(raw);
    let mut url = None;
    let mut method = "GET".to_string();
    let mut headers = Vec::new();

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i].as_str() {
            "-H" | "--header" => {
                if let Some(h) = tokens.get(i + 1) {
                    if let Some((name, value)) = h.split_once(':') {
                        headers.push((name.trim().to_string(), value.trim().to_string()));
                    }
                }
                i += 1;
            }
            "-X" | "--request" => {
                if let Some(m) = tokens.get(i + 1) {
                    method = m.clone();
                }
                i += 1;
            }
            token if token.starts_with("http") => url = Some(token.to_string()),
            _ => {}
        }
        i += 1;
    }

    Some(capture_from_headers(method, &url?, headers))
}

/// Loads the initial `AuthCapture` for the fetcher: try the HAR file,
/// fall back to the cURL file when the HAR is missing or unparsable.
pub fn load_initial_capture(
    har_path: &Path,
    curl_path: &Path,
    allowed_hosts: &[String],
) -> Result<(AuthCapture, CaptureRefreshReport), MidasError> {
    if let Ok(raw) = std::fs::read_to_string(har_path) {
        if let Some((capture, report)) = parse_har(&raw, allowed_hosts) {
            info!(path = %har_path.display(), "loaded auth capture from HAR");
            return Ok((capture, report));
        }
        warn!(path = %har_path.display(), "HAR capture present but unusable, falling back to cURL");
    }

    let raw = std::fs::read_to_string(curl_path)
        .map_err(|e| MidasError::dependency_missing(format!("no usable HAR or cURL capture file: {e}")))?;
    let (capture, report) =
        parse_curl(&raw).ok_or_else(|| MidasError::dependency_missing("cURL capture file could not be parsed"))?;
    info!(path = %curl_path.display(), "loaded auth capture from cURL fallback");
    Ok((capture, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_curl_extracts_url_and_headers() {
        let raw = r#"curl 'https://edith.xiaohongshu.com/api/sns/web/v1/feed/abc' -H 'cookie: a=b; c=d' -H 'user-agent: Mozilla/5.0' -H 'x-sign: ' "#;
        let (capture, report) = parse_curl(raw).unwrap();
        assert_eq!(capture.cookie, "a=b; c=d");
        assert_eq!(capture.user_agent, "Mozilla/5.0");
        assert_eq!(report.request_url_host, "edith.xiaohongshu.com");
        assert_eq!(report.empty_keys, vec!["x-sign".to_string()]);
    }

    #[test]
    fn parse_har_picks_allowlisted_entry() {
        let raw = r#"{
            "log": {
                "entries": [
                    {"request": {"method": "GET", "url": "https://unrelated.example.com/x", "headers": []}},
                    {"request": {"method": "GET", "url": "https://edith.xiaohongshu.com/api/sns/web/v1/feed/abc",
                        "headers": [{"name": "Cookie", "value": "a=b"}]}}
                ]
            }
        }"#;
        let allowed = vec!["edith.xiaohongshu.com".to_string()];
        let (capture, report) = parse_har(raw, &allowed).unwrap();
        assert_eq!(capture.cookie, "a=b");
        assert_eq!(report.request_url_host, "edith.xiaohongshu.com");
    }
}
