//! Wikipedia summary lookup over the public REST API. Every failure mode is
//! folded into a user-facing string at this boundary; the tool never returns
//! an error value.

use crate::http::HttpClient;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_WIKIPEDIA_BASE_URL: &str = "https://en.wikipedia.org";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

pub const EMPTY_QUERY_MESSAGE: &str = "Error: Search query is empty.";
pub const NO_SUMMARY_MESSAGE: &str = "I found the page, but there's no summary available.";
pub const TIMEOUT_MESSAGE: &str = "Search timed out. Wikipedia might be slow right now.";

#[derive(Debug, Clone)]
pub struct WikiClient {
    http: HttpClient,
    base_url: String,
    request_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    extract: Option<String>,
}

impl WikiClient {
    pub fn new(http: HttpClient, base_url: String) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }

    #[cfg(test)]
    fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Fetches the page summary for `query`, returning a display string for
    /// every outcome (found, missing, unavailable, timed out).
    pub async fn summary(&self, query: &str) -> String {
        let query = query.trim();
        if query.is_empty() {
            return EMPTY_QUERY_MESSAGE.to_string();
        }

        let url = format!("{}/api/rest_v1/page/summary/{query}", self.base_url);
        let response = match self.http.get(&url, self.request_timeout).await {
            Ok(response) => response,
            Err(err) if err.is_timeout() => return TIMEOUT_MESSAGE.to_string(),
            Err(err) => return format!("An error occurred while searching: {err}"),
        };

        match response.status {
            200 => extract_summary(&response.body),
            404 => format!("I couldn't find any Wikipedia article for '{query}'."),
            status => format!("Wikipedia is currently unavailable (Status Code: {status})."),
        }
    }
}

fn extract_summary(body: &str) -> String {
    match serde_json::from_str::<SummaryResponse>(body) {
        Ok(SummaryResponse {
            extract: Some(extract),
        }) if !extract.trim().is_empty() => extract,
        // A well-formed page response without an extract is still a hit.
        Ok(_) => NO_SUMMARY_MESSAGE.to_string(),
        Err(_) => NO_SUMMARY_MESSAGE.to_string(),
    }
}
