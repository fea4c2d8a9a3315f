//! Ferret image API adapter.
//!
//! One GET per lookup against a fixed endpoint; the JSON body must carry a
//! non-empty `url` field.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use ferretbot_core::{errors::Error, ports::ImageSource, FetchError, Result};

#[derive(Clone, Debug)]
pub struct FerretApiClient {
    endpoint: String,
    http: reqwest::Client,
}

impl FerretApiClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build error: {e}")))?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }
}

#[async_trait]
impl ImageSource for FerretApiClient {
    async fn fetch(&self) -> std::result::Result<String, FetchError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        let url = extract_url(&body)?;
        debug!(%url, "ferret api returned url");
        Ok(url)
    }
}

fn extract_url(body: &serde_json::Value) -> std::result::Result<String, FetchError> {
    body.get("url")
        .and_then(|u| u.as_str())
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .ok_or(FetchError::MissingUrl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn url_field_is_extracted() {
        let body = json!({ "url": "https://polecat.me/ferret/42.jpg", "id": 42 });
        assert_eq!(
            extract_url(&body).unwrap(),
            "https://polecat.me/ferret/42.jpg"
        );
    }

    #[test]
    fn missing_or_empty_url_is_an_error() {
        assert_eq!(extract_url(&json!({})), Err(FetchError::MissingUrl));
        assert_eq!(extract_url(&json!({ "url": "" })), Err(FetchError::MissingUrl));
        assert_eq!(extract_url(&json!({ "url": 7 })), Err(FetchError::MissingUrl));
        assert_eq!(extract_url(&json!(["x"])), Err(FetchError::MissingUrl));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_request_error() {
        let client =
            FerretApiClient::new("http://127.0.0.1:1/api/ferret", Duration::from_millis(500))
                .unwrap();
        match client.fetch().await {
            Err(FetchError::Request(_)) => {}
            other => panic!("expected request error, got {other:?}"),
        }
    }
}
