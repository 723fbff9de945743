//! One bounded GET per call. Retry policy belongs to the caller.

use std::future::Future;
use std::time::Duration;

use reqwest::{redirect, Client};
use thiserror::Error;
use tracing::debug;

use crate::utils::constants::{MAX_REDIRECTS, USER_AGENT};

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("too many redirects for {url}, is the URL correct?")]
    TooManyRedirects { url: String },

    #[error("{url} answered with HTTP status {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Other { url: String, message: String },
}

/// A remote source of raw bytes.
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// [`Fetcher`] over HTTP(S).
///
/// Cloning is cheap; the inner [`reqwest::Client`] is reference-counted.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .redirect(redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| FetchError::Other {
                url: String::new(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send {
        let client = self.client.clone();
        let url = url.to_string();

        async move {
            debug!(%url, ?timeout, "fetching");
            let response = client
                .get(&url)
                .timeout(timeout)
                .send()
                .await
                .map_err(|e| classify(&url, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    url,
                    status: status.as_u16(),
                });
            }

            let body = response.bytes().await.map_err(|e| classify(&url, e))?;
            debug!(%url, bytes = body.len(), "fetched");
            Ok(body.to_vec())
        }
    }
}

fn classify(url: &str, err: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if err.is_timeout() {
        FetchError::Timeout { url }
    } else if err.is_redirect() {
        FetchError::TooManyRedirects { url }
    } else if let Some(status) = err.status() {
        FetchError::Status {
            url,
            status: status.as_u16(),
        }
    } else {
        FetchError::Other {
            url,
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_url_is_classified_as_other() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher
            .fetch("no_valid_url_supplied", Duration::from_secs(1))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Other { .. }));
    }

    #[tokio::test]
    #[ignore = "needs a DNS resolver"]
    async fn test_unresolvable_host_fails() {
        let fetcher = HttpFetcher::new().unwrap();
        let result = fetcher
            .fetch("http://does-not-resolve.invalid", Duration::from_secs(5))
            .await;

        assert!(result.is_err());
    }
}
