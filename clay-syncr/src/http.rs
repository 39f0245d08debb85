//! Shared HTTP client setup

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use std::time::Duration;
use tracing::debug;

use crate::Result;

/// Every remote call gives up after ten seconds
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// User-Agent sent with every request
pub const USER_AGENT: &str = concat!("clay-syncr/", env!("CARGO_PKG_VERSION"));

/// Build the HTTP client used by all syncrs
pub fn build_client() -> Result<Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(
        header::USER_AGENT,
        header::HeaderValue::from_static(USER_AGENT),
    );

    let client = Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

/// Transport seam for the XML-speaking syncrs
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url`, returning the body text
    async fn get_text(&self, url: &str) -> Result<String>;

    /// POST a urlencoded form to `url`, returning the body text
    async fn post_form(&self, url: &str, params: &[(&str, String)]) -> Result<String>;
}

/// `Fetch` over a reqwest client, optionally sending a bearer token
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    bearer_token: Option<String>,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: build_client()?,
            bearer_token: None,
        })
    }

    /// Attach `Authorization: Bearer <token>` to every request (empty = none)
    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.bearer_token = if token.is_empty() {
            None
        } else {
            Some(token.to_string())
        };
        self
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn get_text(&self, url: &str) -> Result<String> {
        debug!(url, "GET");
        let body = self
            .authorize(self.client.get(url))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }

    async fn post_form(&self, url: &str, params: &[(&str, String)]) -> Result<String> {
        debug!(url, "POST");
        let body = self
            .authorize(self.client.post(url))
            .form(params)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(body)
    }
}

/// Canned responses keyed by URL substring, for tests
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct FakeFetch {
        routes: Vec<(String, String)>,
        pub requests: Mutex<Vec<String>>,
    }

    impl FakeFetch {
        pub fn new() -> Self {
            Self::default()
        }

        /// The first route whose needle is contained in the URL answers
        pub fn route(mut self, needle: &str, body: &str) -> Self {
            self.routes.push((needle.to_string(), body.to_string()));
            self
        }

        fn answer(&self, url: &str) -> Result<String> {
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(url.to_string());
            }
            self.routes
                .iter()
                .find(|(needle, _)| url.contains(needle.as_str()))
                .map(|(_, body)| body.clone())
                .ok_or_else(|| crate::SyncError::NotFound(format!("no fake route for {}", url)))
        }
    }

    #[async_trait]
    impl Fetch for FakeFetch {
        async fn get_text(&self, url: &str) -> Result<String> {
            self.answer(url)
        }

        async fn post_form(&self, url: &str, _params: &[(&str, String)]) -> Result<String> {
            self.answer(url)
        }
    }
}
