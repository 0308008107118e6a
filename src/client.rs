//! The cloud API seam.
//!
//! Collection code only ever talks to a [`CloudClient`], which fetches one
//! page of a listing at a time. [`HttpCloudClient`] is the reqwest-backed
//! implementation used by the binary; tests script their own.

use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::{collections::HashMap, time::Duration};
use tracing::{debug, instrument};

/// Header that widens a listing to every project the token can see.
pub const ALL_PROJECTS_HEADER: &str = "x-auth-all-projects";

const AUTH_TOKEN_HEADER: &str = "x-auth-token";

/// Where a page lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageTarget {
    /// A path relative to the service endpoint, plus query parameters. Used
    /// for the first page of a listing and for single documents.
    Path {
        path: String,
        query: Vec<(String, String)>,
    },
    /// A previous page's next link. Either absolute, or a path starting
    /// with `/` that is resolved against the service endpoint.
    Url(String),
}

/// A request for a single page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Service type, used to resolve the endpoint.
    pub service: &'static str,
    pub target: PageTarget,
    /// Ask for resources across all projects.
    pub all_projects: bool,
    /// Extra static headers the resource kind needs (e.g. a microversion).
    pub headers: &'static [(&'static str, &'static str)],
}

/// One page of a listing, as returned by the remote API.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub status: u16,
    pub body: Value,
}

impl Page {
    /// A page with status 200 and the given body.
    pub fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    /// The remote answered "204 No Content".
    pub fn is_no_content(&self) -> bool {
        self.status == 204
    }
}

/// Fetches listing pages from the cloud API.
#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Fetch one page. Transport and decode errors are returned as-is.
    async fn get_page(&self, request: &PageRequest) -> Result<Page>;
}

/// Base URLs per service, keyed by service type then endpoint type
/// (`public`, `internal`, `admin`).
pub type Endpoints = HashMap<String, HashMap<String, String>>;

/// [`CloudClient`] over HTTP with a pre-issued token.
#[derive(Debug, Clone)]
pub struct HttpCloudClient {
    http: reqwest::Client,
    token: String,
    endpoint_type: String,
    endpoints: Endpoints,
}

impl HttpCloudClient {
    /// Create a client. `endpoint_type` selects which of the configured
    /// endpoints each service is reached through.
    pub fn new(
        token: impl Into<String>,
        endpoint_type: impl Into<String>,
        endpoints: Endpoints,
        request_timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            token: token.into(),
            endpoint_type: endpoint_type.into(),
            endpoints,
        })
    }

    fn base_url(&self, service: &'static str) -> Result<&str> {
        self.endpoints
            .get(service)
            .and_then(|by_type| by_type.get(&self.endpoint_type))
            .map(String::as_str)
            .ok_or_else(|| Error::MissingEndpoint {
                service,
                endpoint_type: self.endpoint_type.clone(),
            })
    }

    fn url(&self, request: &PageRequest) -> Result<String> {
        let join = |base: &str, path: &str| {
            format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
        };
        match &request.target {
            PageTarget::Path { path, .. } => Ok(join(self.base_url(request.service)?, path)),
            PageTarget::Url(url) if url.starts_with('/') => {
                Ok(join(self.base_url(request.service)?, url))
            }
            PageTarget::Url(url) => Ok(url.clone()),
        }
    }

    fn headers(&self, request: &PageRequest) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTH_TOKEN_HEADER,
            HeaderValue::from_str(&self.token)
                .map_err(|_| Error::Config("auth token is not a valid header value".into()))?,
        );
        if request.all_projects {
            headers.insert(ALL_PROJECTS_HEADER, HeaderValue::from_static("True"));
        }
        for &(name, value) in request.headers {
            headers.insert(
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            );
        }
        Ok(headers)
    }
}

#[async_trait]
impl CloudClient for HttpCloudClient {
    #[instrument(skip_all, fields(service = request.service))]
    async fn get_page(&self, request: &PageRequest) -> Result<Page> {
        let mut builder = self.http.get(self.url(request)?);
        if let PageTarget::Path { query, .. } = &request.target {
            builder = builder.query(query);
        }

        let resp = builder.headers(self.headers(request)?).send().await?;
        let status = resp.status();
        let url = resp.url().to_string();
        debug!(%url, status = status.as_u16(), "fetched page");

        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Page {
                status: status.as_u16(),
                body: Value::Null,
            });
        }
        if !status.is_success() {
            return Err(Error::Status {
                service: request.service,
                status: status.as_u16(),
                url,
            });
        }

        let bytes = resp.bytes().await?;
        let body = serde_json::from_slice(&bytes).map_err(|source| Error::Decode {
            what: "page body",
            source,
        })?;

        Ok(Page {
            status: status.as_u16(),
            body,
        })
    }
}
