//! An in-memory [`CloudClient`] for tests.
//!
//! [`MockCloud`] serves canned listings split into pages in the shape the
//! resource kind's pagination protocol expects, plus single documents, and
//! remembers every request it saw.

use crate::{
    CloudClient, Error, Result,
    client::{Page, PageRequest, PageTarget},
    paginate::{Pagination, ResourceKind},
};
use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
    time::Duration,
};

const SCHEME: &str = "mock://";

#[derive(Debug, Clone)]
struct Listing {
    service: &'static str,
    pages: Vec<Vec<Value>>,
    collection_key: &'static str,
    pagination: Pagination,
    fail_on: Option<usize>,
}

/// Canned cloud. Listings and documents are keyed by path.
#[derive(Debug, Default)]
pub struct MockCloud {
    listings: HashMap<&'static str, Listing>,
    documents: HashMap<String, (&'static str, Value)>,
    delay: Option<Duration>,
    requests: Mutex<Vec<PageRequest>>,
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `items` as `K`'s listing, `page_size` entities per page. An
    /// empty listing is served as a single empty page, and an unpaged kind
    /// always gets a single page.
    pub fn with_listing<K: ResourceKind>(mut self, items: Vec<Value>, page_size: usize) -> Self {
        let pages = if items.is_empty() {
            vec![Vec::new()]
        } else if K::PAGINATION == Pagination::Unpaged {
            vec![items]
        } else {
            items
                .chunks(page_size.max(1))
                .map(<[Value]>::to_vec)
                .collect()
        };

        self.listings.insert(
            K::PATH,
            Listing {
                service: K::SERVICE,
                pages,
                collection_key: K::COLLECTION_KEY,
                pagination: K::PAGINATION,
                fail_on: None,
            },
        );
        self
    }

    /// Serve `body` for a plain GET of `path` on `service`.
    pub fn with_document(
        mut self,
        service: &'static str,
        path: impl Into<String>,
        body: Value,
    ) -> Self {
        self.documents.insert(path.into(), (service, body));
        self
    }

    /// Answer HTTP 500 for the zero-based page `index` of `K`'s listing.
    pub fn fail_on_page<K: ResourceKind>(mut self, index: usize) -> Self {
        if let Some(listing) = self.listings.get_mut(K::PATH) {
            listing.fail_on = Some(index);
        }
        self
    }

    /// Sleep before answering each request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn locate(target: &PageTarget) -> Option<(&str, usize)> {
        match target {
            PageTarget::Path { path, .. } => Some((path.as_str(), 0)),
            PageTarget::Url(url) => {
                let (path, index) = url.strip_prefix(SCHEME)?.rsplit_once("?page=")?;
                Some((path, index.parse().ok()?))
            }
        }
    }

    fn render(listing: &Listing, path: &str, index: usize) -> Value {
        let next = (index + 1 < listing.pages.len())
            .then(|| format!("{SCHEME}{path}?page={}", index + 1));

        let mut body = Map::new();
        body.insert(
            listing.collection_key.to_owned(),
            Value::Array(listing.pages[index].clone()),
        );
        match listing.pagination {
            Pagination::Linked => {
                body.insert("links".to_owned(), json!({ "next": next }));
            }
            Pagination::NextField => {
                if let Some(next) = next {
                    body.insert("next".to_owned(), Value::String(next));
                }
            }
            Pagination::RelLinks(key) => {
                let links: Vec<Value> = next
                    .into_iter()
                    .map(|href| json!({ "rel": "next", "href": href }))
                    .collect();
                body.insert(key.to_owned(), Value::Array(links));
            }
            Pagination::Unpaged => {}
        }
        Value::Object(body)
    }
}

#[async_trait]
impl CloudClient for MockCloud {
    async fn get_page(&self, request: &PageRequest) -> Result<Page> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let not_found = || Error::Status {
            service: request.service,
            status: 404,
            url: format!("{:?}", request.target),
        };

        let (path, index) = Self::locate(&request.target).ok_or_else(not_found)?;
        if let Some((service, body)) = self.documents.get(path) {
            if *service != request.service {
                return Err(not_found());
            }
            return Ok(Page::ok(body.clone()));
        }

        let listing = self.listings.get(path).ok_or_else(not_found)?;
        if index >= listing.pages.len() || listing.service != request.service {
            return Err(not_found());
        }
        if listing.fail_on == Some(index) {
            return Err(Error::Status {
                service: request.service,
                status: 500,
                url: format!("{SCHEME}{path}?page={index}"),
            });
        }

        Ok(Page::ok(Self::render(listing, path, index)))
    }
}
