//! Draining paginated listings.
//!
//! [`list_all`] walks a listing page by page until the remote says there is
//! nothing more, and hands back every entity at once. If any page fails the
//! whole listing fails; callers never see a partial collection.

use crate::{
    CloudClient, Error, Result,
    client::{Page, PageRequest, PageTarget},
};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// How a service tells us where the next page is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `{"links": {"next": "<url>"}}`
    Linked,
    /// `{"next": "<url>"}`
    NextField,
    /// `{"<key>": [{"rel": "next", "href": "<url>"}]}`
    RelLinks(&'static str),
    /// Everything comes in one response.
    Unpaged,
}

impl Pagination {
    /// Extract the next page's URL from a page body, if there is one.
    pub fn next_link(&self, body: &Value) -> Option<String> {
        let next = match self {
            Self::Unpaged => None,
            Self::Linked => body.get("links").and_then(|links| links.get("next")),
            Self::NextField => body.get("next"),
            Self::RelLinks(key) => body
                .get(*key)
                .and_then(Value::as_array)
                .and_then(|links| {
                    links
                        .iter()
                        .find(|link| link.get("rel").and_then(Value::as_str) == Some("next"))
                })
                .and_then(|link| link.get("href")),
        };

        next.and_then(Value::as_str)
            .filter(|href| !href.is_empty())
            .map(str::to_owned)
    }
}

/// A listable kind of remote resource.
pub trait ResourceKind {
    /// The entity a listing yields.
    type Entity: DeserializeOwned + Send;

    /// Service type the listing belongs to.
    const SERVICE: &'static str;
    /// Path of the listing, relative to the service endpoint.
    const PATH: &'static str;
    /// Key of the entity array in a page body.
    const COLLECTION_KEY: &'static str;
    const PAGINATION: Pagination;
    /// Static headers every request for this kind carries.
    const HEADERS: &'static [(&'static str, &'static str)] = &[];

    /// Pull the entities out of one page. An empty page or a body without
    /// the collection key yields no entities.
    fn extract(page: &Page) -> Result<Vec<Self::Entity>> {
        if page.is_no_content() {
            return Ok(Vec::new());
        }

        match page.body.get(Self::COLLECTION_KEY) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(items) => Vec::<Self::Entity>::deserialize(items).map_err(|source| {
                Error::Decode {
                    what: Self::COLLECTION_KEY,
                    source,
                }
            }),
        }
    }
}

/// Options for a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    /// List across every project, not just the token's own.
    pub all_projects: bool,
    /// Page size hint.
    pub limit: Option<u32>,
    /// Extra query filters.
    pub filters: Vec<(String, String)>,
}

impl ListOptions {
    pub fn all_projects(mut self, all_projects: bool) -> Self {
        self.all_projects = all_projects;
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((key.into(), value.into()));
        self
    }

    fn query(&self) -> Vec<(String, String)> {
        let mut query = self.filters.clone();
        if let Some(limit) = self.limit {
            query.push(("limit".to_owned(), limit.to_string()));
        }
        query
    }
}

/// Fetch every page of `K`'s listing and flatten them.
///
/// Stops when a page carries no next link, or when a page is empty. A next
/// link that was already followed is an error rather than a loop.
#[instrument(skip_all, fields(kind = K::COLLECTION_KEY))]
pub async fn list_all<K: ResourceKind>(
    client: &dyn CloudClient,
    opts: &ListOptions,
) -> Result<Vec<K::Entity>> {
    let mut request = PageRequest {
        service: K::SERVICE,
        target: PageTarget::Path {
            path: K::PATH.to_owned(),
            query: opts.query(),
        },
        all_projects: opts.all_projects,
        headers: K::HEADERS,
    };

    let mut entities = Vec::new();
    let mut followed = HashSet::new();
    let mut pages = 0usize;

    loop {
        let page = client.get_page(&request).await?;
        pages += 1;

        let batch = K::extract(&page)?;
        if batch.is_empty() {
            break;
        }
        entities.extend(batch);

        let Some(next) = K::PAGINATION.next_link(&page.body) else {
            break;
        };
        if !followed.insert(next.clone()) {
            return Err(Error::PaginationLoop(next));
        }
        request.target = PageTarget::Url(next);
    }

    debug!(pages, entities = entities.len(), "listing complete");
    Ok(entities)
}

/// Fetch a single document that is not a listing, e.g. the inventories of
/// one resource provider.
#[instrument(skip(client, headers))]
pub async fn get_document(
    client: &dyn CloudClient,
    service: &'static str,
    path: String,
    headers: &'static [(&'static str, &'static str)],
) -> Result<Value> {
    let request = PageRequest {
        service,
        target: PageTarget::Path {
            path,
            query: Vec::new(),
        },
        all_projects: false,
        headers,
    };
    let page = client.get_page(&request).await?;
    Ok(page.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockCloud;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Thing {
        id: String,
    }

    struct Things;

    impl ResourceKind for Things {
        type Entity = Thing;
        const SERVICE: &'static str = "test";
        const PATH: &'static str = "v1/things";
        const COLLECTION_KEY: &'static str = "things";
        const PAGINATION: Pagination = Pagination::Linked;
    }

    fn things(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({ "id": format!("thing-{i}") })).collect()
    }

    #[test]
    fn next_links() {
        let body = json!({ "links": { "self": "a", "next": "b" } });
        assert_eq!(Pagination::Linked.next_link(&body).as_deref(), Some("b"));
        assert_eq!(Pagination::NextField.next_link(&body), None);
        assert_eq!(Pagination::Unpaged.next_link(&body), None);

        let body = json!({ "links": { "next": null } });
        assert_eq!(Pagination::Linked.next_link(&body), None);

        let body = json!({ "next": "" });
        assert_eq!(Pagination::NextField.next_link(&body), None);

        let body = json!({
            "ports_links": [
                { "rel": "previous", "href": "p" },
                { "rel": "next", "href": "n" },
            ]
        });
        assert_eq!(
            Pagination::RelLinks("ports_links").next_link(&body).as_deref(),
            Some("n")
        );
    }

    #[test]
    fn extract_handles_missing_and_empty() {
        assert!(Things::extract(&Page::ok(json!({}))).unwrap().is_empty());
        assert!(
            Things::extract(&Page {
                status: 204,
                body: Value::Null
            })
            .unwrap()
            .is_empty()
        );
        assert!(matches!(
            Things::extract(&Page::ok(json!({ "things": [{ "name": "no id" }] }))),
            Err(Error::Decode { what: "things", .. })
        ));
    }

    #[tokio::test]
    async fn page_boundaries_are_invisible() {
        let items = things(37);
        let mut expected = None;

        for page_size in [1, 5, 10, 36, 37, 100] {
            let cloud = MockCloud::new().with_listing::<Things>(items.clone(), page_size);
            let listed = list_all::<Things>(&cloud, &ListOptions::default())
                .await
                .unwrap();

            assert_eq!(listed.len(), 37);
            assert_eq!(cloud.requests().len(), 37usize.div_ceil(page_size));
            match &expected {
                None => expected = Some(listed),
                Some(expected) => assert_eq!(&listed, expected, "page size {page_size}"),
            }
        }
    }

    #[tokio::test]
    async fn empty_listing_is_success() {
        let cloud = MockCloud::new().with_listing::<Things>(Vec::new(), 10);
        let listed = list_all::<Things>(&cloud, &ListOptions::default())
            .await
            .unwrap();
        assert!(listed.is_empty());
        assert_eq!(cloud.requests().len(), 1);
    }

    #[tokio::test]
    async fn failed_page_fails_the_listing() {
        let cloud = MockCloud::new()
            .with_listing::<Things>(things(250), 100)
            .fail_on_page::<Things>(1);

        let err = list_all::<Things>(&cloud, &ListOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Status { status: 500, .. }));
        assert_eq!(cloud.requests().len(), 2);
    }

    #[tokio::test]
    async fn options_reach_the_first_request() {
        let cloud = MockCloud::new().with_listing::<Things>(things(3), 2);
        let opts = ListOptions::default()
            .all_projects(true)
            .limit(2)
            .filter("status", "ACTIVE");
        list_all::<Things>(&cloud, &opts).await.unwrap();

        let requests = cloud.requests();
        assert!(requests.iter().all(|req| req.all_projects));
        assert_eq!(
            requests[0].target,
            PageTarget::Path {
                path: "v1/things".to_owned(),
                query: vec![
                    ("status".to_owned(), "ACTIVE".to_owned()),
                    ("limit".to_owned(), "2".to_owned()),
                ],
            }
        );
        assert!(matches!(requests[1].target, PageTarget::Url(_)));
    }

    struct Looping;

    #[async_trait::async_trait]
    impl CloudClient for Looping {
        async fn get_page(&self, _request: &PageRequest) -> Result<Page> {
            Ok(Page::ok(json!({
                "things": [{ "id": "same" }],
                "links": { "next": "mock://v1/things?again" },
            })))
        }
    }

    #[tokio::test]
    async fn repeated_next_link_is_an_error() {
        let err = list_all::<Things>(&Looping, &ListOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PaginationLoop(url) if url == "mock://v1/things?again"));
    }
}
