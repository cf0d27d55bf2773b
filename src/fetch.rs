use crate::error::FetchError;
use crate::item::ListItem;
use attohttpc::header::HeaderName;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

/// Per request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on the number of pages requested from one collection.
pub const DEFAULT_MAX_PAGES: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// How an upstream splits its collection across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// One request, the body is a json array of every record.
    Single,
    /// Repeated `index`/`limit` requests until the body stops pointing at a `next` page.
    OffsetLimit { page_size: usize, max_pages: usize },
}

/// Where and how to get a collection.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub url: Url,
    pub headers: Vec<Header>,
    pub pagination: Pagination,
}

/// One GET request.
#[derive(Debug)]
pub struct Request<'a> {
    pub url: &'a Url,
    pub headers: &'a [Header],
    pub query: Vec<(&'static str, String)>,
}

/// Something that can perform a GET and hand back the body of a successful response.
///
/// Non success statuses must be reported as [`FetchError::Status`].
pub trait Transport {
    fn get(&self, request: &Request<'_>) -> Result<String, FetchError>;
}

/// A blocking HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for HttpTransport {
    fn get(&self, request: &Request<'_>) -> Result<String, FetchError> {
        let mut builder = attohttpc::get(request.url.as_str())
            .connect_timeout(self.timeout)
            .timeout(self.timeout);
        for header in request.headers {
            let name = HeaderName::from_bytes(header.name.as_bytes())
                .map_err(|_| FetchError::InvalidHeader(header.name.clone()))?;
            builder = builder
                .try_header(name, header.value.as_str())
                .map_err(|_| FetchError::InvalidHeader(header.name.clone()))?;
        }
        for (key, value) in &request.query {
            builder = builder.param(key, value);
        }

        let res = builder.send()?;
        let status = res.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        Ok(res.text()?)
    }
}

/// A bounded batch of records and whether the upstream has more.
#[derive(Debug)]
pub struct Page {
    pub items: Vec<ListItem>,
    pub has_next: bool,
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    /// Parse a paged body such as `{"data": [...], "total": 30, "next": "..."}`.
    pub fn parse(body: &str, offset: usize, limit: usize) -> Result<Self, FetchError> {
        #[derive(Deserialize)]
        struct PageJson {
            data: Option<Vec<ListItem>>,
            #[serde(default)]
            next: Value,
            error: Option<Value>,
        }

        let json: PageJson = serde_json::from_str(body)?;
        if let Some(error) = json.error {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(FetchError::Api(message));
        }

        let items = json
            .data
            .ok_or_else(|| FetchError::Malformed("page is missing `data`".into()))?;

        Ok(Self {
            items,
            has_next: is_truthy(&json.next),
            offset,
            limit,
        })
    }
}

/// Whether a continuation field says there is more to fetch.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map_or(false, |n| n != 0.0),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Retrieve every record of an endpoint, in upstream order.
///
/// Either the whole collection comes back or an error does; a failure on a
/// later page discards the pages already received.
pub fn fetch_all<T>(transport: &T, endpoint: &Endpoint) -> Result<Vec<ListItem>, FetchError>
where
    T: Transport + ?Sized,
{
    match endpoint.pagination {
        Pagination::Single => {
            debug!(url = %endpoint.url, "requesting collection");
            let body = transport.get(&Request {
                url: &endpoint.url,
                headers: &endpoint.headers,
                query: Vec::new(),
            })?;
            let items: Vec<ListItem> = match serde_json::from_str::<Value>(&body)? {
                Value::Array(values) => values.into_iter().map(ListItem::new).collect(),
                _ => return Err(FetchError::Malformed("expected a json array".into())),
            };
            info!("fetched {} records from {}", items.len(), endpoint.url);
            Ok(items)
        }
        Pagination::OffsetLimit {
            page_size,
            max_pages,
        } => fetch_paged(transport, endpoint, page_size, max_pages),
    }
}

fn fetch_paged<T>(
    transport: &T,
    endpoint: &Endpoint,
    page_size: usize,
    max_pages: usize,
) -> Result<Vec<ListItem>, FetchError>
where
    T: Transport + ?Sized,
{
    let mut items = Vec::new();
    let mut offset = 0;

    for _ in 0..max_pages {
        debug!(url = %endpoint.url, offset, limit = page_size, "requesting page");
        let body = transport.get(&Request {
            url: &endpoint.url,
            headers: &endpoint.headers,
            query: vec![("index", offset.to_string()), ("limit", page_size.to_string())],
        })?;

        let page = Page::parse(&body, offset, page_size)?;
        debug!(
            offset = page.offset,
            received = page.items.len(),
            has_next = page.has_next,
            "received page"
        );
        items.extend(page.items);

        if !page.has_next {
            info!("fetched {} records from {}", items.len(), endpoint.url);
            return Ok(items);
        }
        offset += page_size;
    }

    Err(FetchError::PageLimit(max_pages))
}
