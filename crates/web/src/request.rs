//! Per-request data handed to handlers.
//!
//! - [`RequestContext`]: method, decoded path, query, headers and the route
//!   that matched
//! - [`PathParams`]: values bound by `:name` and `*` pattern segments
//! - [`QueryParams`]: the decoded query string, last value wins

use std::collections::HashMap;
use std::sync::Arc;

use http::{HeaderMap, Method, Uri, Version};
use pocket_http::protocol::RequestHeader;
use tracing::debug;

use crate::router::RoutePattern;

/// Everything a handler may look at to answer a request.
///
/// Cheap to clone: the request header and the matched pattern are shared.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_header: Arc<RequestHeader>,
    path: String,
    query: QueryParams,
    path_params: PathParams,
    pattern: Option<Arc<RoutePattern>>,
}

impl RequestContext {
    /// `path` is the percent-decoded request path.
    pub fn new(request_header: RequestHeader, path: impl Into<String>) -> Self {
        let query = QueryParams::parse(request_header.uri().query());
        Self {
            request_header: Arc::new(request_header),
            path: path.into(),
            query,
            path_params: PathParams::empty(),
            pattern: None,
        }
    }

    pub(crate) fn with_route(mut self, pattern: Arc<RoutePattern>, path_params: PathParams) -> Self {
        self.pattern = Some(pattern);
        self.path_params = path_params;
        self
    }

    pub fn request_header(&self) -> &RequestHeader {
        &self.request_header
    }

    pub fn method(&self) -> &Method {
        self.request_header.method()
    }

    pub fn uri(&self) -> &Uri {
        self.request_header.uri()
    }

    pub fn version(&self) -> Version {
        self.request_header.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.request_header.headers()
    }

    /// The percent-decoded request path, exactly as requested (no trailing
    /// slash normalization).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &QueryParams {
        &self.query
    }

    pub fn path_params(&self) -> &PathParams {
        &self.path_params
    }

    /// The pattern of the route that matched, `None` for the fallback
    /// handlers.
    pub fn matched_pattern(&self) -> Option<&RoutePattern> {
        self.pattern.as_deref()
    }
}

/// Values bound while matching a route pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: Vec<(String, String)>,
    wildcard: Option<String>,
}

impl PathParams {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: &str, value: &str) {
        self.params.push((name.to_owned(), value.to_owned()));
    }

    pub(crate) fn set_wildcard(&mut self, name: Option<&str>, value: String) {
        if let Some(name) = name {
            self.push(name, &value);
        }
        self.wildcard = Some(value);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty() && self.wildcard.is_none()
    }

    /// Number of named parameters, a named wildcard included.
    #[inline]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        let name = name.as_ref();
        self.params.iter().find(|(key, _)| key == name).map(|(_, value)| value.as_str())
    }

    /// The remainder matched by a trailing `*` or `*name` segment.
    pub fn wildcard(&self) -> Option<&str> {
        self.wildcard.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

/// The query string of a request.
///
/// Keys are unique; when a key repeats, the last value wins. A query that
/// can't be decoded is treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: HashMap<String, String>,
}

impl QueryParams {
    pub fn parse(query: Option<&str>) -> Self {
        let Some(query) = query.filter(|query| !query.is_empty()) else {
            return Self::default();
        };

        match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
            Ok(pairs) => Self { params: pairs.into_iter().collect() },
            Err(e) => {
                debug!(cause = %e, query, "ignore undecodable query string");
                Self::default()
            }
        }
    }

    pub fn get(&self, key: impl AsRef<str>) -> Option<&str> {
        self.params.get(key.as_ref()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    #[test]
    fn query_last_value_wins() {
        let query = QueryParams::parse(Some("v=1&name=a%20b&v=3"));

        assert_eq!(query.len(), 2);
        assert_eq!(query.get("v"), Some("3"));
        assert_eq!(query.get("name"), Some("a b"));
        assert_eq!(query.get("missing"), None);
    }

    #[test]
    fn missing_query_is_empty() {
        assert!(QueryParams::parse(None).is_empty());
        assert!(QueryParams::parse(Some("")).is_empty());
    }

    #[test]
    fn context_reads_header_and_query() {
        let header: RequestHeader = Request::builder().method(Method::GET).uri("/files/a%20b?x=1").body(()).unwrap().into();
        let context = RequestContext::new(header, "/files/a b");

        assert_eq!(context.method(), &Method::GET);
        assert_eq!(context.path(), "/files/a b");
        assert_eq!(context.uri().path(), "/files/a%20b");
        assert_eq!(context.query().get("x"), Some("1"));
        assert!(context.path_params().is_empty());
        assert!(context.matched_pattern().is_none());
    }

    #[test]
    fn named_wildcard_is_also_a_param() {
        let mut params = PathParams::empty();
        params.push("id", "7");
        params.set_wildcard(Some("rest"), "a/b".to_owned());

        assert_eq!(params.get("id"), Some("7"));
        assert_eq!(params.get("rest"), Some("a/b"));
        assert_eq!(params.wildcard(), Some("a/b"));
        assert_eq!(params.len(), 2);
    }
}
