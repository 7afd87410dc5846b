//! Request filters that decide which item of a matched route handles a
//! request.
//!
//! Every route item carries an [`AllFilter`]; the method builders
//! ([`get`](super::get), [`post`](super::post), ...) seed it with a
//! [`MethodFilter`] and [`RouterItemBuilder::with`](super::RouterItemBuilder::with)
//! adds more.
//!
//! ```
//! use pocket_web::router::filter::{all_filter, get_method, header};
//! use http::{HeaderName, HeaderValue};
//!
//! let mut combined = all_filter();
//! combined.and(get_method()).and(header(HeaderName::from_static("x-debug"), HeaderValue::from_static("1")));
//! ```

use crate::RequestContext;
use http::{HeaderName, HeaderValue, Method};

pub trait Filter: Send + Sync {
    /// Returns `true` if the request should be handled by the item owning
    /// this filter.
    fn matches(&self, req: &RequestContext) -> bool;
}

struct FnFilter<F: Fn(&RequestContext) -> bool>(F);

impl<F: Fn(&RequestContext) -> bool + Send + Sync> Filter for FnFilter<F> {
    fn matches(&self, req: &RequestContext) -> bool {
        (self.0)(req)
    }
}

/// Creates a filter from a closure.
///
/// ```
/// use pocket_web::router::filter::fn_filter;
///
/// let has_query = fn_filter(|req| !req.query().is_empty());
/// ```
pub fn fn_filter<F>(f: F) -> impl Filter
where
    F: Fn(&RequestContext) -> bool + Send + Sync,
{
    FnFilter(f)
}

/// Creates a new AND-composed filter chain.
pub fn all_filter() -> AllFilter {
    AllFilter::new()
}

/// Compose filters with AND logic.
///
/// An empty chain matches every request.
pub struct AllFilter {
    filters: Vec<Box<dyn Filter>>,
}

impl AllFilter {
    fn new() -> Self {
        Self { filters: vec![] }
    }

    /// Add a new filter to the AND chain.
    pub fn and<F: Filter + 'static>(&mut self, filter: F) -> &mut Self {
        self.filters.push(Box::new(filter));
        self
    }
}

impl std::fmt::Debug for AllFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AllFilter").field("filters", &self.filters.len()).finish()
    }
}

impl Filter for AllFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        self.filters.iter().all(|filter| filter.matches(req))
    }
}

/// A filter that matches HTTP methods.
#[derive(Debug)]
pub struct MethodFilter(Method);

impl Filter for MethodFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        self.0.eq(req.method())
    }
}

macro_rules! method_filter {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Creates a filter that matches HTTP ", stringify!($upper_case_method), " requests.")]
        #[inline]
        pub fn $method() -> MethodFilter {
            MethodFilter(Method::$upper_case_method)
        }
    };
}

method_filter!(get_method, GET);
method_filter!(post_method, POST);
method_filter!(put_method, PUT);
method_filter!(delete_method, DELETE);
method_filter!(head_method, HEAD);
method_filter!(options_method, OPTIONS);
method_filter!(patch_method, PATCH);

/// Creates a filter that matches a specific header name and value.
#[inline]
pub fn header(header_name: HeaderName, header_value: HeaderValue) -> HeaderFilter {
    HeaderFilter(header_name, header_value)
}

/// A filter that matches HTTP headers.
#[derive(Debug)]
pub struct HeaderFilter(HeaderName, HeaderValue);

impl Filter for HeaderFilter {
    fn matches(&self, req: &RequestContext) -> bool {
        req.headers().get(&self.0).is_some_and(|value| self.1.eq(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;
    use pocket_http::protocol::RequestHeader;

    fn context(method: Method, content_type: Option<&'static str>) -> RequestContext {
        let mut builder = Request::builder().method(method).uri("/");
        if let Some(content_type) = content_type {
            builder = builder.header(http::header::CONTENT_TYPE, content_type);
        }
        let header: RequestHeader = builder.body(()).unwrap().into();
        RequestContext::new(header, "/")
    }

    #[test]
    fn empty_chain_matches_everything() {
        assert!(all_filter().matches(&context(Method::DELETE, None)));
    }

    #[test]
    fn method_and_header_chain() {
        let mut filter = all_filter();
        filter.and(post_method()).and(header(http::header::CONTENT_TYPE, HeaderValue::from_static("application/json")));

        assert!(filter.matches(&context(Method::POST, Some("application/json"))));
        assert!(!filter.matches(&context(Method::POST, Some("text/plain"))));
        assert!(!filter.matches(&context(Method::GET, Some("application/json"))));
    }

    #[test]
    fn closure_filter() {
        let filter = fn_filter(|req| req.method() == Method::PUT);

        assert!(filter.matches(&context(Method::PUT, None)));
        assert!(!filter.matches(&context(Method::GET, None)));
    }
}
