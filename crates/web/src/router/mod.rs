//! Pattern based request routing.
//!
//! Routes are registered on a [`RouterBuilder`] and frozen by
//! [`RouterBuilder::build`]. Looking up a path picks the most specific
//! matching pattern first and only then looks at the request method, so a
//! path that matches but has no item for the method is answered by the
//! not-implemented handler rather than the not-found one.
//!
//! ```
//! use pocket_web::router::{get, Router};
//! use pocket_web::{StaticStringHandler, VersionHandler};
//!
//! let router = Router::builder()
//!     .route("/version", get(VersionHandler::new("1.2.0")))
//!     .route("/ping", get(StaticStringHandler::text("pong")))
//!     .build()
//!     .unwrap();
//!
//! assert!(router.at("/version").is_matched());
//! assert!(!router.at("/missing").is_matched());
//! ```

pub mod filter;
mod pattern;

pub use pattern::{RoutePattern, Segment};
pub(crate) use pattern::split_path;

use std::sync::Arc;

use crate::error::RouterError;
use crate::handler::RouteHandler;
use crate::request::{PathParams, RequestContext};
use filter::{AllFilter, Filter};
use tracing::trace;

type RouterFilter = dyn Filter + Send + Sync + 'static;

/// The route table.
#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
    not_found: RouteHandler,
    not_implemented: RouteHandler,
}

/// A pattern and the items bound to it, in registration order.
pub struct Route {
    pattern: Arc<RoutePattern>,
    items: Vec<RouterItem>,
}

/// A router item containing a filter and handler
pub struct RouterItem {
    filter: Box<RouterFilter>,
    handler: RouteHandler,
}

/// Result of looking up a path.
#[derive(Debug)]
pub enum RouteResult<'router> {
    Matched { route: &'router Route, params: PathParams },
    NotFound,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Finds the most specific route matching the decoded `path`.
    ///
    /// Among equally specific routes the one registered first wins.
    pub fn at(&self, path: &str) -> RouteResult<'_> {
        let mut best: Option<(&Route, PathParams)> = None;

        for route in &self.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };

            let better = match &best {
                Some((current, _)) => route.pattern.cmp_specificity(&current.pattern).is_lt(),
                None => true,
            };
            if better {
                best = Some((route, params));
            }
        }

        match best {
            Some((route, params)) => {
                trace!(path, pattern = %route.pattern, "route matched");
                RouteResult::Matched { route, params }
            }
            None => RouteResult::NotFound,
        }
    }

    /// Resolves the handler for a request and attaches the matched route to
    /// its context.
    pub fn resolve(&self, context: RequestContext) -> (&RouteHandler, RequestContext) {
        match self.at(context.path()) {
            RouteResult::Matched { route, params } => {
                let context = context.with_route(Arc::clone(&route.pattern), params);
                let handler = route.handler_for(&context).unwrap_or(&self.not_implemented);
                (handler, context)
            }
            RouteResult::NotFound => (&self.not_found, context),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn not_found_handler(&self) -> &RouteHandler {
        &self.not_found
    }

    pub fn not_implemented_handler(&self) -> &RouteHandler {
        &self.not_implemented
    }

    /// Every handler reachable through this router, fallbacks included.
    pub fn handlers(&self) -> impl Iterator<Item = &RouteHandler> {
        self.routes
            .iter()
            .flat_map(|route| route.items.iter().map(RouterItem::handler))
            .chain([&self.not_found, &self.not_implemented])
    }
}

impl Route {
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn items(&self) -> &[RouterItem] {
        &self.items
    }

    /// The first item, in registration order, whose filter accepts the request.
    pub fn handler_for(&self, context: &RequestContext) -> Option<&RouteHandler> {
        self.items.iter().find(|item| item.filter.matches(context)).map(RouterItem::handler)
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route").field("pattern", &self.pattern.as_str()).field("items", &self.items.len()).finish()
    }
}

impl std::fmt::Debug for RouterItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterItem").field("handler", &self.handler).finish_non_exhaustive()
    }
}

impl RouterItem {
    pub fn filter(&self) -> &RouterFilter {
        self.filter.as_ref()
    }

    pub fn handler(&self) -> &RouteHandler {
        &self.handler
    }
}

impl<'router> RouteResult<'router> {
    #[inline]
    pub fn is_matched(&self) -> bool {
        matches!(self, RouteResult::Matched { .. })
    }

    pub fn route(&self) -> Option<&'router Route> {
        match self {
            RouteResult::Matched { route, .. } => Some(route),
            RouteResult::NotFound => None,
        }
    }

    pub fn params(&self) -> Option<&PathParams> {
        match self {
            RouteResult::Matched { params, .. } => Some(params),
            RouteResult::NotFound => None,
        }
    }
}

#[derive(Debug)]
pub struct RouterBuilder {
    routes: Vec<(String, Vec<RouterItemBuilder>)>,
    not_found: RouteHandler,
    not_implemented: RouteHandler,
}

impl RouterBuilder {
    fn new() -> Self {
        Self { routes: vec![], not_found: RouteHandler::NotFound, not_implemented: RouteHandler::NotImplemented }
    }

    /// Adds an item to `pattern`. Items added to the same pattern are tried
    /// in the order they were added.
    pub fn route(mut self, pattern: impl Into<String>, item_builder: RouterItemBuilder) -> Self {
        let pattern = pattern.into();
        match self.routes.iter_mut().find(|(existing, _)| *existing == pattern) {
            Some((_, items)) => items.push(item_builder),
            None => self.routes.push((pattern, vec![item_builder])),
        }
        self
    }

    /// Replaces the handler for paths no pattern matches.
    pub fn not_found(mut self, handler: impl Into<RouteHandler>) -> Self {
        self.not_found = handler.into();
        self
    }

    /// Replaces the handler for matched paths without an item for the method.
    pub fn not_implemented(mut self, handler: impl Into<RouteHandler>) -> Self {
        self.not_implemented = handler.into();
        self
    }

    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPattern`] for the first pattern that
    /// can't be parsed.
    pub fn build(self) -> Result<Router, RouterError> {
        let mut routes: Vec<Route> = Vec::with_capacity(self.routes.len());

        for (raw, item_builders) in self.routes {
            let pattern = RoutePattern::parse(&raw)?;
            let items = item_builders.into_iter().map(RouterItemBuilder::build);

            // `/a` and `/a/` are the same pattern
            match routes.iter_mut().find(|route| *route.pattern == pattern) {
                Some(route) => route.items.extend(items),
                None => routes.push(Route { pattern: Arc::new(pattern), items: items.collect() }),
            }
        }

        Ok(Router { routes, not_found: self.not_found, not_implemented: self.not_implemented })
    }
}

macro_rules! method_router_filter {
    ($method:ident, $method_name:ident) => {
        pub fn $method(handler: impl Into<RouteHandler>) -> RouterItemBuilder {
            let mut filters = filter::all_filter();
            filters.and(filter::$method_name());
            RouterItemBuilder { filters, handler: handler.into() }
        }
    };
}

method_router_filter!(get, get_method);
method_router_filter!(post, post_method);
method_router_filter!(put, put_method);
method_router_filter!(delete, delete_method);
method_router_filter!(head, head_method);
method_router_filter!(options, options_method);
method_router_filter!(patch, patch_method);

/// An item that handles every method.
pub fn any(handler: impl Into<RouteHandler>) -> RouterItemBuilder {
    RouterItemBuilder { filters: filter::all_filter(), handler: handler.into() }
}

pub struct RouterItemBuilder {
    filters: AllFilter,
    handler: RouteHandler,
}

impl RouterItemBuilder {
    pub fn with<F: Filter + Send + Sync + 'static>(mut self, filter: F) -> Self {
        self.filters.and(filter);
        self
    }

    fn build(self) -> RouterItem {
        RouterItem { filter: Box::new(self.filters), handler: self.handler }
    }
}

impl std::fmt::Debug for RouterItemBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterItemBuilder").field("handler", &self.handler).finish_non_exhaustive()
    }
}
